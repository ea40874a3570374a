use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::{debug, warn};

/// Everything the game loop reacts to.
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
    /// The input source is gone; no key will ever arrive again.
    Closed,
}

/// Source of terminal events (keyboard, resize).
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a helper thread.
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    /// Falls back to a source that is already closed when the reader thread
    /// cannot be started.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let spawned = std::thread::Builder::new()
            .name("input-reader".into())
            .spawn(move || read_terminal(tx));
        if let Err(err) = spawned {
            warn!(error = %err, "could not start the input reader");
        }

        Self { rx }
    }
}

fn read_terminal(tx: Sender<GameEvent>) {
    loop {
        let ev = match event::read() {
            // windows reports releases too
            Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => GameEvent::Key(key),
            Ok(CtEvent::Resize(w, h)) => GameEvent::Resize(w, h),
            Ok(_) => continue,
            Err(err) => {
                warn!(error = %err, "terminal input failed");
                return;
            }
        };
        if tx.send(ev).is_err() {
            debug!("event loop gone, input reader stopping");
            return;
        }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Event source fed from a channel, for driving the app in tests.
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the game one event or tick at a time.
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to one tick interval; Tick on timeout, Closed once the
    /// source has hung up.
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => GameEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => GameEvent::Closed,
        }
    }
}
