use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use lizardtype::{
    app::{App, TICK_RATE_MS},
    app_dirs::AppDirs,
    catalog::{Catalog, Category, CategoryChoice, Mode},
    config::{Config, ConfigStore, FileConfigStore},
    image_cache::{ImageCache, WikimediaClient},
    image_loader::ImageLoader,
    runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    panic,
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Rows the playing screen needs besides the picture.
const CHROME_ROWS: u16 = 9;
const CHROME_COLS: u16 = 6;

/// name the animal in the photo: a typing game for kids
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing game for kids. A photo of a reptile or sea creature appears and you type its name: the common name in easy mode, the scientific name in hard mode. Peek at letters when stuck, build a streak, and see how many you get right."
)]
pub struct Cli {
    /// which name to type: the common name (easy) or the scientific name (hard)
    #[clap(short, long, value_enum)]
    mode: Option<Mode>,

    /// which animals to play with
    #[clap(short, long, value_enum)]
    category: Option<CategoryArg>,

    /// number of rounds in a game
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: Option<u32>,

    /// never download pictures; only show ones already cached
    #[clap(long)]
    offline: bool,

    /// where downloaded pictures are kept
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// start playing straight away with the remembered settings
    #[clap(long)]
    skip_menu: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    All,
    Reptile,
    SeaCreature,
}

impl CategoryArg {
    fn as_choice(&self) -> CategoryChoice {
        match self {
            CategoryArg::All => CategoryChoice::All,
            CategoryArg::Reptile => CategoryChoice::Only(Category::Reptile),
            CategoryArg::SeaCreature => CategoryChoice::Only(Category::SeaCreature),
        }
    }
}

impl Cli {
    /// Command line flags win over the saved settings.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(category) = self.category {
            config.category = category.as_choice();
        }
        if let Some(rounds) = self.rounds {
            config.total_rounds = rounds;
        }
        if self.offline {
            config.offline = true;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        config
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("LIZARDTYPE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("lizardtype=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn image_cache(config: &Config) -> ImageCache {
    let dir = config
        .cache_dir
        .clone()
        .unwrap_or_else(AppDirs::image_cache_dir);
    if config.offline {
        info!(dir = %dir.display(), "offline, using cached pictures only");
        return ImageCache::offline(dir);
    }
    match WikimediaClient::new() {
        Ok(client) => ImageCache::new(dir, Box::new(client)),
        Err(err) => {
            warn!(error = %err, "http client unavailable, going offline");
            ImageCache::offline(dir)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    let catalog = Catalog::load()?;
    let cache = image_cache(&config);

    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let loader = ImageLoader::new(
        cache,
        size.width.saturating_sub(CHROME_COLS),
        size.height.saturating_sub(CHROME_ROWS),
    );

    let mut app = App::new(config, catalog, Some(loader), Box::new(store));
    app.on_resize(size.width, size.height);
    if cli.skip_menu {
        app.start_game(app.config().mode);
    }

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    while !app.should_quit() {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            GameEvent::Key(key) => app.on_key(key),
            GameEvent::Resize(width, height) => app.on_resize(width, height),
            GameEvent::Tick => app.on_tick(),
            GameEvent::Closed => app.on_input_closed(),
        }
    }

    info!(score = app.session().score, "bye");
    Ok(())
}
