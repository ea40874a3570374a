//! Screen navigation and the glue between the round engine, the session, the
//! catalog and the image loader.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};
use webbrowser::Browser;

use crate::catalog::{AnimalRecord, Catalog, CategoryChoice, Mode};
use crate::celebration::Celebration;
use crate::config::{Config, ConfigStore};
use crate::image_loader::ImageLoader;
use crate::picture::Picture;
use crate::round::{Outcome, Round};
use crate::session::SessionState;

pub const TICK_RATE_MS: u64 = 100;
/// How long "Not quite" stays up, in ticks.
pub const FLASH_TICKS: u32 = 15;
pub const WRONG_ANSWER: &str = "Not quite, try again!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    RoundOver { correct: bool },
    GameOver,
}

#[derive(Debug)]
pub enum PictureSlot {
    Loading,
    Ready(Picture),
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub text: String,
    pub ticks_left: u32,
}

pub struct App {
    config: Config,
    store: Box<dyn ConfigStore>,
    screen: Screen,
    choices: Vec<CategoryChoice>,
    menu_index: usize,
    catalog: Catalog,
    session: SessionState,
    round: Round,
    animal: Option<AnimalRecord>,
    picture: PictureSlot,
    loader: Option<ImageLoader>,
    pending_image: Option<u64>,
    flash: Option<Flash>,
    celebration: Celebration,
    rng: StdRng,
    viewport: (u16, u16),
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        catalog: Catalog,
        loader: Option<ImageLoader>,
        store: Box<dyn ConfigStore>,
    ) -> Self {
        let choices = catalog.choices();
        let menu_index = choices
            .iter()
            .position(|c| *c == config.category)
            .unwrap_or(0);

        Self {
            config,
            store,
            screen: Screen::Menu,
            choices,
            menu_index,
            catalog,
            session: SessionState::new(),
            round: Round::new(),
            animal: None,
            picture: PictureSlot::Loading,
            loader,
            pending_image: None,
            flash: None,
            celebration: Celebration::new(),
            rng: StdRng::from_entropy(),
            viewport: (80, 24),
            should_quit: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn animal(&self) -> Option<&AnimalRecord> {
        self.animal.as_ref()
    }

    pub fn picture(&self) -> &PictureSlot {
        &self.picture
    }

    pub fn flash(&self) -> Option<&str> {
        self.flash.as_ref().map(|f| f.text.as_str())
    }

    pub fn celebration(&self) -> &Celebration {
        &self.celebration
    }

    pub fn choices(&self) -> &[CategoryChoice] {
        &self.choices
    }

    pub fn selected_choice(&self) -> CategoryChoice {
        self.choices
            .get(self.menu_index)
            .copied()
            .unwrap_or_default()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Round number shown in the top bar, 1-based.
    pub fn round_number(&self) -> u32 {
        let number = match self.screen {
            Screen::Playing => self.session.rounds_played + 1,
            _ => self.session.rounds_played,
        };
        number.min(self.config.total_rounds.max(1))
    }

    /// Nothing can be typed any more; leave instead of redrawing forever.
    pub fn on_input_closed(&mut self) {
        warn!(screen = ?self.screen, "input closed, quitting");
        self.should_quit = true;
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    pub fn on_tick(&mut self) {
        self.poll_images();

        if let Some(flash) = &mut self.flash {
            flash.ticks_left = flash.ticks_left.saturating_sub(1);
            if flash.ticks_left == 0 {
                self.flash = None;
            }
        }
        self.celebration.tick();
    }

    fn poll_images(&mut self) {
        let Some(loader) = &mut self.loader else {
            return;
        };
        while let Some(reply) = loader.try_recv() {
            if self.pending_image != Some(reply.id) {
                debug!(id = reply.id, image = %reply.image_ref, "dropping stale image");
                continue;
            }
            self.pending_image = None;
            self.picture = match reply.result {
                Ok(picture) => PictureSlot::Ready(picture),
                Err(err) => PictureSlot::Missing(err.to_string()),
            };
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Menu => self.on_menu_key(key),
            Screen::Playing => self.on_playing_key(key),
            Screen::RoundOver { .. } => self.on_round_over_key(key),
            Screen::GameOver => self.on_game_over_key(key),
        }
    }

    fn on_menu_key(&mut self, key: KeyEvent) {
        let count = self.choices.len().max(1);
        match key.code {
            KeyCode::Right | KeyCode::Tab => self.menu_index = (self.menu_index + 1) % count,
            KeyCode::Left | KeyCode::BackTab => {
                self.menu_index = (self.menu_index + count - 1) % count
            }
            KeyCode::Up | KeyCode::Down => {
                self.config.mode = match self.config.mode {
                    Mode::Easy => Mode::Hard,
                    Mode::Hard => Mode::Easy,
                }
            }
            KeyCode::Char('e') | KeyCode::Char('1') => self.start_game(Mode::Easy),
            KeyCode::Char('h') | KeyCode::Char('2') => self.start_game(Mode::Hard),
            KeyCode::Enter => self.start_game(self.config.mode),
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn on_playing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.round.handle_character(c)
            }
            KeyCode::Backspace => self.round.handle_backspace(),
            KeyCode::Tab => self.round.request_hint(),
            KeyCode::Enter => match self.round.submit() {
                Some(Outcome::Correct) => {
                    if let Some(result) = self.round.result() {
                        self.session.record_round(&result);
                    }
                    let (width, height) = self.viewport;
                    self.celebration.start(width, height, &mut self.rng);
                    self.flash = None;
                    self.screen = Screen::RoundOver { correct: true };
                }
                Some(Outcome::Incorrect) => {
                    self.flash = Some(Flash {
                        text: WRONG_ANSWER.to_string(),
                        ticks_left: FLASH_TICKS,
                    });
                }
                None => {}
            },
            KeyCode::Right => {
                if let Some(result) = self.round.skip() {
                    self.session.record_round(&result);
                    self.flash = None;
                    self.screen = Screen::RoundOver { correct: false };
                }
            }
            KeyCode::Esc => self.back_to_menu(),
            _ => {}
        }
    }

    fn on_round_over_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('n') => self.next_round(),
            KeyCode::Char('m') => self.back_to_menu(),
            KeyCode::Char('w') => self.open_commons_page(),
            _ => {}
        }
    }

    fn on_game_over_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => self.start_game(self.config.mode),
            KeyCode::Char('m') => self.back_to_menu(),
            _ => {}
        }
    }

    /// Resets the session and deals the first animal.
    pub fn start_game(&mut self, mode: Mode) {
        self.config.mode = mode;
        self.config.category = self.selected_choice();

        // only the menu choices are remembered; flags stay per run
        let mut saved = self.store.load();
        saved.mode = mode;
        saved.category = self.config.category;
        if let Err(err) = self.store.save(&saved) {
            warn!(error = %err, "could not save settings");
        }

        info!(
            mode = %mode,
            category = %self.config.category.label(),
            rounds = self.config.total_rounds,
            "game started"
        );
        self.session.reset();
        self.next_round();
    }

    /// Deals the next animal, or ends the game once every round is played.
    pub fn next_round(&mut self) {
        self.celebration.stop();
        self.flash = None;

        if self.session.rounds_played >= self.config.total_rounds {
            info!(
                score = self.session.score,
                best_streak = self.session.best_streak,
                "game over"
            );
            self.round = Round::new();
            self.screen = Screen::GameOver;
            return;
        }

        let animal = match self.catalog.next_animal(self.config.category).cloned() {
            Ok(animal) => animal,
            Err(err) => {
                warn!(error = %err, "no animal to show");
                self.show_menu_with(err.to_string());
                return;
            }
        };

        if let Err(err) = self.round.start(animal.target(self.config.mode)) {
            warn!(error = %err, animal = %animal.common_name, "could not start round");
            self.show_menu_with(err.to_string());
            return;
        }

        self.request_picture(&animal.image_ref);
        debug!(animal = %animal.common_name, round = self.session.rounds_played + 1, "next round");
        self.animal = Some(animal);
        self.screen = Screen::Playing;
    }

    fn request_picture(&mut self, image_ref: &str) {
        self.picture = PictureSlot::Loading;
        self.pending_image = None;

        let Some(loader) = &mut self.loader else {
            self.picture = PictureSlot::Missing("pictures are turned off".to_string());
            return;
        };
        match loader.request(image_ref) {
            Ok(id) => self.pending_image = Some(id),
            Err(err) => {
                warn!(error = %err, "could not start image lookup");
                self.picture = PictureSlot::Missing(err.to_string());
            }
        }
    }

    fn back_to_menu(&mut self) {
        self.round = Round::new();
        self.pending_image = None;
        self.celebration.stop();
        self.flash = None;
        self.screen = Screen::Menu;
    }

    fn show_menu_with(&mut self, message: String) {
        self.back_to_menu();
        self.flash = Some(Flash {
            text: message,
            ticks_left: FLASH_TICKS * 2,
        });
    }

    fn open_commons_page(&self) {
        let Some(animal) = &self.animal else {
            return;
        };
        if !Browser::is_available() {
            return;
        }
        let url = animal.commons_page_url();
        if let Err(err) = webbrowser::open(&url) {
            warn!(error = %err, url = %url, "could not open browser");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Catalog};
    use crate::config::MemoryConfigStore;
    use crate::round::Phase;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    fn test_app(total_rounds: u32) -> App {
        let config = Config {
            total_rounds,
            ..Config::default()
        };
        App::new(
            config,
            Catalog::load_seeded(11).unwrap(),
            None,
            Box::new(MemoryConfigStore::default()),
        )
    }

    fn answer(app: &App) -> String {
        app.round().target_text()
    }

    #[test]
    fn test_menu_cycles_categories() {
        let mut app = test_app(3);
        assert_eq!(app.selected_choice(), CategoryChoice::All);

        app.on_key(key(KeyCode::Right));
        assert_eq!(
            app.selected_choice(),
            CategoryChoice::Only(Category::Reptile)
        );
        app.on_key(key(KeyCode::Tab));
        assert_eq!(
            app.selected_choice(),
            CategoryChoice::Only(Category::SeaCreature)
        );
        app.on_key(key(KeyCode::Right));
        assert_eq!(app.selected_choice(), CategoryChoice::All);
        app.on_key(key(KeyCode::Left));
        assert_eq!(
            app.selected_choice(),
            CategoryChoice::Only(Category::SeaCreature)
        );
    }

    #[test]
    fn test_menu_mode_keys_start_game() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Char('h')));
        assert_eq!(app.screen(), Screen::Playing);
        assert_eq!(app.config().mode, Mode::Hard);

        let animal = app.animal().unwrap().clone();
        assert_eq!(
            answer(&app),
            crate::round::normalize_target(&animal.scientific_name)
        );
    }

    #[test]
    fn test_start_game_saves_settings() {
        let store = std::rc::Rc::new(MemoryConfigStore::default());

        struct Shared(std::rc::Rc<MemoryConfigStore>);
        impl ConfigStore for Shared {
            fn load(&self) -> Config {
                self.0.load()
            }
            fn save(&self, cfg: &Config) -> std::io::Result<()> {
                self.0.save(cfg)
            }
        }

        let mut app = App::new(
            Config::default(),
            Catalog::load_seeded(1).unwrap(),
            None,
            Box::new(Shared(store.clone())),
        );
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Char('2')));

        let saved = store.saved().unwrap();
        assert_eq!(saved.mode, Mode::Hard);
        assert_eq!(saved.category, CategoryChoice::Only(Category::Reptile));
    }

    #[test]
    fn test_selected_category_limits_animals() {
        let mut app = test_app(20);
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Enter));

        for _ in 0..10 {
            assert_eq!(app.animal().unwrap().category, Category::SeaCreature);
            app.on_key(key(KeyCode::Right));
            app.on_key(key(KeyCode::Enter));
        }
    }

    #[test]
    fn test_correct_answer_scores_and_celebrates() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        let target = answer(&app);
        type_text(&mut app, &target.to_lowercase());
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.screen(), Screen::RoundOver { correct: true });
        assert_eq!(app.session().score, 10);
        assert_eq!(app.session().streak, 1);
        assert!(app.celebration().is_active());
    }

    #[test]
    fn test_wrong_answer_flashes_and_keeps_round() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        type_text(&mut app, "zz");
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.screen(), Screen::Playing);
        assert_eq!(app.flash(), Some(WRONG_ANSWER));
        assert_eq!(app.round().typed_text(), "zz");
        assert_eq!(app.session().score, 0);

        for _ in 0..FLASH_TICKS {
            app.on_tick();
        }
        assert_eq!(app.flash(), None);
    }

    #[test]
    fn test_hint_costs_points() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Tab));
        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.round().revealed_count(), 2);

        let target = answer(&app);
        type_text(&mut app, &target);
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.session().score, 6);
        assert_eq!(app.session().hints_used_total, 2);
    }

    #[test]
    fn test_skip_breaks_streak() {
        let mut app = test_app(5);
        app.on_key(key(KeyCode::Enter));
        let target = answer(&app);
        type_text(&mut app, &target);
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('n')));

        app.on_key(key(KeyCode::Right));
        assert_eq!(app.screen(), Screen::RoundOver { correct: false });
        assert_eq!(app.session().streak, 0);
        assert_eq!(app.session().best_streak, 1);
        assert_eq!(app.session().rounds_played, 2);
    }

    #[test]
    fn test_game_over_after_total_rounds() {
        let mut app = test_app(2);
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Right));
        app.on_key(key(KeyCode::Enter));

        assert_eq!(app.screen(), Screen::GameOver);
        assert_eq!(app.session().rounds_played, 2);

        app.on_key(key(KeyCode::Char('r')));
        assert_eq!(app.screen(), Screen::Playing);
        assert_eq!(app.session().rounds_played, 0);
    }

    #[test]
    fn test_escape_discards_round() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        type_text(&mut app, "ab");
        app.on_key(key(KeyCode::Esc));

        assert_eq!(app.screen(), Screen::Menu);
        assert_eq!(app.round().phase(), Phase::Idle);
        assert!(!app.should_quit());

        app.on_key(key(KeyCode::Esc));
        assert!(app.should_quit());
    }

    #[test]
    fn test_ctrl_c_quits_anywhere() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
        assert_eq!(app.round().typed_text(), "");
    }

    #[test]
    fn test_closed_input_quits_mid_round() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        app.on_input_closed();
        assert!(app.should_quit());
    }

    #[test]
    fn test_without_loader_picture_is_missing() {
        let mut app = test_app(3);
        app.on_key(key(KeyCode::Enter));
        assert!(matches!(app.picture(), PictureSlot::Missing(_)));
    }

    #[test]
    fn test_round_number() {
        let mut app = test_app(2);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.round_number(), 1);
        app.on_key(key(KeyCode::Right));
        assert_eq!(app.round_number(), 1);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.round_number(), 2);
    }
}
