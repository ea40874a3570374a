use ratatui::{buffer::Buffer, layout::Rect};

use crate::{
    app::{App, Screen},
    ui::{menu, playing, summary},
};

/// One screen of the game. Key handling lives in [`App::on_key`].
pub trait ScreenView {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer);
}

pub struct MenuView;

impl ScreenView for MenuView {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        menu::render(app, area, buf);
    }
}

pub struct PlayingView;

impl ScreenView for PlayingView {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        playing::render(app, area, buf);
    }
}

pub struct RoundOverView {
    pub correct: bool,
}

impl ScreenView for RoundOverView {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        summary::render_round_over(app, self.correct, area, buf);
    }
}

pub struct GameOverView;

impl ScreenView for GameOverView {
    fn render(&self, app: &App, area: Rect, buf: &mut Buffer) {
        summary::render_game_over(app, area, buf);
    }
}

/// The view for the screen the app is on.
pub fn current_view(screen: Screen) -> Box<dyn ScreenView> {
    match screen {
        Screen::Menu => Box::new(MenuView),
        Screen::Playing => Box::new(PlayingView),
        Screen::RoundOver { correct } => Box::new(RoundOverView { correct }),
        Screen::GameOver => Box::new(GameOverView),
    }
}
