use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use webbrowser::Browser;

use super::{bold, dim, italic, render_centered, render_status_bar, HORIZONTAL_MARGIN};
use crate::app::App;

pub fn render_round_over(app: &App, correct: bool, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // status
            Constraint::Min(0),
            Constraint::Length(2), // verdict
            Constraint::Length(2), // names
            Constraint::Length(2), // points
            Constraint::Length(4), // fact
            Constraint::Length(1), // credit
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_status_bar(app, chunks[0], buf);

    let (verdict, color) = if correct {
        ("Correct!", Color::Green)
    } else {
        ("Skipped", Color::Yellow)
    };
    render_centered(verdict, bold().fg(color), chunks[2], buf);

    let Some(animal) = app.animal() else {
        return;
    };

    Paragraph::new(Line::from(vec![
        Span::styled(animal.common_name.clone(), bold()),
        Span::raw("  "),
        Span::styled(format!("({})", animal.scientific_name), italic()),
    ]))
    .centered()
    .render(chunks[3], buf);

    let points = app.round().result().map_or(0, |r| r.points);
    let hints = app.round().hints_used();
    let points_text = match hints {
        0 => format!("+{points} points"),
        1 => format!("+{points} points (1 peek)"),
        n => format!("+{points} points ({n} peeks)"),
    };
    render_centered(&points_text, bold().fg(Color::Yellow), chunks[4], buf);

    Paragraph::new(Span::styled(
        format!("Fun fact: {}", animal.fact),
        italic().fg(Color::Cyan),
    ))
    .centered()
    .wrap(Wrap { trim: true })
    .render(chunks[5], buf);

    render_centered(
        &format!("Photo: {} (Wikimedia Commons)", animal.image_ref),
        dim(),
        chunks[6],
        buf,
    );

    let legend = if Browser::is_available() {
        "(enter) next  (m)enu  (w)eb page"
    } else {
        "(enter) next  (m)enu"
    };
    render_centered(legend, italic(), chunks[8], buf);
}

pub fn render_game_over(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.session();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(2), // title
            Constraint::Length(1), // score
            Constraint::Length(1), // streak
            Constraint::Length(1), // hints
            Constraint::Length(1), // difficulty
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_centered("Game over!", bold().fg(Color::Green), chunks[1], buf);
    render_centered(
        &format!("Final score: {}", session.score),
        bold().fg(Color::Yellow),
        chunks[2],
        buf,
    );
    render_centered(
        &format!("Best streak: {}", session.best_streak),
        bold(),
        chunks[3],
        buf,
    );
    render_centered(
        &format!("Peeks used: {}", session.hints_used_total),
        bold(),
        chunks[4],
        buf,
    );
    render_centered(
        &format!("Difficulty: {}", app.config().mode),
        dim(),
        chunks[5],
        buf,
    );
    render_centered("(enter/r) play again  (m)enu", italic(), chunks[7], buf);
}
