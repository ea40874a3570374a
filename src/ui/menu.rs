use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::{bold, dim, italic, render_centered, HORIZONTAL_MARGIN};
use crate::{app::App, catalog::Mode};

const TITLE: &str = "~ LizardType ~";
const LEGEND: &str = "(←/→) animals  (↑/↓) mode  (e)asy  (h)ard  (enter) start  (esc) quit";

fn selected() -> Style {
    bold().fg(Color::Black).bg(Color::Green)
}

pub fn render(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(2), // title
            Constraint::Length(1), // subtitle
            Constraint::Length(1),
            Constraint::Length(1), // categories
            Constraint::Length(1),
            Constraint::Length(1), // mode
            Constraint::Length(1),
            Constraint::Length(1), // flash
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_centered(
        TITLE,
        bold().fg(Color::Green).add_modifier(Modifier::UNDERLINED),
        chunks[1],
        buf,
    );
    render_centered(
        "Name the animal in the picture!",
        italic(),
        chunks[2],
        buf,
    );

    let chosen = app.selected_choice();
    let mut spans = vec![Span::styled("Animals: ", bold())];
    for choice in app.choices() {
        let style = if *choice == chosen {
            selected()
        } else {
            dim()
        };
        spans.push(Span::styled(format!(" {} ", choice.label()), style));
        spans.push(Span::raw(" "));
    }
    Paragraph::new(Line::from(spans))
        .centered()
        .render(chunks[4], buf);

    let mode = app.config().mode;
    let mode_span = |m: Mode, text: &'static str| {
        Span::styled(text, if m == mode { selected() } else { dim() })
    };
    Paragraph::new(Line::from(vec![
        Span::styled("Mode: ", bold()),
        mode_span(Mode::Easy, " Easy: common names "),
        Span::raw("  "),
        mode_span(Mode::Hard, " Hard: scientific names "),
    ]))
    .centered()
    .render(chunks[6], buf);

    if let Some(flash) = app.flash() {
        render_centered(flash, bold().fg(Color::Red), chunks[8], buf);
    }

    render_centered(LEGEND, italic(), chunks[10], buf);
}
