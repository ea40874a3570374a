use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use super::{bold, dim, italic, render_centered, render_status_bar, HORIZONTAL_MARGIN};
use crate::{
    app::{App, PictureSlot},
    round::{Outcome, Round},
};

pub const PLACEHOLDER: [&str; 2] = ["Image not available", "(Check your internet connection)"];
const LEGEND: &str = "(enter) check  (tab) peek  (→) skip  (esc) menu";

/// Underscores for the letters still to type, a gap where the answer has a
/// space, typed letters green or red.
pub fn answer_line(round: &Round) -> Line<'static> {
    let green = bold().fg(Color::Green);
    let red = bold().fg(Color::Red);
    let target: Vec<char> = round.target_text().chars().collect();

    let mut spans: Vec<Span> = round
        .typed_outcomes()
        .map(|(c, outcome)| {
            let (shown, style) = match (c, outcome) {
                (' ', Outcome::Incorrect) => ('·', red),
                (c, Outcome::Incorrect) => (c, red),
                (c, Outcome::Correct) => (c, green),
            };
            Span::styled(format!("{shown} "), style)
        })
        .collect();

    for &expected in target.iter().skip(round.typed_len()) {
        let slot = if expected == ' ' { "  " } else { "_ " };
        spans.push(Span::styled(slot, dim()));
    }
    Line::from(spans)
}

fn hint_line(round: &Round) -> Line<'static> {
    let points = Span::styled(
        format!("worth {} points", round.points_available()),
        Style::default().fg(Color::Yellow),
    );
    let mut spans = if round.revealed_count() == 0 {
        vec![Span::styled("(tab) to peek   ", dim()), points]
    } else {
        vec![
            Span::styled("Peek: ", bold()),
            Span::styled(round.revealed_text(), bold().fg(Color::Cyan)),
            Span::styled("…   ", dim()),
            points,
        ]
    };
    if round.failed_attempts() > 0 {
        spans.push(Span::styled(
            format!("   tries: {}", round.failed_attempts()),
            dim(),
        ));
    }
    Line::from(spans)
}

fn render_picture(app: &App, area: Rect, buf: &mut Buffer) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(" Who am I? ");
    let inner = block.inner(area);
    block.render(area, buf);

    match app.picture() {
        PictureSlot::Ready(picture) => picture.render(inner, buf),
        PictureSlot::Loading => {
            let mid = centered_rows(inner, 1);
            render_centered("Fetching picture...", italic(), mid, buf);
        }
        PictureSlot::Missing(reason) => {
            let mid = centered_rows(inner, 3);
            let lines = vec![
                Line::styled(PLACEHOLDER[0], bold()),
                Line::styled(PLACEHOLDER[1], italic()),
                Line::styled(reason.clone(), dim()),
            ];
            Paragraph::new(lines)
                .centered()
                .wrap(Wrap { trim: true })
                .render(mid, buf);
        }
    }
}

fn centered_rows(area: Rect, rows: u16) -> Rect {
    let rows = rows.min(area.height);
    Rect {
        y: area.y + (area.height - rows) / 2,
        height: rows,
        ..area
    }
}

pub fn render(app: &App, area: Rect, buf: &mut Buffer) {
    let round = app.round();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // status
            Constraint::Min(3),    // picture
            Constraint::Length(1), // prompt
            Constraint::Length(1), // answer
            Constraint::Length(1), // peek
            Constraint::Length(1), // flash
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_status_bar(app, chunks[0], buf);
    render_picture(app, chunks[1], buf);

    render_centered(app.config().mode.prompt(), bold(), chunks[2], buf);

    let answer = answer_line(round);
    let answer_width: usize = answer.spans.iter().map(|s| s.content.width()).sum();
    if answer_width <= chunks[3].width as usize {
        Paragraph::new(answer).centered().render(chunks[3], buf);
    } else {
        // too long for one row with gaps; fall back to the bare typed text
        render_centered(&round.typed_text(), bold(), chunks[3], buf);
    }

    Paragraph::new(hint_line(round))
        .centered()
        .render(chunks[4], buf);

    if let Some(flash) = app.flash() {
        render_centered(flash, bold().fg(Color::Red), chunks[5], buf);
    }

    render_centered(LEGEND, italic(), chunks[6], buf);
}
