pub mod menu;
pub mod playing;
pub mod screen;
pub mod summary;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::{
    app::App,
    celebration::{Celebration, PALETTE_LEN},
};

const HORIZONTAL_MARGIN: u16 = 2;

pub(crate) fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

pub(crate) fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

pub(crate) fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        screen::current_view(self.screen()).render(self, area, buf);

        if self.celebration().is_active() {
            render_celebration(self.celebration(), area, buf);
        }
    }
}

/// Score, streak and round counter along the top edge.
pub(crate) fn render_status_bar(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.session();
    let line = Line::from(vec![
        Span::styled(format!("Score: {}", session.score), bold().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(
            format!("Streak: {}", session.streak),
            bold().fg(Color::Magenta),
        ),
        Span::raw("   "),
        Span::styled(
            format!(
                "Round {}/{}",
                app.round_number(),
                app.config().total_rounds
            ),
            bold(),
        ),
        Span::raw("   "),
        Span::styled(app.config().mode.to_string(), dim()),
    ]);
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .render(area, buf);
}

/// One centered line; the legend on every screen uses this.
pub(crate) fn render_centered(text: &str, style: Style, area: Rect, buf: &mut Buffer) {
    Paragraph::new(Span::styled(text.to_string(), style))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_celebration(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors: [Color; PALETTE_LEN] = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    // letters go on top of the confetti
    let pieces = celebration.pieces();
    let ordered = pieces
        .iter()
        .filter(|p| !p.is_text)
        .chain(pieces.iter().filter(|p| p.is_text));

    for piece in ordered {
        if piece.x < 0.0 || piece.y < 0.0 {
            continue;
        }
        let (x, y) = (piece.x as u16, piece.y as u16);
        if x >= area.width || y >= area.height {
            continue;
        }

        let color = colors[piece.color_index % colors.len()];
        let fade = 1.0 - piece.age / piece.max_age;
        let style = if piece.is_text || fade > 0.6 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if fade > 0.25 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&piece.symbol.to_string());
            cell.set_style(style);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

    use crate::{
        app::App,
        catalog::Catalog,
        config::{Config, MemoryConfigStore},
    };

    pub fn app(total_rounds: u32) -> App {
        App::new(
            Config {
                total_rounds,
                ..Config::default()
            },
            Catalog::load_seeded(5).unwrap(),
            None,
            Box::new(MemoryConfigStore::default()),
        )
    }

    pub fn render(app: &App, width: u16, height: u16) -> Buffer {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer
    }

    pub fn text(buffer: &Buffer) -> String {
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
