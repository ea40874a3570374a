use image::{imageops::FilterType, DynamicImage};
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};
use std::path::Path;

const UPPER_HALF_BLOCK: &str = "▀";

/// A photo shrunk to terminal size.
///
/// Each cell draws two stacked pixels with an upper half block: the top pixel
/// as foreground, the bottom one as background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl Picture {
    pub fn load(path: &Path, max_cols: u16, max_rows: u16) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        Ok(Self::fit(&img, max_cols, max_rows))
    }

    /// Scales `img` to fit in `max_cols` x `max_rows` cells, keeping its
    /// aspect ratio.
    pub fn fit(img: &DynamicImage, max_cols: u16, max_rows: u16) -> Self {
        let max_w = u32::from(max_cols.max(1));
        let max_h = u32::from(max_rows.max(1)) * 2;
        let rgb = img.resize(max_w, max_h, FilterType::Triangle).to_rgb8();
        Self {
            width: rgb.width(),
            height: rgb.height(),
            pixels: rgb.pixels().map(|p| p.0).collect(),
        }
    }

    pub fn cols(&self) -> u16 {
        self.width as u16
    }

    pub fn rows(&self) -> u16 {
        self.height.div_ceil(2) as u16
    }

    fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [r, g, b] = self.pixels[(y * self.width + x) as usize];
        Some(Color::Rgb(r, g, b))
    }
}

impl Widget for &Picture {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() || self.width == 0 || self.height == 0 {
            return;
        }

        // nearest-neighbour shrink when the area is smaller than the picture
        let scale = (f64::from(area.width) / f64::from(self.width))
            .min(f64::from(area.height) * 2.0 / f64::from(self.height))
            .min(1.0);
        let out_w = ((f64::from(self.width) * scale).floor() as u32).max(1);
        let out_h = ((f64::from(self.height) * scale).floor() as u32).max(1);
        let out_rows = out_h.div_ceil(2);

        let x0 = area.x + (area.width - out_w as u16) / 2;
        let y0 = area.y + (area.height - out_rows as u16) / 2;
        let source = |v: u32, out: u32, full: u32| (v * full / out).min(full - 1);

        for row in 0..out_rows {
            for col in 0..out_w {
                let sx = source(col, out_w, self.width);
                let top = self.pixel(sx, source(row * 2, out_h, self.height));
                let bottom = if row * 2 + 1 < out_h {
                    self.pixel(sx, source(row * 2 + 1, out_h, self.height))
                } else {
                    None
                };

                if let Some(cell) = buf.cell_mut((x0 + col as u16, y0 + row as u16)) {
                    cell.set_symbol(UPPER_HALF_BLOCK);
                    cell.set_fg(top.unwrap_or(Color::Reset));
                    cell.set_bg(bottom.unwrap_or(Color::Reset));
                }
            }
        }
    }
}
