use fontdue::{Font, FontSettings};
use image::{ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;

const BACKGROUND: Rgb<u8> = Rgb([0x1a, 0x1a, 0x2e]);
const TITLE_COLOR: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const BODY_COLOR: Rgb<u8> = Rgb([0x88, 0x88, 0x88]);

const TITLE: &str = "Placeholder";
const WRAP_WIDTH: usize = 60;
const MAX_DESCRIPTION_CHARS: usize = 180;

const BOLD_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
];

const REGULAR_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
];

/// Renders stand-in images for scenes whose generation failed
pub struct PlaceholderRenderer {
    width: u32,
    height: u32,
    title_font: Option<Font>,
    body_font: Option<Font>,
}

impl PlaceholderRenderer {
    pub fn new(width: u32, height: u32, font_override: Option<&Path>) -> Self {
        let title_font = load_font(font_override, BOLD_FONT_CANDIDATES);
        let body_font = load_font(font_override, REGULAR_FONT_CANDIDATES);

        if title_font.is_none() || body_font.is_none() {
            warn!("No usable font found; placeholders will be rendered without text");
        }

        Self {
            width,
            height,
            title_font,
            body_font,
        }
    }

    pub fn render(&self, description: &str) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let scale = self.height as f32 / 1080.0;
        let center_x = self.width as f32 / 2.0;

        if let Some(font) = &self.title_font {
            draw_centered(&mut img, font, &[TITLE.to_string()], 60.0 * scale, center_x, 400.0 * scale, TITLE_COLOR);
        }

        if let Some(font) = &self.body_font {
            let lines = wrap_description(description);
            draw_centered(&mut img, font, &lines, 30.0 * scale, center_x, 600.0 * scale, BODY_COLOR);
        }

        img
    }

    /// Render and write the placeholder as PNG
    pub fn render_to_file(&self, description: &str, path: &Path) -> Result<()> {
        self.render(description).save_with_format(path, ImageFormat::Png)?;
        info!("Placeholder created: {}", path.display());
        Ok(())
    }
}

/// First 180 characters split into 60-character lines
pub fn wrap_description(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().take(MAX_DESCRIPTION_CHARS).collect();
    chars
        .chunks(WRAP_WIDTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn load_font(font_override: Option<&Path>, candidates: &[&str]) -> Option<Font> {
    let paths = font_override
        .map(Path::to_path_buf)
        .into_iter()
        .chain(candidates.iter().map(PathBuf::from));

    for path in paths {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match Font::from_bytes(bytes, FontSettings::default()) {
            Ok(font) => return Some(font),
            Err(e) => warn!("Failed to parse font {}: {}", path.display(), e),
        }
    }
    None
}

/// Draw lines centred horizontally and vertically around (cx, cy)
fn draw_centered(
    img: &mut RgbImage,
    font: &Font,
    lines: &[String],
    px: f32,
    cx: f32,
    cy: f32,
    color: Rgb<u8>,
) {
    let (ascent, line_height) = match font.horizontal_line_metrics(px) {
        Some(m) => (m.ascent, m.new_line_size),
        None => (px * 0.8, px * 1.2),
    };

    let block_height = line_height * lines.len() as f32;
    let top = cy - block_height / 2.0;

    for (row, line) in lines.iter().enumerate() {
        let line_width: f32 = line.chars().map(|ch| font.metrics(ch, px).advance_width).sum();
        let baseline = top + ascent + row as f32 * line_height;
        let mut pen_x = cx - line_width / 2.0;

        for ch in line.chars() {
            let (metrics, bitmap) = font.rasterize(ch, px);
            let origin_x = (pen_x + metrics.xmin as f32).round() as i64;
            let origin_y = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i64;

            for y in 0..metrics.height {
                for x in 0..metrics.width {
                    let coverage = bitmap[y * metrics.width + x];
                    if coverage == 0 {
                        continue;
                    }
                    let px_x = origin_x + x as i64;
                    let px_y = origin_y + y as i64;
                    if px_x < 0 || px_y < 0 || px_x >= img.width() as i64 || px_y >= img.height() as i64 {
                        continue;
                    }
                    let pixel = img.get_pixel_mut(px_x as u32, px_y as u32);
                    *pixel = blend(*pixel, color, coverage);
                }
            }

            pen_x += metrics.advance_width;
        }
    }
}

fn blend(under: Rgb<u8>, over: Rgb<u8>, alpha: u8) -> Rgb<u8> {
    let a = alpha as u16;
    let mix = |u: u8, o: u8| ((o as u16 * a + u as u16 * (255 - a)) / 255) as u8;
    Rgb([mix(under[0], over[0]), mix(under[1], over[1]), mix(under[2], over[2])])
}
