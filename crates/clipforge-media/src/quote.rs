//! Quote image rendering.
//!
//! Rasterizes a short piece of text onto a portrait canvas: `{word}` spans
//! render in the bold face, `\n` forces a line break, and everything else is
//! word-wrapped and centered. An optional logo is composited near the bottom.

use std::io::Cursor;
use std::path::PathBuf;

use fontdue::{Font, FontSettings};
use image::{imageops, ImageOutputFormat, Rgba, RgbaImage};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Canvas geometry and type settings.
#[derive(Debug, Clone)]
pub struct QuoteStyle {
    pub width: u32,
    pub height: u32,
    pub font_size: f32,
    /// Horizontal margin on each side, in pixels
    pub margin: u32,
    /// Extra space between lines, as a fraction of the font size
    pub line_spacing: f32,
    pub background: Rgba<u8>,
    pub foreground: Rgba<u8>,
    /// Optional logo composited bottom-center
    pub logo_path: Option<PathBuf>,
}

impl Default for QuoteStyle {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1350,
            font_size: 60.0,
            margin: 100,
            line_spacing: 0.3,
            background: Rgba([0, 0, 0, 255]),
            foreground: Rgba([245, 245, 245, 255]),
            logo_path: None,
        }
    }
}

/// A run of text in one face.
#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    bold: bool,
}

/// Split markup into spans: `{word}` marks bold. Both real newlines and the
/// literal two-character sequence `\n` (as JSON clients tend to send) break
/// lines.
fn parse_markup(text: &str) -> Vec<Span> {
    let text = text.replace("\\n", "\n");
    let mut spans = Vec::new();
    let mut buf = String::new();
    let mut bold = false;

    for ch in text.chars() {
        match ch {
            '{' if !bold => {
                if !buf.is_empty() {
                    spans.push(Span {
                        text: std::mem::take(&mut buf),
                        bold: false,
                    });
                }
                bold = true;
            }
            '}' if bold => {
                if !buf.is_empty() {
                    spans.push(Span {
                        text: std::mem::take(&mut buf),
                        bold: true,
                    });
                }
                bold = false;
            }
            _ => buf.push(ch),
        }
    }
    if !buf.is_empty() {
        // An unclosed brace falls back to regular text
        spans.push(Span { text: buf, bold: false });
    }

    spans
}

/// A word ready for layout, carrying its face.
#[derive(Debug, Clone)]
struct Word {
    text: String,
    bold: bool,
}

/// Flatten spans into words and explicit break markers (`None`).
fn into_words(spans: &[Span]) -> Vec<Option<Word>> {
    let mut words = Vec::new();
    for span in spans {
        for (i, line) in span.text.split('\n').enumerate() {
            if i > 0 {
                words.push(None);
            }
            for word in line.split_whitespace() {
                words.push(Some(Word {
                    text: word.to_string(),
                    bold: span.bold,
                }));
            }
        }
    }
    words
}

/// Renders quote images with a regular and a bold face.
pub struct QuoteRenderer {
    regular: Font,
    bold: Font,
    style: QuoteStyle,
}

impl QuoteRenderer {
    /// Build a renderer from raw TTF/OTF bytes.
    pub fn new(regular_ttf: &[u8], bold_ttf: &[u8], style: QuoteStyle) -> MediaResult<Self> {
        let settings = FontSettings::default();
        let regular = Font::from_bytes(regular_ttf, settings)
            .map_err(|e| MediaError::quote_render(format!("bad regular font: {}", e)))?;
        let bold = Font::from_bytes(bold_ttf, settings)
            .map_err(|e| MediaError::quote_render(format!("bad bold font: {}", e)))?;
        Ok(Self {
            regular,
            bold,
            style,
        })
    }

    fn font(&self, bold: bool) -> &Font {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    fn word_width(&self, word: &Word) -> f32 {
        let font = self.font(word.bold);
        word.text
            .chars()
            .map(|ch| font.metrics(ch, self.style.font_size).advance_width)
            .sum()
    }

    fn space_width(&self) -> f32 {
        self.regular.metrics(' ', self.style.font_size).advance_width
    }

    /// Greedy word wrap within the text column.
    fn wrap(&self, words: &[Option<Word>]) -> Vec<Vec<Word>> {
        let max_width = (self.style.width - 2 * self.style.margin) as f32;
        let space = self.space_width();

        let mut lines: Vec<Vec<Word>> = vec![Vec::new()];
        let mut line_width = 0.0f32;

        for word in words {
            match word {
                None => {
                    lines.push(Vec::new());
                    line_width = 0.0;
                }
                Some(word) => {
                    let width = self.word_width(word);
                    let needed = if line_width > 0.0 { space + width } else { width };
                    if line_width > 0.0 && line_width + needed > max_width {
                        lines.push(Vec::new());
                        line_width = width;
                    } else {
                        line_width += needed;
                    }
                    lines.last_mut().expect("wrap always has a line").push(word.clone());
                }
            }
        }

        lines
    }

    fn line_width(&self, line: &[Word]) -> f32 {
        let words: f32 = line.iter().map(|w| self.word_width(w)).sum();
        let spaces = line.len().saturating_sub(1) as f32 * self.space_width();
        words + spaces
    }

    fn draw_line(&self, canvas: &mut RgbaImage, line: &[Word], baseline_y: f32) {
        let mut pen_x = (self.style.width as f32 - self.line_width(line)) / 2.0;
        let space = self.space_width();

        for (i, word) in line.iter().enumerate() {
            if i > 0 {
                pen_x += space;
            }
            let font = self.font(word.bold);
            for ch in word.text.chars() {
                let (metrics, bitmap) = font.rasterize(ch, self.style.font_size);
                let glyph_x = pen_x + metrics.xmin as f32;
                let glyph_y = baseline_y - metrics.height as f32 - metrics.ymin as f32;

                for (row, chunk) in bitmap.chunks(metrics.width).enumerate() {
                    for (col, &coverage) in chunk.iter().enumerate() {
                        if coverage == 0 {
                            continue;
                        }
                        let x = glyph_x + col as f32;
                        let y = glyph_y + row as f32;
                        if x < 0.0 || y < 0.0 {
                            continue;
                        }
                        let (x, y) = (x as u32, y as u32);
                        if x >= self.style.width || y >= self.style.height {
                            continue;
                        }
                        blend_pixel(canvas, x, y, self.style.foreground, coverage);
                    }
                }
                pen_x += metrics.advance_width;
            }
        }
    }

    /// Render the markup to a PNG.
    pub fn render_png(&self, text: &str) -> MediaResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MediaError::quote_render("quote text is empty"));
        }

        let spans = parse_markup(text);
        let words = into_words(&spans);
        let lines = self.wrap(&words);
        let lines: Vec<_> = lines.into_iter().filter(|l| !l.is_empty()).collect();
        if lines.is_empty() {
            return Err(MediaError::quote_render("quote text has no renderable words"));
        }

        let mut canvas = RgbaImage::from_pixel(
            self.style.width,
            self.style.height,
            self.style.background,
        );

        // Center the text block vertically
        let line_height = self.style.font_size * (1.0 + self.style.line_spacing);
        let block_height = lines.len() as f32 * line_height;
        let mut baseline_y =
            (self.style.height as f32 - block_height) / 2.0 + self.style.font_size;

        debug!("Rendering quote: {} lines", lines.len());
        for line in &lines {
            self.draw_line(&mut canvas, line, baseline_y);
            baseline_y += line_height;
        }

        if let Some(logo_path) = &self.style.logo_path {
            self.composite_logo(&mut canvas, logo_path);
        }

        let mut png = Vec::new();
        canvas
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .map_err(|e| MediaError::quote_render(format!("PNG encode failed: {}", e)))?;
        Ok(png)
    }

    /// Bottom-centered logo at 20% canvas width and 75% opacity.
    fn composite_logo(&self, canvas: &mut RgbaImage, path: &std::path::Path) {
        let logo = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                // Missing branding never fails the render
                warn!("Skipping logo {}: {}", path.display(), e);
                return;
            }
        };

        let target_width = self.style.width / 5;
        let scale = target_width as f32 / logo.width() as f32;
        let target_height = (logo.height() as f32 * scale) as u32;
        let mut logo = imageops::resize(
            &logo,
            target_width,
            target_height.max(1),
            imageops::FilterType::Lanczos3,
        );

        for pixel in logo.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * 0.75) as u8;
        }

        let x = (self.style.width - target_width) / 2;
        let y = self.style.height.saturating_sub(target_height + 50);
        imageops::overlay(canvas, &logo, x as i64, y as i64);
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>, coverage: u8) {
    let dst = canvas.get_pixel_mut(x, y);
    let alpha = coverage as f32 / 255.0;
    for c in 0..3 {
        dst[c] = (color[c] as f32 * alpha + dst[c] as f32 * (1.0 - alpha)) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_bold_spans() {
        let spans = parse_markup("believe in {yourself} today");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].text, "believe in ");
        assert!(!spans[0].bold);
        assert_eq!(spans[1].text, "yourself");
        assert!(spans[1].bold);
        assert_eq!(spans[2].text, " today");
    }

    #[test]
    fn test_markup_unclosed_brace_is_regular() {
        let spans = parse_markup("keep {going");
        assert!(spans.iter().all(|s| !s.bold));
    }

    #[test]
    fn test_words_honor_explicit_breaks() {
        let spans = parse_markup("one two\nthree");
        let words = into_words(&spans);
        assert_eq!(words.len(), 4);
        assert!(words[2].is_none());
        assert_eq!(words[3].as_ref().unwrap().text, "three");
    }

    #[test]
    fn test_literal_backslash_n_breaks_line() {
        let spans = parse_markup(r"line one\nline two");
        let words = into_words(&spans);
        assert_eq!(words.len(), 5);
        assert!(words[2].is_none());
        assert_eq!(words[1].as_ref().unwrap().text, "one");
        assert_eq!(words[3].as_ref().unwrap().text, "line");
    }

    #[test]
    fn test_bold_survives_word_split() {
        let spans = parse_markup("{stay strong} always");
        let words = into_words(&spans);
        let flat: Vec<_> = words.into_iter().flatten().collect();
        assert_eq!(flat.len(), 3);
        assert!(flat[0].bold);
        assert!(flat[1].bold);
        assert!(!flat[2].bold);
    }
}
