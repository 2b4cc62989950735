use anyhow::anyhow;
use fontdue::{Font as Face, FontSettings};
use log::warn;
use lyon::math::Size;
use serde::Serialize;
use smallvec::SmallVec;
use smartstring::alias::String;

/// A font request: family preference list and pixel size.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Font {
    pub families: SmallVec<[String; 2]>,
    pub size: f32,
}

impl Font {
    pub fn new(size: f32) -> Self {
        Font {
            families: SmallVec::new(),
            size,
        }
    }
}

/// Glyph measurements in pixels for a font at its size.
pub trait TextMetrics {
    fn advance(&self, font: &Font, c: char) -> f32;

    fn kern(&self, _font: &Font, _left: char, _right: char) -> f32 {
        0.0
    }

    fn line_height(&self, font: &Font) -> f32;

    fn average_char_width(&self, font: &Font) -> f32;

    fn text_width(&self, font: &Font, text: &str) -> f32 {
        let mut width = 0.0;
        let mut last = None;
        for c in text.chars() {
            if let Some(last) = last {
                width += self.kern(font, last, c);
            }
            width += self.advance(font, c);
            last = Some(c);
        }

        width
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontId(u8);

/// The bundled Noto Sans faces, measured with fontdue.
pub struct FontCollection {
    faces: Vec<Face>,
}

impl FontCollection {
    pub fn new() -> anyhow::Result<FontCollection> {
        let mut faces = Vec::new();

        for id in 0..3 {
            let face = Face::from_bytes(Self::font_data(FontId(id)), FontSettings::default())
                .map_err(|e| anyhow!("unable to load font face {}: {}", id, e))?;
            faces.push(face);
        }

        Ok(Self { faces })
    }

    pub fn font_id<I: IntoIterator<Item = S>, S: AsRef<str>>(&self, names: I) -> FontId {
        for name in names {
            let name = name.as_ref();
            if !name.starts_with("Noto Sans") {
                continue;
            }

            let found_face = if name.contains("Bold") {
                1
            } else if name.contains("Italic") {
                2
            } else {
                0
            };

            return FontId(found_face);
        }

        FontId(0)
    }

    fn face(&self, font: &Font) -> Option<&Face> {
        let FontId(id) = self.font_id(&font.families);
        self.faces.get(id as usize)
    }

    fn font_data(FontId(font_id): FontId) -> &'static [u8] {
        match font_id {
            1 => notosans::BOLD_TTF,
            2 => notosans::ITALIC_TTF,
            _ => notosans::REGULAR_TTF,
        }
    }

    /// Logs the families that fall back to the regular face.
    pub fn check_families<S: AsRef<str>>(&self, families: &[S]) {
        if !families.is_empty() && !families.iter().any(|f| f.as_ref().starts_with("Noto Sans")) {
            let names: Vec<&str> = families.iter().map(|f| f.as_ref()).collect();
            warn!("no matching font face for {:?}, using Noto Sans", names);
        }
    }
}

impl TextMetrics for FontCollection {
    fn advance(&self, font: &Font, c: char) -> f32 {
        self.face(font)
            .map(|face| face.metrics(c, font.size).advance_width)
            .unwrap_or(0.0)
    }

    fn kern(&self, font: &Font, left: char, right: char) -> f32 {
        self.face(font)
            .and_then(|face| face.horizontal_kern(left, right, font.size))
            .unwrap_or(0.0)
    }

    fn line_height(&self, font: &Font) -> f32 {
        self.face(font)
            .and_then(|face| face.horizontal_line_metrics(font.size))
            .map(|m| m.new_line_size)
            .unwrap_or(font.size * 1.2)
    }

    fn average_char_width(&self, font: &Font) -> f32 {
        let letters = 'a'..='z';
        let count = letters.clone().count() as f32;
        letters.map(|c| self.advance(font, c)).sum::<f32>() / count
    }
}

/// Every glyph advances by the same fraction of the font size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FixedMetrics {
    pub advance: f32,
    pub line_height: f32,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        FixedMetrics {
            advance: 0.5,
            line_height: 1.2,
        }
    }
}

impl TextMetrics for FixedMetrics {
    fn advance(&self, font: &Font, _c: char) -> f32 {
        self.advance * font.size
    }

    fn line_height(&self, font: &Font) -> f32 {
        self.line_height * font.size
    }

    fn average_char_width(&self, font: &Font) -> f32 {
        self.advance * font.size
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

/// Word-wrapped text with its overall extent.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: SmallVec<[TextLine; 2]>,
    pub line_height: f32,
    #[serde(skip)]
    pub size: Size,
}

/// Greedy wrap at whitespace. Words wider than `max_width` get a line of
/// their own and are never split.
pub fn wrap_text<M: TextMetrics + ?Sized>(
    metrics: &M,
    font: &Font,
    text: &str,
    max_width: f32,
) -> TextBlock {
    let mut lines: SmallVec<[TextLine; 2]> = SmallVec::new();
    let space = metrics.advance(font, ' ');

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = metrics.text_width(font, word);
            if line.is_empty() {
                line.push_str(word);
                width = word_width;
            } else if width + space + word_width <= max_width {
                line.push(' ');
                line.push_str(word);
                width += space + word_width;
            } else {
                lines.push(TextLine {
                    text: std::mem::take(&mut line),
                    width,
                });
                line.push_str(word);
                width = word_width;
            }
        }

        if !line.is_empty() {
            lines.push(TextLine { text: line, width });
        }
    }

    let line_height = metrics.line_height(font);
    let width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    let size = Size::new(width, line_height * lines.len() as f32);

    TextBlock {
        lines,
        line_height,
        size,
    }
}
