use crate::types::Pt;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    fn flags(self) -> (bool, bool) {
        match self {
            FontStyle::Normal => (false, false),
            FontStyle::Bold => (true, false),
            FontStyle::Italic => (false, true),
            FontStyle::BoldItalic => (true, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    pub style: FontStyle,
    pub size: Pt,
}

impl FontSpec {
    pub fn new(name: impl Into<String>, size: f32) -> Self {
        Self {
            name: name.into(),
            style: FontStyle::Normal,
            size: Pt::from_f32(size),
        }
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    /// Face name for this font: the base-14 variant when the family is one of
    /// the standard PDF families, otherwise the family name unchanged.
    pub fn face_name(&self) -> String {
        let (bold, italic) = self.style.flags();
        base14_variant_name(&self.name, bold, italic)
            .map(str::to_string)
            .unwrap_or_else(|| self.name.clone())
    }
}

impl<'de> Deserialize<'de> for FontSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct FontArgs {
            style: FontStyle,
            size: Option<f32>,
        }

        #[derive(Deserialize)]
        struct NamedFont {
            name: String,
            #[serde(default)]
            style: FontStyle,
            size: Option<f32>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawFont {
            Name(String),
            Pair(String, FontArgs),
            Named(NamedFont),
        }

        let (name, style, size) = match RawFont::deserialize(deserializer)? {
            RawFont::Name(name) => (name, FontStyle::Normal, None),
            RawFont::Pair(name, args) => (name, args.style, args.size),
            RawFont::Named(font) => (font.name, font.style, font.size),
        };
        let size = size.unwrap_or(DEFAULT_FONT_SIZE);
        if !(size.is_finite() && size > 0.0) {
            return Err(de::Error::custom(format!("font size must be positive, got {size}")));
        }
        Ok(FontSpec::new(name, size).with_style(style))
    }
}

pub(crate) const DEFAULT_FONT_SIZE: f32 = 6.0;

fn base14_variant_name(base: &str, bold: bool, italic: bool) -> Option<&'static str> {
    let norm = base
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase();
    match norm.as_str() {
        "helvetica" => Some(match (bold, italic) {
            (true, true) => "Helvetica-BoldOblique",
            (true, false) => "Helvetica-Bold",
            (false, true) => "Helvetica-Oblique",
            (false, false) => "Helvetica",
        }),
        "times" | "times-roman" => Some(match (bold, italic) {
            (true, true) => "Times-BoldItalic",
            (true, false) => "Times-Bold",
            (false, true) => "Times-Italic",
            (false, false) => "Times-Roman",
        }),
        "courier" => Some(match (bold, italic) {
            (true, true) => "Courier-BoldOblique",
            (true, false) => "Courier-Bold",
            (false, true) => "Courier-Oblique",
            (false, false) => "Courier",
        }),
        _ => None,
    }
}

/// Text measurement collaborator. Implementations must be deterministic: the
/// column width solver relies on identical inputs producing identical widths.
pub trait TextMetrics {
    /// Unconstrained advance width of `text` set on one line.
    fn measure_width(&self, text: &str, font: &FontSpec) -> Pt;

    /// Distance between consecutive baselines.
    fn line_height(&self, font: &FontSpec) -> Pt;

    /// Height needed to set `text` wrapped within `max_width`.
    fn measure_wrap_height(&self, text: &str, max_width: Pt, font: &FontSpec) -> Pt {
        self.measure_wrap_height_breaking(text, max_width, font, &[])
    }

    /// Like [`TextMetrics::measure_wrap_height`], with lines also allowed to
    /// end after any character in `break_after`.
    fn measure_wrap_height_breaking(
        &self,
        text: &str,
        max_width: Pt,
        font: &FontSpec,
        break_after: &[char],
    ) -> Pt {
        let lines = wrap_lines(self, text, max_width, font, break_after);
        self.line_height(font) * (lines.len() as i32)
    }
}

/// Greedy word wrap. Lines break at whitespace and after any character in
/// `break_after`; pieces still wider than `max_width` are broken between
/// characters. Blank text yields no lines.
pub fn wrap_lines<M: TextMetrics + ?Sized>(
    metrics: &M,
    text: &str,
    max_width: Pt,
    font: &FontSpec,
    break_after: &[char],
) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut piece_widths: HashMap<&str, Pt> = HashMap::new();
    let space_width = metrics.measure_width(" ", font);
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        if segment.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        let pieces = segment.split_whitespace().flat_map(move |word| {
            word.split_inclusive(move |ch: char| break_after.contains(&ch))
                .enumerate()
        });
        for (index, piece) in pieces {
            let piece_width = *piece_widths
                .entry(piece)
                .or_insert_with(|| metrics.measure_width(piece, font));
            // Only the first piece of a word is preceded by a space.
            let (gap, gap_width) = if index == 0 {
                (" ", space_width)
            } else {
                ("", Pt::ZERO)
            };
            if !current.is_empty() {
                let next_width = current_width + gap_width + piece_width;
                if next_width <= max_width {
                    current.push_str(gap);
                    current.push_str(piece);
                    current_width = next_width;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
            }
            if piece_width > max_width {
                let mut parts = split_long_word_by_width(metrics, piece, max_width, font);
                let last = parts.pop().unwrap_or_default();
                lines.extend(parts);
                current_width = metrics.measure_width(&last, font);
                current = last;
            } else {
                current.push_str(piece);
                current_width = piece_width;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

fn split_long_word_by_width<M: TextMetrics + ?Sized>(
    metrics: &M,
    word: &str,
    max_width: Pt,
    font: &FontSpec,
) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_width = Pt::ZERO;
    let mut char_widths: HashMap<char, Pt> = HashMap::new();
    for ch in word.chars() {
        let w = *char_widths
            .entry(ch)
            .or_insert_with(|| metrics.measure_width(ch.encode_utf8(&mut [0; 4]), font));
        let mut next_width = current_width + w;
        if !current.is_empty() && next_width > max_width {
            parts.push(std::mem::take(&mut current));
            next_width = w;
        }
        current.push(ch);
        current_width = next_width;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Every glyph advances by the same fraction of the font size. Useful when no
/// font files are available and for reproducible layout tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMetrics {
    pub advance_em: f32,
    pub line_height_em: f32,
}

impl Default for FixedAdvanceMetrics {
    fn default() -> Self {
        Self {
            advance_em: 0.5,
            line_height_em: 1.2,
        }
    }
}

impl TextMetrics for FixedAdvanceMetrics {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Pt {
        (font.size * self.advance_em) * (text.chars().count() as i32)
    }

    fn line_height(&self, font: &FontSpec) -> Pt {
        font.size * self.line_height_em
    }
}
