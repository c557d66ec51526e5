use crate::error::{Result, TableError};
use crate::text::{FontSpec, TextMetrics};
use crate::types::Pt;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const FALLBACK_ADVANCE_EM: f32 = 0.6;
const FALLBACK_LINE_HEIGHT_EM: f32 = 1.2;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    font_index: usize,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, Pt>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&self, key: &TextWidthKey) -> Option<Pt> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: TextWidthKey, value: Pt) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            let Some(old) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&old);
        }
    }
}

/// Fonts loaded from TrueType/OpenType files, used as the measuring backend.
/// Names that resolve to no registered font are measured with a fixed
/// 0.6em advance per character.
#[derive(Debug)]
pub struct FontRegistry {
    fonts: Vec<FontMetrics>,
    lookup: HashMap<String, usize>,
    text_width_cache: Mutex<TextWidthCache>,
}

/// Advances for Latin-1 in 1/1000 em, plus vertical metrics.
#[derive(Debug)]
struct FontMetrics {
    first_char: u8,
    last_char: u8,
    widths: Vec<u16>,
    missing_width: u16,
    ascent: i16,
    descent: i16,
    line_gap: i16,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
            text_width_cache: Mutex::new(TextWidthCache::new(20_000)),
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Registers every `.ttf`/`.otf` file directly inside `path`. Unreadable
    /// entries are skipped.
    pub fn register_dir(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let mut registered = 0;
        for entry in fs::read_dir(path.as_ref())?.flatten() {
            let path = entry.path();
            if path.is_file() && self.register_file(&path).is_ok() {
                registered += 1;
            }
        }
        Ok(registered)
    }

    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|v| v.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(ext.as_deref(), Some("ttf" | "otf")) {
            return Err(TableError::InvalidConfiguration(format!(
                "not a font file: {}",
                path.display()
            )));
        }
        let data = fs::read(path)?;
        self.register_parsed(&data, path)
    }

    /// Registers font data from memory and returns its primary name.
    pub fn register_bytes(&mut self, data: &[u8], source_name: Option<&str>) -> Result<String> {
        let source = source_name.unwrap_or("EmbeddedFont");
        self.register_parsed(data, Path::new(source))
    }

    fn register_parsed(&mut self, data: &[u8], source: &Path) -> Result<String> {
        let face = ttf_parser::Face::parse(data, 0).map_err(|err| {
            TableError::InvalidConfiguration(format!(
                "invalid font data for {}: {err}",
                source.display()
            ))
        })?;
        let (name, aliases) = font_names(&face, source);
        let index = self.fonts.len();
        self.fonts.push(FontMetrics::from_face(&face));
        for alias in std::iter::once(name.clone()).chain(aliases) {
            let key = normalize_name(&alias);
            if key.is_empty() || self.lookup.contains_key(&key) {
                continue;
            }
            self.lookup.insert(key, index);
        }
        log::debug!("registered font {name} from {}", source.display());
        Ok(name)
    }

    /// Styled face name first, then the bare family.
    fn resolve_index(&self, font: &FontSpec) -> Option<usize> {
        [font.face_name(), font.name.clone()]
            .iter()
            .find_map(|name| self.lookup.get(&normalize_name(name)).copied())
    }
}

impl TextMetrics for FontRegistry {
    fn measure_width(&self, text: &str, font: &FontSpec) -> Pt {
        let Some(index) = self.resolve_index(font) else {
            let char_width = (font.size * FALLBACK_ADVANCE_EM).max(Pt::from_f32(1.0));
            return char_width * (text.chars().count() as i32);
        };
        let cache_key = TextWidthKey {
            font_index: index,
            size_milli: font.size.to_milli_i64(),
            text: text.to_string(),
        };
        if let Ok(cache) = self.text_width_cache.lock() {
            if let Some(value) = cache.get(&cache_key) {
                return value;
            }
        }
        let value = self
            .fonts
            .get(index)
            .map(|metrics| metrics.measure_text_width(font.size, text))
            .unwrap_or(Pt::ZERO);
        if let Ok(mut cache) = self.text_width_cache.lock() {
            cache.insert(cache_key, value);
        }
        value
    }

    fn line_height(&self, font: &FontSpec) -> Pt {
        let fallback = font.size * FALLBACK_LINE_HEIGHT_EM;
        self.resolve_index(font)
            .and_then(|index| self.fonts.get(index))
            .map(|metrics| metrics.line_height(font.size).max(fallback))
            .unwrap_or(fallback)
    }
}

impl FontMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let first_char = 32u8;
        let last_char = 255u8;
        let widths: Vec<u16> = (first_char..=last_char)
            .map(|code| {
                let advance = char::from_u32(code as u32)
                    .and_then(|ch| face.glyph_index(ch))
                    .and_then(|id| face.glyph_hor_advance(id))
                    .unwrap_or(0);
                let scaled = (advance as f32 * scale).round() as i32;
                scaled.clamp(0, u16::MAX as i32) as u16
            })
            .collect();
        let missing_width = widths.first().copied().unwrap_or(0);
        Self {
            first_char,
            last_char,
            widths,
            missing_width,
            ascent: scale_i16(face.ascender(), scale),
            descent: scale_i16(face.descender(), scale),
            line_gap: scale_i16(face.line_gap(), scale),
        }
    }

    fn advance_for_char(&self, ch: char) -> u16 {
        let code = ch as u32;
        if code < self.first_char as u32 || code > self.last_char as u32 {
            return self.missing_width;
        }
        let idx = (code - self.first_char as u32) as usize;
        self.widths.get(idx).copied().unwrap_or(self.missing_width)
    }

    fn measure_text_width(&self, font_size: Pt, text: &str) -> Pt {
        let total_units = text
            .chars()
            .fold(0i32, |acc, ch| acc.saturating_add(self.advance_for_char(ch) as i32));
        if total_units <= 0 {
            return Pt::ZERO;
        }
        font_size.mul_ratio(total_units, 1000)
    }

    fn line_height(&self, font_size: Pt) -> Pt {
        let height_1000 = self.ascent as i32 - self.descent as i32 + self.line_gap as i32;
        if height_1000 <= 0 {
            return Pt::ZERO;
        }
        font_size.mul_ratio(height_1000, 1000)
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn font_names(face: &ttf_parser::Face<'_>, path: &Path) -> (String, Vec<String>) {
    use ttf_parser::name::name_id;

    let mut family = None;
    let mut full = None;
    let mut post = None;
    for entry in face.names() {
        let Some(name) = entry.to_string() else {
            continue;
        };
        let slot = match entry.name_id {
            name_id::TYPOGRAPHIC_FAMILY | name_id::FAMILY => &mut family,
            name_id::FULL_NAME => &mut full,
            name_id::POST_SCRIPT_NAME => &mut post,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(name);
        }
    }

    let stem = path
        .file_stem()
        .and_then(|v| v.to_str())
        .map(str::to_string);
    let primary = post
        .clone()
        .or_else(|| full.clone())
        .or_else(|| family.clone())
        .or_else(|| stem.clone())
        .unwrap_or_else(|| "EmbeddedFont".to_string());
    let aliases = [family, full, post, stem]
        .into_iter()
        .flatten()
        .filter(|candidate| *candidate != primary)
        .collect();
    (primary, aliases)
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}
