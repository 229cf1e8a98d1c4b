use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Width of a single line of text in pixels.
///
/// Layout and routing only ever ask for widths through this trait, so tests can
/// swap in [`FixedWidthMeasurer`] and stay independent of installed fonts.
pub trait TextMeasurer {
    fn measure_text(&self, text: &str, font_size: f32, font_family: &str) -> f32;
}

/// Deterministic measurer: every character is `char_width_ratio * font_size` wide.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthMeasurer {
    pub char_width_ratio: f32,
}

impl Default for FixedWidthMeasurer {
    fn default() -> Self {
        Self {
            char_width_ratio: 0.56,
        }
    }
}

impl TextMeasurer for FixedWidthMeasurer {
    fn measure_text(&self, text: &str, font_size: f32, _font_family: &str) -> f32 {
        text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * self.char_width_ratio
    }
}

/// Measures with system fonts through fontdb, falling back to the fixed-width
/// estimate when no face matches the requested family.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontTextMeasurer;

impl TextMeasurer for FontTextMeasurer {
    fn measure_text(&self, text: &str, font_size: f32, font_family: &str) -> f32 {
        measure_text_width(text, font_size, font_family).unwrap_or_else(|| {
            FixedWidthMeasurer::default().measure_text(text, font_size, font_family)
        })
    }
}

static FONT_CACHE: Lazy<Mutex<FontCache>> = Lazy::new(|| Mutex::new(FontCache::new()));

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_CACHE.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontCache {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl FontCache {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(font_family);
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get(&key)?.as_ref()?;
        Some(face.measure_width(&text.replace('\t', "    "), font_size))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded = None;
        self.db.with_face_data(id, |data, index| {
            loaded = FontFace::parse(data, index);
        });
        loaded
    }
}

/// Advance widths extracted once from a parsed face, in font units.
struct FontFace {
    units_per_em: f32,
    ascii_advances: [u16; 128],
    other_advances: HashMap<char, u16>,
}

impl FontFace {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        // Latin-1 supplement and general punctuation cover most diagram labels.
        let mut other_advances = HashMap::new();
        for ch in ('\u{a0}'..='\u{17f}').chain('\u{2010}'..='\u{2044}') {
            if let Some(glyph) = face.glyph_index(ch) {
                other_advances.insert(ch, face.glyph_hor_advance(glyph).unwrap_or(0));
            }
        }
        Some(Self {
            units_per_em: f32::from(face.units_per_em().max(1)),
            ascii_advances,
            other_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                self.ascii_advances[ch as usize]
            } else {
                self.other_advances.get(&ch).copied().unwrap_or(0)
            };
            if advance == 0 {
                width += fallback;
            } else {
                width += f32::from(advance) * scale;
            }
        }
        width.max(0.0)
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
