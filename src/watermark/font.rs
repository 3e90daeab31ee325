//! Font resolution for watermark text.
//!
//! A [`FontBook`] turns a CSS family list such as `"Arial, sans-serif"` into
//! a concrete face. Lookup order per family:
//!
//! 1. System fonts through `fontdb` (opt-in, see [`FontBook::with_system_fonts`])
//! 2. A user-supplied fallback font file (opt-in)
//! 3. The embedded DejaVu Sans face, always available
//!
//! Without system lookup every family resolves to the same embedded face,
//! which keeps rendering byte-identical across machines.

use super::{Result, WatermarkError};
use ab_glyph::{Font, FontArc, FontVec, PxScale};
use fontdb::{Database, Family, Query};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// Embedded font data (DejaVu Sans, Bitstream Vera derived license).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");

static EMBEDDED_FONT: OnceLock<FontArc> = OnceLock::new();

/// The embedded fallback face, parsed once per process.
pub fn embedded_font() -> Result<FontArc> {
    if let Some(font) = EMBEDDED_FONT.get() {
        return Ok(font.clone());
    }

    let font = FontArc::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| WatermarkError::FontError(format!("embedded font: {}", e)))?;
    Ok(EMBEDDED_FONT.get_or_init(|| font).clone())
}

/// Scale at which one em of `font` spans `size_px` pixels.
///
/// `PxScale` measures ascent-to-descent height, while CSS font sizes
/// measure the em box.
pub fn em_scale(font: &FontArc, size_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(size_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(size_px),
    }
}

/// Split a CSS family list into unquoted family names.
pub fn parse_family_list(families: &str) -> Vec<String> {
    families
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves and caches font faces by family list.
pub struct FontBook {
    system: Option<Database>,
    fallback: Option<FontArc>,
    cache: RefCell<HashMap<String, FontArc>>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("system_faces", &self.system.as_ref().map(Database::len))
            .field("has_fallback", &self.fallback.is_some())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl FontBook {
    /// Font book that only knows the embedded face.
    pub fn new() -> Self {
        Self {
            system: None,
            fallback: None,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Enable lookup of installed system fonts.
    pub fn with_system_fonts(mut self) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "Loaded system fonts");
        self.system = Some(db);
        self.cache.borrow_mut().clear();
        self
    }

    /// Use the font file at `path` for families that cannot be resolved.
    pub fn with_fallback_file(mut self, path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            WatermarkError::FontError(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| {
            WatermarkError::FontError(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        self.fallback = Some(FontArc::new(font));
        self.cache.borrow_mut().clear();
        Ok(self)
    }

    /// Resolve a CSS family list to a face.
    pub fn resolve(&self, families: &str) -> Result<FontArc> {
        if let Some(font) = self.cache.borrow().get(families) {
            return Ok(font.clone());
        }

        let font = match self.lookup_system(families) {
            Some(font) => font,
            None => match &self.fallback {
                Some(font) => font.clone(),
                None => embedded_font()?,
            },
        };

        self.cache
            .borrow_mut()
            .insert(families.to_string(), font.clone());
        Ok(font)
    }

    fn lookup_system(&self, families: &str) -> Option<FontArc> {
        let db = self.system.as_ref()?;

        for name in parse_family_list(families) {
            let family = match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" => Family::SansSerif,
                "monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(&name),
            };

            let query = Query {
                families: &[family],
                ..Query::default()
            };

            let Some(id) = db.query(&query) else {
                continue;
            };

            let font = db.with_face_data(id, |data, index| {
                FontVec::try_from_vec_and_index(data.to_vec(), index).ok()
            });

            if let Some(Some(font)) = font {
                tracing::debug!(family = %name, "Resolved system font");
                return Some(FontArc::new(font));
            }

            tracing::debug!(family = %name, "System font face could not be parsed");
        }

        None
    }
}
