use std::collections::HashMap;

use thiserror::Error;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Owns the loaded fonts, keyed by family name.
///
/// Fonts are immutable after loading. Family lookups are case-insensitive,
/// so a scene asking for `"arial"` finds a font registered as `"Arial"`.
/// An unknown family resolves to the first loaded font.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
    families: HashMap<String, FontId>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new(), families: HashMap::new() }
    }

    /// Parses a TrueType or OpenType font from raw bytes and registers it
    /// under `family`. Registering the same family again replaces the mapping.
    pub fn load_font(&mut self, family: &str, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        self.families.insert(family_key(family), id);
        log::debug!("registered font family {family:?} as {id:?}");
        Ok(id)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Registered family names, in no particular order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    /// Returns the font registered for `family`, if any.
    pub fn lookup(&self, family: &str) -> Option<FontId> {
        self.families.get(&family_key(family)).copied()
    }

    /// Returns the font for `family`, falling back to the first loaded font.
    ///
    /// `None` only when no font has been loaded at all.
    pub fn resolve(&self, family: &str) -> Option<FontId> {
        if let Some(id) = self.lookup(family) {
            return Some(id);
        }
        if self.fonts.is_empty() {
            return None;
        }
        log::warn!("font family {family:?} is not loaded, falling back to the default font");
        Some(FontId(0))
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

fn family_key(family: &str) -> String {
    family.trim().to_lowercase()
}
