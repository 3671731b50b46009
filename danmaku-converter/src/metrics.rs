//! Text metrics: rendered size of a comment in output-space pixels

use crate::{Error, Result};
use danmaku_core::FontSize;
use fontdue::{Font, FontSettings};
use std::path::Path;

/// Rendered size of a piece of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSize {
    pub width: f64,
    pub height: f64,
}

impl TextSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }
}

/// Measures rendered text. Must return the same size for the same input.
pub trait TextMetrics {
    fn measure(&self, content: &str, font_size: FontSize) -> TextSize;
}

/// Font-free estimate: wide (CJK, kana, Hangul, fullwidth, emoji) characters
/// advance a full em, everything else half an em.
///
/// The reported height is the lane text height for every bucket.
#[derive(Debug, Clone)]
pub struct EstimatedMetrics {
    text_height: f64,
}

impl EstimatedMetrics {
    pub fn new(text_height: f64) -> Self {
        Self { text_height }
    }
}

impl Default for EstimatedMetrics {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMMENT_HEIGHT)
    }
}

impl TextMetrics for EstimatedMetrics {
    fn measure(&self, content: &str, font_size: FontSize) -> TextSize {
        let em = font_size.pixel_size() as f64;
        let width = content
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| if is_wide(c) { em } else { em / 2.0 })
            .sum();
        TextSize::new(width, self.text_height)
    }
}

/// Measures text with real glyph advances from a TrueType/OpenType font
pub struct GlyphMetrics {
    font: Font,
    text_height: f64,
}

impl GlyphMetrics {
    /// Loads a font from its bytes
    pub fn from_bytes(bytes: Vec<u8>, text_height: f64) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self { font, text_height })
    }

    /// Loads a font file
    pub fn open(path: &Path, text_height: f64) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;
        Ok(Self { font, text_height })
    }
}

impl TextMetrics for GlyphMetrics {
    fn measure(&self, content: &str, font_size: FontSize) -> TextSize {
        let px = font_size.pixel_size() as f32;
        let width: f32 = content
            .chars()
            .filter(|c| !c.is_control())
            .map(|c| self.font.metrics(c, px).advance_width)
            .sum();
        TextSize::new(width as f64, self.text_height)
    }
}

impl std::fmt::Debug for GlyphMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphMetrics")
            .field("text_height", &self.text_height)
            .finish_non_exhaustive()
    }
}

/// Characters that render at full em width in typical CJK fonts
fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x1F900..=0x1F9FF
            | 0x20000..=0x3FFFD
    )
}
