//! Style table: one named style per font size bucket

use crate::{Error, Result};
use danmaku_core::FontSize;
use std::collections::BTreeMap;

/// Format line of the `[V4+ Styles]` section
pub const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

/// Font settings shared by every style
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    /// Font family name
    pub font: String,
    /// Transparency from 0.0 (opaque) to 1.0 (invisible)
    pub alpha: f64,
    pub bold: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font: "Microsoft YaHei".to_string(),
            alpha: 0.4,
            bold: false,
        }
    }
}

impl StyleConfig {
    /// Alpha as the two-digit uppercase hex byte used in ASS colours
    pub fn alpha_hex(&self) -> String {
        format!("{:02X}", (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

/// A single named style
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub name: String,
    pub font: String,
    pub font_size: u32,
    pub alpha_hex: String,
    pub bold: bool,
}

impl Style {
    /// Renders the `Style:` line.
    ///
    /// White fill, black outline 1.2, no shadow, centered (alignment 5) so
    /// that position tags address the text center.
    pub fn line(&self) -> String {
        let a = &self.alpha_hex;
        format!(
            "Style: {},{},{},&H{a}FFFFFF,&H{a}FFFFFF,&H{a}000000,&H{a}000000,{},0,0,0,100,100,0,0,1,1.2,0,5,0,0,0,0",
            self.name,
            self.font,
            self.font_size,
            if self.bold { 1 } else { 0 },
        )
    }
}

/// Styles keyed by font size bucket, ordered by bucket
#[derive(Debug, Clone, Default)]
pub struct FontStyles {
    styles: BTreeMap<FontSize, Style>,
}

impl FontStyles {
    /// Builds the five standard styles for the given font settings
    pub fn standard(config: &StyleConfig) -> Self {
        let alpha_hex = config.alpha_hex();
        let styles = FontSize::BUCKETS
            .iter()
            .filter_map(|&size| {
                let name = bucket_name(size)?;
                let style = Style {
                    name: name.to_string(),
                    font: config.font.clone(),
                    font_size: size.known_pixel_size()?,
                    alpha_hex: alpha_hex.clone(),
                    bold: config.bold,
                };
                Some((size, style))
            })
            .collect();
        Self { styles }
    }

    /// Removes the style for a bucket
    pub fn remove(&mut self, size: FontSize) -> Option<Style> {
        self.styles.remove(&size)
    }

    /// Looks up the style for a bucket, falling back to the medium bucket
    pub fn resolve(&self, size: FontSize) -> Result<&Style> {
        self.styles
            .get(&size)
            .or_else(|| self.styles.get(&FontSize::MEDIUM))
            .ok_or(Error::StyleResolution(size.0))
    }

    /// Iterates styles in ascending bucket order
    pub fn iter(&self) -> impl Iterator<Item = (&FontSize, &Style)> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn bucket_name(size: FontSize) -> Option<&'static str> {
    match size {
        FontSize::SMALL => Some("Small"),
        FontSize::MEDIUM => Some("Medium"),
        FontSize::LARGE => Some("Large"),
        FontSize::LARGER => Some("Larger"),
        FontSize::EXTRA_LARGE => Some("ExtraLarge"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_hex() {
        let mut config = StyleConfig::default();
        config.alpha = 0.0;
        assert_eq!(config.alpha_hex(), "00");
        config.alpha = 1.0;
        assert_eq!(config.alpha_hex(), "FF");
        config.alpha = 0.4;
        assert_eq!(config.alpha_hex(), "66");
        config.alpha = 0.02;
        assert_eq!(config.alpha_hex(), "05");
    }

    #[test]
    fn test_standard_styles() {
        let config = StyleConfig {
            font: "Noto Sans".to_string(),
            alpha: 0.0,
            bold: true,
        };
        let styles = FontStyles::standard(&config);
        assert_eq!(styles.len(), 5);

        let sizes: Vec<u32> = styles.iter().map(|(_, s)| s.font_size).collect();
        assert_eq!(sizes, vec![36, 52, 64, 72, 90]);

        let medium = styles.resolve(FontSize::MEDIUM).unwrap();
        assert_eq!(
            medium.line(),
            "Style: Medium,Noto Sans,52,&H00FFFFFF,&H00FFFFFF,&H00000000,&H00000000,1,0,0,0,100,100,0,0,1,1.2,0,5,0,0,0,0"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_medium() {
        let styles = FontStyles::standard(&StyleConfig::default());
        assert_eq!(styles.resolve(FontSize(12)).unwrap().name, "Medium");
        assert_eq!(styles.resolve(FontSize::LARGER).unwrap().name, "Larger");
    }

    #[test]
    fn test_resolve_without_medium_fails() {
        let mut styles = FontStyles::standard(&StyleConfig::default());
        styles.remove(FontSize::MEDIUM);
        assert!(styles.resolve(FontSize::SMALL).is_ok());
        assert!(matches!(
            styles.resolve(FontSize(12)),
            Err(Error::StyleResolution(12))
        ));
    }
}
