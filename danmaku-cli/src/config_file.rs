//! JSON configuration file

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Converter settings read from `--config`; command-line flags take precedence
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub title: Option<String>,
    pub font: Option<String>,
    pub alpha: Option<f64>,
    pub bold: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bottom_margin: Option<f64>,
    pub scroll_duration: Option<f64>,
    pub stationary_duration: Option<f64>,
    /// Type names, numeric codes or `color`
    pub block: Vec<String>,
    pub font_file: Option<PathBuf>,
    pub skip_malformed: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial() {
        let config =
            ConfigFile::parse(r#"{"font": "Noto Sans", "block": ["top", "color"]}"#).unwrap();
        assert_eq!(config.font.as_deref(), Some("Noto Sans"));
        assert_eq!(config.block, vec!["top", "color"]);
        assert_eq!(config.width, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ConfigFile::parse(r#"{"colour": "blue"}"#).is_err());
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(ConfigFile::parse("{}").unwrap(), ConfigFile::default());
    }
}
