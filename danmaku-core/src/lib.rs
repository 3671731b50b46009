//! Danmaku Core Library
//!
//! This library provides the comment records, the strict XML wire decoder and
//! the timecode/markup helpers shared by the danmaku converter crates.

pub mod comment;
pub mod text;
pub mod timecode;
pub mod wire;

pub use comment::{
    Comment, DanmakuType, FontSize, Motion, OutputComment, WireComment, OFF_SCREEN_TAG, WHITE,
};
pub use timecode::seconds_to_timecode;
pub use wire::XmlDanmakuDocument;

/// Result type for danmaku-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmaku-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Malformed record {index}: {reason}")]
    Parse { index: usize, reason: String },

    #[error("Invalid danmaku type {value} in record {index}")]
    InvalidType { index: usize, value: i64 },
}

impl Error {
    /// Zero-based index of the offending record, if the error concerns one
    pub fn record_index(&self) -> Option<usize> {
        match self {
            Error::Parse { index, .. } | Error::InvalidType { index, .. } => Some(*index),
            Error::Xml(_) => None,
        }
    }

    /// Returns true for errors that concern a single record rather than the whole document
    pub fn is_record_error(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::InvalidType { .. })
    }
}

/// Output script resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}
