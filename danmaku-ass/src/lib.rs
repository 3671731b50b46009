//! Danmaku ASS Library
//!
//! This library assembles converted comments into an Advanced SubStation
//! Alpha script: header, style table and one event line per comment.

pub mod document;
pub mod style;

pub use document::AssDocument;
pub use style::{FontStyles, Style, StyleConfig};

/// Result type for danmaku-ass operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmaku-ass operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No style for font size {0} and no medium fallback")]
    StyleResolution(u32),
}
