//! Danmaku Converter Library
//!
//! This library turns a danmaku wire document into time-ordered subtitle
//! events, placing every comment on a lane where it cannot collide with the
//! comments already on screen.

pub mod config;
pub mod converter;
pub mod metrics;
pub mod track;

pub use config::{BlockedType, CommentFilter, ConverterConfig, DurationFn, MalformedPolicy};
pub use converter::{convert_color, Conversion, ConversionReport, DanmakuConverter};
pub use metrics::{EstimatedMetrics, GlyphMetrics, TextMetrics, TextSize};
pub use track::{Allocation, Axis, Directive, TrackAllocator};

/// Result type for danmaku-converter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for danmaku-converter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Danmaku core error: {0}")]
    Core(#[from] danmaku_core::Error),

    #[error("ASS error: {0}")]
    Ass(#[from] danmaku_ass::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Font error: {0}")]
    Font(String),
}
