//! Converter configuration

use danmaku_ass::StyleConfig;
use danmaku_core::comment::Motion;
use danmaku_core::{Comment, DanmakuType, Resolution, WireComment};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Height in pixels of the text every lane is sized for (the medium bucket)
pub const DEFAULT_COMMENT_HEIGHT: f64 = 52.0;

/// On-screen duration of a comment in seconds.
///
/// Negative or NaN results are treated as zero.
#[derive(Clone)]
pub struct DurationFn(Arc<dyn Fn(&Comment) -> f64 + Send + Sync>);

impl DurationFn {
    pub fn new(f: impl Fn(&Comment) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Every comment stays on screen for the same time
    pub fn fixed(seconds: f64) -> Self {
        Self::new(move |_| seconds)
    }

    /// Scrolling comments take `scrolling` seconds to cross the screen,
    /// stationary ones stay for `stationary` seconds
    pub fn by_kind(scrolling: f64, stationary: f64) -> Self {
        Self::new(move |comment| match comment.danmaku_type.motion() {
            Motion::Top | Motion::Bottom => stationary,
            Motion::Scrolling | Motion::Unsupported => scrolling,
        })
    }

    pub fn call(&self, comment: &Comment) -> f64 {
        (self.0)(comment)
    }
}

impl Default for DurationFn {
    fn default() -> Self {
        Self::by_kind(6.0, 4.0)
    }
}

impl fmt::Debug for DurationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DurationFn(..)")
    }
}

/// Caller-supplied predicate; returning false drops the comment
#[derive(Clone)]
pub struct CommentFilter(Arc<dyn Fn(&WireComment) -> bool + Send + Sync>);

impl CommentFilter {
    pub fn new(f: impl Fn(&WireComment) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, danmaku: &WireComment) -> bool {
        (self.0)(danmaku)
    }
}

impl fmt::Debug for CommentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CommentFilter(..)")
    }
}

/// An entry of the block list: a comment type, or every non-white comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockedType {
    Type(DanmakuType),
    Color,
}

impl FromStr for BlockedType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("color") {
            Ok(BlockedType::Color)
        } else {
            s.parse().map(BlockedType::Type)
        }
    }
}

impl fmt::Display for BlockedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockedType::Type(t) => write!(f, "{}", t),
            BlockedType::Color => f.write_str("color"),
        }
    }
}

/// What to do with a record whose `p` attribute does not decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Fail the whole conversion on the first malformed record
    #[default]
    Abort,
    /// Drop the record, log a warning and carry on
    Skip,
}

/// Converter configuration
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Script title
    pub title: String,
    /// Font family name
    pub font: String,
    /// Transparency from 0.0 (opaque) to 1.0
    pub alpha: f64,
    pub bold: bool,
    /// On-screen duration per comment
    pub duration: DurationFn,
    /// Types (and/or colored comments) to drop
    pub blocked_types: Vec<BlockedType>,
    /// Script resolution
    pub resolution: Resolution,
    /// Fraction of the screen height kept free at the bottom (0.0 - 1.0)
    pub bottom_margin: f64,
    /// Optional extra predicate applied after the block list
    pub extra_filter: Option<CommentFilter>,
    /// Handling of undecodable records
    pub malformed: MalformedPolicy,
    /// Drop track items that can no longer collide with later comments
    pub trim_tracks: bool,
    /// Text height the lanes are sized for, in pixels
    pub comment_height: f64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let style = StyleConfig::default();
        Self {
            title: "Danmaku".to_string(),
            font: style.font,
            alpha: style.alpha,
            bold: style.bold,
            duration: DurationFn::default(),
            blocked_types: Vec::new(),
            resolution: Resolution::default(),
            bottom_margin: 0.0,
            extra_filter: None,
            malformed: MalformedPolicy::default(),
            trim_tracks: true,
            comment_height: DEFAULT_COMMENT_HEIGHT,
        }
    }
}

impl ConverterConfig {
    /// Font settings for the style table
    pub fn style_config(&self) -> StyleConfig {
        StyleConfig {
            font: self.font.clone(),
            alpha: self.alpha,
            bold: self.bold,
        }
    }

    pub fn is_blocked(&self, blocked: BlockedType) -> bool {
        self.blocked_types.contains(&blocked)
    }
}
