//! Comment records: the base comment and its wire/output specializations

use std::fmt;
use std::str::FromStr;

/// Decimal color value of a plain white comment
pub const WHITE: u32 = 0xFF_FFFF;

/// Position tag that parks a comment outside the visible area
pub const OFF_SCREEN_TAG: &str = "\\pos(0,-999)";

/// Danmaku type codes as they appear in the wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DanmakuType {
    Normal = 1,
    Normal2 = 2,
    Normal3 = 3,
    Bottom = 4,
    Top = 5,
    Reversed = 6,
    Special = 7,
    Special2 = 8,
}

/// How a comment moves on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Slides right to left across a horizontal lane
    Scrolling,
    /// Fixed, stacked downwards from the top edge
    Top,
    /// Fixed, stacked upwards from the bottom edge
    Bottom,
    /// Advanced comments that are never placed on screen
    Unsupported,
}

impl DanmakuType {
    /// All types in code order
    pub const ALL: [DanmakuType; 8] = [
        DanmakuType::Normal,
        DanmakuType::Normal2,
        DanmakuType::Normal3,
        DanmakuType::Bottom,
        DanmakuType::Top,
        DanmakuType::Reversed,
        DanmakuType::Special,
        DanmakuType::Special2,
    ];

    /// Looks up a type by its wire code
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.code() as i64 == code)
    }

    /// Returns the wire code of this type
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns the motion class used for lane allocation.
    ///
    /// Reversed comments scroll in the normal direction.
    pub fn motion(self) -> Motion {
        match self {
            DanmakuType::Normal
            | DanmakuType::Normal2
            | DanmakuType::Normal3
            | DanmakuType::Reversed => Motion::Scrolling,
            DanmakuType::Top => Motion::Top,
            DanmakuType::Bottom => Motion::Bottom,
            DanmakuType::Special | DanmakuType::Special2 => Motion::Unsupported,
        }
    }

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            DanmakuType::Normal => "normal",
            DanmakuType::Normal2 => "normal2",
            DanmakuType::Normal3 => "normal3",
            DanmakuType::Bottom => "bottom",
            DanmakuType::Top => "top",
            DanmakuType::Reversed => "reversed",
            DanmakuType::Special => "special",
            DanmakuType::Special2 => "special2",
        }
    }
}

impl fmt::Display for DanmakuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DanmakuType {
    type Err = String;

    /// Accepts either the lowercase name or the numeric wire code
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Self::from_code(code).ok_or_else(|| format!("unknown danmaku type code {code}"));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown danmaku type '{s}'"))
    }
}

/// Font size bucket from the wire format (18, 25, 30, 36 or 45)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontSize(pub u32);

impl FontSize {
    pub const SMALL: FontSize = FontSize(18);
    pub const MEDIUM: FontSize = FontSize(25);
    pub const LARGE: FontSize = FontSize(30);
    pub const LARGER: FontSize = FontSize(36);
    pub const EXTRA_LARGE: FontSize = FontSize(45);

    /// Known buckets in ascending order
    pub const BUCKETS: [FontSize; 5] = [
        FontSize::SMALL,
        FontSize::MEDIUM,
        FontSize::LARGE,
        FontSize::LARGER,
        FontSize::EXTRA_LARGE,
    ];

    /// Rendered pixel size in output space, `None` for unknown buckets
    pub fn known_pixel_size(self) -> Option<u32> {
        match self.0 {
            18 => Some(36),
            25 => Some(52),
            30 => Some(64),
            36 => Some(72),
            45 => Some(90),
            _ => None,
        }
    }

    /// Rendered pixel size, unknown buckets render like the medium bucket
    pub fn pixel_size(self) -> u32 {
        self.known_pixel_size()
            .or_else(|| FontSize::MEDIUM.known_pixel_size())
            .unwrap_or(52)
    }
}

impl fmt::Display for FontSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single timed comment
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comment {
    /// Comment body
    pub content: String,
    /// Start time on the video timeline in seconds (never negative)
    pub start_time: f64,
    /// Type code
    pub danmaku_type: DanmakuType,
    /// Font size bucket
    pub font_size: FontSize,
    /// 24-bit RGB color
    pub color: u32,
}

impl Comment {
    /// Creates a new comment
    pub fn new(
        content: impl Into<String>,
        start_time: f64,
        danmaku_type: DanmakuType,
        font_size: FontSize,
        color: u32,
    ) -> Self {
        Self {
            content: content.into(),
            start_time,
            danmaku_type,
            font_size,
            color,
        }
    }

    pub fn is_white(&self) -> bool {
        self.color == WHITE
    }
}

/// A comment decoded from the XML wire format
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WireComment {
    pub comment: Comment,
    /// Unix timestamp at which the comment was sent
    pub send_timestamp: i64,
    /// Comment pool (0 = normal, 1 = subtitle, 2 = special)
    pub pool_id: i64,
    /// Hash identifying the sender
    pub origin_hash: String,
    /// Row id of the comment
    pub sequence_id: u64,
    /// The original `p` attribute, kept verbatim for re-serialization
    pub raw_p: String,
}

impl std::ops::Deref for WireComment {
    type Target = Comment;

    fn deref(&self) -> &Comment {
        &self.comment
    }
}

/// A comment ready for the subtitle script, with its computed tags
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputComment {
    /// The comment with its content already escaped for the script
    pub comment: Comment,
    /// End time in seconds
    pub end_time: f64,
    /// Motion or position override tag
    pub position_tag: String,
    /// Color override tag, empty for white comments
    pub color_tag: String,
}

impl OutputComment {
    /// Creates a new output comment
    pub fn new(comment: Comment, end_time: f64, position_tag: String, color_tag: String) -> Self {
        Self {
            comment,
            end_time,
            position_tag,
            color_tag,
        }
    }

    /// Returns true if the comment was placed off screen
    pub fn is_off_screen(&self) -> bool {
        self.position_tag == OFF_SCREEN_TAG
    }
}

impl std::ops::Deref for OutputComment {
    type Target = Comment;

    fn deref(&self) -> &Comment {
        &self.comment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        for t in DanmakuType::ALL {
            assert_eq!(DanmakuType::from_code(t.code() as i64), Some(t));
        }
        assert_eq!(DanmakuType::from_code(0), None);
        assert_eq!(DanmakuType::from_code(9), None);
    }

    #[test]
    fn test_motion_classes() {
        assert_eq!(DanmakuType::Normal3.motion(), Motion::Scrolling);
        assert_eq!(DanmakuType::Reversed.motion(), Motion::Scrolling);
        assert_eq!(DanmakuType::Top.motion(), Motion::Top);
        assert_eq!(DanmakuType::Bottom.motion(), Motion::Bottom);
        assert_eq!(DanmakuType::Special2.motion(), Motion::Unsupported);
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("top".parse::<DanmakuType>().unwrap(), DanmakuType::Top);
        assert_eq!("4".parse::<DanmakuType>().unwrap(), DanmakuType::Bottom);
        assert_eq!("Reversed".parse::<DanmakuType>().unwrap(), DanmakuType::Reversed);
        assert!("sideways".parse::<DanmakuType>().is_err());
        assert!("12".parse::<DanmakuType>().is_err());
    }

    #[test]
    fn test_font_size_pixels() {
        assert_eq!(FontSize::SMALL.pixel_size(), 36);
        assert_eq!(FontSize::LARGER.pixel_size(), 72);
        assert_eq!(FontSize(99).pixel_size(), 52);
        assert_eq!(FontSize(99).known_pixel_size(), None);
    }
}
