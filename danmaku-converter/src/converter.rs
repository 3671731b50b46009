//! Conversion of a wire document into positioned subtitle events

use crate::config::{BlockedType, ConverterConfig, MalformedPolicy};
use crate::metrics::{EstimatedMetrics, TextMetrics};
use crate::track::TrackAllocator;
use crate::Result;
use danmaku_ass::{AssDocument, FontStyles};
use danmaku_core::comment::Motion;
use danmaku_core::text::to_script_text;
use danmaku_core::{Comment, OutputComment, WireComment, XmlDanmakuDocument, WHITE};
use tracing::{debug, info, warn};

/// Counts gathered over one conversion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionReport {
    /// Records in the input, including malformed ones
    pub total: usize,
    /// Comments placed on a lane
    pub displayed: usize,
    /// Comments parked off screen because every lane was taken
    pub off_screen: usize,
    /// Advanced comments, always parked off screen
    pub unsupported: usize,
    /// Comments dropped by the block list or the extra filter
    pub filtered: usize,
    /// Records skipped because they did not decode
    pub malformed: usize,
}

/// Output of a conversion run, comments in ascending start time
#[derive(Debug, Clone)]
pub struct Conversion {
    pub danmakus: Vec<OutputComment>,
    pub report: ConversionReport,
}

/// Converts wire documents using one configuration and text metrics oracle
pub struct DanmakuConverter {
    config: ConverterConfig,
    metrics: Box<dyn TextMetrics>,
}

impl DanmakuConverter {
    /// Creates a converter that estimates text widths without a font file
    pub fn new(config: ConverterConfig) -> Self {
        let metrics = EstimatedMetrics::new(config.comment_height);
        Self::with_metrics(config, metrics)
    }

    /// Creates a converter with the given text metrics oracle
    pub fn with_metrics(config: ConverterConfig, metrics: impl TextMetrics + 'static) -> Self {
        Self {
            config,
            metrics: Box::new(metrics),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Applies the block list, then the extra filter
    pub fn accepts(&self, danmaku: &WireComment) -> bool {
        if self.config.is_blocked(BlockedType::Type(danmaku.danmaku_type)) {
            return false;
        }
        if self.config.is_blocked(BlockedType::Color) && danmaku.color != WHITE {
            return false;
        }
        match &self.config.extra_filter {
            Some(filter) => filter.call(danmaku),
            None => true,
        }
    }

    /// Parses a wire document under the configured malformed-record policy.
    ///
    /// Returns the document and the number of skipped records.
    pub fn parse(&self, xml: &str) -> Result<(XmlDanmakuDocument, usize)> {
        match self.config.malformed {
            MalformedPolicy::Abort => Ok((XmlDanmakuDocument::parse(xml)?, 0)),
            MalformedPolicy::Skip => {
                let (document, rejected) = XmlDanmakuDocument::parse_lenient(xml)?;
                for error in &rejected {
                    warn!("skipping {}", error);
                }
                Ok((document, rejected.len()))
            }
        }
    }

    /// Parses and converts a wire document
    pub fn convert(&self, xml: &str) -> Result<Conversion> {
        let (document, malformed) = self.parse(xml)?;
        let mut conversion = self.convert_document(&document);
        conversion.report.malformed = malformed;
        conversion.report.total += malformed;
        Ok(conversion)
    }

    /// Converts decoded records.
    ///
    /// Records are processed in ascending start time (ties keep document
    /// order) against one fresh set of tracks.
    pub fn convert_document(&self, document: &XmlDanmakuDocument) -> Conversion {
        let mut ordered: Vec<&WireComment> = document.danmakus.iter().collect();
        ordered.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        let mut tracks = TrackAllocator::new(
            self.config.resolution,
            self.config.bottom_margin,
            self.config.comment_height,
        );
        debug!(lanes = tracks.geometry().lane_count, "lanes laid out");

        let mut report = ConversionReport {
            total: document.len(),
            ..Default::default()
        };
        let mut danmakus = Vec::with_capacity(ordered.len());

        for danmaku in ordered {
            if !self.accepts(danmaku) {
                report.filtered += 1;
                continue;
            }

            let content = to_script_text(&danmaku.content);
            let duration = self.config.duration.call(&danmaku.comment).max(0.0);
            if self.config.trim_tracks {
                tracks.trim_before(danmaku.start_time);
            }
            let size = self.metrics.measure(&content, danmaku.font_size);
            let allocation = tracks.allocate(&danmaku.comment, duration, size);

            if allocation.slot.is_some() {
                report.displayed += 1;
            } else if danmaku.danmaku_type.motion() == Motion::Unsupported {
                report.unsupported += 1;
            } else {
                report.off_screen += 1;
            }

            let comment = Comment {
                content,
                ..danmaku.comment.clone()
            };
            danmakus.push(OutputComment::new(
                comment,
                danmaku.start_time + duration,
                allocation.directive.to_string(),
                convert_color(danmaku.color),
            ));
        }

        info!(
            total = report.total,
            displayed = report.displayed,
            off_screen = report.off_screen,
            unsupported = report.unsupported,
            filtered = report.filtered,
            "conversion finished"
        );
        if report.off_screen > 0 {
            warn!(
                "{} comments did not fit on screen and were hidden",
                report.off_screen
            );
        }

        Conversion { danmakus, report }
    }

    /// Wraps converted comments into a subtitle document
    pub fn to_document(&self, conversion: Conversion) -> AssDocument {
        AssDocument::new(
            conversion.danmakus,
            self.config.title.clone(),
            FontStyles::standard(&self.config.style_config()),
            self.config.resolution,
        )
    }

    /// Parses and converts a wire document into a subtitle document
    pub fn convert_to_document(&self, xml: &str) -> Result<AssDocument> {
        Ok(self.to_document(self.convert(xml)?))
    }

    /// Parses and converts a wire document into script text
    pub fn convert_to_ass(&self, xml: &str) -> Result<String> {
        Ok(self.convert_to_document(xml)?.render()?)
    }
}

/// Color override tag: empty for white, otherwise `\c&HBBGGRR&`
pub fn convert_color(color: u32) -> String {
    if color == WHITE {
        return String::new();
    }
    let red = (color >> 16) & 0xFF;
    let green = (color >> 8) & 0xFF;
    let blue = color & 0xFF;
    format!("\\c&H{:02X}{:02X}{:02X}&", blue, green, red)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommentFilter, DurationFn};
    use danmaku_core::{DanmakuType, OFF_SCREEN_TAG};

    fn xml(records: &[(&str, &str)]) -> String {
        let body: String = records
            .iter()
            .map(|(p, content)| format!("<d p=\"{}\">{}</d>", p, content))
            .collect();
        format!("<?xml version=\"1.0\"?><i>{}</i>", body)
    }

    #[test]
    fn test_convert_color() {
        assert_eq!(convert_color(0xFFFFFF), "");
        assert_eq!(convert_color(0x0000FF), "\\c&HFF0000&");
        assert_eq!(convert_color(0xFF0000), "\\c&H0000FF&");
        assert_eq!(convert_color(0x12AB34), "\\c&H34AB12&");
        assert_eq!(convert_color(0), "\\c&H000000&");
    }

    #[test]
    fn test_color_block() {
        let config = ConverterConfig {
            blocked_types: vec![BlockedType::Color],
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[
            ("1,1,25,255,0,0,h,1", "blue"),
            ("2,1,25,16777215,0,0,h,2", "white"),
        ]);
        let conversion = converter.convert(&input).unwrap();
        assert_eq!(conversion.danmakus.len(), 1);
        assert_eq!(conversion.danmakus[0].content, "white");
        assert_eq!(conversion.report.filtered, 1);
    }

    #[test]
    fn test_type_block_and_extra_filter() {
        let config = ConverterConfig {
            blocked_types: vec![BlockedType::Type(DanmakuType::Top)],
            extra_filter: Some(CommentFilter::new(|d| !d.content.contains("spoiler"))),
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[
            ("1,5,25,16777215,0,0,h,1", "top"),
            ("2,1,25,16777215,0,0,h,2", "big spoiler"),
            ("3,4,25,16777215,0,0,h,3", "bottom"),
        ]);
        let conversion = converter.convert(&input).unwrap();
        let contents: Vec<&str> = conversion.danmakus.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["bottom"]);
        assert_eq!(conversion.report.filtered, 2);
    }

    #[test]
    fn test_output_sorted_and_stable() {
        let converter = DanmakuConverter::new(ConverterConfig::default());
        let input = xml(&[
            ("5,1,25,16777215,0,0,h,1", "late"),
            ("1,1,25,16777215,0,0,h,2", "early a"),
            ("1,1,25,16777215,0,0,h,3", "early b"),
        ]);
        let conversion = converter.convert(&input).unwrap();
        let contents: Vec<&str> = conversion.danmakus.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["early a", "early b", "late"]);
    }

    #[test]
    fn test_content_escaped_and_tags() {
        let config = ConverterConfig {
            duration: DurationFn::fixed(5.0),
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[("3.5,5,25,255,0,0,h,1", "a{b}&amp;c")]);
        let conversion = converter.convert(&input).unwrap();
        let danmaku = &conversion.danmakus[0];
        assert_eq!(danmaku.content, "a｛b｝&c");
        assert_eq!(danmaku.end_time, 8.5);
        assert_eq!(danmaku.position_tag, "\\pos(960,30)");
        assert_eq!(danmaku.color_tag, "\\c&HFF0000&");
    }

    #[test]
    fn test_negative_duration_clamped() {
        let config = ConverterConfig {
            duration: DurationFn::new(|_| -2.0),
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[("4,5,25,16777215,0,0,h,1", "gone")]);
        let conversion = converter.convert(&input).unwrap();
        let danmaku = &conversion.danmakus[0];
        assert_eq!(danmaku.end_time, 4.0);
        assert_eq!(danmaku.position_tag, "\\pos(960,30)");
    }

    #[test]
    fn test_special_routed_off_screen() {
        let converter = DanmakuConverter::new(ConverterConfig::default());
        let input = xml(&[("1,7,25,16777215,0,0,h,1", "[0,0,1]")]);
        let conversion = converter.convert(&input).unwrap();
        assert_eq!(conversion.danmakus[0].position_tag, OFF_SCREEN_TAG);
        assert_eq!(conversion.report.unsupported, 1);
        assert_eq!(conversion.report.off_screen, 0);
    }

    #[test]
    fn test_malformed_abort() {
        let converter = DanmakuConverter::new(ConverterConfig::default());
        let input = xml(&[("1,1,25,16777215,0,0,h,1", "ok"), ("1,1,25", "bad")]);
        let err = converter.convert(&input).err().unwrap();
        assert!(matches!(
            err,
            crate::Error::Core(danmaku_core::Error::Parse { index: 1, .. })
        ));
    }

    #[test]
    fn test_malformed_skip() {
        let config = ConverterConfig {
            malformed: MalformedPolicy::Skip,
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[
            ("1,1,25,16777215,0,0,h,1", "ok"),
            ("1,1,25", "bad"),
            ("2,42,25,16777215,0,0,h,3", "bad type"),
        ]);
        let conversion = converter.convert(&input).unwrap();
        assert_eq!(conversion.danmakus.len(), 1);
        assert_eq!(conversion.report.malformed, 2);
        assert_eq!(conversion.report.total, 3);
    }

    #[test]
    fn test_fresh_tracks_per_run() {
        let converter = DanmakuConverter::new(ConverterConfig::default());
        let input = xml(&[("0,1,25,16777215,0,0,h,1", "same")]);
        let first = converter.convert(&input).unwrap();
        let second = converter.convert(&input).unwrap();
        assert_eq!(first.danmakus, second.danmakus);
    }

    #[test]
    fn test_convert_to_ass() {
        let config = ConverterConfig {
            title: "Episode 1".to_string(),
            ..Default::default()
        };
        let converter = DanmakuConverter::new(config);
        let input = xml(&[("61.5,1,18,16777215,0,0,h,1", "hello")]);
        let script = converter.convert_to_ass(&input).unwrap();
        assert!(script.contains("Title: Episode 1"));
        assert!(script.ends_with(
            "Dialogue: 0,0:01:01.50,0:01:07.50,Small,,0,0,0,,{\\move(1965,30,-45,30,0,6000)}hello"
        ));
    }
}
