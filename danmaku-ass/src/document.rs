//! ASS script assembly

use crate::style::{FontStyles, STYLE_FORMAT};
use crate::Result;
use danmaku_core::{seconds_to_timecode, OutputComment, Resolution};
use std::io::Write;

/// Format line of the `[Events]` section
pub const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// A complete subtitle script: metadata, styles and time-ordered comments
#[derive(Debug, Clone)]
pub struct AssDocument {
    pub danmakus: Vec<OutputComment>,
    pub title: String,
    pub styles: FontStyles,
    pub resolution: Resolution,
}

impl AssDocument {
    /// Creates a new document
    pub fn new(
        danmakus: Vec<OutputComment>,
        title: impl Into<String>,
        styles: FontStyles,
        resolution: Resolution,
    ) -> Self {
        Self {
            danmakus,
            title: title.into(),
            styles,
            resolution,
        }
    }

    /// Renders the header: script info, style table and event format
    pub fn header(&self) -> String {
        let mut lines = vec![
            "[Script Info]".to_string(),
            "; Script generated by danmaku2ass".to_string(),
            format!("Title: {}", self.title),
            "ScriptType: v4.00+".to_string(),
            format!("PlayResX: {}", self.resolution.width),
            format!("PlayResY: {}", self.resolution.height),
            "Timer: 10.0000".to_string(),
            "WrapStyle: 2".to_string(),
            "ScaledBorderAndShadow: no".to_string(),
            String::new(),
            "[V4+ Styles]".to_string(),
            STYLE_FORMAT.to_string(),
        ];
        lines.extend(self.styles.iter().map(|(_, style)| style.line()));
        lines.push(String::new());
        lines.push("[Events]".to_string());
        lines.push(EVENT_FORMAT.to_string());
        lines.join("\n")
    }

    /// Renders one `Dialogue:` line, `None` when the comment has nothing to show
    pub fn event_line(&self, danmaku: &OutputComment) -> Result<Option<String>> {
        let text = format!(
            "{}{}{}",
            danmaku.position_tag, danmaku.color_tag, danmaku.content
        );
        if text.is_empty() {
            return Ok(None);
        }

        let style = self.styles.resolve(danmaku.font_size)?;
        Ok(Some(format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{{{}{}}}{}",
            seconds_to_timecode(danmaku.start_time),
            seconds_to_timecode(danmaku.end_time),
            style.name,
            danmaku.position_tag,
            danmaku.color_tag,
            danmaku.content
        )))
    }

    /// Renders the whole script
    pub fn render(&self) -> Result<String> {
        let mut events = Vec::with_capacity(self.danmakus.len());
        for danmaku in &self.danmakus {
            if let Some(line) = self.event_line(danmaku)? {
                events.push(line);
            }
        }
        Ok(format!("{}\n{}", self.header(), events.join("\n")))
    }

    /// Writes the rendered script to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.render()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
