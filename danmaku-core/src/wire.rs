//! XML wire format decoding and encoding
//!
//! A wire document holds `<d p="...">content</d>` elements. The `p` attribute
//! carries eight comma-separated fields:
//! `time,type,fontSize,color,sendTimestamp,poolId,originHash,sequenceId`.

use crate::comment::{Comment, DanmakuType, FontSize, WireComment, WHITE};
use crate::text::escape_markup;
use crate::{Error, Result};
use std::str::FromStr;

/// Number of comma-separated fields in the `p` attribute
pub const P_FIELD_COUNT: usize = 8;

/// Tag name of comment elements
const COMMENT_TAG: &str = "d";

/// Root tag written by [`XmlDanmakuDocument::to_xml`]
const ROOT_TAG: &str = "i";

/// A decoded wire document, records kept in source order
#[derive(Debug, Clone, Default)]
pub struct XmlDanmakuDocument {
    pub danmakus: Vec<WireComment>,
}

impl XmlDanmakuDocument {
    /// Creates a document from already decoded records
    pub fn new(danmakus: Vec<WireComment>) -> Self {
        Self { danmakus }
    }

    /// Parses a wire document, failing on the first malformed record
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let danmakus = comment_elements(&doc)
            .enumerate()
            .map(|(index, node)| decode_element(index, &node))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { danmakus })
    }

    /// Parses a wire document, collecting malformed records instead of failing.
    ///
    /// Only a document that is not well-formed XML is an error here.
    pub fn parse_lenient(xml: &str) -> Result<(Self, Vec<Error>)> {
        let doc = roxmltree::Document::parse(xml)?;
        let mut danmakus = Vec::new();
        let mut rejected = Vec::new();
        for (index, node) in comment_elements(&doc).enumerate() {
            match decode_element(index, &node) {
                Ok(danmaku) => danmakus.push(danmaku),
                Err(e) => rejected.push(e),
            }
        }
        Ok((Self { danmakus }, rejected))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.danmakus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.danmakus.is_empty()
    }

    /// Serializes the document back into the wire format
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<{}>\n", ROOT_TAG));
        for danmaku in &self.danmakus {
            out.push_str(&danmaku.to_xml());
            out.push('\n');
        }
        out.push_str(&format!("</{}>\n", ROOT_TAG));
        out
    }
}

impl WireComment {
    /// Decodes a record from its `p` attribute and escaped content.
    ///
    /// Every field is checked against its range; `index` is reported in errors.
    pub fn decode(index: usize, p: &str, content: impl Into<String>) -> Result<Self> {
        let fields: Vec<&str> = p.split(',').collect();
        if fields.len() != P_FIELD_COUNT {
            return Err(Error::Parse {
                index,
                reason: format!(
                    "expected {} fields in p attribute, found {}",
                    P_FIELD_COUNT,
                    fields.len()
                ),
            });
        }

        let start_time: f64 = parse_field(index, "time", fields[0])?;
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(Error::Parse {
                index,
                reason: format!("time must be a non-negative number, got {}", fields[0]),
            });
        }

        let type_code: i64 = parse_field(index, "type", fields[1])?;
        let danmaku_type = DanmakuType::from_code(type_code).ok_or(Error::InvalidType {
            index,
            value: type_code,
        })?;

        let font_size = FontSize(parse_field(index, "fontSize", fields[2])?);

        let color: u32 = parse_field(index, "color", fields[3])?;
        if color > WHITE {
            return Err(Error::Parse {
                index,
                reason: format!("color {} exceeds 24 bits", color),
            });
        }

        let send_timestamp = parse_field(index, "sendTimestamp", fields[4])?;
        let pool_id = parse_field(index, "poolId", fields[5])?;
        let origin_hash = fields[6].trim().to_string();
        let sequence_id = parse_field(index, "sequenceId", fields[7])?;

        Ok(Self {
            comment: Comment::new(content, start_time, danmaku_type, font_size, color),
            send_timestamp,
            pool_id,
            origin_hash,
            sequence_id,
            raw_p: p.to_string(),
        })
    }

    /// Serializes the record as a `<d>` element with its original `p` fields
    pub fn to_xml(&self) -> String {
        format!(
            "<{tag} p=\"{}\">{}</{tag}>",
            escape_markup(&self.raw_p).replace('"', "&quot;"),
            self.comment.content,
            tag = COMMENT_TAG
        )
    }
}

/// Iterates the comment elements that carry a `p` attribute, in document order
fn comment_elements<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    doc.descendants().filter(|n| {
        n.is_element() && n.tag_name().name() == COMMENT_TAG && n.attribute("p").is_some()
    })
}

/// Decodes one element. Content is kept in its escaped form, like inner markup.
fn decode_element(index: usize, node: &roxmltree::Node) -> Result<WireComment> {
    let p = node.attribute("p").unwrap_or_default();
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    WireComment::decode(index, p, escape_markup(&text))
}

fn parse_field<T: FromStr>(index: usize, name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::Parse {
        index,
        reason: format!("invalid {} field '{}'", name, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<i>
  <chatserver>chat.bilibili.com</chatserver>
  <d p="12.5,1,25,16777215,1600000000,0,abcd1234,42">first &amp; best</d>
  <d p="3.25,5,18,255,1600000001,0,ffff0000,43">top {note}</d>
  <d>no attribute, ignored</d>
</i>"#;

    #[test]
    fn test_parse_document() {
        let doc = XmlDanmakuDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.len(), 2);

        let first = &doc.danmakus[0];
        assert_eq!(first.start_time, 12.5);
        assert_eq!(first.danmaku_type, DanmakuType::Normal);
        assert_eq!(first.font_size, FontSize::MEDIUM);
        assert!(first.is_white());
        assert_eq!(first.content, "first &amp; best");
        assert_eq!(first.origin_hash, "abcd1234");
        assert_eq!(first.sequence_id, 42);

        let second = &doc.danmakus[1];
        assert_eq!(second.danmaku_type, DanmakuType::Top);
        assert_eq!(second.color, 255);
        assert_eq!(second.content, "top {note}");
    }

    #[test]
    fn test_wrong_field_count() {
        let err = WireComment::decode(3, "1.0,1,25,0", "x").unwrap_err();
        assert!(matches!(err, Error::Parse { index: 3, .. }));
    }

    #[test]
    fn test_non_numeric_field() {
        let err = WireComment::decode(0, "abc,1,25,0,0,0,h,1", "x").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        let err = WireComment::decode(0, "1.0,1,25,0x00,0,0,h,1", "x").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_out_of_range_fields() {
        assert!(WireComment::decode(0, "-1.0,1,25,0,0,0,h,1", "x").is_err());
        assert!(WireComment::decode(0, "1.0,1,25,16777216,0,0,h,1", "x").is_err());
    }

    #[test]
    fn test_invalid_type() {
        let err = WireComment::decode(7, "1.0,9,25,0,0,0,h,1", "x").unwrap_err();
        assert!(matches!(err, Error::InvalidType { index: 7, value: 9 }));
    }

    #[test]
    fn test_strict_parse_fails_on_bad_record() {
        let xml = r#"<i><d p="1,1,25,0,0,0,h,1">ok</d><d p="broken">bad</d></i>"#;
        let err = XmlDanmakuDocument::parse(xml).unwrap_err();
        assert_eq!(err.record_index(), Some(1));
    }

    #[test]
    fn test_lenient_parse_collects_errors() {
        let xml = r#"<i><d p="1,1,25,0,0,0,h,1">ok</d><d p="broken">bad</d><d p="2,8,25,0,0,0,h,2">sp</d></i>"#;
        let (doc, rejected) = XmlDanmakuDocument::parse_lenient(xml).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].is_record_error());
    }

    #[test]
    fn test_malformed_xml() {
        let err = XmlDanmakuDocument::parse("<i><d p=\"1\">").unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
        assert!(!err.is_record_error());
    }

    #[test]
    fn test_to_xml_keeps_fields() {
        let doc = XmlDanmakuDocument::parse(SAMPLE).unwrap();
        let xml = doc.to_xml();
        assert!(xml.contains(r#"<d p="12.5,1,25,16777215,1600000000,0,abcd1234,42">first &amp; best</d>"#));

        let reparsed = XmlDanmakuDocument::parse(&xml).unwrap();
        assert_eq!(reparsed.danmakus, doc.danmakus);
    }
}
