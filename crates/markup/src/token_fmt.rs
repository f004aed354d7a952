//! Deterministic one-line rendering of events, markup elements and errors
//! for golden tests and the CLI.
//!
//! Attributes are printed in encounter order; text is escaped so every line
//! stays a single line.

use crate::document::MarkupElement;
use crate::error::{MarkupError, ParseError};
use crate::source::CharSource;
use crate::tokenizer::MarkupEvent;
use std::fmt::Write;

pub fn format_event(event: &MarkupEvent, source: &CharSource) -> String {
    let mut out = String::new();
    match event {
        MarkupEvent::Tag(tag) => {
            out.push_str(tag.kind().as_str());
            out.push(' ');
            out.push_str(&tag.qualified_name());
            for (key, value) in tag.attributes().iter() {
                out.push(' ');
                out.push_str(key);
                if let Some(value) = value {
                    let _ = write!(&mut out, "=\"{}\"", escape_text(value));
                }
            }
        }
        other => {
            let span = other.span();
            let _ = write!(
                &mut out,
                "{} \"{}\"",
                other.kind().as_str(),
                escape_text(source.slice(span.start, span.end))
            );
        }
    }
    out
}

/// `RAW "text"` or `TAG "<markup>"`, with ` no-close` appended for
/// implicitly closed component tags.
pub fn format_element(element: &MarkupElement) -> String {
    match element {
        MarkupElement::Raw(text) => format!("RAW \"{}\"", escape_text(text)),
        MarkupElement::Tag(component) => {
            let mut out = format!("TAG \"{}\"", escape_text(&component.tag.to_markup()));
            if component.no_close_tag {
                out.push_str(" no-close");
            }
            out
        }
    }
}

pub fn format_parse_error(err: &ParseError) -> String {
    format!("ERROR {} at {}", err.code().as_str(), err.span())
}

pub fn format_markup_error(err: &MarkupError) -> String {
    match err {
        MarkupError::Parse(err) => format_parse_error(err),
        MarkupError::MissingXmlDeclaration => "ERROR missing-xml-declaration".to_string(),
        MarkupError::Source(err) => format!("ERROR source {err}"),
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_text_keeps_lines_single() {
        assert_eq!(escape_text("a\"b\\c\n\t\u{1}"), "a\\\"b\\\\c\\n\\t\\u{01}");
    }

    #[test]
    fn error_lines_carry_code_and_position() {
        let err = ParseError::UnclosedComment {
            span: crate::span::Span::new(4, 14, 1, 5),
        };
        assert_eq!(format_parse_error(&err), "ERROR unclosed-comment at line 1, column 5");
        assert_eq!(
            format_markup_error(&MarkupError::MissingXmlDeclaration),
            "ERROR missing-xml-declaration"
        );
    }
}
