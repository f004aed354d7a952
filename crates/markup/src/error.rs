//! Error types for source loading, tokenization and structural validation.
//!
//! Every parse error carries the span of the offending construct. Errors are
//! fatal for the parse that raised them.

use crate::span::Span;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Unmatched `<`.
    Bracket,
    /// Empty tag body, unparsable name or attributes, duplicate attribute.
    Grammar,
    /// Comment, conditional comment, CDATA or raw-text section without its
    /// terminator.
    Unterminated,
    /// Open/close balance violations.
    Structural,
    /// Rejected by a filter stage.
    Filter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseErrorCode {
    NoMatchingCloseBracket,
    EmptyTag,
    MalformedTag,
    DuplicateAttribute,
    UnclosedComment,
    UnclosedConditionalComment,
    UnclosedCdata,
    UnclosedRawText,
    UnmatchedCloseTag,
    MismatchedCloseTag,
    UnclosedTag,
    InvalidRemoveRegion,
}

impl ParseErrorCode {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::NoMatchingCloseBracket => ErrorCategory::Bracket,
            Self::EmptyTag | Self::MalformedTag | Self::DuplicateAttribute => {
                ErrorCategory::Grammar
            }
            Self::UnclosedComment
            | Self::UnclosedConditionalComment
            | Self::UnclosedCdata
            | Self::UnclosedRawText => ErrorCategory::Unterminated,
            Self::UnmatchedCloseTag | Self::MismatchedCloseTag | Self::UnclosedTag => {
                ErrorCategory::Structural
            }
            Self::InvalidRemoveRegion => ErrorCategory::Filter,
        }
    }

    /// Stable kebab-case name, used by fixtures and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMatchingCloseBracket => "no-matching-close-bracket",
            Self::EmptyTag => "empty-tag",
            Self::MalformedTag => "malformed-tag",
            Self::DuplicateAttribute => "duplicate-attribute",
            Self::UnclosedComment => "unclosed-comment",
            Self::UnclosedConditionalComment => "unclosed-conditional-comment",
            Self::UnclosedCdata => "unclosed-cdata",
            Self::UnclosedRawText => "unclosed-raw-text",
            Self::UnmatchedCloseTag => "unmatched-close-tag",
            Self::MismatchedCloseTag => "mismatched-close-tag",
            Self::UnclosedTag => "unclosed-tag",
            Self::InvalidRemoveRegion => "invalid-remove-region",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no matching close bracket for '<' at {span}")]
    NoMatchingCloseBracket { span: Span },
    #[error("empty tag '<>' at {span}")]
    EmptyTag { span: Span },
    #[error("malformed tag at {span}: {reason}")]
    MalformedTag { reason: &'static str, span: Span },
    #[error("attribute '{key}' found twice in tag at {span}")]
    DuplicateAttribute { key: String, span: Span },
    #[error("unclosed comment starting at {span}")]
    UnclosedComment { span: Span },
    #[error("unclosed conditional comment starting at {span}")]
    UnclosedConditionalComment { span: Span },
    #[error("unclosed CDATA section starting at {span}")]
    UnclosedCdata { span: Span },
    #[error("raw-text element <{name}> at {span} is not closed")]
    UnclosedRawText { name: String, span: Span },
    #[error("close tag </{name}> at {span} has no matching open tag")]
    UnmatchedCloseTag { name: String, span: Span },
    #[error(
        "close tag </{close}> at {close_span} does not match open tag <{open}> at {open_span}"
    )]
    MismatchedCloseTag {
        open: String,
        open_span: Span,
        close: String,
        close_span: Span,
    },
    #[error("tag <{name}> at {span} did not have a close tag")]
    UnclosedTag { name: String, span: Span },
    #[error("invalid remove region at {span}: {reason}")]
    InvalidRemoveRegion { reason: &'static str, span: Span },
}

impl ParseError {
    pub fn code(&self) -> ParseErrorCode {
        match self {
            Self::NoMatchingCloseBracket { .. } => ParseErrorCode::NoMatchingCloseBracket,
            Self::EmptyTag { .. } => ParseErrorCode::EmptyTag,
            Self::MalformedTag { .. } => ParseErrorCode::MalformedTag,
            Self::DuplicateAttribute { .. } => ParseErrorCode::DuplicateAttribute,
            Self::UnclosedComment { .. } => ParseErrorCode::UnclosedComment,
            Self::UnclosedConditionalComment { .. } => ParseErrorCode::UnclosedConditionalComment,
            Self::UnclosedCdata { .. } => ParseErrorCode::UnclosedCdata,
            Self::UnclosedRawText { .. } => ParseErrorCode::UnclosedRawText,
            Self::UnmatchedCloseTag { .. } => ParseErrorCode::UnmatchedCloseTag,
            Self::MismatchedCloseTag { .. } => ParseErrorCode::MismatchedCloseTag,
            Self::UnclosedTag { .. } => ParseErrorCode::UnclosedTag,
            Self::InvalidRemoveRegion { .. } => ParseErrorCode::InvalidRemoveRegion,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// The offending span. For a mismatched close tag this is the close tag.
    pub fn span(&self) -> Span {
        match self {
            Self::NoMatchingCloseBracket { span }
            | Self::EmptyTag { span }
            | Self::MalformedTag { span, .. }
            | Self::DuplicateAttribute { span, .. }
            | Self::UnclosedComment { span }
            | Self::UnclosedConditionalComment { span }
            | Self::UnclosedCdata { span }
            | Self::UnclosedRawText { span, .. }
            | Self::UnmatchedCloseTag { span, .. }
            | Self::UnclosedTag { span, .. }
            | Self::InvalidRemoveRegion { span, .. } => *span,
            Self::MismatchedCloseTag { close_span, .. } => *close_span,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read markup source")]
    Read(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("markup must start with an XML declaration that names its encoding")]
    MissingXmlDeclaration,
}

impl MarkupError {
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}
