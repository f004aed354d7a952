//! Streaming tokenizer and tag-balance validator for template markup.
//!
//! The pipeline is pull-based. A [`parser::MarkupParser`] pulls events
//! through a [`filter::FilterChain`]. The chain pulls from a
//! [`tokenizer::Tokenizer`], which reads a fully decoded
//! [`source::CharSource`]. All per-document state lives in a
//! [`context::DocumentParseContext`] owned by the parse.

pub mod balance;
pub mod context;
pub mod document;
pub mod entities;
pub mod error;
pub mod filter;
pub mod parser;
pub mod source;
pub mod span;
pub mod tag;
pub mod token_fmt;
pub mod tokenizer;

pub use balance::{TagBalanceValidator, TagStack, VOID_ELEMENTS, is_void_element};
pub use context::{Counters, DocumentParseContext};
pub use document::{ComponentTag, Markup, MarkupElement};
pub use error::{ErrorCategory, MarkupError, ParseError, ParseErrorCode, SourceError};
pub use filter::{EventSource, FilterAction, FilterChain, MarkupFilter};
pub use parser::{MarkupParser, MarkupSettings, parse_file, parse_str};
pub use source::CharSource;
pub use span::Span;
pub use tag::{AttributeMap, DraftTag, FrozenTag, Tag, TagId, TagKind};
pub use token_fmt::{format_element, format_event, format_markup_error, format_parse_error};
pub use tokenizer::{EventKind, MarkupEvent, Tokenizer, TokenizerConfig, tokenize};
