//! Pull tokenizer for template markup.
//!
//! The grammar is deliberately approximate: the tokenizer segments text into
//! tags, body text and `<!...>`/`<?...>` constructs without knowing anything
//! about element semantics beyond the configured raw-text containers.
//!
//! Tag names: optional `prefix:` then `[A-Za-z_][A-Za-z0-9_.-]*` (ASCII).
//! Attribute names: any run of characters other than whitespace, `=`, quotes,
//! `<`, `>` and `/`. Values may be double-quoted, single-quoted or bare and
//! are unescaped when stored.
//!
//! Raw-text containers (`script`, `style` by default) switch the tokenizer to
//! a skip mode in which everything up to the matching close tag is emitted
//! as one BODY event. A `script` whose `type` is not a JavaScript type is
//! tokenized normally so template fragments inside it stay visible.

use crate::context::DocumentParseContext;
use crate::error::ParseError;
use crate::source::CharSource;
use crate::span::Span;
use crate::tag::{AttributeMap, FrozenTag, Tag, TagKind};
use memchr::{memchr, memchr_iter};

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";
const CONDITIONAL_OPEN: &str = "<!--[if ";
const CONDITIONAL_CLOSE: &str = "]-->";
const DOWNLEVEL_ENDIF: &str = "<!--<![endif]-->";
const ENDIF_OPEN: &str = "<![endif]";
const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const DOCTYPE_OPEN: &str = "<!DOCTYPE";
const XML_DECLARATION: &str = "<?xml";

const JAVASCRIPT_TYPES: &[&str] = &["text/javascript", "application/javascript", "module"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Elements whose content is opaque text. Matched case-insensitively and
    /// only for tags without a namespace.
    pub raw_text_elements: Vec<String>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            raw_text_elements: vec!["script".to_string(), "style".to_string()],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Tag,
    Body,
    Comment,
    ConditionalComment,
    ConditionalCommentEndif,
    Cdata,
    ProcessingInstruction,
    Doctype,
    SpecialTag,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Tag => "TAG",
            EventKind::Body => "BODY",
            EventKind::Comment => "COMMENT",
            EventKind::ConditionalComment => "CONDITIONAL_COMMENT",
            EventKind::ConditionalCommentEndif => "CONDITIONAL_COMMENT_ENDIF",
            EventKind::Cdata => "CDATA",
            EventKind::ProcessingInstruction => "PROCESSING_INSTRUCTION",
            EventKind::Doctype => "DOCTYPE",
            EventKind::SpecialTag => "SPECIAL_TAG",
        }
    }
}

/// One tokenizer event. Everything except tags is a span into the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupEvent {
    Tag(Tag),
    Body(Span),
    Comment(Span),
    /// The `<!--[if ...]>` opener only; the content that follows is
    /// tokenized normally.
    ConditionalComment(Span),
    ConditionalCommentEndif(Span),
    Cdata(Span),
    ProcessingInstruction(Span),
    Doctype(Span),
    SpecialTag(Span),
}

impl MarkupEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MarkupEvent::Tag(_) => EventKind::Tag,
            MarkupEvent::Body(_) => EventKind::Body,
            MarkupEvent::Comment(_) => EventKind::Comment,
            MarkupEvent::ConditionalComment(_) => EventKind::ConditionalComment,
            MarkupEvent::ConditionalCommentEndif(_) => EventKind::ConditionalCommentEndif,
            MarkupEvent::Cdata(_) => EventKind::Cdata,
            MarkupEvent::ProcessingInstruction(_) => EventKind::ProcessingInstruction,
            MarkupEvent::Doctype(_) => EventKind::Doctype,
            MarkupEvent::SpecialTag(_) => EventKind::SpecialTag,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            MarkupEvent::Tag(tag) => tag.span(),
            MarkupEvent::Body(span)
            | MarkupEvent::Comment(span)
            | MarkupEvent::ConditionalComment(span)
            | MarkupEvent::ConditionalCommentEndif(span)
            | MarkupEvent::Cdata(span)
            | MarkupEvent::ProcessingInstruction(span)
            | MarkupEvent::Doctype(span)
            | MarkupEvent::SpecialTag(span) => *span,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            MarkupEvent::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn into_tag(self) -> Option<Tag> {
        match self {
            MarkupEvent::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct RawTextSkip {
    name: String,
    open_span: Span,
}

// Incremental line/column tracking. The cursor only moves forward, so
// walking from the last computed offset keeps the total work linear.
#[derive(Debug, Clone, Copy)]
struct LineTracker {
    offset: usize,
    line: usize,
    column: usize,
}

impl LineTracker {
    fn advance(&mut self, text: &str, to: usize) {
        let bytes = &text.as_bytes()[self.offset..to];
        let mut line_start = 0;
        let mut newlines = 0;
        for i in memchr_iter(b'\n', bytes) {
            newlines += 1;
            line_start = i + 1;
        }
        let chars = bytes[line_start..]
            .iter()
            .filter(|b| (**b & 0xC0) != 0x80)
            .count();
        if newlines > 0 {
            self.line += newlines;
            self.column = chars + 1;
        } else {
            self.column += chars;
        }
        self.offset = to;
    }
}

pub struct Tokenizer {
    source: CharSource,
    config: TokenizerConfig,
    pos: usize,
    marker: usize,
    current: Option<MarkupEvent>,
    skip: Option<RawTextSkip>,
    lines: LineTracker,
    doctype: Option<Span>,
    xml_encoding: Option<String>,
    failed: Option<ParseError>,
}

impl Tokenizer {
    pub fn new(source: CharSource, config: TokenizerConfig) -> Self {
        Self {
            source,
            config,
            pos: 0,
            marker: 0,
            current: None,
            skip: None,
            lines: LineTracker {
                offset: 0,
                line: 1,
                column: 1,
            },
            doctype: None,
            xml_encoding: None,
            failed: None,
        }
    }

    pub fn source(&self) -> &CharSource {
        &self.source
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Advances to the next event and returns its kind, or `None` at end of
    /// input. After an error every further call returns the same error.
    pub fn next(&mut self, ctx: &mut DocumentParseContext) -> Result<Option<EventKind>, ParseError> {
        Ok(self.next_event(ctx)?.map(|event| event.kind()))
    }

    /// Like [`Tokenizer::next`], but hands out the event itself.
    pub fn next_event(
        &mut self,
        ctx: &mut DocumentParseContext,
    ) -> Result<Option<MarkupEvent>, ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        match self.advance(ctx) {
            Ok(event) => {
                if let Some(event) = &event {
                    ctx.counters.events_emitted += 1;
                    log::trace!(target: "markup.tokenizer", "emit event: {event:?}");
                }
                self.current = event.clone();
                Ok(event)
            }
            Err(err) => {
                log::debug!(target: "markup.tokenizer", "tokenizer failed: {err}");
                self.current = None;
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn current(&self) -> Option<&MarkupEvent> {
        self.current.as_ref()
    }

    pub fn current_tag(&self) -> Option<&Tag> {
        self.current.as_ref().and_then(MarkupEvent::as_tag)
    }

    /// Raw source text of the current event.
    pub fn current_text(&self) -> Option<&str> {
        let span = self.current.as_ref()?.span();
        Some(self.source.slice(span.start, span.end))
    }

    /// Offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn position_marker(&self) -> usize {
        self.marker
    }

    /// Moves the marker; it may move backwards to widen a claimed span.
    pub fn set_position_marker(&mut self, pos: usize) {
        self.marker = pos.min(self.source.len());
    }

    pub fn mark_position(&mut self) {
        self.marker = self.pos;
    }

    /// Source text from the marker up to `to` (clamped to the input).
    pub fn input_from_marker(&self, to: usize) -> &str {
        let to = to.min(self.source.len());
        if to <= self.marker {
            return "";
        }
        self.source.slice(self.marker, to)
    }

    /// Verbatim `<!DOCTYPE ...>` text, once seen.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.map(|span| self.source.slice(span.start, span.end))
    }

    /// Encoding named by a leading `<?xml ... encoding="..."?>` declaration.
    /// Reported only; the input is already decoded.
    pub fn xml_encoding(&self) -> Option<&str> {
        self.xml_encoding.as_deref()
    }

    fn span(&mut self, start: usize, end: usize) -> Span {
        if start < self.lines.offset {
            return self.source.span(start, end);
        }
        self.lines.advance(self.source.as_str(), start);
        Span::new(start, end, self.lines.line, self.lines.column)
    }

    fn advance(&mut self, ctx: &mut DocumentParseContext) -> Result<Option<MarkupEvent>, ParseError> {
        if let Some(skip) = self.skip.take() {
            return self.skip_raw_text(skip).map(Some);
        }
        let len = self.source.len();
        if self.pos >= len {
            return Ok(None);
        }
        let start = self.pos;
        if self.source.byte_at(start) != Some(b'<') {
            let end = self.source.find_byte(b'<', start).unwrap_or(len);
            self.pos = end;
            return Ok(Some(MarkupEvent::Body(self.span(start, end))));
        }
        if start + 1 >= len {
            return Err(ParseError::NoMatchingCloseBracket {
                span: self.span(start, len),
            });
        }

        let rest = &self.source.as_str()[start..];
        let is_comment = rest.starts_with(COMMENT_OPEN);
        let is_endif = starts_with_ignore_ascii_case(rest, ENDIF_OPEN);
        let is_cdata = starts_with_ignore_ascii_case(rest, CDATA_OPEN);
        let is_doctype = starts_with_ignore_ascii_case(rest, DOCTYPE_OPEN);
        let is_xml_declaration = start == 0 && starts_with_ignore_ascii_case(rest, XML_DECLARATION);

        if is_comment {
            return self.comment_like(start).map(Some);
        }
        if is_endif {
            let end = self.require_close_bracket(start, true)?;
            self.pos = end;
            return Ok(Some(MarkupEvent::ConditionalCommentEndif(self.span(start, end))));
        }
        if is_cdata {
            let body = start + CDATA_OPEN.len();
            let Some(close) = self.source.find_str(CDATA_CLOSE, body) else {
                return Err(ParseError::UnclosedCdata {
                    span: self.span(start, len),
                });
            };
            let end = close + CDATA_CLOSE.len();
            self.pos = end;
            return Ok(Some(MarkupEvent::Cdata(self.span(start, end))));
        }

        let special = matches!(self.source.byte_at(start + 1), Some(b'!' | b'?'));
        let end = self.require_close_bracket(start, special)?;
        self.pos = end;
        let span = self.span(start, end);
        match self.source.byte_at(start + 1) {
            Some(b'?') => {
                if is_xml_declaration {
                    self.xml_encoding = declared_encoding(self.source.slice(start, end));
                }
                Ok(Some(MarkupEvent::ProcessingInstruction(span)))
            }
            Some(b'!') => {
                if is_doctype {
                    self.doctype = Some(span);
                    Ok(Some(MarkupEvent::Doctype(span)))
                } else {
                    Ok(Some(MarkupEvent::SpecialTag(span)))
                }
            }
            _ => self.tag(span, ctx).map(Some),
        }
    }

    // `<!--` constructs: conditional-comment openers, the downlevel endif
    // form, and plain comments.
    fn comment_like(&mut self, start: usize) -> Result<MarkupEvent, ParseError> {
        let len = self.source.len();
        let rest = &self.source.as_str()[start..];
        let is_downlevel_endif = starts_with_ignore_ascii_case(rest, DOWNLEVEL_ENDIF);
        let is_conditional = starts_with_ignore_ascii_case(rest, CONDITIONAL_OPEN);
        if is_downlevel_endif {
            let end = start + DOWNLEVEL_ENDIF.len();
            self.pos = end;
            return Ok(MarkupEvent::ConditionalCommentEndif(self.span(start, end)));
        }
        if is_conditional {
            if let Some(gt) = self.source.find_byte(b'>', start) {
                if self.source.byte_at(gt - 1) == Some(b']') {
                    if self.source.find_str(CONDITIONAL_CLOSE, gt + 1).is_none() {
                        return Err(ParseError::UnclosedConditionalComment {
                            span: self.span(start, gt + 1),
                        });
                    }
                    self.pos = gt + 1;
                    return Ok(MarkupEvent::ConditionalComment(self.span(start, gt + 1)));
                }
            }
        }
        // Searching from just after `<!` accepts the empty comment `<!-->`.
        let Some(close) = self.source.find_str(COMMENT_CLOSE, start + 2) else {
            return Err(ParseError::UnclosedComment {
                span: self.span(start, len),
            });
        };
        let end = close + COMMENT_CLOSE.len();
        self.pos = end;
        Ok(MarkupEvent::Comment(self.span(start, end)))
    }

    // Returns the offset just past the `>` that ends the construct at `start`.
    fn require_close_bracket(&mut self, start: usize, first: bool) -> Result<usize, ParseError> {
        let found = if first {
            self.source.find_byte(b'>', start)
        } else {
            self.source.find_out_of_quotes(b'>', start)
        };
        match found {
            Some(gt) => Ok(gt + 1),
            None => {
                let len = self.source.len();
                Err(ParseError::NoMatchingCloseBracket {
                    span: self.span(start, len),
                })
            }
        }
    }

    fn tag(&mut self, span: Span, ctx: &mut DocumentParseContext) -> Result<MarkupEvent, ParseError> {
        let inner = self.source.slice(span.start + 1, span.end - 1);
        if inner.is_empty() {
            return Err(ParseError::EmptyTag { span });
        }
        let (kind, body) = if let Some(body) = inner.strip_suffix('/') {
            (TagKind::OpenClose, body)
        } else if let Some(body) = inner.strip_prefix('/') {
            (TagKind::Close, body)
        } else {
            (TagKind::Open, inner)
        };

        let parsed = parse_tag_body(body, span)?;
        let text = self.source.slice(span.start, span.end).to_string();
        let tag = FrozenTag::parsed(
            ctx.allocate_tag_id(),
            parsed.name,
            parsed.namespace,
            kind,
            parsed.attributes,
            span,
            text,
        );
        if kind == TagKind::Open && self.is_raw_text_container(&tag) {
            log::debug!(
                target: "markup.tokenizer",
                "raw text mode for <{}> at {span}",
                tag.name()
            );
            self.skip = Some(RawTextSkip {
                name: tag.name().to_string(),
                open_span: span,
            });
        }
        Ok(MarkupEvent::Tag(Tag::Frozen(tag)))
    }

    fn is_raw_text_container(&self, tag: &FrozenTag) -> bool {
        if tag.namespace().is_some() {
            return false;
        }
        let name = tag.name();
        if !self
            .config
            .raw_text_elements
            .iter()
            .any(|raw| raw.eq_ignore_ascii_case(name))
        {
            return false;
        }
        if !name.eq_ignore_ascii_case("script") {
            return true;
        }
        match tag.attributes().get("type") {
            None => true,
            Some(ty) => {
                let ty = ty.trim().to_ascii_lowercase();
                ty.is_empty() || JAVASCRIPT_TYPES.iter().any(|js| ty.starts_with(js))
            }
        }
    }

    fn skip_raw_text(&mut self, skip: RawTextSkip) -> Result<MarkupEvent, ParseError> {
        let start = self.pos;
        let hay = &self.source.as_str()[start..];
        let Some(rel) = find_raw_text_close_tag(hay, &skip.name) else {
            return Err(ParseError::UnclosedRawText {
                name: skip.name,
                span: skip.open_span,
            });
        };
        let end = start + rel;
        self.pos = end;
        Ok(MarkupEvent::Body(self.span(start, end)))
    }
}

/// Tokenizes a whole source into a vector of events.
pub fn tokenize(
    source: CharSource,
    config: TokenizerConfig,
    ctx: &mut DocumentParseContext,
) -> Result<Vec<MarkupEvent>, ParseError> {
    let mut tokenizer = Tokenizer::new(source, config);
    let mut events = Vec::new();
    while let Some(event) = tokenizer.next_event(ctx)? {
        events.push(event);
    }
    Ok(events)
}

fn starts_with_ignore_ascii_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

// Offset of `</name` followed by optional ASCII whitespace and `>`.
fn find_raw_text_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let name = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let at = i + memchr(b'<', &bytes[i..])?;
        let name_start = at + 2;
        let name_end = name_start + name.len();
        if bytes.get(at + 1) == Some(&b'/')
            && bytes
                .get(name_start..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
        {
            let mut k = name_end;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some(at);
            }
        }
        i = at + 1;
    }
    None
}

struct ParsedTag {
    name: String,
    namespace: Option<String>,
    attributes: AttributeMap,
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.')
}

fn is_attribute_name_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '=' | '"' | '\'' | '<' | '>' | '/')
}

fn scan_name(bytes: &[u8], from: usize) -> Option<usize> {
    if !bytes.get(from).copied().is_some_and(is_name_start) {
        return None;
    }
    let mut i = from + 1;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    Some(i)
}

fn malformed(reason: &'static str, span: Span) -> ParseError {
    ParseError::MalformedTag { reason, span }
}

// Parses `[ns:]name attr...` (the text between the brackets with any `/`
// already removed).
fn parse_tag_body(body: &str, span: Span) -> Result<ParsedTag, ParseError> {
    let bytes = body.as_bytes();
    let Some(first_end) = scan_name(bytes, 0) else {
        return Err(malformed("invalid tag name", span));
    };
    let (namespace, name, name_end) = if bytes.get(first_end) == Some(&b':') {
        let Some(local_end) = scan_name(bytes, first_end + 1) else {
            return Err(malformed("invalid tag name after namespace", span));
        };
        (
            Some(body[..first_end].to_string()),
            body[first_end + 1..local_end].to_string(),
            local_end,
        )
    } else {
        (None, body[..first_end].to_string(), first_end)
    };

    let rest = &body[name_end..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace()) {
        return Err(malformed("unexpected character after tag name", span));
    }
    let attributes = parse_attributes(rest, span)?;
    Ok(ParsedTag {
        name,
        namespace,
        attributes,
    })
}

fn parse_attributes(mut rest: &str, span: Span) -> Result<AttributeMap, ParseError> {
    let mut attributes = AttributeMap::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(attributes);
        }
        let key_len = rest
            .find(|c: char| !is_attribute_name_char(c))
            .unwrap_or(rest.len());
        if key_len == 0 {
            return Err(malformed("invalid attribute name", span));
        }
        let key = &rest[..key_len];
        rest = rest[key_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = match after_eq.as_bytes().first() {
                Some(&quote @ (b'"' | b'\'')) => {
                    let Some(close) = memchr(quote, &after_eq.as_bytes()[1..]) else {
                        return Err(malformed("unterminated attribute value", span));
                    };
                    (&after_eq[1..close + 1], &after_eq[close + 2..])
                }
                Some(_) => {
                    let end = after_eq
                        .find(|c: char| c.is_whitespace())
                        .unwrap_or(after_eq.len());
                    let bare = &after_eq[..end];
                    if bare.contains(['"', '\'']) {
                        return Err(malformed("quote inside unquoted attribute value", span));
                    }
                    (bare, &after_eq[end..])
                }
                None => return Err(malformed("missing attribute value", span)),
            };
            rest = remaining;
            Some(value.trim())
        } else {
            None
        };

        if attributes.insert(key, value).is_some() {
            return Err(ParseError::DuplicateAttribute {
                key: key.to_string(),
                span,
            });
        }
    }
}

fn declared_encoding(declaration: &str) -> Option<String> {
    let inner = declaration
        .get(XML_DECLARATION.len()..)?
        .trim_end_matches('>')
        .trim_end_matches('?');
    let attributes = parse_attributes(inner, Span::default()).ok()?;
    attributes
        .get("encoding")
        .filter(|enc| !enc.is_empty())
        .map(str::to_string)
}
