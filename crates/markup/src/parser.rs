//! Markup assembly: the consumer at the top of the filter chain.
//!
//! Pulls every event through the chain and splits the document into raw
//! text and component tags. A tag is a component tag when it belongs to the
//! framework namespace, carries the namespace's `id` attribute, or closes a
//! component tag. Everything between component tags is copied verbatim from
//! the source using the tokenizer's position marker; a tag a filter has
//! modified is written out from its re-derived markup instead.

use crate::balance::TagBalanceValidator;
use crate::context::DocumentParseContext;
use crate::document::{ComponentTag, Markup};
use crate::error::MarkupError;
use crate::filter::{AutoIdFilter, FilterChain, MarkupFilter, RemoveRegionFilter};
use crate::source::CharSource;
use crate::tag::{Tag, TagId};
use crate::tokenizer::{EventKind, MarkupEvent, Tokenizer, TokenizerConfig};
use core_types::DocumentKey;
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_NAMESPACE: &str = "wicket";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupSettings {
    /// Prefix of framework tags and of the `{namespace}:id` attribute.
    pub namespace: String,
    /// Drop plain comments. Conditional comments are kept.
    pub strip_comments: bool,
    /// Collapse whitespace runs in raw text outside `<pre>`.
    pub compress_whitespace: bool,
    /// Fail when the document does not start with an XML declaration naming
    /// its encoding.
    pub require_xml_declaration: bool,
    pub tokenizer: TokenizerConfig,
}

impl Default for MarkupSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            strip_comments: false,
            compress_whitespace: false,
            require_xml_declaration: false,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

pub struct MarkupParser {
    chain: FilterChain,
    settings: MarkupSettings,
    ctx: DocumentParseContext,
}

impl MarkupParser {
    /// Builds the standard chain: tokenizer, auto ids, tag balance, remove
    /// regions.
    pub fn new(source: CharSource, settings: MarkupSettings, key: DocumentKey) -> Self {
        let tokenizer = Tokenizer::new(source, settings.tokenizer.clone());
        let chain = FilterChain::new(tokenizer)
            .with(AutoIdFilter::new(&settings.namespace))
            .with(TagBalanceValidator::new())
            .with(RemoveRegionFilter::new(&settings.namespace));
        Self {
            chain,
            settings,
            ctx: DocumentParseContext::new(key),
        }
    }

    /// Adds a stage above the standard ones.
    pub fn with_filter(mut self, filter: impl MarkupFilter + 'static) -> Self {
        self.chain = self.chain.with(filter);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    pub fn context(&self) -> &DocumentParseContext {
        &self.ctx
    }

    pub fn parse(mut self) -> Result<Markup, MarkupError> {
        let mut markup = Markup::new(self.ctx.key);
        let id_attribute = format!("{}:id", self.settings.namespace);
        let mut components: HashSet<TagId> = HashSet::new();
        // End of the last event handed to us; a gap means events were dropped.
        let mut cursor = 0;
        let mut previous = None;
        self.chain.tokenizer_mut().set_position_marker(0);

        while let Some(event) = self.chain.next_event(&mut self.ctx)? {
            let span = event.span();
            if span.start != cursor {
                self.flush_raw(&mut markup, cursor);
                self.chain.tokenizer_mut().set_position_marker(span.start);
            }
            cursor = span.end;
            let kind = event.kind();

            match event {
                MarkupEvent::Tag(tag) => {
                    if self.is_component(&tag, &id_attribute, &components) {
                        self.flush_raw(&mut markup, span.start);
                        if !tag.is_close() {
                            components.insert(tag.lineage());
                        }
                        markup.push_tag(ComponentTag::new(tag));
                        self.chain.tokenizer_mut().set_position_marker(span.end);
                    } else if tag.is_draft() {
                        self.flush_raw(&mut markup, span.start);
                        markup.push_raw(&tag.to_markup());
                        self.chain.tokenizer_mut().set_position_marker(span.end);
                    }
                }
                MarkupEvent::Comment(_)
                    if self.settings.strip_comments
                        && previous != Some(EventKind::ConditionalComment) =>
                {
                    self.flush_raw(&mut markup, span.start);
                    self.chain.tokenizer_mut().set_position_marker(span.end);
                }
                _ => {}
            }
            previous = Some(kind);
        }
        self.flush_raw(&mut markup, cursor);
        if self.settings.compress_whitespace {
            markup.map_raw_text(compress_whitespace);
        }

        let tokenizer = self.chain.tokenizer();
        markup.set_doctype(tokenizer.doctype());
        markup.set_xml_encoding(tokenizer.xml_encoding());
        if markup.xml_encoding().is_none() {
            if self.settings.require_xml_declaration {
                return Err(MarkupError::MissingXmlDeclaration);
            }
            log::debug!(
                target: "markup.parser",
                "{}: no XML declaration, assuming the source was decoded correctly",
                self.ctx.key
            );
        }

        self.chain.post_process(&mut markup, &mut self.ctx)?;
        markup.make_immutable(&mut self.ctx);
        log::debug!(
            target: "markup.parser",
            "{}: {} markup elements from {} events ({} dropped, {} auto ids)",
            self.ctx.key,
            markup.len(),
            self.ctx.counters.events_emitted,
            self.ctx.counters.events_dropped,
            self.ctx.counters.auto_ids_assigned
        );
        Ok(markup)
    }

    fn is_component(&self, tag: &Tag, id_attribute: &str, components: &HashSet<TagId>) -> bool {
        if tag.is_close() {
            return tag.open_tag().is_some_and(|open| components.contains(&open));
        }
        tag.in_namespace(&self.settings.namespace) || tag.attributes().contains_key(id_attribute)
    }

    // Moves source text from the marker to `to` into the markup as raw text.
    fn flush_raw(&mut self, markup: &mut Markup, to: usize) {
        let tokenizer = self.chain.tokenizer();
        let text = tokenizer.input_from_marker(to);
        if text.is_empty() {
            return;
        }
        markup.push_raw(text);
        self.chain.tokenizer_mut().set_position_marker(to);
    }
}

pub fn parse_str(text: &str, settings: MarkupSettings, key: DocumentKey) -> Result<Markup, MarkupError> {
    MarkupParser::new(CharSource::new(text), settings, key).parse()
}

/// Loads and parses a file. The file is closed before parsing starts.
pub fn parse_file(path: &Path, settings: MarkupSettings, key: DocumentKey) -> Result<Markup, MarkupError> {
    let source = CharSource::open(path)?;
    MarkupParser::new(source, settings, key).parse()
}

/// Collapses whitespace outside `<pre>` blocks: a run containing a line
/// break becomes one `\n`, any other run one space.
pub fn compress_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = find_pre_open(rest) {
        compress_into(&mut out, &rest[..open]);
        let close = find_ignore_ascii_case(&rest[open..], "</pre>")
            .map_or(rest.len(), |rel| open + rel + "</pre>".len());
        out.push_str(&rest[open..close]);
        rest = &rest[close..];
    }
    compress_into(&mut out, rest);
    out
}

fn compress_into(out: &mut String, text: &str) {
    let mut run: Option<bool> = None;
    for ch in text.chars() {
        if matches!(ch, ' ' | '\t' | '\r' | '\n') {
            let newline = matches!(ch, '\r' | '\n');
            run = Some(run.unwrap_or(false) || newline);
            continue;
        }
        if let Some(newline) = run.take() {
            out.push(if newline { '\n' } else { ' ' });
        }
        out.push(ch);
    }
    if let Some(newline) = run {
        out.push(if newline { '\n' } else { ' ' });
    }
}

fn find_pre_open(text: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = find_ignore_ascii_case(&text[from..], "<pre") {
        let at = from + rel;
        match text.as_bytes().get(at + 4) {
            Some(b) if *b == b'>' || b.is_ascii_whitespace() => return Some(at),
            _ => from = at + 4,
        }
    }
    None
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests;
