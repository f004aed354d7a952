//! Open/close tag balancing.
//!
//! [`TagStack`] is the state machine: OPEN tags are pushed, OPEN_CLOSE tags
//! link to themselves, CLOSE tags pop and link to the OPEN they balance. A
//! small fixed set of legacy elements may omit their close tag; when a CLOSE
//! does not match the top of the stack, such elements are popped (and marked
//! as having no explicit close) until a match is found. Any other mismatch is
//! fatal. At end of input the same elements are discarded, and any other
//! remaining entry is reported as never closed.

use crate::context::DocumentParseContext;
use crate::document::Markup;
use crate::error::ParseError;
use crate::filter::{FilterAction, MarkupFilter};
use crate::tag::{Tag, TagId, TagKind};
use crate::tokenizer::MarkupEvent;

/// Elements allowed to omit their close tag. Only un-namespaced tags qualify.
pub const VOID_ELEMENTS: [&str; 7] = ["p", "br", "img", "input", "hr", "link", "meta"];

pub fn is_void_element(tag: &Tag) -> bool {
    tag.namespace().is_none()
        && VOID_ELEMENTS
            .iter()
            .any(|name| name.eq_ignore_ascii_case(tag.name()))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceStats {
    pub opened: u64,
    pub closed: u64,
    pub self_closed: u64,
    pub auto_closed: u64,
}

#[derive(Debug, Default)]
pub struct TagStack {
    open: Vec<Tag>,
    auto_closed: Vec<TagId>,
    stats: BalanceStats,
    max_depth: usize,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current(&self) -> Option<&Tag> {
        self.open.last()
    }

    pub fn stats(&self) -> BalanceStats {
        self.stats
    }

    /// Lineages of open tags that were closed implicitly.
    pub fn auto_closed(&self) -> &[TagId] {
        &self.auto_closed
    }

    /// Applies one tag and returns it, linked when it is a CLOSE or
    /// OPEN_CLOSE.
    pub fn process(&mut self, tag: Tag) -> Result<Tag, ParseError> {
        match tag.kind() {
            TagKind::Open => {
                self.stats.opened += 1;
                self.open.push(tag.clone());
                self.max_depth = self.max_depth.max(self.open.len());
                Ok(tag)
            }
            TagKind::OpenClose => {
                self.stats.self_closed += 1;
                let own = tag.lineage();
                Ok(tag.link_to(own))
            }
            TagKind::Close => self.close(tag),
        }
    }

    fn close(&mut self, close: Tag) -> Result<Tag, ParseError> {
        let Some(top) = self.open.pop() else {
            return Err(ParseError::UnmatchedCloseTag {
                name: close.qualified_name().into_owned(),
                span: close.span(),
            });
        };
        if top.same_element(&close) {
            self.stats.closed += 1;
            return Ok(close.link_to(top.lineage()));
        }
        if !is_void_element(&top) {
            return Err(mismatch(&top, &close));
        }

        let first = top;
        let mut popped = first.clone();
        loop {
            self.mark_auto_closed(&popped, &close);
            let Some(next) = self.open.pop() else {
                return Err(mismatch(&first, &close));
            };
            if next.same_element(&close) {
                self.stats.closed += 1;
                return Ok(close.link_to(next.lineage()));
            }
            if !is_void_element(&next) {
                return Err(mismatch(&next, &close));
            }
            popped = next;
        }
    }

    fn mark_auto_closed(&mut self, tag: &Tag, by: &Tag) {
        log::debug!(
            target: "markup.balance",
            "<{}> at {} closed implicitly by </{}> at {}",
            tag.qualified_name(),
            tag.span(),
            by.qualified_name(),
            by.span()
        );
        self.stats.auto_closed += 1;
        self.auto_closed.push(tag.lineage());
    }

    /// End-of-input check.
    pub fn finish(&mut self) -> Result<(), ParseError> {
        while let Some(top) = self.open.pop() {
            if !is_void_element(&top) {
                return Err(ParseError::UnclosedTag {
                    name: top.qualified_name().into_owned(),
                    span: top.span(),
                });
            }
            log::debug!(
                target: "markup.balance",
                "<{}> at {} closed implicitly at end of input",
                top.qualified_name(),
                top.span()
            );
            self.stats.auto_closed += 1;
            self.auto_closed.push(top.lineage());
        }
        Ok(())
    }
}

fn mismatch(open: &Tag, close: &Tag) -> ParseError {
    ParseError::MismatchedCloseTag {
        open: open.qualified_name().into_owned(),
        open_span: open.span(),
        close: close.qualified_name().into_owned(),
        close_span: close.span(),
    }
}

/// Filter stage running a [`TagStack`] over every tag in the stream.
#[derive(Debug, Default)]
pub struct TagBalanceValidator {
    stack: TagStack,
}

impl TagBalanceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self) -> &TagStack {
        &self.stack
    }
}

impl MarkupFilter for TagBalanceValidator {
    fn name(&self) -> &'static str {
        "tag-balance"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        match event {
            MarkupEvent::Tag(tag) => Ok(FilterAction::Keep(MarkupEvent::Tag(
                self.stack.process(tag)?,
            ))),
            other => Ok(FilterAction::Keep(other)),
        }
    }

    fn on_end(&mut self, ctx: &mut DocumentParseContext) -> Result<(), ParseError> {
        self.stack.finish()?;
        let stats = self.stack.stats();
        ctx.counters.tags_auto_closed += stats.auto_closed;
        log::debug!(
            target: "markup.balance",
            "{}: balanced {} open tags ({} auto-closed, max depth {})",
            ctx.key,
            stats.opened,
            stats.auto_closed,
            self.stack.max_depth()
        );
        Ok(())
    }

    fn post_process(
        &mut self,
        markup: &mut Markup,
        _ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        for lineage in self.stack.auto_closed() {
            if let Some(component) = markup.find_tag_mut(*lineage) {
                component.no_close_tag = true;
            }
        }
        Ok(())
    }
}
