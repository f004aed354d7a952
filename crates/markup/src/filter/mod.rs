//! Filter chain between the tokenizer and the markup consumer.
//!
//! Each stage owns the stage below it (toward the tokenizer). Pulling an
//! event from a stage pulls from its downstream source first, then lets the
//! stage's [`MarkupFilter`] keep, replace or drop it. Dropped events are
//! handled by looping, so a long run of dropped events never deepens the
//! call stack; the depth is the number of stages.
//!
//! After the stream is exhausted the consumer runs [`FilterChain::post_process`]
//! once, which visits the stages head first and ends at the tokenizer.

mod auto_id;
mod remove_region;

pub use auto_id::AutoIdFilter;
pub use remove_region::RemoveRegionFilter;

use crate::context::DocumentParseContext;
use crate::document::Markup;
use crate::error::ParseError;
use crate::tokenizer::{MarkupEvent, Tokenizer};

/// What a stage does with one event.
#[derive(Debug)]
pub enum FilterAction {
    Keep(MarkupEvent),
    Drop,
}

/// One pluggable stage.
pub trait MarkupFilter {
    fn name(&self) -> &'static str;

    /// Inspects an event pulled from downstream. Returning
    /// [`FilterAction::Drop`] makes the stage pull again.
    fn on_event(
        &mut self,
        event: MarkupEvent,
        ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError>;

    /// Called once when downstream reports end of input.
    fn on_end(&mut self, _ctx: &mut DocumentParseContext) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called once per document after the whole stream was consumed.
    fn post_process(
        &mut self,
        _markup: &mut Markup,
        _ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        Ok(())
    }
}

/// Anything events can be pulled from: the tokenizer or a filter stage.
pub trait EventSource {
    fn next_event(
        &mut self,
        ctx: &mut DocumentParseContext,
    ) -> Result<Option<MarkupEvent>, ParseError>;

    fn post_process(
        &mut self,
        markup: &mut Markup,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError>;

    fn tokenizer(&self) -> &Tokenizer;

    fn tokenizer_mut(&mut self) -> &mut Tokenizer;

    /// Stage names from this source down to the tokenizer.
    fn stage_names(&self, out: &mut Vec<&'static str>);
}

impl EventSource for Tokenizer {
    fn next_event(
        &mut self,
        ctx: &mut DocumentParseContext,
    ) -> Result<Option<MarkupEvent>, ParseError> {
        Tokenizer::next_event(self, ctx)
    }

    fn post_process(
        &mut self,
        _markup: &mut Markup,
        _ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        Ok(())
    }

    fn tokenizer(&self) -> &Tokenizer {
        self
    }

    fn tokenizer_mut(&mut self) -> &mut Tokenizer {
        self
    }

    fn stage_names(&self, out: &mut Vec<&'static str>) {
        out.push("tokenizer");
    }
}

/// A filter linked to its downstream source.
pub struct FilterStage {
    filter: Box<dyn MarkupFilter>,
    next: Box<dyn EventSource>,
    ended: bool,
    failed: Option<ParseError>,
}

impl FilterStage {
    pub fn new(filter: Box<dyn MarkupFilter>, next: Box<dyn EventSource>) -> Self {
        Self {
            filter,
            next,
            ended: false,
            failed: None,
        }
    }

    fn pull(&mut self, ctx: &mut DocumentParseContext) -> Result<Option<MarkupEvent>, ParseError> {
        loop {
            let Some(event) = self.next.next_event(ctx)? else {
                if !self.ended {
                    self.ended = true;
                    self.filter.on_end(ctx)?;
                }
                return Ok(None);
            };
            match self.filter.on_event(event, ctx)? {
                FilterAction::Keep(event) => return Ok(Some(event)),
                FilterAction::Drop => {
                    ctx.counters.events_dropped += 1;
                    log::trace!(target: "markup.filter", "{} dropped an event", self.filter.name());
                }
            }
        }
    }
}

impl EventSource for FilterStage {
    fn next_event(
        &mut self,
        ctx: &mut DocumentParseContext,
    ) -> Result<Option<MarkupEvent>, ParseError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.pull(ctx).inspect_err(|err| self.failed = Some(err.clone()))
    }

    fn post_process(
        &mut self,
        markup: &mut Markup,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        self.filter.post_process(markup, ctx)?;
        self.next.post_process(markup, ctx)
    }

    fn tokenizer(&self) -> &Tokenizer {
        self.next.tokenizer()
    }

    fn tokenizer_mut(&mut self) -> &mut Tokenizer {
        self.next.tokenizer_mut()
    }

    fn stage_names(&self, out: &mut Vec<&'static str>) {
        out.push(self.filter.name());
        self.next.stage_names(out);
    }
}

/// The assembled chain for one document. Built once, consumed once.
pub struct FilterChain {
    head: Box<dyn EventSource>,
}

impl FilterChain {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            head: Box::new(tokenizer),
        }
    }

    /// Adds `filter` as the new head, pulling from the current head.
    pub fn with(self, filter: impl MarkupFilter + 'static) -> Self {
        self.with_boxed(Box::new(filter))
    }

    pub fn with_boxed(self, filter: Box<dyn MarkupFilter>) -> Self {
        Self {
            head: Box::new(FilterStage::new(filter, self.head)),
        }
    }

    pub fn next_event(
        &mut self,
        ctx: &mut DocumentParseContext,
    ) -> Result<Option<MarkupEvent>, ParseError> {
        self.head.next_event(ctx)
    }

    pub fn post_process(
        &mut self,
        markup: &mut Markup,
        ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        self.head.post_process(markup, ctx)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        self.head.tokenizer()
    }

    pub fn tokenizer_mut(&mut self) -> &mut Tokenizer {
        self.head.tokenizer_mut()
    }

    /// Stage names, head first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        self.head.stage_names(&mut out);
        out
    }
}

#[cfg(test)]
mod tests;
