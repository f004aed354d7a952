use super::{FilterAction, MarkupFilter};
use crate::context::DocumentParseContext;
use crate::error::ParseError;
use crate::span::Span;
use crate::tag::TagKind;
use crate::tokenizer::MarkupEvent;

/// Drops `<ns:remove>` regions, tags included.
///
/// Remove regions hold preview-only content. They must have a body and may
/// not nest.
pub struct RemoveRegionFilter {
    namespace: String,
    open: Option<Span>,
}

impl RemoveRegionFilter {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            open: None,
        }
    }
}

impl MarkupFilter for RemoveRegionFilter {
    fn name(&self) -> &'static str {
        "remove-region"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        let remove_tag = event.as_tag().filter(|tag| {
            tag.in_namespace(&self.namespace) && tag.name().eq_ignore_ascii_case("remove")
        });
        let Some(tag) = remove_tag else {
            return Ok(if self.open.is_some() {
                FilterAction::Drop
            } else {
                FilterAction::Keep(event)
            });
        };
        let span = tag.span();
        match (tag.kind(), self.open) {
            (TagKind::Open, None) => {
                self.open = Some(span);
                Ok(FilterAction::Drop)
            }
            (TagKind::Close, Some(_)) => {
                self.open = None;
                Ok(FilterAction::Drop)
            }
            (TagKind::Open, Some(_)) => Err(ParseError::InvalidRemoveRegion {
                reason: "remove regions may not be nested",
                span,
            }),
            (TagKind::OpenClose, _) => Err(ParseError::InvalidRemoveRegion {
                reason: "remove tag must have a body",
                span,
            }),
            (TagKind::Close, None) => Err(ParseError::InvalidRemoveRegion {
                reason: "close tag without an open remove region",
                span,
            }),
        }
    }

    fn on_end(&mut self, _ctx: &mut DocumentParseContext) -> Result<(), ParseError> {
        match self.open.take() {
            Some(span) => Err(ParseError::InvalidRemoveRegion {
                reason: "remove region is never closed",
                span,
            }),
            None => Ok(()),
        }
    }
}
