use super::{FilterAction, MarkupFilter};
use crate::context::DocumentParseContext;
use crate::error::ParseError;
use crate::tokenizer::MarkupEvent;

/// Gives every framework-namespace open tag an id attribute if it has none.
///
/// Ids are `_{name}_{n}` with `n` drawn from the document's own counter, so
/// two documents parsed side by side never influence each other.
pub struct AutoIdFilter {
    namespace: String,
    id_attribute: String,
}

impl AutoIdFilter {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            id_attribute: format!("{namespace}:id"),
        }
    }
}

impl MarkupFilter for AutoIdFilter {
    fn name(&self) -> &'static str {
        "auto-id"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        let MarkupEvent::Tag(mut tag) = event else {
            return Ok(FilterAction::Keep(event));
        };
        if tag.is_close()
            || !tag.in_namespace(&self.namespace)
            || tag.attributes().contains_key(&self.id_attribute)
        {
            return Ok(FilterAction::Keep(MarkupEvent::Tag(tag)));
        }
        let id = format!("_{}_{}", tag.name(), ctx.next_auto_index());
        log::debug!(
            target: "markup.filter",
            "{}: auto id {id} for <{}> at {}",
            ctx.key,
            tag.qualified_name(),
            tag.span()
        );
        let id_attribute = self.id_attribute.as_str();
        tag.make_mut().set_attribute(id_attribute, Some(&id));
        Ok(FilterAction::Keep(MarkupEvent::Tag(tag)))
    }
}
