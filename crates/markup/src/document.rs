//! Assembled markup: raw text runs interleaved with component tags.

use crate::context::DocumentParseContext;
use crate::tag::{Tag, TagId};
use core_types::DocumentKey;

/// A tag the consumer binds to a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentTag {
    pub tag: Tag,
    /// Set when the tag was closed implicitly rather than by its own close
    /// tag.
    pub no_close_tag: bool,
}

impl ComponentTag {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            no_close_tag: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupElement {
    Raw(String),
    Tag(ComponentTag),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Markup {
    key: DocumentKey,
    elements: Vec<MarkupElement>,
    doctype: Option<String>,
    xml_encoding: Option<String>,
}

impl Markup {
    pub fn new(key: DocumentKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn key(&self) -> DocumentKey {
        self.key
    }

    pub fn elements(&self) -> &[MarkupElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn xml_encoding(&self) -> Option<&str> {
        self.xml_encoding.as_deref()
    }

    pub(crate) fn set_doctype(&mut self, doctype: Option<&str>) {
        self.doctype = doctype.map(str::to_string);
    }

    pub(crate) fn set_xml_encoding(&mut self, encoding: Option<&str>) {
        self.xml_encoding = encoding.map(str::to_string);
    }

    /// Appends raw text, merging with a preceding raw element. Empty text is
    /// ignored.
    pub fn push_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(MarkupElement::Raw(prev)) = self.elements.last_mut() {
            prev.push_str(text);
        } else {
            self.elements.push(MarkupElement::Raw(text.to_string()));
        }
    }

    pub fn push_tag(&mut self, tag: ComponentTag) {
        self.elements.push(MarkupElement::Tag(tag));
    }

    /// Rewrites every raw text element.
    pub fn map_raw_text(&mut self, mut f: impl FnMut(&str) -> String) {
        for element in &mut self.elements {
            if let MarkupElement::Raw(text) = element {
                *text = f(text);
            }
        }
    }

    pub fn component_tags(&self) -> impl Iterator<Item = &ComponentTag> {
        self.elements.iter().filter_map(|element| match element {
            MarkupElement::Tag(tag) => Some(tag),
            MarkupElement::Raw(_) => None,
        })
    }

    /// The open or open-close component tag with the given lineage.
    pub fn find_tag_mut(&mut self, lineage: TagId) -> Option<&mut ComponentTag> {
        self.elements.iter_mut().find_map(|element| match element {
            MarkupElement::Tag(component)
                if !component.tag.is_close() && component.tag.lineage() == lineage =>
            {
                Some(component)
            }
            _ => None,
        })
    }

    /// Freezes every draft tag.
    pub fn make_immutable(&mut self, ctx: &mut DocumentParseContext) {
        let elements = std::mem::take(&mut self.elements);
        self.elements = elements
            .into_iter()
            .map(|element| match element {
                MarkupElement::Tag(ComponentTag { tag, no_close_tag }) => {
                    MarkupElement::Tag(ComponentTag {
                        tag: Tag::Frozen(tag.freeze(ctx)),
                        no_close_tag,
                    })
                }
                raw => raw,
            })
            .collect();
    }

    /// Re-serializes the markup.
    pub fn to_markup_string(&self) -> String {
        let mut out = String::new();
        for element in &self.elements {
            match element {
                MarkupElement::Raw(text) => out.push_str(text),
                MarkupElement::Tag(component) => out.push_str(&component.tag.to_markup()),
            }
        }
        out
    }
}
