//! Tag value objects.
//!
//! A tag is either *frozen* or a *draft*. Frozen tags come out of the
//! tokenizer (or out of [`DraftTag::freeze`]); they have no mutators and
//! serialize to the exact text they were parsed from. Drafts are editable and
//! always re-derive their markup from their current fields. A draft made from
//! a frozen tag remembers that tag's lineage, so a close tag linked to the
//! original still closes the copy.

use crate::context::DocumentParseContext;
use crate::entities::{escape_markup, unescape_markup};
use crate::span::Span;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagKind {
    Open,
    Close,
    OpenClose,
}

impl TagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::Open => "OPEN",
            TagKind::Close => "CLOSE",
            TagKind::OpenClose => "OPEN_CLOSE",
        }
    }
}

/// Per-document tag identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

impl TagId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered attribute map. Values are unescaped when written; a `None` value
/// is a bare attribute such as `<input disabled>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, Option<String>)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`, returning the previous value if the key was
    /// already present. Insertion order of existing keys is kept.
    pub fn insert(&mut self, key: &str, value: Option<&str>) -> Option<Option<String>> {
        let value = value.map(|v| unescape_markup(v).into_owned());
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key.to_string(), value));
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Value for `key`; bare attributes read as the empty string.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FrozenData {
    id: TagId,
    copy_of: TagId,
    name: String,
    namespace: Option<String>,
    kind: TagKind,
    attributes: AttributeMap,
    span: Span,
    text: String,
    open_tag: Option<TagId>,
}

/// Immutable tag. Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrozenTag(Arc<FrozenData>);

impl FrozenTag {
    pub(crate) fn parsed(
        id: TagId,
        name: String,
        namespace: Option<String>,
        kind: TagKind,
        attributes: AttributeMap,
        span: Span,
        text: String,
    ) -> Self {
        Self(Arc::new(FrozenData {
            id,
            copy_of: id,
            name,
            namespace,
            kind,
            attributes,
            span,
            text,
            open_tag: None,
        }))
    }

    pub fn id(&self) -> TagId {
        self.0.id
    }

    /// Identity of the tag this one was copied from (itself for originals).
    pub fn copy_of(&self) -> TagId {
        self.0.copy_of
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.namespace.as_deref()
    }

    pub fn kind(&self) -> TagKind {
        self.0.kind
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.0.attributes
    }

    pub fn span(&self) -> Span {
        self.0.span
    }

    pub fn open_tag(&self) -> Option<TagId> {
        self.0.open_tag
    }

    /// The cached source text, returned unchanged.
    pub fn to_markup(&self) -> &str {
        &self.0.text
    }

    pub fn to_draft(&self) -> DraftTag {
        DraftTag {
            lineage: self.0.copy_of,
            name: self.0.name.clone(),
            namespace: self.0.namespace.clone(),
            kind: self.0.kind,
            attributes: self.0.attributes.clone(),
            span: self.0.span,
            open_tag: self.0.open_tag,
        }
    }

    // The close/open link is a relation to another tag, not part of this
    // tag's identity or attributes, so the validator may set it on the way
    // through the chain.
    pub(crate) fn with_open_tag(mut self, open: TagId) -> Self {
        Arc::make_mut(&mut self.0).open_tag = Some(open);
        self
    }
}

/// Editable tag. Serialization always reflects the current fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftTag {
    lineage: TagId,
    name: String,
    namespace: Option<String>,
    kind: TagKind,
    attributes: AttributeMap,
    span: Span,
    open_tag: Option<TagId>,
}

impl DraftTag {
    /// A draft with no frozen origin; it gets a fresh identity.
    pub fn new(ctx: &mut DocumentParseContext, name: &str, kind: TagKind) -> Self {
        Self {
            lineage: ctx.allocate_tag_id(),
            name: name.to_string(),
            namespace: None,
            kind,
            attributes: AttributeMap::new(),
            span: Span::default(),
            open_tag: None,
        }
    }

    pub fn lineage(&self) -> TagId {
        self.lineage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn open_tag(&self) -> Option<TagId> {
        self.open_tag
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        self.namespace = namespace.map(str::to_string);
    }

    pub fn set_kind(&mut self, kind: TagKind) {
        self.kind = kind;
    }

    pub fn set_attribute(&mut self, key: &str, value: Option<&str>) -> Option<Option<String>> {
        self.attributes.insert(key, value)
    }

    pub(crate) fn set_open_tag(&mut self, open: TagId) {
        self.open_tag = Some(open);
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 16 * self.attributes.len() + 4);
        out.push('<');
        if self.kind == TagKind::Close {
            out.push('/');
        }
        if let Some(ns) = &self.namespace {
            out.push_str(ns);
            out.push(':');
        }
        out.push_str(&self.name);
        for (key, value) in self.attributes.iter() {
            out.push(' ');
            out.push_str(key);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&escape_markup(value));
                out.push('"');
            }
        }
        if self.kind == TagKind::OpenClose {
            out.push('/');
        }
        out.push('>');
        out
    }

    /// Freezes the draft under a new identity that records its lineage.
    pub fn freeze(self, ctx: &mut DocumentParseContext) -> FrozenTag {
        let text = self.to_markup();
        FrozenTag(Arc::new(FrozenData {
            id: ctx.allocate_tag_id(),
            copy_of: self.lineage,
            name: self.name,
            namespace: self.namespace,
            kind: self.kind,
            attributes: self.attributes,
            span: self.span,
            text,
            open_tag: self.open_tag,
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Frozen(FrozenTag),
    Draft(DraftTag),
}

impl Tag {
    pub fn name(&self) -> &str {
        match self {
            Tag::Frozen(t) => t.name(),
            Tag::Draft(t) => t.name(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Tag::Frozen(t) => t.namespace(),
            Tag::Draft(t) => t.namespace(),
        }
    }

    pub fn kind(&self) -> TagKind {
        match self {
            Tag::Frozen(t) => t.kind(),
            Tag::Draft(t) => t.kind(),
        }
    }

    pub fn attributes(&self) -> &AttributeMap {
        match self {
            Tag::Frozen(t) => t.attributes(),
            Tag::Draft(t) => t.attributes(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Tag::Frozen(t) => t.span(),
            Tag::Draft(t) => t.span(),
        }
    }

    pub fn open_tag(&self) -> Option<TagId> {
        match self {
            Tag::Frozen(t) => t.open_tag(),
            Tag::Draft(t) => t.open_tag(),
        }
    }

    /// Identity shared by an original and all drafts derived from it.
    pub fn lineage(&self) -> TagId {
        match self {
            Tag::Frozen(t) => t.copy_of(),
            Tag::Draft(t) => t.lineage(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.kind() == TagKind::Open
    }

    pub fn is_close(&self) -> bool {
        self.kind() == TagKind::Close
    }

    pub fn is_open_close(&self) -> bool {
        self.kind() == TagKind::OpenClose
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Tag::Draft(_))
    }

    /// `ns:name`, or just the name when there is no namespace.
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match self.namespace() {
            Some(ns) => Cow::Owned(format!("{ns}:{}", self.name())),
            None => Cow::Borrowed(self.name()),
        }
    }

    /// Case-insensitive comparison of name and namespace.
    pub fn same_element(&self, other: &Tag) -> bool {
        self.name().eq_ignore_ascii_case(other.name())
            && match (self.namespace(), other.namespace()) {
                (None, None) => true,
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            }
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace()
            .is_some_and(|ns| ns.eq_ignore_ascii_case(namespace))
    }

    /// True when this tag was linked to `open`, or to the original `open` was
    /// copied from.
    pub fn closes(&self, open: &Tag) -> bool {
        self.open_tag() == Some(open.lineage())
    }

    pub fn to_markup(&self) -> Cow<'_, str> {
        match self {
            Tag::Frozen(t) => Cow::Borrowed(t.to_markup()),
            Tag::Draft(t) => Cow::Owned(t.to_markup()),
        }
    }

    /// Turns a frozen tag into a draft in place and returns it for editing.
    pub fn make_mut(&mut self) -> &mut DraftTag {
        if let Tag::Frozen(frozen) = self {
            *self = Tag::Draft(frozen.to_draft());
        }
        match self {
            Tag::Draft(draft) => draft,
            Tag::Frozen(_) => unreachable!("frozen tag was replaced by a draft"),
        }
    }

    pub fn freeze(self, ctx: &mut DocumentParseContext) -> FrozenTag {
        match self {
            Tag::Frozen(t) => t,
            Tag::Draft(t) => t.freeze(ctx),
        }
    }

    pub(crate) fn link_to(self, open: TagId) -> Tag {
        match self {
            Tag::Frozen(t) => Tag::Frozen(t.with_open_tag(open)),
            Tag::Draft(mut t) => {
                t.set_open_tag(open);
                Tag::Draft(t)
            }
        }
    }
}

impl From<FrozenTag> for Tag {
    fn from(tag: FrozenTag) -> Self {
        Tag::Frozen(tag)
    }
}

impl From<DraftTag> for Tag {
    fn from(tag: DraftTag) -> Self {
        Tag::Draft(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DocumentKey;

    fn ctx() -> DocumentParseContext {
        DocumentParseContext::new(DocumentKey::default())
    }

    fn frozen(ctx: &mut DocumentParseContext, text: &str, name: &str, kind: TagKind) -> FrozenTag {
        let mut attrs = AttributeMap::new();
        attrs.insert("class", Some("a &amp; b"));
        FrozenTag::parsed(
            ctx.allocate_tag_id(),
            name.to_string(),
            None,
            kind,
            attrs,
            Span::new(0, text.len(), 1, 1),
            text.to_string(),
        )
    }

    #[test]
    fn attribute_values_are_unescaped_on_insert() {
        let mut attrs = AttributeMap::new();
        assert_eq!(attrs.insert("title", Some("&lt;b&gt;")), None);
        assert_eq!(attrs.get("title"), Some("<b>"));
        assert_eq!(attrs.insert("disabled", None), None);
        assert_eq!(attrs.get("disabled"), Some(""));
        assert_eq!(attrs.insert("title", Some("x")), Some(Some("<b>".to_string())));
        let keys: Vec<_> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["title", "disabled"]);
        assert_eq!(attrs.remove("title"), Some(Some("x".to_string())));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn frozen_tag_returns_verbatim_text() {
        let mut ctx = ctx();
        let text = "<div   class='a &amp; b' >";
        let tag = frozen(&mut ctx, text, "div", TagKind::Open);
        assert_eq!(tag.to_markup(), text);
        assert_eq!(tag.copy_of(), tag.id());
    }

    #[test]
    fn draft_rederives_markup_and_escapes_values() {
        let mut ctx = ctx();
        let mut tag = Tag::from(frozen(&mut ctx, "<div class='a &amp; b'>", "div", TagKind::Open));
        let draft = tag.make_mut();
        draft.set_attribute("hidden", None);
        draft.set_namespace(Some("wicket"));
        draft.set_kind(TagKind::OpenClose);
        assert!(tag.is_draft());
        assert_eq!(tag.to_markup(), r#"<wicket:div class="a &amp; b" hidden/>"#);
    }

    #[test]
    fn close_draft_markup() {
        let mut ctx = ctx();
        let draft = DraftTag::new(&mut ctx, "span", TagKind::Close);
        assert_eq!(draft.to_markup(), "</span>");
    }

    #[test]
    fn close_linked_to_original_closes_its_copy() {
        let mut ctx = ctx();
        let open = frozen(&mut ctx, "<div>", "div", TagKind::Open);
        let close = Tag::from(frozen(&mut ctx, "</div>", "div", TagKind::Close)).link_to(open.id());
        let copy = Tag::Draft(open.to_draft());
        let refrozen = Tag::Frozen(open.to_draft().freeze(&mut ctx));
        let unrelated = Tag::from(frozen(&mut ctx, "<div>", "div", TagKind::Open));

        assert!(close.closes(&Tag::Frozen(open.clone())));
        assert!(close.closes(&copy));
        assert!(close.closes(&refrozen));
        assert!(!close.closes(&unrelated));
    }

    #[test]
    fn freezing_keeps_lineage_and_caches_text() {
        let mut ctx = ctx();
        let open = frozen(&mut ctx, "<p class=x>", "p", TagKind::Open);
        let mut draft = open.to_draft();
        draft.set_name("section");
        let refrozen = draft.freeze(&mut ctx);
        assert_ne!(refrozen.id(), open.id());
        assert_eq!(refrozen.copy_of(), open.id());
        assert_eq!(refrozen.to_markup(), r#"<section class="a &amp; b">"#);
    }

    #[test]
    fn same_element_ignores_case() {
        let mut ctx = ctx();
        let a = Tag::from(frozen(&mut ctx, "<DIV>", "DIV", TagKind::Open));
        let b = Tag::from(frozen(&mut ctx, "</div>", "div", TagKind::Close));
        assert!(a.same_element(&b));
        let mut namespaced = b.clone();
        namespaced.make_mut().set_namespace(Some("wicket"));
        assert!(!a.same_element(&namespaced));
    }
}
