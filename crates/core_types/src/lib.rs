use std::fmt;

pub type RequestId = u64;
pub type DocumentId = u64;

/// Identity of one in-flight parse: the request that asked for it and the
/// document being parsed. Per-document state is keyed by this, never shared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub request: RequestId,
    pub document: DocumentId,
}

impl DocumentKey {
    pub fn new(request: RequestId, document: DocumentId) -> Self {
        Self { request, document }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req{}/doc{}", self.request, self.document)
    }
}

/// Where a document's text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Inline,
    Stream,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::File => "file",
            SourceKind::Inline => "inline",
            SourceKind::Stream => "stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_key_display_is_stable() {
        assert_eq!(DocumentKey::new(7, 3).to_string(), "req7/doc3");
        assert_eq!(DocumentKey::default(), DocumentKey::new(0, 0));
    }

    #[test]
    fn source_kind_names() {
        assert_eq!(SourceKind::Stream.as_str(), "stream");
        assert_eq!(SourceKind::Inline.as_str(), "inline");
    }
}
