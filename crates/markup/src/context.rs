//! Per-document parse context.

use crate::tag::TagId;
use core_types::DocumentKey;

/// Counters for one document parse.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub events_emitted: u64,
    pub events_dropped: u64,
    pub tags_auto_closed: u64,
    pub auto_ids_assigned: u64,
}

/// State shared by the tokenizer and filter stages of one parse.
///
/// The caller creates one context per document and threads it through every
/// call that needs it. Nothing here is reachable from other parses.
#[derive(Debug, Default)]
pub struct DocumentParseContext {
    pub key: DocumentKey,
    pub counters: Counters,
    next_tag_id: u32,
}

impl DocumentParseContext {
    pub fn new(key: DocumentKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn allocate_tag_id(&mut self) -> TagId {
        let id = TagId::new(self.next_tag_id);
        self.next_tag_id += 1;
        id
    }

    /// Next value of the per-document auto id sequence, starting at 1.
    pub fn next_auto_index(&mut self) -> u64 {
        self.counters.auto_ids_assigned += 1;
        self.counters.auto_ids_assigned
    }
}
