//! # Deduplication
//!
//! The same API response can be written to more than one transcript (resumed
//! sessions, overlapping project logs). Records are keyed by message id plus
//! request id, or message id plus session id when the request id is missing.
//! Records that yield no key are always kept.

use std::collections::HashSet;

use crate::models::UsageRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// message id + request id
    Request(String, String),
    /// message id + session id
    Session(String, String),
}

pub fn dedup_key(record: &UsageRecord) -> Option<DedupKey> {
    let mid = record.message_id.as_deref()?;
    if let Some(rid) = record.request_id.as_deref() {
        return Some(DedupKey::Request(mid.to_string(), rid.to_string()));
    }
    record
        .session_id
        .as_deref()
        .map(|sid| DedupKey::Session(mid.to_string(), sid.to_string()))
}

/// Seen-set spanning one merged stream
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
    skipped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the record repeats an already admitted key
    pub fn admit(&mut self, record: &UsageRecord) -> bool {
        match dedup_key(record) {
            Some(key) => {
                if self.seen.insert(key) {
                    true
                } else {
                    self.skipped += 1;
                    false
                }
            }
            None => true,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Drop repeated records, preserving the order of first occurrences.
/// Returns the kept records and how many were discarded.
pub fn dedup(records: Vec<UsageRecord>) -> (Vec<UsageRecord>, usize) {
    let mut d = Deduplicator::new();
    let kept: Vec<UsageRecord> = records.into_iter().filter(|r| d.admit(r)).collect();
    (kept, d.skipped())
}
