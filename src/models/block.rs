use crate::models::entry::UsageRecord;
use chrono::{DateTime, Utc};

/// A fixed 5-hour accounting window `[start, end)`
#[derive(Clone, Debug)]
pub struct Block {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// No records fell into this window
    pub is_gap: bool,
    pub records: Vec<UsageRecord>,
}

impl Block {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.session_id.as_deref() == Some(session_id))
    }
}
