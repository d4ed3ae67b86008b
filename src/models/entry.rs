use chrono::{DateTime, Utc};

use crate::models::tokens::TokenCounts;

/// Role tag of a transcript record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Assistant,
    User,
    Error,
    Other(String),
}

impl RecordKind {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("assistant") => Self::Assistant,
            Some("user") => Self::User,
            Some("error") => Self::Error,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

/// One parsed transcript record, immutable after the reader builds it
#[derive(Clone, Debug)]
pub struct UsageRecord {
    /// Always UTC; the reader normalizes every timestamp on ingestion
    pub ts: DateTime<Utc>,
    pub kind: RecordKind,
    pub session_id: Option<String>,
    pub usage: Option<TokenCounts>,
    pub model: Option<String>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub is_error: bool,
}

impl UsageRecord {
    /// Whether this record counts toward token totals
    pub fn contributes(&self) -> bool {
        self.kind == RecordKind::Assistant && self.usage.is_some()
    }

    /// Token counts this record contributes; zero for non-contributing records
    pub fn contributed(&self) -> TokenCounts {
        if self.contributes() {
            self.usage.unwrap_or_default()
        } else {
            TokenCounts::default()
        }
    }
}
