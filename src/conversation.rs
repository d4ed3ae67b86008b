//! # Conversation Window
//!
//! How full the current conversation's context is, which decides when the
//! host compacts it. Each assistant usage reports the whole context sent with
//! that request, so the size is the **last** non-zero usage, not a sum.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::models::{ConversationWindow, HookJson, RecordKind, TokenCounts, Tokens, TranscriptLine};
use crate::tokens::line_usage;
use crate::utils::{COMPACTION_RATIO, DEFAULT_CONTEXT_WINDOW};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationStats {
    /// Context size as of the last assistant reply
    pub tokens: Tokens<ConversationWindow>,
    /// Breakdown of that reply's usage
    pub counts: TokenCounts,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub error_count: usize,
}

impl ConversationStats {
    pub fn message_count(&self) -> usize {
        self.user_messages + self.assistant_messages
    }
}

/// Stream a session transcript. Malformed lines are skipped.
pub fn scan_transcript(path: &Path) -> Result<ConversationStats> {
    let file = File::open(path).with_context(|| format!("open transcript {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut stats = ConversationStats::default();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        let parsed: TranscriptLine = match serde_json::from_str(t) {
            Ok(p) => p,
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping transcript line");
                continue;
            }
        };
        let kind = RecordKind::parse(parsed.kind.as_deref());
        match kind {
            RecordKind::User => stats.user_messages += 1,
            RecordKind::Assistant => stats.assistant_messages += 1,
            _ => {}
        }
        if kind == RecordKind::Error || parsed.error.is_some() {
            stats.error_count += 1;
        }
        if kind == RecordKind::Assistant {
            // Error replies carry zeroed usage; they must not reset the size
            if let Some(counts) = line_usage(&parsed).filter(|c| !c.is_empty()) {
                stats.counts = counts;
                stats.tokens = Tokens::new(counts.total());
            }
        }
    }
    Ok(stats)
}

/// Compaction threshold and fill level of the conversation window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Compaction {
    pub threshold: Tokens<ConversationWindow>,
    /// Rounded, capped at 100
    pub percent: u8,
    /// Whether the host supplied the percentage
    pub reported: bool,
}

pub fn compaction(hook: &HookJson, stats: &ConversationStats) -> Compaction {
    let window = hook
        .context_window
        .as_ref()
        .and_then(|c| c.context_window_size)
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_CONTEXT_WINDOW);
    let threshold = (window as f64 * COMPACTION_RATIO) as u64;
    let reported = hook
        .context_window
        .as_ref()
        .and_then(|c| c.used_percentage)
        .filter(|p| p.is_finite());
    let (pct, reported_flag) = match reported {
        Some(p) => (p, true),
        None if threshold > 0 => (stats.tokens.get() as f64 / threshold as f64 * 100.0, false),
        None => (0.0, false),
    };
    Compaction {
        threshold: Tokens::new(threshold),
        percent: pct.round().clamp(0.0, 100.0) as u8,
        reported: reported_flag,
    }
}
