//! # Status Snapshot
//!
//! Runs the whole pipeline for one invocation:
//! read -> dedup -> assign blocks -> locate -> stats + timeline, plus the
//! conversation window of the invoking session. Every stage absorbs its own
//! recoverable failures, so collecting a snapshot does not fail.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cli::AccountingConfig;
use crate::conversation::{Compaction, ConversationStats, compaction, scan_transcript};
use crate::dedup::dedup;
use crate::models::HookJson;
use crate::pricing::record_cost;
use crate::reader::{find_session_transcript, load_records};
use crate::stats::{BlockStatistics, compute_stats};
use crate::timeline::{Timeline, build_timeline};
use crate::utils::dir_name;
use crate::window::{BlockLocation, assign_blocks, locate_block};

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub model: String,
    pub model_id: String,
    pub directory: String,
    pub session_id: Option<String>,
    pub session_cost: f64,
    /// Cost came from the host rather than the local rate table
    pub cost_reported: bool,
    pub lines_added: i64,
    pub lines_removed: i64,
    pub conversation: ConversationStats,
    pub compaction: Compaction,
    pub block: Option<BlockStatistics>,
    pub block_location: Option<BlockLocation>,
    pub timeline: Timeline,
    pub skipped_duplicates: usize,
    pub reference: DateTime<Utc>,
    /// Built by [`StatusSnapshot::degraded`]
    pub degraded: bool,
}

impl StatusSnapshot {
    /// Zero-valued snapshot carrying whatever the hook payload provides
    pub fn degraded(hook: Option<&HookJson>, reference: DateTime<Utc>, config: &AccountingConfig) -> Self {
        let fallback = HookJson::default();
        let hook = hook.unwrap_or(&fallback);
        let conversation = ConversationStats::default();
        Self {
            model: hook.model_name().to_string(),
            model_id: hook.model_id().to_string(),
            directory: dir_name(hook.current_dir()),
            session_id: hook.session_id.clone(),
            session_cost: 0.0,
            cost_reported: false,
            lines_added: 0,
            lines_removed: 0,
            compaction: compaction(hook, &conversation),
            conversation,
            block: None,
            block_location: None,
            timeline: Timeline::empty(config.segment_minutes, config.segment_count),
            skipped_duplicates: 0,
            reference,
            degraded: true,
        }
    }

    /// The reported block is no longer running
    pub fn block_ended(&self) -> bool {
        self.block.as_ref().is_some_and(|b| !b.is_active)
    }
}

fn transcript_for(hook: &HookJson, bases: &[PathBuf]) -> Option<PathBuf> {
    if let Some(p) = hook.transcript_path.as_deref().filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(p));
    }
    let sid = hook.session_id.as_deref()?;
    find_session_transcript(bases, sid)
}

fn conversation_for(path: Option<&Path>, block: Option<&BlockStatistics>) -> ConversationStats {
    let scanned = path.map(scan_transcript);
    match scanned {
        Some(Ok(stats)) => stats,
        other => {
            if let Some(Err(err)) = other {
                warn!("conversation window unavailable: {err:#}");
            }
            // Message counts survive from the block when the transcript is missing
            match block {
                Some(b) => ConversationStats {
                    user_messages: b.user_messages,
                    assistant_messages: b.assistant_messages,
                    error_count: b.error_count,
                    ..ConversationStats::default()
                },
                None => ConversationStats::default(),
            }
        }
    }
}

pub fn collect_snapshot(
    hook: &HookJson,
    bases: &[PathBuf],
    reference: DateTime<Utc>,
    config: &AccountingConfig,
) -> StatusSnapshot {
    let session_id = hook.session_id.as_deref();
    let cutoff = config.lookback.map(|l| reference - l);

    let records = load_records(bases, cutoff);
    let (records, skipped_duplicates) = dedup(records);
    debug!(records = records.len(), skipped_duplicates, "records after dedup");
    let blocks = assign_blocks(records);
    let located = locate_block(&blocks, reference, session_id);
    let block = located.map(|(b, _)| b);

    let stats = block.map(|b| compute_stats(Some(b), reference, config));
    let timeline = build_timeline(block, reference, config.segment_minutes, config.segment_count);

    let transcript = transcript_for(hook, bases);
    let conversation = conversation_for(transcript.as_deref(), stats.as_ref());
    let compaction = compaction(hook, &conversation);

    let reported_cost = hook
        .cost
        .as_ref()
        .and_then(|c| c.total_cost_usd)
        .filter(|c| c.is_finite() && *c > 0.0);
    let (session_cost, cost_reported) = match reported_cost {
        Some(c) => (c, true),
        None => (record_cost(Some(hook.model_id()), &conversation.counts), false),
    };
    let lines = hook.cost.as_ref();

    StatusSnapshot {
        model: hook.model_name().to_string(),
        model_id: hook.model_id().to_string(),
        directory: dir_name(hook.current_dir()),
        session_id: hook.session_id.clone(),
        session_cost,
        cost_reported,
        lines_added: lines.and_then(|c| c.total_lines_added).unwrap_or(0),
        lines_removed: lines.and_then(|c| c.total_lines_removed).unwrap_or(0),
        conversation,
        compaction,
        block: stats,
        block_location: located.map(|(_, how)| how),
        timeline,
        skipped_duplicates,
        reference,
        degraded: false,
    }
}
