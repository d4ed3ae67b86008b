//! # Block Statistics
//!
//! Aggregates one block's records into the figures the status line shows.
//! A missing or empty block yields the zero-valued [`BlockStatistics`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::cli::AccountingConfig;
use crate::models::{Block, BlockWindow, RecordKind, TokenCounts, Tokens};
use crate::pricing::record_cost;
use crate::utils::WINDOW_DURATION_SECONDS;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockStatistics {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub first_record: Option<DateTime<Utc>>,
    pub last_record: Option<DateTime<Utc>>,
    /// Per-category totals of contributing records
    pub tokens: TokenCounts,
    pub total_tokens: Tokens<BlockWindow>,
    /// User plus assistant records
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub error_count: usize,
    pub cost: f64,
    pub cache_hit_ratio: f64,
    /// Since block start: up to the reference instant while the block is
    /// active, up to its last record otherwise
    pub elapsed_secs: i64,
    /// First to last record
    pub span_secs: i64,
    /// Sum of inter-record gaps below the idle threshold
    pub active_secs: i64,
    /// Tokens per minute of elapsed time
    pub burn_rate: f64,
    /// `active / elapsed`, in `[0, 1]`
    pub efficiency: f64,
    /// Elapsed share of the 5-hour window, in percent
    pub progress_percent: f64,
    pub is_active: bool,
}

impl BlockStatistics {
    pub fn is_empty(&self) -> bool {
        self.first_record.is_none()
    }
}

/// Time spent in gaps strictly shorter than `idle_threshold`.
/// `timestamps` must be in chronological order.
pub fn active_duration(timestamps: &[DateTime<Utc>], idle_threshold: TimeDelta) -> TimeDelta {
    timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|gap| *gap < idle_threshold && *gap > TimeDelta::zero())
        .fold(TimeDelta::zero(), |acc, gap| acc + gap)
}

fn ratio(num: f64, denom: f64) -> f64 {
    if denom > 0.0 { num / denom } else { 0.0 }
}

pub fn compute_stats(
    block: Option<&Block>,
    reference: DateTime<Utc>,
    config: &AccountingConfig,
) -> BlockStatistics {
    let Some(block) = block else {
        return BlockStatistics::default();
    };
    let (Some(first), Some(last)) = (block.records.first(), block.records.last()) else {
        return BlockStatistics {
            start: Some(block.start),
            end: Some(block.end),
            ..BlockStatistics::default()
        };
    };

    let mut tokens = TokenCounts::default();
    let mut cost = 0.0;
    let mut user_messages = 0;
    let mut assistant_messages = 0;
    let mut error_count = 0;
    for r in &block.records {
        match r.kind {
            RecordKind::User => user_messages += 1,
            RecordKind::Assistant => assistant_messages += 1,
            _ => {}
        }
        if r.is_error {
            error_count += 1;
        }
        if r.contributes() {
            let c = r.contributed();
            tokens += c;
            cost += record_cost(r.model.as_deref(), &c);
        }
    }

    let is_active = block.contains(reference);
    let elapsed_end = if is_active {
        reference.max(last.ts)
    } else {
        last.ts
    };
    let elapsed_secs = (elapsed_end - block.start).num_seconds().max(0);
    let span_secs = (last.ts - first.ts).num_seconds().max(0);
    let timestamps: Vec<DateTime<Utc>> = block.records.iter().map(|r| r.ts).collect();
    let active_secs = active_duration(&timestamps, config.idle_threshold).num_seconds();

    let total = tokens.total();
    BlockStatistics {
        start: Some(block.start),
        end: Some(block.end),
        first_record: Some(first.ts),
        last_record: Some(last.ts),
        tokens,
        total_tokens: Tokens::new(total),
        message_count: user_messages + assistant_messages,
        user_messages,
        assistant_messages,
        error_count,
        cost,
        cache_hit_ratio: tokens.cache_hit_ratio(),
        elapsed_secs,
        span_secs,
        active_secs,
        burn_rate: ratio(total as f64, elapsed_secs as f64 / 60.0),
        efficiency: ratio(active_secs as f64, elapsed_secs as f64).min(1.0),
        progress_percent: (ratio(elapsed_secs as f64, WINDOW_DURATION_SECONDS as f64) * 100.0)
            .min(100.0),
        is_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UsageRecord;
    use chrono::TimeZone;
    use serial_test::serial;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn rec(min: i64, kind: RecordKind, input: u64, cache_read: u64) -> UsageRecord {
        UsageRecord {
            ts: start() + TimeDelta::minutes(min),
            kind,
            session_id: Some("s".into()),
            usage: Some(TokenCounts {
                input,
                cache_read,
                ..Default::default()
            }),
            model: Some("claude-sonnet-4".into()),
            message_id: None,
            request_id: None,
            is_error: false,
        }
    }

    fn block(records: Vec<UsageRecord>) -> Block {
        Block {
            start: start(),
            end: start() + TimeDelta::hours(5),
            is_gap: records.is_empty(),
            records,
        }
    }

    #[test]
    fn none_and_empty_blocks_are_zero() {
        let cfg = AccountingConfig::default();
        let s = compute_stats(None, start(), &cfg);
        assert_eq!(s.total_tokens.get(), 0);
        assert_eq!(s.cache_hit_ratio, 0.0);
        assert!(s.is_empty());

        let b = block(Vec::new());
        let s = compute_stats(Some(&b), start(), &cfg);
        assert_eq!(s.total_tokens.get(), 0);
        assert_eq!(s.start, Some(start()));
    }

    #[test]
    #[serial]
    fn only_assistant_usage_contributes() {
        let b = block(vec![
            rec(0, RecordKind::User, 999, 0),
            rec(1, RecordKind::Assistant, 100, 300),
            rec(2, RecordKind::Assistant, 50, 50),
        ]);
        let s = compute_stats(Some(&b), start() + TimeDelta::minutes(10), &AccountingConfig::default());
        assert_eq!(s.total_tokens.get(), 500);
        assert_eq!(s.tokens.input, 150);
        assert_eq!(s.user_messages, 1);
        assert_eq!(s.assistant_messages, 2);
        assert_eq!(s.message_count, 3);
        assert!((s.cache_hit_ratio - 0.7).abs() < 1e-12);
        assert!(s.cost > 0.0);
        assert!(s.is_active);
        assert_eq!(s.elapsed_secs, 600);
        assert!((s.burn_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    #[serial]
    fn idle_gaps_are_excluded_from_active_time() {
        let cfg = AccountingConfig::default();
        // gaps: 2m, 3m, 10m (idle), 4m
        let b = block(vec![
            rec(0, RecordKind::Assistant, 1, 0),
            rec(2, RecordKind::Assistant, 1, 0),
            rec(5, RecordKind::Assistant, 1, 0),
            rec(15, RecordKind::Assistant, 1, 0),
            rec(19, RecordKind::Assistant, 1, 0),
        ]);
        let s = compute_stats(Some(&b), start() + TimeDelta::hours(6), &cfg);
        assert!(!s.is_active);
        assert_eq!(s.active_secs, 9 * 60);
        assert_eq!(s.span_secs, 19 * 60);
        assert_eq!(s.elapsed_secs, 19 * 60);
        assert!(s.active_secs < s.span_secs);
        assert!(s.span_secs <= s.elapsed_secs);
    }

    #[test]
    fn threshold_gap_is_idle_and_shorter_gaps_are_active() {
        let ts = |m: i64| start() + TimeDelta::minutes(m);
        let five = TimeDelta::minutes(5);
        assert_eq!(active_duration(&[ts(0), ts(5)], five), TimeDelta::zero());
        assert_eq!(active_duration(&[ts(0), ts(4), ts(8)], five), TimeDelta::minutes(8));
        assert_eq!(active_duration(&[ts(0)], five), TimeDelta::zero());
    }

    #[test]
    #[serial]
    fn progress_is_capped() {
        let b = block(vec![rec(0, RecordKind::Assistant, 1, 0)]);
        let s = compute_stats(
            Some(&b),
            start() + TimeDelta::minutes(150),
            &AccountingConfig::default(),
        );
        assert!((s.progress_percent - 50.0).abs() < 1e-9);
        assert!(s.efficiency <= 1.0);
    }
}
