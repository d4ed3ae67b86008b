//! # Window Module
//!
//! Partitions the merged record stream into fixed 5-hour blocks and picks the
//! block a status line should describe.
//!
//! Blocks are anchored at the hour-floor of the first record and follow each
//! other without gaps or overlap: block `k` covers
//! `[anchor + k * 5h, anchor + (k + 1) * 5h)`. Windows that saw no records are
//! still emitted, flagged `is_gap`, so the sequence stays contiguous. Silent
//! stretches longer than [`MAX_GAP_BLOCKS`] windows are not materialized; the
//! next block keeps its `anchor + k * 5h` alignment.
//!
//! The anchor depends on which records survive the reader's lookback cutoff,
//! so block boundaries shift as the cutoff slides forward. Changing the
//! anchoring rule means changing the cutoff filter in `reader::load_records`
//! together with it.

use chrono::{DateTime, TimeDelta, Timelike, Utc};

use crate::models::{Block, UsageRecord};
use crate::utils::{WINDOW_DURATION_HOURS, WINDOW_DURATION_SECONDS};

/// Which rule selected the block handed to the statistics stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLocation {
    /// The block contains the reference instant
    Current,
    /// No block contains the reference instant; this is the latest block the
    /// session wrote to
    SessionAnchor,
}

pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Longest run of empty windows emitted between two occupied blocks (10 days)
pub const MAX_GAP_BLOCKS: usize = 48;

/// Block index of `ts` relative to `anchor`, `None` before the anchor.
/// Integer division truncates toward zero, so the sign is checked first.
fn block_index(anchor: DateTime<Utc>, ts: DateTime<Utc>) -> Option<usize> {
    let offset = (ts - anchor).num_seconds();
    if offset < 0 {
        return None;
    }
    usize::try_from(offset / WINDOW_DURATION_SECONDS).ok()
}

fn empty_block(anchor: DateTime<Utc>, idx: usize) -> Block {
    let offset = i64::try_from(idx).unwrap_or(i64::MAX / WINDOW_DURATION_SECONDS);
    let start = anchor + TimeDelta::seconds(offset * WINDOW_DURATION_SECONDS);
    Block {
        start,
        end: start + TimeDelta::hours(WINDOW_DURATION_HOURS),
        is_gap: true,
        records: Vec::new(),
    }
}

/// Group records into 5-hour blocks.
///
/// Records are sorted by timestamp first (stable, so ties keep their order);
/// every record lands in exactly one block. Work is bounded by the number of
/// records, not by the time they span.
pub fn assign_blocks(mut records: Vec<UsageRecord>) -> Vec<Block> {
    records.sort_by_key(|r| r.ts);
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let anchor = floor_to_hour(first.ts);

    let mut blocks: Vec<Block> = Vec::new();
    let mut last_idx = 0usize;
    for record in records {
        // Sorted input and a floored anchor: the index is never negative here
        let idx = block_index(anchor, record.ts).unwrap_or(0);
        if blocks.is_empty() || idx > last_idx {
            if !blocks.is_empty() {
                let missing = idx - last_idx - 1;
                if missing <= MAX_GAP_BLOCKS {
                    blocks.extend((last_idx + 1..idx).map(|k| empty_block(anchor, k)));
                }
            }
            blocks.push(empty_block(anchor, idx));
            last_idx = idx;
        }
        if let Some(block) = blocks.last_mut() {
            block.is_gap = false;
            block.records.push(record);
        }
    }
    blocks
}

/// The block whose `[start, end)` contains `reference`, if any
pub fn find_current_block(blocks: &[Block], reference: DateTime<Utc>) -> Option<&Block> {
    blocks.iter().find(|b| b.contains(reference))
}

/// Block to report on: the one containing `reference`, else the most recent
/// block holding a record from `session_id`.
pub fn locate_block<'a>(
    blocks: &'a [Block],
    reference: DateTime<Utc>,
    session_id: Option<&str>,
) -> Option<(&'a Block, BlockLocation)> {
    if let Some(b) = find_current_block(blocks, reference) {
        return Some((b, BlockLocation::Current));
    }
    let sid = session_id?;
    blocks
        .iter()
        .rev()
        .find(|b| b.has_session(sid))
        .map(|b| (b, BlockLocation::SessionAnchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordKind;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn rec(ts: DateTime<Utc>, sid: &str) -> UsageRecord {
        UsageRecord {
            ts,
            kind: RecordKind::Assistant,
            session_id: Some(sid.to_string()),
            usage: None,
            model: None,
            message_id: None,
            request_id: None,
            is_error: false,
        }
    }

    #[test]
    fn anchor_is_first_record_hour_floor() {
        let blocks = assign_blocks(vec![rec(at(9, 47), "a"), rec(at(13, 59), "a")]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start, at(9, 0));
        assert_eq!(blocks[0].end, at(14, 0));
    }

    #[test]
    fn boundary_instant_belongs_to_next_block() {
        let blocks = assign_blocks(vec![rec(at(9, 0), "a"), rec(at(14, 0), "a")]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].records.len(), 1);
        assert_eq!(blocks[1].start, at(14, 0));
        assert_eq!(blocks[1].records.len(), 1);
    }

    #[test]
    fn empty_windows_are_emitted_as_gaps() {
        let blocks = assign_blocks(vec![rec(at(0, 10), "a"), rec(at(11, 30), "a")]);
        assert_eq!(blocks.len(), 3);
        assert!(!blocks[0].is_gap);
        assert!(blocks[1].is_gap);
        assert!(blocks[1].records.is_empty());
        assert!(!blocks[2].is_gap);
        assert_eq!(blocks[2].start, at(10, 0));
    }

    #[test]
    fn far_future_record_does_not_materialize_the_gap() {
        let far = Utc.with_ymd_and_hms(2900, 1, 1, 0, 0, 0).unwrap();
        let blocks = assign_blocks(vec![rec(at(9, 30), "a"), rec(far, "a")]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].start, at(9, 0));
        assert!(blocks[1].contains(far));
        assert!(!blocks[1].is_gap);
        let offset = (blocks[1].start - blocks[0].start).num_seconds();
        assert_eq!(offset % WINDOW_DURATION_SECONDS, 0);
        assert!(find_current_block(&blocks, at(10, 0)).is_some());
    }

    #[test]
    fn gap_run_at_the_limit_is_still_emitted() {
        let start = at(0, 0);
        let window = TimeDelta::hours(WINDOW_DURATION_HOURS);
        let within = start + window * (MAX_GAP_BLOCKS as i32 + 1);
        let blocks = assign_blocks(vec![rec(start, "a"), rec(within, "a")]);
        assert_eq!(blocks.len(), MAX_GAP_BLOCKS + 2);
        assert!(blocks.windows(2).all(|w| w[0].end == w[1].start));

        let beyond = start + window * (MAX_GAP_BLOCKS as i32 + 2);
        let blocks = assign_blocks(vec![rec(start, "a"), rec(beyond, "a")]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].start, beyond);
    }

    #[test]
    fn no_records_no_blocks() {
        assert!(assign_blocks(Vec::new()).is_empty());
    }

    #[test]
    fn reference_outside_all_blocks_is_none() {
        let blocks = assign_blocks(vec![rec(at(1, 0), "a")]);
        assert!(find_current_block(&blocks, at(7, 0)).is_none());
        assert!(find_current_block(&blocks, at(0, 59)).is_none());
        assert!(find_current_block(&blocks, at(5, 59)).is_some());
    }

    #[test]
    fn locate_falls_back_to_latest_session_block() {
        let blocks = assign_blocks(vec![
            rec(at(0, 0), "s1"),
            rec(at(6, 0), "s1"),
            rec(at(11, 0), "s2"),
        ]);
        let (b, how) = locate_block(&blocks, at(23, 0), Some("s1")).unwrap();
        assert_eq!(how, BlockLocation::SessionAnchor);
        assert_eq!(b.start, at(5, 0));

        let (b, how) = locate_block(&blocks, at(12, 0), Some("s1")).unwrap();
        assert_eq!(how, BlockLocation::Current);
        assert_eq!(b.start, at(10, 0));

        assert!(locate_block(&blocks, at(23, 0), Some("nobody")).is_none());
        assert!(locate_block(&blocks, at(23, 0), None).is_none());
    }
}
