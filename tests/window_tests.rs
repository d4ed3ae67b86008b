use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use claude_burnline::cli::AccountingConfig;
use claude_burnline::dedup::dedup;
use claude_burnline::models::{RecordKind, TokenCounts, UsageRecord};
use claude_burnline::stats::compute_stats;
use claude_burnline::timeline::build_timeline;
use claude_burnline::window::{assign_blocks, find_current_block, floor_to_hour};
use serial_test::serial;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 14, 9, 0, 0).unwrap()
}

fn create_test_record(ts: DateTime<Utc>, output: u64, session_id: &str) -> UsageRecord {
    UsageRecord {
        ts,
        kind: RecordKind::Assistant,
        session_id: Some(session_id.to_string()),
        usage: Some(TokenCounts {
            output,
            ..Default::default()
        }),
        model: Some("claude-sonnet-4-20250514".to_string()),
        message_id: None,
        request_id: None,
        is_error: false,
    }
}

#[test]
fn test_every_record_lands_in_exactly_one_block() {
    let offsets_min = [7, 33, 299, 300, 301, 640, 900, 1499, 2000];
    let records: Vec<UsageRecord> = offsets_min
        .iter()
        .map(|m| create_test_record(base() + TimeDelta::minutes(*m), 1, "s"))
        .collect();
    let blocks = assign_blocks(records.clone());

    let anchor = floor_to_hour(records[0].ts);
    assert_eq!(blocks[0].start, anchor);
    for pair in blocks.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
        assert_eq!(pair[0].end - pair[0].start, TimeDelta::hours(5));
    }
    let placed: usize = blocks.iter().map(|b| b.records.len()).sum();
    assert_eq!(placed, records.len());
    for r in &records {
        let holders = blocks.iter().filter(|b| b.contains(r.ts)).count();
        assert_eq!(holders, 1);
        let holder = blocks.iter().find(|b| b.contains(r.ts)).unwrap();
        assert!(holder.records.iter().any(|x| x.ts == r.ts));
    }
}

#[test]
#[serial]
fn test_boundary_scenario() {
    let records = vec![
        create_test_record(base(), 100, "s"),
        create_test_record(base() + TimeDelta::minutes(16), 200, "s"),
        create_test_record(base() + TimeDelta::minutes(301), 50, "s"),
    ];
    let blocks = assign_blocks(records);
    assert_eq!(blocks.len(), 2);

    let first = &blocks[0];
    let cfg = AccountingConfig::default();
    let reference = base() + TimeDelta::minutes(20);
    let timeline = build_timeline(Some(first), reference, 15, 20);
    assert_eq!(timeline.segments[0], 100);
    assert_eq!(timeline.segments[1], 200);
    assert!(timeline.segments[2..].iter().all(|v| *v == 0));
    assert_eq!(timeline.measured_total(), 300);

    let stats = compute_stats(Some(first), reference, &cfg);
    assert_eq!(stats.total_tokens.get(), 300);
    // 16 minute gap is idle
    assert_eq!(stats.active_secs, 0);

    assert_eq!(blocks[1].records.len(), 1);
    assert_eq!(blocks[1].records[0].contributed().total(), 50);
}

#[test]
#[serial]
fn test_stats_and_timeline_agree() {
    let minutes = [0, 3, 4, 29, 31, 95, 96, 180, 240, 299];
    let records: Vec<UsageRecord> = minutes
        .iter()
        .enumerate()
        .map(|(i, m)| create_test_record(base() + TimeDelta::minutes(*m), 10 * (i as u64 + 1), "s"))
        .collect();
    let blocks = assign_blocks(records);
    let block = &blocks[0];
    let reference = base() + TimeDelta::hours(6);
    let stats = compute_stats(Some(block), reference, &AccountingConfig::default());
    let timeline = build_timeline(Some(block), reference, 15, 20);
    assert_eq!(timeline.measured_total(), stats.total_tokens.get());
    assert!(timeline.estimated_floor.is_none());
}

#[test]
#[serial]
fn test_active_never_exceeds_elapsed() {
    let cfg = AccountingConfig::default();
    let tight = vec![
        create_test_record(base() + TimeDelta::minutes(10), 1, "s"),
        create_test_record(base() + TimeDelta::minutes(12), 1, "s"),
        create_test_record(base() + TimeDelta::minutes(14), 1, "s"),
    ];
    let blocks = assign_blocks(tight);
    let s = compute_stats(Some(&blocks[0]), base() + TimeDelta::hours(8), &cfg);
    // No idle gap: active time covers the whole first-to-last span
    assert_eq!(s.active_secs, s.span_secs);
    assert!(s.active_secs <= s.elapsed_secs);

    let gappy = vec![
        create_test_record(base(), 1, "s"),
        create_test_record(base() + TimeDelta::minutes(2), 1, "s"),
        create_test_record(base() + TimeDelta::minutes(60), 1, "s"),
    ];
    let blocks = assign_blocks(gappy);
    let s = compute_stats(Some(&blocks[0]), base() + TimeDelta::hours(8), &cfg);
    assert!(s.active_secs < s.span_secs);
    assert!(s.active_secs < s.elapsed_secs);
}

#[test]
#[serial]
fn test_cache_ratio_bounds() {
    let mut r = create_test_record(base(), 0, "s");
    r.usage = Some(TokenCounts {
        input: 3,
        output: 7,
        cache_create: 11,
        cache_read: 1_000_000,
    });
    let blocks = assign_blocks(vec![r]);
    let s = compute_stats(Some(&blocks[0]), base(), &AccountingConfig::default());
    assert!(s.cache_hit_ratio > 0.0 && s.cache_hit_ratio <= 1.0);

    let mut empty = create_test_record(base(), 0, "s");
    empty.usage = Some(TokenCounts::default());
    let blocks = assign_blocks(vec![empty]);
    let s = compute_stats(Some(&blocks[0]), base(), &AccountingConfig::default());
    assert_eq!(s.cache_hit_ratio, 0.0);
}

#[test]
#[serial]
fn test_no_active_block_gives_zero_results() {
    let blocks = assign_blocks(vec![create_test_record(base(), 500, "s")]);
    let later = base() + TimeDelta::days(1);
    let current = find_current_block(&blocks, later);
    assert!(current.is_none());
    let stats = compute_stats(current, later, &AccountingConfig::default());
    assert_eq!(stats.total_tokens.get(), 0);
    let timeline = build_timeline(current, later, 15, 20);
    assert_eq!(timeline.segments, vec![0; 20]);
}

#[test]
fn test_duplicates_do_not_reach_totals() {
    let mut a = create_test_record(base(), 40, "s");
    a.message_id = Some("msg_1".into());
    a.request_id = Some("req_1".into());
    let b = a.clone();
    let (kept, skipped) = dedup(vec![a, b, create_test_record(base(), 2, "s")]);
    assert_eq!(skipped, 1);
    let blocks = assign_blocks(kept);
    let total: u64 = blocks[0].records.iter().map(|r| r.contributed().total()).sum();
    assert_eq!(total, 42);
}
