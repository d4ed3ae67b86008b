//! # Timeline
//!
//! Splits a block into fixed-width segments (20 x 15 minutes by default) and
//! sums the tokens that landed in each, for the burn sparkline.
//!
//! The segment holding the reference instant may carry an *estimated floor*
//! when nothing was recorded in it yet, so a live block does not end in a
//! misleading empty bar. The estimate lives beside the measured segments and
//! never enters them: `segments.iter().sum()` always equals the block total.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Block;

/// A presentation-only value for the current segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EstimatedSegment {
    pub index: usize,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub segment_minutes: u32,
    /// Measured tokens per segment
    pub segments: Vec<u64>,
    /// Segment containing the reference instant, when inside the block
    pub current_segment: Option<usize>,
    pub estimated_floor: Option<EstimatedSegment>,
}

impl Timeline {
    pub fn empty(segment_minutes: u32, segment_count: usize) -> Self {
        Self {
            segment_minutes,
            segments: vec![0; segment_count],
            current_segment: None,
            estimated_floor: None,
        }
    }

    pub fn measured_total(&self) -> u64 {
        self.segments.iter().sum()
    }

    /// Segments with the estimated floor applied, for drawing only
    pub fn display_values(&self) -> Vec<u64> {
        let mut values = self.segments.clone();
        if let Some(est) = self.estimated_floor {
            if let Some(slot) = values.get_mut(est.index) {
                *slot = est.tokens;
            }
        }
        values
    }
}

/// Segment of `ts`, `None` when before `start` or past the last segment
fn segment_index(
    start: DateTime<Utc>,
    ts: DateTime<Utc>,
    segment_secs: i64,
    count: usize,
) -> Option<usize> {
    let offset = (ts - start).num_seconds();
    if offset < 0 || segment_secs <= 0 {
        return None;
    }
    let idx = usize::try_from(offset / segment_secs).ok()?;
    (idx < count).then_some(idx)
}

pub fn build_timeline(
    block: Option<&Block>,
    reference: DateTime<Utc>,
    segment_minutes: u32,
    segment_count: usize,
) -> Timeline {
    let mut timeline = Timeline::empty(segment_minutes, segment_count);
    let Some(block) = block else {
        return timeline;
    };
    if block.records.is_empty() {
        return timeline;
    }
    let segment_secs = i64::from(segment_minutes) * 60;

    for r in &block.records {
        if !r.contributes() {
            continue;
        }
        if let Some(idx) = segment_index(block.start, r.ts, segment_secs, segment_count) {
            timeline.segments[idx] += r.contributed().total();
        }
    }

    if !block.contains(reference) {
        return timeline;
    }
    let Some(current) = segment_index(block.start, reference, segment_secs, segment_count) else {
        return timeline;
    };
    timeline.current_segment = Some(current);

    if timeline.segments[current] == 0 {
        let nonzero: Vec<u64> = timeline
            .segments
            .iter()
            .copied()
            .filter(|v| *v > 0)
            .collect();
        if !nonzero.is_empty() {
            let avg = nonzero.iter().sum::<u64>() as f64 / nonzero.len() as f64;
            let into_segment = (reference - block.start).num_seconds() % segment_secs;
            let fraction = into_segment as f64 / segment_secs as f64;
            timeline.estimated_floor = Some(EstimatedSegment {
                index: current,
                tokens: ((avg * fraction).round() as u64).max(1),
            });
        }
    }
    timeline
}
