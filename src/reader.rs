//! # Log Reader
//!
//! Finds transcript files under `<root>/projects/<project>/*.jsonl` and turns
//! their lines into [`UsageRecord`]s merged in chronological order.
//!
//! Nothing in here is fatal: unreadable files and malformed lines are logged at
//! debug level and skipped, a missing root simply yields no records.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::models::{RecordKind, TranscriptLine, UsageRecord};
use crate::tokens::line_usage;

/// Why a line did not become a record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record has no timestamp")]
    MissingTimestamp,
    #[error("unparseable timestamp: {0}")]
    BadTimestamp(String),
}

/// Parse a timestamp into UTC. Offset-less timestamps are taken as UTC so that
/// naive and zone-aware instants never meet downstream.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(RecordError::BadTimestamp(s.to_string()))
}

/// Build a record from an already-deserialized line
pub fn record_from_line(line: &TranscriptLine) -> Result<UsageRecord, RecordError> {
    let ts_raw = line
        .timestamp
        .as_deref()
        .ok_or(RecordError::MissingTimestamp)?;
    let ts = parse_timestamp(ts_raw)?;
    let kind = RecordKind::parse(line.kind.as_deref());
    let is_error = kind == RecordKind::Error || line.error.as_ref().is_some_and(|e| !e.is_null());
    Ok(UsageRecord {
        ts,
        kind,
        session_id: line.session_id.clone(),
        usage: line_usage(line),
        model: line.model().map(str::to_string),
        // message.id identifies the API response; uuid is the per-line fallback
        message_id: line
            .message_id()
            .map(str::to_string)
            .or_else(|| line.uuid.clone()),
        request_id: line.request_id.clone(),
        is_error,
    })
}

pub fn parse_record(raw: &str) -> Result<UsageRecord, RecordError> {
    let line: TranscriptLine = serde_json::from_str(raw)?;
    record_from_line(&line)
}

/// All records of one file, in file order. Bad lines are skipped.
pub fn read_records(path: &Path) -> Vec<UsageRecord> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            debug!(path = %path.display(), %err, "cannot open transcript");
            return Vec::new();
        }
    };
    let reader = BufReader::new(file);
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                debug!(path = %path.display(), line = idx + 1, %err, "unreadable line");
                continue;
            }
        };
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        match parse_record(t) {
            Ok(r) => out.push(r),
            Err(err) => {
                debug!(path = %path.display(), line = idx + 1, %err, "skipping record");
            }
        }
    }
    out
}

fn modified_since(path: &Path, cutoff: DateTime<Utc>) -> bool {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => DateTime::<Utc>::from(modified) >= cutoff,
        // Unknown mtime: read it rather than silently lose data
        Err(_) => true,
    }
}

/// `*.jsonl` files directly inside each project directory under
/// `<base>/projects`. With a cutoff, files not modified since then are skipped.
pub fn find_transcript_files(bases: &[PathBuf], cutoff: Option<DateTime<Utc>>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for base in bases {
        let root = base.join("projects");
        if !root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("jsonl")
            {
                continue;
            }
            if let Some(c) = cutoff {
                if !modified_since(path, c) {
                    continue;
                }
            }
            files.push(path.to_path_buf());
        }
    }
    files
}

/// Records from every transcript, merged chronologically by timestamp.
/// Records older than `cutoff` are dropped. The sort is stable, so records
/// with equal timestamps keep file order.
pub fn load_records(bases: &[PathBuf], cutoff: Option<DateTime<Utc>>) -> Vec<UsageRecord> {
    let files = find_transcript_files(bases, cutoff);
    debug!(files = files.len(), "scanning transcripts");
    let mut records: Vec<UsageRecord> = files
        .iter()
        .flat_map(|p| read_records(p))
        .filter(|r| cutoff.is_none_or(|c| r.ts >= c))
        .collect();
    records.sort_by_key(|r| r.ts);
    records
}

/// Locate `<session_id>.jsonl` in any project directory
pub fn find_session_transcript(bases: &[PathBuf], session_id: &str) -> Option<PathBuf> {
    if session_id.is_empty() {
        return None;
    }
    let file_name = format!("{session_id}.jsonl");
    bases
        .iter()
        .map(|b| b.join("projects"))
        .filter(|root| root.is_dir())
        .flat_map(|root| {
            WalkDir::new(root)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
        })
        .map(|project| project.path().join(&file_name))
        .find(|candidate| candidate.is_file())
}
