//! # Claude Burnline
//!
//! A status line for Claude Code that reports token burn inside the 5-hour
//! usage block alongside how full the current conversation is.
//!
//! ## Overview
//!
//! Every invocation recomputes everything from the append-only transcript
//! logs under `~/.claude/projects`:
//! - records are merged chronologically and deduplicated
//! - grouped into contiguous 5-hour blocks anchored at the first record's hour
//! - the block containing "now" (or the session's latest block) is summarized
//!   into token totals, cost, burn rate and a 15-minute sparkline timeline
//! - the session transcript gives the conversation (compaction) window
//!
//! Block-window and conversation-window totals are distinct types
//! ([`models::Tokens`]) and cannot be swapped for each other.
//!
//! ## Features
//!
//! - `colors` (default): Enables terminal color output via owo-colors

/// Command-line argument parsing and configuration
pub mod cli;

/// Conversation (compaction) window of the invoking session
pub mod conversation;

/// Duplicate record removal
pub mod dedup;

/// Display formatting for text and JSON output
pub mod display;

/// Diagnostics to the error log
pub mod logging;

/// Data models for hooks, transcript lines, records, and blocks
pub mod models;

/// Model-specific pricing calculations
pub mod pricing;

/// Transcript discovery and parsing
pub mod reader;

/// Per-block aggregation
pub mod stats;

/// End-to-end snapshot for one invocation
pub mod status;

/// Per-segment token sums for the sparkline
pub mod timeline;

/// Usage field resolution
pub mod tokens;

/// Utility functions for paths, formatting, and environment
pub mod utils;

/// 5-hour block assignment and selection
pub mod window;
