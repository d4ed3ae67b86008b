//! # Display
//!
//! Turns a [`StatusSnapshot`] into terminal lines or JSON.
//!
//! Four lines, each optional: a header (model, directory, messages, cost), the
//! conversation window ("Compact"), the 5-hour block ("Session") and the burn
//! sparkline ("Burn"). Three layouts trade detail for width.

use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

// Provide a no-op color shim when "colors" feature is disabled
#[cfg(not(feature = "colors"))]
pub mod color_shim {
    use std::fmt::{self, Display, Formatter};

    #[derive(Clone)]
    pub struct Plain(pub String);

    impl Display for Plain {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    pub trait ColorizeShim {
        fn as_str(&self) -> &str;

        fn bright_black(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_white(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_cyan(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_yellow(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_red(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bright_green(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn on_red(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bold(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn dimmed(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
    }

    impl ColorizeShim for &str {
        fn as_str(&self) -> &str {
            self
        }
    }
    impl ColorizeShim for String {
        fn as_str(&self) -> &str {
            self.as_str()
        }
    }
    impl ColorizeShim for Plain {
        fn as_str(&self) -> &str {
            &self.0
        }
    }
}

#[cfg(not(feature = "colors"))]
use color_shim::ColorizeShim as OwoColorize;

use crate::cli::{DisplayConfig, DisplayModeArg};
use crate::status::StatusSnapshot;
use crate::timeline::Timeline;
use crate::utils::{
    format_currency, format_duration_secs, format_tokens, format_tokens_short, parse_u64_env,
    truncate_text,
};

const SPARK_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

static ANSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
static CLAUDE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^claude\s+").unwrap());
static VERSION_FIRST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\d.]+)\s+(haiku|sonnet|opus)").unwrap());
static FAMILY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)opus|sonnet|haiku").unwrap());
static CONTEXT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(\s*1m\s+context\s*\)").unwrap());

/// Resolved layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Full,
    Compact,
    Tight,
}

pub fn display_mode_for_width(width: usize) -> DisplayMode {
    if width >= 68 {
        DisplayMode::Full
    } else if width >= 35 {
        DisplayMode::Compact
    } else {
        DisplayMode::Tight
    }
}

/// Usable columns: `COLUMNS`, then the terminal, then 80. One column is kept
/// free so the host does not wrap the last character.
pub fn terminal_width() -> usize {
    if let Some(cols) = parse_u64_env("COLUMNS") {
        return (cols as usize).saturating_sub(1);
    }
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return usize::from(w) - 1;
        }
    }
    80
}

pub fn resolve_mode(requested: DisplayModeArg, width: usize) -> DisplayMode {
    match requested {
        DisplayModeArg::Auto => display_mode_for_width(width),
        DisplayModeArg::Full => DisplayMode::Full,
        DisplayModeArg::Compact => DisplayMode::Compact,
        DisplayModeArg::Tight => DisplayMode::Tight,
    }
}

pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// Columns a string occupies: escapes are free, emoji and CJK take two
pub fn display_width(s: &str) -> usize {
    strip_ansi(s)
        .chars()
        .map(|c| match c as u32 {
            0xFE00..=0xFE0F | 0x200D => 0,
            0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF => 2,
            0xFF00..=0xFF60 | 0x1F300..=0x1FAFF => 2,
            _ => 1,
        })
        .sum()
}

/// "Claude 3.5 Sonnet" -> "Sonnet 3.5"; tight: "Son3.5"
pub fn shorten_model_name(model: &str, tight: bool) -> String {
    let name = CONTEXT_SUFFIX_RE.replace_all(model, "");
    let name = CLAUDE_PREFIX_RE.replace(name.trim(), "").into_owned();
    let mut name = match VERSION_FIRST_RE.captures(&name) {
        Some(caps) => format!("{} {}{}", &caps[2], &caps[1], &name[caps[0].len()..]),
        None => name,
    };
    if tight {
        name = FAMILY_RE
            .replace_all(&name, |caps: &regex::Captures| {
                match caps[0].to_ascii_lowercase().as_str() {
                    "opus" => "Op",
                    "sonnet" => "Son",
                    _ => "Hai",
                }
            })
            .into_owned();
        name.retain(|c| c != ' ');
    }
    name
}

#[derive(Clone, Copy)]
enum Tone {
    Label,
    Model,
    Dir,
    Value,
    Good,
    Warn,
    Bad,
    Muted,
    Alert,
}

fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match tone {
        Tone::Label | Tone::Dir => text.bright_cyan().to_string(),
        Tone::Model | Tone::Warn => text.bright_yellow().to_string(),
        Tone::Value => text.bright_white().to_string(),
        Tone::Good => text.bright_green().to_string(),
        Tone::Bad => text.bright_red().bold().to_string(),
        Tone::Muted => text.bright_black().to_string(),
        Tone::Alert => text.on_red().bright_white().bold().to_string(),
    }
}

fn percent_tone(pct: f64) -> Tone {
    if pct >= 90.0 {
        Tone::Bad
    } else if pct >= 70.0 {
        Tone::Warn
    } else {
        Tone::Good
    }
}

/// `width` cells; with `show_current` the cell being filled is highlighted
pub fn progress_bar(pct: f64, width: usize, show_current: bool, color: bool) -> String {
    let pct = pct.clamp(0.0, 100.0);
    let filled = ((width as f64 * pct / 100.0) as usize).min(width);
    let empty = width - filled;
    let tone = percent_tone(pct);
    let done = paint(&"█".repeat(filled), tone, color);
    if show_current && filled < width {
        format!(
            "{}{}{}",
            done,
            paint("▓", Tone::Value, color),
            paint(&"▒".repeat(empty - 1), Tone::Muted, color)
        )
    } else {
        format!("{}{}", done, paint(&"▒".repeat(empty), Tone::Muted, color))
    }
}

/// Bar heights scaled between the series minimum and maximum, sampled down
/// to `width`. `estimated` marks a bar that is not a measurement.
pub fn sparkline(values: &[u64], width: usize, estimated: Option<usize>, color: bool) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let n = width.min(values.len());
    let (Some(&max), Some(&min)) = (values.iter().max(), values.iter().min()) else {
        return String::new();
    };
    if max == min {
        let (ch, tone) = if max == 0 {
            (SPARK_CHARS[0], Tone::Muted)
        } else {
            (SPARK_CHARS[4], Tone::Good)
        };
        return paint(&ch.to_string().repeat(n), tone, color);
    }
    let step = values.len() as f64 / n as f64;
    let span = (max - min) as f64;
    let mut out = String::new();
    for i in 0..n {
        let idx = ((i as f64 * step) as usize).min(values.len() - 1);
        let norm = (values[idx] - min) as f64 / span;
        let ch = SPARK_CHARS[((norm * SPARK_CHARS.len() as f64) as usize).min(SPARK_CHARS.len() - 1)];
        let tone = if estimated == Some(idx) {
            Tone::Muted
        } else if norm > 0.7 {
            Tone::Bad
        } else if norm > 0.4 {
            Tone::Warn
        } else {
            Tone::Good
        };
        out.push_str(&paint(&ch.to_string(), tone, color));
    }
    out
}

fn timeline_sparkline(t: &Timeline, width: usize, color: bool) -> String {
    sparkline(
        &t.display_values(),
        width,
        t.estimated_floor.map(|e| e.index),
        color,
    )
}

#[derive(Clone, Copy)]
struct HeaderOpts {
    extras: bool,
    messages: bool,
    max_dir: Option<usize>,
}

fn header_parts(snap: &StatusSnapshot, opts: HeaderOpts, color: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let model = format!("[{}]", shorten_model_name(&snap.model, false));
    parts.push(paint(&model, Tone::Model, color));

    let dir = match opts.max_dir {
        Some(n) => truncate_text(&snap.directory, n),
        None => snap.directory.clone(),
    };
    parts.push(paint(&format!("📁 {dir}"), Tone::Dir, color));

    let messages = snap.conversation.message_count();
    if opts.messages && messages > 0 {
        parts.push(paint(&format!("💬 {messages}"), Tone::Label, color));
    }
    if opts.extras {
        if snap.lines_added > 0 || snap.lines_removed > 0 {
            parts.push(format!(
                "{}/{}",
                paint(&format!("+{}", snap.lines_added), Tone::Good, color),
                paint(&format!("-{}", snap.lines_removed), Tone::Bad, color)
            ));
        }
        if snap.conversation.error_count > 0 {
            parts.push(paint(
                &format!("⚠️ {}", snap.conversation.error_count),
                Tone::Bad,
                color,
            ));
        }
        if snap.session_cost > 0.0 {
            let tone = if snap.session_cost > 10.0 {
                Tone::Warn
            } else {
                Tone::Value
            };
            parts.push(paint(
                &format!("💰 {}", format_currency(snap.session_cost)),
                tone,
                color,
            ));
        }
    }
    parts
}

/// Header line for full mode, dropping segments until it fits `width`
fn header_full(snap: &StatusSnapshot, width: usize, color: bool) -> String {
    let attempts = [
        HeaderOpts {
            extras: true,
            messages: true,
            max_dir: None,
        },
        HeaderOpts {
            extras: false,
            messages: true,
            max_dir: None,
        },
        HeaderOpts {
            extras: false,
            messages: true,
            max_dir: Some(12),
        },
        HeaderOpts {
            extras: false,
            messages: false,
            max_dir: Some(10),
        },
    ];
    let mut line = header_parts(snap, attempts[0], color).join(" | ");
    for opts in &attempts[1..] {
        if display_width(&line) <= width {
            break;
        }
        line = header_parts(snap, *opts, color).join(" | ");
    }
    line
}

fn header_short(snap: &StatusSnapshot, mode: DisplayMode, color: bool) -> String {
    let tight = mode == DisplayMode::Tight;
    let model = format!("[{}]", shorten_model_name(&snap.model, tight));
    let mut parts = vec![paint(&model, Tone::Model, color)];
    if !tight {
        parts.push(paint(&snap.directory, Tone::Dir, color));
        let messages = snap.conversation.message_count();
        if messages > 0 {
            parts.push(paint(&format!("💬{messages}"), Tone::Label, color));
        }
    }
    parts.join(" ")
}

fn compact_line(snap: &StatusSnapshot, mode: DisplayMode, color: bool) -> String {
    let pct = f64::from(snap.compaction.percent);
    let tokens = snap.conversation.tokens.get();
    let threshold = snap.compaction.threshold.get();
    let pct_text = format!("[{}%]", snap.compaction.percent);
    match mode {
        DisplayMode::Full => {
            let (label, pct_disp) = if pct >= 85.0 {
                (
                    paint("Compact:", Tone::Alert, color),
                    paint(&pct_text, Tone::Alert, color),
                )
            } else {
                (
                    paint("Compact:", Tone::Label, color),
                    paint(&pct_text, percent_tone(pct), color),
                )
            };
            let mut parts = vec![
                label,
                progress_bar(pct, 20, false, color),
                pct_disp,
                paint(
                    &format!("{}/{}", format_tokens(tokens), format_tokens(threshold)),
                    Tone::Value,
                    color,
                ),
            ];
            let cached = snap.conversation.counts.cache_hit_ratio() * 100.0;
            if cached >= 50.0 {
                parts.push(paint(
                    &format!("♻️ {}% cached", cached as u32),
                    Tone::Good,
                    color,
                ));
            }
            parts.join(" ")
        }
        DisplayMode::Compact => format!(
            "{} {} {} {}",
            paint("C:", Tone::Label, color),
            progress_bar(pct, 12, false, color),
            paint(&pct_text, percent_tone(pct), color),
            paint(
                &format!(
                    "{}/{}",
                    format_tokens_short(tokens),
                    format_tokens_short(threshold)
                ),
                Tone::Value,
                color
            )
        ),
        DisplayMode::Tight => format!(
            "{} {} {} {}",
            paint("C:", Tone::Label, color),
            progress_bar(pct, 8, false, color),
            paint(&pct_text, percent_tone(pct), color),
            paint(&format_tokens_short(tokens), Tone::Value, color)
        ),
    }
}

fn local_hm(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

fn session_line(snap: &StatusSnapshot, mode: DisplayMode, color: bool) -> Option<String> {
    let block = snap.block.as_ref()?;
    let progress = block.progress_percent;
    let elapsed = format_duration_secs(block.elapsed_secs);
    let pct_text = paint(&format!("[{}%]", progress as u32), Tone::Value, color);
    let line = match mode {
        DisplayMode::Full => {
            let mut parts = vec![
                paint("Session:", Tone::Label, color),
                progress_bar(progress, 20, true, color),
                pct_text,
                paint(&format!("{elapsed}/5h"), Tone::Value, color),
            ];
            if let (Some(start), Some(end)) = (block.start, block.end) {
                let now = local_hm(snap.reference);
                if snap.block_ended() {
                    parts.push(paint(
                        &format!("{now} (ended at {})", local_hm(end)),
                        Tone::Warn,
                        color,
                    ));
                } else {
                    parts.push(format!(
                        "{} {}",
                        paint(&now, Tone::Value, color),
                        paint(
                            &format!("({} to {})", local_hm(start), local_hm(end)),
                            Tone::Good,
                            color
                        )
                    ));
                }
            }
            parts.join(" ")
        }
        DisplayMode::Compact => format!(
            "{} {} {} {}",
            paint("S:", Tone::Label, color),
            progress_bar(progress, 12, false, color),
            pct_text,
            paint(&format!("{elapsed}/5h"), Tone::Value, color)
        ),
        DisplayMode::Tight => format!(
            "{} {} {} {}",
            paint("S:", Tone::Label, color),
            progress_bar(progress, 8, false, color),
            pct_text,
            paint(&elapsed, Tone::Value, color)
        ),
    };
    Some(line)
}

fn burn_line(snap: &StatusSnapshot, mode: DisplayMode, color: bool) -> Option<String> {
    let block = snap.block.as_ref()?;
    let total = format_tokens_short(block.total_tokens.get());
    let line = match mode {
        DisplayMode::Full => format!(
            "{} {} {}, Rate: {} t/m",
            paint("Burn:   ", Tone::Label, color),
            timeline_sparkline(&snap.timeline, 20, color),
            paint(&format!("{total} token(w/cache)"), Tone::Value, color),
            format_tokens_short(block.burn_rate as u64)
        ),
        DisplayMode::Compact => format!(
            "{} {} {}",
            paint("B:", Tone::Label, color),
            timeline_sparkline(&snap.timeline, 12, color),
            paint(&total, Tone::Value, color)
        ),
        DisplayMode::Tight => format!(
            "{} {} {}",
            paint("B:", Tone::Label, color),
            timeline_sparkline(&snap.timeline, 8, color),
            paint(&total, Tone::Value, color)
        ),
    };
    Some(line)
}

pub fn render_lines(
    snap: &StatusSnapshot,
    config: &DisplayConfig,
    mode: DisplayMode,
    width: usize,
) -> Vec<String> {
    let color = config.color;
    let mut lines = Vec::new();
    if config.lines.header {
        lines.push(match mode {
            DisplayMode::Full => header_full(snap, width, color),
            _ => header_short(snap, mode, color),
        });
    }
    if config.lines.compact {
        lines.push(compact_line(snap, mode, color));
    }
    if config.lines.session {
        lines.extend(session_line(snap, mode, color));
    }
    if config.lines.burn {
        lines.extend(burn_line(snap, mode, color));
    }
    lines
}

pub fn print_text_output(snap: &StatusSnapshot, config: &DisplayConfig) {
    let width = terminal_width();
    let mode = resolve_mode(config.mode, width);
    for line in render_lines(snap, config, mode, width) {
        println!("{line}");
    }
}

pub fn build_json_output(snap: &StatusSnapshot) -> serde_json::Value {
    let block = snap.block.as_ref().map(|b| {
        let mut v = serde_json::to_value(b).unwrap_or_default();
        if let Some(obj) = v.as_object_mut() {
            obj.insert(
                "location".to_string(),
                serde_json::to_value(snap.block_location).unwrap_or_default(),
            );
            obj.insert(
                "skipped_duplicates".to_string(),
                serde_json::json!(snap.skipped_duplicates),
            );
        }
        v
    });
    let t = &snap.timeline;
    serde_json::json!({
        "model": {
            "id": snap.model_id,
            "display_name": snap.model,
        },
        "directory": snap.directory,
        "session_id": snap.session_id,
        "session": {
            "cost_usd": snap.session_cost,
            "cost_source": if snap.cost_reported { "host" } else { "computed" },
            "lines_added": snap.lines_added,
            "lines_removed": snap.lines_removed,
        },
        "conversation": {
            "scope": snap.conversation.tokens.scope(),
            "tokens": snap.conversation.tokens,
            "breakdown": snap.conversation.counts,
            "compaction_threshold": snap.compaction.threshold,
            "percent": snap.compaction.percent,
            "percent_source": if snap.compaction.reported { "host" } else { "computed" },
            "user_messages": snap.conversation.user_messages,
            "assistant_messages": snap.conversation.assistant_messages,
            "error_count": snap.conversation.error_count,
        },
        "block": block,
        "timeline": {
            "segment_minutes": t.segment_minutes,
            "segments": t.segments,
            "measured_total": t.measured_total(),
            "current_segment": t.current_segment,
            "estimated_current_segment": t.estimated_floor.map(|e| serde_json::json!({
                "index": e.index,
                "tokens": e.tokens,
                "estimated": true,
            })),
        },
        "reference": snap.reference.to_rfc3339(),
        "degraded": snap.degraded,
    })
}

pub fn print_json_output(snap: &StatusSnapshot) -> anyhow::Result<()> {
    let out = build_json_output(snap);
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

/// Printed when the host sent nothing on stdin
pub fn waiting_line(color: bool) -> String {
    format!(
        "{} {}",
        paint("❯", Tone::Label, color),
        paint("[waiting for valid input]", Tone::Muted, color)
    )
}

/// Two lines printed when the pipeline itself failed
pub fn fallback_lines(color: bool) -> [String; 2] {
    [
        format!("{} . | 0 | 0%", paint("[Error]", Tone::Bad, color)),
        paint("Check ~/.claude/statusline-error.log", Tone::Muted, color),
    ]
}
