use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const WINDOW_DURATION_HOURS: i64 = 5;
pub const WINDOW_DURATION_SECONDS: i64 = WINDOW_DURATION_HOURS * 60 * 60;

/// Default context window when the hook does not report one
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;
/// Share of the context window at which the host compacts the conversation
pub const COMPACTION_RATIO: f64 = 0.8;

pub fn claude_paths(override_env: Option<&str>) -> Vec<PathBuf> {
    let mut paths = vec![];
    if let Some(list) = override_env {
        let list = list.trim();
        if !list.is_empty() {
            for p in list.split(',') {
                let p = p.trim();
                if p.is_empty() {
                    continue;
                }
                let pb = PathBuf::from(p);
                if pb.join("projects").is_dir() {
                    paths.push(pb);
                }
            }
            if !paths.is_empty() {
                return paths;
            }
        }
    }
    let basedirs = directories::BaseDirs::new();
    let home = basedirs
        .as_ref()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~"));
    let xdg_config = basedirs
        .as_ref()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| home.join(".config"));
    // Prefer ~/.claude, then XDG config
    for base in [home.join(".claude"), xdg_config.join("claude")].into_iter() {
        if base.join("projects").is_dir() {
            paths.push(base);
        }
    }
    paths
}

/// `~/.claude/statusline-error.log`
pub fn error_log_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".claude").join("statusline-error.log"))
}

pub fn read_stdin() -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn parse_u64_env(var: &str) -> Option<u64> {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Last path component, `.` when there is none
pub fn dir_name(p: &str) -> String {
    Path::new(p)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

/// `1.5M`, `45.0K`, `999`
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

/// Three significant digits: `200M`, `14.0M`, `332K`, `14.0K`, `999`
pub fn format_tokens_short(n: u64) -> String {
    if n >= 1_000_000 {
        let v = n as f64 / 1e6;
        if v >= 100.0 {
            format!("{}M", v.round() as u64)
        } else {
            format!("{v:.1}M")
        }
    } else if n >= 1_000 {
        let v = n as f64 / 1e3;
        if v >= 100.0 {
            format!("{}K", v.round() as u64)
        } else {
            format!("{v:.1}K")
        }
    } else {
        n.to_string()
    }
}

pub fn format_currency(v: f64) -> String {
    if v < 0.01 {
        format!("${v:.4}")
    } else if v < 1.0 {
        format!("${v:.3}")
    } else {
        format!("${v:.2}")
    }
}

/// `42s`, `17m`, `2h`, `1h15m`
pub fn format_duration_secs(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        if m > 0 {
            format!("{h}h{m}m")
        } else {
            format!("{h}h")
        }
    }
}

/// Cut to `max_len` characters, ending in `...` when something was dropped
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let count = text.chars().count();
    if count <= max_len {
        return text.to_string();
    }
    if max_len <= 3 {
        return text.chars().take(max_len).collect();
    }
    let mut out: String = text.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}
