use chrono::TimeDelta;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayModeArg {
    /// Pick from terminal width
    #[default]
    Auto,
    /// Four lines, every segment (width >= 68)
    Full,
    /// Short labels (width >= 35)
    Compact,
    /// Minimal segments
    Tight,
}

#[derive(clap::Parser, Debug)]
#[command(name = "claude_burnline", version, about = "Token burn status line for Claude Code")]
pub struct Args {
    /// Force Claude data path(s), comma-separated. Defaults to ~/.claude and ~/.config/claude
    #[arg(long, env = "CLAUDE_CONFIG_DIR")]
    pub claude_config_dir: Option<String>,

    /// Emit JSON instead of colored text
    #[arg(long)]
    pub json: bool,

    /// Lines to show: comma-separated 1,2,3,4, or `simple` (2,3), or `all`
    #[arg(long, value_parser = parse_show)]
    pub show: Option<LineSelection>,

    /// Ignore transcripts not modified within this many hours
    #[arg(long, env = "CLAUDE_SCAN_LOOKBACK_HOURS", default_value_t = 6)]
    pub lookback_hours: u32,

    /// Gaps between records at or above this many minutes count as idle
    #[arg(long, default_value_t = 5)]
    pub idle_threshold_minutes: u32,

    /// Layout: auto|full|compact|tight
    #[arg(long, value_enum, env = "STATUSLINE_DISPLAY_MODE", default_value_t = DisplayModeArg::Auto)]
    pub display_mode: DisplayModeArg,

    /// Debug mode: write detailed diagnostics to the error log
    #[arg(long, env = "CLAUDE_DEBUG")]
    pub debug: bool,
}

/// A parse failure that is not `--help` or `--version` output
pub fn is_usage_error(err: &clap::Error) -> bool {
    use clap::error::ErrorKind;
    !matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// Which of the four status lines to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LineSelection {
    pub header: bool,
    pub compact: bool,
    pub session: bool,
    pub burn: bool,
}

impl LineSelection {
    pub const ALL: Self = Self {
        header: true,
        compact: true,
        session: true,
        burn: true,
    };

    pub const SIMPLE: Self = Self {
        header: false,
        compact: true,
        session: true,
        burn: false,
    };
}

impl Default for LineSelection {
    fn default() -> Self {
        Self::ALL
    }
}

pub fn parse_show(s: &str) -> Result<LineSelection, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        return Ok(LineSelection::ALL);
    }
    if s.eq_ignore_ascii_case("simple") {
        return Ok(LineSelection::SIMPLE);
    }
    let mut sel = LineSelection {
        header: false,
        compact: false,
        session: false,
        burn: false,
    };
    for part in s.split(',') {
        match part.trim() {
            "1" => sel.header = true,
            "2" => sel.compact = true,
            "3" => sel.session = true,
            "4" => sel.burn = true,
            other => {
                return Err(format!(
                    "invalid line '{other}'; use 1,2,3,4, simple, or all"
                ));
            }
        }
    }
    Ok(sel)
}

/// Knobs of the accounting pipeline
#[derive(Debug, Clone, Copy)]
pub struct AccountingConfig {
    pub segment_minutes: u32,
    pub segment_count: usize,
    pub idle_threshold: TimeDelta,
    /// `None` scans every transcript regardless of age
    pub lookback: Option<TimeDelta>,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            segment_minutes: 15,
            segment_count: 20,
            idle_threshold: TimeDelta::minutes(5),
            lookback: Some(TimeDelta::hours(6)),
        }
    }
}

impl From<&Args> for AccountingConfig {
    fn from(args: &Args) -> Self {
        Self {
            idle_threshold: TimeDelta::minutes(i64::from(args.idle_threshold_minutes)),
            lookback: match args.lookback_hours {
                0 => None,
                h => Some(TimeDelta::hours(i64::from(h))),
            },
            ..Self::default()
        }
    }
}

/// Presentation settings, fixed for one invocation
#[derive(Debug, Clone, Copy)]
pub struct DisplayConfig {
    pub lines: LineSelection,
    pub mode: DisplayModeArg,
    pub json: bool,
    /// ANSI colours; off when `NO_COLOR` is set
    pub color: bool,
}

impl From<&Args> for DisplayConfig {
    fn from(args: &Args) -> Self {
        Self {
            lines: args.show.unwrap_or_default(),
            mode: args.display_mode,
            json: args.json,
            color: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}
