use std::panic::{self, AssertUnwindSafe};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{debug, error, warn};

use claude_burnline::cli::{AccountingConfig, Args, DisplayConfig, is_usage_error};
use claude_burnline::display::{
    fallback_lines, print_json_output, print_text_output, waiting_line,
};
use claude_burnline::logging;
use claude_burnline::models::HookJson;
use claude_burnline::status::{StatusSnapshot, collect_snapshot};
use claude_burnline::utils::{claude_paths, read_stdin};

fn run(args: &Args, display: &DisplayConfig, stdin: &[u8]) -> Result<()> {
    if stdin.iter().all(u8::is_ascii_whitespace) {
        println!("{}", waiting_line(display.color));
        return Ok(());
    }
    let hook: HookJson = serde_json::from_slice(stdin).context("parse hook json")?;

    let paths = claude_paths(args.claude_config_dir.as_deref());
    debug!(roots = ?paths, session = ?hook.session_id, "collecting status");
    let config = AccountingConfig::from(args);
    let reference = Utc::now();

    let snapshot = panic::catch_unwind(AssertUnwindSafe(|| {
        collect_snapshot(&hook, &paths, reference, &config)
    }))
    .unwrap_or_else(|_| {
        warn!("usage pipeline panicked; rendering zeroed status");
        StatusSnapshot::degraded(Some(&hook), reference, &config)
    });

    if display.json {
        print_json_output(&snapshot)?;
    } else {
        print_text_output(&snapshot, display);
    }
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            let _ = e.print();
            if is_usage_error(&e) {
                // The host still needs a status line
                let color = std::env::var_os("NO_COLOR").is_none();
                for line in fallback_lines(color) {
                    println!("{line}");
                }
            }
            return;
        }
    };
    logging::init(args.debug);
    panic::set_hook(Box::new(|info| error!(%info, "panic")));

    let display = DisplayConfig::from(&args);
    let stdin = read_stdin().unwrap_or_else(|err| {
        warn!("reading stdin failed: {err:#}");
        Vec::new()
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&args, &display, &stdin)));
    let failure = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(format!("{err:#}")),
        Err(_) => Some("panic while rendering".to_string()),
    };
    if let Some(reason) = failure {
        error!(
            error = %reason,
            input = %String::from_utf8_lossy(&stdin),
            "status line failed"
        );
        for line in fallback_lines(display.color) {
            println!("{line}");
        }
    }
}
