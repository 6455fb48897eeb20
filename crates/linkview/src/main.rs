use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use linkview::{Command, Dashboard, DashboardConfig, SyntheticSource, init_logging};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "linkview")]
#[command(about = "Headless driver for a linked-view exploration dashboard")]
struct Args {
    /// Path to a YAML configuration file (default: built-in ticker pairs)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the data directory (default: ~/.linkview/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// How long `wait` blocks for a pending build, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    wait_ms: u64,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    print_config: bool,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".linkview")
}

fn print_json(out: &mut impl Write, value: &impl Serialize) -> color_eyre::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config = DashboardConfig::load_or_default(args.config.as_deref())?;
    if args.print_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);
    init_logging(&data_dir, &args.log_level)?;

    let source = SyntheticSource::new(config.source.seed)
        .with_latency(config.latency())
        .with_unavailable(config.source.unavailable.iter().cloned());
    let mut dashboard = Dashboard::from_config(&config, Arc::new(source))?;
    let wait = Duration::from_millis(args.wait_ms);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                print_json(&mut out, &serde_json::json!({ "error": e.to_string() }))?;
                continue;
            }
        };

        if let Some(event) = command.event() {
            if let Err(e) = dashboard.handle(event) {
                print_json(
                    &mut out,
                    &serde_json::json!({ "error": e.to_string(), "kind": e.kind() }),
                )?;
            }
            continue;
        }

        match command {
            Command::Quit => break,
            Command::Wait => {
                let idle = dashboard.wait_idle(wait);
                print_json(&mut out, &serde_json::json!({ "idle": idle }))?;
            }
            Command::Show => {
                dashboard.poll();
                print_json(&mut out, &dashboard.snapshot())?;
            }
            Command::Payload => {
                dashboard.poll();
                print_json(&mut out, &dashboard.payloads())?;
            }
            Command::Stats => {
                let stats = dashboard.cache_stats();
                print_json(
                    &mut out,
                    &serde_json::json!({
                        "entries": dashboard.cache().len(),
                        "capacity": dashboard.cache().capacity(),
                        "hits": stats.hits,
                        "misses": stats.misses,
                        "evictions": stats.evictions,
                        "deduplicated": stats.deduplicated,
                        "corruptions": stats.corruptions,
                    }),
                )?;
            }
            Command::Options(dimension) => match dashboard.options(&dimension) {
                Ok(domain) => print_json(&mut out, &domain)?,
                Err(e) => print_json(&mut out, &serde_json::json!({ "error": e.to_string() }))?,
            },
            Command::Set { .. } | Command::Select(_) | Command::Clear => {}
        }
    }

    tracing::info!("Dashboard shutting down");
    Ok(())
}
