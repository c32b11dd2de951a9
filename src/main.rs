//! Pick-by-light operator console.
//!
//! Runs the station on simulated ports and takes one command per line
//! on stdin.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                   │
//! │                                                             │
//! │  stdin console   LogEventSink   JsonContentFile   TagMirror │
//! │  (commands)      (EventSink)    (ContentStore)    (tags)    │
//! │                                                             │
//! │  ──────────────── Port Trait Boundary ───────────────────   │
//! │                                                             │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │        PortSelectionController (pure logic)           │  │
//! │  │  selection state · guard sets · signal / warning      │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! │                                                             │
//! │  SimulatedPort × N (light level in memory, debounce)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use pickbylight::adapters::content_file::JsonContentFile;
use pickbylight::adapters::hardware::simulated_ports;
use pickbylight::adapters::log_sink::LogEventSink;
use pickbylight::adapters::tags::TagMirror;
use pickbylight::app::commands::StationCommand;
use pickbylight::config::StationConfig;
use pickbylight::PortSelectionController;

/// Pick-by-light station console (simulated ports)
#[derive(Parser, Debug)]
#[command(name = "pickbylight", version, long_about = None)]
struct Args {
    /// Station configuration file (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content map to load at startup, overriding the configured path
    #[arg(short = 'C', long)]
    content_map: Option<PathBuf>,

    /// Enable debug logging for the station
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

const HELP: &str = "\
commands:
  select <port> [amount] [instructions]
  select-content <name> [amount] [instructions]
  deselect <port>        finish <port>        deselect-all
  touch <port>           content <port>       status
  set-field <port> <key> <value>
  load [path]            save [path]          tags
  help                   quit";

/// Station log level: `warn` unless `-v` was given. `RUST_LOG` still wins.
fn crate_log_level(verbose: bool) -> log::LevelFilter {
    if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("pickbylight", crate_log_level(args.verbose))
        .parse_default_env()
        .init();

    // ── 1. Configuration ──────────────────────────────────────
    let config = match &args.config {
        Some(path) => StationConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => StationConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    let content_path = args
        .content_map
        .clone()
        .unwrap_or_else(|| config.content_map_path.clone());

    // ── 2. Controller over simulated ports ────────────────────
    let controller = Arc::new(
        PortSelectionController::new(
            simulated_ports(&config),
            config.timing.clone(),
            Arc::new(LogEventSink::new()),
        )
        .context("starting controller")?,
    );

    let store = JsonContentFile::new();
    controller.load_content_map(&store, &content_path);

    // ── 3. Tag mirror ─────────────────────────────────────────
    let mirror = Arc::new(TagMirror::new(Arc::clone(&controller)));
    let poller = mirror.spawn_poller(config.tag_poll())?;

    info!("pickbylight v{} ready, ports {:?}", env!("CARGO_PKG_VERSION"), config.ports);
    println!("{HELP}");

    // ── 4. Console loop ───────────────────────────────────────
    let stdin = io::stdin();
    let mut out = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (verb, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match verb {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "tags" => println!("{}", serde_json::to_string_pretty(&mirror.snapshot())?),
            "load" => {
                let path = if arg.is_empty() { content_path.clone() } else { PathBuf::from(arg) };
                let map = controller.load_content_map(&store, &path);
                println!("{} ports with content", map.len());
            }
            "save" => {
                let path = if arg.is_empty() { content_path.clone() } else { PathBuf::from(arg) };
                match controller.save_content_map(&store, &path) {
                    Ok(written) => println!("saved {}", written.display()),
                    Err(e) => println!("error: {e}"),
                }
            }
            _ => match line.parse::<StationCommand>() {
                Ok(cmd) => println!("{}", controller.handle_command(cmd)),
                Err(e) => println!("error: {e}"),
            },
        }
        out.flush()?;
    }

    // ── 5. Shutdown ───────────────────────────────────────────
    drop(poller);
    if !controller.deselect_all() {
        warn!("not every port could be deselected");
    }
    controller.shutdown();
    Ok(())
}
