//! # Synergy - Headless Highlighting Driver
//!
//! Runs the keyword and bracket-block highlighters over a file without a
//! GUI and prints what they produced.
//!
//! ## Quick Start
//!
//! ```bash
//! # Register a language definition
//! cargo run -- upload languages/c.toml
//!
//! # List registered languages
//! cargo run -- languages
//!
//! # Highlight a file (language picked by extension)
//! cargo run -- highlight src/main.c
//!
//! # Force a language and get JSON
//! cargo run -- highlight notes.txt --language C --json
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synergy_buffer::{Dispatcher, StyleProperty};
use synergy_core::{Config, EditorEvent, EditorSession, EventHandler};
use synergy_syntax::{Highlighter, LanguageRegistry};

/// How long to wait for the workers to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Synergy - incremental keyword and bracket-block highlighting
#[derive(Parser, Debug)]
#[command(name = "synergy")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Language registry directory
    #[arg(short, long, value_name = "DIR", global = true)]
    registry: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlight a file and print styled spans and connector lines
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Language name to use instead of detecting it
        #[arg(short, long)]
        language: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered languages
    Languages,

    /// Register a language definition file
    Upload {
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,
    },
}

/// What the highlighters left on the document.
#[derive(Debug, Serialize)]
struct Report {
    language: Option<String>,
    spans: Vec<SpanReport>,
    connectors: Vec<ConnectorReport>,
}

#[derive(Debug, Serialize)]
struct SpanReport {
    start: usize,
    end: usize,
    text: String,
    style: StyleProperty,
}

#[derive(Debug, Serialize)]
struct ConnectorReport {
    left: f64,
    top: f64,
    height: f64,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Synergy v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    match args.command {
        Command::Highlight {
            file,
            language,
            json,
        } => {
            let report = highlight(&config, &file, language)?;
            print_report(&report, json)?;
        }
        Command::Languages => {
            let registry = LanguageRegistry::open(&config.registry)?;
            for name in registry.language_names() {
                println!("{name}");
            }
        }
        Command::Upload { definition } => {
            let mut registry = LanguageRegistry::open(&config.registry)?;
            let name = registry
                .upload(&definition)
                .with_context(|| format!("Cannot upload {}", definition.display()))?;
            println!("Registered language {name}");
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?,
        None => Config::load(),
    };
    if let Some(root) = &args.registry {
        config.registry.root = Some(root.clone());
    }
    Ok(config)
}

/// Opens `file` in a session, lets the highlighters run to completion and
/// collects the result.
fn highlight(config: &Config, file: &Path, language: Option<String>) -> anyhow::Result<Report> {
    let registry = LanguageRegistry::open(&config.registry)?;
    if let Some(name) = &language {
        if registry.language_by_name(name)?.is_none() {
            anyhow::bail!("Unknown language '{name}'");
        }
    }
    let mut session = EditorSession::new(config.clone());
    let mut highlighter = Highlighter::new(session.document().clone(), registry, config)?
        .with_event_bus(session.event_bus().clone());
    highlighter.start()?;

    let events = EventHandler::new(session.subscribe());
    session
        .open_file(file)
        .with_context(|| format!("Cannot open {}", file.display()))?;
    if let Some(name) = language {
        session.select_language(name);
    }
    session.emit(EditorEvent::Quit);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(highlighter.listen(events));

    if !highlighter.wait_idle(SETTLE_TIMEOUT) {
        tracing::warn!("Highlighters did not settle within {:?}", SETTLE_TIMEOUT);
    }
    let report = collect_report(&session, highlighter.current_language_name());
    highlighter.shutdown();
    Ok(report)
}

fn collect_report(session: &EditorSession, language: Option<String>) -> Report {
    session.document().invoke(|doc| {
        let text: Vec<char> = doc.text().chars().collect();
        let spans = doc
            .styled_ranges()
            .into_iter()
            .map(|(range, style)| SpanReport {
                start: range.start,
                end: range.end,
                text: text[range.clone()].iter().collect(),
                style,
            })
            .collect();
        let connectors = doc
            .connectors()
            .iter()
            .map(|line| ConnectorReport {
                left: line.left,
                top: line.top,
                height: line.height,
            })
            .collect();
        Report {
            language,
            spans,
            connectors,
        }
    })
}

fn print_report(report: &Report, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "language: {}",
        report.language.as_deref().unwrap_or("plain text")
    );
    for span in &report.spans {
        println!("{:>6}..{:<6} {:<16} {:?}", span.start, span.end, span.text, span.style);
    }
    for line in &report.connectors {
        println!(
            "connector x={} y={} height={}",
            line.left, line.top, line.height
        );
    }
    Ok(())
}
