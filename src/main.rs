mod app;
mod assistant;
mod community;
mod config;
mod util;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};

use crate::community::{DataSource, GraphSummary};
use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Event table (CSV) or graph JSON; the built-in sample is used when omitted.
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,

    /// TOML file with `[layout]` and `[assistant]` sections.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ask the assistant one question about the graph and print the reply frames.
    #[arg(long, value_name = "QUESTION")]
    ask: Option<String>,

    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn ask(source: &DataSource, config: &AppConfig, question: String) -> Result<()> {
    let graph = source
        .load()
        .with_context(|| format!("failed to load graph from {source}"))?;
    let summary = GraphSummary::from_graph(&graph);
    let mut handle = assistant::spawn_chat(config.assistant.clone(), Some(summary), question);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;
    while let Some(event) = handle.next_blocking() {
        failed |= event.is_terminal() && !matches!(event, assistant::StreamEvent::Done);
        out.write_all(event.encode_frame().as_bytes())
            .context("failed to write reply to stdout")?;
        out.flush().context("failed to flush stdout")?;
    }

    if failed {
        return Err(anyhow!("assistant reply ended with an error"));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let source = DataSource::from_arg(args.data);

    if let Some(question) = args.ask {
        return ask(&source, &config, question);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Community graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::CommunityGraphApp::new(cc, source, config)))),
    )
    .map_err(|error| anyhow!("failed to run the desktop UI: {error}"))
}
