//! AlgoGenie CLI - Main entry point

mod app;
mod cli;
mod page;
mod render;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use genie_foundation::config::SandboxBackend;
use genie_foundation::GenieConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// AlgoGenie - a solver agent and a code executor working through DSA problems
#[derive(Parser, Debug)]
#[command(name = "genie")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Load settings from this file instead of the global/project config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Run code on the host instead of in Docker (no isolation)
    #[arg(long, global = true)]
    local: bool,

    /// Model to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Chat completions endpoint
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key for the provider (overrides env and config)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Host directory mounted into the sandbox
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Per-block execution timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum number of participant messages per run
    #[arg(long, global = true)]
    max_turns: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web UI
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Solve a single problem and print the conversation
    Run {
        /// Problem statement
        task: String,
    },
}

impl Args {
    /// Apply command-line overrides on top of a loaded config
    fn apply(&self, config: &mut GenieConfig) {
        if self.local {
            config.sandbox.backend = SandboxBackend::Local;
        }
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.provider.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.provider.api_key = Some(api_key.clone());
        }
        if let Some(work_dir) = &self.work_dir {
            config.sandbox.work_dir = work_dir.clone();
        }
        if let Some(timeout) = self.timeout {
            config.sandbox.timeout_secs = timeout;
        }
        if let Some(max_turns) = self.max_turns {
            config.team.max_turns = max_turns;
        }
        if let Command::Serve { bind: Some(bind) } = &self.command {
            config.server.bind = bind.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => GenieConfig::load_file(path)?,
        None => GenieConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}", e);
            let mut config = GenieConfig::default();
            config.apply_env();
            config
        }),
    };
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    if config.sandbox.backend == SandboxBackend::Local {
        tracing::warn!("Local backend selected: generated code runs on this machine unsandboxed");
    }

    let app = app::App::build(config).context("failed to initialize AlgoGenie")?;

    match args.command {
        Command::Serve { .. } => server::serve(app).await,
        Command::Run { task } => cli::run_once(&app, &task).await,
    }
}
