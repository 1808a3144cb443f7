//! Draftchat - chat-driven legal document drafting.
//!
//! Talks to a draft engine over HTTP and runs the drafting session on the
//! terminal.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use draftchat::{Config, Console, DraftEngine, DraftSession, HttpEngine, APP_NAME};

/// Draft legal documents by chatting with a draft engine
#[derive(Parser)]
#[command(name = "draftchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a drafting session (default)
    Chat {
        /// Open this template directly instead of matching a request
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Check that the draft engine is reachable
    Health,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine
    let _ = dotenvy::dotenv();

    // Setup logging; the transcript owns stdout
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        None => cmd_chat(None)?,
        Some(Commands::Chat { template }) => cmd_chat(template.as_deref())?,
        Some(Commands::Health) => cmd_health()?,
        Some(Commands::Config { path }) => cmd_config(path)?,
        Some(Commands::Completions { shell }) => cmd_completions(shell),
    }

    Ok(())
}

/// Run an interactive drafting session on stdin/stdout.
fn cmd_chat(template: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let engine = HttpEngine::from_config(&config.engine).context("Failed to create engine client")?;
    tracing::debug!(base_url = engine.base_url(), "Using draft engine");

    let session = DraftSession::new(Arc::new(engine), config.session.clone());
    let interactive = io::stdin().is_terminal();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut console = Console::new(session, io::stdin().lock(), io::stdout(), &config.export.output_dir)
            .with_prompt(interactive);
        console.run(template).await
    })
}

/// Call the engine health endpoint.
fn cmd_health() -> Result<()> {
    let config = Config::load()?;
    let engine = HttpEngine::from_config(&config.engine)?;

    let rt = tokio::runtime::Runtime::new()?;
    let status = rt
        .block_on(engine.health())
        .with_context(|| format!("Draft engine at {} is not reachable", engine.base_url()))?;

    println!("{} engine at {}", engine.name(), engine.base_url());
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}
