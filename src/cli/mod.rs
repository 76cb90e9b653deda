//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod ask;
pub mod common;
pub mod config;
pub mod history;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use querybridge::config::Config;
use querybridge::utils::logging::init_logging;

#[derive(Parser)]
#[command(name = "querybridge")]
#[command(version)]
#[command(about = "Conversational data assistant backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and print the frame stream
    Ask {
        /// The question
        question: String,
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
        /// Request metadata as key=value (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,
    },
    /// Page through answer history, for one thread or across all of them
    History {
        /// Thread id; without it the whole log is shown by page number
        #[arg(long)]
        thread: Option<String>,
        /// Only records older than this history id (with --thread)
        #[arg(long, requires = "thread")]
        before: Option<i64>,
        /// Page number, starting at 1 (without --thread)
        #[arg(long, default_value_t = 1, conflicts_with = "thread")]
        page: usize,
        /// Page size
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Rate an answer
    Feedback {
        /// History id from the `meta` frame
        history_id: i64,
        /// none, like or dislike
        value: String,
    },
    /// List stored threads
    Threads {
        /// Only threads belonging to this user
        #[arg(long)]
        user: Option<String>,
        /// Continue after this thread id from the previous page
        #[arg(long)]
        before: Option<String>,
        /// Page size
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Delete this thread instead of listing
        #[arg(long, conflicts_with_all = ["user", "before"])]
        delete: Option<String>,
    },
    /// List configured preset questions
    Presets {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page size
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show or validate configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Validate the configuration file
    Check,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Parse arguments, load configuration and run the chosen command.
pub async fn run() -> Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load().with_context(|| "Failed to load configuration")?;
    init_logging(&config.logging).with_context(|| "Failed to initialize logging")?;

    match cli.command {
        Commands::Ask {
            question,
            thread,
            meta,
        } => ask::cmd_ask(config, question, thread, meta.into_iter().collect()).await,
        Commands::History {
            thread,
            before,
            page,
            limit,
        } => match thread {
            Some(thread) => history::cmd_history(&config, &thread, before, limit).await,
            None => history::cmd_history_table(&config, page, limit).await,
        },
        Commands::Feedback { history_id, value } => {
            history::cmd_feedback(&config, history_id, &value).await
        }
        Commands::Threads {
            user,
            before,
            limit,
            delete,
        } => match delete {
            Some(id) => history::cmd_delete_thread(&config, &id).await,
            None => history::cmd_threads(&config, user.as_deref(), before.as_deref(), limit).await,
        },
        Commands::Presets { page, limit } => history::cmd_presets(&config, page, limit),
        Commands::Config { action } => config::cmd_config(&config, action).await,
    }
}
