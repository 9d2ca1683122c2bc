//! Chat gateway and maintenance CLI for parley-rs.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable. Logs go
//! to stderr; set `RUST_LOG` to change the level (default `info`).
//!
//! # Examples
//!
//! ```sh
//! # Gateway: chat events in on stdin, replies out on stdout (JSON lines)
//! parley --config parley.toml run < events.jsonl
//!
//! # One-off question about the last three days of chat 42
//! parley --data-dir ./data ask --chat 42 --days 3 "what did we decide?"
//!
//! # Spend report
//! parley --data-dir ./data spent --chat 42 --verbose
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use parley_bot::commands::DATE_FORMAT;
use parley_bot::config::api_key_from_env;
use parley_bot::{API_KEY_ENV, ChatEvent, Dispatcher, Overrides, load_config};
use parley_rs::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Chat gateway and maintenance CLI for parley-rs.
#[derive(Parser)]
#[command(name = "parley", version)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding chat and spend logs (overrides the config file).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Model to use for completions (overrides the config file).
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read chat events from stdin and write replies to stdout, one JSON
    /// object per line.
    Run,
    /// Append a message to a chat's log.
    Log {
        #[arg(long)]
        chat: i64,
        #[arg(long, default_value_t = 0)]
        user_id: i64,
        #[arg(long, default_value = "cli")]
        username: String,
        text: String,
    },
    /// Ask a question about a chat.
    Ask {
        #[arg(long)]
        chat: i64,
        #[arg(long, default_value_t = 0)]
        user_id: i64,
        #[arg(long, default_value = "cli")]
        username: String,
        /// Use the last N days as context.
        #[arg(long, conflicts_with_all = ["today", "since"])]
        days: Option<i64>,
        /// Use the last 24 hours as context.
        #[arg(long, conflicts_with = "since")]
        today: bool,
        /// Use everything since this date (DD-MM-YYYY) as context.
        #[arg(long)]
        since: Option<String>,
        question: String,
    },
    /// Show a chat's total spend.
    Spent {
        #[arg(long)]
        chat: i64,
        /// List every entry before the total.
        #[arg(long)]
        verbose: bool,
    },
    /// Print recent messages of a chat.
    History {
        #[arg(long)]
        chat: i64,
        /// How many days back to look.
        #[arg(long, default_value_t = 1)]
        days: i64,
        /// Maximum messages to print.
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

impl Commands {
    fn needs_api_key(&self) -> bool {
        matches!(self, Commands::Run | Commands::Ask { .. })
    }
}

/// Stand-in provider for commands that never ask the model.
struct NoApiKey;

impl CompletionProvider for NoApiKey {
    fn complete<'a>(&'a self, _request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async { Err(format!("{API_KEY_ENV} is not set")) })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        data_dir: cli.data_dir,
        model: cli.model,
    };
    let config = match load_config(cli.config.as_deref(), overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn CompletionProvider> = match api_key_from_env() {
        Some(key) => match OpenAiClient::with_url(key, &config.api_url) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("Error: failed to create API client: {e}");
                std::process::exit(1);
            }
        },
        None if cli.command.needs_api_key() => {
            eprintln!("Error: {API_KEY_ENV} environment variable is not set");
            std::process::exit(1);
        }
        None => Arc::new(NoApiKey),
    };

    let ctx = match AppContext::open(&config, provider) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = execute(&ctx, cli.command).await;
    if let Err(e) = ctx.shutdown() {
        warn!("Shutdown failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn execute(ctx: &AppContext, command: Commands) -> Result<(), String> {
    match command {
        Commands::Run => run_gateway(ctx).await,
        Commands::Log {
            chat,
            user_id,
            username,
            text,
        } => {
            let message = Message::new(chat, Utc::now(), user_id, username, text);
            ctx.log_message(&message).map_err(|e| e.to_string())
        }
        Commands::Ask {
            chat,
            user_id,
            username,
            days,
            today,
            since,
            question,
        } => {
            let text = match (days, today, since) {
                (Some(days), _, _) => format!("/ask_days_context {days} {question}"),
                (None, true, _) => format!("/ask_today {question}"),
                (None, false, Some(date)) => {
                    NaiveDate::parse_from_str(&date, DATE_FORMAT)
                        .map_err(|_| format!("--since must be DD-MM-YYYY, got '{date}'"))?;
                    format!("/ask_datetime_context {date} {question}")
                }
                (None, false, None) => format!("/ask_no_context {question}"),
            };
            let event = ChatEvent::new(chat, Utc::now(), user_id, username, text);
            let reply = Dispatcher::new(ctx)
                .handle(&event)
                .await
                .map_err(|e| e.to_string())?;
            if let Some(reply) = reply {
                println!("{}", reply.text);
            }
            Ok(())
        }
        Commands::Spent { chat, verbose } => {
            if verbose {
                for entry in ctx.spend_entries(chat).map_err(|e| e.to_string())? {
                    println!("{}  ${}", entry.timestamp.to_rfc3339(), entry.amount.to_fixed(6));
                }
            }
            let total = ctx.total_spend(chat).map_err(|e| e.to_string())?;
            println!("Total spend for this chat: ${}", total.to_fixed(6));
            Ok(())
        }
        Commands::History { chat, days, limit } => {
            let now = Utc::now();
            let span =
                Duration::try_days(days).ok_or_else(|| format!("--days {days} is too large"))?;
            let start = now.checked_sub_signed(span).unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
            let offset = ctx.config().utc_offset();
            for msg in ctx
                .history(chat, start, now, limit)
                .map_err(|e| e.to_string())?
            {
                println!(
                    "{} {}: {}",
                    msg.timestamp.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S"),
                    msg.username,
                    msg.text
                );
            }
            Ok(())
        }
    }
}

/// Process stdin events one at a time until EOF or Ctrl-C.
async fn run_gateway(ctx: &AppContext) -> Result<(), String> {
    let dispatcher = Dispatcher::new(ctx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut handled: u64 = 0;

    info!("Gateway started: model={}", ctx.config().model);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|e| format!("failed to read stdin: {e}"))?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; stopping gateway");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: ChatEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping malformed event: {e}");
                continue;
            }
        };

        match dispatcher.handle(&event).await {
            Ok(Some(reply)) => {
                let mut out = serde_json::to_string(&reply)
                    .map_err(|e| format!("failed to encode reply: {e}"))?;
                out.push('\n');
                stdout
                    .write_all(out.as_bytes())
                    .await
                    .map_err(|e| format!("failed to write reply: {e}"))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| format!("failed to write reply: {e}"))?;
            }
            Ok(None) => {}
            Err(e) => error!("Failed to handle event in chat {}: {e}", event.chat_id),
        }
        handled += 1;
    }

    info!("Gateway stopped after {handled} event(s)");
    Ok(())
}
