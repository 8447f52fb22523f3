//! notify-sync CLI - terminal client for the notification sync engine.
//!
//! This is the main binary entry point. See the `notify_sync` library for
//! the core functionality.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use notify_sync::constants::SESSION_COOKIE;
use notify_sync::env::Environment;
use notify_sync::transport::PushConnection;
use notify_sync::{
    ws, Config, Engine, HttpApi, ItemId, NotificationApi, SyncEvent, SyncRuntime, TerminalView,
    UserCommand,
};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "notify-sync")]
#[command(version)]
#[command(about = "Live unread-notification and interaction-count client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow notifications live. Enter toggles the popover, `r` re-checks,
    /// `t <id>` tracks an item's counters, `q` quits.
    Watch {
        /// Viewer username (overrides config)
        #[arg(long)]
        viewer: Option<String>,
        /// Item ids whose interaction counters are displayed
        #[arg(long = "track")]
        track: Vec<String>,
    },
    /// Check once for unread notifications
    Check,
    /// Mark every notification as read, then re-check
    MarkRead,
    /// Update the saved configuration, then print it (secrets masked)
    Config {
        /// Server URL
        #[arg(long)]
        server_url: Option<String>,
        /// Viewer username
        #[arg(long)]
        viewer: Option<String>,
        /// Session cookie value
        #[arg(long)]
        session: Option<String>,
        /// CSRF token
        #[arg(long)]
        csrf_token: Option<String>,
    },
}

/// Log to a file so stdout stays a clean rendering surface.
fn init_logging() {
    let log_path = std::env::var("NOTIFY_SYNC_LOG_FILE")
        .map(std::path::PathBuf::from)
        .or_else(|_| Config::config_dir().map(|d| d.join("notify-sync.log")));

    let default_filter = if Environment::current().is_development() {
        "debug"
    } else {
        "info"
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    builder.format_timestamp_secs();

    match log_path.and_then(|p| {
        std::fs::File::create(&p).with_context(|| format!("cannot create {}", p.display()))
    }) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Logging to stderr: {e:#}"),
    }
    builder.init();
}

fn push_headers(config: &Config) -> Vec<(String, String)> {
    let mut headers = vec![("Origin".to_string(), config.base_url().to_string())];
    if config.has_session() {
        headers.push((
            "Cookie".to_string(),
            format!("{SESSION_COOKIE}={}", config.session_id),
        ));
    }
    headers
}

/// Parse one line of user input.
fn parse_input(line: &str) -> Option<SyncEvent> {
    let line = line.trim();
    match line {
        "" => Some(SyncEvent::Command(UserCommand::TogglePopover)),
        "r" => Some(SyncEvent::Command(UserCommand::Recheck)),
        "q" => Some(SyncEvent::Shutdown),
        _ => line
            .strip_prefix("t ")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| SyncEvent::Command(UserCommand::Track(ItemId::from(id)))),
    }
}

async fn watch(config: Config, viewer: Option<String>, track: Vec<String>) -> Result<()> {
    let viewer = viewer.unwrap_or_else(|| config.viewer.clone());
    if viewer.is_empty() {
        log::warn!("No viewer configured; own actions will raise alerts");
    }

    let api: Arc<dyn NotificationApi> = Arc::new(HttpApi::new(&config)?);
    let mut runtime = SyncRuntime::new(
        Engine::new(viewer),
        api,
        TerminalView::new(std::io::stdout()),
    );
    for id in track {
        runtime
            .sender()
            .send(SyncEvent::Command(UserCommand::Track(ItemId::from(id))))
            .context("sync loop closed")?;
    }

    let push_url = ws::push_url(&config.server_url, &config.endpoints.push);
    let (push, frames) = PushConnection::connect(push_url, push_headers(&config));
    runtime.forward_frames(frames);

    // Plain thread: a blocked stdin read must not hold up runtime shutdown
    let tx = runtime.sender();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines().map_while(std::io::Result::ok) {
            match parse_input(&line) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                None => println!("? Enter = popover, r = re-check, t <id> = track, q = quit"),
            }
        }
    });

    let tx = runtime.sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(SyncEvent::Shutdown);
        }
    });

    log::info!("notify-sync v{} watching {}", env!("CARGO_PKG_VERSION"), config.server_url);
    runtime.start();
    runtime.run().await;
    push.shutdown();
    Ok(())
}

async fn check_once(config: &Config) -> Result<()> {
    let api: Arc<dyn NotificationApi> = Arc::new(HttpApi::new(config)?);
    let mut runtime = SyncRuntime::new(
        Engine::new(config.viewer.clone()),
        api,
        TerminalView::new(std::io::stdout()),
    );
    runtime.start();
    runtime.settle().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --help and --version leave no log file behind
    let cli = Cli::parse();
    init_logging();

    let config = Config::load()?;

    if !config.has_session() && !matches!(cli.command, Commands::Config { .. }) {
        eprintln!(
            "No session configured. Set NOTIFY_SYNC_SESSION or session_id in {}",
            Config::config_dir()?.join("config.json").display()
        );
    }

    match cli.command {
        Commands::Watch { viewer, track } => watch(config, viewer, track).await?,
        Commands::Check => check_once(&config).await?,
        Commands::MarkRead => {
            HttpApi::new(&config)?
                .mark_all_read()
                .await
                .context("mark all as read failed")?;
            check_once(&config).await?;
        }
        Commands::Config {
            server_url,
            viewer,
            session,
            csrf_token,
        } => {
            let mut config = config;
            let changed = server_url.is_some()
                || viewer.is_some()
                || session.is_some()
                || csrf_token.is_some();
            if let Some(url) = server_url {
                config.server_url = url;
            }
            if let Some(viewer) = viewer {
                config.viewer = viewer;
            }
            if let Some(session) = session {
                config.session_id = session;
            }
            if let Some(token) = csrf_token {
                config.csrf_token = token;
            }
            if changed {
                config.save().context("failed to save config")?;
                log::info!("Configuration saved");
            }
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
