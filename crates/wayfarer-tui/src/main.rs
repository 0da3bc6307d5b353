use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wayfarer_core::{ChatBackend, HttpGateway};

mod app;
mod config;
mod handler;
mod tui;
mod ui;

use app::App;
use config::Config;
use tui::{AppEvent, EventHandler, Tui};

const TICK_RATE: Duration = Duration::from_millis(150);

#[derive(Parser)]
#[command(name = "wayfarer")]
#[command(version, about = "Chat with the AI Travel Planner backend from your terminal")]
struct Cli {
    /// Backend origin, e.g. http://localhost:8000
    #[arg(long, env = "WAYFARER_BACKEND_URL")]
    backend_url: Option<String>,

    /// Where to write logs (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file should not keep the client from starting
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let log_path = cli.log_file.clone().unwrap_or_else(Config::default_log_path);
    init_logging(&log_path, config.log_filter())?;
    if let Some(e) = config_error {
        warn!(error = %e, "ignoring config file");
    }

    let base_url = config.backend_url(cli.backend_url);
    info!(%base_url, log = %log_path.display(), "starting wayfarer");
    let gateway: Arc<dyn ChatBackend> = Arc::new(HttpGateway::new(&base_url));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, gateway, base_url).await;
    tui::restore()?;

    result
}

fn init_logging(path: &Path, default_filter: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run(terminal: &mut Tui, backend: Arc<dyn ChatBackend>, base_url: String) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let mut app = App::new(backend, base_url, events.sender());
    let mut session_events = app.session.subscribe();

    app.start_probe();

    let mut dirty = true;
    while !app.should_quit {
        if dirty {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            dirty = false;
        }

        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                // Ticks only matter while the spinner is showing
                let redraw = !matches!(event, AppEvent::Tick) || app.session.state().is_in_flight();
                handler::handle_event(&mut app, event)?;
                dirty |= redraw;
            }
            update = session_events.recv() => {
                match update {
                    Ok(event) => debug!(?event, "session changed"),
                    Err(RecvError::Lagged(skipped)) => debug!(skipped, "session events lagged"),
                    Err(RecvError::Closed) => break,
                }
                dirty = true;
            }
        }
    }

    info!("exiting");
    Ok(())
}
