use std::io::{self, Stderr};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind, MouseEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use wayfarer_core::{ChatError, ChatTicket, HealthOutcome};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Everything the main loop reacts to: terminal input, the animation tick,
/// and completions of backend calls running on their own tasks.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
    ProbeFinished(HealthOutcome),
    ChatFinished(ChatTicket, Result<String, ChatError>),
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: std::time::Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // Spawn event reader task
        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let app_event = match evt {
                    // Only handle key press events, not release
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                    Ok(Event::Mouse(mouse)) => Some(AppEvent::Mouse(mouse)),
                    Ok(Event::Resize(_, _)) => Some(AppEvent::Resize),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::error!(error = %e, "terminal event stream failed");
                        break;
                    }
                };

                if let Some(event) = app_event {
                    if tx_events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        // Spawn tick timer for the thinking spinner
        let tx_tick = tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_rate);
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for background tasks that report back to the main loop.
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

/// Take over the terminal: raw mode, alternate screen, and mouse capture so
/// the wheel scrolls the transcript.
pub fn init() -> Result<Tui> {
    enable_raw_mode().context("enabling raw mode")?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)
        .context("entering alternate screen")?;
    Terminal::new(CrosstermBackend::new(io::stderr())).context("creating terminal")
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)
        .context("leaving alternate screen")?;
    disable_raw_mode().context("disabling raw mode")
}

/// Give the terminal back before the panic message is printed, and record
/// the panic in the log file since stderr belonged to the UI.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Err(e) = restore() {
            eprintln!("failed to restore terminal: {e:#}");
        }
        tracing::error!(panic = %info, "wayfarer panicked");
        default_hook(info);
    }));
}
