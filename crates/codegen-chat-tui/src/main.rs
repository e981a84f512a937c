use std::time::Duration;

use anyhow::Result;
use codegen_chat_core::{generator_for, Config, Controller};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use app::App;
use tui::{EventHandler, Tui};

/// Drives the "Generating..." animation and request polling
const TICK_RATE: Duration = Duration::from_millis(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Logging is best effort; the chat works without it
    let log_path = logging::init();
    if let Ok(path) = &log_path {
        tracing::info!(path = %path.display(), version = env!("CARGO_PKG_VERSION"), "starting");
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });

    let (endpoint, endpoint_error) = match config.resolve_endpoint() {
        Ok(endpoint) => (endpoint, None),
        Err(e) => {
            tracing::warn!(error = %e, "configured endpoint is invalid");
            (None, Some(e.to_string()))
        }
    };

    let generator = generator_for(endpoint.as_deref(), config.timeout())?;
    let mut app = App::new(Controller::new(generator), config.timeout());

    // Ask for an endpoint up front when none is usable
    if endpoint.is_none() {
        app.open_endpoint_input();
        app.endpoint_error = endpoint_error;
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event).await?;
        app.poll_request().await;
    }
    Ok(())
}
