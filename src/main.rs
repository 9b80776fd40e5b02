mod app;
mod auth;
mod blob_store;
mod config;
mod delete_flow;
mod diary_entry;
mod diary_state;
mod entry_store;
mod error;
mod image_placement;
mod layout;
mod logging;
mod pagination;
mod password_gate;
mod services;
mod tag_suggestions;
mod text_input;
mod toast;
mod ui;

use app::App;
use color_eyre::eyre::{eyre, Result};
use config::Config;
use crossterm::event::EventStream;
use futures::StreamExt;
use log::{error, info};
use services::Services;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use ui::Tui;

const TICK: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load();
    logging::init(&config.log_path()).map_err(|e| eyre!("Failed to start logging: {}", e))?;
    info!("Starting Memorable Moments, data in {}", config.data_dir.display());

    let services = Services::from_config(&config);
    let mut session = services.auth.session();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(services, &config, tx);

    let mut tui = Tui::new()?;
    app.on_resize(tui.area()?);
    app.on_session(session.borrow_and_update().clone());

    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    while !app.should_quit {
        tui.draw(&app, Instant::now())?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => app.handle_terminal_event(event, Instant::now()),
                Some(Err(e)) => {
                    error!("Terminal input failed: {}", e);
                    break;
                }
                None => break,
            },
            Some(event) = rx.recv() => app.handle_app_event(event, Instant::now()),
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let user = session.borrow_and_update().clone();
                app.on_session(user);
            }
            _ = ticker.tick() => app.tick(Instant::now()),
        }
    }

    app.shutdown();
    info!("Closing diary");
    Ok(())
}
