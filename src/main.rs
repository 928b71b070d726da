use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod app;
mod backend;
mod clipboard;
mod config;
mod error;
mod handler;
mod logging;
mod model;
mod render;
mod tui;
mod ui;

use app::App;
use backend::HttpBackend;
use clipboard::Clipboard;
use config::{Config, Overrides, SERVER_ENV_VAR};
use render::{Language, RenderMode};
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "ask-ai")]
#[command(about = "Ask ChatGPT, Gemini and Claude the same question and compare the answers")]
#[command(version)]
struct Cli {
    /// Base URL of the server exposing /ask and /compare
    #[arg(short, long)]
    server: Option<String>,

    /// How comparison analyses are rendered
    #[arg(short, long, value_enum)]
    render: Option<RenderMode>,

    /// Language of the comparison labels
    #[arg(short, long, value_enum)]
    lang: Option<Language>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = logging::log_dir()?;
    let _log_guard = logging::init(cli.verbose, &log_dir)?;

    let config = Config::load().context("loading config")?;
    let settings = config.resolve(
        Overrides {
            server_url: cli.server,
            render_mode: cli.render,
            language: cli.lang,
        },
        std::env::var(SERVER_ENV_VAR).ok(),
    );
    info!(server = %settings.server_url, render = settings.render_mode.as_str(), "starting");

    let backend = Arc::new(HttpBackend::new(&settings.server_url));
    let mut app = App::new(backend, Clipboard::system(), settings);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(e) = &result {
        error!(error = %e, "exited with error");
    }
    info!("bye");
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }

        app.poll_pending().await;
    }

    Ok(())
}
