use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use loglens_logs::{LogView, Template};
use loglens_stream::{BatchDispatcher, LogStreamManager, StreamConfig};
use loglens_tui::{Action, AppState, Event, EventHandler, KeyBindings, LogViewerScreen, Tui};
use loglens_types::Settings;

/// Loglens - a terminal UI for tailing a self-hosted service's live log stream
#[derive(Parser, Debug)]
#[command(name = "loglens")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the service (e.g. https://host:8000)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Bearer token for the stream request
    #[arg(long)]
    token: Option<String>,

    /// Path to a settings file (toml)
    #[arg(long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Display buffer bound
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Historical records to request on connect
    #[arg(long)]
    limit: Option<usize>,

    /// Minimum severity to display (trace/debug/info/warn/error/fatal)
    #[arg(long)]
    min_level: Option<String>,
}

/// File settings first, CLI flags override individual values
fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading settings file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing settings file {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(url) = &args.url {
        settings.base_url = url.clone();
    }
    if let Some(token) = &args.token {
        settings.token = Some(token.clone());
    }
    if let Some(size) = args.buffer_size {
        settings.buffer_size = size;
    }
    if let Some(limit) = args.limit {
        settings.stream_limit = limit;
    }
    if let Some(level) = &args.min_level {
        settings.min_level = level.clone();
    }

    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing goes to stderr so it never fights the TUI for stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = load_settings(&args)?;

    let result = run_app(settings).await;
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }
    result
}

async fn run_app(settings: Settings) -> Result<()> {
    // Pipeline: stream manager -> dispatcher FIFO -> view -> display buffer
    let view = LogView::new(Template::parse(&settings.template), settings.buffer_size);
    let buffer = view.buffer();
    let dispatcher = BatchDispatcher::new(view);

    let manager = LogStreamManager::connect(
        StreamConfig {
            base_url: settings.base_url.clone(),
            token: settings.token.clone(),
            limit: settings.stream_limit,
        },
        dispatcher.sender(),
    );
    let mut connection = manager.state();
    let mut connection_open = true;

    let mut state = AppState::new(settings);
    let keybindings = KeyBindings::new();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(100));

    loop {
        tokio::select! {
            Some(event) = events.next() => match event {
                Event::Key(key) => {
                    let action = if state.input_active {
                        keybindings.get_filter_action(&key)
                    } else {
                        keybindings.get_viewer_action(&key)
                    };
                    if let Some(action) = action {
                        handle_action(&mut state, action);
                    }
                }
                Event::Tick | Event::Resize(_, _) => {}
                Event::Error(err) => {
                    tracing::warn!(%err, "terminal event error");
                }
            },

            changed = connection.changed(), if connection_open => match changed {
                Ok(()) => {
                    let current = connection.borrow_and_update().clone();
                    state.set_connection(current);
                }
                // The driver task is gone; its last state stays on screen
                Err(_) => connection_open = false,
            },
        }

        if state.should_quit {
            break;
        }

        tui.terminal()
            .draw(|frame| LogViewerScreen::render(frame, &mut state, &buffer))?;
    }

    manager.shutdown();
    events.shutdown();
    tui.restore()?;
    Ok(())
}

fn handle_action(state: &mut AppState, action: Action) {
    match action {
        Action::Quit => state.should_quit = true,
        Action::ToggleHelp => state.help_visible = !state.help_visible,
        Action::OpenFilter => state.open_filter(),
        Action::CloseFilter => state.close_filter(),
        Action::FilterInput(c) => state.filter_input.push(c),
        Action::FilterBackspace => {
            state.filter_input.pop();
        }
        Action::ApplyFilter => state.apply_filter(),
        Action::ClearFilter => state.clear_filter(),
        Action::ScrollUp(lines) => state.scroll_up(lines),
        Action::ScrollDown(lines) => state.scroll_down(lines),
        Action::PageUp => state.scroll_up(20),
        Action::PageDown => state.scroll_down(20),
        Action::ScrollToTop => state.scroll_to_top(),
        Action::ScrollToBottom => state.scroll_to_bottom(),
        Action::ToggleFollow => state.auto_scroll = !state.auto_scroll,
        Action::Tick => {}
    }
}
