// ABOUTME: Main entry point for the QuickCode TUI application
//! QuickCode terminal client.

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, Terminal};
use std::{
    io,
    path::PathBuf,
    time::{Duration, Instant},
};

use quickcode::app::{App, EventHandler, View};
use quickcode::cli::Cli;
use quickcode::components::LayoutComponent;
use quickcode::terminal::SurfaceSize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();
    setup_panic_handler();

    let config = cli.load_config()?;
    tracing::info!(
        "Starting QuickCode (service: {}, terminal: {})",
        config.service_url,
        config.terminal_url
    );

    let mut app = App::new(config, cli.launcher_state());
    let mut layout = LayoutComponent::new();

    run_tui(&mut app, &mut layout).await?;

    Ok(())
}

async fn run_tui(app: &mut App, layout: &mut LayoutComponent) -> Result<()> {
    if let Err(e) = crossterm::terminal::is_raw_mode_enabled() {
        eprintln!("Cannot check terminal raw mode: {}", e);
        return Err(anyhow::anyhow!("Terminal not compatible: {}", e));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app, layout).await;

    // Release the session before handing the terminal back
    app.state.leave_coding();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    layout: &mut LayoutComponent,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    // Shell output and provisioning results should not wait for a full tick
    let fast_poll = Duration::from_millis(16);
    let mut last_tick = Instant::now();

    loop {
        let size = terminal.size()?;
        app.state.viewport = SurfaceSize::new(size.width, size.height);
        app.state.pump_terminal();

        terminal.draw(|frame| {
            layout.render(frame, &app.state);
        })?;

        let mut timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if app.state.current_view == View::Coding || app.is_provisioning() {
            timeout = timeout.min(fast_poll);
        }

        if event::poll(timeout)? {
            let input = event::read()?;
            if let Some(app_event) = EventHandler::handle_event(input, &app.state) {
                EventHandler::process_event(app_event, &mut app.state);
            }
        }

        // Ticks never wait on the network, so running them often is cheap
        if last_tick.elapsed() >= tick_rate
            || app.state.pending_async_action.is_some()
            || app.is_provisioning()
        {
            if let Err(e) = app.tick().await {
                tracing::error!("Error during app tick: {}", e);
            }
            last_tick = Instant::now();
        }

        if app.state.should_quit {
            break;
        }
    }

    Ok(())
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = dirs::home_dir()
        .map(|home| home.join(".quickcode").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".quickcode/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    let log_file = log_dir.join(format!(
        "quickcode-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // The TUI owns stdout, so without a log file we run silent
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_file) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickcode=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        // Ensure terminal is restored before logging the panic
        let _ = disable_raw_mode();
        let _ = execute!(
            std::io::stderr(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        );

        tracing::error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
