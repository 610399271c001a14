mod cli;
mod tui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use leapchat::app::AppConfig;
use leapchat::chat::{
    observe_health, ChatSession, InputState, Role, SharedTranscript, SubmitOutcome,
};
use leapchat::client::HttpChatBackend;
use leapchat::platform::AppPaths;

use crate::cli::{Cli, Commands};
use crate::tui::{App, EventHandler, Theme};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// The TUI owns the terminal, so its logs go to a rolling file; the one-shot
/// commands log to stderr.
fn init_logging(cli: &Cli, paths: &AppPaths, to_file: bool) -> Result<Option<WorkerGuard>> {
    let level = if cli.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("leapchat={}", level).parse()?);

    if to_file {
        let appender = tracing_appender::rolling::daily(paths.logs_dir(), "leapchat.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        Ok(None)
    }
}

async fn load_config(cli: &Cli, paths: &AppPaths) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(Path::new(path)).await?,
        None => AppConfig::load(paths).await?,
    };

    match &cli.api_base {
        Some(api_base) => Ok(config.with_api_base(api_base.as_str())?),
        None => Ok(config),
    }
}

fn build_session(config: &AppConfig) -> Result<(Arc<ChatSession>, SharedTranscript, InputState)> {
    let backend = HttpChatBackend::new(&config.backend)?;
    let transcript = SharedTranscript::new();
    let input = InputState::new();

    let session = Arc::new(ChatSession::new(
        Arc::new(backend),
        Arc::new(transcript.clone()),
        Arc::new(input.clone()),
        (&config.backend).into(),
    ));

    Ok((session, transcript, input))
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stdout()))?)
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Leaves raw mode before the panic message is printed.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

async fn run_chat(config: AppConfig) -> Result<()> {
    let (session, transcript, input) = build_session(&config)?;

    if config.backend.health_check_on_startup {
        // Detached: the result is only logged.
        session.check_backend_health();
    }

    let mut events = EventHandler::new(Duration::from_millis(config.ui.tick_rate_ms));
    let mut app = App::new(
        session,
        transcript,
        input,
        events.sender(),
        Theme::from_name(&config.ui.theme),
        config.backend.base_url(),
        config.ui.show_timestamps,
    );

    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = run_event_loop(&mut terminal, &mut app, &mut events).await;
    restore_terminal(&mut terminal)?;

    if let Err(e) = &result {
        error!("Chat interface exited with error: {}", e);
    }
    info!("Chat interface closed");
    result
}

async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| app.render(frame))?;

        if let Some(event) = events.next().await {
            app.handle_event(event);
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

async fn run_ask(config: AppConfig, message: &str) -> Result<()> {
    let (session, transcript, _input) = build_session(&config)?;

    let outcome = session.submit(message).await;
    if outcome == SubmitOutcome::Ignored {
        bail!("message is empty");
    }

    let reply = transcript
        .read(|t| {
            t.messages()
                .filter(|m| m.role == Role::Bot)
                .last()
                .map(|m| m.text.clone())
        })
        .context("no reply was recorded")?;
    println!("{}", reply);

    match outcome {
        SubmitOutcome::Failed(kind) => bail!("request failed: {:?}", kind),
        _ => Ok(()),
    }
}

async fn run_health(config: AppConfig) -> Result<()> {
    let backend = HttpChatBackend::new(&config.backend)?;
    let status = observe_health(&backend).await;

    if !status.is_healthy {
        println!(
            "✗ Backend not reachable at {}: {}",
            config.backend.base_url(),
            status.error_message.as_deref().unwrap_or("unknown error")
        );
        bail!("backend is not healthy");
    }

    println!(
        "✓ Backend is running at {} ({}ms)",
        config.backend.base_url(),
        status.response_time_ms.unwrap_or_default()
    );
    match status.llm_enabled {
        Some(true) => println!("  LLM: enabled"),
        Some(false) => println!("  LLM: not configured (retrieval-only answers)"),
        None => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    let paths = AppPaths::new()?;
    paths.ensure_dirs_exist()?;
    let _log_guard = init_logging(&cli, &paths, command == Commands::Chat)?;

    info!("Starting leapchat {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&cli, &paths).await?;

    match command {
        Commands::Chat => run_chat(config).await,
        Commands::Ask { message } => run_ask(config, &message.join(" ")).await,
        Commands::Health => run_health(config).await,
    }
}
