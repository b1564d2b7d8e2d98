//! `TooDo` — terminal client for the `TooDo` task service.
//!
//! Signs in against the hosted identity service, opens live subscriptions
//! for the pending and done task lists, and runs the TUI. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/toodo/config.toml`).
//!
//! ```bash
//! # Offline demo mode (in-memory store, seeded account)
//! cargo run --bin toodo
//!
//! # Against the hosted service
//! cargo run --bin toodo -- --api-url https://api.toodo.example \
//!     --gateway-url wss://gw.toodo.example/listen \
//!     --email alice@example.com --password secret1
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_appender::non_blocking::WorkerGuard;

use toodo::app::App;
use toodo::auth::memory::InMemoryAuthClient;
use toodo::auth::remote::RestAuthClient;
use toodo::auth::{AuthClient, AuthSession};
use toodo::config::{CliArgs, ClientConfig, ServiceConfig};
use toodo::store::TaskStore;
use toodo::store::memory::InMemoryStore;
use toodo::store::remote::RemoteStore;
use toodo::ui;
use toodo_proto::task::{Task, TaskId};
use toodo_proto::user::UserId;

/// Demo-mode account, available without any service configured.
const DEMO_EMAIL: &str = "demo@toodo.local";
const DEMO_PASSWORD: &str = "demo-pass";

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not
    // stdout — ratatui owns the terminal).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("toodo starting");

    let result = match config.to_service_config() {
        Some(service) => run_remote(&service, &config).await,
        None => run_demo(&config).await,
    };

    tracing::info!("toodo exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("toodo.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Sign in against the hosted services and run the TUI over them.
async fn run_remote(service: &ServiceConfig, config: &ClientConfig) -> io::Result<()> {
    let (Some(email), Some(password)) = (config.email.clone(), config.password.clone()) else {
        eprintln!("error: --email and --password (or TOODO_EMAIL / TOODO_PASSWORD) are required");
        return Ok(());
    };

    let client = match RestAuthClient::new(&service.api_url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(());
        }
    };
    let auth = AuthSession::new(client);
    if let Err(e) = auth.sign_in(&email, &password).await {
        eprintln!("sign-in failed: {e}");
        return Ok(());
    }

    let token = auth.access_token().unwrap_or_default();
    let store = match RemoteStore::connect(&service.gateway_url, &service.api_url, &token).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("could not reach the task service: {e}");
            return Ok(());
        }
    };

    run_tui(store, auth, config, "Remote").await
}

/// Run the TUI against the in-memory store with a seeded demo account.
async fn run_demo(config: &ClientConfig) -> io::Result<()> {
    let auth = AuthSession::new(InMemoryAuthClient::new().with_account(DEMO_EMAIL, DEMO_PASSWORD));
    let principal = match auth.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("demo sign-in failed: {e}");
            return Ok(());
        }
    };

    let store = Arc::new(InMemoryStore::new());
    seed_demo_tasks(&store, &principal.uid);

    run_tui(store, auth, config, "Demo").await
}

/// A few rows so the demo screens aren't empty.
fn seed_demo_tasks(store: &InMemoryStore, owner: &UserId) {
    let seeds = [
        ("demo-1", "Try adding a task with Enter", false, 1_000),
        ("demo-2", "Press Ctrl+F to search", false, 2_000),
        ("demo-3", "Read the quick-start", true, 500),
    ];
    for (id, text, completed, created_at) in seeds {
        store.seed_task(Task {
            id: TaskId::new(id),
            text: text.to_string(),
            completed,
            created_at,
            owner_id: owner.clone(),
        });
    }
}

/// Terminal setup/teardown bracket around the main loop.
async fn run_tui<S: TaskStore + 'static, A: AuthClient>(
    store: Arc<S>,
    auth: AuthSession<A>,
    config: &ClientConfig,
    connection_label: &str,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, store, &auth, config, connection_label).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop: draw, drain auth transitions, poll the
/// view-models, handle input.
async fn run_app<S: TaskStore + 'static, A: AuthClient>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: Arc<S>,
    auth: &AuthSession<A>,
    config: &ClientConfig,
    connection_label: &str,
) -> io::Result<()> {
    let mut app =
        App::new(store, connection_label).with_timestamp_format(&config.timestamp_format);
    let mut session_rx = auth.subscribe();

    // Bind both view-models to the already-signed-in principal.
    if let Some(principal) = auth.current() {
        app.email = Some(principal.email.clone());
        app.pending.bind(&principal).await;
        app.done.bind(&principal).await;
    }

    loop {
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Auth transitions rebind or tear down the subscriptions.
        if session_rx.has_changed().unwrap_or(false) {
            let current = session_rx.borrow_and_update().clone();
            match current {
                Some(principal) => {
                    app.email = Some(principal.email.clone());
                    app.pending.bind(&principal).await;
                    app.done.bind(&principal).await;
                }
                None => {
                    app.pending.unbind();
                    app.done.unbind();
                    app.email = None;
                    app.should_quit = true;
                }
            }
        }

        app.poll_views();

        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind == KeyEventKind::Press {
                app.handle_key_event(key);
            }
        }

        if app.take_sign_out_request() {
            // Local session state is cleared even when the server call
            // fails; the None transition above handles teardown.
            if let Err(e) = auth.sign_out().await {
                tracing::warn!(error = %e, "sign-out failed");
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
