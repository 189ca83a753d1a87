use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use coordd::config::CoordConfig;
use coordd::notify::slack::SlackNotifier;
use coordd::notify::Notifier;
use coordd::tracker::github::GithubTracker;
use coordd::tracker::memory::MemoryTracker;
use coordd::tracker::TaskTracker;
use coordd::{mcp, rest, AppContext};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "coordd",
    about = "Multi-agent task coordination daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP port for the protocol endpoint and REST facade
    #[arg(long, env = "COORDD_PORT")]
    port: Option<u16>,

    /// Data directory for config.toml and logs
    #[arg(long, env = "COORDD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "COORDD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "COORDD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "COORDD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Use the in-memory tracker even when a tracker is configured
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default when no subcommand given).
    ///
    /// Serves the multiplexed protocol endpoint at /mcp and the REST facade
    /// under /api/v1 on one port.
    ///
    /// Examples:
    ///   coordd serve
    ///   coordd
    Serve,
    /// Speak the protocol over stdin/stdout.
    ///
    /// One process, one client, one implicit session. Intended to be spawned
    /// directly by an agent runtime; identity usually comes from
    /// COORDD_DEFAULT_AI.
    ///
    /// Examples:
    ///   COORDD_DEFAULT_AI=cursor coordd stdio
    Stdio,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let stdio_mode = matches!(args.command, Some(Command::Stdio));

    // Config loads before the subscriber is up so the TOML `log` /
    // `log_format` overrides can shape it; config-load diagnostics go
    // straight to stderr.
    let config = CoordConfig::new(args.port, args.data_dir, args.log, args.bind_address);

    // Init once — must happen before any tracing calls. In stdio mode stdout
    // is the protocol stream, so logs go to stderr.
    let _file_guard = setup_logging(
        &config.log,
        args.log_file.as_deref(),
        &config.log_format,
        stdio_mode,
    );

    let app = build_context(config, args.offline);

    match args.command {
        Some(Command::Stdio) => mcp::stdio::run(app)
            .await
            .context("stdio transport failed"),
        None | Some(Command::Serve) => run_server(app).await,
    }
}

/// Wire the tracker and notifier gateways from config and build the shared
/// context. Falls back to the in-memory tracker when no tracker is
/// configured or --offline is set.
fn build_context(config: CoordConfig, offline: bool) -> Arc<AppContext> {
    let tracker: Arc<dyn TaskTracker> = match (&config.github, offline) {
        (Some(github), false) => {
            info!(repo = %github.repo, "using GitHub issue tracker");
            Arc::new(GithubTracker::new(
                github.api_base.clone(),
                github.repo.clone(),
                github.token.clone(),
            ))
        }
        (Some(_), true) => {
            warn!("--offline set — tasks live in memory and vanish on exit");
            Arc::new(MemoryTracker::new())
        }
        (None, _) => {
            warn!("no tracker configured — tasks live in memory and vanish on exit");
            Arc::new(MemoryTracker::new())
        }
    };

    let notifier: Option<Arc<dyn Notifier>> = match &config.slack {
        Some(slack) => {
            info!("chat notifications enabled");
            Some(Arc::new(SlackNotifier::new(slack)))
        }
        None => {
            info!("chat notifications disabled (no gateway configured)");
            None
        }
    };

    Arc::new(AppContext::new(config, tracker, notifier))
}

async fn run_server(app: Arc<AppContext>) -> Result<()> {
    let config = Arc::clone(&app.config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        bind = %config.bind_address,
        "coordd starting"
    );

    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let router = axum::Router::new()
        .merge(mcp::http::router())
        .nest("/api/v1", rest::router(&app))
        .layer(cors)
        .with_state(app);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(make_shutdown_future())
        .await
        .context("server error")?;

    info!("coordd stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM (the service-manager stop path).
async fn make_shutdown_future() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(err = %e, "failed to install SIGTERM handler — Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received Ctrl-C — shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM — shutting down"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl-C — shutting down");
    }
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs also go to a daily-rolling file; the returned
/// guard must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default) or `"json"`.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
    stderr_only: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("coordd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to console",
                dir.display()
            );
            init_console(log_level, use_json, stderr_only);
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }
        Some(guard)
    } else {
        init_console(log_level, use_json, stderr_only);
        None
    }
}

fn init_console(log_level: &str, use_json: bool, stderr_only: bool) {
    // stdio mode keeps stdout clean for the protocol stream.
    match (use_json, stderr_only) {
        (true, true) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .with_writer(std::io::stderr)
            .init(),
        (true, false) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init(),
        (false, true) => tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .with_writer(std::io::stderr)
            .compact()
            .init(),
        (false, false) => tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init(),
    }
}
