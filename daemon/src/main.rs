//! Ideas daemon: entry point for running the ideas ledger service.

mod config;
mod error;
mod persistence;

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ideas_ledger::SharedLedger;
use ideas_rpc::{AppState, RpcServer};
use ideas_store::FsContentStore;
use ideas_types::{Address, SystemClock};
use ideas_utils::{init_logging, LogFormat};
use ideas_websocket::{WebSocketServer, WsState};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::DaemonConfig;

/// Capacity of the live event channel shared by websocket clients.
const WS_CHANNEL_CAPACITY: usize = 1024;

/// How long in-flight requests may take to finish after shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "ideas-daemon", about = "Ideas ledger daemon")]
struct Cli {
    /// Address holding the administrator role.
    #[arg(long, env = "IDEAS_ADMINISTRATOR")]
    administrator: Option<Address>,

    /// Data directory for the snapshot and content bodies.
    #[arg(long, env = "IDEAS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Interface the servers bind to.
    #[arg(long, env = "IDEAS_BIND_HOST")]
    bind_host: Option<IpAddr>,

    /// RPC server port.
    #[arg(long, env = "IDEAS_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable the WebSocket server.
    #[arg(long, env = "IDEAS_ENABLE_WEBSOCKET")]
    websocket: bool,

    /// WebSocket server port.
    #[arg(long, env = "IDEAS_WS_PORT")]
    websocket_port: Option<u16>,

    /// Number of recent events kept for replay.
    #[arg(long, env = "IDEAS_EVENT_RETENTION")]
    event_retention: Option<usize>,

    /// Seconds between snapshot saves (0 = only on shutdown).
    #[arg(long, env = "IDEAS_SNAPSHOT_INTERVAL_SECS")]
    snapshot_interval_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "IDEAS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "IDEAS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Allow cross-origin requests to the RPC server.
    #[arg(long, env = "IDEAS_ENABLE_CORS")]
    cors: bool,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Layer the flags that were given on top of `base`.
    fn merge(self, base: DaemonConfig) -> DaemonConfig {
        DaemonConfig {
            administrator: self.administrator.or(base.administrator),
            data_dir: self.data_dir.unwrap_or(base.data_dir),
            bind_host: self.bind_host.unwrap_or(base.bind_host),
            rpc_port: self.rpc_port.unwrap_or(base.rpc_port),
            enable_websocket: self.websocket || base.enable_websocket,
            websocket_port: self.websocket_port.unwrap_or(base.websocket_port),
            event_retention: self.event_retention.unwrap_or(base.event_retention),
            snapshot_interval_secs: self
                .snapshot_interval_secs
                .unwrap_or(base.snapshot_interval_secs),
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
            enable_cors: self.cors || base.enable_cors,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)?,
        None => DaemonConfig::default(),
    };
    let config = cli.merge(base);

    init_logging(config.log_format, &config.log_level)?;
    let administrator = config.validate()?;

    run(config, administrator).await
}

async fn run(config: DaemonConfig, administrator: Address) -> anyhow::Result<()> {
    info!(
        administrator = %administrator,
        data_dir = %config.data_dir.display(),
        rpc_port = config.rpc_port,
        websocket = config.enable_websocket,
        "starting ideas daemon"
    );

    let snapshot_path = config.snapshot_path();
    let ledger =
        persistence::load_or_init(&snapshot_path, &administrator, config.event_retention)?;
    let content = FsContentStore::open(config.content_dir())?;
    let shared = SharedLedger::new(ledger, Arc::new(SystemClock));

    let (shutdown, _) = broadcast::channel::<()>(1);
    let mut servers = Vec::new();

    let rpc = RpcServer::new(SocketAddr::new(config.bind_host, config.rpc_port))
        .with_cors(config.enable_cors);
    let (_, handle) = rpc
        .start_until(
            AppState::new(shared.clone(), Arc::new(content)),
            shutdown_signal(&shutdown),
        )
        .await?;
    servers.push(handle);

    if config.enable_websocket {
        let state = WsState::attach(shared.clone(), WS_CHANNEL_CAPACITY).await;
        let (_, handle) =
            WebSocketServer::new(SocketAddr::new(config.bind_host, config.websocket_port), state)
                .start_until(shutdown_signal(&shutdown))
                .await?;
        servers.push(handle);
    }

    let saver = (config.snapshot_interval_secs > 0).then(|| {
        tokio::spawn(save_periodically(
            shared.clone(),
            snapshot_path.clone(),
            Duration::from_secs(config.snapshot_interval_secs),
        ))
    });

    wait_for_signal().await;

    if let Some(handle) = saver {
        handle.abort();
    }
    stop_and_save(&shutdown, servers, &shared, &snapshot_path).await?;
    info!("ideas daemon exited cleanly");
    Ok(())
}

fn shutdown_signal(shutdown: &broadcast::Sender<()>) -> impl Future<Output = ()> + Send + 'static {
    let mut rx = shutdown.subscribe();
    async move {
        let _ = rx.recv().await;
    }
}

/// Stop the servers, let in-flight requests finish, then take the final
/// snapshot so no accepted command is left out of it.
async fn stop_and_save(
    shutdown: &broadcast::Sender<()>,
    servers: Vec<JoinHandle<()>>,
    ledger: &SharedLedger,
    path: &Path,
) -> anyhow::Result<()> {
    let _ = shutdown.send(());
    for mut handle in servers {
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            warn!("server did not drain in time, aborting");
            handle.abort();
        }
    }
    save(ledger, path).await
}

/// Save a snapshot every `interval`, skipping rounds with no new events.
async fn save_periodically(ledger: SharedLedger, path: PathBuf, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut saved_at = ledger.high_water_mark().await;

    loop {
        ticker.tick().await;
        let mark = ledger.high_water_mark().await;
        if mark == saved_at {
            continue;
        }
        match save(&ledger, &path).await {
            Ok(()) => saved_at = mark,
            Err(e) => error!(error = %e, "periodic snapshot failed"),
        }
    }
}

async fn save(ledger: &SharedLedger, path: &Path) -> anyhow::Result<()> {
    let snapshot = ledger.snapshot().await;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || persistence::save_snapshot(&path, &snapshot)).await??;
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
