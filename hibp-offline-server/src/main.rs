use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hibp_offline::OfflineDatabase;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hibp-offline-server")]
#[command(about = "Serve the Pwned Passwords API from a local database file")]
struct Args {
    /// Path to the database file
    #[arg(short, long, default_value = hibp_offline::DATABASE_FILENAME)]
    database: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Seconds between checks for an updated database file
    #[arg(long, default_value_t = hibp_offline::DEFAULT_RELOAD_INTERVAL.as_secs())]
    reload_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let db = OfflineDatabase::open(&args.database).await?;
    let reload_task = db.start_reload_task(Duration::from_secs(args.reload_interval_secs));

    let app = hibp_offline_server::router(db);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(addr = %args.listen, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    reload_task.shutdown().await;
    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
