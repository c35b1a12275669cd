use std::net::SocketAddr;

use anyhow::Context;
use todo_api::config::Config;
use todo_api::domain::repository::TodoRepository;
use todo_api::http::{self, routes::todos::AppState};
use todo_api::infrastructure::pg::PgTodoRepository;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::from_env()?;

    let repo = PgTodoRepository::connect(&cfg.db)
        .await
        .context("cannot initialize storage")?;
    repo.ensure_schema()
        .await
        .context("cannot bootstrap schema")?;

    let app = http::app(AppState { repo: repo.clone() });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    repo.close().await;
    tracing::info!("server exited");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, letting in-flight requests drain before
/// the server returns.
async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut terminate = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(_) => {
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    let _ = signal::ctrl_c().await;

    tracing::info!("signal caught, shutting down");
}
