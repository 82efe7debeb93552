use std::net::SocketAddr;

use scaffold_api::{config::Settings, db, logging, routes, state::AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Settings first: a process with invalid configuration must not start.
    let settings = Settings::load()?;

    // Keep the guard alive so the non-blocking writer flushes on exit.
    let _log_guard = logging::init(&settings)?;

    let pool = db::connect(&settings).await?;
    let state = AppState::new(pool.clone(), settings);
    let app = routes::app(state.clone());

    let host = state.settings.host.clone();
    let port = state.settings.port;
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .map_err(|e| anyhow::anyhow!("cannot listen on {}:{} - {}", host, port, e))?;

    info!(
        "{} {} listening on http://{}",
        state.settings.app_name,
        state.settings.app_version,
        listener.local_addr()?
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("cannot install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
