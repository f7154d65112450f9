use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_api::routes::create_router;
use quill_api::state::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quill_server=debug,quill_api=debug,quill_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let host = std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QUILL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("QUILL_DB_PATH")
        .unwrap_or_else(|_| "quill.db".into())
        .into();

    // Init database
    let db = quill_db::Database::open(&db_path)?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        argon2: argon2_from_env()?,
    });

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Quill server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Argon2id with cost factors from the environment, falling back to the
/// library defaults.
fn argon2_from_env() -> anyhow::Result<Argon2<'static>> {
    let defaults = Params::default();
    let m_cost = env_u32("QUILL_ARGON2_M_COST", defaults.m_cost())?;
    let t_cost = env_u32("QUILL_ARGON2_T_COST", defaults.t_cost())?;
    let p_cost = env_u32("QUILL_ARGON2_P_COST", defaults.p_cost())?;

    let params = Params::new(m_cost, t_cost, p_cost, None)
        .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn env_u32(var: &str, default: u32) -> anyhow::Result<u32> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be an integer: {}", var, e)),
        Err(_) => Ok(default),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
