use anyhow::Context;
use cloudsign_backend::board::SignBoard;
use cloudsign_backend::config::Config;
use cloudsign_backend::controller::HttpController;
use cloudsign_backend::{AppState, RateLimitConfig, create_app};
use cloudsign_core::{ManagerSettings, PlaceholderResolver};
use cloudsign_db::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Capacity of the render queue between the sign tick and the board worker.
const RENDER_QUEUE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    // RUST_LOG wins over the build default
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting cloudsign backend...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, db_path={}, controller={}, layouts={}, rules={}, tick={}ms, refresh={}ms",
        config.port,
        config.database_path,
        config.controller_url,
        config.layouts_dir.display(),
        config.rules_dir.display(),
        config.tick_interval.as_millis(),
        config.cache_refresh_interval.as_millis()
    );
    tracing::info!(
        "Rate limits: operator={}/sec (burst {}), read={}/sec (burst {})",
        config.rate_limit_operator_per_sec,
        config.rate_limit_operator_burst,
        config.rate_limit_read_per_sec,
        config.rate_limit_read_burst
    );
    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, operator routes are disabled");
    }

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database {}", config.database_path))?;
    let controller = Arc::new(
        HttpController::new(config.controller_url.clone(), config.controller_timeout)
            .context("failed to build controller client")?,
    );
    let (board, board_worker) =
        SignBoard::spawn(RENDER_QUEUE, PlaceholderResolver::new(controller.clone()));

    let settings = ManagerSettings {
        tick_interval: config.tick_interval,
        cache_refresh_interval: config.cache_refresh_interval,
    };
    let state = Arc::new(AppState::new(
        db,
        controller,
        board,
        settings,
        config.rules_dir.clone(),
        config.layouts_dir.clone(),
        config.admin_token.clone(),
    ));

    match state.reload().await {
        Ok(summary) => tracing::info!(
            rules = summary.rules,
            layouts = summary.layouts,
            "initial configuration loaded"
        ),
        Err(err) => tracing::warn!(?err, "initial configuration could not be loaded"),
    }
    state
        .manager
        .start()
        .await
        .context("failed to start sign manager")?;

    let rate_limit = RateLimitConfig {
        operator_per_sec: config.rate_limit_operator_per_sec,
        operator_burst: config.rate_limit_operator_burst,
        read_per_sec: config.rate_limit_read_per_sec,
        read_burst: config.rate_limit_read_burst,
    };
    let app = create_app(
        Arc::clone(&state),
        config.request_body_limit,
        config.request_timeout,
        rate_limit,
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Shutting down sign manager...");
    state.manager.stop().await;
    drop(state);
    board_worker.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
}
