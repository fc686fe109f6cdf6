pub mod board;
pub mod config;
pub mod controller;
mod error;
pub mod helpers;
pub mod loader;
mod routes;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use cloudsign_core::{
    ControllerApi, IdentityMapper, LayoutRepository, ManagerSettings, RuleRegistry, SignLocation,
    SignManager,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::board::SignBoard;

pub use crate::error::{AppError, ErrorResponse};

pub struct AppState {
    pub db: cloudsign_db::Database,
    pub manager: SignManager<SignLocation>,
    pub board: SignBoard,
    pub rules_dir: PathBuf,
    pub layouts_dir: PathBuf,
    /// Bearer token for mutating routes; `None` disables them
    pub admin_token: Option<String>,
}

/// Counts after a successful configuration reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub rules: usize,
    pub layouts: usize,
}

impl AppState {
    pub fn new(
        db: cloudsign_db::Database,
        controller: Arc<dyn ControllerApi>,
        board: SignBoard,
        settings: ManagerSettings,
        rules_dir: PathBuf,
        layouts_dir: PathBuf,
        admin_token: Option<String>,
    ) -> Self {
        let rules = RuleRegistry::with_defaults();
        rules.register_player_rules();

        let manager = SignManager::new(
            controller,
            Arc::new(db.clone()),
            Arc::new(IdentityMapper),
            Arc::new(board.clone()),
            Arc::new(rules),
            Arc::new(LayoutRepository::new()),
            settings,
        );

        Self {
            db,
            manager,
            board,
            rules_dir,
            layouts_dir,
            admin_token,
        }
    }

    /// Re-read rules, then layouts, from their directories.
    ///
    /// A failing layout set leaves the previous layouts in place.
    pub async fn reload(&self) -> Result<ReloadSummary, AppError> {
        let rule_configs = loader::load_rules(&self.rules_dir).await?;
        let layout_configs = loader::load_layouts(&self.layouts_dir).await?;

        let rules = self
            .manager
            .rules()
            .reload_config_rules(&rule_configs, self.manager.resolver())?;
        let layouts = self
            .manager
            .layouts()
            .reload(&layout_configs, self.manager.rules())?;

        tracing::info!(rules, layouts, "configuration reloaded");
        Ok(ReloadSummary { rules, layouts })
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for operator (mutating) endpoints
    pub operator_per_sec: u64,
    /// Burst size for operator endpoints
    pub operator_burst: u32,
    /// Requests per second for read endpoints
    pub read_per_sec: u64,
    /// Burst size for read endpoints
    pub read_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            operator_per_sec: 2,
            operator_burst: 5,
            read_per_sec: 20,
            read_burst: 40,
        }
    }
}

/// Governor counts in replenish periods, so `n` per second becomes one token
/// every `1000 / n` ms.
fn replenish_ms(per_sec: u64) -> u64 {
    (1000 / per_sec.max(1)).max(1)
}

/// Create the application router around an already built state
pub fn create_app(
    state: Arc<AppState>,
    request_body_limit: usize,
    request_timeout: Duration,
    rate_limit: RateLimitConfig,
) -> Router {
    let operator_governor = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms(rate_limit.operator_per_sec))
        .burst_size(rate_limit.operator_burst.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("operator rate limit is non-zero");

    let read_governor = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms(rate_limit.read_per_sec))
        .burst_size(rate_limit.read_burst.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("read rate limit is non-zero");

    let operator_routes = Router::new()
        .route(
            "/signs",
            post(routes::register_sign).delete(routes::unregister_sign),
        )
        .route("/signs/click", post(routes::click))
        .route("/groups/{group}/signs", delete(routes::unregister_group))
        .route("/reload", post(routes::reload))
        .layer(GovernorLayer::new(operator_governor));

    let read_routes = Router::new()
        .route("/status", get(routes::status))
        .route("/signs", get(routes::list_signs))
        .route("/groups/{group}/signs", get(routes::group_signs))
        .layer(GovernorLayer::new(read_governor));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(operator_routes)
        .merge(read_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
