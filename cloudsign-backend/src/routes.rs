use crate::error::AppError;
use crate::helpers::tokens_match;
use crate::validation;
use crate::AppState;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use cloudsign_core::{ClickOutcome, PlayerContext, ServerState, SignError, SignLocation};
use headers::authorization::Bearer;
use headers::Authorization;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type OperatorAuth = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Deserialize)]
pub(crate) struct LocationRequest {
    world: String,
    x: i32,
    y: i32,
    z: i32,
}

impl LocationRequest {
    fn into_location(self) -> Result<SignLocation, AppError> {
        validation::validate_world_name(&self.world)?;
        validation::validate_coordinates(self.x, self.y, self.z)?;
        Ok(SignLocation::new(self.world, self.x, self.y, self.z))
    }
}

#[derive(Deserialize)]
pub(crate) struct RegisterRequest {
    group: String,
    #[serde(flatten)]
    location: LocationRequest,
}

#[derive(Deserialize)]
pub(crate) struct ClickRequest {
    #[serde(flatten)]
    location: LocationRequest,
    player_id: String,
    player_name: String,
    current_server: String,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    running: bool,
    signs: usize,
    assigned: usize,
    layouts: usize,
    rules: usize,
    cached_groups: usize,
    rendered: usize,
}

#[derive(Serialize)]
pub(crate) struct SignView {
    group: String,
    location: SignLocation,
    /// `group-id` of the assigned server
    server: Option<String>,
    state: Option<ServerState>,
    player_count: Option<u32>,
    /// Last rendered lines, if the sign has been drawn yet
    lines: Option<Vec<String>>,
}

#[derive(Serialize)]
pub(crate) struct RegisteredResponse {
    group: String,
    location: SignLocation,
}

#[derive(Serialize)]
pub(crate) struct UnregisteredResponse {
    location: SignLocation,
    server: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct GroupSignsResponse {
    group: String,
    count: usize,
    locations: Vec<SignLocation>,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum ClickResponse {
    Connect { server: String, target: String },
    NoServer,
    NotRegistered,
}

impl From<ClickOutcome> for ClickResponse {
    fn from(outcome: ClickOutcome) -> Self {
        match outcome {
            ClickOutcome::Connect { server, target } => ClickResponse::Connect {
                server: server.display_name(),
                target,
            },
            ClickOutcome::NoServer => ClickResponse::NoServer,
            ClickOutcome::NotRegistered => ClickResponse::NotRegistered,
        }
    }
}

/// Mutating routes need the configured operator token.
fn authorize(state: &AppState, auth: OperatorAuth) -> Result<(), AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::Forbidden);
    };
    match auth {
        Some(TypedHeader(auth)) if tokens_match(expected, auth.token()) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[debug_handler]
pub(crate) async fn status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let stats = state.manager.stats().await;
    Ok(Json(StatusResponse {
        running: stats.running,
        signs: stats.signs,
        assigned: stats.assigned,
        layouts: stats.layouts,
        rules: stats.rules,
        cached_groups: stats.cached_groups,
        rendered: state.board.len(),
    }))
}

#[debug_handler]
pub(crate) async fn list_signs(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let registered = state.db.all_locations().await;
    let mut signs = Vec::with_capacity(registered.len());
    for entry in registered {
        let server = state
            .manager
            .cloud_sign(&entry.location)
            .await
            .and_then(|sign| sign.server);
        let lines = state.board.lines(&entry.location).await.map(|r| r.lines);
        signs.push(SignView {
            group: entry.group,
            location: entry.location,
            server: server.as_ref().map(|s| s.display_name()),
            state: server.as_ref().map(|s| s.state),
            player_count: server.as_ref().map(|s| s.player_count),
            lines,
        });
    }
    Ok(Json(signs))
}

#[debug_handler]
pub(crate) async fn group_signs(
    State(state): State<Arc<AppState>>,
    Path(group): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_group_name(&group)?;

    if !state.manager.exists(&group).await? {
        return Err(SignError::GroupNotRegistered(group).into());
    }
    let locations = state.manager.locations(&group).await?;

    Ok(Json(GroupSignsResponse {
        group,
        count: locations.len(),
        locations,
    }))
}

#[debug_handler]
pub(crate) async fn register_sign(
    State(state): State<Arc<AppState>>,
    auth: OperatorAuth,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    validation::validate_group_name(&payload.group)?;
    let location = payload.location.into_location()?;

    state.manager.register(&payload.group, &location).await?;
    tracing::info!(group = %payload.group, %location, "sign registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            group: payload.group,
            location,
        }),
    ))
}

#[debug_handler]
pub(crate) async fn unregister_sign(
    State(state): State<Arc<AppState>>,
    auth: OperatorAuth,
    Json(payload): Json<LocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let location = payload.into_location()?;

    let removed = state.manager.unregister(&location).await?;
    tracing::info!(%location, "sign unregistered");

    Ok(Json(UnregisteredResponse {
        location,
        server: removed.and_then(|sign| sign.server).map(|s| s.display_name()),
    }))
}

#[debug_handler]
pub(crate) async fn unregister_group(
    State(state): State<Arc<AppState>>,
    auth: OperatorAuth,
    Path(group): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    validation::validate_group_name(&group)?;

    let locations = state.manager.unregister_group(&group).await?;
    tracing::info!(%group, count = locations.len(), "group signs unregistered");

    Ok(Json(GroupSignsResponse {
        group,
        count: locations.len(),
        locations,
    }))
}

#[debug_handler]
pub(crate) async fn click(
    State(state): State<Arc<AppState>>,
    auth: OperatorAuth,
    Json(payload): Json<ClickRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    validation::validate_player_name(&payload.player_name)?;
    validation::validate_server_name(&payload.current_server)?;
    let location = payload.location.into_location()?;

    let player = PlayerContext {
        player_id: payload.player_id,
        player_name: payload.player_name,
        current_server: payload.current_server,
    };
    let outcome = state.manager.resolve_click(&location, player).await;

    Ok(Json(ClickResponse::from(outcome)))
}

#[debug_handler]
pub(crate) async fn reload(
    State(state): State<Arc<AppState>>,
    auth: OperatorAuth,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, auth)?;
    let summary = state.reload().await?;
    Ok(Json(summary))
}
