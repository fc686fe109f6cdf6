use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use cloudsign_backend::board::SignBoard;
use cloudsign_backend::{AppState, RateLimitConfig, create_app};
use cloudsign_core::{
    BackendServer, ControllerApi, GroupInfo, ManagerSettings, PlaceholderResolver, ServerState,
    SignError, SignLocation,
};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
// for `oneshot` method

const TOKEN: &str = "operator-secret";

/// Controller that knows a fixed set of groups and whatever servers a test adds.
#[derive(Default)]
struct FakeController {
    groups: Vec<String>,
    servers: Mutex<Vec<BackendServer>>,
    failing: bool,
}

impl FakeController {
    fn with_groups(groups: &[&str]) -> Self {
        Self {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    fn add_server(&self, group: &str, id: u32, players: u32) {
        self.servers.lock().push(BackendServer {
            unique_id: format!("{group}-uid-{id}"),
            group: group.to_string(),
            numerical_id: id,
            state: ServerState::Available,
            host: "10.0.0.1".to_string(),
            port: 25565 + id as u16,
            min_memory: 512,
            max_memory: 1024,
            max_players: 20,
            player_count: players,
            properties: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        });
    }

    fn group_info(name: &str) -> GroupInfo {
        GroupInfo {
            name: name.to_string(),
            min_memory: 512,
            max_memory: 1024,
            min_online_count: 1,
            max_online_count: 4,
            max_players: 20,
            properties: HashMap::new(),
        }
    }
}

#[async_trait]
impl ControllerApi for FakeController {
    async fn servers_by_group(&self, group: &str) -> cloudsign_core::Result<Vec<BackendServer>> {
        if self.failing {
            return Err(SignError::controller("connection refused (secret-host:8080)"));
        }
        Ok(self
            .servers
            .lock()
            .iter()
            .filter(|s| s.group == group)
            .cloned()
            .collect())
    }

    async fn group_by_name(&self, name: &str) -> cloudsign_core::Result<GroupInfo> {
        if self.failing {
            return Err(SignError::controller("connection refused (secret-host:8080)"));
        }
        if self.groups.iter().any(|g| g == name) {
            Ok(Self::group_info(name))
        } else {
            Err(SignError::GroupNotFound(name.to_string()))
        }
    }

    async fn all_groups(&self) -> cloudsign_core::Result<Vec<GroupInfo>> {
        Ok(self.groups.iter().map(|g| Self::group_info(g)).collect())
    }
}

/// Scratch directory for rule and layout files
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cloudsign-api-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("rules")).unwrap();
    std::fs::create_dir_all(dir.join("layouts")).unwrap();
    dir
}

/// Helper to create app state with an in-memory database
async fn setup_state(
    controller: Arc<FakeController>,
    dir: &std::path::Path,
    admin_token: Option<&str>,
) -> Arc<AppState> {
    let db = cloudsign_db::Database::open_in_memory()
        .await
        .expect("Failed to create in-memory database");
    let (board, _worker) = SignBoard::spawn(64, PlaceholderResolver::new(controller.clone()));
    Arc::new(AppState::new(
        db,
        controller,
        board,
        ManagerSettings::default(),
        dir.join("rules"),
        dir.join("layouts"),
        admin_token.map(str::to_string),
    ))
}

/// Helper to create app with generous rate limits
fn create_test_app(state: Arc<AppState>) -> axum::Router {
    let config = cloudsign_backend::config::Config::default();
    let rate_limit = RateLimitConfig {
        operator_per_sec: 1000,
        operator_burst: 1000,
        read_per_sec: 1000,
        read_burst: 1000,
    };
    create_app(state, config.request_body_limit, config.request_timeout, rate_limit)
}

/// Helper to send a request and get response
async fn send_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    // the rate limiter keys on the client address
    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("X-Forwarded-For", "127.0.0.1");

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(json_body) = body {
        request_builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

fn sign_at(group: &str, x: i32) -> Value {
    json!({ "group": group, "world": "world", "x": x, "y": 64, "z": 0 })
}

fn write_online_layout(dir: &std::path::Path) {
    std::fs::write(
        dir.join("layouts").join("online.json"),
        r#"{
            "name": "online",
            "rule": "ONLINE",
            "frames": [["<server_name>", "<server_player_count>/<server_max_players>"]]
        }"#,
    )
    .unwrap();
}

// =============================================================================
// HEALTH AND STATUS TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    // GIVEN: A running application
    let dir = scratch_dir("health");
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Making a GET request to /health
    let (status, _body) = send_request(&app, "GET", "/health", None, None).await;

    // THEN: Should return 200 OK
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_of_fresh_backend() {
    // GIVEN: A backend with nothing registered and the manager not started
    let dir = scratch_dir("status");
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Requesting the status
    let (status, body) = send_request(&app, "GET", "/status", None, None).await;

    // THEN: Counts are zero and the default rules are loaded
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["signs"], 0);
    assert_eq!(body["layouts"], 0);
    assert!(body["rules"].as_u64().unwrap() >= 6);
}

// =============================================================================
// REGISTRATION TESTS
// =============================================================================

#[tokio::test]
async fn test_register_sign_success() {
    // GIVEN: A controller that knows the lobby group
    let dir = scratch_dir("register");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Registering a sign for lobby
    let (status, body) = send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;

    // THEN: The sign is created and listed under its group
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["group"], "lobby");
    assert_eq!(body["location"]["x"], 1);

    let (status, body) = send_request(&app, "GET", "/groups/lobby/signs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_register_twice_conflicts() {
    // GIVEN: A sign already registered at a location
    let dir = scratch_dir("register-twice");
    let controller = Arc::new(FakeController::with_groups(&["lobby", "bedwars"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;

    // WHEN: Registering the same location again, even for another group
    let (status, body) =
        send_request(&app, "POST", "/signs", Some(sign_at("bedwars", 1)), Some(TOKEN)).await;

    // THEN: Should return 409 Conflict
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Sign is already registered");
}

#[tokio::test]
async fn test_register_unknown_group_not_found() {
    // GIVEN: A controller without a "skywars" group
    let dir = scratch_dir("register-unknown");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Registering a sign for skywars
    let (status, body) =
        send_request(&app, "POST", "/signs", Some(sign_at("skywars", 1)), Some(TOKEN)).await;

    // THEN: Should return 404 and name the group
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Group not found");
    assert_eq!(body["details"], "skywars");
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    // GIVEN: A running application
    let dir = scratch_dir("register-invalid");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Registering with an out of range y and with a bad group name
    let out_of_range = json!({ "group": "lobby", "world": "world", "x": 0, "y": 5000, "z": 0 });
    let (status_y, _) = send_request(&app, "POST", "/signs", Some(out_of_range), Some(TOKEN)).await;
    let (status_group, _) =
        send_request(&app, "POST", "/signs", Some(sign_at("lob by!", 0)), Some(TOKEN)).await;

    // THEN: Both are rejected with 400 Bad Request
    assert_eq!(status_y, StatusCode::BAD_REQUEST);
    assert_eq!(status_group, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_controller_failure_is_not_exposed() {
    // GIVEN: A controller that cannot be reached
    let dir = scratch_dir("controller-down");
    let state = setup_state(Arc::new(FakeController::failing()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Registering a sign
    let (status, body) = send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;

    // THEN: Should return 502 without the underlying error text
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.to_string().contains("secret-host"));
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_missing_or_wrong_token_unauthorized() {
    // GIVEN: A backend with an operator token configured
    let dir = scratch_dir("auth");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Registering without a token and with a wrong one
    let (missing, _) = send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), None).await;
    let (wrong, body) =
        send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some("guess")).await;

    // THEN: Both are rejected with 401 Unauthorized
    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid operator token");
}

#[tokio::test]
async fn test_operator_routes_disabled_without_token() {
    // GIVEN: A backend with no operator token configured
    let dir = scratch_dir("auth-disabled");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, None).await;
    let app = create_test_app(state);

    // WHEN: Trying to reload
    let (status, _) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;

    // THEN: Should return 403 Forbidden
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// UNREGISTER TESTS
// =============================================================================

#[tokio::test]
async fn test_unregister_unknown_sign_not_found() {
    // GIVEN: An empty registry
    let dir = scratch_dir("unregister-unknown");
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Unregistering a location that was never registered
    let location = json!({ "world": "world", "x": 9, "y": 64, "z": 9 });
    let (status, body) = send_request(&app, "DELETE", "/signs", Some(location), Some(TOKEN)).await;

    // THEN: Should return 404 Not Found
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sign is not registered");
}

#[tokio::test]
async fn test_unregister_sign_success() {
    // GIVEN: A registered sign
    let dir = scratch_dir("unregister");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;

    // WHEN: Unregistering it
    let location = json!({ "world": "world", "x": 1, "y": 64, "z": 0 });
    let (status, _) = send_request(&app, "DELETE", "/signs", Some(location), Some(TOKEN)).await;

    // THEN: The group has no signs left
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_request(&app, "GET", "/groups/lobby/signs", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unregister_group_removes_every_sign() {
    // GIVEN: Two lobby signs and one bedwars sign
    let dir = scratch_dir("unregister-group");
    let controller = Arc::new(FakeController::with_groups(&["lobby", "bedwars"]));
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state);
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 2)), Some(TOKEN)).await;
    send_request(&app, "POST", "/signs", Some(sign_at("bedwars", 3)), Some(TOKEN)).await;

    // WHEN: Unregistering the lobby group
    let (status, body) = send_request(&app, "DELETE", "/groups/lobby/signs", None, Some(TOKEN)).await;

    // THEN: Both lobby signs are gone and bedwars is untouched
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let (status, body) = send_request(&app, "GET", "/signs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let signs = body.as_array().unwrap();
    assert_eq!(signs.len(), 1);
    assert_eq!(signs[0]["group"], "bedwars");

    // AND: Unregistering it again finds nothing
    let (status, _) = send_request(&app, "DELETE", "/groups/lobby/signs", None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// RELOAD TESTS
// =============================================================================

#[tokio::test]
async fn test_reload_loads_rules_and_layouts() {
    // GIVEN: One config rule inheriting ONLINE and one layout using it
    let dir = scratch_dir("reload");
    std::fs::write(
        dir.join("rules").join("lobby.json"),
        r#"{
            "name": "LOBBY_ONLINE",
            "inherit": "ONLINE",
            "matcher": { "MATCH_ALL": [{ "key": "<server_group>", "value": "lobby" }] }
        }"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("layouts").join("lobby.json"),
        r#"{ "name": "lobby", "rule": "LOBBY_ONLINE", "frames": [["<server_name>"]] }"#,
    )
    .unwrap();
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Reloading
    let (status, body) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;

    // THEN: Both are counted and visible in the status
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "rules": 1, "layouts": 1 }));
    let (_, status_body) = send_request(&app, "GET", "/status", None, None).await;
    assert_eq!(status_body["layouts"], 1);
}

#[tokio::test]
async fn test_reload_with_unknown_rule_keeps_previous_layouts() {
    // GIVEN: A valid layout that has been loaded
    let dir = scratch_dir("reload-broken");
    write_online_layout(&dir);
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);
    let (status, _) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;
    assert_eq!(status, StatusCode::OK);

    // WHEN: A second layout references a rule that does not exist
    std::fs::write(
        dir.join("layouts").join("typo.json"),
        r#"{ "name": "typo", "rule": "ONLNE", "frames": [["x"]] }"#,
    )
    .unwrap();
    let (status, body) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;

    // THEN: The reload is rejected and the old layout stays
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().contains("ONLNE"));
    let (_, status_body) = send_request(&app, "GET", "/status", None, None).await;
    assert_eq!(status_body["layouts"], 1);
}

#[tokio::test]
async fn test_reload_with_unparsable_file() {
    // GIVEN: A layout file that is not JSON
    let dir = scratch_dir("reload-unparsable");
    std::fs::write(dir.join("layouts").join("bad.json"), "{ frames: ").unwrap();
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Reloading
    let (status, body) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;

    // THEN: Should return 422 naming the file
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().contains("bad.json"));
}

#[tokio::test]
async fn test_reload_with_rule_shadowing_a_builtin() {
    // GIVEN: A config rule named like the built-in FULL rule
    let dir = scratch_dir("reload-conflict");
    std::fs::write(dir.join("rules").join("full.json"), r#"{ "name": "FULL" }"#).unwrap();
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: Reloading
    let (status, body) = send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;

    // THEN: Should return 422 naming the rule
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"].as_str().unwrap().contains("FULL"));
}

// =============================================================================
// ASSIGNMENT AND CLICK TESTS
// =============================================================================

#[tokio::test]
async fn test_signs_show_rendered_lines_after_tick() {
    // GIVEN: A lobby server, an online layout and a registered sign
    let dir = scratch_dir("render");
    write_online_layout(&dir);
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    controller.add_server("lobby", 1, 3);
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state.clone());
    send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;

    // WHEN: The server cache refreshes and the manager ticks
    state.manager.refresh_servers().await.unwrap();
    let report = state.manager.tick().await;
    assert_eq!(report.rendered, 1);

    // THEN: The sign lists the server and, once drawn, its resolved lines
    let mut body = Value::Null;
    for _ in 0..100 {
        let (_, listed) = send_request(&app, "GET", "/signs", None, None).await;
        if !listed[0]["lines"].is_null() {
            body = listed;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(body[0]["server"], "lobby-1");
    assert_eq!(body[0]["state"], "AVAILABLE");
    assert_eq!(body[0]["player_count"], 3);
    assert_eq!(body[0]["lines"], json!(["lobby-1", "3/20"]));
}

#[tokio::test]
async fn test_unregistered_sign_leaves_the_board() {
    // GIVEN: A sign the board has drawn
    let dir = scratch_dir("render-forget");
    write_online_layout(&dir);
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    controller.add_server("lobby", 1, 3);
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state.clone());
    send_request(&app, "POST", "/reload", None, Some(TOKEN)).await;
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;
    state.manager.refresh_servers().await.unwrap();
    state.manager.tick().await;
    let location = SignLocation::new("world", 1, 64, 0);
    for _ in 0..100 {
        if state.board.lines(&location).await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(state.board.lines(&location).await.is_some());

    // WHEN: Unregistering it
    let body = json!({ "world": "world", "x": 1, "y": 64, "z": 0 });
    let (status, _) = send_request(&app, "DELETE", "/signs", Some(body), Some(TOKEN)).await;

    // THEN: Its rendered lines are gone as well
    assert_eq!(status, StatusCode::OK);
    assert!(state.board.lines(&location).await.is_none());
    assert!(state.board.is_empty());
}

#[tokio::test]
async fn test_click_connects_to_assigned_server() {
    // GIVEN: A sign showing lobby-2
    let dir = scratch_dir("click");
    let controller = Arc::new(FakeController::with_groups(&["lobby"]));
    controller.add_server("lobby", 2, 0);
    let state = setup_state(controller, &dir, Some(TOKEN)).await;
    let app = create_test_app(state.clone());
    send_request(&app, "POST", "/signs", Some(sign_at("lobby", 1)), Some(TOKEN)).await;
    state.manager.refresh_servers().await.unwrap();
    state.manager.tick().await;

    // WHEN: A player clicks it
    let click = json!({
        "world": "world", "x": 1, "y": 64, "z": 0,
        "player_id": "8667ba71-b85a-4004-af54-457a9734eed7",
        "player_name": "Steve",
        "current_server": "lobby-1"
    });
    let (status, body) = send_request(&app, "POST", "/signs/click", Some(click), Some(TOKEN)).await;

    // THEN: The player is sent to the assigned server
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "connect");
    assert_eq!(body["server"], "lobby-2");
    assert_eq!(body["target"], "lobby-2");
}

#[tokio::test]
async fn test_click_on_unregistered_sign() {
    // GIVEN: No signs at all
    let dir = scratch_dir("click-unregistered");
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: A player clicks a plain block
    let click = json!({
        "world": "world", "x": 5, "y": 64, "z": 5,
        "player_id": "8667ba71-b85a-4004-af54-457a9734eed7",
        "player_name": "Steve",
        "current_server": "lobby-1"
    });
    let (status, body) = send_request(&app, "POST", "/signs/click", Some(click), Some(TOKEN)).await;

    // THEN: The outcome says so
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "not_registered");
}

#[tokio::test]
async fn test_click_rejects_invalid_player_name() {
    // GIVEN: A running application
    let dir = scratch_dir("click-invalid");
    let state = setup_state(Arc::new(FakeController::default()), &dir, Some(TOKEN)).await;
    let app = create_test_app(state);

    // WHEN: The player name has forbidden characters
    let click = json!({
        "world": "world", "x": 5, "y": 64, "z": 5,
        "player_id": "id",
        "player_name": "Steve; DROP TABLE",
        "current_server": "lobby-1"
    });
    let (status, _) = send_request(&app, "POST", "/signs/click", Some(click), Some(TOKEN)).await;

    // THEN: Should return 400 Bad Request
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
