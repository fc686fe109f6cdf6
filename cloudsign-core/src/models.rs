use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the controller for a backend server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerState {
  Unknown,
  Preparing,
  Starting,
  Available,
  Inactive,
  Stopping,
}

impl ServerState {
  pub fn as_str(&self) -> &'static str {
    match self {
      ServerState::Unknown => "UNKNOWN",
      ServerState::Preparing => "PREPARING",
      ServerState::Starting => "STARTING",
      ServerState::Available => "AVAILABLE",
      ServerState::Inactive => "INACTIVE",
      ServerState::Stopping => "STOPPING",
    }
  }
}

impl fmt::Display for ServerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A running game server instance as last reported by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendServer {
  /// Controller-wide unique id
  pub unique_id: String,
  pub group: String,
  /// Id within the group (lobby-1, lobby-2, ...)
  pub numerical_id: u32,
  pub state: ServerState,
  pub host: String,
  pub port: u16,
  pub min_memory: u64,
  pub max_memory: u64,
  pub max_players: u32,
  pub player_count: u32,
  #[serde(default)]
  pub properties: HashMap<String, String>,
  /// Unix timestamp (seconds)
  pub created_at: i64,
  /// Unix timestamp (seconds)
  pub updated_at: i64,
}

impl BackendServer {
  /// `{group}-{numerical_id}`, the name players see the server under.
  pub fn display_name(&self) -> String {
    format!("{}-{}", self.group, self.numerical_id)
  }

  /// Looks up a single attribute by placeholder key.
  /// Unknown keys fall back to the free-form properties map.
  pub fn attribute(&self, key: &str) -> Option<String> {
    let value = match key {
      "id" | "unique_id" => self.unique_id.clone(),
      "group" => self.group.clone(),
      "name" => self.display_name(),
      "numerical_id" => self.numerical_id.to_string(),
      "state" => self.state.to_string(),
      "host" | "ip" => self.host.clone(),
      "port" => self.port.to_string(),
      "min_memory" => self.min_memory.to_string(),
      "max_memory" => self.max_memory.to_string(),
      "max_players" => self.max_players.to_string(),
      "player_count" | "online_players" => self.player_count.to_string(),
      "created_at" => self.created_at.to_string(),
      "updated_at" => self.updated_at.to_string(),
      other => return self.properties.get(other).cloned(),
    };
    Some(value)
  }
}

/// Group metadata as reported by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
  pub name: String,
  pub min_memory: u64,
  pub max_memory: u64,
  pub min_online_count: u32,
  pub max_online_count: u32,
  pub max_players: u32,
  #[serde(default)]
  pub properties: HashMap<String, String>,
}

impl GroupInfo {
  pub fn attribute(&self, key: &str) -> Option<String> {
    let value = match key {
      "name" => self.name.clone(),
      "min_memory" => self.min_memory.to_string(),
      "max_memory" => self.max_memory.to_string(),
      "min_online_count" => self.min_online_count.to_string(),
      "max_online_count" => self.max_online_count.to_string(),
      "max_players" => self.max_players.to_string(),
      other => return self.properties.get(other).cloned(),
    };
    Some(value)
  }
}

/// Block position of a registered sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignLocation {
  pub world: String,
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl SignLocation {
  pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
    Self {
      world: world.into(),
      x,
      y,
      z,
    }
  }
}

impl fmt::Display for SignLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{},{},{}", self.world, self.x, self.y, self.z)
  }
}

/// A sign and the server it currently shows. `server == None` renders as offline.
///
/// Never patched in place: each tick builds a fresh value and overwrites the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSign<T> {
  pub location: T,
  pub server: Option<BackendServer>,
}

impl<T> CloudSign<T> {
  pub fn new(location: T, server: Option<BackendServer>) -> Self {
    Self { location, server }
  }

  pub fn server_id(&self) -> Option<&str> {
    self.server.as_ref().map(|s| s.unique_id.as_str())
  }
}
