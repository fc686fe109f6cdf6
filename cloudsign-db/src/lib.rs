mod cache;
mod error;
mod models;
mod registry;

pub use cache::LocationCache;
pub use error::{DbError, Result};
pub use models::RegisteredLocation;

use std::path::Path;
use std::sync::Arc;

use cloudsign_core::SignLocation;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, params};
use tracing::{debug, info};

/// Persistent sign location registry.
///
/// Writes go to SQLite first and are mirrored into an in-memory cache once
/// committed; every read is served from the cache.
#[derive(Clone)]
pub struct Database {
  conn: Connection,
  cache: Arc<LocationCache>,
}

impl Database {
  /// Open or create a database at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await.map_err(DbError::Sqlite)?;
    Self::with_connection(conn).await
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(DbError::Sqlite)?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: Connection) -> Result<Self> {
    let db = Self {
      conn,
      cache: Arc::new(LocationCache::new()),
    };
    db.initialize().await?;
    db.load_cache().await?;
    Ok(db)
  }

  /// Initialize the database schema.
  async fn initialize(&self) -> Result<()> {
    self
      .conn
      .call(|conn| -> rusqlite::Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(
          r#"
          CREATE TABLE IF NOT EXISTS sign_locations (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              group_name TEXT NOT NULL,
              world TEXT NOT NULL,
              x INTEGER NOT NULL,
              y INTEGER NOT NULL,
              z INTEGER NOT NULL,
              UNIQUE(world, x, y, z)
          );

          CREATE INDEX IF NOT EXISTS idx_sign_locations_group ON sign_locations(group_name);
          "#,
        )?;
        Ok(())
      })
      .await?;

    info!("database initialized");
    Ok(())
  }

  async fn load_cache(&self) -> Result<()> {
    let rows = self
      .conn
      .call(|conn| -> rusqlite::Result<Vec<RegisteredLocation>> {
        let mut stmt = conn.prepare_cached(
          "SELECT id, group_name, world, x, y, z FROM sign_locations ORDER BY id",
        )?;

        let rows = stmt
          .query_map([], |row| {
            Ok(RegisteredLocation {
              id: row.get(0)?,
              group: row.get(1)?,
              location: SignLocation::new(row.get::<_, String>(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            })
          })?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
      })
      .await?;

    let count = rows.len();
    for row in rows {
      self.cache.insert(row).await;
    }
    info!(count, "loaded sign locations");
    Ok(())
  }

  // ========================================================================
  // Writes
  // ========================================================================

  /// Register a location for a group.
  /// Returns an error if the location is registered for any group.
  pub async fn save_location(
    &self,
    group: String,
    location: SignLocation,
  ) -> Result<RegisteredLocation> {
    let registered = self
      .conn
      .call(move |conn| -> rusqlite::Result<Result<RegisteredLocation>> {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM sign_locations WHERE world = ?1 AND x = ?2 AND y = ?3 AND z = ?4)",
          )?
          .query_row(
            params![&location.world, location.x, location.y, location.z],
            |row| row.get(0),
          )?;

        if exists {
          return Ok(Err(DbError::LocationAlreadyRegistered));
        }

        tx.prepare_cached(
          "INSERT INTO sign_locations (group_name, world, x, y, z) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?
        .execute(params![&group, &location.world, location.x, location.y, location.z])?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(Ok(RegisteredLocation {
          id,
          group,
          location,
        }))
      })
      .await??;

    self.cache.insert(registered.clone()).await;
    debug!(%registered.group, location = %registered.location, "saved sign location");
    Ok(registered)
  }

  /// Remove a single location. Returns the removed row.
  pub async fn remove_location(&self, location: SignLocation) -> Result<RegisteredLocation> {
    let removed = self
      .conn
      .call(move |conn| -> rusqlite::Result<Result<RegisteredLocation>> {
        let tx = conn.transaction()?;

        let row: Option<(i64, String)> = tx
          .prepare_cached(
            "SELECT id, group_name FROM sign_locations WHERE world = ?1 AND x = ?2 AND y = ?3 AND z = ?4",
          )?
          .query_row(
            params![&location.world, location.x, location.y, location.z],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let (id, group) = match row {
          Some(row) => row,
          None => return Ok(Err(DbError::LocationNotFound)),
        };

        tx.prepare_cached("DELETE FROM sign_locations WHERE id = ?1")?
          .execute(params![id])?;
        tx.commit()?;

        Ok(Ok(RegisteredLocation {
          id,
          group,
          location,
        }))
      })
      .await??;

    self.cache.remove(&removed.group, &removed.location).await;
    debug!(%removed.group, location = %removed.location, "removed sign location");
    Ok(removed)
  }

  /// Remove every location of a group. Returns how many were removed.
  pub async fn remove_group(&self, group: String) -> Result<usize> {
    let group_log = group.clone();

    let deleted = self
      .conn
      .call(move |conn| -> rusqlite::Result<usize> {
        conn
          .prepare_cached("DELETE FROM sign_locations WHERE group_name = ?1")?
          .execute(params![&group])
      })
      .await?;

    self.cache.remove_group(&group_log).await;
    if deleted > 0 {
      debug!(group = %group_log, deleted, "removed sign group");
    }
    Ok(deleted)
  }

  // ========================================================================
  // Reads (cache only)
  // ========================================================================

  /// Locations of a group in registration order.
  pub async fn locations_by_group(&self, group: &str) -> Vec<SignLocation> {
    self.cache.locations(group).await
  }

  pub async fn all_locations(&self) -> Vec<RegisteredLocation> {
    self.cache.all().await
  }

  /// Groups with at least one location, in order of first registration.
  pub async fn groups(&self) -> Vec<String> {
    self.cache.groups().await
  }

  pub async fn exists(&self, group: &str) -> bool {
    self.cache.contains_group(group).await
  }
}
