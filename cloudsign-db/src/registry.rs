use async_trait::async_trait;
use cloudsign_core::{LocationRegistry, SignError, SignLocation};

use crate::{Database, DbError};

#[async_trait]
impl LocationRegistry for Database {
  async fn groups(&self) -> cloudsign_core::Result<Vec<String>> {
    Ok(Database::groups(self).await)
  }

  async fn locations_by_group(&self, group: &str) -> cloudsign_core::Result<Vec<SignLocation>> {
    Ok(Database::locations_by_group(self, group).await)
  }

  async fn save_location(&self, group: &str, location: SignLocation) -> cloudsign_core::Result<()> {
    match Database::save_location(self, group.to_string(), location).await {
      Ok(_) => Ok(()),
      Err(DbError::LocationAlreadyRegistered) => Err(SignError::AlreadyRegistered),
      Err(err) => Err(SignError::registry(err)),
    }
  }

  async fn remove_location(&self, location: &SignLocation) -> cloudsign_core::Result<bool> {
    match Database::remove_location(self, location.clone()).await {
      Ok(_) => Ok(true),
      Err(DbError::LocationNotFound) => Ok(false),
      Err(err) => Err(SignError::registry(err)),
    }
  }

  async fn exists(&self, group: &str) -> cloudsign_core::Result<bool> {
    Ok(Database::exists(self, group).await)
  }
}
