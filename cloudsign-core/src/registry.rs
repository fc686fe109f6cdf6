//! Where sign locations are registered, and how they map to platform keys.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{Result, SignError};
use crate::models::SignLocation;

/// Persistent set of registered sign locations, grouped by server group.
///
/// Reconciliation only reads from it. Writes come from explicit operator
/// actions (register / unregister).
#[async_trait]
pub trait LocationRegistry: Send + Sync {
    /// Every group with at least one registered location.
    async fn groups(&self) -> Result<Vec<String>>;

    /// Locations of `group` in registration order.
    async fn locations_by_group(&self, group: &str) -> Result<Vec<SignLocation>>;

    async fn save_location(&self, group: &str, location: SignLocation) -> Result<()>;

    /// Returns `false` when the location was not registered.
    async fn remove_location(&self, location: &SignLocation) -> Result<bool>;

    async fn exists(&self, group: &str) -> Result<bool>;
}

/// Hashable platform-side key for a sign.
pub trait LocationKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> LocationKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Converts between stored [`SignLocation`]s and the platform's key type.
pub trait LocationMapper<T>: Send + Sync {
    /// Can fail, e.g. when the world of the location is not loaded.
    fn map(&self, location: &SignLocation) -> Result<T>;

    fn unmap(&self, location: &T) -> SignLocation;
}

/// Uses [`SignLocation`] itself as the key.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMapper;

impl LocationMapper<SignLocation> for IdentityMapper {
    fn map(&self, location: &SignLocation) -> Result<SignLocation> {
        Ok(location.clone())
    }

    fn unmap(&self, location: &SignLocation) -> SignLocation {
        location.clone()
    }
}

/// Non-persistent registry. Keeps group and location registration order.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    groups: RwLock<Vec<(String, Vec<SignLocation>)>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationRegistry for MemoryRegistry {
    async fn groups(&self) -> Result<Vec<String>> {
        Ok(self.groups.read().iter().map(|(g, _)| g.clone()).collect())
    }

    async fn locations_by_group(&self, group: &str) -> Result<Vec<SignLocation>> {
        Ok(self
            .groups
            .read()
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, locations)| locations.clone())
            .unwrap_or_default())
    }

    async fn save_location(&self, group: &str, location: SignLocation) -> Result<()> {
        let mut groups = self.groups.write();
        if groups.iter().any(|(_, locations)| locations.contains(&location)) {
            return Err(SignError::AlreadyRegistered);
        }
        match groups.iter_mut().find(|(g, _)| g == group) {
            Some((_, locations)) => locations.push(location),
            None => groups.push((group.to_string(), vec![location])),
        }
        Ok(())
    }

    async fn remove_location(&self, location: &SignLocation) -> Result<bool> {
        let mut groups = self.groups.write();
        let mut removed = false;
        for (_, locations) in groups.iter_mut() {
            if let Some(idx) = locations.iter().position(|l| l == location) {
                locations.remove(idx);
                removed = true;
                break;
            }
        }
        groups.retain(|(_, locations)| !locations.is_empty());
        Ok(removed)
    }

    async fn exists(&self, group: &str) -> Result<bool> {
        Ok(self.groups.read().iter().any(|(g, _)| g == group))
    }
}
