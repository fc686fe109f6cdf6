//! In-memory copy of the registered sign locations.
//!
//! The reconciliation tick reads locations many times per second, so reads
//! never go to SQLite. The cache is filled once at open and updated after
//! every committed write.

use cloudsign_core::SignLocation;
use scc::HashMap;
use scc::hash_map::Entry;

use crate::models::RegisteredLocation;

/// Locations keyed by group name, each list sorted by row id.
#[derive(Default)]
pub struct LocationCache {
  groups: HashMap<String, Vec<RegisteredLocation>>,
}

impl LocationCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn insert(&self, registered: RegisteredLocation) {
    match self.groups.entry_async(registered.group.clone()).await {
      Entry::Occupied(mut entry) => {
        let locations = entry.get_mut();
        let idx = locations.partition_point(|l| l.id < registered.id);
        locations.insert(idx, registered);
      }
      Entry::Vacant(entry) => {
        entry.insert_entry(vec![registered]);
      }
    }
  }

  /// Drops the location from `group`, and the group once it is empty.
  pub async fn remove(&self, group: &str, location: &SignLocation) -> bool {
    match self.groups.entry_async(group.to_string()).await {
      Entry::Occupied(mut entry) => {
        let locations = entry.get_mut();
        let before = locations.len();
        locations.retain(|l| &l.location != location);
        let removed = locations.len() != before;
        if locations.is_empty() {
          entry.remove();
        }
        removed
      }
      Entry::Vacant(_) => false,
    }
  }

  pub async fn remove_group(&self, group: &str) -> Vec<RegisteredLocation> {
    self
      .groups
      .remove_async(group)
      .await
      .map(|(_, locations)| locations)
      .unwrap_or_default()
  }

  pub async fn locations(&self, group: &str) -> Vec<SignLocation> {
    self
      .groups
      .read_async(group, |_, locations| {
        locations.iter().map(|l| l.location.clone()).collect()
      })
      .await
      .unwrap_or_default()
  }

  pub async fn contains_group(&self, group: &str) -> bool {
    self.groups.read_async(group, |_, _| ()).await.is_some()
  }

  /// Group names, ordered by their first registration.
  pub async fn groups(&self) -> Vec<String> {
    let mut order: Vec<(i64, String)> = Vec::new();
    // visit only, every entry is kept
    self
      .groups
      .retain_async(|group, locations| {
        if let Some(first) = locations.first() {
          order.push((first.id, group.clone()));
        }
        true
      })
      .await;
    order.sort_unstable_by_key(|(id, _)| *id);
    order.into_iter().map(|(_, group)| group).collect()
  }

  /// Every location in registration order.
  pub async fn all(&self) -> Vec<RegisteredLocation> {
    let mut all = Vec::new();
    self
      .groups
      .retain_async(|_, locations| {
        all.extend(locations.iter().cloned());
        true
      })
      .await;
    all.sort_unstable_by_key(|l| l.id);
    all
  }

  /// Number of groups.
  pub fn len(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }
}
