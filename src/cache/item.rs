//! Single-entity cache ("fetch one by id").

use chrono::Duration;
use std::sync::Arc;
use tracing::debug;

use crate::api::{require_id, ApiResult};

use super::entry::Entry;
use super::key::ItemKey;
use super::store::{SharedFetch, Store};
use super::traits::ResourceApi;

/// Caches entities of one resource by id.
///
/// A lookup without an id is disabled: it never reaches the network.
pub struct SingleItemCache<A, T> {
  resource: String,
  api: Arc<A>,
  store: Store<ItemKey, T>,
}

impl<A, T> SingleItemCache<A, T>
where
  A: ResourceApi<T>,
  T: Clone + Send + Sync + 'static,
{
  pub fn new(api: Arc<A>, resource: impl Into<String>, stale_time: Duration) -> Self {
    Self {
      resource: resource.into(),
      api,
      store: Store::new(stale_time),
    }
  }

  /// Look up an entity; `Ok(None)` when no id was given.
  pub async fn get_item(&self, id: Option<&str>) -> ApiResult<Option<T>> {
    match id {
      Some(id) if !id.trim().is_empty() => self.fetch_item(Some(id)).await.map(Some),
      _ => {
        debug!(resource = %self.resource, "item lookup disabled: no id");
        Ok(None)
      }
    }
  }

  /// Look up an entity, failing fast with "<resource> id is required" when
  /// the id is missing.
  ///
  /// A cached entity is returned as is, stale or not; a stale one gets a
  /// background refresh unless one is already running. Anything else
  /// (missing, pending, failed) goes to the network, joining a running
  /// fetch if there is one.
  pub async fn fetch_item(&self, id: Option<&str>) -> ApiResult<T> {
    let id = require_id(&self.resource, id)?;
    let key = ItemKey::new(&self.resource, id);

    let cached = self.store.get(&key).filter(Entry::is_success).and_then(|e| e.value);
    if let Some(value) = cached {
      let _ = self
        .store
        .load_if_needed(&key, || self.api.fetch_one(&key.resource, &key.id));
      return Ok(value);
    }

    self.issue(&key).await
  }

  fn issue(&self, key: &ItemKey) -> SharedFetch<T> {
    self
      .store
      .load(key, || self.api.fetch_one(&key.resource, &key.id))
  }

  pub fn peek(&self, id: &str) -> Option<Entry<T>> {
    self.store.get(&ItemKey::new(&self.resource, id))
  }

  pub fn invalidate(&self, id: &str) -> bool {
    self.store.invalidate_key(&ItemKey::new(&self.resource, id))
  }

  pub fn invalidate_all(&self) -> usize {
    self.store.invalidate_by_resource(&self.resource)
  }
}

impl<A, T> Clone for SingleItemCache<A, T> {
  fn clone(&self) -> Self {
    Self {
      resource: self.resource.clone(),
      api: Arc::clone(&self.api),
      store: self.store.clone(),
    }
  }
}
