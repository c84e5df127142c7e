//! Page cache: the store specialised to pages of a resource.

use chrono::Duration;

use crate::api::Page;

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::{Freshness, SharedFetch, Store};

/// Fetch results keyed by (resource, filter, page, page size).
pub struct PageCache<T> {
  store: Store<CacheKey, Page<T>>,
}

impl<T> PageCache<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new(stale_time: Duration) -> Self {
    Self {
      store: Store::new(stale_time),
    }
  }

  pub fn stale_time(&self) -> Duration {
    self.store.stale_time()
  }

  /// Entry for a key; `None` on a miss. Never blocks on I/O.
  pub fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    self.store.get(key).map(CacheEntry::from)
  }

  pub fn set(&self, key: CacheKey, entry: CacheEntry<T>) {
    self.store.set(key, entry.into());
  }

  /// Drop every page of `resource`, whatever its filter or page number.
  pub fn invalidate_by_resource(&self, resource: &str) -> usize {
    self.store.invalidate_by_resource(resource)
  }

  pub fn invalidate_key(&self, key: &CacheKey) -> bool {
    self.store.invalidate_key(key)
  }

  pub fn len(&self) -> usize {
    self.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.store.is_empty()
  }

  pub fn freshness(&self, key: &CacheKey) -> Freshness {
    self.store.freshness(key)
  }

  pub fn inflight(&self, key: &CacheKey) -> Option<SharedFetch<Page<T>>> {
    self.store.inflight(key)
  }

  pub(crate) fn store(&self) -> &Store<CacheKey, Page<T>> {
    &self.store
  }
}

impl<T> Clone for PageCache<T> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::entry::EntryState;
  use crate::cache::key::ListFilter;

  #[test]
  fn test_set_get_and_invalidate_key() {
    let cache: PageCache<u32> = PageCache::new(Duration::minutes(5));
    let key = CacheKey::new("skills", &ListFilter::default(), 1, 10);
    assert!(cache.get(&key).is_none());

    cache.set(key.clone(), CacheEntry::success(vec![1, 2], 2));
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.state, EntryState::Success);
    assert_eq!(entry.items, vec![1, 2]);
    assert_eq!(entry.total, 2);

    assert!(cache.invalidate_key(&key));
    assert!(cache.get(&key).is_none());
    assert!(!cache.invalidate_key(&key));
  }

  #[test]
  fn test_one_entry_per_key() {
    let cache: PageCache<u32> = PageCache::new(Duration::minutes(5));
    let key = CacheKey::new("skills", &ListFilter::default(), 1, 10);
    cache.set(key.clone(), CacheEntry::success(vec![1], 1));
    cache.set(key.clone(), CacheEntry::success(vec![2], 1));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&key).unwrap().items, vec![2]);
  }
}
