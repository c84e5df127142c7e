//! Eager prefetch of the first pages of an active filter.

use tracing::debug;

use super::fetcher::PageFetcher;
use super::key::{CacheKey, ListFilter};
use super::page::PageCache;
use super::traits::ResourceApi;

/// Number of pages fetched up front when a filter becomes active.
pub const DEFAULT_PREFETCH_PAGES: u32 = 3;

/// Keeps the first pages of each active filter fetched.
pub struct PrefetchPool<A, T> {
  cache: PageCache<T>,
  fetcher: PageFetcher<A>,
}

impl<A, T> PrefetchPool<A, T>
where
  A: ResourceApi<T>,
  T: Clone + Send + Sync + 'static,
{
  pub fn new(cache: PageCache<T>, fetcher: PageFetcher<A>) -> Self {
    Self { cache, fetcher }
  }

  /// Make sure pages `1..=window` of `filter` are fetched or being fetched.
  ///
  /// Every missing or stale page gets its own concurrent fetch; a failing
  /// page does not affect the others. Pages that are in flight or still
  /// fresh are left alone, so calling this repeatedly costs nothing. A new
  /// filter simply gets its own window; pages of earlier filters stay where
  /// they are.
  ///
  /// Returns the keys of the window in page order.
  pub fn ensure_prefetch(&self, filter: &ListFilter, window: u32, page_size: u32) -> Vec<CacheKey> {
    let keys: Vec<CacheKey> = (1..=window)
      .map(|page| CacheKey::new(self.fetcher.resource(), filter, page, page_size))
      .collect();

    let mut issued = 0;
    for key in &keys {
      if self.fetcher.ensure(&self.cache, key, filter) {
        issued += 1;
      }
    }
    if issued > 0 {
      debug!(
        resource = self.fetcher.resource(),
        filter = %filter.description(),
        window,
        issued,
        "prefetching"
      );
    }
    keys
  }
}

impl<A, T> Clone for PrefetchPool<A, T> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      fetcher: self.fetcher.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::{ApiError, Record};
  use crate::cache::entry::EntryState;
  use crate::test_support::MockApi;
  use chrono::Duration;
  use std::sync::Arc;

  fn pool(api: &MockApi) -> (PrefetchPool<MockApi, Record>, PageCache<Record>) {
    let cache = PageCache::new(Duration::minutes(5));
    let fetcher = PageFetcher::new(Arc::new(api.clone()), "skills");
    (PrefetchPool::new(cache.clone(), fetcher), cache)
  }

  async fn settle(cache: &PageCache<Record>, keys: &[CacheKey]) {
    for key in keys {
      if let Some(fetch) = cache.inflight(key) {
        let _ = fetch.await;
      }
    }
  }

  #[tokio::test]
  async fn test_window_is_fetched_concurrently() {
    let (api, gate) = MockApi::gated();
    let api = api.with_rows("skills", 45);
    let (pool, cache) = pool(&api);

    let keys = pool.ensure_prefetch(&ListFilter::default(), 3, 10);
    // All three requests are out before any of them answered
    assert_eq!(api.page_calls(), vec![1, 2, 3]);
    for key in &keys {
      assert_eq!(cache.get(key).unwrap().state, EntryState::Pending);
    }

    gate.add_permits(3);
    settle(&cache, &keys).await;
    for key in &keys {
      let entry = cache.get(key).unwrap();
      assert_eq!(entry.state, EntryState::Success);
      assert_eq!(entry.items.len(), 10);
      assert_eq!(entry.total, 45);
    }
  }

  #[tokio::test]
  async fn test_repeat_with_same_filter_is_noop() {
    let api = MockApi::new().with_rows("skills", 45);
    let (pool, cache) = pool(&api);
    let filter = ListFilter::default();

    let keys = pool.ensure_prefetch(&filter, 3, 10);
    pool.ensure_prefetch(&filter, 3, 10);
    settle(&cache, &keys).await;
    pool.ensure_prefetch(&filter, 3, 10);

    assert_eq!(api.page_calls(), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_filter_change_starts_new_window_and_orphans_old() {
    let api = MockApi::new().with_rows("skills", 45);
    let (pool, cache) = pool(&api);

    let old = pool.ensure_prefetch(&ListFilter::default(), 3, 10);
    settle(&cache, &old).await;
    let new = pool.ensure_prefetch(&ListFilter::new("skills 1"), 3, 10);
    settle(&cache, &new).await;

    assert_eq!(api.page_calls(), vec![1, 2, 3, 1, 2, 3]);
    assert_eq!(cache.len(), 6);
    assert!(old.iter().all(|key| cache.get(key).is_some()));
  }

  #[tokio::test]
  async fn test_one_failing_page_does_not_affect_others() {
    let api = MockApi::new().with_rows("skills", 45);
    api.fail_page(
      2,
      ApiError::Http {
        status: 500,
        message: "boom".to_string(),
      },
    );
    let (pool, cache) = pool(&api);

    let keys = pool.ensure_prefetch(&ListFilter::default(), 3, 10);
    settle(&cache, &keys).await;

    let states: Vec<EntryState> = keys.iter().map(|k| cache.get(k).unwrap().state).collect();
    assert_eq!(
      states,
      vec![EntryState::Success, EntryState::Error, EntryState::Success]
    );
  }

  #[tokio::test]
  async fn test_stale_pages_are_refetched() {
    let api = MockApi::new().with_rows("skills", 45);
    let cache = PageCache::new(Duration::zero());
    let pool = PrefetchPool::new(
      cache.clone(),
      PageFetcher::new(Arc::new(api.clone()), "skills"),
    );
    let filter = ListFilter::default();

    let keys = pool.ensure_prefetch(&filter, 2, 10);
    settle(&cache, &keys).await;
    pool.ensure_prefetch(&filter, 2, 10);
    settle(&cache, &keys).await;

    assert_eq!(api.page_calls(), vec![1, 2, 1, 2]);
  }
}
