//! One cache per resource, bundling prefetch, merge, item lookups and
//! mutations behind a single handle.

use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;

use crate::api::ApiResult;

use super::fetcher::PageFetcher;
use super::item::SingleItemCache;
use super::key::{CacheKey, ListFilter};
use super::merge::{LoadingPolicy, Resolved, ResultMerger};
use super::mutation::{MutationCoordinator, MutationError};
use super::page::PageCache;
use super::prefetch::{PrefetchPool, DEFAULT_PREFETCH_PAGES};
use super::traits::{Cacheable, ResourceApi};

/// Tunables shared by every list view of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
  /// How long before cached data is considered stale
  pub stale_time: Duration,
  /// Pages fetched up front when a filter becomes active
  pub prefetch_pages: u32,
  pub loading_policy: LoadingPolicy,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      stale_time: Duration::minutes(5),
      prefetch_pages: DEFAULT_PREFETCH_PAGES,
      loading_policy: LoadingPolicy::default(),
    }
  }
}

/// Paginated cache for a single resource.
///
/// Every list view, detail view and mutation of the resource should go
/// through the same instance so a write invalidates what all of them see.
pub struct PagedResourceCache<A, T> {
  resource: String,
  settings: CacheSettings,
  pages: PageCache<T>,
  fetcher: PageFetcher<A>,
  pool: PrefetchPool<A, T>,
  merger: ResultMerger<A, T>,
  items: SingleItemCache<A, T>,
  mutations: MutationCoordinator<A, T>,
}

impl<A, T> PagedResourceCache<A, T>
where
  A: ResourceApi<T>,
  T: Cacheable,
{
  pub fn new(api: Arc<A>, resource: impl Into<String>, settings: CacheSettings) -> Self {
    let resource = resource.into();
    let pages = PageCache::new(settings.stale_time);
    let fetcher = PageFetcher::new(api.clone(), resource.clone());
    let pool = PrefetchPool::new(pages.clone(), fetcher.clone());
    let merger = ResultMerger::new(pages.clone(), fetcher.clone(), settings.loading_policy);
    let items = SingleItemCache::new(api.clone(), resource.clone(), settings.stale_time);
    let mutations = MutationCoordinator::new(api, resource.clone(), pages.clone(), items.clone());

    Self {
      resource,
      settings,
      pages,
      fetcher,
      pool,
      merger,
      items,
      mutations,
    }
  }

  pub fn resource(&self) -> &str {
    &self.resource
  }

  pub fn settings(&self) -> CacheSettings {
    self.settings
  }

  pub fn pages(&self) -> &PageCache<T> {
    &self.pages
  }

  /// Start fetching the first `window` pages of `filter`.
  pub fn prefetch(&self, filter: &ListFilter, page_size: u32, window: u32) -> Vec<CacheKey> {
    self.pool.ensure_prefetch(filter, window, page_size)
  }

  /// Non-blocking view of one page.
  pub fn resolve(&self, filter: &ListFilter, page: u32, page_size: u32, window: u32) -> Resolved<T> {
    self.merger.resolve(filter, page, page_size, window)
  }

  /// View of one page once every contributing fetch has finished.
  pub async fn read(&self, filter: &ListFilter, page: u32, page_size: u32, window: u32) -> Resolved<T> {
    self.merger.resolve_settled(filter, page, page_size, window).await
  }

  /// Drop one page so the next read fetches it again.
  pub fn refetch_page(&self, filter: &ListFilter, page: u32, page_size: u32) -> bool {
    let key = CacheKey::new(self.fetcher.resource(), filter, page.max(1), page_size);
    self.pages.invalidate_key(&key)
  }

  /// Drop every cached page and item of the resource.
  pub fn invalidate(&self) -> usize {
    self.pages.invalidate_by_resource(&self.resource) + self.items.invalidate_all()
  }

  pub async fn get_item(&self, id: Option<&str>) -> ApiResult<Option<T>> {
    self.items.get_item(id).await
  }

  pub async fn fetch_item(&self, id: Option<&str>) -> ApiResult<T> {
    self.items.fetch_item(id).await
  }

  pub async fn create(&self, dto: Value) -> Result<T, MutationError> {
    self.mutations.create(dto).await
  }

  pub async fn update(&self, id: &str, dto: Value) -> Result<T, MutationError> {
    self.mutations.update(id, dto).await
  }

  pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
    self.mutations.delete(id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::Record;
  use crate::test_support::MockApi;

  fn cache(api: &MockApi) -> PagedResourceCache<MockApi, Record> {
    PagedResourceCache::new(Arc::new(api.clone()), "skills", CacheSettings::default())
  }

  #[tokio::test]
  async fn test_single_flight_across_views() {
    let (api, gate) = MockApi::gated();
    let api = api.with_rows("skills", 30);
    let cache = cache(&api);
    let filter = ListFilter::default();

    // Two views asking for the same page before anything answered
    cache.resolve(&filter, 1, 10, 3);
    cache.resolve(&filter, 1, 10, 3);
    gate.add_permits(3);
    let (a, b) = tokio::join!(cache.read(&filter, 1, 10, 3), cache.read(&filter, 1, 10, 3));

    assert_eq!(api.page_calls(), vec![1, 2, 3]);
    assert_eq!(a.data, b.data);
  }

  #[tokio::test]
  async fn test_refetch_page_only_touches_that_page() {
    let api = MockApi::new().with_rows("skills", 30);
    let cache = cache(&api);
    let filter = ListFilter::default();

    cache.read(&filter, 2, 10, 3).await;
    assert!(cache.refetch_page(&filter, 2, 10));
    cache.read(&filter, 2, 10, 3).await;

    assert_eq!(api.page_calls(), vec![1, 2, 3, 2]);
  }

  #[tokio::test]
  async fn test_create_then_read_sees_new_total() {
    let api = MockApi::new().with_rows("skills", 30);
    let cache = cache(&api);
    let filter = ListFilter::default();

    assert_eq!(cache.read(&filter, 1, 10, 3).await.total, Some(30));
    let created = cache
      .create(serde_json::json!({ "name": "skills 31" }))
      .await
      .unwrap();
    assert_eq!(created.id(), Some("31".to_string()));
    assert_eq!(cache.read(&filter, 1, 10, 3).await.total, Some(31));
  }

  #[tokio::test]
  async fn test_invalidate_drops_pages_and_items() {
    let api = MockApi::new().with_rows("skills", 30);
    let cache = cache(&api);

    cache.read(&ListFilter::default(), 1, 10, 3).await;
    cache.get_item(Some("1")).await.unwrap();
    assert_eq!(cache.invalidate(), 4);
    assert!(cache.pages().is_empty());
  }
}
