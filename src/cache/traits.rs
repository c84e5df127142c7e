//! Core traits for the caching system.

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::api::{ApiResult, Page};

use super::key::ListFilter;

/// Trait for entities that can be cached.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier of this entity within its resource, if it has one.
  fn cache_key(&self) -> Option<String>;
}

/// The backend operations the cache is built on.
///
/// Futures are `'static` so the cache can spawn them and let them run to
/// completion independently of whoever asked first.
pub trait ResourceApi<T>: Send + Sync + 'static {
  /// Fetch one page. `page_index` is zero-based; implementations convert it
  /// to whatever the endpoint expects.
  fn fetch_page(
    &self,
    resource: &str,
    filter: &ListFilter,
    page_index: u32,
    page_size: u32,
  ) -> BoxFuture<'static, ApiResult<Page<T>>>;

  /// Fetch a single entity by id.
  fn fetch_one(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<T>>;

  fn create(&self, resource: &str, dto: Value) -> BoxFuture<'static, ApiResult<T>>;

  fn update(&self, resource: &str, id: &str, dto: Value) -> BoxFuture<'static, ApiResult<T>>;

  fn delete(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<()>>;
}
