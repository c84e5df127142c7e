//! Page fetcher: one network call for one page of one resource/filter.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::warn;

use crate::api::{ApiResult, Page};

use super::key::{CacheKey, ListFilter};
use super::page::PageCache;
use super::traits::ResourceApi;

/// Issues page fetches for a single resource.
pub struct PageFetcher<A> {
  api: Arc<A>,
  resource: String,
}

impl<A> PageFetcher<A> {
  pub fn new(api: Arc<A>, resource: impl Into<String>) -> Self {
    Self {
      api,
      resource: resource.into(),
    }
  }

  pub fn resource(&self) -> &str {
    &self.resource
  }

  /// Fetch the page at zero-based `page_index`.
  ///
  /// No retries; errors come back exactly as the API produced them. A page
  /// longer than `page_size` is cut down to size.
  pub fn fetch_page<T>(
    &self,
    filter: &ListFilter,
    page_index: u32,
    page_size: u32,
  ) -> BoxFuture<'static, ApiResult<Page<T>>>
  where
    A: ResourceApi<T>,
    T: Send + 'static,
  {
    let resource = self.resource.clone();
    self
      .api
      .fetch_page(&self.resource, filter, page_index, page_size)
      .map(move |result| {
        result.map(|mut page| {
          let limit = page_size as usize;
          if page.data.len() > limit {
            warn!(
              resource = %resource,
              page = page_index + 1,
              received = page.data.len(),
              page_size,
              "server returned more rows than requested, truncating"
            );
            page.data.truncate(limit);
          }
          page
        })
      })
      .boxed()
  }

  /// Issue the fetch backing `key` unless its slot is fresh or already
  /// being fetched. Returns whether a request went out.
  pub fn ensure<T>(&self, cache: &PageCache<T>, key: &CacheKey, filter: &ListFilter) -> bool
  where
    A: ResourceApi<T>,
    T: Clone + Send + Sync + 'static,
  {
    cache
      .store()
      .load_if_needed(key, || self.fetch_page(filter, key.page - 1, key.page_size))
      .is_some()
  }
}

impl<A> Clone for PageFetcher<A> {
  fn clone(&self) -> Self {
    Self {
      api: Arc::clone(&self.api),
      resource: self.resource.clone(),
    }
  }
}
