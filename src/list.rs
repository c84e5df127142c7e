//! List view controller on top of [`PagedResourceCache`].
//!
//! A `ListQuery` owns the options of one list view (search, page, page size,
//! prefetch window) and turns cache state into a snapshot the view renders.
//!
//! ```ignore
//! let mut query = ListQuery::new(cache.clone(), ListOptions::default());
//!
//! // In the event loop tick, never blocks
//! let view = query.poll();
//! if view.is_loading { render_spinner() } else { render_rows(view.rows()) }
//!
//! // User typed in the search box
//! query.set_search("rust");
//! ```

use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{
  Cacheable, ListFilter, PagedResourceCache, Resolved, ResourceApi, DEFAULT_PREFETCH_PAGES,
};

pub const DEFAULT_PER_PAGE: u32 = 10;

/// Options a list view is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
  pub search: String,
  /// One-based
  pub page: u32,
  pub per_page: u32,
  pub initial_prefetch_pages: u32,
}

impl Default for ListOptions {
  fn default() -> Self {
    Self {
      search: String::new(),
      page: 1,
      per_page: DEFAULT_PER_PAGE,
      initial_prefetch_pages: DEFAULT_PREFETCH_PAGES,
    }
  }
}

impl ListOptions {
  fn normalized(mut self) -> Self {
    self.page = self.page.max(1);
    self.per_page = self.per_page.max(1);
    self
  }
}

pub struct ListQuery<A, T> {
  cache: Arc<PagedResourceCache<A, T>>,
  options: ListOptions,
  last: Option<Resolved<T>>,
}

impl<A, T> ListQuery<A, T>
where
  A: ResourceApi<T>,
  T: Cacheable,
{
  pub fn new(cache: Arc<PagedResourceCache<A, T>>, options: ListOptions) -> Self {
    Self {
      cache,
      options: options.normalized(),
      last: None,
    }
  }

  pub fn options(&self) -> &ListOptions {
    &self.options
  }

  pub fn filter(&self) -> ListFilter {
    ListFilter::new(self.options.search.clone())
  }

  pub fn cache(&self) -> &PagedResourceCache<A, T> {
    &self.cache
  }

  /// Last snapshot produced by [`poll`](Self::poll) or
  /// [`settle`](Self::settle).
  pub fn state(&self) -> Option<&Resolved<T>> {
    self.last.as_ref()
  }

  /// Change the search text. A different filter starts over at page 1.
  pub fn set_search(&mut self, search: impl Into<String>) -> bool {
    let search = search.into();
    if search == self.options.search {
      return false;
    }
    debug!(resource = self.cache.resource(), search = %search, "filter changed");
    self.options.search = search;
    self.reset_page();
    true
  }

  pub fn set_page(&mut self, page: u32) {
    self.options.page = page.max(1);
  }

  /// Change the page size; page boundaries move, so back to page 1.
  pub fn set_per_page(&mut self, per_page: u32) {
    let per_page = per_page.max(1);
    if per_page != self.options.per_page {
      self.options.per_page = per_page;
      self.reset_page();
    }
  }

  /// Advance one page, unless the last known total says there is none.
  pub fn next_page(&mut self) -> bool {
    if matches!(self.page_count(), Some(count) if self.options.page >= count) {
      return false;
    }
    match self.options.page.checked_add(1) {
      Some(next) => {
        self.options.page = next;
        true
      }
      None => false,
    }
  }

  pub fn prev_page(&mut self) -> bool {
    if self.options.page <= 1 {
      return false;
    }
    self.options.page -= 1;
    true
  }

  /// Number of pages according to the last total seen, at least 1.
  pub fn page_count(&self) -> Option<u32> {
    let total = self.last.as_ref()?.total?;
    let per_page = u64::from(self.options.per_page);
    let pages = total.div_ceil(per_page).max(1);
    Some(u32::try_from(pages).unwrap_or(u32::MAX))
  }

  /// Current snapshot, starting any fetch it needs. Never waits.
  pub fn poll(&mut self) -> &Resolved<T> {
    let o = &self.options;
    let resolved = self
      .cache
      .resolve(&self.filter(), o.page, o.per_page, o.initial_prefetch_pages);
    self.last.insert(resolved)
  }

  /// Snapshot once every fetch it depends on has finished.
  pub async fn settle(&mut self) -> &Resolved<T> {
    let filter = self.filter();
    let o = &self.options;
    let resolved = self
      .cache
      .read(&filter, o.page, o.per_page, o.initial_prefetch_pages)
      .await;
    self.last.insert(resolved)
  }

  /// Drop the current page from the cache and fetch it again.
  pub async fn refetch(&mut self) -> &Resolved<T> {
    let o = &self.options;
    self.cache.refetch_page(&self.filter(), o.page, o.per_page);
    self.settle().await
  }

  fn reset_page(&mut self) {
    self.options.page = 1;
    self.last = None;
  }
}
