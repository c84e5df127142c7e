//! Resolves a requested page from the prefetch window or an on-demand fetch.

use serde::Deserialize;

use crate::api::ApiError;

use super::entry::{CacheEntry, EntryState};
use super::fetcher::PageFetcher;
use super::key::{CacheKey, ListFilter};
use super::page::PageCache;
use super::prefetch::PrefetchPool;
use super::traits::ResourceApi;

/// How the merged view derives its loading flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingPolicy {
  /// Loading until every contributing slot settled, even when the requested
  /// page is already there. Keeps the view's state machine to one flag.
  #[default]
  AllSlots,
  /// Loading only while the requested page itself is pending.
  RequestedPage,
}

impl LoadingPolicy {
  /// `requested` is the state of the page being shown, `contributing` every
  /// slot of the window plus the on-demand slot when active. A missing slot
  /// counts as loading.
  pub fn is_loading(self, requested: Option<EntryState>, contributing: &[Option<EntryState>]) -> bool {
    let pending = |state: &Option<EntryState>| !matches!(state, Some(EntryState::Success | EntryState::Error));
    match self {
      LoadingPolicy::AllSlots => contributing.iter().any(pending),
      LoadingPolicy::RequestedPage => pending(&requested),
    }
  }
}

/// What a list view renders for one requested page.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
  /// Rows of the requested page, once it loaded successfully
  pub data: Option<Vec<T>>,
  /// Total reported alongside `data`
  pub total: Option<u64>,
  pub is_loading: bool,
  pub is_error: bool,
  /// First error among the contributing slots
  pub error: Option<ApiError>,
}

impl<T> Resolved<T> {
  pub fn rows(&self) -> &[T] {
    self.data.as_deref().unwrap_or(&[])
  }
}

/// Slots a resolution reads from.
struct Sources {
  window: Vec<CacheKey>,
  on_demand: Option<CacheKey>,
  requested: CacheKey,
}

impl Sources {
  fn all(&self) -> impl Iterator<Item = &CacheKey> {
    self.window.iter().chain(self.on_demand.iter())
  }
}

pub struct ResultMerger<A, T> {
  cache: PageCache<T>,
  pool: PrefetchPool<A, T>,
  fetcher: PageFetcher<A>,
  policy: LoadingPolicy,
}

impl<A, T> ResultMerger<A, T>
where
  A: ResourceApi<T>,
  T: Clone + Send + Sync + 'static,
{
  pub fn new(cache: PageCache<T>, fetcher: PageFetcher<A>, policy: LoadingPolicy) -> Self {
    let pool = PrefetchPool::new(cache.clone(), fetcher.clone());
    Self {
      cache,
      pool,
      fetcher,
      policy,
    }
  }

  pub fn policy(&self) -> LoadingPolicy {
    self.policy
  }

  /// Current view of `requested_page`, starting whatever fetches it needs.
  ///
  /// Pages inside the window come from the prefetch pool. Pages past it get
  /// an on-demand fetch, which is never issued for a page the window covers.
  /// Never waits on the network.
  pub fn resolve(
    &self,
    filter: &ListFilter,
    requested_page: u32,
    page_size: u32,
    window: u32,
  ) -> Resolved<T> {
    let sources = self.ensure(filter, requested_page, page_size, window);
    self.snapshot(&sources)
  }

  /// Like [`resolve`](Self::resolve), but waits for every contributing fetch
  /// to finish first.
  pub async fn resolve_settled(
    &self,
    filter: &ListFilter,
    requested_page: u32,
    page_size: u32,
    window: u32,
  ) -> Resolved<T> {
    let sources = self.ensure(filter, requested_page, page_size, window);
    let fetches: Vec<_> = sources
      .all()
      .filter_map(|key| self.cache.inflight(key))
      .collect();
    futures::future::join_all(fetches).await;
    self.snapshot(&sources)
  }

  fn ensure(&self, filter: &ListFilter, requested_page: u32, page_size: u32, window: u32) -> Sources {
    let requested_page = requested_page.max(1);
    let window_keys = self.pool.ensure_prefetch(filter, window, page_size);

    if requested_page <= window {
      let requested = window_keys[(requested_page - 1) as usize].clone();
      return Sources {
        window: window_keys,
        on_demand: None,
        requested,
      };
    }

    let key = CacheKey::new(self.fetcher.resource(), filter, requested_page, page_size);
    self.fetcher.ensure(&self.cache, &key, filter);
    Sources {
      window: window_keys,
      on_demand: Some(key.clone()),
      requested: key,
    }
  }

  fn snapshot(&self, sources: &Sources) -> Resolved<T> {
    let entries: Vec<Option<CacheEntry<T>>> = sources.all().map(|key| self.cache.get(key)).collect();
    let states: Vec<Option<EntryState>> = entries.iter().map(|e| e.as_ref().map(|e| e.state)).collect();

    let requested = self.cache.get(&sources.requested);
    let requested_state = requested.as_ref().map(|e| e.state);
    let (data, total) = match requested {
      Some(entry) if entry.state == EntryState::Success => (Some(entry.items), Some(entry.total)),
      _ => (None, None),
    };

    let error = entries
      .into_iter()
      .flatten()
      .find(|e| e.state == EntryState::Error)
      .and_then(|e| e.error);

    Resolved {
      data,
      total,
      is_loading: self.policy.is_loading(requested_state, &states),
      is_error: states.contains(&Some(EntryState::Error)),
      error,
    }
  }
}
