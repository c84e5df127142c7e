//! Cache entry types.

use chrono::{DateTime, Duration, Utc};

use crate::api::{ApiError, Page};

/// Lifecycle state of a cached fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
  /// Fetch issued, no result yet
  Pending,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed
  Error,
}

/// A cached value of any shape, with its fetch state.
#[derive(Debug, Clone)]
pub struct Entry<V> {
  pub value: Option<V>,
  pub state: EntryState,
  pub error: Option<ApiError>,
  pub fetched_at: DateTime<Utc>,
}

impl<V> Entry<V> {
  pub fn pending() -> Self {
    Self {
      value: None,
      state: EntryState::Pending,
      error: None,
      fetched_at: Utc::now(),
    }
  }

  pub fn success(value: V) -> Self {
    Self {
      value: Some(value),
      state: EntryState::Success,
      error: None,
      fetched_at: Utc::now(),
    }
  }

  pub fn failed(error: ApiError) -> Self {
    Self {
      value: None,
      state: EntryState::Error,
      error: Some(error),
      fetched_at: Utc::now(),
    }
  }

  pub fn is_pending(&self) -> bool {
    self.state == EntryState::Pending
  }

  pub fn is_success(&self) -> bool {
    self.state == EntryState::Success
  }

  pub fn is_error(&self) -> bool {
    self.state == EntryState::Error
  }

  /// Whether a settled entry is old enough to be refreshed on next access.
  pub fn is_stale(&self, stale_time: Duration) -> bool {
    Utc::now() - self.fetched_at >= stale_time
  }
}

/// One cached page of a resource, as exposed to consumers.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  /// Page contents in server order; empty unless `state` is `Success`
  pub items: Vec<T>,
  /// Total row count reported by the most recent successful fetch
  pub total: u64,
  pub fetched_at: DateTime<Utc>,
  pub state: EntryState,
  pub error: Option<ApiError>,
}

impl<T> CacheEntry<T> {
  pub fn pending() -> Self {
    Entry::pending().into()
  }

  pub fn success(items: Vec<T>, total: u64) -> Self {
    Entry::success(Page::new(items, total)).into()
  }

  pub fn failed(error: ApiError) -> Self {
    Entry::failed(error).into()
  }
}

impl<T> From<Entry<Page<T>>> for CacheEntry<T> {
  fn from(entry: Entry<Page<T>>) -> Self {
    let page = entry.value.unwrap_or_else(Page::empty);
    Self {
      items: page.data,
      total: page.total,
      fetched_at: entry.fetched_at,
      state: entry.state,
      error: entry.error,
    }
  }
}

impl<T> From<CacheEntry<T>> for Entry<Page<T>> {
  fn from(entry: CacheEntry<T>) -> Self {
    let value = match entry.state {
      EntryState::Success => Some(Page::new(entry.items, entry.total)),
      _ => None,
    };
    Self {
      value,
      state: entry.state,
      error: entry.error,
      fetched_at: entry.fetched_at,
    }
  }
}
