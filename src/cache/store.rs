//! In-memory slot store with single-flight fetches.
//!
//! Every key owns at most one slot. A slot holds the last settled entry and,
//! while a fetch runs, the shared future of that fetch so concurrent callers
//! join it instead of issuing their own request.
//!
//! Each issued fetch carries a ticket. The fetch only writes its result back
//! if the slot still carries the same ticket when it completes; invalidation
//! and `set` replace the slot, so results of superseded fetches are dropped
//! instead of landing as fresh data.

use chrono::Duration;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use crate::api::ApiResult;

use super::entry::Entry;
use super::key::ResourceKey;

/// A fetch that any number of callers can await.
pub type SharedFetch<V> = Shared<BoxFuture<'static, ApiResult<V>>>;

/// How a key's slot relates to the stale time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// No slot for this key
  Missing,
  /// A fetch is running
  InFlight,
  /// Settled within the stale time
  Fresh,
  /// Settled, but older than the stale time
  Stale,
}

impl Freshness {
  pub fn needs_fetch(self) -> bool {
    matches!(self, Freshness::Missing | Freshness::Stale)
  }
}

struct Slot<V> {
  entry: Entry<V>,
  ticket: u64,
  inflight: Option<SharedFetch<V>>,
}

/// Keyed store of fetch results shared by every consumer of a cache.
pub struct Store<K, V> {
  slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
  tickets: Arc<AtomicU64>,
  stale_time: Duration,
}

impl<K, V> Store<K, V>
where
  K: ResourceKey,
  V: Clone + Send + Sync + 'static,
{
  pub fn new(stale_time: Duration) -> Self {
    Self {
      slots: Arc::new(Mutex::new(HashMap::new())),
      tickets: Arc::new(AtomicU64::new(0)),
      stale_time,
    }
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  // The map is consistent after every critical section, so a poisoned
  // lock is safe to keep using.
  fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
    self.slots.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn next_ticket(&self) -> u64 {
    self.tickets.fetch_add(1, Ordering::Relaxed) + 1
  }

  /// Current entry for a key. Never blocks on I/O.
  pub fn get(&self, key: &K) -> Option<Entry<V>> {
    self.lock().get(key).map(|slot| slot.entry.clone())
  }

  /// Replace the slot for a key. A fetch running for the old slot will not
  /// write back.
  pub fn set(&self, key: K, entry: Entry<V>) {
    let ticket = self.next_ticket();
    self.lock().insert(
      key,
      Slot {
        entry,
        ticket,
        inflight: None,
      },
    );
  }

  /// Remove every slot of a resource, across all filters and pages.
  ///
  /// Returns how many slots were removed.
  pub fn invalidate_by_resource(&self, resource: &str) -> usize {
    let mut slots = self.lock();
    let before = slots.len();
    slots.retain(|key, _| key.resource() != resource);
    let removed = before - slots.len();
    debug!(resource, removed, "invalidated resource");
    removed
  }

  /// Remove one slot. Returns whether it existed.
  pub fn invalidate_key(&self, key: &K) -> bool {
    let removed = self.lock().remove(key).is_some();
    if removed {
      debug!(%key, "invalidated key");
    }
    removed
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  pub fn freshness(&self, key: &K) -> Freshness {
    self.freshness_of(self.lock().get(key))
  }

  fn freshness_of(&self, slot: Option<&Slot<V>>) -> Freshness {
    match slot {
      None => Freshness::Missing,
      Some(slot) if slot.inflight.is_some() => Freshness::InFlight,
      Some(slot) if slot.entry.is_stale(self.stale_time) => Freshness::Stale,
      Some(_) => Freshness::Fresh,
    }
  }

  /// The running fetch for a key, if any.
  pub fn inflight(&self, key: &K) -> Option<SharedFetch<V>> {
    self.lock().get(key).and_then(|slot| slot.inflight.clone())
  }

  /// Join the running fetch for `key`, or issue a new one.
  ///
  /// `fetch` is only called when no fetch is running. The new fetch is
  /// spawned so it completes and settles the slot even if every caller
  /// drops its handle. A previously successful entry stays visible while
  /// the new fetch runs; anything else is replaced by a pending entry.
  pub fn load<F>(&self, key: &K, fetch: F) -> SharedFetch<V>
  where
    F: FnOnce() -> BoxFuture<'static, ApiResult<V>>,
  {
    let shared = {
      let mut slots = self.lock();
      if let Some(inflight) = slots.get(key).and_then(|slot| slot.inflight.clone()) {
        trace!(%key, "joining in-flight fetch");
        return inflight;
      }
      self.issue(&mut slots, key, fetch)
    };
    tokio::spawn(shared.clone().map(|_| ()));
    shared
  }

  /// Issue a fetch for `key` only if its slot is missing or stale.
  ///
  /// The check and the issue happen under one lock, so a fetch settling
  /// concurrently cannot cause a second request for a fresh slot. Returns
  /// the fetch when one was issued.
  pub fn load_if_needed<F>(&self, key: &K, fetch: F) -> Option<SharedFetch<V>>
  where
    F: FnOnce() -> BoxFuture<'static, ApiResult<V>>,
  {
    let shared = {
      let mut slots = self.lock();
      if !self.freshness_of(slots.get(key)).needs_fetch() {
        return None;
      }
      self.issue(&mut slots, key, fetch)
    };
    tokio::spawn(shared.clone().map(|_| ()));
    Some(shared)
  }

  /// Install a new ticketed fetch in the slot. The caller spawns it once
  /// the lock is released.
  fn issue<F>(&self, slots: &mut HashMap<K, Slot<V>>, key: &K, fetch: F) -> SharedFetch<V>
  where
    F: FnOnce() -> BoxFuture<'static, ApiResult<V>>,
  {
    let ticket = self.next_ticket();
    let store = self.clone();
    let settle_key = key.clone();
    let request = fetch();
    let shared = async move {
      let result = request.await;
      store.settle(&settle_key, ticket, &result);
      result
    }
    .boxed()
    .shared();

    match slots.get_mut(key) {
      Some(slot) => {
        if !slot.entry.is_success() {
          slot.entry = Entry::pending();
        }
        slot.ticket = ticket;
        slot.inflight = Some(shared.clone());
      }
      None => {
        slots.insert(
          key.clone(),
          Slot {
            entry: Entry::pending(),
            ticket,
            inflight: Some(shared.clone()),
          },
        );
      }
    }
    debug!(%key, ticket, "fetch issued");
    shared
  }

  fn settle(&self, key: &K, ticket: u64, result: &ApiResult<V>) {
    let mut slots = self.lock();
    match slots.get_mut(key) {
      Some(slot) if slot.ticket == ticket => {
        slot.inflight = None;
        slot.entry = match result {
          Ok(value) => Entry::success(value.clone()),
          Err(e) => Entry::failed(e.clone()),
        };
        debug!(%key, ticket, ok = result.is_ok(), "fetch settled");
      }
      _ => trace!(%key, ticket, "discarding result of superseded fetch"),
    }
  }
}

impl<K, V> Clone for Store<K, V> {
  fn clone(&self) -> Self {
    Self {
      slots: Arc::clone(&self.slots),
      tickets: Arc::clone(&self.tickets),
      stale_time: self.stale_time,
    }
  }
}
