//! Paginated resource cache.
//!
//! This module provides the caching layer behind every list view:
//! - Pages are keyed by (resource, filter signature, page, page size)
//! - The first pages of an active filter are prefetched concurrently
//! - Identical concurrent requests share one fetch
//! - Stale entries are served while a refresh runs in the background
//! - Any successful write drops every cached page of its resource

mod entry;
mod fetcher;
mod item;
mod key;
mod layer;
mod merge;
mod mutation;
mod page;
mod prefetch;
mod store;
mod traits;

pub use entry::{CacheEntry, Entry, EntryState};
pub use fetcher::PageFetcher;
pub use item::SingleItemCache;
pub use key::{CacheKey, FilterSignature, ItemKey, ListFilter, ResourceKey};
pub use layer::{CacheSettings, PagedResourceCache};
pub use merge::{LoadingPolicy, Resolved, ResultMerger};
pub use mutation::{FailureKind, MutationAction, MutationCoordinator, MutationError};
pub use page::PageCache;
pub use prefetch::{PrefetchPool, DEFAULT_PREFETCH_PAGES};
pub use store::{Freshness, SharedFetch, Store};
pub use traits::{Cacheable, ResourceApi};
