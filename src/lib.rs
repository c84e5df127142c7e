//! Paginated resource cache for an admin REST backend, and the console
//! built on it.
//!
//! The cache layer ([`cache`]) prefetches the first pages of every active
//! filter, shares in-flight fetches between callers, serves stale data while
//! revalidating, and invalidates a whole resource after a write.

pub mod api;
pub mod browse;
pub mod cache;
pub mod config;
pub mod list;
pub mod notify;
pub mod resources;
pub mod table;

#[cfg(test)]
mod test_support;
