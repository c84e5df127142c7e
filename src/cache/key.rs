//! Cache keys for pages and single items.

use sha2::{Digest, Sha256};
use std::fmt;

/// Search/filter parameters of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListFilter {
  pub search: String,
}

impl ListFilter {
  pub fn new(search: impl Into<String>) -> Self {
    Self {
      search: search.into(),
    }
  }

  pub fn signature(&self) -> FilterSignature {
    FilterSignature::of(self)
  }

  /// Human readable form for logs.
  pub fn description(&self) -> String {
    if self.search.is_empty() {
      "no filter".to_string()
    } else {
      format!("search '{}'", self.search)
    }
  }
}

/// Stable, fixed-length identity of a [`ListFilter`].
///
/// The search text is hashed exactly as given: no trimming or case folding,
/// since the server may treat those differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterSignature(String);

impl FilterSignature {
  pub fn of(filter: &ListFilter) -> Self {
    let canonical = format!("search={}", filter.search);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Self(hex::encode(hasher.finalize()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for FilterSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Short prefix is plenty for logs
    f.write_str(&self.0[..self.0.len().min(12)])
  }
}

/// Keys that belong to a named resource, so invalidation can match on it.
pub trait ResourceKey:
  Clone + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
  fn resource(&self) -> &str;
}

/// Identity of one cached page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  pub resource: String,
  pub filter: FilterSignature,
  /// One-based page number
  pub page: u32,
  pub page_size: u32,
}

impl CacheKey {
  pub fn new(resource: impl Into<String>, filter: &ListFilter, page: u32, page_size: u32) -> Self {
    debug_assert!(page >= 1, "page numbers are one-based");
    debug_assert!(page_size > 0, "page size must be positive");
    Self {
      resource: resource.into(),
      filter: filter.signature(),
      page,
      page_size,
    }
  }
}

impl ResourceKey for CacheKey {
  fn resource(&self) -> &str {
    &self.resource
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}[{}] page {} x{}",
      self.resource, self.filter, self.page, self.page_size
    )
  }
}

/// Identity of one cached entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
  pub resource: String,
  pub id: String,
}

impl ItemKey {
  pub fn new(resource: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      resource: resource.into(),
      id: id.into(),
    }
  }
}

impl ResourceKey for ItemKey {
  fn resource(&self) -> &str {
    &self.resource
  }
}

impl fmt::Display for ItemKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.resource, self.id)
  }
}
