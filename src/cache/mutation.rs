//! Create/update/delete followed by cache invalidation.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{require_id, ApiError};

use super::item::SingleItemCache;
use super::page::PageCache;
use super::traits::{Cacheable, ResourceApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
  Create,
  Update,
  Delete,
}

impl MutationAction {
  pub fn verb(self) -> &'static str {
    match self {
      MutationAction::Create => "create",
      MutationAction::Update => "update",
      MutationAction::Delete => "delete",
    }
  }

  pub fn past_tense(self) -> &'static str {
    match self {
      MutationAction::Create => "created",
      MutationAction::Update => "updated",
      MutationAction::Delete => "deleted",
    }
  }
}

impl fmt::Display for MutationAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.verb())
  }
}

/// Why a mutation failed, as far as the user is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// 401
  Unauthorized,
  /// 403
  Forbidden,
  /// Rejected before any request (missing id)
  Invalid,
  Other,
}

impl FailureKind {
  fn classify(error: &ApiError) -> Self {
    match error {
      ApiError::Validation(_) => FailureKind::Invalid,
      ApiError::Http { status: 401, .. } => FailureKind::Unauthorized,
      ApiError::Http { status: 403, .. } => FailureKind::Forbidden,
      _ => FailureKind::Other,
    }
  }
}

/// A failed mutation, carrying a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MutationError {
  pub action: MutationAction,
  pub resource: String,
  pub kind: FailureKind,
  pub message: String,
  #[source]
  pub source: ApiError,
}

impl MutationError {
  pub fn new(action: MutationAction, resource: &str, source: ApiError) -> Self {
    let kind = FailureKind::classify(&source);
    let message = match kind {
      FailureKind::Unauthorized => "unauthorized, please log in".to_string(),
      FailureKind::Forbidden => "forbidden".to_string(),
      FailureKind::Invalid => source.to_string(),
      FailureKind::Other => format!("failed to {} {}", action, resource),
    };
    Self {
      action,
      resource: resource.to_string(),
      kind,
      message,
      source,
    }
  }
}

/// Runs mutations for one resource and invalidates what they touch.
///
/// Invalidation is resource-wide: every cached page of the resource, for
/// every filter, is dropped after a successful write. A failed write leaves
/// the cache untouched.
pub struct MutationCoordinator<A, T> {
  resource: String,
  api: Arc<A>,
  pages: PageCache<T>,
  items: SingleItemCache<A, T>,
}

impl<A, T> MutationCoordinator<A, T>
where
  A: ResourceApi<T>,
  T: Cacheable,
{
  pub fn new(
    api: Arc<A>,
    resource: impl Into<String>,
    pages: PageCache<T>,
    items: SingleItemCache<A, T>,
  ) -> Self {
    Self {
      resource: resource.into(),
      api,
      pages,
      items,
    }
  }

  pub async fn create(&self, dto: Value) -> Result<T, MutationError> {
    let created = self
      .api
      .create(&self.resource, dto)
      .await
      .map_err(|e| self.fail(MutationAction::Create, e))?;
    self.invalidate(created.cache_key().as_deref());
    Ok(created)
  }

  pub async fn update(&self, id: &str, dto: Value) -> Result<T, MutationError> {
    let id = require_id(&self.resource, Some(id)).map_err(|e| self.fail(MutationAction::Update, e))?;
    let updated = self
      .api
      .update(&self.resource, id, dto)
      .await
      .map_err(|e| self.fail(MutationAction::Update, e))?;
    self.invalidate(Some(id));
    Ok(updated)
  }

  pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
    let id = require_id(&self.resource, Some(id)).map_err(|e| self.fail(MutationAction::Delete, e))?;
    self
      .api
      .delete(&self.resource, id)
      .await
      .map_err(|e| self.fail(MutationAction::Delete, e))?;
    self.invalidate(Some(id));
    Ok(())
  }

  fn invalidate(&self, id: Option<&str>) {
    let pages = self.pages.invalidate_by_resource(&self.resource);
    if let Some(id) = id {
      self.items.invalidate(id);
    }
    debug!(resource = %self.resource, pages, id, "invalidated after write");
  }

  fn fail(&self, action: MutationAction, error: ApiError) -> MutationError {
    warn!(resource = %self.resource, %action, error = %error, "mutation failed");
    MutationError::new(action, &self.resource, error)
  }
}
