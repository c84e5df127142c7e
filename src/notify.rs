//! User-facing notifications derived from mutation results.
//!
//! The data layer never notifies anyone itself; it returns tagged results
//! and the presentation layer turns them into notifications here.

use color_eyre::eyre::Report;
use std::fmt;

use crate::cache::{MutationAction, MutationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  Success,
  Error,
  Info,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Severity::Success => "success",
      Severity::Error => "error",
      Severity::Info => "info",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub message: String,
  pub severity: Severity,
}

impl Notification {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Success,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Error,
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      severity: Severity::Info,
    }
  }

  /// Notification for the outcome of a mutation.
  pub fn for_mutation<T>(
    action: MutationAction,
    resource: &str,
    result: &Result<T, MutationError>,
  ) -> Self {
    match result {
      Ok(_) => Self::success(format!("{} {}", resource, action.past_tense())),
      Err(e) => Self::error(e.message.clone()),
    }
  }
}

/// Split a mutation result into its value and success notification, or an
/// error report headed by the user-facing message with the API error as its
/// cause.
pub fn mutation_outcome<T>(
  action: MutationAction,
  resource: &str,
  result: Result<T, MutationError>,
) -> color_eyre::Result<(T, Notification)> {
  let notification = Notification::for_mutation(action, resource, &result);
  match result {
    Ok(value) => Ok((value, notification)),
    Err(err) => Err(Report::new(err.source).wrap_err(notification.message)),
  }
}

impl fmt::Display for Notification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}] {}", self.severity, self.message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;

  #[test]
  fn test_success_notification() {
    let n = Notification::for_mutation(MutationAction::Delete, "skills", &Ok::<_, MutationError>(()));
    assert_eq!(n, Notification::success("skills deleted"));
    assert_eq!(n.to_string(), "[success] skills deleted");
  }

  #[test]
  fn test_failure_notification_uses_user_message() {
    let err = MutationError::new(
      MutationAction::Create,
      "roles",
      ApiError::Http {
        status: 401,
        message: "token expired".to_string(),
      },
    );
    let n = Notification::for_mutation::<()>(MutationAction::Create, "roles", &Err(err));
    assert_eq!(n.severity, Severity::Error);
    assert_eq!(n.message, "unauthorized, please log in");
  }

  #[test]
  fn test_mutation_outcome() {
    let (value, n) = mutation_outcome(MutationAction::Update, "levels", Ok::<_, MutationError>(3)).unwrap();
    assert_eq!(value, 3);
    assert_eq!(n.message, "levels updated");

    let err = MutationError::new(
      MutationAction::Update,
      "levels",
      ApiError::Http {
        status: 409,
        message: "conflict".to_string(),
      },
    );
    let report = mutation_outcome::<()>(MutationAction::Update, "levels", Err(err)).unwrap_err();
    assert_eq!(report.to_string(), "failed to update levels");
    let causes: Vec<String> = report.chain().map(|e| e.to_string()).collect();
    assert_eq!(causes, vec!["failed to update levels", "HTTP 409: conflict"]);
  }
}
