//! Talking to the admin REST backend.

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::{require_id, ApiError, ApiResult};
pub use types::{Page, Record};
