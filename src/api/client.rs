//! HTTP client for the admin REST backend.

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::cache::{Cacheable, ListFilter, ResourceApi};

use super::error::{ApiError, ApiResult};
use super::types::Page;

/// reqwest-backed implementation of [`ResourceApi`].
///
/// Endpoints follow the `/{resource}` and `/{resource}/{id}` layout.
#[derive(Clone)]
pub struct ApiClient {
  client: reqwest::Client,
  base: Url,
  headers: HeaderMap,
}

impl ApiClient {
  /// Create a client for `base_url`, sending `token` as a bearer token when
  /// given.
  pub fn new(base_url: &str, token: Option<&str>) -> ApiResult<Self> {
    let base = Url::parse(base_url)
      .map_err(|e| ApiError::Validation(format!("invalid api url {}: {}", base_url, e)))?;
    if base.cannot_be_a_base() {
      return Err(ApiError::Validation(format!("invalid api url {}", base_url)));
    }

    let mut headers = HeaderMap::new();
    if let Some(token) = token {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::Validation(format!("invalid api token: {}", e)))?;
      headers.insert(AUTHORIZATION, value);
    }

    let client = reqwest::Client::builder().build()?;
    Ok(Self {
      client,
      base,
      headers,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: reqwest::Method, segments: &[&str]) -> RequestBuilder {
    let url = self.endpoint(segments);
    debug!(%method, %url, "request");
    self.client.request(method, url).headers(self.headers.clone())
  }
}

/// Fail with [`ApiError::Http`] unless the status is a success.
async fn check(response: Response) -> ApiResult<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(ApiError::Http {
    status: status.as_u16(),
    message: error_message(&body, status.canonical_reason()),
  })
}

/// Prefer the backend's `{ "message": ... }` body, then the raw body.
fn error_message(body: &str, reason: Option<&str>) -> String {
  let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
    v.get("message")
      .and_then(Value::as_str)
      .map(str::to_string)
  });
  match from_json {
    Some(message) => message,
    None if !body.trim().is_empty() => body.trim().to_string(),
    None => reason.unwrap_or("request failed").to_string(),
  }
}

async fn send_json<R: DeserializeOwned>(request: RequestBuilder) -> ApiResult<R> {
  let response = check(request.send().await?).await?;
  response
    .json::<R>()
    .await
    .map_err(|e| ApiError::Decode(e.to_string()))
}

impl<T: Cacheable> ResourceApi<T> for ApiClient {
  fn fetch_page(
    &self,
    resource: &str,
    filter: &ListFilter,
    page_index: u32,
    page_size: u32,
  ) -> BoxFuture<'static, ApiResult<Page<T>>> {
    let request = self.request(reqwest::Method::GET, &[resource]).query(&[
      ("search", filter.search.clone()),
      // The endpoint counts pages from 1
      ("page", (page_index + 1).to_string()),
      ("perPage", page_size.to_string()),
    ]);
    send_json(request).boxed()
  }

  fn fetch_one(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<T>> {
    if id.trim().is_empty() {
      return future::ready(Err(ApiError::missing_id(resource))).boxed();
    }
    send_json(self.request(reqwest::Method::GET, &[resource, id])).boxed()
  }

  fn create(&self, resource: &str, dto: Value) -> BoxFuture<'static, ApiResult<T>> {
    send_json(self.request(reqwest::Method::POST, &[resource]).json(&dto)).boxed()
  }

  fn update(&self, resource: &str, id: &str, dto: Value) -> BoxFuture<'static, ApiResult<T>> {
    send_json(self.request(reqwest::Method::PUT, &[resource, id]).json(&dto)).boxed()
  }

  fn delete(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<()>> {
    let request = self.request(reqwest::Method::DELETE, &[resource, id]);
    async move {
      // 200 with a body and 204 are both fine
      check(request.send().await?).await?;
      Ok(())
    }
    .boxed()
  }
}
