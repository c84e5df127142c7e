//! In-memory backend used by the cache tests.

use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::api::{ApiError, ApiResult, Page, Record};
use crate::cache::{ListFilter, ResourceApi};

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Page {
    resource: String,
    search: String,
    page: u32,
    per_page: u32,
  },
  One {
    resource: String,
    id: String,
  },
  Create {
    resource: String,
  },
  Update {
    resource: String,
    id: String,
  },
  Delete {
    resource: String,
    id: String,
  },
}

#[derive(Default)]
struct State {
  rows: Mutex<HashMap<String, Vec<Record>>>,
  calls: Mutex<Vec<Call>>,
  page_failures: Mutex<HashMap<u32, ApiError>>,
  mutation_failure: Mutex<Option<ApiError>>,
  next_id: AtomicU64,
}

/// Backend double that serves seeded rows and records every call.
///
/// With a gate, every read waits for a permit before answering, which lets
/// tests observe pending states and overlap requests deterministically.
#[derive(Clone, Default)]
pub struct MockApi {
  state: Arc<State>,
  gate: Option<Arc<Semaphore>>,
}

impl MockApi {
  pub fn new() -> Self {
    Self::default()
  }

  /// A mock whose reads block until permits are added to the returned gate.
  pub fn gated() -> (Self, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    let api = Self {
      state: Arc::default(),
      gate: Some(gate.clone()),
    };
    (api, gate)
  }

  /// Seed `count` rows named "<resource> <n>" with ids 1..=count.
  pub fn with_rows(self, resource: &str, count: u64) -> Self {
    let rows = (1..=count)
      .map(|n| Record::from(json!({ "id": n, "name": format!("{} {}", resource, n) })))
      .collect();
    self
      .state
      .rows
      .lock()
      .unwrap()
      .insert(resource.to_string(), rows);
    self.state.next_id.store(count + 1, Ordering::SeqCst);
    self
  }

  pub fn fail_page(&self, page: u32, error: ApiError) {
    self.state.page_failures.lock().unwrap().insert(page, error);
  }

  pub fn fail_mutations(&self, error: ApiError) {
    *self.state.mutation_failure.lock().unwrap() = Some(error);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.state.calls.lock().unwrap().clone()
  }

  /// Page numbers (one-based) requested so far, in order.
  pub fn page_calls(&self) -> Vec<u32> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Page { page, .. } => Some(page),
        _ => None,
      })
      .collect()
  }

  pub fn item_calls(&self) -> usize {
    self
      .calls()
      .iter()
      .filter(|call| matches!(call, Call::One { .. }))
      .count()
  }

  pub fn row_count(&self, resource: &str) -> usize {
    self
      .state
      .rows
      .lock()
      .unwrap()
      .get(resource)
      .map_or(0, Vec::len)
  }

  fn record(&self, call: Call) {
    self.state.calls.lock().unwrap().push(call);
  }

  fn mutation_failure(&self) -> Option<ApiError> {
    self.state.mutation_failure.lock().unwrap().clone()
  }

  fn wait_gate(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
    let gate = self.gate.clone();
    async move {
      if let Some(gate) = gate {
        gate.acquire().await.expect("gate closed").forget();
      }
    }
  }
}

fn not_found(resource: &str, id: &str) -> ApiError {
  ApiError::Http {
    status: 404,
    message: format!("{}/{} not found", resource, id),
  }
}

impl ResourceApi<Record> for MockApi {
  fn fetch_page(
    &self,
    resource: &str,
    filter: &ListFilter,
    page_index: u32,
    page_size: u32,
  ) -> BoxFuture<'static, ApiResult<Page<Record>>> {
    let page = page_index + 1;
    self.record(Call::Page {
      resource: resource.to_string(),
      search: filter.search.clone(),
      page,
      per_page: page_size,
    });

    let gate = self.wait_gate();
    let state = self.state.clone();
    let resource = resource.to_string();
    let search = filter.search.to_lowercase();
    async move {
      gate.await;
      if let Some(error) = state.page_failures.lock().unwrap().get(&page) {
        return Err(error.clone());
      }
      let rows = state.rows.lock().unwrap();
      let matching: Vec<Record> = rows
        .get(&resource)
        .map(|rows| {
          rows
            .iter()
            .filter(|r| r.label().to_lowercase().contains(&search))
            .cloned()
            .collect()
        })
        .unwrap_or_default();
      let data = matching
        .iter()
        .skip((page_index * page_size) as usize)
        .take(page_size as usize)
        .cloned()
        .collect();
      Ok(Page::new(data, matching.len() as u64))
    }
    .boxed()
  }

  fn fetch_one(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<Record>> {
    self.record(Call::One {
      resource: resource.to_string(),
      id: id.to_string(),
    });

    let gate = self.wait_gate();
    let state = self.state.clone();
    let resource = resource.to_string();
    let id = id.to_string();
    async move {
      gate.await;
      let rows = state.rows.lock().unwrap();
      rows
        .get(&resource)
        .and_then(|rows| rows.iter().find(|r| r.id().as_deref() == Some(id.as_str())))
        .cloned()
        .ok_or_else(|| not_found(&resource, &id))
    }
    .boxed()
  }

  fn create(&self, resource: &str, dto: Value) -> BoxFuture<'static, ApiResult<Record>> {
    self.record(Call::Create {
      resource: resource.to_string(),
    });
    let failure = self.mutation_failure();
    let state = self.state.clone();
    let resource = resource.to_string();
    async move {
      if let Some(error) = failure {
        return Err(error);
      }
      let mut record = Record::from(dto);
      let id = state.next_id.fetch_add(1, Ordering::SeqCst);
      record.0.insert("id".to_string(), json!(id));
      state
        .rows
        .lock()
        .unwrap()
        .entry(resource)
        .or_default()
        .push(record.clone());
      Ok(record)
    }
    .boxed()
  }

  fn update(&self, resource: &str, id: &str, dto: Value) -> BoxFuture<'static, ApiResult<Record>> {
    self.record(Call::Update {
      resource: resource.to_string(),
      id: id.to_string(),
    });
    let failure = self.mutation_failure();
    let state = self.state.clone();
    let resource = resource.to_string();
    let id = id.to_string();
    async move {
      if let Some(error) = failure {
        return Err(error);
      }
      let mut rows = state.rows.lock().unwrap();
      let row = rows
        .get_mut(&resource)
        .and_then(|rows| rows.iter_mut().find(|r| r.id().as_deref() == Some(id.as_str())))
        .ok_or_else(|| not_found(&resource, &id))?;
      if let Value::Object(fields) = dto {
        row.0.extend(fields);
      }
      Ok(row.clone())
    }
    .boxed()
  }

  fn delete(&self, resource: &str, id: &str) -> BoxFuture<'static, ApiResult<()>> {
    self.record(Call::Delete {
      resource: resource.to_string(),
      id: id.to_string(),
    });
    let failure = self.mutation_failure();
    let state = self.state.clone();
    let resource = resource.to_string();
    let id = id.to_string();
    async move {
      if let Some(error) = failure {
        return Err(error);
      }
      let mut rows = state.rows.lock().unwrap();
      let rows = rows
        .get_mut(&resource)
        .ok_or_else(|| not_found(&resource, &id))?;
      let before = rows.len();
      rows.retain(|r| r.id().as_deref() != Some(id.as_str()));
      if rows.len() == before {
        return Err(not_found(&resource, &id));
      }
      Ok(())
    }
    .boxed()
  }
}
