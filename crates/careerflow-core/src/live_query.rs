//! Boundary to the external real-time query backend.
//!
//! A live query is a filtered view over a record collection that keeps
//! delivering the size of its matching set until cancelled. The backend
//! itself lives outside this crate; `memory::MemoryStore` is the in-process
//! implementation used by tests and the simulator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which records a query reads from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum QueryScope {
    /// A single top-level collection, addressed by its full path.
    Collection(String),
    /// Every collection whose last path segment equals the name,
    /// at any depth (`chats/a/messages`, `chats/b/messages`, ...).
    CollectionGroup(String),
}

impl QueryScope {
    pub fn name(&self) -> &str {
        match self {
            QueryScope::Collection(name) | QueryScope::CollectionGroup(name) => name,
        }
    }

    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            QueryScope::Collection(name) => path == name,
            QueryScope::CollectionGroup(name) => path.rsplit('/').next() == Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Str(String),
}

impl FilterValue {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::Bool(expected), Value::Bool(actual)) => expected == actual,
            (FilterValue::Str(expected), Value::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl FieldFilter {
    pub fn eq_str(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: FilterValue::Str(value.into()),
        }
    }

    pub fn eq_bool(field: &str, value: bool) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: FilterValue::Bool(value),
        }
    }

    /// A missing field never matches.
    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        match self.op {
            FilterOp::Eq => record
                .get(&self.field)
                .is_some_and(|value| self.value.matches(value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiveQuerySpec {
    pub scope: QueryScope,
    pub filters: Vec<FieldFilter>,
}

impl LiveQuerySpec {
    pub fn collection(name: &str) -> Self {
        Self {
            scope: QueryScope::Collection(name.to_string()),
            filters: Vec::new(),
        }
    }

    pub fn collection_group(name: &str) -> Self {
        Self {
            scope: QueryScope::CollectionGroup(name.to_string()),
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Filters are ANDed.
    pub fn matches(&self, path: &str, record: &Map<String, Value>) -> bool {
        self.scope.matches_path(path) && self.filters.iter().all(|f| f.matches(record))
    }
}

impl fmt::Display for LiveQuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            QueryScope::Collection(name) => write!(f, "{}", name)?,
            QueryScope::CollectionGroup(name) => write!(f, "*/{}", name)?,
        }
        for (i, filter) in self.filters.iter().enumerate() {
            let joiner = if i == 0 { "where" } else { "and" };
            write!(f, " {} {} == {}", joiner, filter.field, filter.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LiveQueryError {
    #[error("subscription to {collection} rejected: {reason}")]
    Rejected { collection: String, reason: String },
    #[error("live query on {collection} failed: {reason}")]
    Backend { collection: String, reason: String },
}

pub type SnapshotCallback = Box<dyn FnMut(Result<usize, LiveQueryError>)>;

/// Real-time query capability supplied by the embedder.
///
/// Implementations deliver the size of the matching set on every change,
/// in the order the store produces them, until the returned handle is
/// cancelled. After cancellation the callback must not be invoked again.
pub trait LiveQuery {
    fn subscribe(
        &self,
        spec: &LiveQuerySpec,
        on_snapshot: SnapshotCallback,
    ) -> Result<SubscriptionHandle, LiveQueryError>;
}

/// Owns exactly one cancellation.
///
/// `cancel` runs it; dropping a handle that was never cancelled runs it too,
/// so a handle can never leak its listener.
#[must_use = "dropping a SubscriptionHandle cancels the subscription"]
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl SubscriptionHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
