use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::live_query::{
    LiveQuery, LiveQueryError, LiveQuerySpec, SnapshotCallback, SubscriptionHandle,
};

type Record = Map<String, Value>;

struct LiveEntry {
    id: u64,
    spec: LiveQuerySpec,
    /// Taken out while the callback runs so callbacks may re-enter the store.
    on_snapshot: Option<SnapshotCallback>,
}

#[derive(Default)]
struct StoreInner {
    /// collection path -> record id -> fields
    collections: BTreeMap<String, BTreeMap<String, Record>>,
    live: Vec<LiveEntry>,
    /// collection name -> failure reason
    failed: HashMap<String, String>,
    next_id: u64,
}

impl StoreInner {
    fn matching_count(&self, spec: &LiveQuerySpec) -> usize {
        self.collections
            .iter()
            .filter(|(path, _)| spec.scope.matches_path(path))
            .map(|(path, records)| {
                records
                    .values()
                    .filter(|record| spec.matches(path, record))
                    .count()
            })
            .sum()
    }
}

/// In-process record store with live queries.
///
/// Records are JSON objects addressed by collection path and id. Every
/// write re-delivers the matching-set size to each live query whose scope
/// covers the written collection, in subscription order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn put(&self, path: &str, id: &str, fields: Value) {
        let record = match fields {
            Value::Object(map) => map,
            other => {
                warn!(path, id, value = %other, "record is not an object, storing it empty");
                Record::new()
            }
        };
        self.inner
            .borrow_mut()
            .collections
            .entry(path.to_string())
            .or_default()
            .insert(id.to_string(), record);
        self.notify_path(path);
    }

    /// Insert a record under a generated id.
    pub fn add(&self, path: &str, fields: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.put(path, &id, fields);
        id
    }

    /// Merge fields into an existing record. Returns false if it does not exist.
    pub fn update(&self, path: &str, id: &str, patch: Value) -> bool {
        let Value::Object(patch) = patch else {
            return false;
        };
        let updated = {
            let mut inner = self.inner.borrow_mut();
            match inner
                .collections
                .get_mut(path)
                .and_then(|records| records.get_mut(id))
            {
                Some(record) => {
                    record.extend(patch);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.notify_path(path);
        }
        updated
    }

    pub fn delete(&self, path: &str, id: &str) -> bool {
        let removed = self
            .inner
            .borrow_mut()
            .collections
            .get_mut(path)
            .and_then(|records| records.remove(id))
            .is_some();
        if removed {
            self.notify_path(path);
        }
        removed
    }

    pub fn get(&self, path: &str, id: &str) -> Option<Value> {
        self.inner
            .borrow()
            .collections
            .get(path)
            .and_then(|records| records.get(id))
            .map(|record| Value::Object(record.clone()))
    }

    /// Current size of a query's matching set, without subscribing.
    pub fn count(&self, spec: &LiveQuerySpec) -> usize {
        self.inner.borrow().matching_count(spec)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.inner.borrow().live.len()
    }

    /// Fail every live query on collection `name` and reject new ones until
    /// `heal_collection`. Failed queries are terminated by the store.
    pub fn fail_collection(&self, name: &str, reason: &str) {
        let victims: Vec<u64> = {
            let mut inner = self.inner.borrow_mut();
            inner.failed.insert(name.to_string(), reason.to_string());
            inner
                .live
                .iter()
                .filter(|entry| entry.spec.scope.name() == name)
                .map(|entry| entry.id)
                .collect()
        };

        for id in victims {
            let error = LiveQueryError::Backend {
                collection: name.to_string(),
                reason: reason.to_string(),
            };
            self.deliver(id, Err(error));
            self.inner.borrow_mut().live.retain(|entry| entry.id != id);
        }
    }

    pub fn heal_collection(&self, name: &str) {
        self.inner.borrow_mut().failed.remove(name);
    }

    fn notify_path(&self, path: &str) {
        let deliveries: Vec<(u64, usize)> = {
            let inner = self.inner.borrow();
            inner
                .live
                .iter()
                .filter(|entry| entry.spec.scope.matches_path(path))
                .map(|entry| (entry.id, inner.matching_count(&entry.spec)))
                .collect()
        };

        for (id, size) in deliveries {
            self.deliver(id, Ok(size));
        }
    }

    fn deliver(&self, id: u64, result: Result<usize, LiveQueryError>) {
        let callback = {
            let mut inner = self.inner.borrow_mut();
            inner
                .live
                .iter_mut()
                .find(|entry| entry.id == id)
                .and_then(|entry| entry.on_snapshot.take())
        };
        let Some(mut callback) = callback else {
            return;
        };

        trace!(subscription = id, ?result, "delivering snapshot");
        callback(result);

        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.live.iter_mut().find(|entry| entry.id == id) {
            entry.on_snapshot = Some(callback);
        }
    }

    fn remove_live(inner: &Weak<RefCell<StoreInner>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            inner.borrow_mut().live.retain(|entry| entry.id != id);
        }
    }
}

impl LiveQuery for MemoryStore {
    fn subscribe(
        &self,
        spec: &LiveQuerySpec,
        on_snapshot: SnapshotCallback,
    ) -> Result<SubscriptionHandle, LiveQueryError> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let collection = spec.scope.name();
            if let Some(reason) = inner.failed.get(collection) {
                return Err(LiveQueryError::Rejected {
                    collection: collection.to_string(),
                    reason: reason.clone(),
                });
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.live.push(LiveEntry {
                id,
                spec: spec.clone(),
                on_snapshot: Some(on_snapshot),
            });
            id
        };

        let initial = self.count(spec);
        self.deliver(id, Ok(initial));

        let weak = Rc::downgrade(&self.inner);
        Ok(SubscriptionHandle::new(move || Self::remove_live(&weak, id)))
    }
}
