use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{into_object, Collection, Document, DocumentStore, Filter, StoreError, CREATED_AT, UPDATED_AT};

const CHANGE_CAPACITY: usize = 64;

/// In-process `DocumentStore`. Documents keep insertion order.
#[derive(Clone)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<Collection, Vec<Document>>>>,
    changes: broadcast::Sender<Collection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Live change-feed listeners.
    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn notify(&self, collection: Collection) {
        // No receivers is fine: nobody is watching.
        let _ = self.changes.send(collection);
    }
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: Collection, data: Value) -> Result<Uuid, StoreError> {
        let mut data: Map<String, Value> = into_object(data)?;
        data.remove("id");
        data.insert(CREATED_AT.to_string(), now_value());

        let id = Uuid::new_v4();
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection)
            .or_default()
            .push(Document { id, data });

        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Value,
    ) -> Result<(), StoreError> {
        let patch = into_object(patch)?;
        {
            let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
                .ok_or(StoreError::NotFound { collection, id })?;

            for (key, value) in patch {
                if key != "id" && key != CREATED_AT {
                    doc.data.insert(key, value);
                }
            }
            doc.data.insert(UPDATED_AT.to_string(), now_value());
        }

        self.notify(collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filters.iter().all(|f| f.matches(&d.data)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let removed = {
            let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
            match collections.get_mut(&collection) {
                Some(docs) => {
                    let before = docs.len();
                    docs.retain(|d| d.id != id);
                    docs.len() != before
                }
                None => false,
            }
        };

        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}
