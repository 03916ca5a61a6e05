//! Document store: collection-scoped JSON documents with a change feed.
//!
//! Bodies are JSON objects whose field names are the wire contract with the
//! browser (`mockIdRef`, `correct_ans`, `techStack`, ...). The store owns the
//! `createdAt` / `updatedAt` stamps; callers never supply them.
//!
//! Backends: `postgres::PgDocumentStore` (production) and
//! `memory::MemoryStore` (local runs and tests). Handlers only ever see
//! `Arc<dyn DocumentStore>`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// Field stamped by the store when a document is created.
pub const CREATED_AT: &str = "createdAt";
/// Field stamped by the store on every update.
pub const UPDATED_AT: &str = "updatedAt";

/// Buffered snapshots per subscriber before the feed applies backpressure.
const SNAPSHOT_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Collection {
    #[serde(rename = "interviews")]
    Interviews,
    #[serde(rename = "userAnswers")]
    UserAnswers,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Interviews => "interviews",
            Collection::UserAnswers => "userAnswers",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "interviews" => Some(Collection::Interviews),
            "userAnswers" => Some(Collection::UserAnswers),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document: the store-assigned id plus its JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub data: Map<String, Value>,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        data.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Document {collection}/{id} not found")]
    NotFound { collection: Collection, id: Uuid },

    #[error("Document body must be a JSON object")]
    NotAnObject,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Collection-scoped CRUD plus change notifications.
///
/// Carried in `AppState` as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document and returns its generated id.
    async fn create(&self, collection: Collection, data: Value) -> Result<Uuid, StoreError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Merges `patch` into the top level of an existing document.
    async fn update(&self, collection: Collection, id: Uuid, patch: Value)
        -> Result<(), StoreError>;

    /// Documents matching every filter, oldest first.
    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError>;

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        self.query(collection, &[]).await
    }

    /// Removes a document. Deleting a missing id is not an error.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError>;

    /// Notifications naming the collection touched by each write.
    fn changes(&self) -> broadcast::Receiver<Collection>;
}

pub(crate) fn into_object(value: Value) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Live feed of full snapshots for one collection.
///
/// Dropping the subscription (or calling `unsubscribe`) stops the feed.
pub struct Subscription {
    snapshots: mpsc::Receiver<Result<Vec<Document>, StoreError>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Next snapshot. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<Result<Vec<Document>, StoreError>> {
        self.snapshots.recv().await
    }

    pub fn unsubscribe(self) {}

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Document>, StoreError>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribes to `collection`: emits the current snapshot immediately, then a
/// fresh snapshot after every write to that collection. The feed ends after
/// the first failed read.
pub fn subscribe(store: Arc<dyn DocumentStore>, collection: Collection) -> Subscription {
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
    // Listen before the first read so no write slips between the two.
    let mut changes = store.changes();

    let task = tokio::spawn(async move {
        loop {
            let snapshot = store.list(collection).await;
            let failed = snapshot.is_err();
            if tx.send(snapshot).await.is_err() {
                debug!("Subscriber for {collection} went away");
                return;
            }
            if failed {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(changed) if changed == collection => break,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Change feed for {collection} lagged by {skipped}; resnapshotting");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    });

    Subscription {
        snapshots: rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_names_round_trip() {
        for collection in [Collection::Interviews, Collection::UserAnswers] {
            assert_eq!(Collection::parse(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::parse("users"), None);
    }

    #[test]
    fn test_filter_matches_exact_value_only() {
        let data = into_object(json!({"question": "What is Rust?", "rating": 7})).unwrap();
        assert!(Filter::eq("question", "What is Rust?").matches(&data));
        assert!(Filter::eq("rating", 7).matches(&data));
        assert!(!Filter::eq("rating", "7").matches(&data));
        assert!(!Filter::eq("missing", "x").matches(&data));
    }

    #[tokio::test]
    async fn test_subscription_emits_initial_and_updated_snapshots() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut sub = subscribe(store.clone(), Collection::Interviews);

        let first = sub.next().await.unwrap().unwrap();
        assert!(first.is_empty());

        store
            .create(Collection::Interviews, json!({"position": "SRE"}))
            .await
            .unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].data["position"], "SRE");
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_collections() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let mut sub = subscribe(store.clone(), Collection::Interviews);
        sub.next().await.unwrap().unwrap();

        store
            .create(Collection::UserAnswers, json!({"question": "q"}))
            .await
            .unwrap();
        store
            .create(Collection::Interviews, json!({"position": "QA"}))
            .await
            .unwrap();

        let next = sub.next().await.unwrap().unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].data["position"], "QA");
    }

    async fn wait_for_listeners(store: &MemoryStore, expected: usize) {
        for _ in 0..100 {
            if store.listener_count() == expected {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!(
            "expected {expected} listener(s), found {}",
            store.listener_count()
        );
    }

    #[tokio::test]
    async fn test_dropping_subscription_stops_feed() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let mut sub = subscribe(store.clone(), Collection::Interviews);
        sub.next().await.unwrap().unwrap();
        assert_eq!(memory.listener_count(), 1);

        drop(sub);
        wait_for_listeners(&memory, 0).await;

        store
            .create(Collection::Interviews, json!({"position": "SRE"}))
            .await
            .unwrap();
        assert_eq!(memory.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_feed() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let first = subscribe(store.clone(), Collection::Interviews);
        let mut second = subscribe(store.clone(), Collection::Interviews);
        assert_eq!(memory.listener_count(), 2);

        first.unsubscribe();
        wait_for_listeners(&memory, 1).await;

        second.next().await.unwrap().unwrap();
        store
            .create(Collection::Interviews, json!({"position": "QA"}))
            .await
            .unwrap();
        assert_eq!(second.next().await.unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_into_object_rejects_non_objects() {
        assert!(matches!(into_object(json!([1, 2])), Err(StoreError::NotAnObject)));
    }
}
