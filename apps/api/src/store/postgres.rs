use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use sqlx::{FromRow, PgPool};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{into_object, Collection, Document, DocumentStore, Filter, StoreError};

/// NOTIFY channel carrying the name of the collection each write touched.
const CHANGE_CHANNEL: &str = "document_changes";
const CHANGE_CAPACITY: usize = 256;

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    data: Value,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            data: into_object(row.data)?,
        })
    }
}

/// `DocumentStore` over a single JSONB `documents` table.
///
/// Writes publish the collection name on `document_changes`; a background
/// `PgListener` fans those out to local subscribers, so writes from other
/// instances reach this instance's dashboards too.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    changes: broadcast::Sender<Collection>,
}

impl PgDocumentStore {
    /// Connects the change listener and returns the store.
    pub async fn connect(pool: PgPool) -> Result<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tokio::spawn(forward_notifications(listener, changes.clone()));
        info!("Listening for document changes on '{CHANGE_CHANNEL}'");

        Ok(Self { pool, changes })
    }

    /// Announces a committed write. A failed notification only delays live
    /// views; the write itself already succeeded.
    async fn notify(&self, collection: Collection) {
        if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(collection.as_str())
            .execute(&self.pool)
            .await
        {
            error!("Failed to announce change to {collection}: {e}");
        }
    }
}

async fn forward_notifications(mut listener: PgListener, changes: broadcast::Sender<Collection>) {
    loop {
        match listener.recv().await {
            Ok(notification) => match Collection::parse(notification.payload()) {
                Some(collection) => {
                    let _ = changes.send(collection);
                }
                None => warn!(
                    "Ignoring change notification for unknown collection '{}'",
                    notification.payload()
                ),
            },
            Err(e) => {
                error!("Document change listener error: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: Collection, data: Value) -> Result<Uuid, StoreError> {
        let data = Value::Object(into_object(data)?);
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, data)
            VALUES ($1, $2, ($3::jsonb - 'id') || jsonb_build_object('createdAt', to_jsonb(now())))
            "#,
        )
        .bind(id)
        .bind(collection.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await?;

        self.notify(collection).await;
        Ok(id)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Document::try_from).transpose()
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: Value,
    ) -> Result<(), StoreError> {
        let patch = Value::Object(into_object(patch)?);

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = (data || ($3::jsonb - 'id' - 'createdAt'))
                       || jsonb_build_object('updatedAt', to_jsonb(now())),
                updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&patch)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { collection, id });
        }

        self.notify(collection).await;
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        // Equality on top-level fields is exactly JSONB containment.
        let containment: Map<String, Value> = filters
            .iter()
            .map(|f| (f.field.clone(), f.value.clone()))
            .collect();

        let rows: Vec<DocumentRow> = sqlx::query_as(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND data @> $2
            ORDER BY created_at, id
            "#,
        )
        .bind(collection.as_str())
        .bind(Value::Object(containment))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            self.notify(collection).await;
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Collection> {
        self.changes.subscribe()
    }
}
