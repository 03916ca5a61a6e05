pub mod answer;
pub mod interview;

use serde_json::Value;

use crate::store::Document;

/// Document body with the store-assigned id merged in as `id`.
fn with_store_id(doc: Document) -> Value {
    let mut data = doc.data;
    data.insert("id".to_string(), Value::String(doc.id.to_string()));
    Value::Object(data)
}
