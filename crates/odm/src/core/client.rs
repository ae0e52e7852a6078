//! The document store interface consumed by the mapper.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::OdmResult;

/// Outcome of a mutating store request.
///
/// Requests the store rejects (an index that already exists, a missing
/// document) come back as a failed response rather than an error; transport
/// problems are reported as [`StoreError`](crate::error::StoreError).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResponse {
    ok: bool,
    error: Option<String>,
    body: JsonValue,
}

impl ClientResponse {
    /// A successful response carrying `body`.
    pub fn success(body: JsonValue) -> Self {
        Self {
            ok: true,
            error: None,
            body,
        }
    }

    /// A failed response with an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            body: JsonValue::Null,
        }
    }

    /// Whether the store accepted the request.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// The store's error message; empty for successful responses.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }

    /// Raw response body.
    pub fn body(&self) -> &JsonValue {
        &self.body
    }
}

/// A stored document: identifier plus JSON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Document payload.
    pub source: JsonValue,
}

impl Document {
    /// Creates a document.
    pub fn new(id: impl Into<String>, source: JsonValue) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Result of a search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// Total number of matching documents.
    pub total: u64,
    /// Documents of the requested page, in hit order.
    pub documents: Vec<Document>,
    /// The full response body, aggregations included.
    pub raw: JsonValue,
}

impl SearchResponse {
    /// Parses a search response body (`hits.total.value`, `hits.hits[]`).
    pub fn from_body(body: JsonValue) -> Self {
        let hits = &body["hits"];

        let total = match &hits["total"] {
            JsonValue::Number(n) => n.as_u64().unwrap_or(0),
            other => other["value"].as_u64().unwrap_or(0),
        };

        let documents = hits["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| {
                        let id = hit["_id"].as_str()?;
                        Some(Document::new(id, hit["_source"].clone()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total,
            documents,
            raw: body,
        }
    }

    /// The `aggregations` section of the response, if any.
    pub fn aggregations(&self) -> Option<&JsonValue> {
        self.raw.get("aggregations")
    }
}

/// Document store operations used by index mapping and repositories.
///
/// Mutating calls return a [`ClientResponse`]; a response that is not ok
/// carries the store's error message. `Err` is reserved for failures to reach
/// or talk to the store.
#[async_trait]
pub trait SearchClient: Send + Sync + fmt::Debug {
    /// Returns a short name for this client, used in logs.
    fn client_name(&self) -> &'static str;

    /// Whether `index` (or an alias of that name) exists.
    async fn index_exists(&self, index: &str) -> OdmResult<bool>;

    /// Creates `index` with the given settings.
    async fn create_index(&self, index: &str, settings: &JsonValue) -> OdmResult<ClientResponse>;

    /// Defines the field mapping (`properties`) of `index`.
    async fn put_mapping(&self, index: &str, properties: &JsonValue)
        -> OdmResult<ClientResponse>;

    /// Attaches `alias` to `index`.
    async fn add_alias(&self, index: &str, alias: &str) -> OdmResult<ClientResponse>;

    /// Returns the `properties` section of the live mapping of `index`.
    async fn get_mapping(&self, index: &str) -> OdmResult<JsonValue>;

    /// Fetches a document, `None` when it does not exist.
    async fn get_document(&self, index: &str, id: &str) -> OdmResult<Option<Document>>;

    /// Whether a document with `id` exists.
    async fn document_exists(&self, index: &str, id: &str) -> OdmResult<bool> {
        Ok(self.get_document(index, id).await?.is_some())
    }

    /// Indexes a document, replacing any document with the same id.
    async fn add_document(&self, index: &str, document: Document) -> OdmResult<ClientResponse>;

    /// Indexes documents in bulk.
    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<Document>,
    ) -> OdmResult<ClientResponse>;

    /// Updates an existing document; fails when it does not exist.
    async fn update_document(&self, index: &str, document: Document)
        -> OdmResult<ClientResponse>;

    /// Deletes a document; fails when it does not exist.
    async fn delete_document(&self, index: &str, id: &str) -> OdmResult<ClientResponse>;

    /// Makes recent writes visible to search.
    async fn refresh(&self, index: &str) -> OdmResult<ClientResponse>;

    /// Runs a search request body (`query`, `sort`, `from`, `size`, `aggs`).
    async fn search(&self, index: &str, body: &JsonValue) -> OdmResult<SearchResponse>;

    /// Counts documents matching `query`; all documents when `None`.
    async fn count(&self, index: &str, query: Option<&JsonValue>) -> OdmResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_from_body() {
        let response = SearchResponse::from_body(json!({
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_id": "1", "_source": {"name": "a"}},
                    {"_id": "2", "_source": {"name": "b"}}
                ]
            },
            "aggregations": {"price": {"value": 10.0}}
        }));

        assert_eq!(response.total, 2);
        assert_eq!(response.documents.len(), 2);
        assert_eq!(response.documents[1], Document::new("2", json!({"name": "b"})));
        assert_eq!(response.aggregations(), Some(&json!({"price": {"value": 10.0}})));
    }

    #[test]
    fn test_search_response_legacy_total() {
        let response = SearchResponse::from_body(json!({"hits": {"total": 7, "hits": []}}));
        assert_eq!(response.total, 7);
        assert!(response.documents.is_empty());
        assert!(response.aggregations().is_none());
    }

    #[test]
    fn test_client_response() {
        let ok = ClientResponse::success(json!({"acknowledged": true}));
        assert!(ok.is_ok());
        assert_eq!(ok.error_message(), "");

        let failed = ClientResponse::failure("index already exists");
        assert!(!failed.is_ok());
        assert_eq!(failed.error_message(), "index already exists");
    }
}
