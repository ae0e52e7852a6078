//! Named index handle over a [`SearchClient`](crate::core::SearchClient).

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::core::{ClientResponse, Document, SearchClient, SearchResponse};
use crate::error::OdmResult;

/// A named index bound to a store client.
///
/// Cheap to clone; all clones talk to the same client.
#[derive(Clone)]
pub struct Index {
    name: String,
    client: Arc<dyn SearchClient>,
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("client", &self.client.client_name())
            .finish()
    }
}

impl Index {
    /// Binds `name` to `client`.
    pub fn new(client: Arc<dyn SearchClient>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
        }
    }

    /// The index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store client.
    pub fn client(&self) -> &Arc<dyn SearchClient> {
        &self.client
    }

    /// Whether the index (or an alias of that name) exists.
    pub async fn exists(&self) -> OdmResult<bool> {
        self.client.index_exists(&self.name).await
    }

    /// Creates the index with `settings`.
    pub async fn create(&self, settings: &JsonValue) -> OdmResult<ClientResponse> {
        self.client.create_index(&self.name, settings).await
    }

    /// Attaches `alias` to the index.
    pub async fn add_alias(&self, alias: &str) -> OdmResult<ClientResponse> {
        self.client.add_alias(&self.name, alias).await
    }

    /// Defines the field mapping.
    pub async fn set_mapping(&self, properties: &JsonValue) -> OdmResult<ClientResponse> {
        self.client.put_mapping(&self.name, properties).await
    }

    /// The live field mapping (`properties`).
    pub async fn get_mapping(&self) -> OdmResult<JsonValue> {
        self.client.get_mapping(&self.name).await
    }

    /// Whether a document with `id` exists.
    pub async fn has_document(&self, id: &str) -> OdmResult<bool> {
        self.client.document_exists(&self.name, id).await
    }

    /// Fetches a document by id.
    pub async fn get_document(&self, id: &str) -> OdmResult<Option<Document>> {
        self.client.get_document(&self.name, id).await
    }

    /// Indexes a document.
    pub async fn add_document(&self, document: Document) -> OdmResult<ClientResponse> {
        self.client.add_document(&self.name, document).await
    }

    /// Indexes documents in bulk.
    pub async fn add_documents(&self, documents: Vec<Document>) -> OdmResult<ClientResponse> {
        self.client.add_documents(&self.name, documents).await
    }

    /// Updates an existing document.
    pub async fn update_document(&self, document: Document) -> OdmResult<ClientResponse> {
        self.client.update_document(&self.name, document).await
    }

    /// Deletes a document by id.
    pub async fn delete_document(&self, id: &str) -> OdmResult<ClientResponse> {
        self.client.delete_document(&self.name, id).await
    }

    /// Makes recent writes searchable.
    pub async fn refresh(&self) -> OdmResult<ClientResponse> {
        self.client.refresh(&self.name).await
    }

    /// Runs a search request body.
    pub async fn search(&self, body: &JsonValue) -> OdmResult<SearchResponse> {
        self.client.search(&self.name, body).await
    }

    /// Counts documents matching `query`.
    pub async fn count(&self, query: Option<&JsonValue>) -> OdmResult<u64> {
        self.client.count(&self.name, query).await
    }
}
