//! [`SearchClient`] implementation for Elasticsearch.

use async_trait::async_trait;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::indices::{
    IndicesCreateParts, IndicesExistsParts, IndicesGetMappingParts, IndicesPutAliasParts,
    IndicesPutMappingParts, IndicesRefreshParts,
};
use elasticsearch::{
    BulkParts, CountParts, DeleteParts, ExistsParts, GetParts, IndexParts, SearchParts,
    UpdateParts,
};
use serde_json::{Value, json};

use super::backend::ElasticsearchClient;
use crate::core::{ClientResponse, Document, SearchClient, SearchResponse};
use crate::error::{OdmResult, StoreError};

fn transport_error(operation: &str, index: &str, err: elasticsearch::Error) -> StoreError {
    StoreError::request(operation, index, err.to_string())
}

/// Reads the status of a single-document lookup: `Ok(true)` when found,
/// `Ok(false)` on 404, and an error for every other failure.
fn lookup_status(operation: &str, index: &str, status: u16) -> Result<bool, StoreError> {
    match status {
        200..=299 => return Ok(true),
        404 => return Ok(false),
        _ => {}
    }
    Err(StoreError::request(
        operation,
        index,
        format!("request returned status {}", status),
    ))
}

/// Turns a raw response into a [`ClientResponse`], extracting the error
/// reason of rejected requests.
async fn into_client_response(response: Response) -> ClientResponse {
    let status = response.status_code();
    let body = response.json::<Value>().await.unwrap_or_default();

    if status.is_success() && body.get("errors").and_then(Value::as_bool) != Some(true) {
        return ClientResponse::success(body);
    }

    let reason = body["error"]["reason"]
        .as_str()
        .map(str::to_string)
        .or_else(|| bulk_failure_reason(&body))
        .unwrap_or_else(|| format!("request returned status {}: {}", status, body));
    ClientResponse::failure(reason)
}

/// First item error of a bulk response.
fn bulk_failure_reason(body: &Value) -> Option<String> {
    body["items"].as_array()?.iter().find_map(|item| {
        let (_, result) = item.as_object()?.iter().next()?;
        result["error"]["reason"].as_str().map(str::to_string)
    })
}

#[async_trait]
impl SearchClient for ElasticsearchClient {
    fn client_name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn index_exists(&self, index: &str) -> OdmResult<bool> {
        let response = self
            .client()
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("index exists", index, e))?;

        Ok(response.status_code().is_success())
    }

    async fn create_index(&self, index: &str, settings: &Value) -> OdmResult<ClientResponse> {
        let body = if settings.as_object().is_some_and(|s| !s.is_empty()) {
            json!({ "settings": settings })
        } else {
            json!({})
        };

        let response = self
            .client()
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("create index", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn put_mapping(&self, index: &str, properties: &Value) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(json!({ "properties": properties }))
            .send()
            .await
            .map_err(|e| transport_error("put mapping", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn add_alias(&self, index: &str, alias: &str) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .indices()
            .put_alias(IndicesPutAliasParts::IndexName(&[index], alias))
            .send()
            .await
            .map_err(|e| transport_error("add alias", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn get_mapping(&self, index: &str) -> OdmResult<Value> {
        let response = self
            .client()
            .indices()
            .get_mapping(IndicesGetMappingParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("get mapping", index, e))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::request(
                "get mapping",
                index,
                format!("status {}: {}", status, body),
            )
            .into());
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| transport_error("get mapping", index, e))?;

        // Keyed by the concrete index name, which differs when `index` is an alias.
        let properties = body
            .as_object()
            .and_then(|indices| indices.values().next())
            .map(|mapping| mapping["mappings"]["properties"].clone())
            .filter(|properties| !properties.is_null())
            .unwrap_or_else(|| json!({}));

        Ok(properties)
    }

    async fn get_document(&self, index: &str, id: &str) -> OdmResult<Option<Document>> {
        let response = self
            .client()
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| transport_error("get document", index, e))?;

        if !lookup_status("get document", index, response.status_code().as_u16())? {
            return Ok(None);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| transport_error("get document", index, e))?;

        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }

        Ok(Some(Document::new(id, body["_source"].clone())))
    }

    async fn document_exists(&self, index: &str, id: &str) -> OdmResult<bool> {
        let response = self
            .client()
            .exists(ExistsParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| transport_error("document exists", index, e))?;

        Ok(lookup_status("document exists", index, response.status_code().as_u16())?)
    }

    async fn add_document(&self, index: &str, document: Document) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .index(IndexParts::IndexId(index, &document.id))
            .body(document.source)
            .send()
            .await
            .map_err(|e| transport_error("add document", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<Document>,
    ) -> OdmResult<ClientResponse> {
        if documents.is_empty() {
            return Ok(ClientResponse::success(json!({ "errors": false, "items": [] })));
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            body.push(json!({ "index": { "_id": document.id } }).into());
            body.push(document.source.into());
        }

        let response = self
            .client()
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("bulk index", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn update_document(&self, index: &str, document: Document) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .update(UpdateParts::IndexId(index, &document.id))
            .body(json!({ "doc": document.source }))
            .send()
            .await
            .map_err(|e| transport_error("update document", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn delete_document(&self, index: &str, id: &str) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(|e| transport_error("delete document", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn refresh(&self, index: &str) -> OdmResult<ClientResponse> {
        let response = self
            .client()
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error("refresh", index, e))?;

        Ok(into_client_response(response).await)
    }

    async fn search(&self, index: &str, body: &Value) -> OdmResult<SearchResponse> {
        let response = self
            .client()
            .search(SearchParts::Index(&[index]))
            .body(body.clone())
            .send()
            .await
            .map_err(|e| transport_error("search", index, e))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                StoreError::request("search", index, format!("status {}: {}", status, body))
                    .into(),
            );
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| transport_error("search", index, e))?;

        Ok(SearchResponse::from_body(body))
    }

    async fn count(&self, index: &str, query: Option<&Value>) -> OdmResult<u64> {
        let body = match query {
            Some(query) => json!({ "query": query }),
            None => json!({}),
        };

        let response = self
            .client()
            .count(CountParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("count", index, e))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                StoreError::request("count", index, format!("status {}: {}", status, body))
                    .into(),
            );
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| transport_error("count", index, e))?;

        Ok(body["count"].as_u64().unwrap_or(0))
    }
}
