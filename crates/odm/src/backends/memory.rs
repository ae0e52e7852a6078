//! In-memory document store.
//!
//! Implements [`SearchClient`] over process memory. Search supports the
//! subset of the query DSL used by repositories: `match_all`, `term`,
//! `terms`, `match`, `range`, `exists` and `bool` (`must`, `filter`,
//! `should`, `must_not`), plus `sort`, `from`/`size` and the `sum`, `max`,
//! `min` and `avg` metric aggregations.
//!
//! Writes are visible to search immediately; `refresh` is accepted and does
//! nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue, json};

use crate::core::{ClientResponse, Document, SearchClient, SearchResponse};
use crate::error::OdmResult;

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: JsonValue,
    mapping: Map<String, JsonValue>,
    documents: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Default)]
struct MemoryState {
    indices: HashMap<String, MemoryIndex>,
    aliases: HashMap<String, String>,
    read_only: bool,
}

impl MemoryState {
    fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.indices.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    fn index(&self, name: &str) -> Option<&MemoryIndex> {
        let resolved = self.resolve(name)?;
        self.indices.get(resolved)
    }

    fn index_mut(&mut self, name: &str) -> Option<&mut MemoryIndex> {
        let resolved = self.resolve(name)?.to_string();
        self.indices.get_mut(&resolved)
    }

    fn writable_index_mut(&mut self, name: &str) -> Result<&mut MemoryIndex, ClientResponse> {
        if self.read_only {
            return Err(ClientResponse::failure(format!(
                "index [{}] blocked by: [FORBIDDEN/8/index write (api)]",
                name
            )));
        }
        self.index_mut(name)
            .ok_or_else(|| ClientResponse::failure(format!("no such index [{}]", name)))
    }
}

/// A [`SearchClient`] keeping indices in memory.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryClient {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects (or accepts again) every document write.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.write().read_only = read_only;
    }

    /// Names of the existing indices, sorted.
    pub fn index_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut names: Vec<String> = state.indices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Index an alias points to.
    pub fn alias_target(&self, alias: &str) -> Option<String> {
        self.state.read().aliases.get(alias).cloned()
    }

    /// Settings an index was created with.
    pub fn index_settings(&self, index: &str) -> Option<JsonValue> {
        self.state.read().index(index).map(|i| i.settings.clone())
    }

    /// Number of documents stored in an index.
    pub fn document_count(&self, index: &str) -> usize {
        self.state
            .read()
            .index(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SearchClient for InMemoryClient {
    fn client_name(&self) -> &'static str {
        "memory"
    }

    async fn index_exists(&self, index: &str) -> OdmResult<bool> {
        Ok(self.state.read().resolve(index).is_some())
    }

    async fn create_index(&self, index: &str, settings: &JsonValue) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        if state.resolve(index).is_some() {
            return Ok(ClientResponse::failure(format!(
                "index [{}] already exists",
                index
            )));
        }
        state.indices.insert(
            index.to_string(),
            MemoryIndex {
                settings: settings.clone(),
                ..MemoryIndex::default()
            },
        );
        Ok(ClientResponse::success(
            json!({"acknowledged": true, "index": index}),
        ))
    }

    async fn put_mapping(
        &self,
        index: &str,
        properties: &JsonValue,
    ) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        let Some(target) = state.index_mut(index) else {
            return Ok(ClientResponse::failure(format!("no such index [{}]", index)));
        };
        let Some(properties) = properties.as_object() else {
            return Ok(ClientResponse::failure(
                "mapping properties must be an object",
            ));
        };
        for (field, mapping) in properties {
            target.mapping.insert(field.clone(), mapping.clone());
        }
        Ok(ClientResponse::success(json!({"acknowledged": true})))
    }

    async fn add_alias(&self, index: &str, alias: &str) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        if !state.indices.contains_key(index) {
            return Ok(ClientResponse::failure(format!("no such index [{}]", index)));
        }
        if state.indices.contains_key(alias) {
            return Ok(ClientResponse::failure(format!(
                "an index exists with the same name as the alias [{}]",
                alias
            )));
        }
        state.aliases.insert(alias.to_string(), index.to_string());
        Ok(ClientResponse::success(json!({"acknowledged": true})))
    }

    async fn get_mapping(&self, index: &str) -> OdmResult<JsonValue> {
        let state = self.state.read();
        Ok(state
            .index(index)
            .map(|i| JsonValue::Object(i.mapping.clone()))
            .unwrap_or_else(|| JsonValue::Object(Map::new())))
    }

    async fn get_document(&self, index: &str, id: &str) -> OdmResult<Option<Document>> {
        let state = self.state.read();
        Ok(state
            .index(index)
            .and_then(|i| i.documents.get(id))
            .map(|source| Document::new(id, source.clone())))
    }

    async fn add_document(&self, index: &str, document: Document) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        let target = match state.writable_index_mut(index) {
            Ok(target) => target,
            Err(response) => return Ok(response),
        };
        let result = if target.documents.contains_key(&document.id) {
            "updated"
        } else {
            "created"
        };
        target.documents.insert(document.id.clone(), document.source);
        Ok(ClientResponse::success(
            json!({"_id": document.id, "result": result}),
        ))
    }

    async fn add_documents(
        &self,
        index: &str,
        documents: Vec<Document>,
    ) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        let target = match state.writable_index_mut(index) {
            Ok(target) => target,
            Err(response) => return Ok(response),
        };
        let count = documents.len();
        for document in documents {
            target.documents.insert(document.id, document.source);
        }
        Ok(ClientResponse::success(
            json!({"errors": false, "items": count}),
        ))
    }

    async fn update_document(
        &self,
        index: &str,
        document: Document,
    ) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        let target = match state.writable_index_mut(index) {
            Ok(target) => target,
            Err(response) => return Ok(response),
        };
        let Some(existing) = target.documents.get_mut(&document.id) else {
            return Ok(ClientResponse::failure(format!(
                "[{}]: document missing",
                document.id
            )));
        };
        merge_json(existing, document.source);
        Ok(ClientResponse::success(
            json!({"_id": document.id, "result": "updated"}),
        ))
    }

    async fn delete_document(&self, index: &str, id: &str) -> OdmResult<ClientResponse> {
        let mut state = self.state.write();
        let target = match state.writable_index_mut(index) {
            Ok(target) => target,
            Err(response) => return Ok(response),
        };
        if target.documents.remove(id).is_none() {
            return Ok(ClientResponse::failure(format!("[{}]: document missing", id)));
        }
        Ok(ClientResponse::success(
            json!({"_id": id, "result": "deleted"}),
        ))
    }

    async fn refresh(&self, index: &str) -> OdmResult<ClientResponse> {
        if self.state.read().resolve(index).is_none() {
            return Ok(ClientResponse::failure(format!("no such index [{}]", index)));
        }
        Ok(ClientResponse::success(json!({"_shards": {"failed": 0}})))
    }

    async fn search(&self, index: &str, body: &JsonValue) -> OdmResult<SearchResponse> {
        let state = self.state.read();
        let Some(target) = state.index(index) else {
            return Ok(SearchResponse::from_body(empty_hits()));
        };

        let query = body.get("query");
        let mut hits: Vec<(&String, &JsonValue)> = target
            .documents
            .iter()
            .filter(|(_, source)| query.is_none_or(|q| matches_query(source, q)))
            .collect();

        if let Some(sort) = body.get("sort") {
            let keys = sort_keys(sort);
            hits.sort_by(|(_, a), (_, b)| compare_by_keys(a, b, &keys));
        }

        let total = hits.len();
        let from = body.get("from").and_then(JsonValue::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(JsonValue::as_u64)
            .map(|s| s as usize)
            .unwrap_or(10);

        let aggregations = body
            .get("aggs")
            .or_else(|| body.get("aggregations"))
            .and_then(JsonValue::as_object)
            .map(|aggs| compute_aggregations(aggs, hits.iter().map(|(_, source)| *source)));

        let page: Vec<JsonValue> = hits
            .iter()
            .skip(from)
            .take(size)
            .map(|(id, source)| json!({"_index": index, "_id": id, "_source": source}))
            .collect();

        let mut response = json!({
            "hits": {
                "total": {"value": total, "relation": "eq"},
                "hits": page
            }
        });
        if let Some(aggregations) = aggregations {
            response["aggregations"] = aggregations;
        }
        Ok(SearchResponse::from_body(response))
    }

    async fn count(&self, index: &str, query: Option<&JsonValue>) -> OdmResult<u64> {
        let state = self.state.read();
        let Some(target) = state.index(index) else {
            return Ok(0);
        };
        let count = target
            .documents
            .values()
            .filter(|source| query.is_none_or(|q| matches_query(source, q)))
            .count();
        Ok(count as u64)
    }
}

fn empty_hits() -> JsonValue {
    json!({"hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}})
}

/// Partial-document update: objects merge key-wise, anything else replaces.
fn merge_json(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// Resolves a dotted field path.
fn field<'a>(source: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(source, |value, segment| value.get(segment))
        .filter(|value| !value.is_null())
}

/// Values of a field, flattening arrays the way the store indexes them.
fn field_values<'a>(source: &'a JsonValue, path: &str) -> Vec<&'a JsonValue> {
    match field(source, path) {
        Some(JsonValue::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    }
}

/// `{"field": value}` or `{"field": {"value": value}}`.
fn single_clause(clause: &JsonValue) -> Option<(&str, &JsonValue)> {
    let (field, operand) = clause.as_object()?.iter().next()?;
    Some((field.as_str(), operand))
}

fn matches_query(source: &JsonValue, query: &JsonValue) -> bool {
    let Some(query) = query.as_object() else {
        return false;
    };

    query.iter().all(|(kind, clause)| match kind.as_str() {
        "match_all" => true,
        "match_none" => false,
        "term" => single_clause(clause).is_some_and(|(path, operand)| {
            let expected = operand.get("value").unwrap_or(operand);
            field_values(source, path)
                .into_iter()
                .any(|actual| json_equals(actual, expected))
        }),
        "terms" => single_clause(clause).is_some_and(|(path, operand)| {
            let candidates = operand.as_array().map(Vec::as_slice).unwrap_or_default();
            field_values(source, path)
                .into_iter()
                .any(|actual| candidates.iter().any(|c| json_equals(actual, c)))
        }),
        "match" => single_clause(clause).is_some_and(|(path, operand)| {
            let expected = operand.get("query").unwrap_or(operand);
            field_values(source, path)
                .into_iter()
                .any(|actual| text_matches(actual, expected))
        }),
        "range" => single_clause(clause).is_some_and(|(path, bounds)| {
            field_values(source, path)
                .into_iter()
                .any(|actual| in_range(actual, bounds))
        }),
        "exists" => clause
            .get("field")
            .and_then(JsonValue::as_str)
            .is_some_and(|path| field(source, path).is_some()),
        "bool" => matches_bool(source, clause),
        _ => false,
    })
}

fn matches_bool(source: &JsonValue, clause: &JsonValue) -> bool {
    let clauses = |key: &str| -> Vec<&JsonValue> {
        match clause.get(key) {
            Some(JsonValue::Array(items)) => items.iter().collect(),
            Some(item) => vec![item],
            None => Vec::new(),
        }
    };

    let must = clauses("must");
    let filter = clauses("filter");
    let must_not = clauses("must_not");
    let should = clauses("should");

    let required = must
        .iter()
        .chain(filter.iter())
        .all(|q| matches_query(source, q));
    let excluded = must_not.iter().any(|q| matches_query(source, q));

    let min_should = clause
        .get("minimum_should_match")
        .and_then(JsonValue::as_u64)
        .unwrap_or(if must.is_empty() && filter.is_empty() && !should.is_empty() {
            1
        } else {
            0
        }) as usize;
    let should_hits = should.iter().filter(|q| matches_query(source, q)).count();

    required && !excluded && should_hits >= min_should
}

fn json_equals(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn text_matches(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::String(actual), JsonValue::String(expected)) => {
            let actual = tokens(actual);
            tokens(expected).iter().any(|t| actual.contains(t))
        }
        _ => json_equals(actual, expected),
    }
}

fn in_range(actual: &JsonValue, bounds: &JsonValue) -> bool {
    let Some(bounds) = bounds.as_object() else {
        return false;
    };
    bounds.iter().all(|(op, bound)| {
        let ordering = compare_json(actual, bound);
        match op.as_str() {
            "gt" => ordering == Ordering::Greater,
            "gte" => ordering != Ordering::Less,
            "lt" => ordering == Ordering::Less,
            "lte" => ordering != Ordering::Greater,
            _ => true,
        }
    })
}

fn compare_json(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Null, _) => Ordering::Greater,
        (_, JsonValue::Null) => Ordering::Less,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => match (a.as_str(), b.as_str()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        },
    }
}

/// Sort keys as `(field, descending)`.
fn sort_keys(sort: &JsonValue) -> Vec<(String, bool)> {
    let entries: Vec<&JsonValue> = match sort {
        JsonValue::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut keys = Vec::new();
    for entry in entries {
        match entry {
            JsonValue::String(field) => keys.push((field.clone(), false)),
            JsonValue::Object(fields) => {
                for (field, order) in fields {
                    let order = order.get("order").unwrap_or(order);
                    keys.push((field.clone(), order.as_str() == Some("desc")));
                }
            }
            _ => {}
        }
    }
    keys
}

fn compare_by_keys(a: &JsonValue, b: &JsonValue, keys: &[(String, bool)]) -> Ordering {
    for (path, descending) in keys {
        let left = field(a, path).unwrap_or(&JsonValue::Null);
        let right = field(b, path).unwrap_or(&JsonValue::Null);
        let ordering = compare_json(left, right);
        let ordering = if *descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compute_aggregations<'a>(
    aggs: &Map<String, JsonValue>,
    sources: impl Iterator<Item = &'a JsonValue> + Clone,
) -> JsonValue {
    let mut results = Map::new();
    for (name, operand) in aggs {
        let Some((kind, params)) = single_clause(operand) else {
            continue;
        };
        let Some(path) = params.get("field").and_then(JsonValue::as_str) else {
            continue;
        };
        let numbers: Vec<f64> = sources
            .clone()
            .flat_map(|source| field_values(source, path))
            .filter_map(JsonValue::as_f64)
            .collect();

        let value = match kind {
            "sum" => Some(numbers.iter().sum::<f64>()),
            "max" => numbers.iter().copied().reduce(f64::max),
            "min" => numbers.iter().copied().reduce(f64::min),
            "avg" if !numbers.is_empty() => {
                Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
            "avg" => None,
            _ => continue,
        };
        results.insert(name.clone(), json!({ "value": value }));
    }
    JsonValue::Object(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> InMemoryClient {
        let client = InMemoryClient::new();
        client.create_index("products", &json!({})).await.unwrap();
        client
            .add_documents(
                "products",
                vec![
                    Document::new("1", json!({"name": "Red Shirt", "price": 10, "tags": ["a"]})),
                    Document::new("2", json!({"name": "Blue Shirt", "price": 25, "tags": ["b"]})),
                    Document::new("3", json!({"name": "Red Hat", "price": 5, "tags": ["a", "b"]})),
                ],
            )
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_create_index_twice_fails() {
        let client = InMemoryClient::new();
        assert!(client.create_index("a", &json!({})).await.unwrap().is_ok());
        let response = client.create_index("a", &json!({})).await.unwrap();
        assert!(!response.is_ok());
        assert!(response.error_message().contains("already exists"));
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let client = InMemoryClient::new();
        client.create_index("people_v1", &json!({})).await.unwrap();
        client.add_alias("people_v1", "people").await.unwrap();

        assert!(client.index_exists("people").await.unwrap());
        client
            .add_document("people", Document::new("1", json!({"name": "x"})))
            .await
            .unwrap();
        assert!(client.document_exists("people_v1", "1").await.unwrap());
        assert_eq!(client.alias_target("people").as_deref(), Some("people_v1"));
    }

    #[tokio::test]
    async fn test_term_and_match_queries() {
        let client = seeded().await;

        let response = client
            .search("products", &json!({"query": {"term": {"price": 25}}}))
            .await
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.documents[0].id, "2");

        let response = client
            .search("products", &json!({"query": {"match": {"name": "red"}}}))
            .await
            .unwrap();
        assert_eq!(response.total, 2);

        let count = client
            .count("products", Some(&json!({"term": {"tags": "b"}})))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_bool_query_with_sort_and_paging() {
        let client = seeded().await;
        let body = json!({
            "query": {"bool": {
                "must": [{"range": {"price": {"gte": 5}}}],
                "must_not": {"term": {"name": "Blue Shirt"}}
            }},
            "sort": [{"price": "desc"}],
            "from": 0,
            "size": 1
        });

        let response = client.search("products", &body).await.unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.documents.len(), 1);
        assert_eq!(response.documents[0].id, "1");
    }

    #[tokio::test]
    async fn test_aggregations() {
        let client = seeded().await;
        let body = json!({
            "size": 0,
            "aggs": {
                "total": {"sum": {"field": "price"}},
                "cheapest": {"min": {"field": "price"}},
                "priciest": {"max": {"field": "price"}},
                "price": {"avg": {"field": "price"}}
            }
        });

        let response = client.search("products", &body).await.unwrap();
        let aggs = response.aggregations().unwrap();
        assert_eq!(aggs["total"]["value"], json!(40.0));
        assert_eq!(aggs["cheapest"]["value"], json!(5.0));
        assert_eq!(aggs["priciest"]["value"], json!(25.0));
        assert!(response.documents.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_document() {
        let client = seeded().await;

        let response = client
            .update_document("products", Document::new("9", json!({"price": 1})))
            .await
            .unwrap();
        assert!(!response.is_ok());

        let response = client.delete_document("products", "9").await.unwrap();
        assert!(!response.is_ok());

        let response = client
            .update_document("products", Document::new("1", json!({"price": 11})))
            .await
            .unwrap();
        assert!(response.is_ok());
        let document = client.get_document("products", "1").await.unwrap().unwrap();
        assert_eq!(document.source["price"], json!(11));
        assert_eq!(document.source["name"], json!("Red Shirt"));
    }

    #[tokio::test]
    async fn test_read_only_blocks_writes() {
        let client = seeded().await;
        client.set_read_only(true);

        let response = client
            .add_document("products", Document::new("4", json!({})))
            .await
            .unwrap();
        assert!(!response.is_ok());
        assert!(response.error_message().contains("blocked"));
        assert_eq!(client.document_count("products"), 3);
    }
}
