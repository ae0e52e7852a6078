//! Per-entity document repositories.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::core::{ClientResponse, Document};
use crate::error::{OdmError, OdmResult, TransformError};
use crate::reflect::Reflect;
use crate::repository::index::Index;
use crate::repository::mapping::IndexMapping;
use crate::repository::query::{AggregationBuilder, Query, SortOrder};
use crate::transformer::DataTransformer;

/// Default page size of [`ElasticsearchRepository::find_by`].
pub const DEFAULT_FIND_LIMIT: u64 = 1000;

/// Entities that can be stored as documents.
pub trait DocumentSupport {
    /// Identifier of the document; `None` for objects that cannot be stored yet.
    fn document_id(&self) -> Option<String>;
}

/// Severity of a repository log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Recorded in [`ElasticsearchRepository::errors`].
    Error,
    /// Emitted as a trace event only.
    Notice,
}

/// Repository of one entity type over its index.
///
/// Holds query state between calls: [`limit`](Self::limit),
/// [`offset`](Self::offset), [`order_by`](Self::order_by) and aggregations
/// shape the next [`get_results`](Self::get_results). The `find_*` methods
/// reset the state first.
///
/// Write operations report store failures as `Ok(false)` and record the
/// error message; conversion failures are returned as errors.
pub struct ElasticsearchRepository<T> {
    class: String,
    index: Index,
    transformer: Arc<dyn DataTransformer>,
    query: Query,
    errors: Vec<String>,
    entity: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ElasticsearchRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchRepository")
            .field("class", &self.class)
            .field("index", &self.index.name())
            .field("query", &self.query)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl<T: Reflect + DocumentSupport> ElasticsearchRepository<T> {
    /// Creates a repository, resolving (and if needed creating) the index of `T`.
    pub async fn new(
        index_mapping: &IndexMapping,
        transformer: Arc<dyn DataTransformer>,
    ) -> OdmResult<Self> {
        let index = index_mapping.get_index(T::CLASS).await?;
        Ok(Self::with_index(index, transformer))
    }

    /// Creates a repository over an already resolved index.
    pub fn with_index(index: Index, transformer: Arc<dyn DataTransformer>) -> Self {
        Self {
            class: T::CLASS.to_string(),
            index,
            transformer,
            query: Query::new(),
            errors: Vec::new(),
            entity: PhantomData,
        }
    }

    /// Class of the stored entities.
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Snake-case name derived from the short class name.
    pub fn index_name(&self) -> String {
        index_name_for_class(&self.class)
    }

    /// The resolved index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Current query state.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Replaces the query clause.
    pub fn set_query(&mut self, query: JsonValue) {
        self.query.set_query(query);
    }

    /// Sets the page size of the next search.
    pub fn limit(&mut self, limit: u64) {
        self.query.set_size(limit);
    }

    /// Sets the page offset of the next search.
    pub fn offset(&mut self, offset: u64) {
        self.query.set_from(offset);
    }

    /// Sorts by `field`, ascending unless `direction` is `desc`.
    pub fn order_by(&mut self, field: &str, direction: Option<&str>) {
        let order = direction.map(SortOrder::parse).unwrap_or_default();
        self.query.set_sort(field, order);
    }

    /// Resets the query state.
    pub fn clear(&mut self) {
        self.query = Query::new();
    }

    /// Aggregations of the current query.
    pub fn aggregations(&self) -> &AggregationBuilder {
        self.query.aggregations()
    }

    /// Adds aggregations to the current query.
    pub fn aggregations_mut(&mut self) -> &mut AggregationBuilder {
        self.query.aggregations_mut()
    }

    /// Runs the current query and hydrates the hits.
    pub async fn get_results(&self) -> OdmResult<Vec<T>> {
        let response = self.index.search(&self.query.to_body()).await?;
        response
            .documents
            .into_iter()
            .map(|document| self.reverse_transform(document))
            .collect()
    }

    /// Runs the current query and returns the raw response body.
    pub async fn get_scalar_results(&self) -> OdmResult<JsonValue> {
        let response = self.index.search(&self.query.to_body()).await?;
        Ok(response.raw)
    }

    /// Counts documents matching the current query clause.
    pub async fn get_count(&self) -> OdmResult<u64> {
        self.index.count(self.query.query()).await
    }

    /// Whether the index exists.
    pub async fn exists(&self) -> OdmResult<bool> {
        self.index.exists().await
    }

    /// Fetches an entity by id.
    pub async fn find_by_id(&self, id: &str) -> OdmResult<Option<T>> {
        match self.index.get_document(id).await? {
            Some(document) => self.reverse_transform(document).map(Some),
            None => Ok(None),
        }
    }

    /// Alias of [`find_by_id`](Self::find_by_id).
    pub async fn find(&self, id: &str) -> OdmResult<Option<T>> {
        self.find_by_id(id).await
    }

    /// Fetches every entity of the index.
    pub async fn find_all(&mut self) -> OdmResult<Vec<T>> {
        self.clear();
        let total = self.get_count().await?;
        self.query.set_size(total);
        self.query.set_from(0);
        self.get_results().await
    }

    /// Fetches entities matching `query`.
    ///
    /// `order_by` is `(field, direction)`; the page defaults to
    /// [`DEFAULT_FIND_LIMIT`] entities from offset 0.
    pub async fn find_by(
        &mut self,
        query: JsonValue,
        order_by: Option<(&str, &str)>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> OdmResult<Vec<T>> {
        self.clear();
        self.query.set_query(query);

        if let Some((field, direction)) = order_by {
            let order = if direction == "desc" {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            self.query.set_sort(field, order);
        }

        self.query.set_size(limit.unwrap_or(DEFAULT_FIND_LIMIT));
        self.query.set_from(offset.unwrap_or(0));

        self.get_results().await
    }

    /// First entity matching `query`.
    pub async fn find_one_by(&mut self, query: JsonValue) -> OdmResult<Option<T>> {
        self.clear();
        self.query.set_query(query);

        let response = self.index.search(&self.query.to_body()).await?;
        match response.documents.into_iter().next() {
            Some(document) => self.reverse_transform(document).map(Some),
            None => Ok(None),
        }
    }

    /// Updates the document of `object` when it exists, inserts it otherwise.
    pub async fn save(&mut self, object: &T) -> OdmResult<bool> {
        let id = self.require_id(object)?;
        if self.index.has_document(&id).await? {
            return self.update(object).await;
        }
        self.insert(object).await
    }

    /// Indexes `object` as a new document.
    pub async fn insert(&mut self, object: &T) -> OdmResult<bool> {
        let document = self.transform_to_document(object)?;
        let id = document.id.clone();
        let result = self.index.add_document(document).await;
        self.record("insert", &id, result)
    }

    /// Updates the document of `object`.
    pub async fn update(&mut self, object: &T) -> OdmResult<bool> {
        let document = self.transform_to_document(object)?;
        let id = document.id.clone();
        let result = self.index.update_document(document).await;
        self.record("update", &id, result)
    }

    /// Deletes the document of `object`.
    pub async fn delete(&mut self, object: &T) -> OdmResult<bool> {
        let id = self.require_id(object)?;
        let result = self.index.delete_document(&id).await;
        self.record("delete", &id, result)
    }

    /// Indexes `objects` in bulk and refreshes the index.
    pub async fn batch_insert(&mut self, objects: &[T]) -> OdmResult<bool> {
        let documents = objects
            .iter()
            .map(|object| self.transform_to_document(object))
            .collect::<OdmResult<Vec<_>>>()?;
        let count = documents.len();

        let result = self.index.add_documents(documents).await;
        if !self.record("batch insert", &format!("{} documents", count), result)? {
            return Ok(false);
        }

        let name = self.index.name().to_string();
        let result = self.index.refresh().await;
        self.record("refresh", &name, result)
    }

    /// Converts `object` into a document; the object must have an id.
    pub fn transform_to_document(&self, object: &T) -> OdmResult<Document> {
        let id = self.require_id(object)?;
        let source = self.transformer.transform(object)?;
        if !source.is_object() {
            return Err(TransformError::failed(format!(
                "object of class {} was not converted to a document, please check its config",
                self.class
            ))
            .into());
        }
        Ok(Document::new(id, source))
    }

    /// Hydrates a new entity from a document.
    pub fn reverse_transform(&self, document: Document) -> OdmResult<T> {
        if !document.source.is_object() {
            return Err(TransformError::failed(format!(
                "document {} of class {} has no source fields",
                document.id, self.class
            ))
            .into());
        }

        let object = self
            .transformer
            .reverse_transform(document.source, Some(Box::new(T::default())))?;
        let actual = object.class_name().to_string();
        object
            .into_any()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                TransformError::failed(format!(
                    "document was hydrated as {} instead of {}",
                    actual, self.class
                ))
                .into()
            })
    }

    /// Error messages recorded by failed writes.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Records a message; only errors are kept.
    pub fn log(&mut self, message: impl Into<String>, kind: LogKind) {
        let message = message.into();
        match kind {
            LogKind::Error => self.errors.push(message),
            LogKind::Notice => tracing::debug!(class = %self.class, "{}", message),
        }
    }

    fn require_id(&self, object: &T) -> OdmResult<String> {
        object.document_id().ok_or_else(|| {
            TransformError::failed(format!("object of class {} must have an id", self.class))
                .into()
        })
    }

    /// Turns a write outcome into the boolean result, logging store failures.
    fn record(
        &mut self,
        operation: &str,
        target: &str,
        result: OdmResult<ClientResponse>,
    ) -> OdmResult<bool> {
        let message = match result {
            Ok(response) if response.is_ok() => return Ok(true),
            Ok(response) => response.error_message().to_string(),
            Err(OdmError::Store(err)) => err.to_string(),
            Err(err) => return Err(err),
        };

        tracing::warn!(
            class = %self.class,
            index = %self.index.name(),
            operation,
            target,
            error = %message,
            "Repository write failed"
        );
        self.log(message, LogKind::Error);
        Ok(false)
    }
}

/// Snake-case index name of a class: the short name with an underscore
/// before each capital run, lowercased.
///
/// A run of capitals stays together, except for a capital that starts a
/// lowercase word (`HTTPServer` becomes `http_server`).
pub fn index_name_for_class(class: &str) -> String {
    let short = class.rsplit("::").next().unwrap_or(class);
    let chars: Vec<char> = short.chars().collect();

    let mut out = String::with_capacity(short.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if !c.is_ascii_uppercase() {
            out.push(c);
            continue;
        }

        out.push('_');
        out.push(c);
        while i < chars.len()
            && chars[i].is_ascii_uppercase()
            && !chars.get(i + 1).is_some_and(char::is_ascii_lowercase)
        {
            out.push(chars[i]);
            i += 1;
        }
    }

    out.trim_start_matches('_').to_lowercase()
}
