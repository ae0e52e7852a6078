//! Repository query state.

use serde_json::{Map, Value as JsonValue, json};

/// Sort direction of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortOrder {
    /// Parses a direction; anything but `desc` (any case) is ascending.
    pub fn parse(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }

    /// Query DSL name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Metric aggregations attached to a query.
///
/// Each helper registers the aggregation under a reference name, which
/// defaults to the field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationBuilder {
    aggregations: Map<String, JsonValue>,
}

impl AggregationBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `sum` aggregation over `field`.
    pub fn add_sum(&mut self, field: &str, reference: Option<&str>) -> &mut Self {
        self.add("sum", field, reference)
    }

    /// Adds a `max` aggregation over `field`.
    pub fn add_max(&mut self, field: &str, reference: Option<&str>) -> &mut Self {
        self.add("max", field, reference)
    }

    /// Adds a `min` aggregation over `field`.
    pub fn add_min(&mut self, field: &str, reference: Option<&str>) -> &mut Self {
        self.add("min", field, reference)
    }

    /// Adds an `avg` aggregation over `field`.
    pub fn add_average(&mut self, field: &str, reference: Option<&str>) -> &mut Self {
        self.add("avg", field, reference)
    }

    fn add(&mut self, kind: &str, field: &str, reference: Option<&str>) -> &mut Self {
        let name = reference.unwrap_or(field).to_string();
        self.aggregations
            .insert(name, json!({ kind: { "field": field } }));
        self
    }

    /// Whether no aggregation was added.
    pub fn is_empty(&self) -> bool {
        self.aggregations.is_empty()
    }

    /// Number of aggregations.
    pub fn len(&self) -> usize {
        self.aggregations.len()
    }

    /// The aggregation declarations, keyed by reference name.
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.aggregations
    }
}

/// Search request under construction: query clause, paging, sort and
/// aggregations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    query: Option<JsonValue>,
    size: Option<u64>,
    from: Option<u64>,
    sort: Vec<(String, SortOrder)>,
    aggregations: AggregationBuilder,
}

impl Query {
    /// An empty query matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query clause.
    pub fn set_query(&mut self, query: JsonValue) {
        self.query = Some(query);
    }

    /// The query clause.
    pub fn query(&self) -> Option<&JsonValue> {
        self.query.as_ref()
    }

    /// Sets the page size.
    pub fn set_size(&mut self, size: u64) {
        self.size = Some(size);
    }

    /// The page size.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Sets the page offset.
    pub fn set_from(&mut self, from: u64) {
        self.from = Some(from);
    }

    /// The page offset.
    pub fn from(&self) -> Option<u64> {
        self.from
    }

    /// Replaces the sort with a single field.
    pub fn set_sort(&mut self, field: impl Into<String>, order: SortOrder) {
        self.sort = vec![(field.into(), order)];
    }

    /// The sort fields.
    pub fn sort(&self) -> &[(String, SortOrder)] {
        &self.sort
    }

    /// Aggregations of the query.
    pub fn aggregations(&self) -> &AggregationBuilder {
        &self.aggregations
    }

    /// Mutable aggregations of the query.
    pub fn aggregations_mut(&mut self) -> &mut AggregationBuilder {
        &mut self.aggregations
    }

    /// Renders the search request body.
    pub fn to_body(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert(
            "query".to_string(),
            self.query.clone().unwrap_or_else(|| json!({ "match_all": {} })),
        );
        if let Some(size) = self.size {
            body.insert("size".to_string(), size.into());
        }
        if let Some(from) = self.from {
            body.insert("from".to_string(), from.into());
        }
        if !self.sort.is_empty() {
            let sort = self
                .sort
                .iter()
                .map(|(field, order)| json!({ field.as_str(): order.as_str() }))
                .collect();
            body.insert("sort".to_string(), JsonValue::Array(sort));
        }
        if !self.aggregations.is_empty() {
            body.insert(
                "aggs".to_string(),
                JsonValue::Object(self.aggregations.as_map().clone()),
            );
        }
        JsonValue::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_matches_all() {
        assert_eq!(Query::new().to_body(), json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn test_query_body() {
        let mut query = Query::new();
        query.set_query(json!({"term": {"name": "x"}}));
        query.set_size(5);
        query.set_from(10);
        query.set_sort("price", SortOrder::parse("DESC"));

        assert_eq!(
            query.to_body(),
            json!({
                "query": {"term": {"name": "x"}},
                "size": 5,
                "from": 10,
                "sort": [{"price": "desc"}]
            })
        );
    }

    #[test]
    fn test_aggregation_reference_defaults_to_field() {
        let mut query = Query::new();
        query
            .aggregations_mut()
            .add_sum("price", None)
            .add_average("price", Some("avg_price"))
            .add_max("stock", None)
            .add_min("stock", Some("lowest"));

        assert_eq!(query.aggregations().len(), 4);
        assert_eq!(
            query.to_body()["aggs"],
            json!({
                "price": {"sum": {"field": "price"}},
                "avg_price": {"avg": {"field": "price"}},
                "stock": {"max": {"field": "stock"}},
                "lowest": {"min": {"field": "stock"}}
            })
        );
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Asc);
    }
}
