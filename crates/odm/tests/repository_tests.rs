//! Index lifecycle and repository behaviour over the in-memory store.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{
    Book, FakeObject, FakeObjectRepository, FakeObjectWithRelatedObject, index_mapping,
    init_tracing, repository_factory,
};
use helios_odm::reflect::Reflect;
use helios_odm::repository::{ElasticsearchRepository, LogKind};
use helios_odm::{
    IndexError, MetadataError, OdmError, SearchClient, TransformError,
};

async fn book_repository() -> (Arc<helios_odm::InMemoryClient>, ElasticsearchRepository<Book>) {
    let (client, mapping) = index_mapping(false);
    let repository = ElasticsearchRepository::<Book>::new(&mapping, Arc::new(common::transformer()))
        .await
        .unwrap();
    (client, repository)
}

async fn seeded_books() -> (Arc<helios_odm::InMemoryClient>, ElasticsearchRepository<Book>) {
    let (client, mut repository) = book_repository().await;
    let books = vec![
        Book::new("b1", "Dune", 9.5, 3),
        Book::new("b2", "Dune Messiah", 7.0, 0),
        Book::new("b3", "Hyperion", 12.0, 8),
        Book::new("b4", "Solaris", 5.5, 1),
    ];
    assert!(repository.batch_insert(&books).await.unwrap());
    (client, repository)
}

#[tokio::test]
async fn test_get_index_creates_index_alias_and_mapping() {
    init_tracing();
    let (client, mapping) = index_mapping(false);

    let index = mapping.get_index(Book::CLASS).await.unwrap();
    assert_eq!(index.name(), "book");
    assert!(index.exists().await.unwrap());
    assert_eq!(client.alias_target("books").as_deref(), Some("book"));
    assert_eq!(
        client.index_settings("book"),
        Some(json!({"number_of_shards": 1, "number_of_replicas": 0}))
    );

    let remote = client.get_mapping("book").await.unwrap();
    assert_eq!(remote["title"], json!({"type": "text"}));
    assert_eq!(remote["published"], json!({"type": "date", "format": "epoch_millis"}));
}

#[tokio::test]
async fn test_get_index_is_cached() {
    let (client, mapping) = index_mapping(false);
    mapping.get_index(Book::CLASS).await.unwrap();
    mapping.get_index(Book::CLASS).await.unwrap();
    assert_eq!(client.index_names(), vec!["book".to_string()]);
}

#[tokio::test]
async fn test_get_index_in_test_environment() {
    let (client, mapping) = index_mapping(true);

    let index = mapping.get_index(Book::CLASS).await.unwrap();
    assert_eq!(index.name(), "book_test");
    assert_eq!(client.alias_target("books_test").as_deref(), Some("book_test"));

    let alias = mapping.get_index_alias(Book::CLASS).await.unwrap().unwrap();
    assert_eq!(alias.name(), "books_test");
}

#[tokio::test]
async fn test_existing_index_with_same_mapping_is_reused() {
    let (client, mapping) = index_mapping(false);
    mapping.get_index(Book::CLASS).await.unwrap();

    let second = helios_odm::IndexMapping::new(client.clone(), common::metadata_factory(), false);
    let index = second.get_index(Book::CLASS).await.unwrap();
    assert_eq!(index.name(), "book");
}

#[tokio::test]
async fn test_mapping_drift_is_unsupported() {
    let (client, mapping) = index_mapping(false);
    client.create_index("book", &json!({})).await.unwrap();
    client
        .put_mapping("book", &json!({"title": {"type": "keyword"}}))
        .await
        .unwrap();

    let err = mapping.get_index(Book::CLASS).await.unwrap_err();
    match err {
        OdmError::Index(IndexError::UnsupportedMigration { index, diff }) => {
            assert_eq!(index, "book");
            assert!(diff.contains("title"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_object_properties_map_recursively() {
    let (client, mapping) = index_mapping(false);
    mapping
        .get_index(FakeObjectWithRelatedObject::CLASS)
        .await
        .unwrap();

    let remote = client
        .get_mapping("fake_object_with_related_object")
        .await
        .unwrap();
    assert_eq!(
        remote,
        json!({
            "name": {"type": "keyword"},
            "caught": {"type": "boolean"},
            "child": {"type": "object", "properties": {"name": {"type": "keyword"}}}
        })
    );
}

#[tokio::test]
async fn test_missing_index_config() {
    let client = Arc::new(helios_odm::InMemoryClient::new());
    let mapping = helios_odm::IndexMapping::new(
        client,
        common::metadata_factory_in("noIndex"),
        false,
    );

    let err = mapping.get_index(FakeObject::CLASS).await.unwrap_err();
    assert!(matches!(
        err,
        OdmError::Metadata(MetadataError::MissingIndexConfig { .. })
    ));
}

#[tokio::test]
async fn test_save_inserts_then_updates() {
    let (client, mut repository) = book_repository().await;
    let mut book = Book::new("b1", "Dune", 9.5, 3);

    assert!(repository.save(&book).await.unwrap());
    assert_eq!(client.document_count("book"), 1);

    book.stock = 2;
    assert!(repository.save(&book).await.unwrap());
    assert_eq!(client.document_count("book"), 1);

    let found = repository.find_by_id("b1").await.unwrap().unwrap();
    assert_eq!(found.stock, 2);
    assert!(repository.errors().is_empty());
}

#[tokio::test]
async fn test_find_missing_document() {
    let (_client, repository) = book_repository().await;
    assert!(repository.find("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete() {
    let (client, mut repository) = seeded_books().await;
    let book = Book::new("b2", "", 0.0, 0);

    assert!(repository.delete(&book).await.unwrap());
    assert_eq!(client.document_count("book"), 3);

    assert!(!repository.delete(&book).await.unwrap());
    assert_eq!(repository.errors().len(), 1);
    assert!(repository.errors()[0].contains("document missing"));
}

#[tokio::test]
async fn test_update_missing_document_is_logged() {
    let (_client, mut repository) = book_repository().await;
    let book = Book::new("ghost", "Nobody", 1.0, 1);

    assert!(!repository.update(&book).await.unwrap());
    assert_eq!(repository.errors().len(), 1);
}

#[tokio::test]
async fn test_read_only_store_reports_failure() {
    let (client, mut repository) = book_repository().await;
    client.set_read_only(true);

    assert!(!repository.insert(&Book::new("b1", "Dune", 9.5, 3)).await.unwrap());
    assert!(!repository.batch_insert(&[Book::new("b2", "Emma", 4.0, 1)]).await.unwrap());
    assert_eq!(repository.errors().len(), 2);
    assert!(repository.errors().iter().all(|e| e.contains("blocked by")));
    assert_eq!(client.document_count("book"), 0);
}

#[tokio::test]
async fn test_object_without_id_is_rejected() {
    let (_client, mut repository) = book_repository().await;
    let err = repository
        .insert(&Book::new("", "Untitled", 1.0, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, OdmError::Transform(TransformError::Failed { .. })));
    assert!(err.to_string().contains("must have an id"));
    assert!(repository.errors().is_empty());
}

#[tokio::test]
async fn test_find_all() {
    let (_client, mut repository) = seeded_books().await;
    let books = repository.find_all().await.unwrap();
    assert_eq!(books.len(), 4);
}

#[tokio::test]
async fn test_find_by_with_order_and_paging() {
    let (_client, mut repository) = seeded_books().await;

    let books = repository
        .find_by(json!({"match": {"title": "dune"}}), Some(("price", "desc")), None, None)
        .await
        .unwrap();
    let ids: Vec<&str> = books.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b1", "b2"]);

    let books = repository
        .find_by(json!({"match_all": {}}), Some(("price", "asc")), Some(2), Some(1))
        .await
        .unwrap();
    let ids: Vec<&str> = books.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b2", "b1"]);
}

#[tokio::test]
async fn test_find_one_by() {
    let (_client, mut repository) = seeded_books().await;

    let book = repository
        .find_one_by(json!({"term": {"id": "b3"}}))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(book.title, "Hyperion");

    assert!(
        repository
            .find_one_by(json!({"term": {"id": "b9"}}))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_query_state_and_count() {
    let (_client, mut repository) = seeded_books().await;

    repository.set_query(json!({"range": {"stock": {"gte": 1}}}));
    repository.order_by("stock", None);
    repository.limit(2);
    repository.offset(0);

    assert_eq!(repository.get_count().await.unwrap(), 3);
    let books = repository.get_results().await.unwrap();
    let ids: Vec<&str> = books.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["b4", "b1"]);

    repository.clear();
    assert_eq!(repository.get_count().await.unwrap(), 4);
    assert!(repository.exists().await.unwrap());
}

#[tokio::test]
async fn test_aggregations() {
    let (_client, mut repository) = seeded_books().await;

    repository
        .aggregations_mut()
        .add_sum("stock", None)
        .add_max("price", Some("top_price"))
        .add_min("price", Some("low_price"))
        .add_average("stock", Some("avg_stock"));
    repository.limit(0);

    let raw = repository.get_scalar_results().await.unwrap();
    let aggregations = &raw["aggregations"];
    assert_eq!(aggregations["stock"]["value"], json!(12.0));
    assert_eq!(aggregations["top_price"]["value"], json!(12.0));
    assert_eq!(aggregations["low_price"]["value"], json!(5.5));
    assert_eq!(aggregations["avg_stock"]["value"], json!(3.0));
    assert_eq!(raw["hits"]["hits"], json!([]));
}

#[tokio::test]
async fn test_log_keeps_errors_only() {
    let (_client, mut repository) = book_repository().await;
    repository.log("just saying", LogKind::Notice);
    repository.log("something broke", LogKind::Error);
    assert_eq!(repository.errors(), ["something broke".to_string()]);
}

#[tokio::test]
async fn test_related_objects_survive_storage() {
    let (_client, factory) = repository_factory();
    let repository = factory
        .repository::<FakeObjectWithRelatedObject>()
        .await
        .unwrap();
    let mut repository = repository.lock().await;

    let mut object = FakeObjectWithRelatedObject {
        name: "Pat".to_string(),
        child: Some(FakeObject::named("Pat Junior")),
        ..FakeObjectWithRelatedObject::default()
    };
    object.children = vec![FakeObject::named("Pat Junior 2")];

    assert!(repository.save(&object).await.unwrap());
    let stored = repository.find_by_id("30").await.unwrap().unwrap();
    assert_eq!(stored.child, object.child);
    assert_eq!(stored.children, object.children);
}

#[tokio::test]
async fn test_factory_caches_repositories() {
    let (client, factory) = repository_factory();

    let first = factory.repository::<Book>().await.unwrap();
    let second = factory.repository::<Book>().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(client.index_names(), vec!["book".to_string()]);
}

#[tokio::test]
async fn test_factory_rejects_unconfigured_class() {
    #[derive(Debug, Clone, Default)]
    struct Stray;

    impl Reflect for Stray {
        const CLASS: &'static str = "fixture::Stray";

        fn shape() -> helios_odm::ClassShape {
            helios_odm::ClassShape::builder::<Self>().build()
        }
    }

    impl helios_odm::DocumentSupport for Stray {
        fn document_id(&self) -> Option<String> {
            None
        }
    }

    let (_client, factory) = repository_factory();
    let err = factory.repository::<Stray>().await.unwrap_err();
    assert!(err.to_string().contains("no metadata config was found"));
}

#[tokio::test]
async fn test_custom_repository() {
    let (_client, factory) = repository_factory();

    let shared = factory
        .custom_repository::<FakeObject, FakeObjectRepository>()
        .await
        .unwrap();
    let again = factory
        .custom_repository::<FakeObject, FakeObjectRepository>()
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&shared, &again));

    let mut repository = shared.lock().await;
    assert_eq!(repository.inner.index_name(), "fake_object");
    assert!(repository.inner.save(&FakeObject::named("bob")).await.unwrap());
    assert_eq!(repository.find_by_wife("nobody").await.unwrap().len(), 0);
}

#[tokio::test]
async fn test_custom_repository_name_must_match() {
    #[derive(Debug)]
    struct Impostor;

    impl helios_odm::repository::CustomRepository<Book> for Impostor {
        const NAME: &'static str = "BookRepository";

        fn from_repository(_repository: ElasticsearchRepository<Book>) -> Self {
            Impostor
        }
    }

    let (_client, factory) = repository_factory();
    let err = factory
        .custom_repository::<Book, Impostor>()
        .await
        .unwrap_err();
    assert!(matches!(err, OdmError::Metadata(MetadataError::Config { .. })));
}
