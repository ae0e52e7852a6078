//! Shared fixtures for the mapper integration tests.
//!
//! Fixture classes live under the `fixture` namespace; their metadata is read
//! from `tests/fixtures/config`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use helios_odm::metadata::FileLocator;
use helios_odm::reflect::{ClassShape, Reflect, TypeRegistry, Visibility};
use helios_odm::repository::{CustomRepository, DocumentSupport, ElasticsearchRepository};
use helios_odm::{
    DataNavigator, ElasticsearchTransformer, InMemoryClient, IndexMapping, MetadataFactory,
    RepositoryFactory, Value, YamlDriver,
};

/// Directory holding the fixture metadata.
pub fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/config")
}

/// Initializes tracing output for a test run; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A person with a spouse and something to hide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeObject {
    pub name: String,
    pub wife_name: Option<String>,
    pub mistress_name: Option<String>,
    pub caught: bool,
}

impl FakeObject {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Reflect for FakeObject {
    const CLASS: &'static str = "fixture::FakeObject";

    fn shape() -> ClassShape {
        ClassShape::builder::<Self>()
            .property(
                "name",
                Visibility::Public,
                |o| Value::from(o.name.clone()),
                |o, v| {
                    o.name = v.into_opt_string()?.unwrap_or_default();
                    Ok(())
                },
            )
            .doc("/** @var string */")
            .property(
                "wifeName",
                Visibility::Protected,
                |o| Value::from(o.wife_name.clone()),
                |o, v| {
                    o.wife_name = v.into_opt_string()?;
                    Ok(())
                },
            )
            .doc("/** @var string */")
            .property(
                "mistressName",
                Visibility::Private,
                |o| Value::from(o.mistress_name.clone()),
                |o, v| {
                    o.mistress_name = v.into_opt_string()?;
                    Ok(())
                },
            )
            .property(
                "caught",
                Visibility::Private,
                |o| Value::from(o.caught),
                |o, v| {
                    o.caught = v.into_bool()?;
                    Ok(())
                },
            )
            .doc("/** @var boolean */")
            .getter("getWifeName", Visibility::Public, |o| {
                Value::from(o.wife_name.clone())
            })
            .setter("setWifeName", Visibility::Public, |o, v| {
                o.wife_name = v.into_opt_string()?;
                Ok(())
            })
            .getter("getMistressName", Visibility::Public, |o| {
                Value::from(o.mistress_name.clone())
            })
            .setter("setMistressName", Visibility::Public, |o, v| {
                o.mistress_name = v.into_opt_string()?;
                Ok(())
            })
            .setter("setCaught", Visibility::Public, |o, v| {
                o.caught = v.into_bool()?;
                Ok(())
            })
            .getter("isCaught", Visibility::Public, |o| Value::from(o.caught))
            .build()
    }
}

impl DocumentSupport for FakeObject {
    fn document_id(&self) -> Option<String> {
        (!self.name.is_empty()).then(|| self.name.clone())
    }
}

/// A [`FakeObject`] with relatives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeObjectWithRelatedObject {
    pub name: String,
    pub wife_name: Option<String>,
    pub mistress_name: Option<String>,
    pub caught: bool,
    pub child: Option<FakeObject>,
    pub children: Vec<FakeObject>,
}

impl Reflect for FakeObjectWithRelatedObject {
    const CLASS: &'static str = "fixture::FakeObjectWithRelatedObject";

    fn shape() -> ClassShape {
        ClassShape::builder::<Self>()
            .property(
                "name",
                Visibility::Public,
                |o| Value::from(o.name.clone()),
                |o, v| {
                    o.name = v.into_opt_string()?.unwrap_or_default();
                    Ok(())
                },
            )
            .property(
                "wifeName",
                Visibility::Protected,
                |o| Value::from(o.wife_name.clone()),
                |o, v| {
                    o.wife_name = v.into_opt_string()?;
                    Ok(())
                },
            )
            .property(
                "mistressName",
                Visibility::Private,
                |o| Value::from(o.mistress_name.clone()),
                |o, v| {
                    o.mistress_name = v.into_opt_string()?;
                    Ok(())
                },
            )
            .property(
                "caught",
                Visibility::Private,
                |o| Value::from(o.caught),
                |o, v| {
                    o.caught = v.into_bool()?;
                    Ok(())
                },
            )
            .property(
                "child",
                Visibility::Protected,
                |o| Value::opt_object(o.child.clone()),
                |o, v| {
                    o.child = v.into_opt_entity()?;
                    Ok(())
                },
            )
            .doc("/** @var FakeObject */")
            .property(
                "children",
                Visibility::Protected,
                |o| Value::objects(o.children.clone()),
                |o, v| {
                    o.children = v.into_entity_vec()?;
                    Ok(())
                },
            )
            .doc("/** @var array */")
            .getter("getWifeName", Visibility::Public, |o| {
                Value::from(o.wife_name.clone())
            })
            .getter("getChild", Visibility::Public, |o| {
                Value::opt_object(o.child.clone())
            })
            .setter("setChild", Visibility::Public, |o, v| {
                o.child = v.into_opt_entity()?;
                Ok(())
            })
            .getter("getChildren", Visibility::Public, |o| {
                Value::objects(o.children.clone())
            })
            .setter("setChildren", Visibility::Public, |o, v| {
                o.children = v.into_entity_vec()?;
                Ok(())
            })
            .getter("getUnknownChildren", Visibility::Public, |_| Value::from(20))
            .getter("divorceFee", Visibility::Public, |_| Value::from(100))
            .getter("getId", Visibility::Public, |_| Value::from(30))
            .build()
    }
}

impl DocumentSupport for FakeObjectWithRelatedObject {
    fn document_id(&self) -> Option<String> {
        Some("30".to_string())
    }
}

/// A catalogue entry with numeric and date fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub stock: i64,
    pub published: Option<DateTime<Utc>>,
}

impl Book {
    pub fn new(id: &str, title: &str, price: f64, stock: i64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            price,
            stock,
            published: None,
        }
    }
}

impl Reflect for Book {
    const CLASS: &'static str = "fixture::Book";

    fn shape() -> ClassShape {
        ClassShape::builder::<Self>()
            .property(
                "id",
                Visibility::Private,
                |b| Value::from(b.id.clone()),
                |b, v| {
                    b.id = v.into_string()?;
                    Ok(())
                },
            )
            .property(
                "title",
                Visibility::Private,
                |b| Value::from(b.title.clone()),
                |b, v| {
                    b.title = v.into_string()?;
                    Ok(())
                },
            )
            .property(
                "price",
                Visibility::Private,
                |b| Value::from(b.price),
                |b, v| {
                    b.price = v.into_f64()?;
                    Ok(())
                },
            )
            .property(
                "stock",
                Visibility::Private,
                |b| Value::from(b.stock),
                |b, v| {
                    b.stock = v.into_i64()?;
                    Ok(())
                },
            )
            .property(
                "published",
                Visibility::Private,
                |b| Value::from(b.published),
                |b, v| {
                    b.published = v.into_opt_datetime()?;
                    Ok(())
                },
            )
            .build()
    }
}

impl DocumentSupport for Book {
    fn document_id(&self) -> Option<String> {
        (!self.id.is_empty()).then(|| self.id.clone())
    }
}

/// Custom repository bound to [`FakeObject`] by its metadata.
#[derive(Debug)]
pub struct FakeObjectRepository {
    pub inner: ElasticsearchRepository<FakeObject>,
}

impl CustomRepository<FakeObject> for FakeObjectRepository {
    const NAME: &'static str = "FakeObjectRepository";

    fn from_repository(repository: ElasticsearchRepository<FakeObject>) -> Self {
        Self { inner: repository }
    }
}

impl FakeObjectRepository {
    /// Finds the people whose wife has the given name.
    pub async fn find_by_wife(&mut self, wife: &str) -> helios_odm::OdmResult<Vec<FakeObject>> {
        self.inner
            .find_by(serde_json::json!({"term": {"wifeName": wife}}), None, None, None)
            .await
    }
}

/// Registry holding every fixture class.
pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new()
            .with::<FakeObject>()
            .with::<FakeObjectWithRelatedObject>()
            .with::<Book>(),
    )
}

/// Metadata factory over a fixture config directory (relative to
/// `tests/fixtures/config`; empty for the directory itself).
pub fn metadata_factory_in(subdirectory: &str) -> Arc<MetadataFactory> {
    let locator = FileLocator::new().with_directory("fixture", config_dir().join(subdirectory));
    Arc::new(MetadataFactory::new(registry(), YamlDriver::new(locator)))
}

/// Metadata factory over the default fixture config.
pub fn metadata_factory() -> Arc<MetadataFactory> {
    metadata_factory_in("")
}

/// Transformer over the default fixture config.
pub fn transformer() -> ElasticsearchTransformer {
    ElasticsearchTransformer::new(DataNavigator::new(metadata_factory()))
}

/// Index mapping over a fresh in-memory store.
pub fn index_mapping(test_environment: bool) -> (Arc<InMemoryClient>, IndexMapping) {
    let client = Arc::new(InMemoryClient::new());
    let mapping = IndexMapping::new(client.clone(), metadata_factory(), test_environment);
    (client, mapping)
}

/// Repository factory over a fresh in-memory store.
pub fn repository_factory() -> (Arc<InMemoryClient>, RepositoryFactory) {
    let client = Arc::new(InMemoryClient::new());
    let metadata = metadata_factory();
    let transformer = Arc::new(ElasticsearchTransformer::new(DataNavigator::new(
        metadata.clone(),
    )));
    let index_mapping = Arc::new(IndexMapping::new(client.clone(), metadata.clone(), false));
    (
        client,
        RepositoryFactory::new(index_mapping, transformer, metadata),
    )
}
