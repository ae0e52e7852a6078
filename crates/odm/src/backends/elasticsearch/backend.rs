//! Connection settings for the document store and the client built from
//! them.

use std::fmt::Debug;
use std::time::Duration;

use elasticsearch::Elasticsearch;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::Url;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{OdmResult, StoreError};

/// Credentials presented to the cluster on every repository request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// HTTP basic credentials.
    Basic {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// API or service token sent as a bearer header.
    Bearer {
        /// Token value.
        token: String,
    },
}

/// The `elasticsearch` section of the mapper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Cluster node URLs. Requests go to the first one.
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Credentials, when the cluster requires them.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Accept any server certificate. Local clusters only.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

const DEFAULT_NODE: &str = "http://localhost:9200";

fn default_nodes() -> Vec<String> {
    vec![DEFAULT_NODE.to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

impl ElasticsearchConfig {
    fn node_url(&self) -> Result<Url, StoreError> {
        let node = self.nodes.first().map(String::as_str).unwrap_or(DEFAULT_NODE);
        node.parse().map_err(|e| StoreError::ConnectionFailed {
            message: format!("Invalid URL {}: {}", node, e),
        })
    }

    fn credentials(&self) -> Option<Credentials> {
        self.auth.as_ref().map(|auth| match auth {
            ElasticsearchAuth::Basic { username, password } => {
                Credentials::Basic(username.clone(), password.clone())
            }
            ElasticsearchAuth::Bearer { token } => Credentials::Bearer(token.clone()),
        })
    }
}

/// Store client that repositories and index mappings talk to when backed by
/// a live cluster.
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Elasticsearch,
    config: ElasticsearchConfig,
}

impl Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("nodes", &self.config.nodes)
            .field("request_timeout_ms", &self.config.request_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchClient {
    /// Connects to the cluster described by `config`.
    pub fn new(config: ElasticsearchConfig) -> OdmResult<Self> {
        let client = connect(&config)?;
        tracing::debug!(nodes = ?config.nodes, "Store client configured");
        Ok(Self { client, config })
    }

    /// Uses a client the caller has already set up.
    pub fn from_client(client: Elasticsearch, config: ElasticsearchConfig) -> Self {
        Self { client, config }
    }

    pub(crate) fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Settings the client was built from.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }
}

fn connect(config: &ElasticsearchConfig) -> Result<Elasticsearch, StoreError> {
    let pool = SingleNodeConnectionPool::new(config.node_url()?);
    let mut transport =
        TransportBuilder::new(pool).timeout(Duration::from_millis(config.request_timeout_ms));

    if config.disable_certificate_validation {
        transport = transport.cert_validation(CertificateValidation::None);
    }
    if let Some(credentials) = config.credentials() {
        transport = transport.auth(credentials);
    }

    let transport = transport.build().map_err(|e| StoreError::ConnectionFailed {
        message: format!("Failed to build transport: {}", e),
    })?;
    Ok(Elasticsearch::new(transport))
}
