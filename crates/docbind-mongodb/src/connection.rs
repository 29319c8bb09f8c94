//! MongoDB connection management with pool configuration and health checking

use bson::{doc, Document as BsonDocument};
use docbind_common::{DocbindError, Result};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// First path segment after the host list, query string excluded
static DATABASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^:/]+://[^/]+/(?P<db>[^/?]+)").expect("database name pattern is valid")
});

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool (default: 0)
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool (default: 10)
    pub max_pool_size: Option<u32>,
    /// Maximum time a connection can remain idle before being closed (default: none)
    pub max_idle_time: Option<Duration>,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout (default: 30s)
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: Some(0),
            max_pool_size: Some(10),
            max_idle_time: None,
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            app_name: Some("docbind".to_string()),
        }
    }
}

impl PoolConfig {
    fn apply(self, options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time {
            options.max_idle_time = Some(idle);
        }
        if let Some(connect) = self.connect_timeout {
            options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = self.server_selection_timeout {
            options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = self.app_name {
            options.app_name = Some(app);
        }
    }
}

/// Database name selected by a connection URL
///
/// The path segment after the host list (query string excluded); `""` when absent.
pub fn database_name_from_url(url: &str) -> &str {
    DATABASE_RE
        .captures(url)
        .and_then(|caps| caps.name("db"))
        .map(|m| m.as_str())
        .unwrap_or("")
}

/// MongoDB client plus the database named by the connection URL
pub struct Connection {
    client: Client,
    database: Database,
    database_name: String,
    url: String,
}

impl Connection {
    /// Create a new MongoDB connection with default pool settings
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_config(url, PoolConfig::default()).await
    }

    /// Create a new MongoDB connection with custom pool configuration
    ///
    /// The driver connects lazily; no server round-trip happens here.
    pub async fn with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let mut client_options = ClientOptions::parse(url).await?;
        config.apply(&mut client_options);

        // Set stable API version for compatibility
        let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
        client_options.server_api = Some(server_api);

        let client = Client::with_options(client_options)?;

        let database_name = database_name_from_url(url).to_string();
        let database = client.database(&database_name);
        info!(database = %database_name, "MongoDB client created");

        Ok(Self {
            client,
            database,
            database_name,
            url: url.to_string(),
        })
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Get a reference to the client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a collection by name (returns untyped BsonDocument collection)
    pub fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Check if the connection is healthy by pinging the server
    pub async fn ping(&self) -> Result<bool> {
        match self.database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => Ok(true),
            Err(e) => Err(DocbindError::Connection(format!("Ping failed: {}", e))),
        }
    }

    /// Get server status information
    pub async fn server_status(&self) -> Result<BsonDocument> {
        let result = self
            .database
            .run_command(doc! { "serverStatus": 1 })
            .await?;
        Ok(result)
    }

    /// List all collection names in the current database
    pub async fn list_collection_names(&self) -> Result<Vec<String>> {
        let names = self.database.list_collection_names().await?;
        Ok(names)
    }

    /// Check whether exactly one collection with this name exists
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        let names = self
            .database
            .list_collection_names()
            .filter(doc! { "name": name })
            .await?;
        debug!(collection = name, found = names.len(), "Collection lookup");
        Ok(names.len() == 1)
    }
}

static GLOBAL_CONNECTION: Lazy<OnceCell<Arc<Connection>>> = Lazy::new(OnceCell::new);

/// Process-wide connection
///
/// The first call creates the connection; concurrent first callers share a
/// single initialization. Later calls with the same URL return the same
/// handle.
///
/// # Errors
/// Returns `Connection` when called with a URL other than the one the
/// process-wide connection was created with.
pub async fn connect(url: &str) -> Result<Arc<Connection>> {
    let conn = GLOBAL_CONNECTION
        .get_or_try_init(|| async { Connection::new(url).await.map(Arc::new) })
        .await?;

    if conn.url != url {
        return Err(DocbindError::Connection(
            "Global connection already initialized with a different URL".to_string(),
        ));
    }
    Ok(conn.clone())
}

/// The process-wide connection, if [`connect`] has succeeded
pub fn global_connection() -> Option<Arc<Connection>> {
    GLOBAL_CONNECTION.get().cloned()
}
