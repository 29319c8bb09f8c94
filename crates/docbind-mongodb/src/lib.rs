//! MongoDB repositories for docbind
//!
//! Connects to a database, binds repositories to collections and hands raw
//! documents to [`docbind_mapper`] to produce typed entities.
//!
//! # Features
//! - Explicit [`Connection`] handles, plus an idempotent process-wide [`connect`]
//! - Repositories with fluent filter and sort state
//! - Streaming and random-sample reads
//! - Filter validation against server-side JavaScript operators

pub mod connection;
pub mod query;
pub mod repository;
pub mod store;
pub mod validation;

pub use connection::{connect, database_name_from_url, global_connection, Connection, PoolConfig};
pub use docbind_common::{DocbindError, Result};
pub use query::{QueryBuilder, SortDirection};
pub use repository::{collection_name, Repository, RepositoryConfig, RepositoryModel};
pub use store::{id_filter, DocumentStore, FindParams, MongoStore};
pub use validation::{
    parse_object_id, validate_document, validate_pipeline, validate_query,
    ValidatedCollectionName,
};
