//! Per-collection repositories returning mapped entities
//!
//! A repository is declared by implementing [`RepositoryModel`] on a marker
//! type; the collection it binds to is that type's short name, lower-cased.
//!
//! ```ignore
//! use docbind_mongodb::{Repository, RepositoryModel, SortDirection};
//!
//! struct Users;
//!
//! impl RepositoryModel for Users {
//!     type Entity = User;
//! }
//!
//! let mut users = Repository::<Users>::new(connection, mapper).await?; // collection "users"
//! let adults = users
//!     .filter(doc! { "age": { "$gte": 18 } })
//!     .order_by("name", SortDirection::Ascending)
//!     .find_all(Some(10), None)
//!     .await?;
//! ```

use bson::{doc, Bson, Document as BsonDocument};
use docbind_common::{DocbindError, Result};
use docbind_mapper::{short_type_name, Entity, Mapper};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::connection::Connection;
use crate::query::{QueryBuilder, SortDirection};
use crate::store::{id_filter, DocumentStore, FindParams, MongoStore};
use crate::validation::{
    parse_object_id, validate_document, validate_pipeline, ValidatedCollectionName,
};

/// Binds a repository type to the entity it returns
pub trait RepositoryModel: Send + Sync + 'static {
    type Entity: Entity;
}

/// Collection bound to a repository model: its short type name, lower-cased
pub fn collection_name<M: RepositoryModel>() -> Result<ValidatedCollectionName> {
    ValidatedCollectionName::new(&short_type_name(std::any::type_name::<M>()).to_lowercase())
}

/// Repository behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Map only declared entity fields (default: true)
    pub strict: bool,
    /// Reject filters and pipelines that run server-side JavaScript (default: false)
    pub validate_queries: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            strict: true,
            validate_queries: false,
        }
    }
}

/// CRUD facade over one collection
///
/// Filter and sort state set through [`filter`](Self::filter) and
/// [`order_by`](Self::order_by) persists across calls until
/// [`reset`](Self::reset).
pub struct Repository<M: RepositoryModel, S: DocumentStore = MongoStore> {
    store: S,
    mapper: Mapper,
    query: QueryBuilder,
    config: RepositoryConfig,
    _model: PhantomData<fn() -> M>,
}

impl<M: RepositoryModel> Repository<M, MongoStore> {
    /// Bind to the model's collection on `connection`
    ///
    /// # Errors
    /// Returns `CollectionNotFound` if the collection does not exist.
    pub async fn new(connection: Arc<Connection>, mapper: Mapper) -> Result<Self> {
        let name = collection_name::<M>()?;
        let store = MongoStore::new(connection, name.as_str());
        Self::with_store(store, mapper).await
    }
}

impl<M: RepositoryModel, S: DocumentStore> Repository<M, S> {
    /// Bind to an existing store
    ///
    /// # Errors
    /// Returns `CollectionNotFound` if the store's collection does not exist.
    pub async fn with_store(store: S, mapper: Mapper) -> Result<Self> {
        if !store.exists().await? {
            return Err(DocbindError::CollectionNotFound(
                store.collection_name().to_string(),
            ));
        }
        info!(
            collection = store.collection_name(),
            database = store.database_name(),
            "Repository bound to collection"
        );

        let mut repository = Self {
            store,
            mapper,
            query: QueryBuilder::new(),
            config: RepositoryConfig::default(),
            _model: PhantomData,
        };
        repository.apply_config();
        Ok(repository)
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self.apply_config();
        self
    }

    fn apply_config(&mut self) {
        self.mapper.set_strict(self.config.strict);
    }

    pub fn config(&self) -> RepositoryConfig {
        self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn collection_name(&self) -> &str {
        self.store.collection_name()
    }

    pub fn database_name(&self) -> &str {
        self.store.database_name()
    }

    pub async fn server_status(&self) -> Result<BsonDocument> {
        self.store.server_status().await
    }

    // ------------------------------------------------------------------
    // Fluent state
    // ------------------------------------------------------------------

    /// Add filter keys; keys already set are kept
    pub fn filter(&mut self, filter: BsonDocument) -> &mut Self {
        self.query.merge_filter(filter);
        self
    }

    /// Add a sort key; a key already set keeps its direction
    pub fn order_by(&mut self, field: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.query.merge_sort(field, direction);
        self
    }

    /// Toggle strict mapping for later calls
    pub fn strict(&mut self, strict: bool) -> &mut Self {
        self.config.strict = strict;
        self.apply_config();
        self
    }

    /// Clear accumulated filter and sort
    pub fn reset(&mut self) -> &mut Self {
        self.query.clear();
        self
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Find one raw document matching `filter`, unmapped
    #[instrument(skip(self, filter), fields(collection = %self.collection_name()))]
    pub async fn find(&self, filter: BsonDocument) -> Result<Option<BsonDocument>> {
        self.check_filter(&filter)?;
        self.store.find_one(filter).await
    }

    /// Find entities matching the accumulated filter and sort
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn find_all(&self, limit: Option<i64>, offset: Option<u64>) -> Result<Vec<M::Entity>> {
        let (filter, params) = self.find_args(limit, offset)?;
        let documents = self.store.find(filter, params).await?;
        debug!(count = documents.len(), "Documents fetched");

        documents
            .iter()
            .map(|document| map_entity::<M>(&self.mapper, document))
            .collect()
    }

    /// Lazy [`find_all`](Self::find_all): entities are mapped as the cursor advances
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn stream(
        &self,
        limit: Option<i64>,
        offset: Option<u64>,
    ) -> Result<BoxStream<'static, Result<M::Entity>>> {
        let (filter, params) = self.find_args(limit, offset)?;
        let documents = self.store.find_stream(filter, params).await?;
        let mapper = self.mapper.clone();

        Ok(documents
            .map(move |document| document.and_then(|d| map_entity::<M>(&mapper, &d)))
            .boxed())
    }

    /// Get one entity by its ObjectId hex string
    ///
    /// # Errors
    /// Returns `Validation` if `id` is not a valid ObjectId.
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn get(&self, id: &str) -> Result<Option<M::Entity>> {
        let oid = parse_object_id(id)?;
        match self.store.find_one(id_filter(oid)).await? {
            Some(document) => map_entity::<M>(&self.mapper, &document).map(Some),
            None => Ok(None),
        }
    }

    /// Up to `limit` random entities matching the accumulated filter
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn get_rand(&self, limit: i64) -> Result<Vec<M::Entity>> {
        let pipeline = vec![
            doc! { "$match": self.query.get_filter().clone() },
            doc! { "$sample": { "size": limit } },
        ];
        if self.config.validate_queries {
            validate_pipeline(&pipeline)?;
        }

        let documents = self.store.aggregate(pipeline).await?;
        documents
            .iter()
            .map(|document| map_entity::<M>(&self.mapper, document))
            .collect()
    }

    /// Count documents matching the accumulated filter
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn count(&self) -> Result<u64> {
        let filter = self.query.get_filter().clone();
        self.check_filter(&filter)?;
        self.store.count(filter).await
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert a document and return its id as a string
    #[instrument(skip(self, data), fields(collection = %self.collection_name()))]
    pub async fn insert<T: Serialize + Sync>(&self, data: &T) -> Result<String> {
        let document = bson::to_document(data)?;
        let id = self.store.insert_one(document).await?;
        debug!(id = %id, "Document inserted");
        Ok(id_to_string(id))
    }

    /// Delete the document with this ObjectId; true if one was deleted
    #[instrument(skip(self), fields(collection = %self.collection_name()))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let oid = parse_object_id(id)?;
        let deleted = self.store.delete_one(id_filter(oid)).await?;
        Ok(deleted > 0)
    }

    /// `$set` the given fields on the document with this ObjectId; true if it exists
    #[instrument(skip(self, data), fields(collection = %self.collection_name()))]
    pub async fn update<T: Serialize + Sync>(&self, id: &str, data: &T) -> Result<bool> {
        let oid = parse_object_id(id)?;
        let fields = bson::to_document(data)?;
        let previous = self
            .store
            .find_one_and_update(id_filter(oid), doc! { "$set": fields })
            .await?;
        Ok(previous.is_some())
    }

    fn find_args(&self, limit: Option<i64>, offset: Option<u64>) -> Result<(BsonDocument, FindParams)> {
        let filter = self.query.get_filter().clone();
        self.check_filter(&filter)?;
        let params = FindParams::new()
            .sort(self.query.get_sort().cloned())
            .limit(limit)
            .skip(offset);
        Ok((filter, params))
    }

    fn check_filter(&self, filter: &BsonDocument) -> Result<()> {
        if self.config.validate_queries {
            validate_document(filter)?;
        }
        Ok(())
    }
}

fn map_entity<M: RepositoryModel>(mapper: &Mapper, document: &BsonDocument) -> Result<M::Entity> {
    let entity = <M::Entity as Entity>::entity_name();
    if !mapper.registry().contains(entity) {
        return Err(DocbindError::UnsetEntity {
            repository: short_type_name(std::any::type_name::<M>()).to_string(),
            entity: entity.to_string(),
        });
    }
    mapper.map::<M::Entity>(Some(document))
}

/// Inserted ids as strings: ObjectIds in hex, strings as-is
fn id_to_string(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    struct Accounts;

    struct Account;

    impl Entity for Account {
        const FIELDS: &'static [docbind_mapper::FieldDecl] = &[];

        fn from_record(_record: docbind_mapper::Record) -> Result<Self> {
            Ok(Account)
        }
    }

    impl RepositoryModel for Accounts {
        type Entity = Account;
    }

    struct Ledger<T>(PhantomData<T>);

    impl<T: Send + Sync + 'static> RepositoryModel for Ledger<T> {
        type Entity = Account;
    }

    #[test]
    fn test_collection_name_is_lowercase_short_name() {
        assert_eq!(collection_name::<Accounts>().unwrap().as_str(), "accounts");
        assert_eq!(collection_name::<Ledger<u8>>().unwrap().as_str(), "ledger");
    }

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert!(config.strict);
        assert!(!config.validate_queries);
    }

    #[test]
    fn test_id_to_string() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(id_to_string(Bson::ObjectId(oid)), "507f1f77bcf86cd799439011");
        assert_eq!(id_to_string(Bson::String("slug".into())), "slug");
        assert_eq!(id_to_string(Bson::Int32(7)), "7");
    }

    #[test]
    fn test_map_entity_requires_registration() {
        let mapper = Mapper::new(Arc::new(docbind_mapper::EntityRegistry::new()));
        let err = map_entity::<Accounts>(&mapper, &doc! {}).err().unwrap();
        match err {
            DocbindError::UnsetEntity { repository, entity } => {
                assert_eq!(repository, "Accounts");
                assert_eq!(entity, "Account");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
