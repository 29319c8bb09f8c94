//! Collection-level document access used by repositories

use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use docbind_common::{DocbindError, Result};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mongodb::{options::FindOptions, Collection};
use std::sync::Arc;

use crate::connection::Connection;

/// Sort, limit and skip for a multi-document find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
    pub sort: Option<BsonDocument>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl FindParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: Option<BsonDocument>) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: Option<u64>) -> Self {
        self.skip = skip;
        self
    }
}

/// Raw document operations on one collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this store reads and writes
    fn collection_name(&self) -> &str;

    /// Name of the database holding the collection
    fn database_name(&self) -> &str;

    /// Whether the collection exists
    async fn exists(&self) -> Result<bool>;

    async fn find_one(&self, filter: BsonDocument) -> Result<Option<BsonDocument>>;

    async fn find(&self, filter: BsonDocument, params: FindParams) -> Result<Vec<BsonDocument>>;

    /// Like [`find`](Self::find), yielding documents as the cursor advances
    async fn find_stream(
        &self,
        filter: BsonDocument,
        params: FindParams,
    ) -> Result<BoxStream<'static, Result<BsonDocument>>>;

    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>>;

    /// Insert a document and return its `_id`
    async fn insert_one(&self, document: BsonDocument) -> Result<Bson>;

    /// Delete at most one document; returns the number deleted
    async fn delete_one(&self, filter: BsonDocument) -> Result<u64>;

    /// Update at most one document; returns it as it was before the update
    async fn find_one_and_update(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<Option<BsonDocument>>;

    async fn count(&self, filter: BsonDocument) -> Result<u64>;

    /// Server status of the backing database
    async fn server_status(&self) -> Result<BsonDocument>;
}

/// [`DocumentStore`] backed by a MongoDB collection
pub struct MongoStore {
    connection: Arc<Connection>,
    collection: Collection<BsonDocument>,
}

impl MongoStore {
    pub fn new(connection: Arc<Connection>, collection_name: &str) -> Self {
        let collection = connection.collection(collection_name);
        Self {
            connection,
            collection,
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    fn find_options(params: FindParams) -> FindOptions {
        FindOptions::builder()
            .sort(params.sort)
            .limit(params.limit)
            .skip(params.skip)
            .build()
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn database_name(&self) -> &str {
        self.connection.database_name()
    }

    async fn exists(&self) -> Result<bool> {
        self.connection.collection_exists(self.collection.name()).await
    }

    async fn find_one(&self, filter: BsonDocument) -> Result<Option<BsonDocument>> {
        Ok(self.collection.find_one(filter).await?)
    }

    async fn find(&self, filter: BsonDocument, params: FindParams) -> Result<Vec<BsonDocument>> {
        let cursor = self
            .collection
            .find(filter)
            .with_options(Self::find_options(params))
            .await?;

        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn find_stream(
        &self,
        filter: BsonDocument,
        params: FindParams,
    ) -> Result<BoxStream<'static, Result<BsonDocument>>> {
        let cursor = self
            .collection
            .find(filter)
            .with_options(Self::find_options(params))
            .await?;

        Ok(cursor.map_err(DocbindError::from).boxed())
    }

    async fn aggregate(&self, pipeline: Vec<BsonDocument>) -> Result<Vec<BsonDocument>> {
        let cursor = self.collection.aggregate(pipeline).await?;
        let docs: Vec<BsonDocument> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn insert_one(&self, document: BsonDocument) -> Result<Bson> {
        let result = self.collection.insert_one(document).await?;
        Ok(result.inserted_id)
    }

    async fn delete_one(&self, filter: BsonDocument) -> Result<u64> {
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn find_one_and_update(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<Option<BsonDocument>> {
        Ok(self.collection.find_one_and_update(filter, update).await?)
    }

    async fn count(&self, filter: BsonDocument) -> Result<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    async fn server_status(&self) -> Result<BsonDocument> {
        self.connection.server_status().await
    }
}

/// Filter matching one `_id`
pub fn id_filter(id: impl Into<Bson>) -> BsonDocument {
    doc! { "_id": id.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_params_builder() {
        let params = FindParams::new()
            .sort(Some(doc! { "name": 1 }))
            .limit(Some(10))
            .skip(None);

        assert_eq!(params.sort, Some(doc! { "name": 1 }));
        assert_eq!(params.limit, Some(10));
        assert_eq!(params.skip, None);
    }

    #[test]
    fn test_find_options_from_params() {
        let options = MongoStore::find_options(FindParams {
            sort: Some(doc! { "age": -1 }),
            limit: Some(5),
            skip: Some(20),
        });

        assert_eq!(options.sort, Some(doc! { "age": -1 }));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, Some(20));
    }

    #[test]
    fn test_id_filter() {
        assert_eq!(id_filter("abc"), doc! { "_id": "abc" });
    }

    #[tokio::test]
    async fn test_mongo_store_names() {
        let connection = Arc::new(
            Connection::new("mongodb://localhost:27017/shop")
                .await
                .unwrap(),
        );
        let store = MongoStore::new(connection, "orders");
        assert_eq!(store.collection_name(), "orders");
        assert_eq!(store.database_name(), "shop");
    }
}
