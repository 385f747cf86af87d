use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection};
use thiserror::Error;

use crate::config::MongoSettings;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Read access to the mailpiece collection.
#[async_trait]
pub trait MailpieceStore: Send + Sync {
    /// Returns every document matching `filter`, at most `limit` of them
    /// when a limit is given.
    async fn find(&self, filter: Document, limit: Option<i64>) -> DbResult<Vec<Document>>;
}

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects and pings the database so an unreachable server fails
    /// startup instead of the first tool call.
    pub async fn connect(settings: &MongoSettings) -> DbResult<Self> {
        let client = Client::with_uri_str(&settings.url).await?;
        let database = client.database(&settings.database);
        database.run_command(doc! { "ping": 1 }).await?;
        tracing::info!(database = %settings.database, "Connected to MongoDB");

        let collection = database.collection::<Document>(&settings.collection);
        Ok(Self { client, collection })
    }

    pub async fn shutdown(&self) {
        self.client.clone().shutdown().await;
    }
}

#[async_trait]
impl MailpieceStore for MongoStore {
    async fn find(&self, filter: Document, limit: Option<i64>) -> DbResult<Vec<Document>> {
        let find = self.collection.find(filter);
        let cursor = match limit {
            Some(n) => find.limit(n).await?,
            None => find.await?,
        };
        Ok(cursor.try_collect().await?)
    }
}
