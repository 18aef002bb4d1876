use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    event::EventHandler,
    options::ClientOptions,
    Client,
    Collection,
};

use crate::{
    error::{Error, Result},
    model::ArchiveEntry,
    options::StoreOptions,
    trace::CommandLogger,
};

use super::EntryStore;

/// An [`EntryStore`] backed by a MongoDB collection.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    coll: Collection<ArchiveEntry>,
    allow_disk_use: bool,
}

impl MongoStore {
    /// Connects to the deployment named by `options` and verifies it is reachable with a `ping`,
    /// so an unreachable store is reported as a connection error before any strategy runs.
    pub async fn connect(options: &StoreOptions) -> Result<Self> {
        let mut client_options = ClientOptions::parse(options.uri.as_str())
            .await
            .map_err(|e| Error::invalid_configuration(e.to_string()))?;
        client_options.app_name = Some(options.app_name.clone());
        if let Some(timeout) = options.server_selection_timeout {
            client_options.server_selection_timeout = Some(timeout);
        }
        let logger = CommandLogger::new(options.max_document_length_bytes);
        client_options.command_event_handler =
            Some(EventHandler::callback(move |event| logger.handle(event)));

        let client = Client::with_options(client_options)
            .map_err(|e| Error::invalid_configuration(e.to_string()))?;

        client
            .database(&options.database)
            .run_command(doc! { "ping": 1 })
            .await?;

        tracing::debug!(
            database = options.database.as_str(),
            collection = options.collection.as_str(),
            "connected to store"
        );

        Ok(Self::from_collection(
            client.database(&options.database).collection(&options.collection),
            options.allow_disk_use,
        ))
    }

    /// Wraps an existing collection handle.
    pub fn from_collection(coll: Collection<ArchiveEntry>, allow_disk_use: bool) -> Self {
        Self {
            client: coll.client().clone(),
            coll,
            allow_disk_use,
        }
    }

    /// The underlying collection.
    pub fn collection(&self) -> &Collection<ArchiveEntry> {
        &self.coll
    }

    /// Shuts the client down, waiting for any outstanding cursors to be cleaned up.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}

#[async_trait]
impl EntryStore for MongoStore {
    async fn fetch_entries(&self) -> Result<Vec<ArchiveEntry>> {
        let cursor = self.coll.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let cursor = self
            .coll
            .aggregate(pipeline)
            .allow_disk_use(self.allow_disk_use)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    fn describe(&self) -> String {
        self.coll.namespace().to_string()
    }
}
