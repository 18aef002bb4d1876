//! Configuration for connecting to the store.

use std::{env, time::Duration};

use typed_builder::TypedBuilder;

use crate::{
    error::{Error, Result},
    trace::DEFAULT_MAX_DOCUMENT_LENGTH_BYTES,
};

/// Connection string used when none is configured.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "local";

/// Entry collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "ArchiveEntry";

/// Application name reported to the server in the connection handshake.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Environment variable holding the connection string.
pub const URI_ENV: &str = "ARCHIVE_URI";

/// Environment variable holding the database name.
pub const DATABASE_ENV: &str = "ARCHIVE_DATABASE";

/// Environment variable holding the entry collection name.
pub const COLLECTION_ENV: &str = "ARCHIVE_COLLECTION";

/// Where the entries live and how to talk to the server holding them.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct StoreOptions {
    /// The MongoDB connection string.
    #[builder(default = DEFAULT_URI.to_string())]
    pub uri: String,

    /// The database holding the entry collection.
    #[builder(default = DEFAULT_DATABASE.to_string())]
    pub database: String,

    /// The entry collection.
    #[builder(default = DEFAULT_COLLECTION.to_string())]
    pub collection: String,

    /// Whether aggregations may write temporary files on the server.
    #[builder(default = true)]
    pub allow_disk_use: bool,

    /// Bound on how long the driver waits for a suitable server. The driver default applies when
    /// unset.
    pub server_selection_timeout: Option<Duration>,

    /// The application name sent in the connection handshake.
    #[builder(default = APP_NAME.to_string())]
    pub app_name: String,

    /// Commands and replies longer than this are truncated in log events.
    #[builder(default = DEFAULT_MAX_DOCUMENT_LENGTH_BYTES)]
    pub max_document_length_bytes: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StoreOptions {
    /// Reads the connection string, database and collection from the environment, falling back
    /// to the defaults for any variable that is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let options = Self::builder()
            .uri(read(URI_ENV, DEFAULT_URI))
            .database(read(DATABASE_ENV, DEFAULT_DATABASE))
            .collection(read(COLLECTION_ENV, DEFAULT_COLLECTION))
            .build();
        options.validate()?;
        Ok(options)
    }

    /// Checks the options for values the driver would only reject at connection time.
    pub fn validate(&self) -> Result<()> {
        if !(self.uri.starts_with("mongodb://") || self.uri.starts_with("mongodb+srv://")) {
            return Err(Error::invalid_configuration(format!(
                "connection string must start with mongodb:// or mongodb+srv://, got {:?}",
                self.uri
            )));
        }
        if self.database.is_empty() {
            return Err(Error::invalid_configuration(
                "database name must not be empty",
            ));
        }
        if self.database.contains(['/', '\\', '.', ' ', '"', '$']) {
            return Err(Error::invalid_configuration(format!(
                "database name {:?} contains an illegal character",
                self.database
            )));
        }
        if self.collection.is_empty() || self.collection.contains('$') {
            return Err(Error::invalid_configuration(format!(
                "collection name {:?} is not valid",
                self.collection
            )));
        }
        Ok(())
    }
}
