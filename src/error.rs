//! Contains the `Error` and `Result` types that `archive_page_count` uses.

use mongodb::error::ErrorKind as DriverErrorKind;
use thiserror::Error;

/// The result type for all methods that can return an error in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur while computing a page total. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is boxed to keep `Result`s small.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        ErrorKind::InvalidResponse {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn unsupported_pipeline(message: impl Into<String>) -> Self {
        ErrorKind::UnsupportedPipeline {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_configuration(message: impl Into<String>) -> Self {
        ErrorKind::InvalidConfiguration {
            message: message.into(),
        }
        .into()
    }

    /// Whether the store could not be reached at all.
    pub fn is_connection_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Connection { .. })
    }

    /// Whether the store was reached but failed to execute the request.
    pub fn is_query_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::QueryExecution { .. })
    }

    /// The server error code, if the store reported one.
    pub fn code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::QueryExecution { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<mongodb::error::Error> for Error {
    fn from(err: mongodb::error::Error) -> Self {
        let message = err.to_string();
        match err.kind.as_ref() {
            DriverErrorKind::ServerSelection { .. }
            | DriverErrorKind::Io(_)
            | DriverErrorKind::DnsResolve { .. }
            | DriverErrorKind::ConnectionPoolCleared { .. }
            | DriverErrorKind::Authentication { .. }
            | DriverErrorKind::InvalidTlsConfig { .. } => ErrorKind::Connection { message }.into(),
            DriverErrorKind::Command(command_error) => ErrorKind::QueryExecution {
                message,
                code: Some(command_error.code),
            }
            .into(),
            DriverErrorKind::BsonDeserialization(_) | DriverErrorKind::InvalidResponse { .. } => {
                ErrorKind::InvalidResponse { message }.into()
            }
            _ => ErrorKind::QueryExecution {
                message,
                code: None,
            }
            .into(),
        }
    }
}

impl From<mongodb::bson::de::Error> for Error {
    fn from(err: mongodb::bson::de::Error) -> Self {
        Error::invalid_response(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for Error {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        Error::invalid_response(err.to_string())
    }
}

/// The types of errors that can occur.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The store could not be reached: server selection timed out, or a network, DNS, TLS or
    /// authentication failure occurred.
    #[error("Unable to reach the store: {message}")]
    #[non_exhaustive]
    Connection { message: String },

    /// The store was reached but rejected or failed the request.
    #[error("Query execution failed: {message}")]
    #[non_exhaustive]
    QueryExecution { message: String, code: Option<i32> },

    /// The store returned a reply that could not be interpreted.
    #[error("The store returned an invalid reply: {message}")]
    #[non_exhaustive]
    InvalidResponse { message: String },

    /// A connection string or option could not be parsed.
    #[error("Invalid configuration: {message}")]
    #[non_exhaustive]
    InvalidConfiguration { message: String },

    /// A pipeline used a stage or expression that cannot be evaluated here, or a query was
    /// assembled in an order that has no pipeline form.
    #[error("Unsupported pipeline: {message}")]
    #[non_exhaustive]
    UnsupportedPipeline { message: String },
}
