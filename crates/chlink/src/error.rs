//! Client error types.

use thiserror::Error;

use crate::config::ClientConfig;

/// Boxed error produced by a driver implementation.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Root error type for everything this crate is responsible for.
#[derive(Debug, Error)]
pub enum Error {
    /// Acquiring a handle from the driver failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error came from handle acquisition.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Handle acquisition failed.
///
/// The driver's own error is kept as the source and summarized in the message.
#[derive(Debug, Error)]
#[error("failed to connect to ClickHouse at {host}:{port}: {source}")]
pub struct ConnectionError {
    /// Host the connection was attempted against.
    pub host: String,
    /// Port the connection was attempted against.
    pub port: u16,
    /// Database requested for the session.
    pub database: String,
    /// The underlying driver failure.
    #[source]
    pub source: DriverError,
}

impl ConnectionError {
    /// Wrap a driver failure for the given endpoint.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        source: impl Into<DriverError>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            source: source.into(),
        }
    }

    /// Wrap a driver failure for the endpoint described by `config`.
    pub(crate) fn for_config(config: &ClientConfig, source: impl Into<DriverError>) -> Self {
        Self::new(&config.host, config.port, &config.database, source)
    }

    /// Get the underlying driver failure.
    pub fn driver_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}
