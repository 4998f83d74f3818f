//! Driver abstraction.
//!
//! The wire protocol, authentication and query execution all live in an
//! external ClickHouse driver. These traits are the only surface of it this
//! crate relies on: open a handle from [`ConnectionParams`], and close it.
//! Everything else a handle can do (queries, inserts, ...) is reached directly
//! on the concrete handle type and never passes through this crate.

use async_trait::async_trait;

use crate::config::ConnectionParams;

/// Blocking driver.
pub trait Driver: Send + Sync {
    /// Live session type returned by [`Driver::connect`].
    type Handle: Handle;

    /// Error returned when a session cannot be opened.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new session. May block up to the configured connect timeout.
    fn connect(&self, params: &ConnectionParams) -> Result<Self::Handle, Self::Error>;
}

/// A live blocking session.
pub trait Handle {
    /// Error returned when closing fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Close the session. Called at most once.
    fn close(self) -> Result<(), Self::Error>;
}

/// Non-blocking driver.
#[async_trait]
pub trait AsyncDriver: Send + Sync {
    /// Live session type returned by [`AsyncDriver::connect`].
    type Handle: AsyncHandle;

    /// Error returned when a session cannot be opened.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new session.
    async fn connect(&self, params: &ConnectionParams) -> Result<Self::Handle, Self::Error>;
}

/// A live non-blocking session.
#[async_trait]
pub trait AsyncHandle: Send + 'static {
    /// Error returned when closing fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Close the session. Called at most once.
    async fn close(self) -> Result<(), Self::Error>;
}
