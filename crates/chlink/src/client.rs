//! Blocking client.
//!
//! [`Client`] opens a fresh driver session for every scoped use and closes it
//! when the scope ends, however it ends.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::driver::{Driver, Handle};
use crate::error::ConnectionError;

/// A blocking ClickHouse client.
///
/// Holds only the configuration and the driver. No session is cached between
/// calls, so every [`Client::acquire`] or [`Client::with_handle`] is an
/// independent connect/close cycle.
///
/// # Example
///
/// ```ignore
/// use chlink::{Client, ClientConfig};
///
/// let client = Client::new(ClientConfig::new("localhost").with_database("mydb"), driver);
/// let rows = client.with_handle(|ch| ch.query("SELECT * FROM mytable"))??;
/// ```
pub struct Client<D: Driver> {
    config: Arc<ClientConfig>,
    driver: D,
}

impl<D: Driver> Client<D> {
    /// Create a new client.
    pub fn new(config: impl Into<Arc<ClientConfig>>, driver: D) -> Self {
        Self {
            config: config.into(),
            driver,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Open a session and return a guard that closes it when dropped.
    pub fn acquire(&self) -> Result<HandleGuard<D::Handle>, ConnectionError> {
        let params = self.config.to_connection_params();

        debug!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            secure = self.config.secure,
            "Connecting to ClickHouse"
        );

        let handle = self.driver.connect(&params).map_err(|e| {
            debug!(error = %e, "ClickHouse connect failed");
            ConnectionError::for_config(&self.config, e)
        })?;

        debug!(host = %self.config.host, "Acquired ClickHouse handle");
        Ok(HandleGuard::new(handle))
    }

    /// Run `body` against a fresh session and close it afterwards.
    ///
    /// Only the connect step can fail here. Whatever `body` returns, including
    /// its own errors, comes back unchanged inside `Ok`. A panic in `body`
    /// still closes the session while unwinding.
    pub fn with_handle<T, F>(&self, body: F) -> Result<T, ConnectionError>
    where
        F: FnOnce(&mut D::Handle) -> T,
    {
        let mut guard = self.acquire()?;
        let output = body(&mut *guard);
        guard.release();
        Ok(output)
    }
}

impl<D: Driver> std::fmt::Debug for Client<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Exclusive ownership of one open session.
///
/// Dereferences to the driver handle. The session is closed exactly once,
/// either by [`HandleGuard::release`] or when the guard is dropped. Close
/// errors are discarded.
pub struct HandleGuard<H: Handle> {
    handle: Option<H>,
}

impl<H: Handle> HandleGuard<H> {
    fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Close the session now.
    pub fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            close_quietly(handle);
        }
    }
}

impl<H: Handle> Deref for HandleGuard<H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.handle.as_ref().expect("handle is present until release")
    }
}

impl<H: Handle> DerefMut for HandleGuard<H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle.as_mut().expect("handle is present until release")
    }
}

impl<H: Handle> Drop for HandleGuard<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            close_quietly(handle);
        }
    }
}

impl<H: Handle> std::fmt::Debug for HandleGuard<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleGuard")
            .field("open", &self.handle.is_some())
            .finish()
    }
}

fn close_quietly<H: Handle>(handle: H) {
    trace!("Releasing ClickHouse handle");
    // Close failures never replace the outcome of the scope.
    let _ = handle.close();
}
