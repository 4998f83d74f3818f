//! Non-blocking client.
//!
//! Same contract as [`crate::Client`]; the connect and close calls are the
//! only points where the calling task is suspended.
//!
//! Dropping an in-flight future is how a task gets cancelled. Depending on
//! where it is suspended:
//!
//! - in connect: no handle exists yet, so nothing is closed;
//! - in the body: the guard closes the handle on a detached task, because
//!   `Drop` cannot await;
//! - in close: the handle already left the guard, so close is not re-issued.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::driver::{AsyncDriver, AsyncHandle};
use crate::error::ConnectionError;

/// An async ClickHouse client.
///
/// # Example
///
/// ```ignore
/// use chlink::{AsyncClient, ClientConfig};
///
/// let client = AsyncClient::new(ClientConfig::new("localhost").with_database("mydb"), driver);
/// let rows = client
///     .with_handle(|ch| Box::pin(async move { ch.query("SELECT * FROM mytable").await }))
///     .await??;
/// ```
pub struct AsyncClient<D: AsyncDriver> {
    config: Arc<ClientConfig>,
    driver: D,
}

impl<D: AsyncDriver> AsyncClient<D> {
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

    /// Open a session and return a guard for it.
    ///
    /// Prefer [`AsyncHandleGuard::release`] over dropping the guard, so the
    /// close is awaited by the caller instead of running detached.
    pub async fn acquire(&self) -> Result<AsyncHandleGuard<D::Handle>, ConnectionError> {
        let params = self.config.to_connection_params();

        debug!(
            host = %self.config.host,
            port = self.config.port,
            database = %self.config.database,
            secure = self.config.secure,
            "Connecting to ClickHouse"
        );

        let handle = self.driver.connect(&params).await.map_err(|e| {
            debug!(error = %e, "ClickHouse connect failed");
            ConnectionError::for_config(&self.config, e)
        })?;

        debug!(host = %self.config.host, "Acquired ClickHouse handle");
        Ok(AsyncHandleGuard::new(handle))
    }

    /// Run `body` against a fresh session and close it afterwards.
    ///
    /// Only the connect step can fail here; the body's output is returned
    /// unchanged.
    pub async fn with_handle<T, F>(&self, body: F) -> Result<T, ConnectionError>
    where
        F: for<'a> FnOnce(&'a mut D::Handle) -> BoxFuture<'a, T>,
    {
        let mut guard = self.acquire().await?;
        let output = body(&mut *guard).await;
        guard.release().await;
        Ok(output)
    }
}

impl<D: AsyncDriver> std::fmt::Debug for AsyncClient<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Exclusive ownership of one open async session.
pub struct AsyncHandleGuard<H: AsyncHandle> {
    handle: Option<H>,
}

impl<H: AsyncHandle> AsyncHandleGuard<H> {
    fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Close the session and wait for the driver to finish.
    ///
    /// Close errors are discarded. If this future is dropped mid-close the
    /// close call has still been issued once and is not repeated.
    pub async fn release(mut self) {
        if let Some(handle) = self.handle.take() {
            trace!("Releasing ClickHouse handle");
            let _ = handle.close().await;
        }
    }
}

impl<H: AsyncHandle> Deref for AsyncHandleGuard<H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.handle.as_ref().expect("handle is present until release")
    }
}

impl<H: AsyncHandle> DerefMut for AsyncHandleGuard<H> {
    fn deref_mut(&mut self) -> &mut H {
        self.handle.as_mut().expect("handle is present until release")
    }
}

impl<H: AsyncHandle> Drop for AsyncHandleGuard<H> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("ClickHouse handle dropped before release, closing in background");
                runtime.spawn(async move {
                    let _ = handle.close().await;
                });
            }
            Err(_) => {
                // Outside a runtime the driver's own Drop is all that is left.
                debug!("ClickHouse handle dropped outside a runtime, close skipped");
                drop(handle);
            }
        }
    }
}

impl<H: AsyncHandle> std::fmt::Debug for AsyncHandleGuard<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncHandleGuard")
            .field("open", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionParams;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct MockError(&'static str);

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        closes: AtomicUsize,
    }

    struct MockHandle {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl AsyncHandle for MockHandle {
        type Error = MockError;

        async fn close(self) -> Result<(), MockError> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockDriver {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl AsyncDriver for MockDriver {
        type Handle = MockHandle;
        type Error = MockError;

        async fn connect(&self, _params: &ConnectionParams) -> Result<MockHandle, MockError> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            Ok(MockHandle {
                counters: self.counters.clone(),
            })
        }
    }

    fn client() -> (AsyncClient<MockDriver>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let driver = MockDriver {
            counters: counters.clone(),
        };
        (AsyncClient::new(ClientConfig::default(), driver), counters)
    }

    #[tokio::test]
    async fn test_release_closes_once() {
        let (client, counters) = client();
        let guard = client.acquire().await.unwrap();
        guard.release().await;
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_guard_closes_in_background() {
        let (client, counters) = client();
        drop(client.acquire().await.unwrap());

        for _ in 0..100 {
            if counters.closes.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_guard_outside_runtime_does_not_panic() {
        let (client, counters) = client();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let guard = runtime.block_on(client.acquire()).unwrap();
        drop(runtime);

        drop(guard);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
    }
}
