//! chlink - Scoped ClickHouse client handles.
//!
//! This crate does not speak the ClickHouse protocol itself. It turns a typed
//! [`ClientConfig`] into driver connection parameters and hands out driver
//! sessions that are always closed when the caller is done with them, in both
//! blocking ([`Client`]) and async ([`AsyncClient`]) form.
//!
//! # Quick Start
//!
//! ```ignore
//! use chlink::{AsyncClient, Client, ClientConfig};
//!
//! // Blocking
//! let config = ClientConfig::new("localhost").with_database("mydb");
//! let client = Client::new(config.clone(), my_driver);
//! let rows = client.with_handle(|ch| ch.query("SELECT * FROM mytable"))??;
//!
//! // Async
//! let client = AsyncClient::new(config, my_async_driver);
//! let mut ch = client.acquire().await?;
//! let rows = ch.query("SELECT * FROM mytable").await?;
//! ch.release().await;
//! ```

pub mod async_client;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;

pub use async_client::{AsyncClient, AsyncHandleGuard};
pub use client::{Client, HandleGuard};
pub use config::{ClientConfig, ConfigArgs, ConnectionParams, ParamValue};
pub use driver::{AsyncDriver, AsyncHandle, Driver, Handle};
pub use error::{ConnectionError, DriverError, Error};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
