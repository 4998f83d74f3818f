//! Client configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

/// Default ClickHouse host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default ClickHouse HTTP port.
pub const DEFAULT_PORT: u16 = 8123;

/// Default user on a fresh install.
pub const DEFAULT_USERNAME: &str = "default";

/// Default database on a fresh install.
pub const DEFAULT_DATABASE: &str = "default";

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default send/receive timeout in seconds.
pub const DEFAULT_SEND_RECEIVE_TIMEOUT_SECS: u64 = 300;

/// ClickHouse connection configuration.
///
/// Every field has a default that works against a local default install, so
/// `ClientConfig::default()` is a usable configuration on its own.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Authentication username.
    pub username: String,

    /// Authentication password.
    pub password: String,

    /// Default database for the session.
    pub database: String,

    /// Use an encrypted transport.
    pub secure: bool,

    /// Verify transport certificates.
    pub verify: bool,

    /// Connect timeout in seconds.
    pub connect_timeout: u64,

    /// Send/receive timeout in seconds.
    pub send_receive_timeout: u64,

    /// Fields not known to this crate, kept from external sources.
    ///
    /// Never forwarded to the driver.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ClientConfig {
    /// Create a configuration for the given host with every other field at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            secure: false,
            verify: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            send_receive_timeout: DEFAULT_SEND_RECEIVE_TIMEOUT_SECS,
            extra: BTreeMap::new(),
        }
    }

    /// Create a configuration for a local default install.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_HOST)
    }

    /// Load a configuration from a JSON document.
    ///
    /// Missing fields take their defaults; unknown fields are kept in `extra`.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from an already parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, Error> {
        Ok(serde_json::from_value(value)?)
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username and password.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the default database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Enable or disable the encrypted transport.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Enable or disable certificate verification.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the connect timeout. Sub-second precision is dropped.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout.as_secs();
        self
    }

    /// Set the send/receive timeout. Sub-second precision is dropped.
    pub fn with_send_receive_timeout(mut self, timeout: Duration) -> Self {
        self.send_receive_timeout = timeout.as_secs();
        self
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Send/receive timeout as a duration.
    pub fn send_receive_timeout(&self) -> Duration {
        Duration::from_secs(self.send_receive_timeout)
    }

    /// Project this configuration into the parameters the driver expects.
    ///
    /// This is the only place where field names are mapped to driver
    /// parameter names.
    pub fn to_connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            entries: vec![
                ("host", ParamValue::Str(self.host.clone())),
                ("port", ParamValue::Int(u64::from(self.port))),
                ("username", ParamValue::Str(self.username.clone())),
                ("password", ParamValue::Str(self.password.clone())),
                ("database", ParamValue::Str(self.database.clone())),
                ("secure", ParamValue::Bool(self.secure)),
                ("verify", ParamValue::Bool(self.verify)),
                ("connect_timeout", ParamValue::Int(self.connect_timeout)),
                ("send_receive_timeout", ParamValue::Int(self.send_receive_timeout)),
            ],
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("secure", &self.secure)
            .field("verify", &self.verify)
            .field("connect_timeout", &self.connect_timeout)
            .field("send_receive_timeout", &self.send_receive_timeout)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A single driver parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(u64),
    Bool(bool),
}

impl ParamValue {
    /// Get the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ParamValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{}", n),
            ParamValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Named connection parameters handed to the driver, in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    entries: Vec<(&'static str, ParamValue)>,
}

impl ConnectionParams {
    /// Look up a parameter by its driver name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Check if a parameter is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over parameter names.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> + '_ {
        self.entries.iter().map(|(key, value)| (*key, value))
    }
}

impl Serialize for ConnectionParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Command-line arguments for the ClickHouse connection.
///
/// Meant to be flattened into an application's own parser with
/// `#[command(flatten)]`.
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// ClickHouse server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// ClickHouse server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Authentication username.
    #[arg(long, default_value = DEFAULT_USERNAME)]
    pub username: String,

    /// Authentication password.
    #[arg(long, default_value = "")]
    pub password: String,

    /// Default database.
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Use an encrypted transport.
    #[arg(long)]
    pub secure: bool,

    /// Skip certificate verification.
    #[arg(long)]
    pub no_verify: bool,

    /// Connect timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// Send/receive timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_SEND_RECEIVE_TIMEOUT_SECS)]
    pub send_receive_timeout: u64,
}

impl ConfigArgs {
    /// Convert command-line arguments to a client configuration.
    pub fn into_config(self) -> ClientConfig {
        ClientConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            password: self.password,
            database: self.database,
            secure: self.secure,
            verify: !self.no_verify,
            connect_timeout: self.connect_timeout,
            send_receive_timeout: self.send_receive_timeout,
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        clickhouse: ConfigArgs,
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8123);
        assert_eq!(config.username, "default");
        assert_eq!(config.password, "");
        assert_eq!(config.database, "default");
        assert!(!config.secure);
        assert!(config.verify);
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.send_receive_timeout, 300);
        assert!(config.extra.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("ch.internal")
            .with_port(8443)
            .with_credentials("reader", "s3cret")
            .with_database("events")
            .with_secure(true)
            .with_verify(false)
            .with_connect_timeout(Duration::from_secs(3))
            .with_send_receive_timeout(Duration::from_millis(60_500));

        assert_eq!(config.host, "ch.internal");
        assert_eq!(config.port, 8443);
        assert_eq!(config.username, "reader");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database, "events");
        assert!(config.secure);
        assert!(!config.verify);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.send_receive_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_default_params() {
        let params = ClientConfig::default().to_connection_params();
        let rendered: Vec<(&str, String)> =
            params.iter().map(|(k, v)| (k, v.to_string())).collect();

        assert_eq!(
            rendered,
            vec![
                ("host", "localhost".to_string()),
                ("port", "8123".to_string()),
                ("username", "default".to_string()),
                ("password", "".to_string()),
                ("database", "default".to_string()),
                ("secure", "false".to_string()),
                ("verify", "true".to_string()),
                ("connect_timeout", "10".to_string()),
                ("send_receive_timeout", "300".to_string()),
            ]
        );
    }

    #[test]
    fn test_params_carry_supplied_values() {
        let config = ClientConfig::new("10.0.0.7")
            .with_port(9000)
            .with_credentials("writer", "pw")
            .with_database("metrics")
            .with_secure(true)
            .with_verify(false)
            .with_connect_timeout(Duration::from_secs(1))
            .with_send_receive_timeout(Duration::from_secs(2));
        let params = config.to_connection_params();

        assert_eq!(params.len(), 9);
        assert_eq!(params.get("host").and_then(ParamValue::as_str), Some("10.0.0.7"));
        assert_eq!(params.get("port").and_then(ParamValue::as_u64), Some(9000));
        assert_eq!(params.get("username").and_then(ParamValue::as_str), Some("writer"));
        assert_eq!(params.get("password").and_then(ParamValue::as_str), Some("pw"));
        assert_eq!(params.get("database").and_then(ParamValue::as_str), Some("metrics"));
        assert_eq!(params.get("secure").and_then(ParamValue::as_bool), Some(true));
        assert_eq!(params.get("verify").and_then(ParamValue::as_bool), Some(false));
        assert_eq!(params.get("connect_timeout").and_then(ParamValue::as_u64), Some(1));
        assert_eq!(
            params.get("send_receive_timeout").and_then(ParamValue::as_u64),
            Some(2)
        );
        assert!(params.get("extra").is_none());
    }

    #[test]
    fn test_projection_is_pure() {
        let config = ClientConfig::new("a").with_database("b");
        let snapshot = config.clone();
        assert_eq!(config.to_connection_params(), config.to_connection_params());
        assert_eq!(config, snapshot);
    }

    #[test]
    fn test_params_serialize_as_flat_object() {
        let params = ClientConfig::default().to_connection_params();
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "host": "localhost",
                "port": 8123,
                "username": "default",
                "password": "",
                "database": "default",
                "secure": false,
                "verify": true,
                "connect_timeout": 10,
                "send_receive_timeout": 300,
            })
        );
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ClientConfig::from_json_str(r#"{"host": "ch1", "database": "logs"}"#).unwrap();
        assert_eq!(config.host, "ch1");
        assert_eq!(config.database, "logs");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.verify);
    }

    #[test]
    fn test_from_json_keeps_unknown_fields() {
        let config = ClientConfig::from_json_value(serde_json::json!({
            "host": "ch1",
            "compression": "lz4",
            "settings": {"max_threads": 4},
        }))
        .unwrap();

        assert_eq!(config.extra.len(), 2);
        assert_eq!(config.extra["compression"], serde_json::json!("lz4"));

        let params = config.to_connection_params();
        assert_eq!(params.len(), 9);
        assert!(!params.contains_key("compression"));
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        let err = ClientConfig::from_json_str(r#"{"port": "not a number"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ClientConfig::default().with_credentials("admin", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("admin"));
    }

    #[test]
    fn test_args_defaults_match_config_defaults() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.clickhouse.into_config(), ClientConfig::default());
    }

    #[test]
    fn test_args_into_config() {
        let cli = TestCli::try_parse_from([
            "test",
            "--host",
            "ch.prod",
            "--port",
            "8443",
            "--database",
            "events",
            "--secure",
            "--no-verify",
            "--connect-timeout",
            "5",
        ])
        .unwrap();
        let config = cli.clickhouse.into_config();

        assert_eq!(config.host, "ch.prod");
        assert_eq!(config.port, 8443);
        assert_eq!(config.database, "events");
        assert!(config.secure);
        assert!(!config.verify);
        assert_eq!(config.connect_timeout, 5);
        assert_eq!(config.send_receive_timeout, DEFAULT_SEND_RECEIVE_TIMEOUT_SECS);
    }
}
