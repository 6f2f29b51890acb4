use std::net::SocketAddr;
use std::time::Duration;

use product_core::memory::DEFAULT_PAGE_SIZE;
use thiserror::Error;

const DEFAULT_TABLE_NAME: &str = "product-inventory";

/// Default bound on a single store call.
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Errors from reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line (CloudWatch).
    Json,
    /// Human-readable text.
    Text,
}

/// Settings shared by the Lambda function and the local server.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PRODUCTS_TABLE`
    pub table_name: String,
    /// `OPERATION_TIMEOUT`, e.g. "5s" or "750ms".
    pub operation_timeout: Duration,
    /// `DYNAMODB_ENDPOINT`, e.g. "http://localhost:8000" for DynamoDB Local.
    pub dynamodb_endpoint: Option<String>,
    /// `LOG_FORMAT`: "json" or "text".
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name = lookup("PRODUCTS_TABLE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let operation_timeout = match lookup("OPERATION_TIMEOUT") {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_OPERATION_TIMEOUT,
        };

        let dynamodb_endpoint = lookup("DYNAMODB_ENDPOINT").filter(|v| !v.is_empty());

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("text") => LogFormat::Text,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected \"json\" or \"text\", got {other:?}"),
                });
            }
        };

        Ok(Self {
            table_name,
            operation_timeout,
            dynamodb_endpoint,
            log_format,
        })
    }
}

/// Which store backs the local server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

/// Settings used only by the local HTTP server.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// `LISTEN_ADDR`
    pub listen_addr: SocketAddr,
    /// `STORE_BACKEND`: "dynamodb" or "memory".
    pub store_backend: StoreBackend,
    /// `SCAN_PAGE_SIZE`, memory backend only.
    pub scan_page_size: usize,
}

impl LocalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "LISTEN_ADDR",
                reason: format!("{e}"),
            })?;

        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("dynamodb") => StoreBackend::DynamoDb,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "STORE_BACKEND",
                    reason: format!("expected \"dynamodb\" or \"memory\", got {other:?}"),
                });
            }
        };

        let scan_page_size = match lookup("SCAN_PAGE_SIZE") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SCAN_PAGE_SIZE",
                        reason: format!("expected a positive integer, got {raw:?}"),
                    });
                }
            },
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            listen_addr,
            store_backend,
            scan_page_size,
        })
    }
}

/// Parse a timeout given either as a humantime duration ("5s", "1m30s") or as
/// whole seconds ("5").
fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let parsed = humantime::parse_duration(raw)
        .ok()
        .or_else(|| raw.parse::<u64>().ok().map(Duration::from_secs));

    match parsed {
        Some(d) if !d.is_zero() => Ok(d),
        _ => Err(ConfigError::Invalid {
            var: "OPERATION_TIMEOUT",
            reason: format!("cannot parse {raw:?} as a non-zero duration"),
        }),
    }
}
