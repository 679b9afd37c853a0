//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;

/// Default port when neither `LISTEN_ADDR` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 5000;

/// Default per-connection outbound queue capacity.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `LISTEN_ADDR` could not be parsed as a socket address.
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    ListenAddr {
        /// Raw value.
        value: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },

    /// `PORT` could not be parsed as a port number.
    #[error("invalid PORT {value:?}: {source}")]
    Port {
        /// Raw value.
        value: String,
        /// Parse failure.
        source: std::num::ParseIntError,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Capacity of each connection's outbound frame queue.
    pub outbound_buffer: usize,

    /// Log output format.
    pub log_format: LogFormat,

    /// Whether to install a permissive CORS layer.
    pub cors_permissive: bool,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `LISTEN_ADDR` or `PORT` is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::ListenAddr { value, source })?,
            None => {
                let port = match lookup("PORT") {
                    Some(value) => value
                        .parse()
                        .map_err(|source| ConfigError::Port { value, source })?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let outbound_buffer = parse_value(lookup("WS_OUTBOUND_BUFFER"), DEFAULT_OUTBOUND_BUFFER).max(1);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_permissive = parse_bool(lookup("CORS_PERMISSIVE"), true);

        Ok(Self {
            listen_addr,
            outbound_buffer,
            log_format,
            cors_permissive,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            log_format: LogFormat::Pretty,
            cors_permissive: true,
        }
    }
}

/// Parses a raw value as `T`, returning `default` on missing or invalid
/// values.
fn parse_value<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses a raw value as a boolean. Accepts `"true"`, `"1"`, `"false"`,
/// `"0"`. Returns `default` otherwise.
fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let Ok(config) = load(&[]) else {
            panic!("empty environment should load");
        };
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
        assert_eq!(config.outbound_buffer, DEFAULT_OUTBOUND_BUFFER);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.cors_permissive);
    }

    #[test]
    fn port_used_without_listen_addr() {
        let Ok(config) = load(&[("PORT", "8080")]) else {
            panic!("PORT should parse");
        };
        assert_eq!(config.listen_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    }

    #[test]
    fn listen_addr_wins_over_port() {
        let Ok(config) = load(&[("LISTEN_ADDR", "127.0.0.1:9000"), ("PORT", "8080")]) else {
            panic!("LISTEN_ADDR should parse");
        };
        assert_eq!(config.listen_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
    }

    #[test]
    fn malformed_addresses_are_errors() {
        assert!(matches!(
            load(&[("LISTEN_ADDR", "nope")]),
            Err(ConfigError::ListenAddr { .. })
        ));
        assert!(matches!(load(&[("PORT", "99999")]), Err(ConfigError::Port { .. })));
    }

    #[test]
    fn outbound_buffer_is_at_least_one() {
        let Ok(config) = load(&[("WS_OUTBOUND_BUFFER", "0")]) else {
            panic!("buffer should parse");
        };
        assert_eq!(config.outbound_buffer, 1);
    }

    #[test]
    fn json_log_format_and_cors_toggle() {
        let Ok(config) = load(&[("LOG_FORMAT", "json"), ("CORS_PERMISSIVE", "false")]) else {
            panic!("should load");
        };
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.cors_permissive);
    }
}
