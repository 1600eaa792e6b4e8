use crate::errors::{CacheError, Result};
use std::path::PathBuf;

/// Runtime settings the cache reads from its hosting DNS server.
///
/// Construction mirrors the rest of the server: `Default` for tests,
/// `from_env` for deployments.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve expired records within the serve-stale window (RFC 8767)
    pub serve_stale: bool,

    /// UDP payload size advertised in response EDNS
    pub udp_payload_size: u16,

    /// Folder holding the cache snapshot file
    pub config_folder: PathBuf,

    /// Maximum number of cached entry variants (0 = no capacity eviction)
    pub maximum_entries: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            serve_stale: true,
            udp_payload_size: 1232,
            config_folder: PathBuf::from("."),
            maximum_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Build a configuration from `MIMIR_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("MIMIR_SERVE_STALE") {
            config.serve_stale = matches!(value.as_str(), "1" | "true" | "yes");
        }

        if let Ok(value) = std::env::var("MIMIR_UDP_PAYLOAD_SIZE") {
            config.udp_payload_size = value.parse().map_err(|_| {
                CacheError::InvalidInput(format!("Invalid UDP payload size: {}", value))
            })?;
        }

        if let Ok(value) = std::env::var("MIMIR_CONFIG_FOLDER") {
            config.config_folder = PathBuf::from(value);
        }

        if let Ok(value) = std::env::var("MIMIR_MAX_CACHE_ENTRIES") {
            let max: i64 = value
                .parse()
                .map_err(|_| CacheError::InvalidInput(format!("Invalid cache size: {}", value)))?;
            if max < 0 {
                return Err(CacheError::InvalidInput(format!(
                    "Invalid cache size: {}",
                    max
                )));
            }
            config.maximum_entries = max;
        }

        Ok(config)
    }
}
