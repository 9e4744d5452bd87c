use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_APP_NAME: &str = "Crédito PME API";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub app_name: String,
    /// Directory searched for `dadoscreditoficticios.{json,csv,parquet,xml}`.
    pub data_dir: PathBuf,
    pub max_body_bytes: usize,
    pub lookup_cache_capacity: u64,
    pub lookup_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            app_name: DEFAULT_APP_NAME.to_string(),
            data_dir: PathBuf::from("data"),
            max_body_bytes: 64 * 1024,
            lookup_cache_capacity: 1024,
            lookup_cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("App name: {}", config.app_name);
        tracing::debug!("Data directory: {}", config.data_dir.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Unset and blank variables fall back to [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            port: var("PORT")
                .map(|port| {
                    port.trim().parse().map_err(|_| {
                        anyhow::anyhow!("PORT must be a valid number between 1-65535")
                    })
                })
                .transpose()?
                .unwrap_or(defaults.port),
            app_name: var("APP_NAME")
                .map(|name| name.trim().to_string())
                .unwrap_or(defaults.app_name),
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_body_bytes: var("MAX_BODY_BYTES")
                .map(|bytes| {
                    bytes
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| anyhow::anyhow!("MAX_BODY_BYTES must be a positive integer"))
                        .and_then(|bytes| {
                            if bytes == 0 {
                                anyhow::bail!("MAX_BODY_BYTES cannot be zero");
                            }
                            Ok(bytes)
                        })
                })
                .transpose()?
                .unwrap_or(defaults.max_body_bytes),
            lookup_cache_capacity: var("LOOKUP_CACHE_CAPACITY")
                .map(|capacity| {
                    capacity.trim().parse().map_err(|_| {
                        anyhow::anyhow!("LOOKUP_CACHE_CAPACITY must be a non-negative integer")
                    })
                })
                .transpose()?
                .unwrap_or(defaults.lookup_cache_capacity),
            lookup_cache_ttl_secs: var("LOOKUP_CACHE_TTL_SECS")
                .map(|ttl| {
                    ttl.trim().parse().map_err(|_| {
                        anyhow::anyhow!("LOOKUP_CACHE_TTL_SECS must be a non-negative integer")
                    })
                })
                .transpose()?
                .unwrap_or(defaults.lookup_cache_ttl_secs),
        })
    }
}
