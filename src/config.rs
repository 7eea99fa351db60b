use std::net::SocketAddr;

use thiserror::Error;

/// Default search page size.
const DEFAULT_SEARCH_PAGE_SIZE: usize = 10;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MCP_AUTH_TOKEN environment variable is not set; refusing to start unauthenticated")]
    MissingAuthToken,
    #[error("NOTES_STORE_URL environment variable is not set")]
    MissingStoreUrl,
    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub store_url: String,
    pub store_token: Option<String>,
    pub auth_token: String,
    pub bind_addr: SocketAddr,
    pub search_page_size: usize,
}

impl ServerConfig {
    /// Load configuration from environment.
    ///
    /// - `NOTES_STORE_URL` (required): base URL of the note store
    /// - `NOTES_STORE_TOKEN` (optional): bearer credential for the note store
    /// - `MCP_AUTH_TOKEN` (required): credential every MCP client must present
    /// - `MCP_BIND_ADDR` (optional, default 127.0.0.1:3000)
    /// - `MCP_SEARCH_PAGE_SIZE` (optional, default 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_token = non_empty("MCP_AUTH_TOKEN").ok_or(ConfigError::MissingAuthToken)?;
        let store_url = non_empty("NOTES_STORE_URL").ok_or(ConfigError::MissingStoreUrl)?;
        let store_token = non_empty("NOTES_STORE_TOKEN");

        let bind_addr = non_empty("MCP_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid("MCP_BIND_ADDR", e.to_string()))?;

        let search_page_size = match non_empty("MCP_SEARCH_PAGE_SIZE") {
            Some(val) => match val.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid(
                        "MCP_SEARCH_PAGE_SIZE",
                        "must be a positive integer".into(),
                    ))
                }
            },
            None => DEFAULT_SEARCH_PAGE_SIZE,
        };

        Ok(Self {
            store_url,
            store_token,
            auth_token,
            bind_addr,
            search_page_size,
        })
    }
}
