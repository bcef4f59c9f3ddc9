use crate::config::chains::{ChainConfig, SEPOLIA_CHAIN_ID};
use crate::error::ConfigError;
use crate::scan::range::{DEFAULT_LOG_CHUNK, DEFAULT_LOG_WINDOW};
use std::env;
use std::path::PathBuf;

const DEFAULT_ADDRESSES_FILE: &str = "shared/addresses.json";
const DEFAULT_MAIL_DB_PATH: &str = "mail.db";

/// Bounds for historical log scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Explicit first block; overrides the lookback window when set.
    pub start_block: Option<u64>,
    pub lookback_window: u64,
    pub chunk_size: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            start_block: None,
            lookback_window: DEFAULT_LOG_WINDOW,
            chunk_size: DEFAULT_LOG_CHUNK,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub network: String,
    pub addresses_file: PathBuf,
    pub mail_db_path: PathBuf,
    pub rpc_call_timeout_ms: u64,
    pub scan: ScanSettings,
}

fn validate_http_url(name: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed = raw
        .parse::<reqwest::Url>()
        .map_err(|e| ConfigError::Invalid(format!("{name} must be a valid URL, got `{raw}`: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{name} must use http(s) scheme, got `{other}`"
        ))),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64_var(name: &str) -> Result<Option<u64>, ConfigError> {
    match non_empty_var(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<u64>().map(Some).map_err(|e| {
            ConfigError::Invalid(format!("{name} must be a non-negative integer, got `{raw}`: {e}"))
        }),
    }
}

impl ScanSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let start_block = parse_u64_var("START_BLOCK")?;
        let lookback_window = parse_u64_var("LOG_WINDOW")?.unwrap_or(DEFAULT_LOG_WINDOW);
        let chunk_size = parse_u64_var("LOG_CHUNK")?.unwrap_or(DEFAULT_LOG_CHUNK);
        if chunk_size == 0 {
            return Err(ConfigError::Invalid("LOG_CHUNK must be at least 1".to_string()));
        }
        Ok(Self {
            start_block,
            lookback_window,
            chunk_size,
        })
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_url = non_empty_var("SEPOLIA_RPC_URL")
            .or_else(|| non_empty_var("RPC_URL"))
            .ok_or_else(|| {
                ConfigError::Missing("SEPOLIA_RPC_URL (or RPC_URL) must be set".to_string())
            })?;
        validate_http_url("RPC_URL", &rpc_url)?;

        let chain_id = parse_u64_var("CHAIN_ID")?.unwrap_or(SEPOLIA_CHAIN_ID);
        let network =
            non_empty_var("NETWORK").unwrap_or_else(|| ChainConfig::get(chain_id).network);

        let addresses_file = non_empty_var("ADDRESSES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ADDRESSES_FILE));
        let mail_db_path = non_empty_var("MAIL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MAIL_DB_PATH));
        let rpc_call_timeout_ms =
            crate::utils::rpc::clamp_call_timeout_ms(parse_u64_var("RPC_CALL_TIMEOUT_MS")?);

        Ok(Self {
            rpc_url,
            chain_id,
            network,
            addresses_file,
            mail_db_path,
            rpc_call_timeout_ms,
            scan: ScanSettings::from_env()?,
        })
    }
}
