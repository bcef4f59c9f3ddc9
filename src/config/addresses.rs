//! Contract address resolution across deployment targets.
//!
//! Precedence, first valid candidate wins:
//! 1. `<KEY>_ADDRESS` override captured from the environment,
//! 2. `table["<chain_id>"]["<KEY>"]`,
//! 3. `table["<network>"]["<KEY>"]`,
//! 4. `table["<KEY>"]`.
//!
//! Malformed candidates are skipped, never accepted.

use crate::error::ConfigError;
use alloy::primitives::Address;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub const MAILBOX_KEY: &str = "FHEMailbox";
pub const MAILBOX_MOCK_KEY: &str = "FHEMailboxMock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    EnvOverride,
    ChainId,
    Network,
    Flat,
}

#[derive(Debug, Clone)]
pub struct AddressBook {
    table: Value,
    network: String,
    overrides: HashMap<String, String>,
}

/// `0x` followed by exactly 40 hex digits, any case.
pub fn is_well_formed_address(raw: &str) -> bool {
    raw.strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn parse_candidate(raw: Option<&str>) -> Option<Address> {
    let raw = raw?.trim();
    if !is_well_formed_address(raw) {
        return None;
    }
    Address::from_str(raw).ok()
}

impl AddressBook {
    pub fn new(table: Value, network: impl Into<String>) -> Self {
        Self {
            table,
            network: network.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>, network: impl Into<String>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::AddressTable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let table: Value = serde_json::from_str(&raw).map_err(|e| ConfigError::AddressTable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(table, network))
    }

    pub fn with_override(mut self, key: &str, raw: impl Into<String>) -> Self {
        self.overrides.insert(key.to_string(), raw.into());
        self
    }

    /// Capture `<KEY>_ADDRESS` for each key once, at startup.
    pub fn with_env_overrides(mut self, keys: &[&str]) -> Self {
        for key in keys {
            if let Ok(raw) = std::env::var(format!("{key}_ADDRESS")) {
                self.overrides.insert((*key).to_string(), raw);
            }
        }
        self
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn resolve(&self, key: &str, chain_id: u64) -> Result<Address, ConfigError> {
        self.resolve_with_source(key, chain_id).map(|(addr, _)| addr)
    }

    pub fn resolve_with_source(
        &self,
        key: &str,
        chain_id: u64,
    ) -> Result<(Address, AddressSource), ConfigError> {
        let candidates = [
            (
                AddressSource::EnvOverride,
                self.overrides.get(key).map(String::as_str),
            ),
            (
                AddressSource::ChainId,
                self.table
                    .get(chain_id.to_string())
                    .and_then(|section| section.get(key))
                    .and_then(Value::as_str),
            ),
            (
                AddressSource::Network,
                self.table
                    .get(&self.network)
                    .and_then(|section| section.get(key))
                    .and_then(Value::as_str),
            ),
            (
                AddressSource::Flat,
                self.table.get(key).and_then(Value::as_str),
            ),
        ];

        for (source, raw) in candidates {
            if let Some(addr) = parse_candidate(raw) {
                tracing::debug!("[CONFIG] {key} on chain {chain_id} resolved via {source:?}");
                return Ok((addr, source));
            }
            if let Some(raw) = raw {
                tracing::warn!("[CONFIG] skipping malformed {key} candidate from {source:?}: `{raw}`");
            }
        }

        Err(ConfigError::UnresolvedAddress {
            key: key.to_string(),
            chain_id,
            network: self.network.clone(),
        })
    }
}
