pub mod mail_db;

use crate::error::StoreError;
use crate::types::OffChainRecord;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use std::sync::RwLock;

/// Off-chain annotations keyed by transaction hash. Read-only from the engine's side.
#[async_trait]
pub trait OffChainStore: Send + Sync {
    async fn find_by_recipient(&self, to: Address) -> Result<Vec<OffChainRecord>, StoreError>;

    async fn find_by_sender(&self, from: Address) -> Result<Vec<OffChainRecord>, StoreError>;

    async fn find_by_tx_hash(&self, tx_hash: B256) -> Result<Option<OffChainRecord>, StoreError>;
}

/// Process-local store, newest first.
#[derive(Debug, Default)]
pub struct MemoryMailStore {
    records: RwLock<Vec<OffChainRecord>>,
}

impl MemoryMailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a record with the same transaction hash already exists.
    pub fn insert(&self, record: OffChainRecord) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        if record.tx_hash.is_some() && records.iter().any(|r| r.tx_hash == record.tx_hash) {
            return Ok(false);
        }
        records.push(record);
        Ok(true)
    }

    fn select(
        &self,
        predicate: impl Fn(&OffChainRecord) -> bool,
    ) -> Result<Vec<OffChainRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))?;
        let mut out: Vec<_> = records.iter().filter(|r| predicate(r)).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[async_trait]
impl OffChainStore for MemoryMailStore {
    async fn find_by_recipient(&self, to: Address) -> Result<Vec<OffChainRecord>, StoreError> {
        self.select(|r| r.to == to)
    }

    async fn find_by_sender(&self, from: Address) -> Result<Vec<OffChainRecord>, StoreError> {
        self.select(|r| r.from == from)
    }

    async fn find_by_tx_hash(&self, tx_hash: B256) -> Result<Option<OffChainRecord>, StoreError> {
        Ok(self
            .select(|r| r.tx_hash == Some(tx_hash))?
            .into_iter()
            .next())
    }
}
