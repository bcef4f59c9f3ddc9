#![allow(dead_code)]

use alloy::primitives::{keccak256, Address, Bytes, Log as PrimitiveLog, LogData, B256, U256};
use alloy::rpc::types::{Filter, Log};
use async_trait::async_trait;
use fhe_mailbox::error::ScanError;
use fhe_mailbox::ledger::LedgerClient;
use fhe_mailbox::mailbox::{LogQuery, MailboxContracts};
use fhe_mailbox::storage::MemoryMailStore;
use fhe_mailbox::types::OffChainRecord;
use fhe_mailbox::utils::config::ScanSettings;
use fhe_mailbox::MailEngine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const REAL: Address = Address::new([0xaa; 20]);
pub const MOCK: Address = Address::new([0xbb; 20]);

pub fn contracts() -> MailboxContracts {
    MailboxContracts::new(REAL, MOCK)
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn tx(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn mail_log(
    contract: Address,
    id: u64,
    from: Address,
    to: Address,
    block: u64,
    tx_byte: u8,
) -> Log {
    let topics = vec![
        keccak256("EncryptedMailSent(uint256,address,address)"),
        B256::from(U256::from(id)),
        from.into_word(),
        to.into_word(),
    ];
    Log {
        inner: PrimitiveLog {
            address: contract,
            data: LogData::new_unchecked(topics, Bytes::new()),
        },
        block_hash: None,
        block_number: Some(block),
        block_timestamp: None,
        transaction_hash: Some(tx(tx_byte)),
        transaction_index: None,
        log_index: None,
        removed: false,
    }
}

pub fn block_time(block: u64) -> i64 {
    1_700_000_000 + block as i64 * 12
}

/// Scripted ledger: a fixed head, a fixed log set, and a record of every range query.
pub struct ScriptedLedger {
    head: u64,
    logs: Vec<Log>,
    queried: Mutex<Vec<(Address, u64, u64)>>,
    block_lookups: AtomicUsize,
    fail_on: Option<Address>,
}

impl ScriptedLedger {
    pub fn new(head: u64, logs: Vec<Log>) -> Self {
        Self {
            head,
            logs,
            queried: Mutex::new(Vec::new()),
            block_lookups: AtomicUsize::new(0),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, contract: Address) -> Self {
        self.fail_on = Some(contract);
        self
    }

    pub fn queried_contracts(&self) -> Vec<Address> {
        let mut seen = Vec::new();
        for (contract, _, _) in self.queried.lock().expect("queried lock").iter() {
            if !seen.contains(contract) {
                seen.push(*contract);
            }
        }
        seen
    }

    pub fn query_count(&self) -> usize {
        self.queried.lock().expect("queried lock").len()
    }

    pub fn block_lookups(&self) -> usize {
        self.block_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn chain_id(&self) -> Result<u64, ScanError> {
        Ok(11_155_111)
    }

    async fn latest_block_number(&self) -> Result<u64, ScanError> {
        Ok(self.head)
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ScanError> {
        self.block_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(u64::try_from(block_time(number)).ok())
    }

    async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>, ScanError> {
        Ok(Vec::new())
    }

    async fn query_event_logs(
        &self,
        query: &LogQuery,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ScanError> {
        self.queried
            .lock()
            .expect("queried lock")
            .push((query.address, from_block, to_block));
        if self.fail_on == Some(query.address) {
            return Err(ScanError::RateLimited {
                context: "eth_getLogs".to_string(),
                message: "429 Too Many Requests".to_string(),
                retry_after_ms: Some(1_000),
            });
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| log.address() == query.address)
            .filter(|log| log.topics().first() == Some(&query.event_signature))
            .filter(|log| {
                query
                    .topics
                    .iter()
                    .enumerate()
                    .all(|(i, want)| want.map_or(true, |w| log.topics().get(i + 1) == Some(&w)))
            })
            .filter(|log| {
                log.block_number
                    .is_some_and(|b| (from_block..=to_block).contains(&b))
            })
            .cloned()
            .collect())
    }
}

pub fn settings() -> ScanSettings {
    ScanSettings {
        start_block: None,
        lookback_window: 1_000,
        chunk_size: 10,
    }
}

pub fn engine_with(
    ledger: Arc<ScriptedLedger>,
    records: Vec<OffChainRecord>,
    scan: ScanSettings,
) -> MailEngine {
    let store = MemoryMailStore::new();
    for record in records {
        store.insert(record).expect("insert record");
    }
    MailEngine::new(ledger, Arc::new(store), contracts(), scan)
}

pub fn record(tx_byte: u8, from: Address, to: Address) -> OffChainRecord {
    OffChainRecord::new(from, to, "bafyCID", Some(tx(tx_byte)))
}
