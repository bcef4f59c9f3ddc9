use crate::error::ScanError;
use crate::ledger::LedgerClient;
use crate::mailbox::{mail_sent_topic, LogQuery};
use crate::scan::range::BlockRange;
use alloy::primitives::{Address, Bytes, Log as PrimitiveLog, LogData, B256, U256};
use alloy::rpc::types::{Filter, Log};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub(crate) fn make_rpc_log(
    address: Address,
    topics: Vec<B256>,
    block_number: Option<u64>,
    tx_hash: Option<B256>,
) -> Log {
    Log {
        inner: PrimitiveLog {
            address,
            data: LogData::new_unchecked(topics, Bytes::new()),
        },
        block_hash: None,
        block_number,
        block_timestamp: None,
        transaction_hash: tx_hash,
        transaction_index: None,
        log_index: None,
        removed: false,
    }
}

pub(crate) fn mail_log(
    contract: Address,
    id: u64,
    from: Address,
    to: Address,
    block: u64,
    tx_byte: u8,
) -> Log {
    make_rpc_log(
        contract,
        vec![
            mail_sent_topic(),
            B256::from(U256::from(id)),
            from.into_word(),
            to.into_word(),
        ],
        Some(block),
        Some(B256::repeat_byte(tx_byte)),
    )
}

/// In-memory ledger. Block `n` has timestamp `1_700_000_000 + n * 12`.
pub(crate) struct FakeLedger {
    logs: Vec<Log>,
    missing_blocks: Vec<u64>,
    fail_from_block: Option<u64>,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: Mutex<Vec<BlockRange>>,
    block_lookups: AtomicUsize,
}

impl FakeLedger {
    pub(crate) fn new(logs: Vec<Log>) -> Self {
        Self {
            logs,
            missing_blocks: Vec::new(),
            fail_from_block: None,
            cancel_after: None,
            calls: Mutex::new(Vec::new()),
            block_lookups: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_from(mut self, block: u64) -> Self {
        self.fail_from_block = Some(block);
        self
    }

    pub(crate) fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub(crate) fn without_block(mut self, block: u64) -> Self {
        self.missing_blocks.push(block);
        self
    }

    pub(crate) fn calls(&self) -> Vec<BlockRange> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn block_lookups(&self) -> usize {
        self.block_lookups.load(Ordering::SeqCst)
    }
}

fn topic_matches(log: &Log, query: &LogQuery) -> bool {
    let topics = log.topics();
    if topics.first() != Some(&query.event_signature) {
        return false;
    }
    query
        .topics
        .iter()
        .enumerate()
        .all(|(i, want)| want.map_or(true, |w| topics.get(i + 1) == Some(&w)))
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn chain_id(&self) -> Result<u64, ScanError> {
        Ok(11_155_111)
    }

    async fn latest_block_number(&self) -> Result<u64, ScanError> {
        Ok(self
            .logs
            .iter()
            .filter_map(|l| l.block_number)
            .max()
            .unwrap_or(0))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ScanError> {
        self.block_lookups.fetch_add(1, Ordering::SeqCst);
        if self.missing_blocks.contains(&number) {
            return Ok(None);
        }
        Ok(Some(1_700_000_000 + number * 12))
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
        let call_count = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(BlockRange {
                from: from_block,
                to: to_block,
            });
            calls.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if call_count >= *after {
                token.cancel();
            }
        }
        if self.fail_from_block.is_some_and(|b| from_block >= b) {
            return Err(ScanError::RateLimited {
                context: "eth_getLogs".to_string(),
                message: "429 Too Many Requests".to_string(),
                retry_after_ms: None,
            });
        }
        Ok(self
            .logs
            .iter()
            .filter(|l| l.address() == query.address)
            .filter(|l| topic_matches(l, query))
            .filter(|l| {
                l.block_number
                    .is_some_and(|b| (from_block..=to_block).contains(&b))
            })
            .cloned()
            .collect())
    }
}
