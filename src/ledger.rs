//! Read-only ledger access used by the scanners.

use crate::error::{ConfigError, ScanError};
use crate::mailbox::LogQuery;
use crate::utils::rpc::with_call_timeout;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{BlockTransactionsKind, Filter, Log};
use alloy::transports::http::Http;
use async_trait::async_trait;
use reqwest::Client;

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ScanError>;

    async fn latest_block_number(&self) -> Result<u64, ScanError>;

    /// Seconds since epoch, or `None` when the node does not know the block.
    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ScanError>;

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ScanError>;

    async fn query_event_logs(
        &self,
        query: &LogQuery,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, ScanError> {
        self.get_logs(&query.to_filter(from_block, to_block)).await
    }
}

pub struct AlloyLedgerClient {
    provider: RootProvider<Http<Client>>,
    call_timeout_ms: u64,
}

impl AlloyLedgerClient {
    pub fn connect(rpc_url: &str, call_timeout_ms: u64) -> Result<Self, ConfigError> {
        let url = rpc_url
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("RPC_URL `{rpc_url}`: {e}")))?;
        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            call_timeout_ms,
        })
    }
}

#[async_trait]
impl LedgerClient for AlloyLedgerClient {
    async fn chain_id(&self) -> Result<u64, ScanError> {
        with_call_timeout("eth_chainId", self.call_timeout_ms, self.provider.get_chain_id()).await
    }

    async fn latest_block_number(&self) -> Result<u64, ScanError> {
        with_call_timeout(
            "eth_blockNumber",
            self.call_timeout_ms,
            self.provider.get_block_number(),
        )
        .await
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ScanError> {
        let block = with_call_timeout(
            "eth_getBlockByNumber",
            self.call_timeout_ms,
            self.provider
                .get_block_by_number(number.into(), BlockTransactionsKind::Hashes),
        )
        .await?;
        Ok(block.map(|b| b.header.timestamp))
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ScanError> {
        with_call_timeout("eth_getLogs", self.call_timeout_ms, self.provider.get_logs(filter)).await
    }
}
