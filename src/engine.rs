//! Request-level orchestration: pick a deployment, scan, materialize, reconcile.

use crate::config::addresses::{AddressBook, MAILBOX_KEY, MAILBOX_MOCK_KEY};
use crate::error::{Result, ScanError, StoreError};
use crate::ledger::{AlloyLedgerClient, LedgerClient};
use crate::mailbox::{ContractHandle, LogQuery, MailboxContracts, MailboxKind};
use crate::merge::{merge, Merger};
use crate::scan::{self, materialize, BlockRange};
use crate::storage::mail_db::SqliteMailStore;
use crate::storage::OffChainStore;
use crate::types::{
    ChainEvent, ConnectionInfo, Direction, MergedRecord, OffChainRecord, SentView,
};
use crate::utils::config::{EngineConfig, ScanSettings};
use alloy::primitives::{Address, B256};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Which deployment serves a request, and where to go if it comes back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePlan {
    pub primary: ContractHandle,
    pub fallback: Option<ContractHandle>,
}

/// Inbox honours the caller's choice as-is. Sent falls back from real to mock, never the
/// other way round.
pub fn select_source(
    contracts: &MailboxContracts,
    use_mock: bool,
    direction: Direction,
) -> SourcePlan {
    let primary = contracts.handle(MailboxKind::from_mock_flag(use_mock));
    let fallback = match (direction, primary.kind) {
        (Direction::Sent, MailboxKind::Real) => Some(contracts.mock),
        _ => None,
    };
    SourcePlan { primary, fallback }
}

pub struct MailEngine {
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn OffChainStore>,
    contracts: MailboxContracts,
    scan: ScanSettings,
}

impl MailEngine {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn OffChainStore>,
        contracts: MailboxContracts,
        scan: ScanSettings,
    ) -> Self {
        Self {
            ledger,
            store,
            contracts,
            scan,
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn connect(config: &EngineConfig) -> Result<Self> {
        let book = AddressBook::load(&config.addresses_file, config.network.clone())?
            .with_env_overrides(&[MAILBOX_KEY, MAILBOX_MOCK_KEY]);
        let contracts = MailboxContracts::resolve(&book, config.chain_id)?;
        let ledger = AlloyLedgerClient::connect(&config.rpc_url, config.rpc_call_timeout_ms)?;
        let store = SqliteMailStore::open(&config.mail_db_path)
            .map_err(|e| StoreError::Backend(format!("{e:#}")))?;
        Ok(Self::new(
            Arc::new(ledger),
            Arc::new(store),
            contracts,
            config.scan,
        ))
    }

    async fn planned_range(&self) -> std::result::Result<BlockRange, ScanError> {
        let latest = self.ledger.latest_block_number().await?;
        let range = scan::plan(latest, self.scan.start_block, self.scan.lookback_window);
        if range.is_empty() {
            tracing::info!(
                "[ENGINE] start block {} is past head {}, nothing to scan",
                range.from,
                latest
            );
        }
        Ok(range)
    }

    async fn chain_events(
        &self,
        query: &LogQuery,
        range: BlockRange,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<ChainEvent>, ScanError> {
        let logs = scan::scan(
            self.ledger.as_ref(),
            query,
            range,
            self.scan.chunk_size,
            cancel,
        )
        .await?;
        Ok(materialize(self.ledger.as_ref(), logs).await?.into_events())
    }

    pub async fn get_inbox(&self, address: Address, use_mock: bool) -> Result<Vec<MergedRecord>> {
        self.get_inbox_cancellable(address, use_mock, &CancellationToken::new())
            .await
    }

    pub async fn get_inbox_cancellable(
        &self,
        address: Address,
        use_mock: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<MergedRecord>> {
        let plan = select_source(&self.contracts, use_mock, Direction::Inbox);
        let range = self.planned_range().await?;
        let events = self
            .chain_events(&LogQuery::recipient(plan.primary, address), range, cancel)
            .await?;
        let stored = self.store.find_by_recipient(address).await?;
        let merged = merge(&events, &stored);
        tracing::info!(
            "[ENGINE] inbox {:#x} via {} blocks {}..={}: {} event(s) + {} stored -> {}",
            address,
            plan.primary.kind.as_str(),
            range.from,
            range.to,
            events.len(),
            stored.len(),
            merged.len()
        );
        Ok(merged)
    }

    pub async fn get_sent(&self, address: Address, use_mock: bool) -> Result<SentView> {
        self.get_sent_cancellable(address, use_mock, &CancellationToken::new())
            .await
    }

    pub async fn get_sent_cancellable(
        &self,
        address: Address,
        use_mock: bool,
        cancel: &CancellationToken,
    ) -> Result<SentView> {
        let plan = select_source(&self.contracts, use_mock, Direction::Sent);
        let range = self.planned_range().await?;
        let mut served_by = plan.primary.kind;
        let mut events = self
            .chain_events(&LogQuery::sender(plan.primary, address), range, cancel)
            .await?;

        let mut mock_fallback_used = false;
        if events.is_empty() {
            if let Some(fallback) = plan.fallback {
                let fallback_events = self
                    .chain_events(&LogQuery::sender(fallback, address), range, cancel)
                    .await?;
                if !fallback_events.is_empty() {
                    tracing::info!(
                        "[ENGINE] sent {:#x}: real deployment empty, serving {} mock event(s)",
                        address,
                        fallback_events.len()
                    );
                    events = fallback_events;
                    served_by = fallback.kind;
                    mock_fallback_used = true;
                }
            }
        }

        let stored = self.store.find_by_sender(address).await?;
        let records = merge(&events, &stored);
        tracing::info!(
            "[ENGINE] sent {:#x} via {}: {} event(s) + {} stored -> {}",
            address,
            served_by.as_str(),
            events.len(),
            stored.len(),
            records.len()
        );
        Ok(SentView {
            records,
            mock: served_by == MailboxKind::Mock,
            mock_fallback_used,
        })
    }

    pub async fn get_message_by_id(&self, id: u64, use_mock: bool) -> Result<Option<MergedRecord>> {
        self.get_message_by_id_cancellable(id, use_mock, &CancellationToken::new())
            .await
    }

    /// First `EncryptedMailSent` with this id, enriched with its off-chain record if any.
    pub async fn get_message_by_id_cancellable(
        &self,
        id: u64,
        use_mock: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<MergedRecord>> {
        let contract = self
            .contracts
            .handle(MailboxKind::from_mock_flag(use_mock));
        let range = self.planned_range().await?;
        let Some(log) = scan::scan_first(
            self.ledger.as_ref(),
            &LogQuery::by_id(contract, id),
            range,
            self.scan.chunk_size,
            cancel,
        )
        .await?
        else {
            tracing::debug!("[ENGINE] mail #{id} not found on {}", contract.kind.as_str());
            return Ok(None);
        };

        let Some(event) = materialize(self.ledger.as_ref(), vec![log])
            .await?
            .into_events()
            .into_iter()
            .next()
        else {
            return Ok(None);
        };

        let mut merger = Merger::new();
        merger.push_chain(&event);
        if let Some(hash) = event.tx_hash {
            if let Some(stored) = self.store.find_by_tx_hash(hash).await? {
                merger.push_store(&stored);
            }
        }
        Ok(merger.finish().into_iter().next())
    }

    /// Pure store lookup; the ledger is not consulted.
    pub async fn get_message_by_tx_hash(&self, tx_hash: B256) -> Result<Option<OffChainRecord>> {
        Ok(self.store.find_by_tx_hash(tx_hash).await?)
    }

    pub async fn check_connection(&self) -> Result<ConnectionInfo> {
        let chain_id = self.ledger.chain_id().await?;
        Ok(ConnectionInfo {
            chain_id,
            mailbox: self.contracts.real.address,
            mailbox_mock: self.contracts.mock.address,
        })
    }
}
