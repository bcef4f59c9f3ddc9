use crate::error::StoreError;
use crate::storage::OffChainStore;
use crate::types::{MailMode, OffChainRecord};
use crate::utils::error::compact_error_message;
use alloy::primitives::{Address, B256};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const STORE_ERR_MAX_LEN: usize = 300;

const SELECT_COLUMNS: &str = "mail_id, from_addr, to_addr, cid, tx_hash, subject, body, \
     timestamp_ms, unread, chain_id, contract, block_number, mode, created_at_ms";

/// SQLite-backed mail annotations. One row per transaction hash.
#[derive(Debug, Clone)]
pub struct SqliteMailStore {
    path: PathBuf,
}

struct MailRow {
    mail_id: Option<i64>,
    from_addr: String,
    to_addr: String,
    cid: String,
    tx_hash: Option<String>,
    subject: Option<String>,
    body: Option<String>,
    timestamp_ms: Option<i64>,
    unread: Option<bool>,
    chain_id: Option<i64>,
    contract: Option<String>,
    block_number: Option<i64>,
    mode: Option<String>,
    created_at_ms: i64,
}

impl MailRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            mail_id: row.get(0)?,
            from_addr: row.get(1)?,
            to_addr: row.get(2)?,
            cid: row.get(3)?,
            tx_hash: row.get(4)?,
            subject: row.get(5)?,
            body: row.get(6)?,
            timestamp_ms: row.get(7)?,
            unread: row.get(8)?,
            chain_id: row.get(9)?,
            contract: row.get(10)?,
            block_number: row.get(11)?,
            mode: row.get(12)?,
            created_at_ms: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<OffChainRecord, StoreError> {
        let label = self.tx_hash.clone().unwrap_or_else(|| "<no tx>".to_string());
        let invalid = |reason: String| StoreError::InvalidRecord {
            tx_hash: label.clone(),
            reason,
        };
        let parse_addr = |raw: &str, field: &str| {
            Address::from_str(raw.trim()).map_err(|e| invalid(format!("{field} `{raw}`: {e}")))
        };

        let tx_hash = self
            .tx_hash
            .as_deref()
            .map(|raw| B256::from_str(raw.trim()).map_err(|e| invalid(format!("tx_hash: {e}"))))
            .transpose()?;
        let contract = self
            .contract
            .as_deref()
            .map(|raw| parse_addr(raw, "contract"))
            .transpose()?;
        let mode = self.mode.as_deref().and_then(|raw| {
            let parsed = MailMode::from_db(raw.trim());
            if parsed.is_none() {
                tracing::warn!("[STORE] unknown mail mode `{raw}` for {label}, ignoring");
            }
            parsed
        });
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at_ms)
            .ok_or_else(|| invalid(format!("created_at_ms {} out of range", self.created_at_ms)))?;

        Ok(OffChainRecord {
            mail_id: self.mail_id.and_then(|v| u64::try_from(v).ok()),
            from: parse_addr(&self.from_addr, "from")?,
            to: parse_addr(&self.to_addr, "to")?,
            cid: self.cid,
            tx_hash,
            subject: self.subject,
            body: self.body,
            timestamp: self.timestamp_ms.and_then(DateTime::from_timestamp_millis),
            unread: self.unread,
            chain_id: self.chain_id.and_then(|v| u64::try_from(v).ok()),
            contract,
            block_number: self.block_number.and_then(|v| u64::try_from(v).ok()),
            mode,
            created_at,
        })
    }
}

fn addr_key(addr: &Address) -> String {
    format!("{addr:#x}")
}

fn is_sqlite_locked_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
    )
}

impl SqliteMailStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.ensure_schema()?;
        tracing::info!("[STORE] mail db ready at {}", store.path.display());
        Ok(store)
    }

    fn ensure_schema(&self) -> anyhow::Result<()> {
        self.with_connection("ensure_schema", |conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS mails (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mail_id INTEGER,
                    from_addr TEXT NOT NULL,
                    to_addr TEXT NOT NULL,
                    cid TEXT NOT NULL DEFAULT '',
                    tx_hash TEXT UNIQUE,
                    subject TEXT,
                    body TEXT,
                    timestamp_ms INTEGER,
                    unread INTEGER,
                    chain_id INTEGER,
                    contract TEXT,
                    block_number INTEGER,
                    mode TEXT,
                    created_at_ms INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_mails_to_addr ON mails(to_addr);
                CREATE INDEX IF NOT EXISTS idx_mails_from_addr ON mails(from_addr);
                ",
            )
        })
    }

    fn with_connection<T, F>(&self, context: &str, op: F) -> anyhow::Result<T>
    where
        F: Fn(&Connection) -> rusqlite::Result<T>,
    {
        let max_attempts = 4u32;
        let mut last_err = String::new();

        for attempt in 1..=max_attempts {
            let conn = Connection::open(&self.path).with_context(|| {
                format!("failed to open sqlite database {}", self.path.display())
            })?;
            conn.busy_timeout(Duration::from_millis(5_000))
                .context("failed to configure sqlite busy timeout")?;

            match op(&conn) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = err.to_string();
                    if is_sqlite_locked_error(&err) && attempt < max_attempts {
                        continue;
                    }
                    return Err(anyhow::anyhow!(
                        "{} failed for {}: {}",
                        context,
                        self.path.display(),
                        last_err
                    ));
                }
            }
        }

        Err(anyhow::anyhow!(
            "{} failed for {} after {} attempt(s): {}",
            context,
            self.path.display(),
            max_attempts,
            last_err
        ))
    }

    /// Returns false when a row with the same transaction hash already exists.
    pub fn insert_record_sync(&self, record: &OffChainRecord) -> anyhow::Result<bool> {
        let mail_id = to_i64(record, "mail_id", record.mail_id)?;
        let chain_id = to_i64(record, "chain_id", record.chain_id)?;
        let block_number = to_i64(record, "block_number", record.block_number)?;
        let inserted = self.with_connection("insert_record", |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO mails (
                    mail_id, from_addr, to_addr, cid, tx_hash, subject, body, timestamp_ms,
                    unread, chain_id, contract, block_number, mode, created_at_ms
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    mail_id,
                    addr_key(&record.from),
                    addr_key(&record.to),
                    record.cid,
                    record.tx_hash.map(|h| format!("{h:#x}")),
                    record.subject,
                    record.body,
                    record.timestamp.map(|t| t.timestamp_millis()),
                    record.unread,
                    chain_id,
                    record.contract.as_ref().map(addr_key),
                    block_number,
                    record.mode.map(MailMode::as_str),
                    record.created_at.timestamp_millis(),
                ],
            )
        })?;
        if inserted == 0 {
            tracing::debug!(
                "[STORE] record for {:?} already present, keeping the original",
                record.tx_hash
            );
        }
        Ok(inserted > 0)
    }

    fn select_sync(
        &self,
        context: &str,
        clause: &str,
        key: &str,
    ) -> anyhow::Result<Vec<MailRow>> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM mails WHERE {clause} ORDER BY created_at_ms DESC, id DESC"
        );
        self.with_connection(context, |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![key], MailRow::read)?;
            rows.collect()
        })
    }

    fn find_by_recipient_sync(&self, to: &Address) -> anyhow::Result<Vec<MailRow>> {
        self.select_sync("find_by_recipient", "lower(to_addr) = ?1", &addr_key(to))
    }

    fn find_by_sender_sync(&self, from: &Address) -> anyhow::Result<Vec<MailRow>> {
        self.select_sync("find_by_sender", "lower(from_addr) = ?1", &addr_key(from))
    }

    fn find_by_tx_hash_sync(&self, tx_hash: &B256) -> anyhow::Result<Option<MailRow>> {
        let key = format!("{tx_hash:#x}");
        let sql = format!("SELECT {SELECT_COLUMNS} FROM mails WHERE lower(tx_hash) = ?1");
        self.with_connection("find_by_tx_hash", |conn| {
            conn.query_row(&sql, params![key], MailRow::read).optional()
        })
    }

    pub async fn insert_record(&self, record: OffChainRecord) -> Result<bool, StoreError> {
        self.blocking("insert_record", move |store| store.insert_record_sync(&record))
            .await
    }

    async fn blocking<T, F>(&self, context: &'static str, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&SqliteMailStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Backend(format!("{context} worker failed: {e}")))?
            .map_err(|e| match e.downcast::<StoreError>() {
                Ok(store_err) => store_err,
                Err(e) => {
                    StoreError::Backend(compact_error_message(&format!("{e:#}"), STORE_ERR_MAX_LEN))
                }
            })
    }
}

/// Unreadable rows are dropped so one bad write cannot hide a whole mailbox.
fn rows_into_records(rows: Vec<MailRow>) -> Vec<OffChainRecord> {
    rows.into_iter()
        .filter_map(|row| match row.into_record() {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("[STORE] skipping unreadable row: {err}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl OffChainStore for SqliteMailStore {
    async fn find_by_recipient(&self, to: Address) -> Result<Vec<OffChainRecord>, StoreError> {
        let rows = self
            .blocking("find_by_recipient", move |store| store.find_by_recipient_sync(&to))
            .await?;
        Ok(rows_into_records(rows))
    }

    async fn find_by_sender(&self, from: Address) -> Result<Vec<OffChainRecord>, StoreError> {
        let rows = self
            .blocking("find_by_sender", move |store| store.find_by_sender_sync(&from))
            .await?;
        Ok(rows_into_records(rows))
    }

    async fn find_by_tx_hash(&self, tx_hash: B256) -> Result<Option<OffChainRecord>, StoreError> {
        self.blocking("find_by_tx_hash", move |store| store.find_by_tx_hash_sync(&tx_hash))
            .await?
            .map(MailRow::into_record)
            .transpose()
    }
}

fn to_i64(
    record: &OffChainRecord,
    field: &str,
    value: Option<u64>,
) -> Result<Option<i64>, StoreError> {
    value
        .map(|v| {
            i64::try_from(v).map_err(|_| StoreError::InvalidRecord {
                tx_hash: record
                    .tx_hash
                    .map(|h| format!("{h:#x}"))
                    .unwrap_or_else(|| "<no tx>".to_string()),
                reason: format!("{field} {v} does not fit a signed 64-bit column"),
            })
        })
        .transpose()
}
