use thiserror::Error;

pub type Result<T> = std::result::Result<T, MailError>;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Fatal setup problems. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("address for {key} not found on chain {chain_id} (add \"{chain_id}\" or \"{network}\" in the address table, or set {key}_ADDRESS)")]
    UnresolvedAddress {
        key: String,
        chain_id: u64,
        network: String,
    },
    #[error("address table `{path}` unreadable: {reason}")]
    AddressTable { path: String, reason: String },
}

/// Failures of a single scan call. The enclosing call fails; the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{context} rate limited by provider: {message}")]
    RateLimited {
        context: String,
        message: String,
        retry_after_ms: Option<u64>,
    },
    #[error("{context} timed out after {waited_ms}ms")]
    Timeout { context: String, waited_ms: u64 },
    #[error("{context} transport failure: {message}")]
    Transport { context: String, message: String },
    #[error("scan cancelled before block {next_block}")]
    Cancelled { next_block: u64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("invalid stored record {tx_hash}: {reason}")]
    InvalidRecord { tx_hash: String, reason: String },
}

/// Why a raw log entry was dropped during materialization. Never escapes as a call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected event signature")]
    WrongSignature,
    #[error("expected 4 topics, got {0}")]
    MissingTopics(usize),
    #[error("mail id does not fit in u64")]
    IdOverflow,
    #[error("topic {0} is not a left-padded address")]
    DirtyAddress(usize),
    #[error("log has no block number")]
    Pending,
    #[error("block {0} not found")]
    MissingBlock(u64),
    #[error("block timestamp {0} out of range")]
    BadTimestamp(u64),
}
