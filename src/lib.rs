//! Chain-state reconciliation for the FHE mailbox.
//!
//! Resolves the mailbox deployments, scans `EncryptedMailSent` logs in provider-safe chunks,
//! and merges them with off-chain mail records into per-address inbox and sent views.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod mailbox;
pub mod merge;
pub mod runtime;
pub mod scan;
pub mod storage;
pub mod types;
pub mod utils;

pub mod config {
    pub mod addresses;
    pub mod chains;
}

pub use engine::MailEngine;
pub use error::{MailError, Result};
