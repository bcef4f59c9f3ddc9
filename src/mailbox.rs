//! Mailbox contract handles and the `EncryptedMailSent` log shape.

use crate::config::addresses::{AddressBook, MAILBOX_KEY, MAILBOX_MOCK_KEY};
use crate::error::ConfigError;
use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::rpc::types::Filter;
use serde::Serialize;

/// `id`, `from` and `to` are all indexed; the data section is not read.
pub const MAIL_SENT_EVENT: &str = "EncryptedMailSent(uint256,address,address)";

pub fn mail_sent_topic() -> B256 {
    keccak256(MAIL_SENT_EVENT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MailboxKind {
    Real,
    Mock,
}

impl MailboxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Mock => "mock",
        }
    }

    pub fn from_mock_flag(use_mock: bool) -> Self {
        if use_mock {
            Self::Mock
        } else {
            Self::Real
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractHandle {
    pub kind: MailboxKind,
    pub address: Address,
}

/// Both deployments, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxContracts {
    pub real: ContractHandle,
    pub mock: ContractHandle,
}

impl MailboxContracts {
    pub fn new(real: Address, mock: Address) -> Self {
        Self {
            real: ContractHandle {
                kind: MailboxKind::Real,
                address: real,
            },
            mock: ContractHandle {
                kind: MailboxKind::Mock,
                address: mock,
            },
        }
    }

    pub fn resolve(book: &AddressBook, chain_id: u64) -> Result<Self, ConfigError> {
        let real = book.resolve(MAILBOX_KEY, chain_id)?;
        let mock = book.resolve(MAILBOX_MOCK_KEY, chain_id)?;
        tracing::info!(
            "[CONFIG] mailbox={:#x} mailbox_mock={:#x} chain={} network={}",
            real,
            mock,
            chain_id,
            book.network()
        );
        Ok(Self::new(real, mock))
    }

    pub fn handle(&self, kind: MailboxKind) -> ContractHandle {
        match kind {
            MailboxKind::Real => self.real,
            MailboxKind::Mock => self.mock,
        }
    }
}

/// Address + topic constraints for one scan. `topics[i]` filters indexed topic `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub event_signature: B256,
    pub topics: [Option<B256>; 3],
}

impl LogQuery {
    pub fn recipient(contract: ContractHandle, to: Address) -> Self {
        Self {
            address: contract.address,
            event_signature: mail_sent_topic(),
            topics: [None, None, Some(to.into_word())],
        }
    }

    pub fn sender(contract: ContractHandle, from: Address) -> Self {
        Self {
            address: contract.address,
            event_signature: mail_sent_topic(),
            topics: [None, Some(from.into_word()), None],
        }
    }

    pub fn by_id(contract: ContractHandle, id: u64) -> Self {
        Self {
            address: contract.address,
            event_signature: mail_sent_topic(),
            topics: [Some(B256::from(U256::from(id).to_be_bytes::<32>())), None, None],
        }
    }

    pub fn to_filter(&self, from_block: u64, to_block: u64) -> Filter {
        let mut filter = Filter::new()
            .address(self.address)
            .event_signature(self.event_signature)
            .from_block(from_block)
            .to_block(to_block);
        if let Some(topic) = self.topics[0] {
            filter = filter.topic1(topic);
        }
        if let Some(topic) = self.topics[1] {
            filter = filter.topic2(topic);
        }
        if let Some(topic) = self.topics[2] {
            filter = filter.topic3(topic);
        }
        filter
    }
}
