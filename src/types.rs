use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// EIP-55 output for addresses; input accepts any hex case.
pub mod checksum {
    use alloy::primitives::Address;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(addr: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&addr.to_checksum(None))
    }

    pub fn serialize_opt<S: Serializer>(
        addr: &Option<Address>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match addr {
            Some(addr) => serialize(addr, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// One `EncryptedMailSent` occurrence on the ledger. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub id: Option<u64>,
    #[serde(serialize_with = "checksum::serialize")]
    pub from: Address,
    #[serde(serialize_with = "checksum::serialize")]
    pub to: Address,
    pub tx_hash: Option<B256>,
    pub block_number: u64,
    pub block_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MailMode {
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "mock")]
    Mock,
    #[serde(rename = "tx-first")]
    TxFirst,
}

impl MailMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Mock => "mock",
            Self::TxFirst => "tx-first",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "real" => Some(Self::Real),
            "mock" => Some(Self::Mock),
            "tx-first" => Some(Self::TxFirst),
            _ => None,
        }
    }
}

/// Annotation persisted by the submission path. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffChainRecord {
    pub mail_id: Option<u64>,
    #[serde(serialize_with = "checksum::serialize")]
    pub from: Address,
    #[serde(serialize_with = "checksum::serialize")]
    pub to: Address,
    #[serde(default)]
    pub cid: String,
    pub tx_hash: Option<B256>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub unread: Option<bool>,
    pub chain_id: Option<u64>,
    #[serde(serialize_with = "checksum::serialize_opt")]
    pub contract: Option<Address>,
    pub block_number: Option<u64>,
    pub mode: Option<MailMode>,
    pub created_at: DateTime<Utc>,
}

impl OffChainRecord {
    /// Minimal record as written right after a submission lands.
    pub fn new(from: Address, to: Address, cid: impl Into<String>, tx_hash: Option<B256>) -> Self {
        Self {
            mail_id: None,
            from,
            to,
            cid: cid.into(),
            tx_hash,
            subject: None,
            body: None,
            timestamp: None,
            unread: None,
            chain_id: None,
            contract: None,
            block_number: None,
            mode: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Chain,
    Db,
    Combined,
}

impl RecordSource {
    pub fn combine(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::Combined
        }
    }
}

/// Output unit of a reconciled view. Lives for one response only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    pub key: String,
    pub id: Option<u64>,
    #[serde(serialize_with = "checksum::serialize")]
    pub from: Address,
    #[serde(serialize_with = "checksum::serialize")]
    pub to: Address,
    pub cid: Option<String>,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub block_time: Option<DateTime<Utc>>,
    pub timestamp: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub chain_id: Option<u64>,
    #[serde(serialize_with = "checksum::serialize_opt")]
    pub contract: Option<Address>,
    pub mode: Option<MailMode>,
    pub unread: Option<bool>,
    pub subject: String,
    pub snippet: String,
    pub body_plain: String,
    pub date: Option<DateTime<Utc>>,
    pub read: bool,
    pub source: RecordSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbox,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentView {
    pub records: Vec<MergedRecord>,
    /// The chain side was served by the mock deployment.
    pub mock: bool,
    /// Real path came back empty and the mock deployment was consulted instead.
    pub mock_fallback_used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub chain_id: u64,
    #[serde(serialize_with = "checksum::serialize")]
    pub mailbox: Address,
    #[serde(serialize_with = "checksum::serialize")]
    pub mailbox_mock: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mail_mode_db_mapping_is_total() {
        for mode in [MailMode::Real, MailMode::Mock, MailMode::TxFirst] {
            assert_eq!(MailMode::from_db(mode.as_str()), Some(mode));
        }
        assert_eq!(MailMode::from_db("legacy"), None);
    }

    #[test]
    fn test_record_source_combination() {
        assert_eq!(RecordSource::Chain.combine(RecordSource::Chain), RecordSource::Chain);
        assert_eq!(RecordSource::Chain.combine(RecordSource::Db), RecordSource::Combined);
        assert_eq!(RecordSource::Combined.combine(RecordSource::Db), RecordSource::Combined);
    }

    #[test]
    fn test_merged_record_serializes_camel_case() {
        let record = MergedRecord {
            key: "k".to_string(),
            id: Some(3),
            from: Address::repeat_byte(0x01),
            to: Address::repeat_byte(0x02),
            cid: None,
            tx_hash: None,
            block_number: Some(100),
            block_time: None,
            timestamp: None,
            created_at: None,
            chain_id: None,
            contract: None,
            mode: Some(MailMode::TxFirst),
            unread: None,
            subject: "Hi".to_string(),
            snippet: String::new(),
            body_plain: String::new(),
            date: None,
            read: false,
            source: RecordSource::Combined,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["blockNumber"], 100);
        assert_eq!(json["bodyPlain"], "");
        assert_eq!(json["mode"], "tx-first");
        assert_eq!(json["source"], "combined");
        assert!(json.get("block_number").is_none());
    }

    const LOWER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_addresses_serialize_checksummed() {
        let addr = Address::from_str(LOWER).expect("address");
        let event = ChainEvent {
            id: Some(1),
            from: addr,
            to: addr,
            tx_hash: None,
            block_number: 1,
            block_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("ts"),
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["from"], CHECKSUMMED);
        assert_eq!(json["to"], CHECKSUMMED);

        let mut record = OffChainRecord::new(addr, addr, "", None);
        record.contract = Some(addr);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["from"], CHECKSUMMED);
        assert_eq!(json["contract"], CHECKSUMMED);
        assert!(serde_json::to_value(OffChainRecord::new(addr, addr, "", None))
            .expect("serialize")["contract"]
            .is_null());

        let back: OffChainRecord = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.contract, Some(addr));

        let info = ConnectionInfo {
            chain_id: 1,
            mailbox: addr,
            mailbox_mock: addr,
        };
        let json = serde_json::to_value(&info).expect("serialize");
        assert_eq!(json["mailbox"], CHECKSUMMED);
        assert_eq!(json["mailboxMock"], CHECKSUMMED);
    }
}
