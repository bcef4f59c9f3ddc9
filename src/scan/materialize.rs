use crate::error::{DecodeError, ScanError};
use crate::ledger::LedgerClient;
use crate::mailbox::mail_sent_topic;
use crate::types::ChainEvent;
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    Event(ChainEvent),
    Skipped {
        reason: DecodeError,
        tx_hash: Option<B256>,
        block_number: Option<u64>,
    },
}

/// One outcome per input log, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Materialized {
    pub outcomes: Vec<LogOutcome>,
}

impl Materialized {
    pub fn events(&self) -> impl Iterator<Item = &ChainEvent> {
        self.outcomes.iter().filter_map(|o| match o {
            LogOutcome::Event(event) => Some(event),
            LogOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LogOutcome::Skipped { .. }))
            .count()
    }

    pub fn into_events(self) -> Vec<ChainEvent> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                LogOutcome::Event(event) => Some(event),
                LogOutcome::Skipped { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MailTopics {
    id: u64,
    from: Address,
    to: Address,
}

fn decode_address_topic(word: &B256, index: usize) -> Result<Address, DecodeError> {
    if word.0[..12].iter().any(|b| *b != 0) {
        return Err(DecodeError::DirtyAddress(index));
    }
    Ok(Address::from_word(*word))
}

fn decode_mail_topics(log: &Log) -> Result<MailTopics, DecodeError> {
    let topics = log.topics();
    match topics.first() {
        None => return Err(DecodeError::MissingTopics(0)),
        Some(topic0) if *topic0 != mail_sent_topic() => return Err(DecodeError::WrongSignature),
        Some(_) => {}
    }
    if topics.len() < 4 {
        return Err(DecodeError::MissingTopics(topics.len()));
    }
    let id = u64::try_from(U256::from_be_bytes(topics[1].0)).map_err(|_| DecodeError::IdOverflow)?;
    Ok(MailTopics {
        id,
        from: decode_address_topic(&topics[2], 2)?,
        to: decode_address_topic(&topics[3], 3)?,
    })
}

fn to_datetime(secs: u64) -> Result<DateTime<Utc>, DecodeError> {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or(DecodeError::BadTimestamp(secs))
}

struct BlockClock<'a> {
    ledger: &'a dyn LedgerClient,
    seen: HashMap<u64, Option<u64>>,
}

impl BlockClock<'_> {
    async fn timestamp(&mut self, log: &Log, block_number: u64) -> Result<Option<u64>, ScanError> {
        if let Some(ts) = log.block_timestamp {
            return Ok(Some(ts));
        }
        if let Some(cached) = self.seen.get(&block_number) {
            return Ok(*cached);
        }
        let fetched = self.ledger.block_timestamp(block_number).await?;
        self.seen.insert(block_number, fetched);
        Ok(fetched)
    }
}

async fn materialize_one(
    clock: &mut BlockClock<'_>,
    log: &Log,
) -> Result<Result<ChainEvent, DecodeError>, ScanError> {
    let topics = match decode_mail_topics(log) {
        Ok(t) => t,
        Err(reason) => return Ok(Err(reason)),
    };
    let Some(block_number) = log.block_number else {
        return Ok(Err(DecodeError::Pending));
    };
    let Some(secs) = clock.timestamp(log, block_number).await? else {
        return Ok(Err(DecodeError::MissingBlock(block_number)));
    };
    Ok(to_datetime(secs).map(|block_time| ChainEvent {
        id: Some(topics.id),
        from: topics.from,
        to: topics.to,
        tx_hash: log.transaction_hash,
        block_number,
        block_time,
    }))
}

/// Decode raw logs into chain events, preserving order.
///
/// Undecodable entries become [`LogOutcome::Skipped`]; only ledger failures abort. Block
/// timestamps are fetched at most once per block for the duration of this call.
pub async fn materialize(
    ledger: &dyn LedgerClient,
    logs: Vec<Log>,
) -> Result<Materialized, ScanError> {
    let mut clock = BlockClock {
        ledger,
        seen: HashMap::new(),
    };
    let mut outcomes = Vec::with_capacity(logs.len());
    for log in &logs {
        match materialize_one(&mut clock, log).await? {
            Ok(event) => outcomes.push(LogOutcome::Event(event)),
            Err(reason) => {
                tracing::warn!(
                    "[SCAN] skipping log tx={:?} block={:?}: {}",
                    log.transaction_hash,
                    log.block_number,
                    reason
                );
                outcomes.push(LogOutcome::Skipped {
                    reason,
                    tx_hash: log.transaction_hash,
                    block_number: log.block_number,
                });
            }
        }
    }
    let materialized = Materialized { outcomes };
    if materialized.skipped() > 0 {
        tracing::info!(
            "[SCAN] materialized {} event(s), skipped {}",
            materialized.outcomes.len() - materialized.skipped(),
            materialized.skipped()
        );
    }
    Ok(materialized)
}
