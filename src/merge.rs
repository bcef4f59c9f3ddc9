//! Keyed reconciliation of chain events with off-chain records.

use crate::types::{ChainEvent, MergedRecord, OffChainRecord, RecordSource};
use alloy::primitives::B256;
use std::collections::{HashMap, HashSet};

pub const SUBJECT_PLACEHOLDER: &str = "(encrypted/hidden)";
const SUBJECT_PREVIEW_CHARS: usize = 80;
const SNIPPET_CHARS: usize = 90;
const TX_PREVIEW_CHARS: usize = 10;

/// Replace every `<...>` tag with a space, fold whitespace runs, trim.
pub fn strip_html(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        text.push_str(&rest[..open]);
        text.push(' ');
        rest = &rest[open + close + 1..];
    }
    text.push_str(rest);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn derive_subject(subject: Option<&str>, body_plain: &str) -> String {
    if let Some(s) = subject.map(str::trim).filter(|s| !s.is_empty()) {
        return s.to_string();
    }
    if !body_plain.is_empty() {
        return take_chars(body_plain, SUBJECT_PREVIEW_CHARS).to_string();
    }
    SUBJECT_PLACEHOLDER.to_string()
}

pub fn derive_snippet(body_plain: &str, cid: Option<&str>, tx_hash: Option<B256>) -> String {
    if !body_plain.is_empty() {
        return take_chars(body_plain, SNIPPET_CHARS).to_string();
    }
    if let Some(cid) = cid.filter(|c| !c.is_empty()) {
        return format!("CID: {cid}");
    }
    match tx_hash {
        Some(hash) => format!("tx: {}…", take_chars(&format!("{hash:#x}"), TX_PREVIEW_CHARS)),
        None => String::new(),
    }
}

fn refresh_derived(record: &mut MergedRecord) {
    record.snippet = derive_snippet(&record.body_plain, record.cid.as_deref(), record.tx_hash);
    record.date = record.block_time.or(record.timestamp).or(record.created_at);
    record.read = record.unread == Some(false);
}

fn hash_key(hash: &B256) -> String {
    format!("{hash:#x}")
}

impl From<&ChainEvent> for MergedRecord {
    fn from(event: &ChainEvent) -> Self {
        let mut record = MergedRecord {
            key: event.tx_hash.as_ref().map(hash_key).unwrap_or_default(),
            id: event.id,
            from: event.from,
            to: event.to,
            cid: None,
            tx_hash: event.tx_hash,
            block_number: Some(event.block_number),
            block_time: Some(event.block_time),
            timestamp: None,
            created_at: None,
            chain_id: None,
            contract: None,
            mode: None,
            unread: None,
            subject: SUBJECT_PLACEHOLDER.to_string(),
            snippet: String::new(),
            body_plain: String::new(),
            date: None,
            read: false,
            source: RecordSource::Chain,
        };
        refresh_derived(&mut record);
        record
    }
}

impl From<&OffChainRecord> for MergedRecord {
    fn from(stored: &OffChainRecord) -> Self {
        let body_plain = stored.body.as_deref().map(strip_html).unwrap_or_default();
        let mut record = MergedRecord {
            key: stored.tx_hash.as_ref().map(hash_key).unwrap_or_default(),
            id: stored.mail_id,
            from: stored.from,
            to: stored.to,
            cid: Some(stored.cid.clone()).filter(|c| !c.is_empty()),
            tx_hash: stored.tx_hash,
            block_number: stored.block_number,
            block_time: None,
            timestamp: stored.timestamp,
            created_at: Some(stored.created_at),
            chain_id: stored.chain_id,
            contract: stored.contract,
            mode: stored.mode,
            unread: stored.unread,
            subject: derive_subject(stored.subject.as_deref(), &body_plain),
            snippet: String::new(),
            body_plain,
            date: None,
            read: false,
            source: RecordSource::Db,
        };
        refresh_derived(&mut record);
        record
    }
}

/// Fold `next` into `cur`. Present fields are never erased and a real subject is never
/// replaced by the placeholder.
fn combine(cur: &mut MergedRecord, next: MergedRecord) {
    if cur.subject == SUBJECT_PLACEHOLDER && next.subject != SUBJECT_PLACEHOLDER {
        cur.subject = next.subject;
    }
    if next.body_plain.chars().count() > cur.body_plain.chars().count() {
        cur.body_plain = next.body_plain;
    }
    cur.id = cur.id.or(next.id);
    cur.cid = cur.cid.take().or(next.cid);
    cur.block_number = cur.block_number.or(next.block_number);
    cur.block_time = cur.block_time.or(next.block_time);
    cur.timestamp = cur.timestamp.or(next.timestamp);
    cur.created_at = cur.created_at.or(next.created_at);
    cur.chain_id = cur.chain_id.or(next.chain_id);
    cur.contract = cur.contract.or(next.contract);
    cur.mode = cur.mode.or(next.mode);
    cur.unread = cur.unread.or(next.unread);
    cur.source = cur.source.combine(next.source);
    refresh_derived(cur);
}

/// Accumulates records keyed by transaction hash.
#[derive(Debug, Default)]
pub struct Merger {
    records: Vec<MergedRecord>,
    by_hash: HashMap<B256, usize>,
    keys: HashSet<String>,
    local_seq: u64,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chain(&mut self, event: &ChainEvent) {
        self.push(MergedRecord::from(event));
    }

    pub fn push_store(&mut self, record: &OffChainRecord) {
        self.push(MergedRecord::from(record));
    }

    fn push(&mut self, mut next: MergedRecord) {
        if let Some(hash) = next.tx_hash {
            if let Some(&slot) = self.by_hash.get(&hash) {
                combine(&mut self.records[slot], next);
                return;
            }
            self.by_hash.insert(hash, self.records.len());
        } else {
            next.key = self.unique_local_key(next.id);
        }
        self.keys.insert(next.key.clone());
        self.records.push(next);
    }

    /// Hash-less records are never coalesced, so each one gets a key of its own.
    fn unique_local_key(&mut self, id: Option<u64>) -> String {
        self.local_seq += 1;
        let base = match id {
            Some(id) => format!("id:{id}"),
            None => format!("local:{}", self.local_seq),
        };
        if self.keys.contains(&base) {
            format!("{base}:{}", self.local_seq)
        } else {
            base
        }
    }

    pub fn finish(self) -> Vec<MergedRecord> {
        sort_records(self.records)
    }
}

/// Block-bearing records ordered by block descending, the rest by date descending, then the
/// two runs interleaved by date. Ties keep insertion order and favour block-bearing records.
pub fn sort_records(records: Vec<MergedRecord>) -> Vec<MergedRecord> {
    let (mut on_chain, mut off_chain): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|r| r.block_number.is_some());
    on_chain.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    off_chain.sort_by(|a, b| b.date.cmp(&a.date));

    let mut out = Vec::with_capacity(on_chain.len() + off_chain.len());
    let mut on_chain = on_chain.into_iter().peekable();
    let mut off_chain = off_chain.into_iter().peekable();
    loop {
        let take_off_chain = match (on_chain.peek(), off_chain.peek()) {
            (Some(a), Some(b)) => b.date > a.date,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => break,
        };
        let next = if take_off_chain {
            off_chain.next()
        } else {
            on_chain.next()
        };
        out.extend(next);
    }
    out
}

/// Chain events are folded first, then off-chain records.
pub fn merge(chain_events: &[ChainEvent], off_chain: &[OffChainRecord]) -> Vec<MergedRecord> {
    let mut merger = Merger::new();
    for event in chain_events {
        merger.push_chain(event);
    }
    for record in off_chain {
        merger.push_store(record);
    }
    let merged = merger.finish();
    tracing::debug!(
        "[MERGE] {} chain + {} off-chain -> {} record(s)",
        chain_events.len(),
        off_chain.len(),
        merged.len()
    );
    merged
}
