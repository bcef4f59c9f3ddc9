use crate::error::ScanError;
use crate::ledger::LedgerClient;
use crate::mailbox::LogQuery;
use crate::scan::range::BlockRange;
use alloy::rpc::types::Log;
use tokio_util::sync::CancellationToken;

/// Query `range` in ascending sub-ranges of at most `chunk` blocks and flatten the results.
///
/// Any failing sub-range fails the whole scan; partial results are discarded. Cancellation is
/// observed between sub-ranges, never mid-call.
pub async fn scan(
    ledger: &dyn LedgerClient,
    query: &LogQuery,
    range: BlockRange,
    chunk: u64,
    cancel: &CancellationToken,
) -> Result<Vec<Log>, ScanError> {
    let mut out = Vec::new();
    let mut queried = 0usize;
    for window in range.chunks(chunk) {
        if cancel.is_cancelled() {
            tracing::info!(
                "[SCAN] cancelled at block {} after {} chunk(s)",
                window.from,
                queried
            );
            return Err(ScanError::Cancelled {
                next_block: window.from,
            });
        }
        let logs = ledger
            .query_event_logs(query, window.from, window.to)
            .await?;
        queried += 1;
        if !logs.is_empty() {
            tracing::debug!(
                "[SCAN] {:#x} blocks {}..={} -> {} log(s)",
                query.address,
                window.from,
                window.to,
                logs.len()
            );
        }
        out.extend(logs);
    }
    tracing::debug!(
        "[SCAN] {:#x} range {}..={} done: {} chunk(s), {} log(s)",
        query.address,
        range.from,
        range.to,
        queried,
        out.len()
    );
    Ok(out)
}

/// Like [`scan`], but stops at the first non-empty sub-range and returns its first log.
pub async fn scan_first(
    ledger: &dyn LedgerClient,
    query: &LogQuery,
    range: BlockRange,
    chunk: u64,
    cancel: &CancellationToken,
) -> Result<Option<Log>, ScanError> {
    for window in range.chunks(chunk) {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled {
                next_block: window.from,
            });
        }
        let logs = ledger
            .query_event_logs(query, window.from, window.to)
            .await?;
        if let Some(first) = logs.into_iter().next() {
            tracing::debug!(
                "[SCAN] {:#x} first match in blocks {}..={}",
                query.address,
                window.from,
                window.to
            );
            return Ok(Some(first));
        }
    }
    Ok(None)
}
