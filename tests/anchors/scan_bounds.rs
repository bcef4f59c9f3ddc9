use crate::anchor_utils::read_source;

#[test]
fn test_scans_are_chunked_and_cancellable() {
    let chunked = read_source("src/scan/chunked.rs");
    let range = read_source("src/scan/range.rs");
    assert!(
        chunked.contains("cancel.is_cancelled()") && chunked.contains("ScanError::Cancelled"),
        "chunk loop must observe cancellation between sub-ranges"
    );
    assert!(
        range.contains("chunk.max(1)") && range.contains("saturating_sub(lookback)"),
        "range planner must clamp zero chunks and never underflow the lookback"
    );
}

#[test]
fn test_provider_calls_are_deadline_bounded() {
    let ledger = read_source("src/ledger.rs");
    for call in ["eth_chainId", "eth_blockNumber", "eth_getBlockByNumber", "eth_getLogs"] {
        assert!(ledger.contains(&format!("\"{call}\"")), "{call} must be labelled");
    }
    assert!(
        ledger.matches("with_call_timeout(").count() >= 4,
        "every provider call must run under the per-call timeout"
    );
    assert!(
        !ledger.contains("retry"),
        "ledger calls are single-shot; callers decide whether to retry"
    );
}
