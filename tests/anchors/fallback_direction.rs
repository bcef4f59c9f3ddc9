use crate::anchor_utils::read_source;

#[test]
fn test_sent_fallback_is_one_way() {
    let engine = read_source("src/engine.rs");
    assert!(
        engine.contains("(Direction::Sent, MailboxKind::Real) => Some(contracts.mock)")
            && engine.contains("_ => None"),
        "only a real-path sent query may fall back, and only to the mock deployment"
    );
    assert!(
        engine.contains("mock_fallback_used = true") && engine.contains("if events.is_empty()"),
        "fallback must only trigger on an empty real result and must be reported"
    );
}
