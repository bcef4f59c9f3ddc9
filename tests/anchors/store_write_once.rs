use crate::anchor_utils::read_source;

#[test]
fn test_mail_store_is_write_once_per_tx_hash() {
    let store = read_source("src/storage/mail_db.rs");
    assert!(
        store.contains("tx_hash TEXT UNIQUE") && store.contains("INSERT OR IGNORE INTO mails"),
        "mails table must keep the first record written for a transaction hash"
    );
    assert!(
        store.contains("lower(to_addr) = ?1") && store.contains("lower(from_addr) = ?1"),
        "address lookups must be case-insensitive"
    );
    assert!(
        store.contains("busy_timeout(Duration::from_millis(5_000))"),
        "every sqlite connection must set a busy timeout"
    );
}
