/// Collapse a provider/driver error into one bounded line.
///
/// Response payloads (`text: ...`, `body: ...`) and backtraces are elided; whitespace runs are
/// folded so the message can be embedded in a `ScanError` or a log line.
pub fn compact_error_message(message: &str, max_len: usize) -> String {
    let mut raw = message;
    let mut elided = false;
    for marker in [" text: ", " body: "] {
        if let Some((prefix, _)) = raw.split_once(marker) {
            raw = prefix;
            elided = true;
        }
    }
    if let Some((prefix, _)) = raw.split_once("Stack backtrace:") {
        raw = prefix;
    }

    let mut compact = String::with_capacity(raw.len().min(max_len.saturating_add(16)));
    let mut prev_ws = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !prev_ws && !compact.is_empty() {
                compact.push(' ');
            }
            prev_ws = true;
            continue;
        }
        compact.push(ch);
        prev_ws = false;
        if compact.len() > max_len {
            break;
        }
    }
    let mut compact = compact.trim_end().to_string();
    if elided {
        compact.push_str(" payload=<omitted>");
    }
    if compact.len() <= max_len {
        return compact;
    }
    let mut cut = max_len;
    while !compact.is_char_boundary(cut) {
        cut -= 1;
    }
    compact.truncate(cut);
    compact.push_str("...(truncated)");
    compact
}
