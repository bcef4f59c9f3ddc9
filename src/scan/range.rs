pub const DEFAULT_LOG_WINDOW: u64 = 1_000;
/// Small enough for free-tier `eth_getLogs` range caps.
pub const DEFAULT_LOG_CHUNK: u64 = 10;

/// Closed block range. `from > to` means there is nothing to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.to - self.from + 1
        }
    }

    /// Closed sub-ranges of at most `chunk` blocks, ascending. A zero chunk is treated as 1.
    pub fn chunks(&self, chunk: u64) -> impl Iterator<Item = BlockRange> {
        let step = chunk.max(1);
        let BlockRange { from, to } = *self;
        let mut next = Some(from).filter(|_| from <= to);
        std::iter::from_fn(move || {
            let start = next?;
            let end = start.saturating_add(step - 1).min(to);
            next = end.checked_add(1).filter(|n| *n <= to);
            Some(BlockRange { from: start, to: end })
        })
    }
}

/// Range to scan given the chain head. Makes no network call.
pub fn plan(latest: u64, start_override: Option<u64>, lookback: u64) -> BlockRange {
    let from = start_override.unwrap_or_else(|| latest.saturating_sub(lookback));
    BlockRange { from, to: latest }
}
