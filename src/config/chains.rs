pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_NETWORK: &str = "sepolia";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    /// Key used for the named-network section of the shared address table.
    pub network: String,
    pub block_time_ms: u64,
}

impl ChainConfig {
    pub fn get(chain_id: u64) -> Self {
        match chain_id {
            SEPOLIA_CHAIN_ID => Self::sepolia(),
            1 => Self::mainnet(),
            31_337 => Self::hardhat(),
            8_009 => Self::zama_devnet(),
            other => Self {
                chain_id: other,
                name: format!("chain-{other}"),
                network: DEFAULT_NETWORK.to_string(),
                block_time_ms: 12_000,
            },
        }
    }

    pub fn sepolia() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            name: "Sepolia".to_string(),
            network: "sepolia".to_string(),
            block_time_ms: 12_000,
        }
    }

    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            name: "Ethereum Mainnet".to_string(),
            network: "mainnet".to_string(),
            block_time_ms: 12_000,
        }
    }

    pub fn hardhat() -> Self {
        Self {
            chain_id: 31_337,
            name: "Hardhat".to_string(),
            network: "localhost".to_string(),
            block_time_ms: 1_000,
        }
    }

    pub fn zama_devnet() -> Self {
        Self {
            chain_id: 8_009,
            name: "Zama Devnet".to_string(),
            network: "zama".to_string(),
            block_time_ms: 5_000,
        }
    }

    /// Rough wall-clock span covered by `blocks` on this chain.
    pub fn approx_span_secs(&self, blocks: u64) -> u64 {
        blocks.saturating_mul(self.block_time_ms) / 1_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_chain_ids_map_to_network_keys() {
        assert_eq!(ChainConfig::get(SEPOLIA_CHAIN_ID).network, "sepolia");
        assert_eq!(ChainConfig::get(31_337).network, "localhost");
        assert_eq!(ChainConfig::get(1).network, "mainnet");
    }

    #[test]
    fn test_unknown_chain_falls_back_to_default_network() {
        let cfg = ChainConfig::get(424_242);
        assert_eq!(cfg.chain_id, 424_242);
        assert_eq!(cfg.network, DEFAULT_NETWORK);
    }

    #[test]
    fn test_default_window_spans_roughly_three_hours_on_sepolia() {
        assert_eq!(ChainConfig::sepolia().approx_span_secs(1_000), 12_000);
    }
}
