//! Fee configuration.
//!
//! Amounts are in nanotons. The defaults are the values the Fortune Cookie
//! dApp attaches to its messages; a deployment may override them from a
//! TOML `[fees]` table.

use serde::{Deserialize, Serialize};

/// One TON in nanotons.
pub const NANOTONS_PER_TON: u64 = 1_000_000_000;

/// Maximum number of items a single batch mint may carry.
pub const MAX_BATCH_SIZE: usize = 250;

/// Amounts attached to collection and item messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Storage deposit forwarded to every newly minted item (0.05 TON).
    pub min_storage: u64,
    /// Gas reserved per minted item on top of the storage deposit (0.015 TON).
    pub gas_per_item: u64,
    /// Value attached to owner, content, royalty, transfer and unseal messages (0.05 TON).
    pub admin_value: u64,
    /// Value attached to `get_static_data` (0.1 TON).
    pub static_data_value: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            min_storage: 50_000_000,
            gas_per_item: 15_000_000,
            admin_value: 50_000_000,
            static_data_value: 100_000_000,
        }
    }
}

impl FeeConfig {
    /// Value to attach to a single mint: the item's pass amount (or the
    /// storage deposit) plus gas.
    pub fn mint_value(&self, pass_amount: Option<u128>) -> u128 {
        pass_amount.unwrap_or(self.min_storage as u128) + self.gas_per_item as u128
    }

    /// Value to attach to a batch mint of `items` items.
    pub fn batch_mint_value(&self, items: usize) -> u128 {
        (self.min_storage as u128 + self.gas_per_item as u128) * items as u128
    }
}

/// Format nanotons as a decimal TON amount, trimming trailing zeros.
pub fn format_ton(nanotons: u128) -> String {
    let per_ton = NANOTONS_PER_TON as u128;
    let whole = nanotons / per_ton;
    let frac = nanotons % per_ton;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fees() {
        let fees = FeeConfig::default();
        assert_eq!(fees.min_storage, 50_000_000);
        assert_eq!(fees.gas_per_item, 15_000_000);
        assert_eq!(fees.admin_value, 50_000_000);
        assert_eq!(fees.static_data_value, 100_000_000);
    }

    #[test]
    fn test_mint_value() {
        let fees = FeeConfig::default();
        assert_eq!(fees.mint_value(None), 65_000_000);
        assert_eq!(fees.mint_value(Some(1_000_000_000)), 1_015_000_000);
    }

    #[test]
    fn test_batch_mint_value() {
        let fees = FeeConfig::default();
        assert_eq!(fees.batch_mint_value(0), 0);
        assert_eq!(fees.batch_mint_value(3), 195_000_000);
        assert_eq!(fees.batch_mint_value(MAX_BATCH_SIZE), 16_250_000_000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let fees: FeeConfig = toml::from_str("min_storage = 70000000").unwrap();
        assert_eq!(fees.min_storage, 70_000_000);
        assert_eq!(fees.gas_per_item, 15_000_000);
    }

    #[test]
    fn test_format_ton() {
        assert_eq!(format_ton(0), "0");
        assert_eq!(format_ton(1_000_000_000), "1");
        assert_eq!(format_ton(65_000_000), "0.065");
        assert_eq!(format_ton(16_250_000_000), "16.25");
        assert_eq!(format_ton(1), "0.000000001");
    }
}
