use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};

use crate::arb::types::TokenId;

/// Decimals of every token the pools trade, read from a JSON object mapping token
/// addresses to their decimals
#[derive(Debug, Clone, Default)]
pub struct Decimals(HashMap<TokenId, u8>);

impl Decimals {
    /// Loads the decimals file.
    ///
    /// # Errors
    /// * If the file cannot be read or is not a JSON object of numbers
    /// * If a key is not an address
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("Cannot read decimals from {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Parses a JSON object of `"0xtoken": decimals`.
    ///
    /// # Errors
    /// * If the JSON is malformed or a key is not an address
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: HashMap<String, u8> = serde_json::from_str(raw)?;
        entries
            .into_iter()
            .map(|(token, decimals)| {
                let address = Address::from_str(&token)
                    .wrap_err_with(|| format!("Invalid token address {token}"))?;
                Ok((TokenId(address), decimals))
            })
            .collect::<Result<_>>()
            .map(Self)
    }

    /// Decimals of `token`.
    ///
    /// # Errors
    /// * If the token is unknown
    pub fn get(&self, token: &TokenId) -> Result<u8> {
        self.0
            .get(token)
            .copied()
            .ok_or_else(|| eyre!("No decimals for token {token}"))
    }

    /// Records the decimals of `token`
    pub fn insert(&mut self, token: TokenId, decimals: u8) {
        self.0.insert(token, decimals);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_is_case_insensitive_on_addresses() {
        let decimals = Decimals::from_json(
            r#"{"0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2": 18, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48": 6}"#,
        )
        .unwrap();
        let weth = TokenId(Address::from_str("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap());
        let usdc = TokenId(Address::from_str("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap());
        assert_eq!(decimals.get(&weth).unwrap(), 18);
        assert_eq!(decimals.get(&usdc).unwrap(), 6);
        assert!(decimals.get(&TokenId(Address::ZERO)).is_err());
    }

    #[test]
    fn test_from_json_rejects_bad_address() {
        assert!(Decimals::from_json(r#"{"weth": 18}"#).is_err());
    }
}
