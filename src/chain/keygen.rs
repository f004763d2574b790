//! Fresh account generation for `gen-funded`.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

/// A newly generated account. Only the address survives generation; the key
/// is dropped before this value is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedAccount {
    pub address: Address,
}

/// Produces fresh random accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    /// Generate an account whose address differs from `exclude`.
    pub fn generate(&self, exclude: Address) -> GeneratedAccount {
        loop {
            let address = PrivateKeySigner::random().address();
            if address != exclude && address != Address::ZERO {
                return GeneratedAccount { address };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_addresses_are_distinct() {
        let generator = KeyGenerator;
        let funding = Address::repeat_byte(0x11);
        let addresses: HashSet<_> = (0..32).map(|_| generator.generate(funding).address).collect();
        assert_eq!(addresses.len(), 32);
        assert!(!addresses.contains(&funding));
    }
}
