//! Dictionary item keys under which the contract stores balances and allowances.
//!
//! Dictionary item keys are limited to 64 characters. A balance key is the base64 form of the
//! 33-byte serialized holder key (44 characters), an allowance key is the hex form of the BLAKE2b
//! digest of the serialized owner key followed by the serialized spender key (64 characters).
use base64::{Engine as _, engine::general_purpose::STANDARD};
use blake2_rfc::blake2b::blake2b;

use crate::key::{KeyParameter, SERIALIZED_LENGTH};

const DIGEST_LENGTH: usize = 32;

/// Dictionary item key of `account` in the `balances` dictionary.
pub fn balance_key(account: &KeyParameter) -> String {
    STANDARD.encode(account.to_bytes())
}

/// Dictionary item key of the `(owner, spender)` pair in the `allowances` dictionary.
///
/// The pair is ordered: swapping owner and spender addresses a different entry.
pub fn allowance_key(owner: &KeyParameter, spender: &KeyParameter) -> String {
    let mut preimage = Vec::with_capacity(2 * SERIALIZED_LENGTH);
    preimage.extend_from_slice(&owner.to_bytes());
    preimage.extend_from_slice(&spender.to_bytes());
    let digest = blake2b(DIGEST_LENGTH, &[], &preimage);
    hex::encode(digest.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use casper_types::account::AccountHash;
    use proptest::prelude::*;

    fn account(byte: u8) -> KeyParameter {
        KeyParameter::Account(AccountHash::new([byte; 32]))
    }

    #[test]
    fn test_balance_key_is_base64_of_serialized_key() {
        let key = balance_key(&account(0));
        // 33 zero bytes: tag 0 followed by a zeroed hash.
        assert_eq!(key, "A".repeat(44));
        assert_eq!(STANDARD.decode(&key).unwrap(), account(0).to_bytes().to_vec());

        let key = balance_key(&KeyParameter::Hash([0u8; 32]));
        assert_eq!(STANDARD.decode(&key).unwrap()[0], 1);
        assert_ne!(key, balance_key(&account(0)));
    }

    #[test]
    fn test_allowance_key_shape() {
        let key = allowance_key(&account(1), &account(2));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_allowance_key_hashes_concatenation() {
        let owner = account(1);
        let spender = KeyParameter::Hash([2u8; 32]);
        let mut preimage = owner.to_bytes().to_vec();
        preimage.extend_from_slice(&spender.to_bytes());
        let expected = hex::encode(blake2b(32, &[], &preimage).as_bytes());
        assert_eq!(allowance_key(&owner, &spender), expected);
    }

    #[test]
    fn test_allowance_key_is_order_sensitive() {
        let owner = account(1);
        let spender = account(2);
        assert_ne!(
            allowance_key(&owner, &spender),
            allowance_key(&spender, &owner)
        );
    }

    fn key_parameter() -> impl Strategy<Value = KeyParameter> {
        prop_oneof![
            any::<[u8; 32]>().prop_map(|bytes| KeyParameter::Account(AccountHash::new(bytes))),
            any::<[u8; 32]>().prop_map(KeyParameter::Hash),
        ]
    }

    proptest! {
        #[test]
        fn proptest_balance_key_deterministic(account in key_parameter()) {
            let copy = account;
            prop_assert_eq!(balance_key(&account), balance_key(&copy));
            prop_assert!(balance_key(&account).len() <= 64);
        }

        #[test]
        fn proptest_allowance_key_not_commutative(owner in key_parameter(), spender in key_parameter()) {
            prop_assume!(owner != spender);
            prop_assert_eq!(allowance_key(&owner, &spender), allowance_key(&owner, &spender));
            prop_assert_ne!(allowance_key(&owner, &spender), allowance_key(&spender, &owner));
        }
    }
}
