//! Account and contract identifiers passed to the token contract, and their canonical bytes.
use std::{fmt, str::FromStr};

use casper_types::{
    Key, PublicKey,
    account::AccountHash,
    contracts::{ContractHash, ContractPackageHash},
};
use thiserror::Error;

use crate::constants::{ACCOUNT_HASH_PREFIX, HASH_PREFIX};

/// Length of an account or contract hash.
pub const HASH_LENGTH: usize = 32;
/// Length of a serialized [`KeyParameter`]: tag byte followed by the hash.
pub const SERIALIZED_LENGTH: usize = 1 + HASH_LENGTH;

// Same tags `casper_types::Key` writes for these variants.
const ACCOUNT_TAG: u8 = 0;
const HASH_TAG: u8 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("key variant is not an account or contract hash: {0}")]
    UnsupportedVariant(String),
    #[error("unrecognized key prefix in `{0}`")]
    UnknownPrefix(String),
    #[error("invalid hex in `{input}`: {source}")]
    Hex {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
    #[error("expected {HASH_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

/// An account hash or contract hash used as a token holder, spender or recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyParameter {
    Account(AccountHash),
    Hash([u8; HASH_LENGTH]),
}

impl KeyParameter {
    /// Serializes the key exactly as the global state does for `Key::Account` and `Key::Hash`.
    pub fn to_bytes(&self) -> [u8; SERIALIZED_LENGTH] {
        let mut bytes = [0u8; SERIALIZED_LENGTH];
        bytes[0] = self.tag();
        bytes[1..].copy_from_slice(&self.identifier());
        bytes
    }

    pub fn tag(&self) -> u8 {
        match self {
            KeyParameter::Account(_) => ACCOUNT_TAG,
            KeyParameter::Hash(_) => HASH_TAG,
        }
    }

    /// Raw 32 identifier bytes, without the tag.
    pub fn identifier(&self) -> [u8; HASH_LENGTH] {
        match self {
            KeyParameter::Account(account_hash) => account_hash.value(),
            KeyParameter::Hash(hash) => *hash,
        }
    }

    pub fn to_key(&self) -> Key {
        Key::from(*self)
    }
}

impl fmt::Display for KeyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyParameter::Account(account_hash) => {
                write!(f, "{ACCOUNT_HASH_PREFIX}{}", hex::encode(account_hash.value()))
            }
            KeyParameter::Hash(hash) => f.write_str(&format_hash(hash)),
        }
    }
}

impl FromStr for KeyParameter {
    type Err = KeyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Some(hex_part) = input.strip_prefix(ACCOUNT_HASH_PREFIX) {
            let bytes = decode_hash(input, hex_part)?;
            Ok(KeyParameter::Account(AccountHash::new(bytes)))
        } else if input.starts_with(HASH_PREFIX) {
            parse_hash(input).map(KeyParameter::Hash)
        } else {
            Err(KeyError::UnknownPrefix(input.to_string()))
        }
    }
}

impl From<AccountHash> for KeyParameter {
    fn from(account_hash: AccountHash) -> Self {
        KeyParameter::Account(account_hash)
    }
}

impl From<&PublicKey> for KeyParameter {
    fn from(public_key: &PublicKey) -> Self {
        KeyParameter::Account(public_key.to_account_hash())
    }
}

impl From<ContractHash> for KeyParameter {
    fn from(contract_hash: ContractHash) -> Self {
        KeyParameter::Hash(contract_hash.value())
    }
}

impl From<ContractPackageHash> for KeyParameter {
    fn from(package_hash: ContractPackageHash) -> Self {
        KeyParameter::Hash(package_hash.value())
    }
}

impl TryFrom<Key> for KeyParameter {
    type Error = KeyError;

    fn try_from(key: Key) -> Result<Self, Self::Error> {
        match key {
            Key::Account(account_hash) => Ok(KeyParameter::Account(account_hash)),
            Key::Hash(hash) => Ok(KeyParameter::Hash(hash)),
            other => Err(KeyError::UnsupportedVariant(other.to_formatted_string())),
        }
    }
}

impl From<KeyParameter> for Key {
    fn from(parameter: KeyParameter) -> Self {
        match parameter {
            KeyParameter::Account(account_hash) => Key::Account(account_hash),
            KeyParameter::Hash(hash) => Key::Hash(hash),
        }
    }
}

/// Formats a contract or package hash as `hash-<hex>`.
pub fn format_hash(hash: &[u8; HASH_LENGTH]) -> String {
    format!("{HASH_PREFIX}{}", hex::encode(hash))
}

/// Parses a `hash-<hex>` string.
pub fn parse_hash(input: &str) -> Result<[u8; HASH_LENGTH], KeyError> {
    let hex_part = input
        .strip_prefix(HASH_PREFIX)
        .ok_or_else(|| KeyError::UnknownPrefix(input.to_string()))?;
    decode_hash(input, hex_part)
}

fn decode_hash(input: &str, hex_part: &str) -> Result<[u8; HASH_LENGTH], KeyError> {
    let bytes = hex::decode(hex_part).map_err(|source| KeyError::Hex {
        input: input.to_string(),
        source,
    })?;
    let length = bytes.len();
    bytes.try_into().map_err(|_| KeyError::InvalidLength(length))
}
