//! Argument bundles accepted by the call builder.
use std::{fmt, str::FromStr};

use casper_types::{U256, U512};
use thiserror::Error;

use crate::{
    constants::{ADMIN_LIST, BURNER_LIST, MINT_AND_BURN_LIST, MINTER_LIST, NONE_LIST},
    key::KeyParameter,
    modalities::EventsMode,
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid payment amount `{0}`: expected a non-negative decimal integer")]
pub struct InvalidPaymentAmount(pub String);

/// Gas payment attached to a deploy, in motes.
///
/// `u64` is the only primitive integer it converts from, so an unsuffixed literal passed as
/// `impl Into<PaymentAmount>` is inferred as `u64`. Decimal strings go through
/// [`str::parse`] or `TryFrom<&str>`, which accept `_` separators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PaymentAmount(U512);

impl PaymentAmount {
    pub fn value(&self) -> U512 {
        self.0
    }

    /// Canonical decimal form, as submitted with the deploy.
    pub fn to_decimal_string(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PaymentAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<U512> for PaymentAmount {
    fn from(value: U512) -> Self {
        PaymentAmount(value)
    }
}

impl From<u64> for PaymentAmount {
    fn from(value: u64) -> Self {
        PaymentAmount(U512::from(value))
    }
}

impl From<U256> for PaymentAmount {
    fn from(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_little_endian(&mut bytes);
        PaymentAmount(U512::from_little_endian(&bytes))
    }
}

impl FromStr for PaymentAmount {
    type Err = InvalidPaymentAmount;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().replace('_', "");
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPaymentAmount(input.to_string()));
        }
        U512::from_dec_str(&trimmed)
            .map(PaymentAmount)
            .map_err(|_| InvalidPaymentAmount(input.to_string()))
    }
}

impl TryFrom<&str> for PaymentAmount {
    type Error = InvalidPaymentAmount;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        input.parse()
    }
}

/// Token metadata supplied when installing the contract.
///
/// `events_mode` and `enable_mint_burn` are only sent when set; the contract applies its own
/// defaults otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallArgs {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub events_mode: Option<EventsMode>,
    pub enable_mint_burn: Option<bool>,
}

impl InstallArgs {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        decimals: u8,
        total_supply: impl Into<U256>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: total_supply.into(),
            events_mode: None,
            enable_mint_burn: None,
        }
    }

    pub fn with_events_mode(mut self, events_mode: EventsMode) -> Self {
        self.events_mode = Some(events_mode);
        self
    }

    pub fn with_mint_and_burn(mut self, enabled: bool) -> Self {
        self.enable_mint_burn = Some(enabled);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferArgs {
    pub recipient: KeyParameter,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferFromArgs {
    pub owner: KeyParameter,
    pub recipient: KeyParameter,
    pub amount: U256,
}

/// Used by `approve`, `increase_allowance` and `decrease_allowance`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApproveArgs {
    pub spender: KeyParameter,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintArgs {
    pub owner: KeyParameter,
    pub amount: U256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnArgs {
    pub owner: KeyParameter,
    pub amount: U256,
}

/// Security role assignments. Only supplied lists are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSecurityArgs {
    pub admin_list: Option<Vec<KeyParameter>>,
    pub minter_list: Option<Vec<KeyParameter>>,
    pub burner_list: Option<Vec<KeyParameter>>,
    pub mint_and_burn_list: Option<Vec<KeyParameter>>,
    pub none_list: Option<Vec<KeyParameter>>,
}

impl ChangeSecurityArgs {
    /// Supplied lists paired with their runtime argument names, in a fixed order.
    pub fn supplied_lists(&self) -> impl Iterator<Item = (&'static str, &[KeyParameter])> {
        [
            (ADMIN_LIST, &self.admin_list),
            (MINTER_LIST, &self.minter_list),
            (BURNER_LIST, &self.burner_list),
            (MINT_AND_BURN_LIST, &self.mint_and_burn_list),
            (NONE_LIST, &self.none_list),
        ]
        .into_iter()
        .filter_map(|(name, list)| list.as_deref().map(|list| (name, list)))
    }

    /// True when no list carries at least one key.
    pub fn is_empty(&self) -> bool {
        self.supplied_lists().all(|(_, list)| list.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casper_types::account::AccountHash;

    #[test]
    fn test_payment_amount_normalization() {
        let from_int = PaymentAmount::from(5_000_000_000u64);
        let from_str: PaymentAmount = "5000000000".parse().unwrap();
        let from_underscored: PaymentAmount = "5_000_000_000".parse().unwrap();
        let from_u512 = PaymentAmount::from(U512::from(5_000_000_000u64));
        assert_eq!(from_int, from_str);
        assert_eq!(from_int, from_underscored);
        assert_eq!(from_int, from_u512);
        assert_eq!(from_int.to_decimal_string(), "5000000000");
    }

    #[test]
    fn test_payment_amount_conversions() {
        fn payment(amount: impl Into<PaymentAmount>) -> U512 {
            amount.into().value()
        }
        assert_eq!(payment(5_000_000_000), U512::from(5_000_000_000u64));
        assert_eq!(payment(U256::from(7u8)), U512::from(7u64));
        assert_eq!(payment(U256::MAX).to_string(), U256::MAX.to_string());
        assert_eq!(
            PaymentAmount::try_from("2_500").unwrap().value(),
            U512::from(2500u64)
        );
    }

    #[test]
    fn test_payment_amount_rejects_garbage() {
        assert!("".parse::<PaymentAmount>().is_err());
        assert!("-5".parse::<PaymentAmount>().is_err());
        assert!("1.5".parse::<PaymentAmount>().is_err());
        assert!("0x10".parse::<PaymentAmount>().is_err());
    }

    #[test]
    fn test_change_security_supplied_lists() {
        let account = KeyParameter::Account(AccountHash::new([1u8; 32]));
        let args = ChangeSecurityArgs {
            minter_list: Some(vec![account]),
            none_list: Some(vec![]),
            ..Default::default()
        };
        let names: Vec<_> = args.supplied_lists().map(|(name, _)| name).collect();
        assert_eq!(names, vec![MINTER_LIST, NONE_LIST]);
        assert!(!args.is_empty());

        assert!(ChangeSecurityArgs::default().is_empty());
        let only_empty = ChangeSecurityArgs {
            admin_list: Some(vec![]),
            ..Default::default()
        };
        assert!(only_empty.is_empty());
    }

    #[test]
    fn test_install_args_optional_fields() {
        let args = InstallArgs::new("TEST CEP18", "TFT", 9, 50_000_000_000u64);
        assert_eq!(args.events_mode, None);
        assert_eq!(args.enable_mint_burn, None);
        let args = args
            .with_events_mode(EventsMode::CES)
            .with_mint_and_burn(true);
        assert_eq!(args.events_mode, Some(EventsMode::CES));
        assert_eq!(args.enable_mint_burn, Some(true));
    }
}
