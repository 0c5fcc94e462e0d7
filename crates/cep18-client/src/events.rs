//! Events emitted by the token contract.
use std::{collections::BTreeMap, fmt, str::FromStr};

use casper_types::{CLTyped, CLValue, CLValueError, Key, U256, bytesrepr::FromBytes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::{HASH_LENGTH, format_hash};

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
    #[error("event `{event}` is missing field `{field}`")]
    MissingField {
        event: EventKind,
        field: &'static str,
    },
    #[error("event `{event}` has an invalid `{field}` field: {error:?}")]
    InvalidField {
        event: EventKind,
        field: &'static str,
        error: CLValueError,
    },
}

/// Event names as registered in the contract's event schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Mint,
    Burn,
    SetAllowance,
    IncreaseAllowance,
    DecreaseAllowance,
    Transfer,
    TransferFrom,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Mint,
        EventKind::Burn,
        EventKind::SetAllowance,
        EventKind::IncreaseAllowance,
        EventKind::DecreaseAllowance,
        EventKind::Transfer,
        EventKind::TransferFrom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Mint => "Mint",
            EventKind::Burn => "Burn",
            EventKind::SetAllowance => "SetAllowance",
            EventKind::IncreaseAllowance => "IncreaseAllowance",
            EventKind::DecreaseAllowance => "DecreaseAllowance",
            EventKind::Transfer => "Transfer",
            EventKind::TransferFrom => "TransferFrom",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = EventDecodeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| EventDecodeError::UnknownEvent(name.to_string()))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Mint {
    pub recipient: Key,
    pub amount: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Burn {
    pub owner: Key,
    pub amount: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SetAllowance {
    pub owner: Key,
    pub spender: Key,
    pub allowance: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IncreaseAllowance {
    pub owner: Key,
    pub spender: Key,
    pub allowance: U256,
    pub inc_by: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DecreaseAllowance {
    pub owner: Key,
    pub spender: Key,
    pub allowance: U256,
    pub decr_by: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub sender: Key,
    pub recipient: Key,
    pub amount: U256,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransferFrom {
    pub spender: Key,
    pub owner: Key,
    pub recipient: Key,
    pub amount: U256,
}

/// Payload of a decoded event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "name", content = "data")]
pub enum Cep18Event {
    Mint(Mint),
    Burn(Burn),
    SetAllowance(SetAllowance),
    IncreaseAllowance(IncreaseAllowance),
    DecreaseAllowance(DecreaseAllowance),
    Transfer(Transfer),
    TransferFrom(TransferFrom),
}

impl Cep18Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Cep18Event::Mint(_) => EventKind::Mint,
            Cep18Event::Burn(_) => EventKind::Burn,
            Cep18Event::SetAllowance(_) => EventKind::SetAllowance,
            Cep18Event::IncreaseAllowance(_) => EventKind::IncreaseAllowance,
            Cep18Event::DecreaseAllowance(_) => EventKind::DecreaseAllowance,
            Cep18Event::Transfer(_) => EventKind::Transfer,
            Cep18Event::TransferFrom(_) => EventKind::TransferFrom,
        }
    }

    /// Builds the typed payload from the named fields of a parsed event.
    pub fn from_fields(
        name: &str,
        fields: &BTreeMap<String, CLValue>,
    ) -> Result<Self, EventDecodeError> {
        let kind: EventKind = name.parse()?;
        let fields = Fields { kind, fields };
        let event = match kind {
            EventKind::Mint => Cep18Event::Mint(Mint {
                recipient: fields.get("recipient")?,
                amount: fields.get("amount")?,
            }),
            EventKind::Burn => Cep18Event::Burn(Burn {
                owner: fields.get("owner")?,
                amount: fields.get("amount")?,
            }),
            EventKind::SetAllowance => Cep18Event::SetAllowance(SetAllowance {
                owner: fields.get("owner")?,
                spender: fields.get("spender")?,
                allowance: fields.get("allowance")?,
            }),
            EventKind::IncreaseAllowance => Cep18Event::IncreaseAllowance(IncreaseAllowance {
                owner: fields.get("owner")?,
                spender: fields.get("spender")?,
                allowance: fields.get("allowance")?,
                inc_by: fields.get("inc_by")?,
            }),
            EventKind::DecreaseAllowance => Cep18Event::DecreaseAllowance(DecreaseAllowance {
                owner: fields.get("owner")?,
                spender: fields.get("spender")?,
                allowance: fields.get("allowance")?,
                decr_by: fields.get("decr_by")?,
            }),
            EventKind::Transfer => Cep18Event::Transfer(Transfer {
                sender: fields.get("sender")?,
                recipient: fields.get("recipient")?,
                amount: fields.get("amount")?,
            }),
            EventKind::TransferFrom => Cep18Event::TransferFrom(TransferFrom {
                spender: fields.get("spender")?,
                owner: fields.get("owner")?,
                recipient: fields.get("recipient")?,
                amount: fields.get("amount")?,
            }),
        };
        Ok(event)
    }
}

struct Fields<'a> {
    kind: EventKind,
    fields: &'a BTreeMap<String, CLValue>,
}

impl Fields<'_> {
    fn get<T: CLTyped + FromBytes>(&self, field: &'static str) -> Result<T, EventDecodeError> {
        let value = self
            .fields
            .get(field)
            .ok_or(EventDecodeError::MissingField {
                event: self.kind,
                field,
            })?;
        value
            .clone()
            .into_t()
            .map_err(|error| EventDecodeError::InvalidField {
                event: self.kind,
                field,
                error,
            })
    }
}

/// An event as produced by the execution result parser, before typing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub name: String,
    pub contract_hash: [u8; HASH_LENGTH],
    pub contract_package_hash: [u8; HASH_LENGTH],
    pub fields: BTreeMap<String, CLValue>,
}

/// A decoded event with the contract that emitted it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ContractEvent {
    /// `hash-<hex>`
    pub contract_hash: String,
    /// `hash-<hex>`
    pub contract_package_hash: String,
    #[serde(flatten)]
    pub event: Cep18Event,
}

impl ContractEvent {
    pub fn from_raw(raw: &RawEvent) -> Result<Self, EventDecodeError> {
        Ok(Self {
            contract_hash: format_hash(&raw.contract_hash),
            contract_package_hash: format_hash(&raw.contract_package_hash),
            event: Cep18Event::from_fields(&raw.name, &raw.fields)?,
        })
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Deploy an event originated from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeployInfo {
    pub deploy_hash: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WithDeployInfo<E> {
    #[serde(flatten)]
    pub event: E,
    pub deploy_info: DeployInfo,
}

/// Event payload types that can be picked out of a [`Cep18Event`].
pub trait TypedEvent: Sized {
    const KIND: EventKind;

    fn from_event(event: &Cep18Event) -> Option<&Self>;
}

macro_rules! impl_typed_event {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl TypedEvent for $variant {
                const KIND: EventKind = EventKind::$variant;

                fn from_event(event: &Cep18Event) -> Option<&Self> {
                    match event {
                        Cep18Event::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_typed_event!(
    Mint,
    Burn,
    SetAllowance,
    IncreaseAllowance,
    DecreaseAllowance,
    Transfer,
    TransferFrom,
);
