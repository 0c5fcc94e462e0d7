use std::fmt;

use casper_types::U256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid events mode: {0}")]
pub struct InvalidEventsMode(pub U256);

/// Event emission scheme selected at install time.
///
/// Numbered as the contract behind [`ErrorCodeTable::cep18`](crate::ErrorCodeTable::cep18)
/// stores it. Only `CES` produces events an [`ExecutionResultParser`] can decode.
///
/// [`ExecutionResultParser`]: crate::ExecutionResultParser
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Default, Copy, Clone, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum EventsMode {
    #[default]
    NoEvents = 0,
    CEP47 = 1,
    CES = 2,
}

impl EventsMode {
    pub fn name(&self) -> &'static str {
        match self {
            EventsMode::NoEvents => "NoEvents",
            EventsMode::CEP47 => "CEP47",
            EventsMode::CES => "CES",
        }
    }
}

impl fmt::Display for EventsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<EventsMode> for U256 {
    fn from(mode: EventsMode) -> Self {
        U256::from(mode as u8)
    }
}

impl TryFrom<u8> for EventsMode {
    type Error = InvalidEventsMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventsMode::NoEvents),
            1 => Ok(EventsMode::CEP47),
            2 => Ok(EventsMode::CES),
            _ => Err(InvalidEventsMode(U256::from(value))),
        }
    }
}

impl TryFrom<U256> for EventsMode {
    type Error = InvalidEventsMode;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value > U256::from(u8::MAX) {
            return Err(InvalidEventsMode(value));
        }
        EventsMode::try_from(value.as_u32() as u8)
    }
}

/// Whether the `mint` and `burn` entry points are enabled.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum MintBurn {
    Disabled = 0,
    MintAndBurn = 1,
}

impl From<bool> for MintBurn {
    fn from(enabled: bool) -> Self {
        if enabled {
            MintBurn::MintAndBurn
        } else {
            MintBurn::Disabled
        }
    }
}
