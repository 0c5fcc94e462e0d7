//! Client for CEP-18 fungible token contracts on Casper.
//!
//! Builds runtime arguments for the contract's entry points, derives the dictionary keys its
//! balances and allowances are stored under, reads token state through a [`StateQuery`]
//! backend, classifies failed deploys and dispatches contract events received over the node's
//! SSE stream.
pub mod args;
pub mod call;
pub mod client;
pub mod config;
pub mod constants;
pub mod dictionary_key;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod key;
pub mod modalities;
pub mod query;
pub mod rpc;
pub mod sse;

pub use args::{
    ApproveArgs, BurnArgs, ChangeSecurityArgs, InstallArgs, MintArgs, PaymentAmount, TransferArgs,
    TransferFromArgs,
};
pub use call::{CallBuilder, CallError, DeployFactory, DeployRequest, Session};
pub use client::{Cep18Client, DeployResultError};
pub use config::{ClientConfig, ConfigError};
pub use dictionary_key::{allowance_key, balance_key};
pub use dispatcher::{
    Cep18Events, DispatchError, EventDispatcher, EventStreamError, ExecutionResultParser, Listener,
    ListenerId,
};
pub use error::{DeployFailure, ErrorCodeTable, ErrorCondition};
pub use events::{Cep18Event, ContractEvent, DeployInfo, EventKind, RawEvent, WithDeployInfo};
pub use key::{KeyError, KeyParameter};
pub use modalities::{EventsMode, MintBurn};
pub use query::{DeployResults, QueryError, StateQuery, StateReader};
