//! Reads token state: balances, allowances and the metadata stored under the contract.
use std::future::Future;

use casper_types::{
    CLType, CLTyped, CLValue, CLValueError, U256, bytesrepr::FromBytes, contracts::ContractHash,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    constants::{
        DICT_ALLOWANCES, DICT_BALANCES, KEY_DECIMALS, KEY_EVENTS_MODE, KEY_NAME, KEY_SYMBOL,
        KEY_TOTAL_SUPPLY,
    },
    dictionary_key::{allowance_key, balance_key},
    key::KeyParameter,
    modalities::{EventsMode, InvalidEventsMode},
    sse::event::ExecutionOutcome,
};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("value not found: {0}")]
    ValueNotFound(String),
    #[error("contract hash is not set")]
    MissingContractHash,
    #[error("unexpected value at `{path}`: {error:?}")]
    UnexpectedValue { path: String, error: CLValueError },
    #[error(transparent)]
    EventsMode(#[from] InvalidEventsMode),
    #[error("state query failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read access to a contract's global state.
pub trait StateQuery {
    /// Looks up `item_key` in the dictionary named `dictionary_name` of the contract.
    ///
    /// A missing item must be reported as [`QueryError::ValueNotFound`].
    fn query_dictionary(
        &self,
        contract_hash: ContractHash,
        dictionary_name: &str,
        item_key: &str,
    ) -> impl Future<Output = Result<CLValue, QueryError>> + Send;

    /// Resolves a named-key path relative to the contract.
    fn query_path(
        &self,
        contract_hash: ContractHash,
        path: &[&str],
    ) -> impl Future<Output = Result<CLValue, QueryError>> + Send;
}

/// Lookup of a deploy's execution result.
pub trait DeployResults {
    /// `Ok(None)` while the deploy is known but has not been executed.
    fn execution_outcome(
        &self,
        deploy_hash: &str,
    ) -> impl Future<Output = Result<Option<ExecutionOutcome>, QueryError>> + Send;
}

/// Token state queries on top of a [`StateQuery`].
#[derive(Debug, Clone)]
pub struct StateReader<Q> {
    query: Q,
    contract_hash: Option<ContractHash>,
}

impl<Q: StateQuery> StateReader<Q> {
    pub fn new(query: Q) -> Self {
        Self {
            query,
            contract_hash: None,
        }
    }

    pub fn with_contract_hash(mut self, contract_hash: ContractHash) -> Self {
        self.contract_hash = Some(contract_hash);
        self
    }

    pub fn set_contract_hash(&mut self, contract_hash: ContractHash) {
        self.contract_hash = Some(contract_hash);
    }

    pub fn backend(&self) -> &Q {
        &self.query
    }

    /// Balance of `account`. Accounts that never held tokens read as zero.
    pub async fn balance_of(&self, account: &KeyParameter) -> Result<U256, QueryError> {
        let contract_hash = self.require_contract_hash()?;
        let item_key = balance_key(account);
        match self
            .query
            .query_dictionary(contract_hash, DICT_BALANCES, &item_key)
            .await
        {
            Ok(value) => convert(value, DICT_BALANCES),
            Err(QueryError::ValueNotFound(_)) => {
                warn!("Not found balance for {account}");
                Ok(U256::zero())
            }
            Err(error) => Err(error),
        }
    }

    /// Amount `spender` may transfer on behalf of `owner`. Missing entries read as zero.
    pub async fn allowances(
        &self,
        owner: &KeyParameter,
        spender: &KeyParameter,
    ) -> Result<U256, QueryError> {
        let contract_hash = self.require_contract_hash()?;
        let item_key = allowance_key(owner, spender);
        match self
            .query
            .query_dictionary(contract_hash, DICT_ALLOWANCES, &item_key)
            .await
        {
            Ok(value) => convert(value, DICT_ALLOWANCES),
            Err(QueryError::ValueNotFound(_)) => {
                warn!("Not found allowances for {owner} (spender {spender})");
                Ok(U256::zero())
            }
            Err(error) => Err(error),
        }
    }

    pub async fn name(&self) -> Result<String, QueryError> {
        self.named_value(KEY_NAME).await
    }

    pub async fn symbol(&self) -> Result<String, QueryError> {
        self.named_value(KEY_SYMBOL).await
    }

    pub async fn decimals(&self) -> Result<u8, QueryError> {
        self.named_value(KEY_DECIMALS).await
    }

    pub async fn total_supply(&self) -> Result<U256, QueryError> {
        self.named_value(KEY_TOTAL_SUPPLY).await
    }

    /// Events mode the contract was installed with. Stored as `u8`, older installs used `U256`.
    pub async fn events_mode(&self) -> Result<EventsMode, QueryError> {
        let contract_hash = self.require_contract_hash()?;
        let value = self
            .query
            .query_path(contract_hash, &[KEY_EVENTS_MODE])
            .await?;
        let mode = if *value.cl_type() == CLType::U8 {
            EventsMode::try_from(convert::<u8>(value, KEY_EVENTS_MODE)?)?
        } else {
            EventsMode::try_from(convert::<U256>(value, KEY_EVENTS_MODE)?)?
        };
        debug!(%mode, "read events mode");
        Ok(mode)
    }

    async fn named_value<T: CLTyped + FromBytes>(&self, name: &str) -> Result<T, QueryError> {
        let contract_hash = self.require_contract_hash()?;
        let value = self.query.query_path(contract_hash, &[name]).await?;
        convert(value, name)
    }

    fn require_contract_hash(&self) -> Result<ContractHash, QueryError> {
        self.contract_hash.ok_or(QueryError::MissingContractHash)
    }
}

fn convert<T: CLTyped + FromBytes>(value: CLValue, path: &str) -> Result<T, QueryError> {
    value.into_t().map_err(|error| QueryError::UnexpectedValue {
        path: path.to_string(),
        error,
    })
}
