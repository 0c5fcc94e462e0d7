//! [`Cep18Client`] ties call building, state queries, event dispatch and failure classification
//! to one installed token contract.
use std::sync::Arc;

use casper_types::{
    PublicKey, SecretKey, U256,
    contracts::{ContractHash, ContractPackageHash},
};
use futures::Stream;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    args::{
        ApproveArgs, BurnArgs, ChangeSecurityArgs, InstallArgs, MintArgs, PaymentAmount,
        TransferArgs, TransferFromArgs,
    },
    call::{CallBuilder, CallError, DeployFactory},
    config::ClientConfig,
    dispatcher::{Cep18Events, EventDispatcher, EventStreamError, ExecutionResultParser},
    error::{DeployFailure, ErrorCodeTable},
    key::{KeyParameter, format_hash},
    modalities::EventsMode,
    query::{DeployResults, QueryError, StateQuery, StateReader},
    rpc::{RpcError, RpcStateQuery},
    sse::event::{ExecutionOutcome, SseEvent},
};

#[derive(Debug, Error)]
pub enum DeployResultError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("deploy {0} has not been executed yet")]
    Pending(String),
    #[error(transparent)]
    Failed(#[from] DeployFailure),
}

pub struct Cep18Client<D, Q> {
    chain_name: String,
    calls: CallBuilder<D>,
    state: StateReader<Q>,
    dispatcher: Arc<EventDispatcher>,
    error_table: ErrorCodeTable,
    contract_package_hash: Option<ContractPackageHash>,
}

impl<D: DeployFactory> Cep18Client<D, RpcStateQuery> {
    /// Client reading state from the configured RPC endpoints.
    pub fn from_config(config: &ClientConfig, factory: D) -> Result<Self, RpcError> {
        let mut client = Self::new(config.network_name(), factory, config.state_query()?)
            .with_error_table(config.error_table().clone());
        if let Some(contract_hash) = config.contract_hash() {
            client.set_contract_hash(contract_hash, config.contract_package_hash());
        }
        Ok(client)
    }
}

impl<D: DeployFactory, Q: StateQuery> Cep18Client<D, Q> {
    pub fn new(chain_name: impl Into<String>, factory: D, query: Q) -> Self {
        Self {
            chain_name: chain_name.into(),
            calls: CallBuilder::new(factory),
            state: StateReader::new(query),
            dispatcher: Arc::new(EventDispatcher::new()),
            error_table: ErrorCodeTable::default(),
            contract_package_hash: None,
        }
    }

    /// Replaces the dispatcher with one that decodes events through `parser`.
    ///
    /// Listeners registered on the previous dispatcher are dropped.
    pub fn with_parser(mut self, parser: impl ExecutionResultParser + 'static) -> Self {
        self.dispatcher = Arc::new(EventDispatcher::with_parser(parser));
        self
    }

    pub fn with_error_table(mut self, error_table: ErrorCodeTable) -> Self {
        self.error_table = error_table;
        self
    }

    /// Points the client at an installed contract.
    pub fn set_contract_hash(
        &mut self,
        contract_hash: ContractHash,
        contract_package_hash: Option<ContractPackageHash>,
    ) {
        info!(
            contract_hash = %format_hash(&contract_hash.value()),
            "using CEP-18 contract"
        );
        self.calls.set_contract_hash(contract_hash);
        self.state.set_contract_hash(contract_hash);
        self.contract_package_hash = contract_package_hash;
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    pub fn contract_hash(&self) -> Option<ContractHash> {
        self.calls.contract_hash()
    }

    pub fn contract_package_hash(&self) -> Option<ContractPackageHash> {
        self.contract_package_hash
    }

    pub fn calls(&self) -> &CallBuilder<D> {
        &self.calls
    }

    pub fn state(&self) -> &StateReader<Q> {
        &self.state
    }

    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn error_table(&self) -> &ErrorCodeTable {
        &self.error_table
    }

    pub fn install(
        &self,
        module_bytes: impl Into<Vec<u8>>,
        args: &InstallArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .install(module_bytes, args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn transfer(
        &self,
        args: &TransferArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .transfer(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn transfer_from(
        &self,
        args: &TransferFromArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .transfer_from(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn approve(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .approve(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn increase_allowance(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .increase_allowance(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn decrease_allowance(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .decrease_allowance(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn mint(
        &self,
        args: &MintArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .mint(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn burn(
        &self,
        args: &BurnArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .burn(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub fn change_security(
        &self,
        args: &ChangeSecurityArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.calls
            .change_security(args, payment, sender, &self.chain_name, signing_keys)
    }

    pub async fn balance_of(&self, account: &KeyParameter) -> Result<U256, QueryError> {
        self.state.balance_of(account).await
    }

    pub async fn allowances(
        &self,
        owner: &KeyParameter,
        spender: &KeyParameter,
    ) -> Result<U256, QueryError> {
        self.state.allowances(owner, spender).await
    }

    pub async fn name(&self) -> Result<String, QueryError> {
        self.state.name().await
    }

    pub async fn symbol(&self) -> Result<String, QueryError> {
        self.state.symbol().await
    }

    pub async fn decimals(&self) -> Result<u8, QueryError> {
        self.state.decimals().await
    }

    pub async fn total_supply(&self) -> Result<U256, QueryError> {
        self.state.total_supply().await
    }

    pub async fn events_mode(&self) -> Result<EventsMode, QueryError> {
        self.state.events_mode().await
    }

    /// Dispatches contract events from `stream` until it ends or fails. A client built without
    /// [`with_parser`](Self::with_parser) refuses the stream.
    pub async fn setup_event_stream<S, E>(&self, stream: S) -> Result<(), EventStreamError<E>>
    where
        S: Stream<Item = Result<SseEvent, E>>,
    {
        self.dispatcher.setup_event_stream(stream).await
    }

    pub fn classify_failure(&self, error_message: &str) -> DeployFailure {
        self.error_table.classify(error_message)
    }

    pub fn check_outcome(&self, outcome: &ExecutionOutcome) -> Result<(), DeployFailure> {
        outcome.check(&self.error_table)
    }
}

impl<D: DeployFactory, Q: StateQuery + DeployResults> Cep18Client<D, Q> {
    /// Fetches the execution result of `deploy_hash` and classifies a failure through the
    /// client's error table. Returns the body of a successful result.
    pub async fn parse_deploy_result(&self, deploy_hash: &str) -> Result<Value, DeployResultError> {
        let outcome = self
            .state
            .backend()
            .execution_outcome(deploy_hash)
            .await?
            .ok_or_else(|| DeployResultError::Pending(deploy_hash.to_string()))?;
        match outcome {
            ExecutionOutcome::Success(body) => Ok(body),
            ExecutionOutcome::Failure(failure) => {
                debug!(deploy_hash, error_message = %failure.error_message, "deploy failed");
                Err(self.classify_failure(&failure.error_message).into())
            }
        }
    }
}

impl<D, Q> Cep18Events for Cep18Client<D, Q> {
    fn event_dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }
}
