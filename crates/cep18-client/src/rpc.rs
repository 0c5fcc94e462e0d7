//! [`StateQuery`] over a node's JSON-RPC endpoint.
use std::sync::atomic::{AtomicI64, Ordering};

use casper_client::{
    self, JsonRpcId, Verbosity,
    rpcs::{DictionaryItemIdentifier, GlobalStateIdentifier},
};
pub use casper_client::Error as CasperClientRpcError;
use casper_types::{
    CLValue, DeployHash, Digest, Key, StoredValue, contracts::ContractHash,
    execution::ExecutionResult,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    key::format_hash,
    query::{DeployResults, QueryError, StateQuery},
    sse::event::{ExecutionFailure, ExecutionOutcome},
};

static RPC_COUNTER: AtomicI64 = AtomicI64::new(1);

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("no RPC endpoints configured")]
    MissingRpcEndpoints,
    #[error("casper client error: {0}")]
    Client(Box<CasperClientRpcError>),
    #[error("missing state root hash in response")]
    MissingStateRootHash,
    #[error("stored value at `{0}` is not a CLValue")]
    NotACLValue(String),
    #[error("invalid deploy hash `{0}`")]
    InvalidDeployHash(String),
    #[error("failed to convert execution result: {0}")]
    ExecutionResult(#[from] serde_json::Error),
}

impl From<CasperClientRpcError> for RpcError {
    fn from(value: CasperClientRpcError) -> Self {
        Self::Client(Box::new(value))
    }
}

impl From<RpcError> for QueryError {
    fn from(value: RpcError) -> Self {
        QueryError::Backend(Box::new(value))
    }
}

/// Reads contract state through `state_get_dictionary_item` and `query_global_state`.
#[derive(Clone, Debug)]
pub struct RpcStateQuery {
    rpc_endpoints: Vec<String>,
    verbosity: Verbosity,
}

impl RpcStateQuery {
    /// At least one non-empty endpoint must be provided.
    pub fn new<I, S>(rpc_endpoints: I) -> Result<Self, RpcError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rpc_endpoints: Vec<String> = rpc_endpoints
            .into_iter()
            .filter_map(|endpoint| normalize_node_address(endpoint.as_ref()))
            .collect();

        if rpc_endpoints.is_empty() {
            return Err(RpcError::MissingRpcEndpoints);
        }

        Ok(Self {
            rpc_endpoints,
            verbosity: Verbosity::Low,
        })
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Primary endpoint, the first one configured.
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_endpoints
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub async fn get_state_root_hash(&self) -> Result<Digest, RpcError> {
        let response = casper_client::get_state_root_hash(
            next_rpc_id(),
            self.rpc_endpoint(),
            self.verbosity,
            None,
        )
        .await?;
        response
            .result
            .state_root_hash
            .ok_or(RpcError::MissingStateRootHash)
    }
}

impl StateQuery for RpcStateQuery {
    async fn query_dictionary(
        &self,
        contract_hash: ContractHash,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<CLValue, QueryError> {
        let state_root_hash = self.get_state_root_hash().await?;
        let identifier = DictionaryItemIdentifier::ContractNamedKey {
            key: format_hash(&contract_hash.value()),
            dictionary_name: dictionary_name.to_string(),
            dictionary_item_key: item_key.to_string(),
        };
        trace!(dictionary_name, item_key, "querying dictionary item");

        let location = format!("{dictionary_name}/{item_key}");
        match casper_client::get_dictionary_item(
            next_rpc_id(),
            self.rpc_endpoint(),
            self.verbosity,
            state_root_hash,
            identifier,
        )
        .await
        {
            Ok(response) => into_cl_value(response.result.stored_value, location),
            Err(error) => Err(classify(error, location)),
        }
    }

    async fn query_path(
        &self,
        contract_hash: ContractHash,
        path: &[&str],
    ) -> Result<CLValue, QueryError> {
        let state_root_hash = self.get_state_root_hash().await?;
        let path: Vec<String> = path.iter().map(|segment| segment.to_string()).collect();
        let location = path.join("/");
        trace!(path = %location, "querying global state");

        match casper_client::query_global_state(
            next_rpc_id(),
            self.rpc_endpoint(),
            self.verbosity,
            GlobalStateIdentifier::StateRootHash(state_root_hash),
            Key::Hash(contract_hash.value()),
            path,
        )
        .await
        {
            Ok(response) => into_cl_value(response.result.stored_value, location),
            Err(error) => Err(classify(error, location)),
        }
    }
}

impl DeployResults for RpcStateQuery {
    async fn execution_outcome(
        &self,
        deploy_hash: &str,
    ) -> Result<Option<ExecutionOutcome>, QueryError> {
        let digest = Digest::from_hex(deploy_hash.trim())
            .map_err(|_| RpcError::InvalidDeployHash(deploy_hash.to_string()))?;
        trace!(deploy_hash, "fetching deploy");

        let response = casper_client::get_deploy(
            next_rpc_id(),
            self.rpc_endpoint(),
            self.verbosity,
            DeployHash::new(digest),
            false,
        )
        .await
        .map_err(RpcError::from)?;

        let Some(result) = response
            .result
            .execution_info
            .and_then(|info| info.execution_result)
        else {
            debug!(deploy_hash, "deploy not executed yet");
            return Ok(None);
        };
        Ok(Some(outcome_from_result(&result).map_err(RpcError::from)?))
    }
}

/// Maps a node execution result onto the outcome shape `DeployProcessed` carries. A successful
/// legacy result is unwrapped to the body of its `Success` variant.
fn outcome_from_result(result: &ExecutionResult) -> Result<ExecutionOutcome, serde_json::Error> {
    if let Some(error_message) = result.error_message() {
        return Ok(ExecutionOutcome::Failure(ExecutionFailure {
            error_message,
            cost: Some(result.cost().to_string()),
        }));
    }
    let body = match result {
        ExecutionResult::V1(v1) => serde_json::to_value(v1)?
            .get_mut("Success")
            .map(Value::take)
            .unwrap_or_default(),
        ExecutionResult::V2(v2) => serde_json::to_value(v2)?,
    };
    Ok(ExecutionOutcome::Success(body))
}

fn into_cl_value(stored_value: StoredValue, location: String) -> Result<CLValue, QueryError> {
    match stored_value {
        StoredValue::CLValue(value) => Ok(value),
        _ => Err(RpcError::NotACLValue(location).into()),
    }
}

fn classify(error: CasperClientRpcError, location: String) -> QueryError {
    match error {
        CasperClientRpcError::ResponseIsRpcError { error, .. }
            if is_value_not_found_error(error.code, &error.message) =>
        {
            debug!("{location} not found: {}", error.message);
            QueryError::ValueNotFound(location)
        }
        error => RpcError::from(error).into(),
    }
}

fn next_rpc_id() -> JsonRpcId {
    JsonRpcId::from(RPC_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Normalizes a node address by removing trailing slashes and `/rpc` suffixes.
pub(crate) fn normalize_node_address(endpoint: &str) -> Option<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_trailing_slash = trimmed.trim_end_matches('/');
    let cleaned = if let Some(stripped) = without_trailing_slash.strip_suffix("/rpc") {
        stripped.trim_end_matches('/').to_owned()
    } else {
        without_trailing_slash.to_owned()
    };

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Nodes report absent dictionary items and named keys only through the message text.
fn is_value_not_found_error(code: i64, message: &str) -> bool {
    const QUERY_FAILED_CODE: i64 = -32003;

    let message = message.to_ascii_lowercase();
    message.contains("valuenotfound")
        || message.contains("value not found")
        || (code == QUERY_FAILED_CODE && message.contains("not found"))
}
