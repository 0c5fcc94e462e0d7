use casper_types::{EraId, ProtocolVersion};
use serde::{Deserialize, Serialize};
use serde_json::{Value, value::RawValue};

use crate::error::{DeployFailure, ErrorCodeTable};

/// An event received from the node's SSE stream.
///
/// Only `DeployProcessed` is decoded into a typed payload; the token client has no use for the
/// structure of the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SseEvent {
    ApiVersion(ProtocolVersion),
    BlockAdded(Value),
    DeployAccepted(Value),
    DeployProcessed(DeployProcessed),
    DeployExpired(Value),
    TransactionAccepted(Value),
    TransactionProcessed(Value),
    TransactionExpired(Value),
    Fault(Value),
    Step {
        era_id: EraId,
        // Can exceed 30MB, kept unparsed.
        execution_effects: Box<RawValue>,
    },
    Shutdown,
    FinalitySignature(Value),
}

impl SseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SseEvent::ApiVersion(_) => "ApiVersion",
            SseEvent::BlockAdded(_) => "BlockAdded",
            SseEvent::DeployAccepted(_) => "DeployAccepted",
            SseEvent::DeployProcessed(_) => "DeployProcessed",
            SseEvent::DeployExpired(_) => "DeployExpired",
            SseEvent::TransactionAccepted(_) => "TransactionAccepted",
            SseEvent::TransactionProcessed(_) => "TransactionProcessed",
            SseEvent::TransactionExpired(_) => "TransactionExpired",
            SseEvent::Fault(_) => "Fault",
            SseEvent::Step { .. } => "Step",
            SseEvent::Shutdown => "Shutdown",
            SseEvent::FinalitySignature(_) => "FinalitySignature",
        }
    }
}

/// Payload of a `DeployProcessed` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployProcessed {
    pub deploy_hash: String,
    #[serde(default)]
    pub account: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub ttl: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub block_hash: Option<String>,
    pub execution_result: ExecutionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Success(Value),
    Failure(ExecutionFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub error_message: String,
    #[serde(default)]
    pub cost: Option<String>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// Classifies a failure through `table`.
    pub fn check(&self, table: &ErrorCodeTable) -> Result<(), DeployFailure> {
        match self {
            ExecutionOutcome::Success(_) => Ok(()),
            ExecutionOutcome::Failure(failure) => Err(table.classify(&failure.error_message)),
        }
    }
}
