//! Client configuration, from a builder or a TOML file.
//!
//! ```toml
//! network_name = "casper-net-1"
//! rpc_endpoints = ["http://localhost:11101"]
//! contract_hash = "hash-6797fc45c106bd1f4c9f00cb416d63fd71fecfb90ba8f9c24e597b678569d095"
//! sse_endpoint = "http://localhost:18101/events/main"
//! error_table = "cep18"
//! ```
use std::path::{Path, PathBuf};

use casper_types::contracts::{ContractHash, ContractPackageHash};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    error::{CEP18_TABLE, ErrorCodeTable, ErrorTableError},
    key::{KeyError, parse_hash},
    rpc::{RpcError, RpcStateQuery, normalize_node_address},
    sse::config::{ListenerConfig, ListenerConfigError},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("network name must not be empty")]
    MissingNetworkName,
    #[error("no RPC endpoints configured")]
    MissingRpcEndpoints,
    #[error("invalid `{field}`: {source}")]
    InvalidHash {
        field: &'static str,
        #[source]
        source: KeyError,
    },
    #[error("either `error_table` or `error_table_path` may be set, not both")]
    ConflictingErrorTable,
    #[error("no SSE endpoint configured")]
    MissingSseEndpoint,
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ErrorTable(#[from] ErrorTableError),
    #[error(transparent)]
    Listener(#[from] ListenerConfigError),
}

/// Where the error code table comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorTableSource {
    Builtin(String),
    File(PathBuf),
}

impl Default for ErrorTableSource {
    fn default() -> Self {
        ErrorTableSource::Builtin(CEP18_TABLE.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    network_name: String,
    rpc_endpoints: Vec<String>,
    contract_hash: Option<ContractHash>,
    contract_package_hash: Option<ContractPackageHash>,
    sse_endpoint: Option<String>,
    error_table: ErrorCodeTable,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        if file.error_table.is_some() && file.error_table_path.is_some() {
            return Err(ConfigError::ConflictingErrorTable);
        }

        let mut builder = ClientConfig::builder()
            .with_network_name(file.network_name)
            .with_rpc_endpoints(file.rpc_endpoints);
        builder.contract_hash = file.contract_hash;
        builder.contract_package_hash = file.contract_package_hash;
        builder.sse_endpoint = file.sse_endpoint;
        if let Some(version) = file.error_table {
            builder = builder.with_error_table(ErrorTableSource::Builtin(version));
        }
        if let Some(path) = file.error_table_path {
            builder = builder.with_error_table(ErrorTableSource::File(path));
        }
        builder.build()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading client config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Chain name deploys are built for.
    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn rpc_endpoints(&self) -> &[String] {
        &self.rpc_endpoints
    }

    pub fn contract_hash(&self) -> Option<ContractHash> {
        self.contract_hash
    }

    pub fn contract_package_hash(&self) -> Option<ContractPackageHash> {
        self.contract_package_hash
    }

    pub fn sse_endpoint(&self) -> Option<&str> {
        self.sse_endpoint.as_deref()
    }

    pub fn error_table(&self) -> &ErrorCodeTable {
        &self.error_table
    }

    pub fn state_query(&self) -> Result<RpcStateQuery, RpcError> {
        RpcStateQuery::new(&self.rpc_endpoints)
    }

    pub fn listener_config(
        &self,
        resume_path: Option<PathBuf>,
    ) -> Result<ListenerConfig, ConfigError> {
        let endpoint = self
            .sse_endpoint
            .as_deref()
            .ok_or(ConfigError::MissingSseEndpoint)?;
        let mut builder = ListenerConfig::builder().with_endpoint(endpoint);
        if let Some(path) = resume_path {
            builder = builder.with_resume_path(path);
        }
        Ok(builder.build()?)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    network_name: String,
    #[serde(default)]
    rpc_endpoints: Vec<String>,
    contract_hash: Option<String>,
    contract_package_hash: Option<String>,
    sse_endpoint: Option<String>,
    error_table: Option<String>,
    error_table_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    network_name: Option<String>,
    rpc_endpoints: Vec<String>,
    contract_hash: Option<String>,
    contract_package_hash: Option<String>,
    sse_endpoint: Option<String>,
    error_table: ErrorTableSource,
}

impl ClientConfigBuilder {
    pub fn with_network_name(mut self, network_name: impl Into<String>) -> Self {
        self.network_name = Some(network_name.into());
        self
    }

    pub fn with_rpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rpc_endpoints.push(endpoint.into());
        self
    }

    pub fn with_rpc_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rpc_endpoints.extend(endpoints.into_iter().map(Into::into));
        self
    }

    /// `hash-<hex>` of the installed contract.
    pub fn with_contract_hash(mut self, contract_hash: impl Into<String>) -> Self {
        self.contract_hash = Some(contract_hash.into());
        self
    }

    pub fn with_contract_package_hash(mut self, package_hash: impl Into<String>) -> Self {
        self.contract_package_hash = Some(package_hash.into());
        self
    }

    pub fn with_sse_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sse_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_error_table(mut self, source: ErrorTableSource) -> Self {
        self.error_table = source;
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let network_name = self
            .network_name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingNetworkName)?;

        let rpc_endpoints: Vec<String> = self
            .rpc_endpoints
            .iter()
            .filter_map(|endpoint| normalize_node_address(endpoint))
            .collect();
        if rpc_endpoints.is_empty() {
            return Err(ConfigError::MissingRpcEndpoints);
        }

        let contract_hash = parse_optional_hash("contract_hash", self.contract_hash)?
            .map(ContractHash::new);
        let contract_package_hash =
            parse_optional_hash("contract_package_hash", self.contract_package_hash)?
                .map(ContractPackageHash::new);

        let error_table = match self.error_table {
            ErrorTableSource::Builtin(version) => ErrorCodeTable::builtin(&version)?,
            ErrorTableSource::File(path) => ErrorCodeTable::load(path)?,
        };

        Ok(ClientConfig {
            network_name,
            rpc_endpoints,
            contract_hash,
            contract_package_hash,
            sse_endpoint: self.sse_endpoint.filter(|value| !value.trim().is_empty()),
            error_table,
        })
    }
}

fn parse_optional_hash(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<[u8; 32]>, ConfigError> {
    value
        .map(|value| parse_hash(value.trim()))
        .transpose()
        .map_err(|source| ConfigError::InvalidHash { field, source })
}
