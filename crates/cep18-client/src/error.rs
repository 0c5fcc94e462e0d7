//! Classification of failed deploys.
//!
//! A contract revert surfaces in the execution result as `User error: <code>`. The meaning of a
//! code depends on the contract version, so codes are resolved through an [`ErrorCodeTable`]
//! rather than a fixed enumeration.
use std::{collections::BTreeMap, fmt, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::constants::USER_ERROR_PREFIX;

/// A named failure condition of the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCondition {
    pub code: u16,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ErrorCondition {
    fn new(code: u16, name: &str, description: &str) -> Self {
        Self {
            code,
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Why a deploy failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeployFailure {
    #[error("contract error: {0}")]
    Contract(ErrorCondition),
    #[error("contract error with unknown code {0}")]
    UnknownCode(u16),
    #[error("{0}")]
    Other(String),
}

impl DeployFailure {
    /// Name of the contract condition, if the failure was classified.
    pub fn condition_name(&self) -> Option<&str> {
        match self {
            DeployFailure::Contract(condition) => Some(&condition.name),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorTableError {
    #[error("failed to parse error table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate error code {0}")]
    DuplicateCode(u16),
    #[error("unknown built-in error table `{0}`")]
    UnknownBuiltin(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct ErrorTableFile {
    version: String,
    #[serde(default)]
    errors: Vec<ErrorCondition>,
}

/// Versioned mapping from user error codes to named conditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorCodeTable {
    version: String,
    conditions: BTreeMap<u16, ErrorCondition>,
}

pub const CEP18_TABLE: &str = "cep18";
pub const ERC20_LEGACY_TABLE: &str = "erc20-legacy";

impl ErrorCodeTable {
    pub fn new(
        version: impl Into<String>,
        conditions: impl IntoIterator<Item = ErrorCondition>,
    ) -> Result<Self, ErrorTableError> {
        let mut map = BTreeMap::new();
        for condition in conditions {
            let code = condition.code;
            if map.insert(code, condition).is_some() {
                return Err(ErrorTableError::DuplicateCode(code));
            }
        }
        Ok(Self {
            version: version.into(),
            conditions: map,
        })
    }

    /// CEP-18 contract codes, 60000 upwards, with the five-list security model.
    pub fn cep18() -> Self {
        let conditions = [
            (60000, "InvalidContext", "CEP-18 contract called from within an invalid context."),
            (60001, "InsufficientBalance", "Spender does not have enough balance."),
            (60002, "InsufficientAllowance", "Spender does not have enough allowance approved."),
            (60003, "Overflow", "Operation would cause an integer overflow."),
            (60004, "PackageHashMissing", "A required package hash was not specified."),
            (60005, "PackageHashNotPackage", "The package hash specified does not represent a package."),
            (60006, "InvalidEventsMode", "An invalid event mode was specified."),
            (60007, "MissingEventsMode", "The event mode required was not specified."),
            (60008, "Phantom", "An unknown error occurred."),
            (60009, "FailedToGetArgBytes", "Failed to read the runtime arguments provided."),
            (60010, "InsufficientRights", "The caller does not have sufficient security access."),
            (60011, "InvalidAdminList", "The list of Admin accounts provided is invalid."),
            (60012, "InvalidMinterList", "The list of accounts that can mint tokens is invalid."),
            (60013, "InvalidBurnerList", "The list of accounts that can burn tokens is invalid."),
            (60014, "InvalidMintAndBurnList", "The list of accounts that can mint and burn is invalid."),
            (60015, "InvalidNoneList", "The list of accounts with no access rights is invalid."),
            (60016, "InvalidEnableMBFlag", "The flag to enable the mint and burn mode is invalid."),
            (60017, "AlreadyInitialized", "This contract instance cannot be initialized again."),
            (60018, "MintBurnDisabled", "The mint and burn mode is disabled."),
        ];
        Self::from_static(CEP18_TABLE, &conditions)
    }

    /// Codes of the ERC-20 predecessor, counted down from `u16::MAX`.
    pub fn erc20_legacy() -> Self {
        let conditions = [
            (u16::MAX, "InvalidContext", "Contract called from within an invalid context."),
            (u16::MAX - 1, "InsufficientBalance", "Spender does not have enough balance."),
            (u16::MAX - 2, "InsufficientAllowance", "Spender does not have enough allowance approved."),
            (u16::MAX - 3, "Overflow", "Operation would cause an integer overflow."),
        ];
        Self::from_static(ERC20_LEGACY_TABLE, &conditions)
    }

    /// Looks up a built-in table by version name.
    pub fn builtin(version: &str) -> Result<Self, ErrorTableError> {
        match version {
            CEP18_TABLE => Ok(Self::cep18()),
            ERC20_LEGACY_TABLE => Ok(Self::erc20_legacy()),
            other => Err(ErrorTableError::UnknownBuiltin(other.to_string())),
        }
    }

    /// Parses a table from TOML:
    ///
    /// ```toml
    /// version = "cep18-custom"
    ///
    /// [[errors]]
    /// code = 60001
    /// name = "InsufficientBalance"
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, ErrorTableError> {
        let file: ErrorTableFile = toml::from_str(input)?;
        Self::new(file.version, file.errors)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ErrorTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCondition> {
        self.conditions.get(&code)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Classifies the error message of a failed deploy.
    pub fn classify(&self, message: &str) -> DeployFailure {
        let Some(code) = message
            .strip_prefix(USER_ERROR_PREFIX)
            .and_then(|code| code.trim().parse::<u16>().ok())
        else {
            return DeployFailure::Other(message.to_string());
        };

        match self.get(code) {
            Some(condition) => DeployFailure::Contract(condition.clone()),
            None => {
                debug!(code, table = %self.version, "user error code missing from table");
                DeployFailure::UnknownCode(code)
            }
        }
    }

    fn from_static(version: &str, conditions: &[(u16, &str, &str)]) -> Self {
        Self {
            version: version.to_string(),
            conditions: conditions
                .iter()
                .map(|(code, name, description)| {
                    (*code, ErrorCondition::new(*code, name, description))
                })
                .collect(),
        }
    }
}

impl Default for ErrorCodeTable {
    fn default() -> Self {
        Self::cep18()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_user_error() {
        let failure = ErrorCodeTable::cep18().classify("User error: 60001");
        assert_eq!(failure.condition_name(), Some("InsufficientBalance"));
        assert!(matches!(failure, DeployFailure::Contract(ErrorCondition { code: 60001, .. })));
    }

    #[test]
    fn test_classify_other_message_verbatim() {
        let message = "Out of gas error";
        assert_eq!(
            ErrorCodeTable::cep18().classify(message),
            DeployFailure::Other(message.to_string())
        );
        assert_eq!(
            ErrorCodeTable::cep18().classify("User error: not-a-number"),
            DeployFailure::Other("User error: not-a-number".to_string())
        );
    }

    #[test]
    fn test_classify_unknown_code() {
        assert_eq!(
            ErrorCodeTable::cep18().classify("User error: 12"),
            DeployFailure::UnknownCode(12)
        );
    }

    #[test]
    fn test_tables_differ_between_versions() {
        let cep18 = ErrorCodeTable::cep18();
        let legacy = ErrorCodeTable::erc20_legacy();
        assert_eq!(cep18.len(), 19);
        assert_eq!(legacy.get(65534).map(|c| c.name.as_str()), Some("InsufficientBalance"));
        assert_eq!(legacy.classify("User error: 60001"), DeployFailure::UnknownCode(60001));
        assert_eq!(ErrorCodeTable::builtin("cep18").unwrap(), cep18);
        assert!(matches!(
            ErrorCodeTable::builtin("cep78"),
            Err(ErrorTableError::UnknownBuiltin(_))
        ));
    }

    #[test]
    fn test_table_from_toml() {
        let table = ErrorCodeTable::from_toml_str(
            r#"
            version = "custom"

            [[errors]]
            code = 60001
            name = "NotEnoughTokens"

            [[errors]]
            code = 60002
            name = "NotEnoughAllowance"
            description = "Allowance too low."
            "#,
        )
        .unwrap();
        assert_eq!(table.version(), "custom");
        assert_eq!(
            table.classify("User error: 60001").condition_name(),
            Some("NotEnoughTokens")
        );
        assert_eq!(table.get(60002).unwrap().description, "Allowance too low.");
    }

    #[test]
    fn test_table_rejects_duplicates() {
        let result = ErrorCodeTable::from_toml_str(
            r#"
            version = "broken"
            [[errors]]
            code = 1
            name = "A"
            [[errors]]
            code = 1
            name = "B"
            "#,
        );
        assert!(matches!(result, Err(ErrorTableError::DuplicateCode(1))));
    }
}
