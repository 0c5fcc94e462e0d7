//! Names used by the CEP-18 contract: entry points, runtime arguments, named keys and dictionaries.

pub const ENTRY_POINT_APPROVE: &str = "approve";
pub const ENTRY_POINT_BURN: &str = "burn";
pub const ENTRY_POINT_CHANGE_SECURITY: &str = "change_security";
pub const ENTRY_POINT_DECREASE_ALLOWANCE: &str = "decrease_allowance";
pub const ENTRY_POINT_INCREASE_ALLOWANCE: &str = "increase_allowance";
pub const ENTRY_POINT_MINT: &str = "mint";
pub const ENTRY_POINT_TRANSFER: &str = "transfer";
pub const ENTRY_POINT_TRANSFER_FROM: &str = "transfer_from";

pub const ARG_AMOUNT: &str = "amount";
pub const ARG_DECIMALS: &str = "decimals";
pub const ARG_ENABLE_MINT_BURN: &str = "enable_mint_burn";
pub const ARG_EVENTS_MODE: &str = "events_mode";
pub const ARG_NAME: &str = "name";
pub const ARG_OWNER: &str = "owner";
pub const ARG_RECIPIENT: &str = "recipient";
pub const ARG_SPENDER: &str = "spender";
pub const ARG_SYMBOL: &str = "symbol";
pub const ARG_TOTAL_SUPPLY: &str = "total_supply";

pub const ADMIN_LIST: &str = "admin_list";
pub const MINTER_LIST: &str = "minter_list";
pub const BURNER_LIST: &str = "burner_list";
pub const MINT_AND_BURN_LIST: &str = "mint_and_burn_list";
pub const NONE_LIST: &str = "none_list";

/// Named keys holding token metadata under the contract.
pub const KEY_NAME: &str = "name";
pub const KEY_SYMBOL: &str = "symbol";
pub const KEY_DECIMALS: &str = "decimals";
pub const KEY_TOTAL_SUPPLY: &str = "total_supply";
pub const KEY_EVENTS_MODE: &str = "events_mode";

pub const DICT_ALLOWANCES: &str = "allowances";
pub const DICT_BALANCES: &str = "balances";

/// Prefix of formatted contract and package hashes.
pub const HASH_PREFIX: &str = "hash-";
/// Prefix of formatted account hashes.
pub const ACCOUNT_HASH_PREFIX: &str = "account-hash-";

/// Prefix of the message the node reports for a contract revert with a user error.
pub const USER_ERROR_PREFIX: &str = "User error: ";
