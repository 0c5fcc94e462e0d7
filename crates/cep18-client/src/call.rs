//! Builds deploys for the token contract's entry points.
//!
//! Argument bundles are mapped to named, CL-typed runtime arguments here; turning those into a
//! signed transaction is left to a [`DeployFactory`] supplied by the caller.
use casper_types::{
    CLTyped, CLValueError, Key, PublicKey, RuntimeArgs, SecretKey,
    bytesrepr::{Bytes, ToBytes},
    contracts::ContractHash,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    args::{
        ApproveArgs, BurnArgs, ChangeSecurityArgs, InstallArgs, MintArgs, PaymentAmount,
        TransferArgs, TransferFromArgs,
    },
    constants::{
        ARG_AMOUNT, ARG_DECIMALS, ARG_ENABLE_MINT_BURN, ARG_EVENTS_MODE, ARG_NAME, ARG_OWNER,
        ARG_RECIPIENT, ARG_SPENDER, ARG_SYMBOL, ARG_TOTAL_SUPPLY, ENTRY_POINT_APPROVE,
        ENTRY_POINT_BURN, ENTRY_POINT_CHANGE_SECURITY, ENTRY_POINT_DECREASE_ALLOWANCE,
        ENTRY_POINT_INCREASE_ALLOWANCE, ENTRY_POINT_MINT, ENTRY_POINT_TRANSFER,
        ENTRY_POINT_TRANSFER_FROM,
    },
    key::KeyParameter,
    modalities::MintBurn,
};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("change_security requires at least one non-empty security list")]
    AtLeastOneListRequired,
    #[error("contract hash is not set")]
    MissingContractHash,
    #[error("failed to encode runtime argument `{name}`: {error:?}")]
    ArgEncoding {
        name: &'static str,
        error: CLValueError,
    },
    #[error("deploy factory error: {0}")]
    Factory(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// What the deploy executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Session {
    /// Calls `entry_point` on an installed contract.
    StoredContract {
        contract_hash: ContractHash,
        entry_point: String,
    },
    /// Runs a compiled module, installing the contract.
    Install { module_bytes: Bytes },
}

impl Session {
    pub fn entry_point(&self) -> Option<&str> {
        match self {
            Session::StoredContract { entry_point, .. } => Some(entry_point),
            Session::Install { .. } => None,
        }
    }
}

/// Everything a [`DeployFactory`] needs to produce a transaction.
pub struct DeployRequest<'a> {
    pub session: Session,
    pub args: RuntimeArgs,
    pub payment: PaymentAmount,
    pub sender: &'a PublicKey,
    pub chain_name: &'a str,
    /// When present the transaction is returned signed by every key.
    pub signing_keys: Option<&'a [SecretKey]>,
}

/// Deploy construction and signing.
pub trait DeployFactory {
    type Transaction;
    type Error: std::error::Error + Send + Sync + 'static;

    fn build(&self, request: DeployRequest<'_>) -> Result<Self::Transaction, Self::Error>;
}

/// Maps argument bundles to contract calls and hands them to a [`DeployFactory`].
#[derive(Debug, Clone)]
pub struct CallBuilder<D> {
    factory: D,
    contract_hash: Option<ContractHash>,
}

impl<D: DeployFactory> CallBuilder<D> {
    pub fn new(factory: D) -> Self {
        Self {
            factory,
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

    pub fn contract_hash(&self) -> Option<ContractHash> {
        self.contract_hash
    }

    pub fn factory(&self) -> &D {
        &self.factory
    }

    /// Builds the deploy installing the contract from `module_bytes`.
    pub fn install(
        &self,
        module_bytes: impl Into<Vec<u8>>,
        args: &InstallArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        let session = Session::Install {
            module_bytes: Bytes::from(module_bytes.into()),
        };
        self.build(
            session,
            install_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn transfer(
        &self,
        args: &TransferArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_TRANSFER,
            transfer_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn transfer_from(
        &self,
        args: &TransferFromArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_TRANSFER_FROM,
            transfer_from_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn approve(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_APPROVE,
            allowance_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn increase_allowance(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_INCREASE_ALLOWANCE,
            allowance_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn decrease_allowance(
        &self,
        args: &ApproveArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_DECREASE_ALLOWANCE,
            allowance_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn mint(
        &self,
        args: &MintArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_MINT,
            mint_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    pub fn burn(
        &self,
        args: &BurnArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        self.call(
            ENTRY_POINT_BURN,
            burn_args(args)?,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    /// Fails with [`CallError::AtLeastOneListRequired`] before touching the factory when no list
    /// carries a key.
    pub fn change_security(
        &self,
        args: &ChangeSecurityArgs,
        payment: impl Into<PaymentAmount>,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        let runtime_args = change_security_args(args)?;
        self.call(
            ENTRY_POINT_CHANGE_SECURITY,
            runtime_args,
            payment.into(),
            sender,
            chain_name,
            signing_keys,
        )
    }

    fn call(
        &self,
        entry_point: &str,
        args: RuntimeArgs,
        payment: PaymentAmount,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        let contract_hash = self.contract_hash.ok_or(CallError::MissingContractHash)?;
        let session = Session::StoredContract {
            contract_hash,
            entry_point: entry_point.to_string(),
        };
        self.build(session, args, payment, sender, chain_name, signing_keys)
    }

    fn build(
        &self,
        session: Session,
        args: RuntimeArgs,
        payment: PaymentAmount,
        sender: &PublicKey,
        chain_name: &str,
        signing_keys: Option<&[SecretKey]>,
    ) -> Result<D::Transaction, CallError> {
        debug!(
            entry_point = session.entry_point().unwrap_or("<install>"),
            %payment,
            chain_name,
            signed = signing_keys.is_some(),
            "building deploy"
        );
        let request = DeployRequest {
            session,
            args,
            payment,
            sender,
            chain_name,
            signing_keys,
        };
        self.factory
            .build(request)
            .map_err(|error| CallError::Factory(Box::new(error)))
    }
}

/// Runtime arguments of the install session. Optional fields are left out when unset.
pub fn install_args(args: &InstallArgs) -> Result<RuntimeArgs, CallError> {
    let mut runtime_args = RuntimeArgs::new();
    insert(&mut runtime_args, ARG_NAME, args.name.clone())?;
    insert(&mut runtime_args, ARG_SYMBOL, args.symbol.clone())?;
    insert(&mut runtime_args, ARG_DECIMALS, args.decimals)?;
    insert(&mut runtime_args, ARG_TOTAL_SUPPLY, args.total_supply)?;
    if let Some(events_mode) = args.events_mode {
        insert(
            &mut runtime_args,
            ARG_EVENTS_MODE,
            casper_types::U256::from(events_mode),
        )?;
    }
    if let Some(enabled) = args.enable_mint_burn {
        insert(
            &mut runtime_args,
            ARG_ENABLE_MINT_BURN,
            MintBurn::from(enabled) as u8,
        )?;
    }
    Ok(runtime_args)
}

pub fn transfer_args(args: &TransferArgs) -> Result<RuntimeArgs, CallError> {
    let mut runtime_args = RuntimeArgs::new();
    insert(&mut runtime_args, ARG_RECIPIENT, args.recipient.to_key())?;
    insert(&mut runtime_args, ARG_AMOUNT, args.amount)?;
    Ok(runtime_args)
}

pub fn transfer_from_args(args: &TransferFromArgs) -> Result<RuntimeArgs, CallError> {
    let mut runtime_args = RuntimeArgs::new();
    insert(&mut runtime_args, ARG_OWNER, args.owner.to_key())?;
    insert(&mut runtime_args, ARG_RECIPIENT, args.recipient.to_key())?;
    insert(&mut runtime_args, ARG_AMOUNT, args.amount)?;
    Ok(runtime_args)
}

pub fn allowance_args(args: &ApproveArgs) -> Result<RuntimeArgs, CallError> {
    let mut runtime_args = RuntimeArgs::new();
    insert(&mut runtime_args, ARG_SPENDER, args.spender.to_key())?;
    insert(&mut runtime_args, ARG_AMOUNT, args.amount)?;
    Ok(runtime_args)
}

fn owner_amount_args(
    owner: &KeyParameter,
    amount: casper_types::U256,
) -> Result<RuntimeArgs, CallError> {
    let mut runtime_args = RuntimeArgs::new();
    insert(&mut runtime_args, ARG_OWNER, owner.to_key())?;
    insert(&mut runtime_args, ARG_AMOUNT, amount)?;
    Ok(runtime_args)
}

pub fn mint_args(args: &MintArgs) -> Result<RuntimeArgs, CallError> {
    owner_amount_args(&args.owner, args.amount)
}

pub fn burn_args(args: &BurnArgs) -> Result<RuntimeArgs, CallError> {
    owner_amount_args(&args.owner, args.amount)
}

/// Runtime arguments of `change_security`, one `List<Key>` per supplied list.
pub fn change_security_args(args: &ChangeSecurityArgs) -> Result<RuntimeArgs, CallError> {
    if args.is_empty() {
        return Err(CallError::AtLeastOneListRequired);
    }
    let mut runtime_args = RuntimeArgs::new();
    for (name, list) in args.supplied_lists() {
        let keys: Vec<Key> = list.iter().map(KeyParameter::to_key).collect();
        insert(&mut runtime_args, name, keys)?;
    }
    Ok(runtime_args)
}

fn insert<V: CLTyped + ToBytes>(
    runtime_args: &mut RuntimeArgs,
    name: &'static str,
    value: V,
) -> Result<(), CallError> {
    runtime_args
        .insert(name, value)
        .map_err(|error| CallError::ArgEncoding { name, error })
}
