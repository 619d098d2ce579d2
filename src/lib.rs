//! Withdraw staked LP tokens from a yield farm and claim its rewards.
//!
//! A [`WithdrawSession`] ties together the balance snapshot, validation of
//! the user's amount, and the lifecycle of submitted transactions. Chain
//! access goes through the [`farm_evm::ChainClient`] trait.

pub mod bindings;
pub mod cli;
pub mod config;
pub mod orchestrator;
pub mod signer;
pub mod snapshot;
pub mod status;
pub mod transaction;
pub mod units;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use config::{Ctx, LogLevel, setup_tracing};
pub use orchestrator::{SessionError, SubmitError, WithdrawSession};
pub use signer::{ConfiguredSignerResolver, SignerError, SignerResolver, Signing};
pub use snapshot::{BalanceSnapshot, FarmContracts, SnapshotError};
pub use transaction::{ActionKind, FarmAction, Phase, RecordId, TransactionRecord};
pub use validation::{ValidationError, ValidationResult, validate};
