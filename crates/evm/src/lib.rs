//! Chain client abstraction for the yield farm.
//!
//! This crate provides the [`ChainClient`] trait, the narrow contract the
//! withdrawal orchestrator consumes:
//!
//! - [`ChainClient::batch_read`] — one batched request bundling several
//!   independent view calls, with a per-entry outcome. Only a failure of the
//!   batching mechanism itself fails the whole request.
//!
//! - [`ChainClient::submit`] — submit a contract write call, either signed
//!   explicitly by an [`EmbeddedSigner`] or left to the ambient
//!   node-managed account when no signer is given. Returns as soon as the
//!   transaction hash is known.
//!
//! - [`ChainClient::wait_for_receipt`] — poll until the transaction is
//!   included and report whether it executed successfully.
//!
//! [`RpcChainClient`](rpc::RpcChainClient) implements the trait against an
//! alloy provider. Revert payloads are decoded into short human-readable
//! messages by [`error_decoding`] before they reach callers.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;

pub mod error_decoding;
pub mod local;
pub mod rpc;

pub use local::EmbeddedSigner;

/// A single view call inside a batched read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadQuery {
    pub target: Address,
    pub calldata: Bytes,
}

impl ReadQuery {
    pub fn new(target: Address, calldata: impl Into<Bytes>) -> Self {
        Self {
            target,
            calldata: calldata.into(),
        }
    }
}

/// Per-entry result of a batched read: the raw ABI-encoded return data, or
/// the reason that single call failed.
pub type ReadOutcome = Result<Bytes, ReadError>;

/// Failure of one entry in a batched read. Other entries are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("call reverted: {reason}")]
    Reverted { reason: String },
}

/// The batching mechanism itself is unavailable, so no entry has a result.
#[derive(Debug, thiserror::Error)]
pub enum BatchReadError {
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    #[error("malformed batch response: {0}")]
    Decode(#[from] alloy::sol_types::Error),
    #[error("batch returned {actual} results for {expected} queries")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Submission was rejected before a transaction hash existed: the user
/// declined to sign, simulation reverted, or the transport failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{message}")]
    Rejected { message: String },
    #[error("no ambient account configured and no embedded signer available")]
    NoAmbientAccount,
    #[error("transport error: {0}")]
    Transport(alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
}

impl From<alloy::transports::RpcError<alloy::transports::TransportErrorKind>> for SubmissionError {
    fn from(error: alloy::transports::RpcError<alloy::transports::TransportErrorKind>) -> Self {
        match error_decoding::revert_reason(&error) {
            Some(message) => Self::Rejected { message },
            None => Self::Transport(error),
        }
    }
}

/// Waiting for the receipt of a submitted transaction failed.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("pending transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
}

/// Outcome of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Read, submit, and receipt access to an EVM chain.
///
/// Implementations own transport and signing details. Consumers build
/// calldata and hand it over without knowing how the transaction is signed,
/// broadcast, or polled.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Execute all `queries` as one batched request.
    ///
    /// The returned vector has exactly one outcome per query, in order.
    async fn batch_read(&self, queries: &[ReadQuery]) -> Result<Vec<ReadOutcome>, BatchReadError>;

    /// Submit a contract write call and return its transaction hash.
    ///
    /// - `target` — contract address
    /// - `calldata` — ABI-encoded function call
    /// - `signer` — embedded signer to sign with; `None` means the ambient
    ///   connected account signs
    async fn submit(
        &self,
        target: Address,
        calldata: Bytes,
        signer: Option<&EmbeddedSigner>,
    ) -> Result<TxHash, SubmissionError>;

    /// Wait until `tx_hash` is included and report its execution status.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, PollError>;
}

#[async_trait]
impl<T: ChainClient> ChainClient for Arc<T> {
    async fn batch_read(&self, queries: &[ReadQuery]) -> Result<Vec<ReadOutcome>, BatchReadError> {
        (**self).batch_read(queries).await
    }

    async fn submit(
        &self,
        target: Address,
        calldata: Bytes,
        signer: Option<&EmbeddedSigner>,
    ) -> Result<TxHash, SubmissionError> {
        (**self).submit(target, calldata, signer).await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, PollError> {
        (**self).wait_for_receipt(tx_hash).await
    }
}
