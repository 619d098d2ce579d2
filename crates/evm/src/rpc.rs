//! Alloy-backed [`ChainClient`].
//!
//! Batched reads go through the canonical Multicall3 deployment's
//! `aggregate3` with `allowFailure = true`, so one failing view call only
//! fails its own entry. Writes are sent either through a wallet filler
//! layered over the provider (embedded signer) or as `eth_sendTransaction`
//! from the ambient node-managed account. Receipts are awaited with a
//! configurable confirmation count and timeout.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, address};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error_decoding::decode_revert_data;
use crate::{
    BatchReadError, ChainClient, EmbeddedSigner, PollError, ReadError, ReadOutcome, ReadQuery,
    ReceiptStatus, SubmissionError,
};

/// Canonical Multicall3 address, identical on every chain it is deployed to.
pub const MULTICALL3: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

sol! {
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external
            payable
            returns (Call3Result[] memory returnData);
    }
}

/// Chain client over an alloy provider.
///
/// The provider does not need a wallet: embedded-signer submissions layer
/// one on per call, and ambient submissions rely on the node to sign for
/// `ambient_account`.
pub struct RpcChainClient<P> {
    provider: P,
    ambient_account: Option<Address>,
    multicall: Address,
    required_confirmations: u64,
    receipt_timeout: Duration,
}

impl<P> RpcChainClient<P> {
    pub fn new(provider: P, ambient_account: Option<Address>) -> Self {
        Self {
            provider,
            ambient_account,
            multicall: MULTICALL3,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Overrides the Multicall3 address for chains with a non-canonical
    /// deployment.
    #[must_use]
    pub fn with_multicall(mut self, multicall: Address) -> Self {
        self.multicall = multicall;
        self
    }

    #[must_use]
    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations;
        self
    }

    #[must_use]
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }
}

#[async_trait]
impl<P> ChainClient for RpcChainClient<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn batch_read(&self, queries: &[ReadQuery]) -> Result<Vec<ReadOutcome>, BatchReadError> {
        let calls = queries
            .iter()
            .map(|query| IMulticall3::Call3 {
                target: query.target,
                allowFailure: true,
                callData: query.calldata.clone(),
            })
            .collect();

        let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();
        let tx = TransactionRequest::default()
            .to(self.multicall)
            .input(Bytes::from(calldata).into());

        debug!(multicall = %self.multicall, queries = queries.len(), "Executing batched read");

        let response = self.provider.call(tx).await?;
        let results = IMulticall3::aggregate3Call::abi_decode_returns(&response)?;

        if results.len() != queries.len() {
            return Err(BatchReadError::LengthMismatch {
                expected: queries.len(),
                actual: results.len(),
            });
        }

        Ok(results.into_iter().map(into_read_outcome).collect())
    }

    async fn submit(
        &self,
        target: Address,
        calldata: Bytes,
        signer: Option<&EmbeddedSigner>,
    ) -> Result<TxHash, SubmissionError> {
        let tx = TransactionRequest::default()
            .to(target)
            .input(calldata.into());

        let pending = match signer {
            Some(signer) => {
                let from = signer.address();
                info!(%target, %from, "Submitting contract call with embedded signer");

                let provider = ProviderBuilder::new()
                    .wallet(signer.wallet())
                    .connect_provider(self.provider.clone());

                provider.send_transaction(tx.from(from)).await?
            }
            None => {
                let from = self
                    .ambient_account
                    .ok_or(SubmissionError::NoAmbientAccount)?;
                info!(%target, %from, "Submitting contract call through ambient account");

                self.provider.send_transaction(tx.from(from)).await?
            }
        };

        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, %target, "Transaction submitted");

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, PollError> {
        debug!(
            %tx_hash,
            required_confirmations = self.required_confirmations,
            "Waiting for receipt"
        );

        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.required_confirmations)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await?;

        let success = receipt.status();
        if success {
            info!(%tx_hash, block = ?receipt.block_number, "Transaction confirmed");
        } else {
            warn!(%tx_hash, block = ?receipt.block_number, "Transaction reverted");
        }

        Ok(ReceiptStatus {
            tx_hash: receipt.transaction_hash,
            success,
            block_number: receipt.block_number,
        })
    }
}

fn into_read_outcome(result: IMulticall3::Call3Result) -> ReadOutcome {
    if result.success {
        return Ok(result.returnData);
    }

    let reason = decode_revert_data(&result.returnData)
        .unwrap_or_else(|| format!("no revert reason ({} bytes)", result.returnData.len()));

    Err(ReadError::Reverted { reason })
}
