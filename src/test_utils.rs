//! Shared test fixtures: a scriptable chain client, signer resolvers, and
//! encoded balance reads.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, B256, Bytes, TxHash, U256, address, b256};
use alloy::sol_types::SolCall;
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use tokio::sync::Notify;

use farm_evm::{
    BatchReadError, ChainClient, EmbeddedSigner, PollError, ReadOutcome, ReadQuery, ReceiptStatus,
    SubmissionError,
};

use crate::bindings::{IERC20Metadata, IYieldFarming};
use crate::signer::{SignerError, SignerResolver};
use crate::snapshot::FarmContracts;

pub(crate) const TEST_ACCOUNT: Address = address!("0x1111111111111111111111111111111111111111");

// First anvil development key.
const TEST_KEY: B256 = b256!("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");

pub(crate) fn test_contracts() -> FarmContracts {
    FarmContracts {
        yield_farm: address!("0x00000000000000000000000000000000000000f1"),
        lp_token: address!("0x00000000000000000000000000000000000000f2"),
    }
}

pub(crate) fn test_signer() -> EmbeddedSigner {
    EmbeddedSigner::from_private_key(&TEST_KEY).unwrap()
}

/// Deterministic hash for the `n`th submission made against a
/// [`MockChainClient`], starting at 1.
pub(crate) fn tx_hash(n: u8) -> TxHash {
    B256::with_last_byte(n)
}

/// ABI-encoded return data for the three snapshot queries, in order.
pub(crate) fn balance_outcomes(staked: U256, reward: U256, decimals: u8) -> Vec<ReadOutcome> {
    let user_info = IYieldFarming::userInfoReturn {
        amount: staked,
        rewardDebt: U256::ZERO,
    };

    vec![
        Ok(IYieldFarming::userInfoCall::abi_encode_returns(&user_info).into()),
        Ok(IYieldFarming::pendingRewardsCall::abi_encode_returns(&reward).into()),
        Ok(IERC20Metadata::decimalsCall::abi_encode_returns(&decimals).into()),
    ]
}

pub(crate) enum MockRead {
    Outcomes(Vec<ReadOutcome>),
    /// The batching mechanism itself fails.
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub(crate) enum MockReceipt {
    Success,
    Reverted,
    PollFails(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Submission {
    pub(crate) target: Address,
    pub(crate) calldata: Bytes,
    /// Address of the embedded signer passed along, `None` for ambient.
    pub(crate) signer: Option<Address>,
}

#[derive(Default)]
struct MockState {
    reads: VecDeque<MockRead>,
    default_read: Option<Vec<ReadOutcome>>,
    batches: Vec<Vec<ReadQuery>>,
    submit_results: VecDeque<Result<TxHash, String>>,
    submissions: Vec<Submission>,
    receipts: HashMap<TxHash, MockReceipt>,
    receipt_gates: HashMap<TxHash, Arc<Notify>>,
}

/// Scriptable [`ChainClient`].
///
/// Reads pop scripted results first and otherwise repeat the default
/// balances. Submissions succeed with [`tx_hash`] of their sequence number
/// unless a result was scripted. Receipts succeed unless scripted per hash,
/// and a gated hash blocks in `wait_for_receipt` until released.
#[derive(Default)]
pub(crate) struct MockChainClient {
    state: Mutex<MockState>,
}

impl MockChainClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_balances(self, staked: U256, reward: U256, decimals: u8) -> Self {
        self.set_balances(staked, reward, decimals);
        self
    }

    pub(crate) fn set_balances(&self, staked: U256, reward: U256, decimals: u8) {
        self.state.lock().unwrap().default_read = Some(balance_outcomes(staked, reward, decimals));
    }

    pub(crate) fn push_read(&self, read: MockRead) {
        self.state.lock().unwrap().reads.push_back(read);
    }

    pub(crate) fn push_submit_result(&self, result: Result<TxHash, String>) {
        self.state.lock().unwrap().submit_results.push_back(result);
    }

    pub(crate) fn set_receipt(&self, tx_hash: TxHash, receipt: MockReceipt) {
        self.state.lock().unwrap().receipts.insert(tx_hash, receipt);
    }

    /// Holds `wait_for_receipt(tx_hash)` until the returned gate is
    /// notified.
    pub(crate) fn gate_receipt(&self, tx_hash: TxHash) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .receipt_gates
            .insert(tx_hash, Arc::clone(&gate));
        gate
    }

    pub(crate) fn batch_read_count(&self) -> usize {
        self.state.lock().unwrap().batches.len()
    }

    pub(crate) fn last_batch(&self) -> Option<Vec<ReadQuery>> {
        self.state.lock().unwrap().batches.last().cloned()
    }

    pub(crate) fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn batch_read(&self, queries: &[ReadQuery]) -> Result<Vec<ReadOutcome>, BatchReadError> {
        let mut state = self.state.lock().unwrap();
        state.batches.push(queries.to_vec());

        match state.reads.pop_front() {
            Some(MockRead::Outcomes(outcomes)) => Ok(outcomes),
            Some(MockRead::Unavailable(message)) => Err(TransportErrorKind::custom_str(&message).into()),
            None => state
                .default_read
                .clone()
                .ok_or_else(|| TransportErrorKind::custom_str("no scripted read").into()),
        }
    }

    async fn submit(
        &self,
        target: Address,
        calldata: Bytes,
        signer: Option<&EmbeddedSigner>,
    ) -> Result<TxHash, SubmissionError> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(Submission {
            target,
            calldata,
            signer: signer.map(EmbeddedSigner::address),
        });

        let sequence = u8::try_from(state.submissions.len()).unwrap();
        match state.submit_results.pop_front() {
            Some(Ok(hash)) => Ok(hash),
            Some(Err(message)) => Err(SubmissionError::Rejected { message }),
            None => Ok(tx_hash(sequence)),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, PollError> {
        let gate = self.state.lock().unwrap().receipt_gates.get(&tx_hash).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let receipt = self
            .state
            .lock()
            .unwrap()
            .receipts
            .get(&tx_hash)
            .cloned()
            .unwrap_or(MockReceipt::Success);

        match receipt {
            MockReceipt::Success => Ok(ReceiptStatus {
                tx_hash,
                success: true,
                block_number: Some(1),
            }),
            MockReceipt::Reverted => Ok(ReceiptStatus {
                tx_hash,
                success: false,
                block_number: Some(1),
            }),
            MockReceipt::PollFails(message) => {
                Err(PollError::Transport(TransportErrorKind::custom_str(&message)))
            }
        }
    }
}

pub(crate) struct MockSignerResolver {
    outcome: Result<Option<EmbeddedSigner>, SignerError>,
}

impl MockSignerResolver {
    pub(crate) fn embedded(signer: EmbeddedSigner) -> Self {
        Self {
            outcome: Ok(Some(signer)),
        }
    }

    pub(crate) fn none() -> Self {
        Self { outcome: Ok(None) }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            outcome: Err(SignerError::Unavailable(message.to_string())),
        }
    }
}

#[async_trait]
impl SignerResolver for MockSignerResolver {
    async fn resolve(&self) -> Result<Option<EmbeddedSigner>, SignerError> {
        self.outcome.clone()
    }
}
