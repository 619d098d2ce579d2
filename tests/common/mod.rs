//! Shared helpers for session-level integration tests.
//!
//! Provides `ScriptedChain`, a `ChainClient` that replays queued reads,
//! submission results and receipts, plus fixtures for the farm contracts
//! and encoded balance reads.

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy::primitives::{Address, B256, Bytes, TxHash, U256, address};
use alloy::sol;
use alloy::sol_types::SolCall;
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;

use farm_evm::{
    BatchReadError, ChainClient, EmbeddedSigner, PollError, ReadOutcome, ReadQuery, ReceiptStatus,
    SubmissionError,
};
use farm_withdraw::FarmContracts;
use farm_withdraw::bindings::{IERC20Metadata, IYieldFarming};

pub const ACCOUNT: Address = address!("0x7777777777777777777777777777777777777777");

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
            returns (Call3Result[] memory returnData);
    }
}

pub fn farm_contracts() -> FarmContracts {
    FarmContracts {
        yield_farm: address!("0x00000000000000000000000000000000000000a1"),
        lp_token: address!("0x00000000000000000000000000000000000000a2"),
    }
}

pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10).pow(U256::from(18))
}

pub fn encode_staked(staked: U256) -> Bytes {
    IYieldFarming::userInfoCall::abi_encode_returns(&IYieldFarming::userInfoReturn {
        amount: staked,
        rewardDebt: U256::ZERO,
    })
    .into()
}

pub fn encode_reward(reward: U256) -> Bytes {
    IYieldFarming::pendingRewardsCall::abi_encode_returns(&reward).into()
}

pub fn encode_decimals(decimals: u8) -> Bytes {
    IERC20Metadata::decimalsCall::abi_encode_returns(&decimals).into()
}

pub fn balances(staked: U256, reward: U256, decimals: u8) -> Vec<ReadOutcome> {
    vec![
        Ok(encode_staked(staked)),
        Ok(encode_reward(reward)),
        Ok(encode_decimals(decimals)),
    ]
}

/// Multicall3 `aggregate3` return data with one entry per `(success,
/// returnData)` pair.
pub fn encode_aggregate3(results: Vec<(bool, Bytes)>) -> Bytes {
    let results: Vec<IMulticall3::Call3Result> = results
        .into_iter()
        .map(|(success, data)| IMulticall3::Call3Result {
            success,
            returnData: data,
        })
        .collect();

    IMulticall3::aggregate3Call::abi_encode_returns(&results).into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub target: Address,
    pub calldata: Bytes,
    pub signer: Option<Address>,
}

#[derive(Default)]
struct Script {
    reads: VecDeque<Vec<ReadOutcome>>,
    submits: VecDeque<Result<TxHash, String>>,
    receipts: VecDeque<bool>,
    read_count: usize,
    submitted: Vec<Submitted>,
}

/// Replays scripted responses in order. Reads repeat the last scripted
/// balances once the queue runs dry.
#[derive(Default)]
pub struct ScriptedChain {
    script: Mutex<Script>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(self, outcomes: Vec<ReadOutcome>) -> Self {
        self.script.lock().unwrap().reads.push_back(outcomes);
        self
    }

    pub fn submit_ok(self, tx_hash: TxHash) -> Self {
        self.script.lock().unwrap().submits.push_back(Ok(tx_hash));
        self
    }

    pub fn submit_rejected(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .submits
            .push_back(Err(message.to_string()));
        self
    }

    pub fn receipt(self, success: bool) -> Self {
        self.script.lock().unwrap().receipts.push_back(success);
        self
    }

    pub fn read_count(&self) -> usize {
        self.script.lock().unwrap().read_count
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.script.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn batch_read(&self, _queries: &[ReadQuery]) -> Result<Vec<ReadOutcome>, BatchReadError> {
        let mut script = self.script.lock().unwrap();
        script.read_count += 1;

        let outcomes = if script.reads.len() > 1 {
            script.reads.pop_front()
        } else {
            script.reads.front().cloned()
        };

        outcomes.ok_or_else(|| TransportErrorKind::custom_str("nothing scripted").into())
    }

    async fn submit(
        &self,
        target: Address,
        calldata: Bytes,
        signer: Option<&EmbeddedSigner>,
    ) -> Result<TxHash, SubmissionError> {
        let mut script = self.script.lock().unwrap();
        script.submitted.push(Submitted {
            target,
            calldata,
            signer: signer.map(EmbeddedSigner::address),
        });

        match script.submits.pop_front() {
            Some(Ok(tx_hash)) => Ok(tx_hash),
            Some(Err(message)) => Err(SubmissionError::Rejected { message }),
            None => Ok(B256::repeat_byte(0xee)),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, PollError> {
        let success = self
            .script
            .lock()
            .unwrap()
            .receipts
            .pop_front()
            .unwrap_or(true);

        Ok(ReceiptStatus {
            tx_hash,
            success,
            block_number: Some(42),
        })
    }
}
