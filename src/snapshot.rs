//! Balance snapshot: the on-chain values every decision is made against.
//!
//! A snapshot is filled by a single batched read of three independent
//! queries keyed to the active account: the staked amount, the pending
//! reward, and the LP token's decimals. A query that fails leaves its field
//! absent without affecting the other two. When the batch itself cannot be
//! executed the refresh fails and the previous snapshot stays published.
//!
//! [`SnapshotStore`] publishes snapshots through a `watch` channel, so every
//! replacement is atomic and subscribers never see a mix of old and new
//! fields.

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use farm_evm::{BatchReadError, ChainClient, ReadOutcome, ReadQuery};

use crate::bindings::{IERC20Metadata, IYieldFarming};

/// Addresses of the two contracts the snapshot reads from and the
/// orchestrator writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmContracts {
    pub yield_farm: Address,
    pub lp_token: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Withdrawable stake, in LP token base units.
    pub staked_amount: Option<U256>,
    /// Rewards accrued and claimable.
    pub pending_reward: Option<U256>,
    pub decimals: Option<u8>,
}

impl BalanceSnapshot {
    /// True when a reward is known and strictly positive.
    pub fn has_claimable_reward(&self) -> bool {
        self.pending_reward.is_some_and(|reward| !reward.is_zero())
    }

    pub fn is_empty(&self) -> bool {
        self.staked_amount.is_none() && self.pending_reward.is_none() && self.decimals.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("batched read unavailable: {0}")]
    BatchUnavailable(#[from] BatchReadError),
}

/// Calldata for the three snapshot queries, in field order.
pub(crate) fn snapshot_queries(contracts: &FarmContracts, account: Address) -> [ReadQuery; 3] {
    [
        ReadQuery::new(
            contracts.yield_farm,
            IYieldFarming::userInfoCall { user: account }.abi_encode(),
        ),
        ReadQuery::new(
            contracts.yield_farm,
            IYieldFarming::pendingRewardsCall { user: account }.abi_encode(),
        ),
        ReadQuery::new(contracts.lp_token, IERC20Metadata::decimalsCall {}.abi_encode()),
    ]
}

fn decode_snapshot(outcomes: Vec<ReadOutcome>) -> BalanceSnapshot {
    let mut outcomes = outcomes.into_iter();

    let staked_amount = decode_field("staked_amount", outcomes.next(), |data| {
        IYieldFarming::userInfoCall::abi_decode_returns(data).map(|info| info.amount)
    });
    let pending_reward = decode_field("pending_reward", outcomes.next(), |data| {
        IYieldFarming::pendingRewardsCall::abi_decode_returns(data)
    });
    let decimals = decode_field("decimals", outcomes.next(), |data| {
        IERC20Metadata::decimalsCall::abi_decode_returns(data)
    });

    BalanceSnapshot {
        staked_amount,
        pending_reward,
        decimals,
    }
}

fn decode_field<T>(
    field: &'static str,
    outcome: Option<ReadOutcome>,
    decode: impl FnOnce(&[u8]) -> Result<T, alloy::sol_types::Error>,
) -> Option<T> {
    let data = match outcome {
        Some(Ok(data)) => data,
        Some(Err(error)) => {
            warn!(field, %error, "Snapshot query failed, leaving field absent");
            return None;
        }
        None => {
            warn!(field, "Batched read returned no result for query");
            return None;
        }
    };

    match decode(&data) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(field, %error, "Failed to decode snapshot query result");
            None
        }
    }
}

/// Single owner of the published [`BalanceSnapshot`].
#[derive(Debug)]
pub struct SnapshotStore {
    sender: watch::Sender<BalanceSnapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    /// Starts empty: every field absent until the first refresh.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(BalanceSnapshot::default());
        Self { sender }
    }

    pub fn current(&self) -> BalanceSnapshot {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceSnapshot> {
        self.sender.subscribe()
    }

    /// Re-reads all three values for `account` and publishes the result.
    ///
    /// On a batch failure nothing is published and the previous snapshot
    /// remains current.
    #[tracing::instrument(skip_all, fields(%account), level = tracing::Level::DEBUG)]
    pub async fn refresh<Chain: ChainClient>(
        &self,
        chain: &Chain,
        contracts: &FarmContracts,
        account: Address,
    ) -> Result<BalanceSnapshot, SnapshotError> {
        let queries = snapshot_queries(contracts, account);

        let outcomes = chain.batch_read(&queries).await.inspect_err(|error| {
            warn!(%error, "Snapshot refresh failed, keeping previous snapshot");
        })?;

        let snapshot = decode_snapshot(outcomes);

        if snapshot.is_empty() {
            warn!("Every snapshot query failed");
        } else {
            debug!(?snapshot, "Snapshot refreshed");
        }

        self.sender.send_replace(snapshot.clone());
        info!(
            staked = ?snapshot.staked_amount,
            reward = ?snapshot.pending_reward,
            decimals = ?snapshot.decimals,
            "Published balance snapshot"
        );

        Ok(snapshot)
    }
}
