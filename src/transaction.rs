//! Transaction records for the two farm actions.
//!
//! A [`TransactionRecord`] is created fresh for every submission attempt and
//! only moves forward:
//!
//! ```text
//! NotSubmitted -> AwaitingSignature -> Pending -> Confirming -> Confirmed
//!                        |                            |
//!                        +-------> Failed <-----------+
//! ```
//!
//! `Confirmed` and `Failed` are terminal. The hash is set exactly once, on
//! the move to `Pending`.

use std::fmt;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;

use crate::bindings::IYieldFarming;
use crate::snapshot::FarmContracts;

/// Identity of a record within a session. Monotonically increasing, so a
/// completion carrying an older id belongs to an abandoned record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub(crate) u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Withdraw,
    ClaimReward,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Withdraw => write!(f, "withdraw"),
            Self::ClaimReward => write!(f, "claim reward"),
        }
    }
}

/// An action together with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmAction {
    /// Withdraw this many LP token base units.
    Withdraw(U256),
    ClaimReward,
}

impl FarmAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Withdraw(_) => ActionKind::Withdraw,
            Self::ClaimReward => ActionKind::ClaimReward,
        }
    }

    pub(crate) fn target(&self, contracts: &FarmContracts) -> Address {
        contracts.yield_farm
    }

    pub(crate) fn calldata(&self) -> Bytes {
        match self {
            Self::Withdraw(amount) => IYieldFarming::withdrawCall { amount: *amount }
                .abi_encode()
                .into(),
            Self::ClaimReward => IYieldFarming::claimRewardsCall {}.abi_encode().into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    NotSubmitted,
    AwaitingSignature,
    Pending,
    Confirming,
    Confirmed,
    Failed(String),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::NotSubmitted => 0,
            Self::AwaitingSignature => 1,
            Self::Pending => 2,
            Self::Confirming => 3,
            Self::Confirmed | Self::Failed(_) => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("record {id} cannot move from {from:?} to {to:?}")]
    Backwards { id: RecordId, from: Phase, to: Phase },
    #[error("record {id} already has hash {existing}")]
    HashAlreadySet { id: RecordId, existing: TxHash },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    id: RecordId,
    kind: ActionKind,
    hash: Option<TxHash>,
    phase: Phase,
}

impl TransactionRecord {
    pub(crate) fn new(id: RecordId, kind: ActionKind) -> Self {
        Self {
            id,
            kind,
            hash: None,
            phase: Phase::NotSubmitted,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn hash(&self) -> Option<TxHash> {
        self.hash
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub(crate) fn await_signature(&mut self) -> Result<(), TransitionError> {
        self.advance(Phase::AwaitingSignature)
    }

    /// Records the hash returned by submission.
    pub(crate) fn submitted(&mut self, hash: TxHash) -> Result<(), TransitionError> {
        if let Some(existing) = self.hash {
            return Err(TransitionError::HashAlreadySet {
                id: self.id,
                existing,
            });
        }

        self.advance(Phase::Pending)?;
        self.hash = Some(hash);
        Ok(())
    }

    pub(crate) fn confirming(&mut self) -> Result<(), TransitionError> {
        self.advance(Phase::Confirming)
    }

    pub(crate) fn confirmed(&mut self) -> Result<(), TransitionError> {
        self.advance(Phase::Confirmed)
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(Phase::Failed(reason.into()))
    }

    fn advance(&mut self, next: Phase) -> Result<(), TransitionError> {
        if self.phase.is_terminal() || next.rank() <= self.phase.rank() {
            return Err(TransitionError::Backwards {
                id: self.id,
                from: self.phase.clone(),
                to: next,
            });
        }

        self.phase = next;
        Ok(())
    }
}
