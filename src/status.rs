//! Presentation-neutral view of a session: balance lines, the transaction
//! status lines, and which actions are currently offered.

use alloy::primitives::TxHash;
use url::Url;

use crate::snapshot::BalanceSnapshot;
use crate::transaction::{Phase, TransactionRecord};
use crate::units::UnitConverter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub hash: Option<HashLine>,
    pub phase_line: String,
    /// Actions stay disabled while a signature is being awaited.
    pub submit_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashLine {
    pub full: String,
    pub short: String,
    pub explorer_link: Option<Url>,
}

impl StatusView {
    pub fn new(record: Option<&TransactionRecord>, explorer: Option<&Url>) -> Self {
        let Some(record) = record else {
            return Self {
                hash: None,
                phase_line: "No transaction submitted".to_string(),
                submit_disabled: false,
            };
        };

        let phase_line = match record.phase() {
            Phase::NotSubmitted => "No transaction submitted".to_string(),
            Phase::AwaitingSignature => "Confirm in wallet...".to_string(),
            Phase::Pending | Phase::Confirming => "Waiting for confirmation...".to_string(),
            Phase::Confirmed => "Transaction confirmed!".to_string(),
            Phase::Failed(reason) => format!("Error: {reason}"),
        };

        Self {
            hash: record.hash().map(|hash| HashLine::new(hash, explorer)),
            phase_line,
            submit_disabled: matches!(record.phase(), Phase::AwaitingSignature),
        }
    }

    pub fn hash_line(&self) -> String {
        self.hash
            .as_ref()
            .map_or_else(|| "No transaction hash".to_string(), |hash| hash.short.clone())
    }
}

impl HashLine {
    fn new(hash: TxHash, explorer: Option<&Url>) -> Self {
        let full = hash.to_string();
        Self {
            short: truncate_hash(&full),
            explorer_link: explorer.and_then(|base| explorer_tx_url(base, &full)),
            full,
        }
    }
}

/// `0x1234...abcd` form of a hex hash.
pub fn truncate_hash(hash: &str) -> String {
    if hash.len() <= 10 {
        return hash.to_string();
    }

    let head = hash.get(..6).unwrap_or(hash);
    let tail = hash.get(hash.len() - 4..).unwrap_or_default();
    format!("{head}...{tail}")
}

/// `{explorer}/tx/{hash}`, tolerating a trailing slash on the base.
fn explorer_tx_url(base: &Url, hash: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut().ok()?.pop_if_empty().push("tx").push(hash);
    Some(url)
}

/// Formatted balances. Fields are `None` (rendered as a placeholder) until
/// both the value and the token decimals are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceView {
    pub staked: Option<String>,
    pub pending_reward: Option<String>,
    /// The claim action is offered only for a known, positive reward.
    pub can_claim: bool,
}

impl BalanceView {
    pub fn new<Units: UnitConverter + ?Sized>(snapshot: &BalanceSnapshot, units: &Units) -> Self {
        let format = |amount: Option<alloy::primitives::U256>| {
            let decimals = snapshot.decimals?;
            amount.map(|amount| units.to_decimal_string(amount, decimals))
        };

        Self {
            staked: format(snapshot.staked_amount),
            pending_reward: format(snapshot.pending_reward),
            can_claim: snapshot.has_claimable_reward(),
        }
    }
}
