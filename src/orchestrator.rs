//! Withdraw session: owns the balance snapshot, the live amount input, its
//! validation, and the active transaction record for one account.
//!
//! Every piece of state is published through a `watch` channel so a
//! presentation layer can subscribe and re-render on change. Each call to
//! [`WithdrawSession::submit`] creates a new [`TransactionRecord`] which
//! becomes the active one; an older record still in flight is abandoned and
//! its late updates are discarded by comparing record ids.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, U256};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use farm_evm::ChainClient;

use crate::signer::{SignerResolver, resolve_account, resolve_signing};
use crate::snapshot::{BalanceSnapshot, FarmContracts, SnapshotError, SnapshotStore};
use crate::transaction::{
    ActionKind, FarmAction, RecordId, TransactionRecord, TransitionError,
};
use crate::units::{DecimalUnits, UnitConverter};
use crate::validation::{ValidationError, ValidationResult, validate_with};

/// Why a withdraw or claim could not be started. Nothing was submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("token decimals are not known yet")]
    DecimalsUnknown,
    #[error("amount {requested} no longer matches the validated input")]
    StaleAmount { requested: U256 },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no account to read balances for: no embedded signer and no ambient account")]
    NoAccount,
}

pub struct WithdrawSession<Chain, Resolver, Units = DecimalUnits> {
    chain: Chain,
    resolver: Resolver,
    units: Units,
    contracts: FarmContracts,
    account: Address,
    snapshot: SnapshotStore,
    input: watch::Sender<String>,
    validation: watch::Sender<ValidationResult>,
    transaction: watch::Sender<Option<TransactionRecord>>,
    status_revealed: watch::Sender<bool>,
    last_record_id: AtomicU64,
}

impl<Chain, Resolver> WithdrawSession<Chain, Resolver>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
{
    /// Session for `account` with an empty snapshot.
    pub fn new(chain: Chain, resolver: Resolver, contracts: FarmContracts, account: Address) -> Self {
        Self {
            chain,
            resolver,
            units: DecimalUnits,
            contracts,
            account,
            snapshot: SnapshotStore::new(),
            input: watch::channel(String::new()).0,
            validation: watch::channel(ValidationResult::default()).0,
            transaction: watch::channel(None).0,
            status_revealed: watch::channel(false).0,
            last_record_id: AtomicU64::new(0),
        }
    }

    /// Resolves the account balances are keyed to and performs the initial
    /// snapshot read.
    ///
    /// A failed initial read leaves the snapshot empty; the session is still
    /// usable and validation stays inert until a later refresh succeeds.
    pub async fn connect(
        chain: Chain,
        resolver: Resolver,
        contracts: FarmContracts,
        ambient_account: Option<Address>,
    ) -> Result<Self, SessionError> {
        let account = resolve_account(&resolver, ambient_account)
            .await
            .ok_or(SessionError::NoAccount)?;

        info!(%account, yield_farm = %contracts.yield_farm, "Starting withdraw session");

        let session = Self::new(chain, resolver, contracts, account);
        if let Err(error) = session.refresh_snapshot().await {
            warn!(%error, "Initial snapshot read failed");
        }

        Ok(session)
    }
}

impl<Chain, Resolver, Units> WithdrawSession<Chain, Resolver, Units>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
    Units: UnitConverter,
{
    pub fn with_units<Other: UnitConverter>(self, units: Other) -> WithdrawSession<Chain, Resolver, Other> {
        let session = WithdrawSession {
            chain: self.chain,
            resolver: self.resolver,
            units,
            contracts: self.contracts,
            account: self.account,
            snapshot: self.snapshot,
            input: self.input,
            validation: self.validation,
            transaction: self.transaction,
            status_revealed: self.status_revealed,
            last_record_id: self.last_record_id,
        };
        session.revalidate();
        session
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn contracts(&self) -> &FarmContracts {
        &self.contracts
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn snapshot(&self) -> watch::Receiver<BalanceSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn validation(&self) -> watch::Receiver<ValidationResult> {
        self.validation.subscribe()
    }

    pub fn transaction(&self) -> watch::Receiver<Option<TransactionRecord>> {
        self.transaction.subscribe()
    }

    /// Becomes `true` the moment a transaction hash exists for the active
    /// record.
    pub fn status_revealed(&self) -> watch::Receiver<bool> {
        self.status_revealed.subscribe()
    }

    pub fn current_snapshot(&self) -> BalanceSnapshot {
        self.snapshot.current()
    }

    pub fn current_validation(&self) -> ValidationResult {
        self.validation.borrow().clone()
    }

    pub fn current_transaction(&self) -> Option<TransactionRecord> {
        self.transaction.borrow().clone()
    }

    pub fn hide_status(&self) {
        self.status_revealed.send_replace(false);
    }

    /// Replaces the raw amount input and re-validates it.
    pub fn set_input(&self, raw_amount: impl Into<String>) {
        self.input.send_replace(raw_amount.into());
        self.revalidate();
    }

    /// Re-reads the snapshot for the session account and re-validates the
    /// current input against it.
    pub async fn refresh_snapshot(&self) -> Result<BalanceSnapshot, SnapshotError> {
        let refreshed = self
            .snapshot
            .refresh(&self.chain, &self.contracts, self.account)
            .await;
        self.revalidate();
        refreshed
    }

    /// Withdraws the currently validated input amount.
    pub async fn withdraw(&self) -> Result<TransactionRecord, SubmitError> {
        self.submit(ActionKind::Withdraw, None).await
    }

    pub async fn claim_reward(&self) -> Result<TransactionRecord, SubmitError> {
        self.submit(ActionKind::ClaimReward, None).await
    }

    /// Starts a new record for `kind` and drives it to a terminal phase.
    ///
    /// A withdraw is refused unless the input currently validates. When
    /// `amount` is given it must equal the validated amount, otherwise the
    /// validated amount is used. Claims carry no amount and ignore it. Once
    /// started, every chain failure ends up in the returned record as
    /// `Failed`.
    pub async fn submit(
        &self,
        kind: ActionKind,
        amount: Option<U256>,
    ) -> Result<TransactionRecord, SubmitError> {
        let action = match kind {
            ActionKind::ClaimReward => FarmAction::ClaimReward,
            ActionKind::Withdraw => FarmAction::Withdraw(self.validated_amount(amount)?),
        };

        Ok(self.execute(action).await)
    }

    fn validated_amount(&self, requested: Option<U256>) -> Result<U256, SubmitError> {
        let validated = match self.current_validation() {
            ValidationResult::Valid(amount) => amount,
            ValidationResult::Invalid(error) => return Err(error.into()),
            ValidationResult::Inert => return Err(SubmitError::DecimalsUnknown),
        };

        match requested {
            Some(requested) if requested != validated => {
                warn!(%requested, %validated, "Withdraw amount differs from validated input");
                Err(SubmitError::StaleAmount { requested })
            }
            Some(_) | None => Ok(validated),
        }
    }

    #[tracing::instrument(skip(self), fields(account = %self.account), level = tracing::Level::INFO)]
    async fn execute(&self, action: FarmAction) -> TransactionRecord {
        let id = RecordId(self.last_record_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut record = TransactionRecord::new(id, action.kind());

        if let Some(abandoned) = self.transaction.send_replace(Some(record.clone()))
            && !abandoned.is_terminal()
        {
            debug!(abandoned = %abandoned.id(), record = %id, "Abandoning in-flight record");
        }

        self.advance(&mut record, TransactionRecord::await_signature);

        let signing = resolve_signing(&self.resolver).await;
        let submitted = self
            .chain
            .submit(
                action.target(&self.contracts),
                action.calldata(),
                signing.signer(),
            )
            .await;

        let tx_hash = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(error) => {
                warn!(record = %id, %error, "Submission rejected");
                self.advance(&mut record, |record| record.fail(error.to_string()));
                return record;
            }
        };

        info!(record = %id, %tx_hash, "Transaction submitted");
        if self.advance(&mut record, |record| record.submitted(tx_hash)) {
            self.status_revealed.send_replace(true);
        }

        self.advance(&mut record, TransactionRecord::confirming);

        match self.chain.wait_for_receipt(tx_hash).await {
            Ok(receipt) if receipt.success => {
                info!(record = %id, %tx_hash, block = ?receipt.block_number, "Transaction confirmed");
                self.advance(&mut record, TransactionRecord::confirmed);

                if let Err(error) = self.refresh_snapshot().await {
                    warn!(record = %id, %error, "Post-confirmation refresh failed");
                }
            }
            Ok(receipt) => {
                warn!(record = %id, %tx_hash, block = ?receipt.block_number, "Transaction reverted");
                self.advance(&mut record, |record| record.fail("transaction reverted"));
            }
            Err(error) => {
                error!(record = %id, %tx_hash, %error, "Waiting for receipt failed");
                self.advance(&mut record, |record| record.fail(error.to_string()));
            }
        }

        record
    }

    /// Applies `step` to the local record and publishes it if it is still the
    /// active one. Returns whether the update was published.
    fn advance(
        &self,
        record: &mut TransactionRecord,
        step: impl FnOnce(&mut TransactionRecord) -> Result<(), TransitionError>,
    ) -> bool {
        if let Err(error) = step(record) {
            error!(%error, "Invalid transaction record transition");
            return false;
        }

        self.transaction.send_if_modified(|active| match active {
            Some(current) if current.id() == record.id() => {
                *current = record.clone();
                true
            }
            _ => {
                debug!(
                    record = %record.id(),
                    phase = ?record.phase(),
                    "Discarding update from abandoned record"
                );
                false
            }
        })
    }

    fn revalidate(&self) {
        let snapshot = self.snapshot.current();
        let result = validate_with(&self.units, &self.input.borrow(), &snapshot);

        self.validation.send_if_modified(|current| {
            if *current == result {
                return false;
            }
            *current = result;
            true
        });
    }
}
