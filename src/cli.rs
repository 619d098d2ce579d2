//! Command-line presentation adapter: balance inspection, withdrawals and
//! reward claims against the configured yield farm.

use alloy::primitives::U256;
use alloy::providers::ProviderBuilder;
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::info;
use url::Url;

use farm_evm::ChainClient;
use farm_evm::rpc::RpcChainClient;

use crate::config::{Ctx, Env};
use crate::orchestrator::WithdrawSession;
use crate::signer::{ConfiguredSignerResolver, SignerResolver};
use crate::status::{BalanceView, StatusView};
use crate::transaction::{ActionKind, Phase, TransactionRecord};
use crate::units::UnitConverter;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the staked LP balance and pending rewards
    Balance,
    /// Withdraw staked LP tokens
    Withdraw {
        /// Amount of LP tokens to withdraw, as a decimal (e.g. 1.5)
        #[arg(short = 'a', long = "amount")]
        amount: String,
    },
    /// Claim all pending rewards
    Claim,
}

#[derive(Debug, Parser)]
#[command(name = "farm-withdraw-cli")]
#[command(about = "Withdraw staked LP tokens and claim rewards from a yield farm")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments and load the config and secrets files.
    pub fn parse_and_convert() -> anyhow::Result<(Ctx, Commands)> {
        let cli_env = Self::parse();
        let ctx = Ctx::load_files(&cli_env.env.config, &cli_env.env.secrets)?;
        Ok((ctx, cli_env.command))
    }
}

pub async fn run_command(ctx: Ctx, command: Commands) -> anyhow::Result<()> {
    let provider = ProviderBuilder::new().connect_http(ctx.rpc_url.clone());
    let chain = RpcChainClient::new(provider, ctx.ambient_account)
        .with_multicall(ctx.multicall)
        .with_required_confirmations(ctx.required_confirmations)
        .with_receipt_timeout(ctx.receipt_timeout);
    let resolver = ConfiguredSignerResolver::new(ctx.embedded_signer.clone());

    let session =
        WithdrawSession::connect(chain, resolver, ctx.contracts, ctx.ambient_account).await?;

    run_session_command(
        &session,
        command,
        ctx.explorer_url.as_ref(),
        &mut std::io::stdout(),
    )
    .await
}

/// Runs `command` against an already connected session, writing everything
/// user-facing to `stdout`.
pub async fn run_session_command<Chain, Resolver, Units, W>(
    session: &WithdrawSession<Chain, Resolver, Units>,
    command: Commands,
    explorer: Option<&Url>,
    stdout: &mut W,
) -> anyhow::Result<()>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
    Units: UnitConverter,
    W: Write,
{
    match command {
        Commands::Balance => {
            write_balances(session, stdout)?;
        }
        Commands::Withdraw { amount } => {
            session.set_input(amount.as_str());
            if let Some(message) = session.current_validation().message() {
                anyhow::bail!("{message}");
            }

            let parsed = session.current_validation().amount();
            info!(%amount, ?parsed, "Withdrawing staked LP tokens");
            let record =
                submit_with_progress(session, ActionKind::Withdraw, parsed, explorer, stdout)
                    .await?;
            finish(session, &record, stdout)?;
        }
        Commands::Claim => {
            let balances = BalanceView::new(&session.current_snapshot(), session.units());
            if !balances.can_claim {
                anyhow::bail!("No rewards to claim");
            }

            info!(reward = ?balances.pending_reward, "Claiming rewards");
            let record =
                submit_with_progress(session, ActionKind::ClaimReward, None, explorer, stdout)
                    .await?;
            finish(session, &record, stdout)?;
        }
    }

    Ok(())
}

fn write_balances<Chain, Resolver, Units, W>(
    session: &WithdrawSession<Chain, Resolver, Units>,
    stdout: &mut W,
) -> anyhow::Result<()>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
    Units: UnitConverter,
    W: Write,
{
    let balances = BalanceView::new(&session.current_snapshot(), session.units());
    let unavailable = || "unavailable".to_string();

    writeln!(stdout, "Account: {}", session.account())?;
    writeln!(
        stdout,
        "Staked LP: {}",
        balances.staked.unwrap_or_else(unavailable)
    )?;
    writeln!(
        stdout,
        "Pending rewards: {}",
        balances.pending_reward.unwrap_or_else(unavailable)
    )?;

    Ok(())
}

/// Submits `kind` and prints a status line each time the active record
/// changes phase.
async fn submit_with_progress<Chain, Resolver, Units, W>(
    session: &WithdrawSession<Chain, Resolver, Units>,
    kind: ActionKind,
    amount: Option<U256>,
    explorer: Option<&Url>,
    stdout: &mut W,
) -> anyhow::Result<TransactionRecord>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
    Units: UnitConverter,
    W: Write,
{
    let mut updates = session.transaction();
    let mut printer = StatusPrinter::new(explorer);

    let submission = session.submit(kind, amount);
    tokio::pin!(submission);

    loop {
        tokio::select! {
            result = &mut submission => {
                let record = result?;
                printer.print(Some(&record), stdout)?;
                return Ok(record);
            }
            Ok(()) = updates.changed() => {
                let record = updates.borrow_and_update().clone();
                printer.print(record.as_ref(), stdout)?;
            }
        }
    }
}

fn finish<Chain, Resolver, Units, W>(
    session: &WithdrawSession<Chain, Resolver, Units>,
    record: &TransactionRecord,
    stdout: &mut W,
) -> anyhow::Result<()>
where
    Chain: ChainClient,
    Resolver: SignerResolver,
    Units: UnitConverter,
    W: Write,
{
    match record.phase() {
        Phase::Confirmed => write_balances(session, stdout),
        Phase::Failed(reason) => anyhow::bail!("{} failed: {reason}", record.kind()),
        phase => anyhow::bail!("{} stopped in unexpected phase {phase:?}", record.kind()),
    }
}

/// Writes status lines, skipping repeats.
struct StatusPrinter<'a> {
    explorer: Option<&'a Url>,
    last_phase_line: Option<String>,
    hash_printed: bool,
}

impl<'a> StatusPrinter<'a> {
    fn new(explorer: Option<&'a Url>) -> Self {
        Self {
            explorer,
            last_phase_line: None,
            hash_printed: false,
        }
    }

    fn print<W: Write>(
        &mut self,
        record: Option<&TransactionRecord>,
        stdout: &mut W,
    ) -> std::io::Result<()> {
        let view = StatusView::new(record, self.explorer);

        if !self.hash_printed
            && let Some(hash) = &view.hash
        {
            writeln!(stdout, "Transaction hash: {}", hash.full)?;
            if let Some(link) = &hash.explorer_link {
                writeln!(stdout, "View on explorer: {link}")?;
            }
            self.hash_printed = true;
        }

        if self.last_phase_line.as_ref() != Some(&view.phase_line) {
            writeln!(stdout, "{}", view.phase_line)?;
            self.last_phase_line = Some(view.phase_line);
        }

        Ok(())
    }
}
