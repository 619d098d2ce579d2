//! Command-line interface for withdrawing staked LP tokens and claiming
//! rewards.

use farm_withdraw::cli;
use farm_withdraw::setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (ctx, command) = cli::CliEnv::parse_and_convert()?;
    setup_tracing(&ctx.log_level);

    cli::run_command(ctx, command).await?;
    Ok(())
}
