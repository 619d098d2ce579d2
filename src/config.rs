use alloy::primitives::{Address, B256};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use url::Url;

use farm_evm::EmbeddedSigner;
use farm_evm::rpc::MULTICALL3;

use crate::snapshot::FarmContracts;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
    /// Path to TOML secrets file
    #[clap(long)]
    pub secrets: PathBuf,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    log_level: Option<LogLevel>,
    evm: EvmConfig,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EvmConfig {
    yield_farm: Address,
    lp_token: Address,
    ambient_account: Option<Address>,
    multicall: Option<Address>,
    required_confirmations: Option<u64>,
    receipt_timeout_secs: Option<u64>,
    explorer_url: Option<Url>,
}

/// Secret credentials deserialized from the secrets TOML.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Secrets {
    evm: EvmSecrets,
    embedded_signer: Option<EmbeddedSignerSecrets>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EvmSecrets {
    rpc_url: Url,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EmbeddedSignerSecrets {
    private_key: B256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        (&log_level).into()
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error("embedded signer private key is invalid")]
    InvalidPrivateKey(#[source] alloy::signers::k256::ecdsa::Error),
    #[error("required_confirmations must be at least 1")]
    ZeroConfirmations,
}

/// Runtime context assembled from the config and secrets files.
#[derive(Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub rpc_url: Url,
    pub contracts: FarmContracts,
    pub ambient_account: Option<Address>,
    pub multicall: Address,
    pub required_confirmations: u64,
    pub receipt_timeout: Duration,
    pub explorer_url: Option<Url>,
    pub embedded_signer: Option<EmbeddedSigner>,
}

impl std::fmt::Debug for Ctx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctx")
            .field("log_level", &self.log_level)
            .field("rpc_url", &"[REDACTED]")
            .field("contracts", &self.contracts)
            .field("ambient_account", &self.ambient_account)
            .field("multicall", &self.multicall)
            .field("required_confirmations", &self.required_confirmations)
            .field("receipt_timeout", &self.receipt_timeout)
            .field("explorer_url", &self.explorer_url)
            .field("embedded_signer", &self.embedded_signer)
            .finish()
    }
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        let secrets_str = std::fs::read_to_string(secrets)?;
        Self::from_toml(&config_str, &secrets_str)
    }

    pub fn from_toml(config_toml: &str, secrets_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Secrets = toml::from_str(secrets_toml)?;

        let embedded_signer = secrets
            .embedded_signer
            .map(|signer| EmbeddedSigner::from_private_key(&signer.private_key))
            .transpose()
            .map_err(ConfigError::InvalidPrivateKey)?;

        let required_confirmations = config.evm.required_confirmations.unwrap_or(1);
        if required_confirmations == 0 {
            return Err(ConfigError::ZeroConfirmations);
        }

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            rpc_url: secrets.evm.rpc_url,
            contracts: FarmContracts {
                yield_farm: config.evm.yield_farm,
                lp_token: config.evm.lp_token,
            },
            ambient_account: config.evm.ambient_account,
            multicall: config.evm.multicall.unwrap_or(MULTICALL3),
            required_confirmations,
            receipt_timeout: Duration::from_secs(config.evm.receipt_timeout_secs.unwrap_or(120)),
            explorer_url: config.evm.explorer_url,
            embedded_signer,
        })
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("farm_withdraw={level},farm_evm={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
