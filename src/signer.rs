//! Signer resolution: whether a submission is signed by an embedded local
//! key or left to the ambient connected account.

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::{debug, warn};

use farm_evm::EmbeddedSigner;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("embedded signer unavailable: {0}")]
    Unavailable(String),
}

/// Decides whether an embedded signer is available for the session.
#[async_trait]
pub trait SignerResolver: Send + Sync + 'static {
    async fn resolve(&self) -> Result<Option<EmbeddedSigner>, SignerError>;
}

/// Resolver over a signer fixed at startup, typically loaded from secrets.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSignerResolver {
    signer: Option<EmbeddedSigner>,
}

impl ConfiguredSignerResolver {
    pub fn new(signer: Option<EmbeddedSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl SignerResolver for ConfiguredSignerResolver {
    async fn resolve(&self) -> Result<Option<EmbeddedSigner>, SignerError> {
        Ok(self.signer.clone())
    }
}

/// How a single submission is signed. Resolved once per submission.
#[derive(Debug, Clone)]
pub enum Signing {
    Embedded(EmbeddedSigner),
    Ambient,
}

impl Signing {
    pub fn signer(&self) -> Option<&EmbeddedSigner> {
        match self {
            Self::Embedded(signer) => Some(signer),
            Self::Ambient => None,
        }
    }
}

/// A failing resolver is treated like one that found no embedded signer.
pub async fn resolve_signing<Resolver: SignerResolver + ?Sized>(resolver: &Resolver) -> Signing {
    match resolver.resolve().await {
        Ok(Some(signer)) => {
            debug!(address = %signer.address(), "Signing with embedded signer");
            Signing::Embedded(signer)
        }
        Ok(None) => {
            debug!("No embedded signer, signing with ambient account");
            Signing::Ambient
        }
        Err(error) => {
            warn!(%error, "Signer resolution failed, falling back to ambient account");
            Signing::Ambient
        }
    }
}

/// Account that balance reads are keyed to: the embedded signer's address
/// when one resolves, otherwise the ambient account.
pub async fn resolve_account<Resolver: SignerResolver + ?Sized>(
    resolver: &Resolver,
    ambient_account: Option<Address>,
) -> Option<Address> {
    match resolve_signing(resolver).await {
        Signing::Embedded(signer) => Some(signer.address()),
        Signing::Ambient => ambient_account,
    }
}
