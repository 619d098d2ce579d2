//! Embedded signer: a locally held key that signs without an external
//! wallet.
//!
//! `EmbeddedSigner` wraps an alloy `PrivateKeySigner`. When a submission
//! carries one, the chain client layers an `EthereumWallet` filler over its
//! provider and signs locally before broadcasting.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;

/// Locally held signing capability.
#[derive(Clone)]
pub struct EmbeddedSigner {
    signer: PrivateKeySigner,
}

impl EmbeddedSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Builds a signer from raw private key bytes.
    pub fn from_private_key(key: &B256) -> Result<Self, alloy::signers::k256::ecdsa::Error> {
        PrivateKeySigner::from_bytes(key).map(Self::new)
    }

    /// Address transactions from this signer are sent from.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for EmbeddedSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
