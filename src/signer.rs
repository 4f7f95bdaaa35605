//! Signer abstraction
//!
//! The client never creates keys. It signs through whatever implements
//! [`SignerService`]; today that is a local keypair loaded by the
//! [`WalletManager`](crate::wallet::WalletManager).
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    signer::SignerError,
    transaction::Transaction,
};
use std::sync::Arc;

/// Async signer trait for signing transactions
#[async_trait]
pub trait SignerService: Send + Sync {
    /// Get the public key of this signer
    fn pubkey(&self) -> Pubkey;

    /// Sign a transaction against its own recent blockhash
    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SignerError>;
}

/// Local keypair signer
pub struct LocalSigner {
    keypair: Arc<Keypair>,
}

impl LocalSigner {
    pub fn new(keypair: Arc<Keypair>) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl SignerService for LocalSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SignerError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction.try_sign(&[self.keypair.as_ref()], blockhash)
    }
}

/// Mock signer for testing
///
/// Signs with a throwaway keypair, or always fails when built with
/// [`MockSigner::new_failing`].
pub struct MockSigner {
    keypair: Keypair,
    should_fail: bool,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            keypair: Keypair::new(),
            should_fail: true,
        }
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignerService for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: &mut Transaction) -> Result<(), SignerError> {
        if self.should_fail {
            return Err(SignerError::Custom(
                "Mock signer configured to fail".to_string(),
            ));
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction.try_sign(&[&self.keypair], blockhash)
    }
}
