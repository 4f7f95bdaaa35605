//! Wallet management module
//!
//! Loads an existing signing identity. Keys are never generated here.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Environment variable that may carry a base58 encoded secret key
pub const KEYPAIR_ENV: &str = "TASK_CLIENT_KEYPAIR";

/// Wallet manager holding the signing keypair
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    ///
    /// Accepts the Solana CLI JSON array format or 64 raw bytes.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let keypair_bytes = Zeroizing::new(
            std::fs::read(path)
                .with_context(|| format!("Failed to read keypair file: {}", path.display()))?,
        );

        if keypair_bytes.len() == 64 {
            return Self::from_secret_bytes(&keypair_bytes);
        }

        let json: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_slice(&keypair_bytes).context("Failed to parse keypair JSON")?,
        );
        Self::from_secret_bytes(&json)
    }

    /// Create a wallet manager from a base58 encoded 64-byte secret key
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .context("Keypair is not valid base58")?,
        );
        Self::from_secret_bytes(&bytes)
    }

    fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
        }
        if bytes.iter().all(|&b| b == 0) {
            anyhow::bail!("Invalid keypair: all-zero key rejected");
        }
        let keypair = Keypair::try_from(bytes).context("Invalid keypair bytes")?;
        Ok(Self::from_keypair(keypair))
    }

    /// Create a new wallet manager from a keypair
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Locate the configured identity
    ///
    /// A base58 secret takes precedence over the keypair file. Returns
    /// `Ok(None)` when neither is present; a present but unreadable identity
    /// is an error.
    pub fn discover(keypair_path: &str, base58_secret: Option<&str>) -> Result<Option<Self>> {
        if let Some(secret) = base58_secret.filter(|s| !s.trim().is_empty()) {
            return Self::from_base58(secret).map(Some);
        }
        let path = expand_home(keypair_path);
        if !path.exists() {
            return Ok(None);
        }
        Self::from_file(&path).map(Some)
    }

    /// Get the public key
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Get an Arc reference to the keypair
    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
