//! RPC Manager Module
//!
//! The ledger network boundary: the four queries the client needs, behind
//! an async trait so the dispatcher can run against a live cluster or an
//! in-memory mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

// Submodules
pub mod mock;
pub mod rpc_errors;
pub mod solana_rpc;

// Re-exports for convenience
pub use mock::MockLedgerRpc;
pub use rpc_errors::RpcManagerError;
pub use solana_rpc::SolanaRpc;

pub type RpcResult<T> = std::result::Result<T, RpcManagerError>;

/// Recent blockhash plus the last block height at which it is accepted
///
/// Captured once per run and shared read-only by every dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockhashSnapshot {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Terminal status of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Reached the configured commitment without an execution error
    Confirmed { slot: u64 },
    /// Landed on-chain but the program (or runtime) returned an error
    Failed { slot: u64, reason: String },
}

impl ConfirmationStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed { .. })
    }

    pub fn slot(&self) -> u64 {
        match self {
            ConfirmationStatus::Confirmed { slot } | ConfirmationStatus::Failed { slot, .. } => {
                *slot
            }
        }
    }
}

/// Trait for the ledger operations used by preflight and dispatch
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Endpoint label used in logs and errors
    fn endpoint(&self) -> &str;

    /// Fetch a fresh blockhash snapshot
    async fn latest_blockhash(&self) -> RpcResult<BlockhashSnapshot>;

    /// Balance of an account in lamports
    async fn balance(&self, pubkey: &Pubkey) -> RpcResult<u64>;

    /// Submit a signed transaction, returning its signature
    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature>;

    /// Block until the signature is confirmed, fails on-chain, or the
    /// snapshot's validity window elapses (`TransactionExpired`)
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        snapshot: &BlockhashSnapshot,
    ) -> RpcResult<ConfirmationStatus>;
}
