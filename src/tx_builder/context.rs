//! Execution context for dispatching transactions
//!
//! Everything a dispatch needs besides the operation itself: the RPC handle,
//! the signer, the target program and the blockhash snapshot. The context is
//! built once per run and never mutated afterwards, so it is shared through
//! an `Arc` without locking.

use crate::rpc_manager::{BlockhashSnapshot, LedgerRpc};
use crate::signer::SignerService;
use crate::tx_builder::errors::DispatchError;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::info;

/// Immutable network/session context threaded into every dispatch
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use task_coordinator_client::rpc_manager::MockLedgerRpc;
/// # use task_coordinator_client::signer::MockSigner;
/// # use task_coordinator_client::tx_builder::DispatchContext;
/// # use solana_sdk::pubkey::Pubkey;
/// # async fn example() -> Result<(), task_coordinator_client::tx_builder::DispatchError> {
/// let context = DispatchContext::capture(
///     Arc::new(MockLedgerRpc::new()),
///     Arc::new(MockSigner::new()),
///     Pubkey::new_unique(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DispatchContext {
    rpc: Arc<dyn LedgerRpc>,
    signer: Arc<dyn SignerService>,
    program_id: Pubkey,
    snapshot: BlockhashSnapshot,
}

impl DispatchContext {
    /// Build a context around an already captured snapshot
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        signer: Arc<dyn SignerService>,
        program_id: Pubkey,
        snapshot: BlockhashSnapshot,
    ) -> Self {
        Self {
            rpc,
            signer,
            program_id,
            snapshot,
        }
    }

    /// Capture the blockhash snapshot once and build the context
    pub async fn capture(
        rpc: Arc<dyn LedgerRpc>,
        signer: Arc<dyn SignerService>,
        program_id: Pubkey,
    ) -> Result<Self, DispatchError> {
        let snapshot = rpc
            .latest_blockhash()
            .await
            .map_err(|e| DispatchError::Blockhash(e.to_string()))?;

        info!(
            blockhash = %snapshot.blockhash,
            last_valid_block_height = snapshot.last_valid_block_height,
            endpoint = rpc.endpoint(),
            "Captured blockhash snapshot"
        );

        Ok(Self::new(rpc, signer, program_id, snapshot))
    }

    pub fn rpc(&self) -> &dyn LedgerRpc {
        self.rpc.as_ref()
    }

    pub fn signer(&self) -> &dyn SignerService {
        self.signer.as_ref()
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn snapshot(&self) -> &BlockhashSnapshot {
        &self.snapshot
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("endpoint", &self.rpc.endpoint())
            .field("signer", &self.signer.pubkey())
            .field("program_id", &self.program_id)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_manager::MockLedgerRpc;
    use crate::signer::{LocalSigner, MockSigner};
    use solana_sdk::signature::{Keypair, Signer};

    #[tokio::test]
    async fn test_capture_uses_rpc_snapshot() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let expected = rpc.snapshot();
        let program_id = Pubkey::new_unique();

        let context = DispatchContext::capture(rpc, Arc::new(MockSigner::new()), program_id)
            .await
            .unwrap();

        assert_eq!(context.snapshot(), &expected);
        assert_eq!(context.program_id(), program_id);
    }

    #[tokio::test]
    async fn test_debug_omits_secrets() {
        let keypair = Arc::new(Keypair::new());
        let secret_b58 = bs58::encode(keypair.to_bytes()).into_string();
        let secret_bytes = format!("{:?}", &keypair.to_bytes()[..32]);
        let signer = Arc::new(LocalSigner::new(Arc::clone(&keypair)));
        let context = DispatchContext::capture(Arc::new(MockLedgerRpc::new()), signer, Pubkey::new_unique())
            .await
            .unwrap();

        let debug = format!("{:?}", context);
        assert!(debug.contains(&keypair.pubkey().to_string()));
        assert!(debug.contains("mock://ledger"));
        assert!(!debug.contains(&secret_b58));
        assert!(!debug.contains(&secret_bytes));
    }
}
