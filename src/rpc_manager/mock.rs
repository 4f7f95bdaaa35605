//! In-memory ledger for tests and dry runs

use super::{BlockhashSnapshot, ConfirmationStatus, LedgerRpc, RpcManagerError, RpcResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction};

/// How the mock answers `confirm_transaction`
#[derive(Debug, Clone)]
pub enum MockConfirmation {
    Confirmed,
    Failed(String),
    Expired,
}

/// Mock ledger recording every submitted transaction
pub struct MockLedgerRpc {
    snapshot: BlockhashSnapshot,
    balance: u64,
    reject_with: Option<String>,
    confirmation: MockConfirmation,
    slot: u64,
    sent: Mutex<Vec<Transaction>>,
}

impl MockLedgerRpc {
    pub fn new() -> Self {
        Self {
            snapshot: BlockhashSnapshot {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
            },
            balance: 2_000_000_000,
            reject_with: None,
            confirmation: MockConfirmation::Confirmed,
            slot: 42,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_balance(mut self, lamports: u64) -> Self {
        self.balance = lamports;
        self
    }

    /// Reject every submission with this message
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject_with = Some(reason.into());
        self
    }

    pub fn with_confirmation(mut self, confirmation: MockConfirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn snapshot(&self) -> BlockhashSnapshot {
        self.snapshot
    }

    /// Transactions accepted so far, in submission order
    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().clone()
    }
}

impl Default for MockLedgerRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerRpc for MockLedgerRpc {
    fn endpoint(&self) -> &str {
        "mock://ledger"
    }

    async fn latest_blockhash(&self) -> RpcResult<BlockhashSnapshot> {
        Ok(self.snapshot)
    }

    async fn balance(&self, _pubkey: &Pubkey) -> RpcResult<u64> {
        Ok(self.balance)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature> {
        if let Some(reason) = &self.reject_with {
            return Err(RpcManagerError::Rejected {
                endpoint: self.endpoint().to_string(),
                message: reason.clone(),
                code: Some(-32002),
            });
        }
        let signature = transaction
            .signatures
            .first()
            .copied()
            .unwrap_or_default();
        self.sent.lock().push(transaction.clone());
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _snapshot: &BlockhashSnapshot,
    ) -> RpcResult<ConfirmationStatus> {
        match &self.confirmation {
            MockConfirmation::Confirmed => Ok(ConfirmationStatus::Confirmed { slot: self.slot }),
            MockConfirmation::Failed(reason) => Ok(ConfirmationStatus::Failed {
                slot: self.slot,
                reason: reason.clone(),
            }),
            MockConfirmation::Expired => Err(RpcManagerError::TransactionExpired {
                endpoint: self.endpoint().to_string(),
            }),
        }
    }
}
