//! Core dispatcher
//!
//! [`TxDispatcher`] turns one [`Operation`] into one confirmed transaction:
//! encode → build → sign → size check → submit → confirm. There is no retry
//! and no batching; every call stands alone and shares only the read-only
//! [`DispatchContext`].

use crate::metrics::{metrics, Timer};
use crate::rpc_manager::RpcManagerError;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::context::DispatchContext;
use crate::tx_builder::errors::DispatchError;
use crate::tx_builder::instructions::{build_instruction, Operation};
use crate::tx_builder::output::{Confirmation, PendingTransaction};
use async_trait::async_trait;
use chrono::Utc;
use solana_sdk::{message::Message, packet::PACKET_DATA_SIZE, transaction::Transaction};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Anything able to carry an operation to the ledger
///
/// The session runner depends on this seam rather than on [`TxDispatcher`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, operation: &Operation) -> Result<Confirmation, DispatchError>;
}

pub struct TxDispatcher {
    context: Arc<DispatchContext>,
    logger: StructuredLogger,
}

impl TxDispatcher {
    pub fn new(context: Arc<DispatchContext>, logger: StructuredLogger) -> Self {
        Self { context, logger }
    }

    /// Encode the operation and wrap it in an unsigned transaction
    pub fn build(&self, operation: &Operation) -> Result<PendingTransaction, DispatchError> {
        let timer = Timer::new();
        let payload = operation.encode()?;
        let payload_len = payload.len();

        let signer = self.context.signer().pubkey();
        let instruction = build_instruction(self.context.program_id(), signer, payload);
        let message = Message::new_with_blockhash(
            &[instruction],
            Some(&signer),
            &self.context.snapshot().blockhash,
        );
        timer.observe_duration(&metrics().build_latency);

        Ok(PendingTransaction {
            opcode: operation.opcode(),
            payload_len,
            transaction: Transaction::new_unsigned(message),
        })
    }

    async fn sign(&self, pending: &mut PendingTransaction) -> Result<(), DispatchError> {
        self.context
            .signer()
            .sign_transaction(&mut pending.transaction)
            .await
            .map_err(|e| DispatchError::Signing(e.to_string()))
    }

    /// Reject transactions that would not fit in a single packet
    fn check_wire_size(pending: &PendingTransaction) -> Result<(), DispatchError> {
        let wire = bincode::serialize(&pending.transaction)
            .map_err(|e| DispatchError::submission(pending.opcode.as_u32(), e.to_string()))?;
        if wire.len() > PACKET_DATA_SIZE {
            return Err(DispatchError::submission(
                pending.opcode.as_u32(),
                format!(
                    "serialized transaction is {} bytes, limit is {}",
                    wire.len(),
                    PACKET_DATA_SIZE
                ),
            ));
        }
        Ok(())
    }

    async fn run(&self, operation: &Operation) -> Result<Confirmation, DispatchError> {
        let started = Instant::now();
        let mut pending = self.build(operation)?;
        self.logger.log_dispatch_attempt(operation, pending.payload_len);
        metrics().payload_bytes.observe(pending.payload_len as f64);

        self.sign(&mut pending).await?;
        debug!(signature = %pending.signature(), "Transaction signed");
        Self::check_wire_size(&pending)?;

        let opcode = pending.opcode.as_u32();
        let rpc = self.context.rpc();

        let submit_timer = Timer::new();
        let signature = rpc
            .send_transaction(&pending.transaction)
            .await
            .map_err(|e| DispatchError::submission(opcode, e.to_string()))?;
        submit_timer.observe_duration(&metrics().submit_latency);
        self.logger.log_submitted(operation, &signature);

        let confirm_timer = Timer::new();
        let status = rpc
            .confirm_transaction(&signature, self.context.snapshot())
            .await
            .map_err(|e| match e {
                RpcManagerError::TransactionExpired { .. } => DispatchError::expired(signature),
                other => DispatchError::Rpc(other),
            })?;
        confirm_timer.observe_duration(&metrics().confirm_latency);

        let confirmation = Confirmation {
            signature,
            opcode: pending.opcode,
            status,
            payload_len: pending.payload_len,
            elapsed_ms: started.elapsed().as_millis() as u64,
            confirmed_at: Utc::now(),
        };
        self.logger.log_confirmed(&confirmation);
        Ok(confirmation)
    }
}

#[async_trait]
impl Dispatcher for TxDispatcher {
    async fn dispatch(&self, operation: &Operation) -> Result<Confirmation, DispatchError> {
        let m = metrics();
        m.dispatch_total.inc();

        let result = self.run(operation).await;
        match &result {
            Ok(confirmation) if confirmation.is_confirmed() => m.dispatch_success.inc(),
            Ok(_) => m.dispatch_failed.inc(),
            Err(err) => {
                m.dispatch_failed.inc();
                self.logger.log_dispatch_failure(operation, err);
            }
        }
        debug!(operation = operation.name(), ok = result.is_ok(), "Dispatch finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_manager::{mock::MockConfirmation, ConfirmationStatus, MockLedgerRpc};
    use crate::signer::{MockSigner, SignerService};
    use solana_sdk::{pubkey::Pubkey, signature::Signature};

    fn register() -> Operation {
        Operation::RegisterNode {
            node_id: "123".to_string(),
            ip_address: "192.168.1.1".to_string(),
            hardware_id: "hw_001".to_string(),
        }
    }

    async fn dispatcher_with(rpc: Arc<MockLedgerRpc>) -> (TxDispatcher, Pubkey, Pubkey) {
        let signer = Arc::new(MockSigner::new());
        let signer_pubkey = signer.pubkey();
        let program_id = Pubkey::new_unique();
        let context = DispatchContext::capture(rpc, signer, program_id)
            .await
            .unwrap();
        (
            TxDispatcher::new(Arc::new(context), StructuredLogger::new("devnet")),
            signer_pubkey,
            program_id,
        )
    }

    #[tokio::test]
    async fn test_dispatch_submits_single_instruction() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let (dispatcher, signer, program_id) = dispatcher_with(rpc.clone()).await;

        let confirmation = dispatcher.dispatch(&register()).await.unwrap();
        assert!(confirmation.is_confirmed());
        assert_eq!(confirmation.status, ConfirmationStatus::Confirmed { slot: 42 });

        let sent = rpc.sent();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert!(tx.verify().is_ok());
        assert_eq!(tx.signatures[0], confirmation.signature);
        assert_eq!(tx.message.recent_blockhash, rpc.snapshot().blockhash);
        assert_eq!(tx.message.instructions.len(), 1);

        let ix = &tx.message.instructions[0];
        assert_eq!(tx.message.account_keys[ix.program_id_index as usize], program_id);
        assert_eq!(ix.accounts.len(), 1);
        let account_index = ix.accounts[0] as usize;
        assert_eq!(tx.message.account_keys[account_index], signer);
        assert!(tx.message.is_signer(account_index));
        assert!(tx.message.is_maybe_writable(account_index, None));
        assert_eq!(ix.data, register().encode().unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_rejected_submission() {
        let rpc = Arc::new(MockLedgerRpc::new().rejecting("invalid signature"));
        let (dispatcher, _, _) = dispatcher_with(rpc.clone()).await;

        let err = dispatcher.dispatch(&register()).await.unwrap_err();
        match err {
            DispatchError::Submission { opcode, reason } => {
                assert_eq!(opcode, 0);
                assert!(reason.contains("invalid signature"));
            }
            other => panic!("expected submission error, got {other:?}"),
        }
        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_expired_confirmation() {
        let rpc = Arc::new(MockLedgerRpc::new().with_confirmation(MockConfirmation::Expired));
        let (dispatcher, _, _) = dispatcher_with(rpc).await;

        let err = dispatcher.dispatch(&register()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Confirmation { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_failed_on_chain() {
        let rpc = Arc::new(
            MockLedgerRpc::new()
                .with_confirmation(MockConfirmation::Failed("invalid instruction data".to_string())),
        );
        let (dispatcher, _, _) = dispatcher_with(rpc).await;

        let confirmation = dispatcher.dispatch(&register()).await.unwrap();
        assert!(!confirmation.is_confirmed());
    }

    #[tokio::test]
    async fn test_dispatch_signing_failure() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let context = DispatchContext::capture(
            rpc.clone(),
            Arc::new(MockSigner::new_failing()),
            Pubkey::new_unique(),
        )
        .await
        .unwrap();
        let dispatcher = TxDispatcher::new(Arc::new(context), StructuredLogger::new("devnet"));

        let err = dispatcher.dispatch(&register()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Signing(_)));
        assert!(rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_largest_operation_fits_in_packet() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let (dispatcher, _, _) = dispatcher_with(rpc.clone()).await;

        let big = "x".repeat(255);
        let op = Operation::ReturnAnswer {
            node_id: big.clone(),
            task_id: big.clone(),
            answer_data: big,
        };
        let pending = dispatcher.build(&op).unwrap();
        assert_eq!(pending.payload_len, 4 + 3 * 256);

        assert!(dispatcher.dispatch(&op).await.is_ok());
        assert_eq!(rpc.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_signature_set_by_signing() {
        let (dispatcher, _, _) = dispatcher_with(Arc::new(MockLedgerRpc::new())).await;

        let mut pending = dispatcher.build(&register()).unwrap();
        assert_eq!(pending.signature(), Signature::default());

        dispatcher.sign(&mut pending).await.unwrap();
        assert_ne!(pending.signature(), Signature::default());
        assert_eq!(pending.signature(), pending.transaction.signatures[0]);
    }

    #[tokio::test]
    async fn test_encoding_error_short_circuits() {
        let rpc = Arc::new(MockLedgerRpc::new());
        let (dispatcher, _, _) = dispatcher_with(rpc.clone()).await;

        let op = Operation::RemoveNode {
            node_id: "n".repeat(256),
        };
        let err = dispatcher.dispatch(&op).await.unwrap_err();
        assert!(matches!(err, DispatchError::Encoding(_)));
        assert!(rpc.sent().is_empty());
    }
}
