//! Structured logging for dispatch events

use crate::tx_builder::{Confirmation, DispatchError, Operation};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use uuid::Uuid;

const EXPLORER_URL: &str = "https://explorer.solana.com";
const FAUCET_URL: &str = "https://faucet.solana.com";

/// Structured logger carrying a per-run context id
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            context_id: Uuid::new_v4().to_string(),
            cluster: cluster.into(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Explorer link for a transaction on the configured cluster
    pub fn explorer_url(&self, signature: &Signature) -> String {
        format!("{}/tx/{}?cluster={}", EXPLORER_URL, signature, self.cluster)
    }

    pub fn faucet_url(&self, wallet: &Pubkey) -> String {
        format!("{}/?walletAddress={}&amount=1", FAUCET_URL, wallet)
    }

    pub fn log_dispatch_attempt(&self, operation: &Operation, payload_len: usize) {
        tracing::info!(
            context_id = %self.context_id,
            operation = operation.name(),
            opcode = operation.opcode().as_u32(),
            node_id = operation.node_id(),
            payload_len,
            "Dispatching operation"
        );
    }

    pub fn log_submitted(&self, operation: &Operation, signature: &Signature) {
        tracing::info!(
            context_id = %self.context_id,
            operation = operation.name(),
            signature = %signature,
            "Transaction sent"
        );
    }

    pub fn log_confirmed(&self, confirmation: &Confirmation) {
        if confirmation.is_confirmed() {
            tracing::info!(
                context_id = %self.context_id,
                operation = confirmation.opcode.name(),
                signature = %confirmation.signature,
                slot = confirmation.status.slot(),
                elapsed_ms = confirmation.elapsed_ms,
                explorer = %self.explorer_url(&confirmation.signature),
                "Transaction confirmed"
            );
        } else {
            tracing::warn!(
                context_id = %self.context_id,
                operation = confirmation.opcode.name(),
                signature = %confirmation.signature,
                status = ?confirmation.status,
                explorer = %self.explorer_url(&confirmation.signature),
                "Transaction landed with an execution error"
            );
        }
    }

    pub fn log_dispatch_failure(&self, operation: &Operation, error: &DispatchError) {
        tracing::error!(
            context_id = %self.context_id,
            operation = operation.name(),
            category = error.category(),
            error = %error,
            "Dispatch failed"
        );
    }

    pub fn log_funding_hint(&self, wallet: &Pubkey, balance: u64, minimum: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            wallet = %wallet,
            balance_lamports = balance,
            minimum_lamports = minimum,
            faucet = %self.faucet_url(wallet),
            "Balance is low, request funds from the faucet"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_url() {
        let logger = StructuredLogger::new("devnet");
        let sig = Signature::default();
        assert_eq!(
            logger.explorer_url(&sig),
            format!("https://explorer.solana.com/tx/{}?cluster=devnet", sig)
        );
    }

    #[test]
    fn test_context_ids_are_unique() {
        let a = StructuredLogger::new("devnet");
        let b = StructuredLogger::new("devnet");
        assert_ne!(a.context_id(), b.context_id());
    }
}
