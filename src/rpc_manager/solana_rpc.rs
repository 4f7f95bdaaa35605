//! `LedgerRpc` over the Solana JSON-RPC nonblocking client

use super::{BlockhashSnapshot, ConfirmationStatus, LedgerRpc, RpcManagerError, RpcResult};
use crate::config::RpcConfig;
use crate::metrics::{metrics, Timer};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::TransactionStatus;
use std::time::Duration;
use tracing::{debug, trace};

pub struct SolanaRpc {
    client: RpcClient,
    url: String,
    commitment: CommitmentConfig,
    poll_interval: Duration,
}

impl SolanaRpc {
    pub fn new(url: String, timeout: Duration, commitment: CommitmentConfig, poll_interval: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(url.clone(), timeout, commitment);
        Self {
            client,
            url,
            commitment,
            poll_interval,
        }
    }

    pub fn from_config(config: &RpcConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.commitment_config()?,
            Duration::from_millis(config.poll_interval_ms),
        ))
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> RpcManagerError {
        RpcManagerError::from_client_error(err, &self.url)
    }

    /// Map a signature status onto a terminal outcome, if it has one yet
    fn terminal_status(&self, status: TransactionStatus) -> Option<ConfirmationStatus> {
        if let Some(err) = &status.err {
            return Some(ConfirmationStatus::Failed {
                slot: status.slot,
                reason: err.to_string(),
            });
        }
        status
            .satisfies_commitment(self.commitment)
            .then_some(ConfirmationStatus::Confirmed { slot: status.slot })
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn latest_blockhash(&self) -> RpcResult<BlockhashSnapshot> {
        let timer = Timer::new();
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        timer.observe_duration(&metrics().rpc_latency);

        Ok(BlockhashSnapshot {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn balance(&self, pubkey: &Pubkey) -> RpcResult<u64> {
        self.client
            .get_balance_with_commitment(pubkey, self.commitment)
            .await
            .map(|response| response.value)
            .map_err(|e| self.map_err(e))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> RpcResult<Signature> {
        let config = RpcSendTransactionConfig {
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        let timer = Timer::new();
        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| self.map_err(e))?;
        timer.observe_duration(&metrics().rpc_latency);
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        snapshot: &BlockhashSnapshot,
    ) -> RpcResult<ConfirmationStatus> {
        loop {
            let statuses = self
                .client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| self.map_err(e))?;

            if let Some(status) = statuses.value.into_iter().next().flatten() {
                trace!(signature = %signature, slot = status.slot, "Signature status received");
                if let Some(outcome) = self.terminal_status(status) {
                    return Ok(outcome);
                }
            }

            let block_height = self
                .client
                .get_block_height()
                .await
                .map_err(|e| self.map_err(e))?;
            if block_height > snapshot.last_valid_block_height {
                debug!(
                    signature = %signature,
                    block_height,
                    last_valid_block_height = snapshot.last_valid_block_height,
                    "Blockhash validity window elapsed"
                );
                return Err(RpcManagerError::TransactionExpired {
                    endpoint: self.url.clone(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
