//! Environment checks run before the first dispatch
//!
//! Missing identity or program id is fatal. A low balance only produces a
//! funding hint; the run continues and the network decides.

use crate::rpc_manager::LedgerRpc;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::DispatchError;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use tracing::info;

/// Outcome of a successful preflight
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub wallet: String,
    pub program_id: String,
    pub balance_lamports: u64,
    pub low_balance: bool,
}

pub async fn perform_checks(
    rpc: &dyn LedgerRpc,
    wallet: Option<Pubkey>,
    program_id: Option<Pubkey>,
    minimum_balance_lamports: u64,
    logger: &StructuredLogger,
) -> Result<PreflightReport, DispatchError> {
    let wallet = wallet.ok_or_else(DispatchError::missing_identity)?;

    let balance = rpc.balance(&wallet).await?;
    let low_balance = balance < minimum_balance_lamports;
    if low_balance {
        logger.log_funding_hint(&wallet, balance, minimum_balance_lamports);
    }

    let program_id = program_id.ok_or_else(DispatchError::missing_program_id)?;

    info!(
        context_id = logger.context_id(),
        wallet = %wallet,
        program_id = %program_id,
        balance_lamports = balance,
        "Preflight checks passed"
    );

    Ok(PreflightReport {
        wallet: wallet.to_string(),
        program_id: program_id.to_string(),
        balance_lamports: balance,
        low_balance,
    })
}
