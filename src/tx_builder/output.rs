//! Dispatch outputs: the one-shot pending transaction and the confirmation

use crate::rpc_manager::ConfirmationStatus;
use crate::tx_builder::instructions::Opcode;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use solana_sdk::{signature::Signature, transaction::Transaction};

/// A transaction built for exactly one dispatch
///
/// Consumed by submission; never reused across operations.
#[derive(Debug)]
pub struct PendingTransaction {
    pub opcode: Opcode,
    pub payload_len: usize,
    pub transaction: Transaction,
}

impl PendingTransaction {
    /// Signature that identifies this transaction once signed
    pub fn signature(&self) -> Signature {
        self.transaction.signatures.first().copied().unwrap_or_default()
    }
}

/// Terminal outcome of one dispatch
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    #[serde(serialize_with = "display")]
    pub signature: Signature,
    pub opcode: Opcode,
    #[serde(flatten)]
    pub status: ConfirmationStatus,
    pub payload_len: usize,
    pub elapsed_ms: u64,
    pub confirmed_at: DateTime<Utc>,
}

impl Confirmation {
    pub fn is_confirmed(&self) -> bool {
        self.status.is_confirmed()
    }
}

fn display<S: Serializer>(signature: &Signature, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_serializes_flat() {
        let confirmation = Confirmation {
            signature: Signature::default(),
            opcode: Opcode::StartSession,
            status: ConfirmationStatus::Confirmed { slot: 7 },
            payload_len: 8,
            elapsed_ms: 120,
            confirmed_at: Utc::now(),
        };

        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["opcode"], "start-session");
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["slot"], 7);
        assert_eq!(json["signature"], Signature::default().to_string());
    }
}
