//! Error types for instruction encoding and transaction dispatch
//!
//! Two layers:
//! - [`EncodingError`]: pure payload problems (oversized fields, wrong field
//!   set for an opcode, malformed payloads on decode)
//! - [`DispatchError`]: everything that can go wrong between a typed operation
//!   and a confirmed transaction

use crate::rpc_manager::RpcManagerError;
use crate::tx_builder::encoding::Field;
use solana_sdk::signature::Signature;
use thiserror::Error;

/// Errors raised while encoding or decoding an instruction payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A field value does not fit behind a single length byte
    #[error("Field {field} is {len} bytes, maximum is 255")]
    FieldTooLong {
        /// Offending field
        field: Field,
        /// UTF-8 byte length of the value
        len: usize,
    },

    /// A field required by the opcode was absent or empty
    #[error("Opcode {opcode} requires field {field}")]
    MissingField { opcode: u32, field: Field },

    /// A field not accepted by the opcode was supplied
    #[error("Opcode {opcode} does not accept field {field}")]
    UnexpectedField { opcode: u32, field: Field },

    /// Opcode outside the program's instruction set
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u32),

    /// Payload ended before the expected bytes
    #[error("Payload truncated while reading {what}: need {needed} bytes, {available} available")]
    Truncated {
        what: String,
        needed: usize,
        available: usize,
    },

    /// A field's bytes were not valid UTF-8
    #[error("Field {field} is not valid UTF-8")]
    InvalidUtf8 { field: Field },

    /// Bytes left over after every expected field was read
    #[error("{0} trailing bytes after last field")]
    TrailingBytes(usize),
}

/// Comprehensive error type for a single dispatch
///
/// Covers the lifecycle encode → build → sign → submit → confirm. None of
/// these are retried by the client; a failure halts the running sequence.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Missing signing identity, missing program id, or invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The operation could not be turned into a payload
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The signer refused or failed to sign
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The network (or the local size check) rejected the raw transaction
    #[error("Submission rejected (opcode={opcode}): {reason}")]
    Submission { opcode: u32, reason: String },

    /// The blockhash validity window elapsed before confirmation
    #[error("Confirmation failed for {signature}: {reason}")]
    Confirmation { signature: Signature, reason: String },

    /// Failed to fetch the blockhash snapshot
    #[error("Blockhash error: {0}")]
    Blockhash(String),

    /// Any other RPC failure
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcManagerError),
}

impl DispatchError {
    /// Whether an operator could reasonably resubmit after this error
    ///
    /// Informational only: the client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Blockhash(_) => true,
            Self::Confirmation { .. } => true,
            Self::Rpc(err) => err.is_retryable(),

            Self::Configuration(_) => false,
            Self::Encoding(_) => false,
            Self::Signing(_) => false,
            Self::Submission { .. } => false,
        }
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "config",
            Self::Encoding(_) => "encoding",
            Self::Signing(_) => "signing",
            Self::Submission { .. } => "submission",
            Self::Confirmation { .. } => "confirmation",
            Self::Blockhash(_) => "blockhash",
            Self::Rpc(_) => "rpc",
        }
    }
}

// Convenience constructors
impl DispatchError {
    pub fn missing_identity() -> Self {
        Self::Configuration("No signing identity configured".to_string())
    }

    pub fn missing_program_id() -> Self {
        Self::Configuration(
            "No deployed program id available; build and deploy the program first".to_string(),
        )
    }

    pub fn submission(opcode: u32, reason: impl Into<String>) -> Self {
        Self::Submission {
            opcode,
            reason: reason.into(),
        }
    }

    pub fn expired(signature: Signature) -> Self {
        Self::Confirmation {
            signature,
            reason: "blockhash validity window elapsed before confirmation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EncodingError::FieldTooLong {
            field: Field::AnswerData,
            len: 300,
        };
        assert_eq!(err.to_string(), "Field answer_data is 300 bytes, maximum is 255");

        let err = DispatchError::submission(2, "invalid signature");
        assert_eq!(
            err.to_string(),
            "Submission rejected (opcode=2): invalid signature"
        );
    }

    #[test]
    fn test_encoding_error_converts() {
        let err: DispatchError = EncodingError::UnknownOpcode(9).into();
        assert!(matches!(err, DispatchError::Encoding(EncodingError::UnknownOpcode(9))));
        assert_eq!(err.category(), "encoding");
    }

    #[test]
    fn test_retryability() {
        assert!(DispatchError::expired(Signature::default()).is_retryable());
        assert!(DispatchError::Blockhash("stale".to_string()).is_retryable());

        assert!(!DispatchError::missing_identity().is_retryable());
        assert!(!DispatchError::submission(0, "bad").is_retryable());
        assert!(!DispatchError::Signing("locked".to_string()).is_retryable());
    }

    #[test]
    fn test_categories() {
        assert_eq!(DispatchError::missing_program_id().category(), "config");
        assert_eq!(DispatchError::expired(Signature::default()).category(), "confirmation");
        assert_eq!(
            DispatchError::Rpc(RpcManagerError::TimedOut { endpoint: "x".to_string() }).category(),
            "rpc"
        );
    }
}
