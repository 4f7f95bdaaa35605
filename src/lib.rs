//! Task Coordinator Client Library
//!
//! Encodes node/task coordination operations into the program's binary
//! instruction format and dispatches each one as a signed, confirmed Solana
//! transaction.

pub mod config;
pub mod metrics;
pub mod preflight;
pub mod rpc_manager;
pub mod session;
pub mod signer;
pub mod structured_logging;
pub mod tx_builder;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::{Confirmation, DispatchError, EncodingError, Opcode, Operation};
