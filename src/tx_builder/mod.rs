//! Instruction encoding and transaction dispatch
//!
//! ## Architecture
//!
//! - **encoding**: the bit-exact payload codec (`[u32 LE opcode]([u8 len][bytes])*`)
//! - **instructions**: typed [`Operation`]s and the single program instruction
//! - **errors**: [`EncodingError`] and [`DispatchError`]
//! - **context**: the immutable [`DispatchContext`] (RPC, signer, program id,
//!   blockhash snapshot)
//! - **output**: [`PendingTransaction`] and [`Confirmation`]
//! - **builder**: [`TxDispatcher`], encode → sign → submit → confirm
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use task_coordinator_client::structured_logging::StructuredLogger;
//! use task_coordinator_client::tx_builder::{DispatchContext, Dispatcher, Operation, TxDispatcher};
//! # use task_coordinator_client::rpc_manager::MockLedgerRpc;
//! # use task_coordinator_client::signer::MockSigner;
//! # use solana_sdk::pubkey::Pubkey;
//!
//! # async fn example() -> Result<(), task_coordinator_client::tx_builder::DispatchError> {
//! # let (rpc, signer, program_id) = (Arc::new(MockLedgerRpc::new()), Arc::new(MockSigner::new()), Pubkey::new_unique());
//! let context = DispatchContext::capture(rpc, signer, program_id).await?;
//! let dispatcher = TxDispatcher::new(Arc::new(context), StructuredLogger::new("devnet"));
//!
//! let confirmation = dispatcher
//!     .dispatch(&Operation::StartSession { node_id: "123".to_string() })
//!     .await?;
//! println!("{}", confirmation.signature);
//! # Ok(())
//! # }
//! ```

pub mod encoding;
pub mod errors;
pub mod instructions;

mod builder;
mod context;
mod output;

pub use builder::{Dispatcher, TxDispatcher};
pub use context::DispatchContext;
pub use encoding::{decode, encode, encode_with_policy, Field, FieldSet, LengthPolicy};
pub use errors::{DispatchError, EncodingError};
pub use instructions::{build_instruction, Opcode, Operation};
pub use output::{Confirmation, PendingTransaction};
