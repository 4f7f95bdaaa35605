//! Sequential driver for a list of operations
//!
//! Each operation is fully confirmed before the next one is encoded. The
//! first failure stops the run; nothing after it is attempted.

use crate::config::SessionConfig;
use crate::rpc_manager::ConfirmationStatus;
use crate::tx_builder::{Confirmation, DispatchError, Dispatcher, Operation};
use thiserror::Error;
use tracing::{info, warn};

/// Why a sequence stopped early
#[derive(Error, Debug)]
pub enum SequenceError {
    /// The dispatch itself failed
    #[error("Step {index} ({operation}) failed: {source}")]
    Dispatch {
        index: usize,
        operation: &'static str,
        #[source]
        source: DispatchError,
        completed: Vec<Confirmation>,
    },

    /// The transaction landed but the program rejected it
    #[error("Step {index} ({operation}) landed with an error: {reason}")]
    Rejected {
        index: usize,
        operation: &'static str,
        reason: String,
        completed: Vec<Confirmation>,
    },
}

impl SequenceError {
    /// Confirmations obtained before the failing step
    pub fn completed(&self) -> &[Confirmation] {
        match self {
            SequenceError::Dispatch { completed, .. } | SequenceError::Rejected { completed, .. } => {
                completed
            }
        }
    }

    pub fn index(&self) -> usize {
        match self {
            SequenceError::Dispatch { index, .. } | SequenceError::Rejected { index, .. } => *index,
        }
    }
}

/// The full node lifecycle: register, remove, dispatch, answer, start, end
pub fn scripted_session(session: &SessionConfig) -> Vec<Operation> {
    vec![
        Operation::RegisterNode {
            node_id: session.node_id.clone(),
            ip_address: session.ip_address.clone(),
            hardware_id: session.hardware_id.clone(),
        },
        Operation::RemoveNode {
            node_id: session.node_id.clone(),
        },
        Operation::DispatchTask {
            node_id: session.node_id.clone(),
            task_id: session.task_id.clone(),
        },
        Operation::ReturnAnswer {
            node_id: session.node_id.clone(),
            task_id: session.task_id.clone(),
            answer_data: session.answer_data.clone(),
        },
        Operation::StartSession {
            node_id: session.node_id.clone(),
        },
        Operation::EndSession {
            node_id: session.node_id.clone(),
        },
    ]
}

/// Dispatch `operations` strictly in order, halting on the first failure
pub async fn run_sequence(
    dispatcher: &dyn Dispatcher,
    operations: &[Operation],
) -> Result<Vec<Confirmation>, SequenceError> {
    let mut completed = Vec::with_capacity(operations.len());

    for (index, operation) in operations.iter().enumerate() {
        info!(step = index, total = operations.len(), operation = %operation, "Running step");

        let confirmation = match dispatcher.dispatch(operation).await {
            Ok(confirmation) => confirmation,
            Err(source) => {
                warn!(step = index, skipped = operations.len() - index - 1, "Halting sequence");
                return Err(SequenceError::Dispatch {
                    index,
                    operation: operation.name(),
                    source,
                    completed,
                });
            }
        };

        if let ConfirmationStatus::Failed { reason, .. } = &confirmation.status {
            warn!(step = index, skipped = operations.len() - index - 1, "Halting sequence");
            return Err(SequenceError::Rejected {
                index,
                operation: operation.name(),
                reason: reason.clone(),
                completed,
            });
        }
        completed.push(confirmation);
    }

    Ok(completed)
}
