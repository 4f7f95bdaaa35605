//! Typed operations and instruction construction
//!
//! The coordination program accepts six instructions. [`Operation`] gives
//! each one a variant carrying exactly the fields it reads, so a payload
//! built from an `Operation` can never carry a missing or extraneous field.
//! The raw [`encode`] path stays available for wire compatibility work.

use crate::tx_builder::encoding::{self, encode, Field, FieldSet};
use crate::tx_builder::errors::EncodingError;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::fmt;
use std::str::FromStr;

/// Instruction discriminator, written as the 4-byte LE payload prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum Opcode {
    RegisterNode = 0,
    RemoveNode = 1,
    DispatchTask = 2,
    ReturnAnswer = 3,
    StartSession = 4,
    EndSession = 5,
}

impl Opcode {
    pub const ALL: [Opcode; 6] = [
        Opcode::RegisterNode,
        Opcode::RemoveNode,
        Opcode::DispatchTask,
        Opcode::ReturnAnswer,
        Opcode::StartSession,
        Opcode::EndSession,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::RegisterNode => "register-node",
            Opcode::RemoveNode => "remove-node",
            Opcode::DispatchTask => "dispatch-task",
            Opcode::ReturnAnswer => "return-answer",
            Opcode::StartSession => "start-session",
            Opcode::EndSession => "end-session",
        }
    }

    /// Fields this opcode reads, in wire order. All of them are required.
    pub fn layout(self) -> &'static [Field] {
        match self {
            Opcode::RegisterNode => &[Field::NodeId, Field::IpAddress, Field::HardwareId],
            Opcode::DispatchTask => &[Field::NodeId, Field::TaskId],
            Opcode::ReturnAnswer => &[Field::NodeId, Field::TaskId, Field::AnswerData],
            Opcode::RemoveNode | Opcode::StartSession | Opcode::EndSession => &[Field::NodeId],
        }
    }
}

impl TryFrom<u32> for Opcode {
    type Error = EncodingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.as_u32() == value)
            .ok_or(EncodingError::UnknownOpcode(value))
    }
}

impl FromStr for Opcode {
    type Err = String;

    /// Accepts the kebab-case name or the numeric discriminator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u32>() {
            return Opcode::try_from(n).map_err(|e| e.to_string());
        }
        let wanted = s.to_ascii_lowercase().replace('_', "-");
        Opcode::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| format!("Unknown operation '{}'", s))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u32())
    }
}

/// One program operation with exactly the fields it accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    RegisterNode {
        node_id: String,
        ip_address: String,
        hardware_id: String,
    },
    RemoveNode {
        node_id: String,
    },
    DispatchTask {
        node_id: String,
        task_id: String,
    },
    ReturnAnswer {
        node_id: String,
        task_id: String,
        answer_data: String,
    },
    StartSession {
        node_id: String,
    },
    EndSession {
        node_id: String,
    },
}

impl Operation {
    pub fn opcode(&self) -> Opcode {
        match self {
            Operation::RegisterNode { .. } => Opcode::RegisterNode,
            Operation::RemoveNode { .. } => Opcode::RemoveNode,
            Operation::DispatchTask { .. } => Opcode::DispatchTask,
            Operation::ReturnAnswer { .. } => Opcode::ReturnAnswer,
            Operation::StartSession { .. } => Opcode::StartSession,
            Operation::EndSession { .. } => Opcode::EndSession,
        }
    }

    pub fn name(&self) -> &'static str {
        self.opcode().name()
    }

    pub fn node_id(&self) -> &str {
        match self {
            Operation::RegisterNode { node_id, .. }
            | Operation::RemoveNode { node_id }
            | Operation::DispatchTask { node_id, .. }
            | Operation::ReturnAnswer { node_id, .. }
            | Operation::StartSession { node_id }
            | Operation::EndSession { node_id } => node_id,
        }
    }

    /// Flatten into the opcode-agnostic field set
    pub fn fields(&self) -> FieldSet {
        let set = FieldSet::new().with(Field::NodeId, self.node_id());
        match self {
            Operation::RegisterNode {
                ip_address,
                hardware_id,
                ..
            } => set
                .with(Field::IpAddress, ip_address.as_str())
                .with(Field::HardwareId, hardware_id.as_str()),
            Operation::DispatchTask { task_id, .. } => set.with(Field::TaskId, task_id.as_str()),
            Operation::ReturnAnswer {
                task_id,
                answer_data,
                ..
            } => set
                .with(Field::TaskId, task_id.as_str())
                .with(Field::AnswerData, answer_data.as_str()),
            Operation::RemoveNode { .. }
            | Operation::StartSession { .. }
            | Operation::EndSession { .. } => set,
        }
    }

    /// Build an operation from loose fields, enforcing the opcode's layout
    pub fn from_fields(opcode: Opcode, fields: &FieldSet) -> Result<Self, EncodingError> {
        let layout = opcode.layout();
        for field in fields.present() {
            if !layout.contains(&field) {
                return Err(EncodingError::UnexpectedField {
                    opcode: opcode.as_u32(),
                    field,
                });
            }
        }
        let take = |field: Field| -> Result<String, EncodingError> {
            fields
                .get(field)
                .map(str::to_string)
                .ok_or(EncodingError::MissingField {
                    opcode: opcode.as_u32(),
                    field,
                })
        };

        Ok(match opcode {
            Opcode::RegisterNode => Operation::RegisterNode {
                node_id: take(Field::NodeId)?,
                ip_address: take(Field::IpAddress)?,
                hardware_id: take(Field::HardwareId)?,
            },
            Opcode::RemoveNode => Operation::RemoveNode {
                node_id: take(Field::NodeId)?,
            },
            Opcode::DispatchTask => Operation::DispatchTask {
                node_id: take(Field::NodeId)?,
                task_id: take(Field::TaskId)?,
            },
            Opcode::ReturnAnswer => Operation::ReturnAnswer {
                node_id: take(Field::NodeId)?,
                task_id: take(Field::TaskId)?,
                answer_data: take(Field::AnswerData)?,
            },
            Opcode::StartSession => Operation::StartSession {
                node_id: take(Field::NodeId)?,
            },
            Opcode::EndSession => Operation::EndSession {
                node_id: take(Field::NodeId)?,
            },
        })
    }

    /// Encode into the instruction payload
    ///
    /// Oversized fields are rejected, and so are empty ones: an empty value
    /// would be omitted from the wire and shift every field after it.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let opcode = self.opcode();
        let fields = self.fields();
        if let Some(&field) = opcode.layout().iter().find(|f| fields.get(**f).is_none()) {
            return Err(EncodingError::MissingField {
                opcode: opcode.as_u32(),
                field,
            });
        }
        encode(opcode.as_u32(), &fields)
    }

    /// Decode a payload using the layout implied by its opcode
    pub fn decode(payload: &[u8]) -> Result<Self, EncodingError> {
        let opcode = Opcode::try_from(encoding::decode_opcode(payload)?)?;
        let (_, fields) = encoding::decode(payload, opcode.layout())?;
        Self::from_fields(opcode, &fields)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} node_id={}", self.name(), self.node_id())
    }
}

/// Wrap a payload in the program's single instruction
///
/// The only account is the signer, marked signer + writable.
pub fn build_instruction(program_id: Pubkey, signer: Pubkey, payload: Vec<u8>) -> Instruction {
    Instruction {
        program_id,
        accounts: vec![AccountMeta::new(signer, true)],
        data: payload,
    }
}
