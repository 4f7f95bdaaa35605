//! Instruction payload codec
//!
//! Wire layout consumed by the on-chain coordination program:
//!
//! ```text
//! [u32 LE opcode] ([u8 len][len bytes UTF-8])*
//! ```
//!
//! One length-prefixed chunk per *present* field, always in the order
//! `node_id, task_id, ip_address, hardware_id, answer_data`. Absent fields
//! emit nothing; there is no presence marker. The encoder is opcode-agnostic,
//! see [`crate::tx_builder::Operation`] for the per-opcode field contract.

use crate::tx_builder::errors::EncodingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Largest value representable by the single length byte
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

/// Size of the opcode prefix
pub const OPCODE_LEN: usize = 4;

/// Named string fields, declared in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NodeId,
    TaskId,
    IpAddress,
    HardwareId,
    AnswerData,
}

impl Field {
    /// All fields in wire order
    pub const ALL: [Field; 5] = [
        Field::NodeId,
        Field::TaskId,
        Field::IpAddress,
        Field::HardwareId,
        Field::AnswerData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NodeId => "node_id",
            Field::TaskId => "task_id",
            Field::IpAddress => "ip_address",
            Field::HardwareId => "hardware_id",
            Field::AnswerData => "answer_data",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of optional string fields
///
/// A field counts as present only when it is `Some` and non-empty, which
/// mirrors the truthiness check of the deployed client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    pub node_id: Option<String>,
    pub task_id: Option<String>,
    pub ip_address: Option<String>,
    pub hardware_id: Option<String>,
    pub answer_data: Option<String>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::NodeId => &mut self.node_id,
            Field::TaskId => &mut self.task_id,
            Field::IpAddress => &mut self.ip_address,
            Field::HardwareId => &mut self.hardware_id,
            Field::AnswerData => &mut self.answer_data,
        };
        *slot = value;
    }

    /// Value of a field if present (non-empty)
    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::NodeId => &self.node_id,
            Field::TaskId => &self.task_id,
            Field::IpAddress => &self.ip_address,
            Field::HardwareId => &self.hardware_id,
            Field::AnswerData => &self.answer_data,
        };
        slot.as_deref().filter(|v| !v.is_empty())
    }

    /// Present fields in wire order
    pub fn present(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }
}

/// How to treat values longer than [`MAX_FIELD_LEN`] bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    /// Reject oversized values with [`EncodingError::FieldTooLong`]
    #[default]
    Strict,
    /// Byte-compatible with the deployed client: the length byte wraps
    /// (`len as u8`) and the full value is still written. The resulting
    /// payload is not decodable; use only for compatibility testing.
    Wrap,
}

/// Encode an opcode and field set, rejecting oversized fields
pub fn encode(opcode: u32, fields: &FieldSet) -> Result<Vec<u8>, EncodingError> {
    encode_with_policy(opcode, fields, LengthPolicy::Strict)
}

pub fn encode_with_policy(
    opcode: u32,
    fields: &FieldSet,
    policy: LengthPolicy,
) -> Result<Vec<u8>, EncodingError> {
    let capacity = OPCODE_LEN
        + Field::ALL
            .iter()
            .filter_map(|f| fields.get(*f))
            .map(|v| 1 + v.len())
            .sum::<usize>();
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(&opcode.to_le_bytes());

    for field in Field::ALL {
        let Some(value) = fields.get(field) else {
            continue;
        };
        let bytes = value.as_bytes();
        if bytes.len() > MAX_FIELD_LEN {
            match policy {
                LengthPolicy::Strict => {
                    return Err(EncodingError::FieldTooLong {
                        field,
                        len: bytes.len(),
                    })
                }
                LengthPolicy::Wrap => {
                    warn!(
                        field = %field,
                        len = bytes.len(),
                        wrapped = bytes.len() as u8,
                        "Field length exceeds 255 bytes, length prefix wraps"
                    );
                }
            }
        }
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }

    Ok(out)
}

/// Read the opcode prefix of a payload
pub fn decode_opcode(payload: &[u8]) -> Result<u32, EncodingError> {
    let prefix: [u8; OPCODE_LEN] = payload
        .get(..OPCODE_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| EncodingError::Truncated {
            what: "opcode".to_string(),
            needed: OPCODE_LEN,
            available: payload.len(),
        })?;
    Ok(u32::from_le_bytes(prefix))
}

/// Decode a payload given which fields are present
///
/// The layout carries no information on the wire, so the reader must know
/// it up front (usually from the opcode). Fields are always read in wire
/// order regardless of the order of `layout`.
pub fn decode(payload: &[u8], layout: &[Field]) -> Result<(u32, FieldSet), EncodingError> {
    let opcode = decode_opcode(payload)?;
    let mut cursor = OPCODE_LEN;
    let mut fields = FieldSet::new();

    for field in Field::ALL.into_iter().filter(|f| layout.contains(f)) {
        let len = *payload.get(cursor).ok_or_else(|| EncodingError::Truncated {
            what: format!("{} length", field),
            needed: 1,
            available: 0,
        })? as usize;
        cursor += 1;

        let available = payload.len() - cursor;
        if available < len {
            return Err(EncodingError::Truncated {
                what: field.to_string(),
                needed: len,
                available,
            });
        }
        let value = std::str::from_utf8(&payload[cursor..cursor + len])
            .map_err(|_| EncodingError::InvalidUtf8 { field })?;
        fields.set(field, Some(value.to_string()));
        cursor += len;
    }

    if cursor != payload.len() {
        return Err(EncodingError::TrailingBytes(payload.len() - cursor));
    }

    Ok((opcode, fields))
}
