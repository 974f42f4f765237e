//! Wire codec for the game's legacy packet dialect.
//!
//! Every application message is a text frame carrying a JSON array whose
//! first element is a numeric-string opcode and whose remaining elements
//! are positional arguments. Inbound and outbound opcode namespaces are
//! disjoint; see the tables on [`crate::protocol::inbound`] and
//! [`crate::protocol::outbound`].

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("frame is not a JSON array")]
    NotAnArray,
    #[error("frame is missing an opcode element")]
    MissingOpcode,
    #[error("opcode element is not a string")]
    OpcodeNotString,
    #[error("opcode {0:?} is not composed entirely of ASCII digits")]
    OpcodeNotNumeric(String),
}

/// A decoded inbound/outbound frame: an opcode and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub opcode: String,
    pub args: Vec<Value>,
}

impl Frame {
    pub fn new(opcode: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            opcode: opcode.into(),
            args,
        }
    }

    /// Positional argument by index, or `Value::Null` if absent.
    pub fn arg(&self, index: usize) -> &Value {
        self.args.get(index).unwrap_or(&Value::Null)
    }
}

/// Decode a text frame into its opcode and positional arguments.
///
/// Unknown opcodes decode successfully — the codec has no notion of a
/// routing table. Callers (the dispatcher) are responsible for logging and
/// dropping opcodes they don't recognize.
pub fn decode(frame: &str) -> Result<Frame, CodecError> {
    let value: Value = serde_json::from_str(frame)?;
    let Value::Array(mut elements) = value else {
        return Err(CodecError::NotAnArray);
    };
    if elements.is_empty() {
        return Err(CodecError::MissingOpcode);
    }
    let opcode_value = elements.remove(0);
    let Value::String(opcode) = opcode_value else {
        return Err(CodecError::OpcodeNotString);
    };
    if opcode.is_empty() || !opcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::OpcodeNotNumeric(opcode));
    }
    Ok(Frame {
        opcode,
        args: elements,
    })
}

/// Encode an opcode and its positional arguments into a text frame.
///
/// The opcode is always written as a JSON string, never a raw number —
/// this is load-bearing: unmodified clients expect the numeric-string
/// framing, not integers (see design note in SPEC_FULL.md §9).
pub fn encode(opcode: &str, args: impl IntoIterator<Item = Value>) -> String {
    let mut elements = Vec::new();
    elements.push(Value::String(opcode.to_string()));
    elements.extend(args);
    // A `Vec<Value>` always serializes; the only failure mode for
    // `serde_json::to_string` is a non-string map key or an unrepresentable
    // float, neither of which this construction can produce.
    serde_json::to_string(&Value::Array(elements)).expect("frame array always serializes")
}
