//! Virtual machine error types.

use std::fmt;

/// Error raised by the loader or the executor.
///
/// The first error aborts the run; nothing is recovered locally.
#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    /// Unrecognized mnemonic or unparseable line (load time)
    UnknownInstruction { line: usize, text: String },
    /// Recognized mnemonic with a malformed operand list (load time)
    MalformedInstruction { line: usize, text: String },
    /// `GOTO`/`IF_FALSE` target never defined
    MissingLabel(String),
    /// An instruction needed more stack than was available
    StackUnderflow(&'static str),
    DivisionByZero,
    /// Read of a name with no value in memory
    UninitializedVariable(String),
    /// Operation applied to values it does not support
    TypeError(String),
    /// `CAST` to a type the machine cannot coerce to
    UnsupportedCast(String),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::UnknownInstruction { line, text } => {
                write!(f, "unknown instruction at line {}: '{}'", line, text)
            }
            VmError::MalformedInstruction { line, text } => {
                write!(f, "malformed instruction at line {}: '{}'", line, text)
            }
            VmError::MissingLabel(label) => write!(f, "jump target '{}' not found", label),
            VmError::StackUnderflow(opcode) => {
                write!(f, "stack underflow executing {}", opcode)
            }
            VmError::DivisionByZero => write!(f, "division by zero"),
            VmError::UninitializedVariable(name) => {
                write!(f, "uninitialized or unknown variable '{}'", name)
            }
            VmError::TypeError(message) => write!(f, "type error: {}", message),
            VmError::UnsupportedCast(target) => {
                write!(f, "unsupported cast target '{}'", target)
            }
        }
    }
}

impl std::error::Error for VmError {}
