use std::fmt;

use sm5_ir::Instruction;
use thiserror::Error;

/// Position of an instruction in the decoded program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructionLocation {
    /// Index into [`ShaderProgram::instructions`](sm5_ir::ShaderProgram::instructions).
    pub instruction_index: usize,
    /// DWORD offset of the opcode token, as reported by the decoder.
    pub at_dword: usize,
}

impl InstructionLocation {
    pub fn of(instruction_index: usize, inst: &Instruction) -> Self {
        Self {
            instruction_index,
            at_dword: inst.at_dword,
        }
    }
}

impl fmt::Display for InstructionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instruction {} (dword {})",
            self.instruction_index, self.at_dword
        )
    }
}

/// Failure to turn a decoded program into a CFG and binding model.
///
/// The first error aborts the request; no partial result is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The program violates the token format or its own structure (unbalanced control
    /// flow, bad declaration payloads, references to undeclared registers, ...).
    #[error("malformed shader at {location}: {message}")]
    Malformed {
        location: InstructionLocation,
        message: String,
    },
    /// The program is well formed but uses something this front end does not handle.
    #[error("unsupported shader at {location}: {message}")]
    Unsupported {
        location: InstructionLocation,
        message: String,
    },
}

impl DecodeError {
    pub fn malformed(location: InstructionLocation, message: impl Into<String>) -> Self {
        Self::Malformed {
            location,
            message: message.into(),
        }
    }

    pub fn unsupported(location: InstructionLocation, message: impl Into<String>) -> Self {
        Self::Unsupported {
            location,
            message: message.into(),
        }
    }

    pub fn location(&self) -> InstructionLocation {
        match self {
            Self::Malformed { location, .. } | Self::Unsupported { location, .. } => *location,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Malformed { message, .. } | Self::Unsupported { message, .. } => message,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Failure while replaying prelogue/epilogue effects against a [`FunctionContext`].
///
/// [`FunctionContext`]: crate::effect::FunctionContext
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("function argument {0} is not defined")]
    MissingArgument(u32),
    #[error("depth output slot is allocated twice")]
    DepthSlotReallocated,
    #[error("depth output read before its slot was allocated")]
    DepthSlotUnallocated,
    #[error("epilogue writes an output of a function that returns nothing")]
    VoidReturn,
    #[error("{0}")]
    Context(String),
}
