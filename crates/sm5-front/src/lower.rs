use sm5_ir::Instruction;

use crate::error::{DecodeError, InstructionLocation};
use crate::shader_info::ShaderInfo;

/// Per-instruction lowering, provided by the code generator.
///
/// Called once for every non-declaration, non-control-flow instruction, in program
/// order, after all declarations that precede it have been resolved. The result is
/// appended to the block that is current at that point.
pub trait InstructionLowering {
    type Lowered;

    fn lower(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        info: &ShaderInfo,
    ) -> Result<Self::Lowered, DecodeError>;
}

/// Keeps instructions as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl InstructionLowering for Passthrough {
    type Lowered = Instruction;

    fn lower(
        &mut self,
        inst: &Instruction,
        _location: InstructionLocation,
        _info: &ShaderInfo,
    ) -> Result<Instruction, DecodeError> {
        Ok(inst.clone())
    }
}

impl<F, L> InstructionLowering for F
where
    F: FnMut(&Instruction, InstructionLocation, &ShaderInfo) -> Result<L, DecodeError>,
{
    type Lowered = L;

    fn lower(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        info: &ShaderInfo,
    ) -> Result<L, DecodeError> {
        self(inst, location, info)
    }
}
