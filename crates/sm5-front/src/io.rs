//! Input/output declarations.
//!
//! Each `dcl_input*` / `dcl_output*` defines a function argument or return member in
//! the [`FunctionSignature`] and records the effect that moves data between it and the
//! shader's register files.

use sm5_ir::{
    ComponentMask, Declaration, Instruction, InterpolationMode, Opcode, Operand, OperandIndex,
    OperandType, ShaderSignatures, ShaderStage, SignatureElement, SystemName,
};
use tracing::debug;

use crate::effect::{ComputeBuiltin, EpilogueEffect, PrelogueEffect};
use crate::error::{DecodeError, InstructionLocation};
use crate::signature::{
    AttributeType, DepthArgument, FunctionInput, FunctionOutput, FunctionSignature, Interpolation,
};

/// Whether `opcode` is handled by [`IoState::declare`].
pub fn is_io_declaration(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::DclInput
            | Opcode::DclInputSgv
            | Opcode::DclInputSiv
            | Opcode::DclInputPs
            | Opcode::DclInputPsSgv
            | Opcode::DclInputPsSiv
            | Opcode::DclOutput
            | Opcode::DclOutputSgv
            | Opcode::DclOutputSiv
    )
}

/// Signature and effects accumulated from IO declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoState {
    pub signature: FunctionSignature,
    pub prelogue: Vec<PrelogueEffect>,
    pub epilogue: Vec<EpilogueEffect>,
    /// One past the highest input register written by the prelogue.
    pub max_input_register: u32,
    /// One past the highest output register read by the epilogue.
    pub max_output_register: u32,
    depth_output: bool,
}

/// Per-declaration view of the request.
struct Decl<'a> {
    stage: ShaderStage,
    signatures: &'a ShaderSignatures,
    inst: &'a Instruction,
    location: InstructionLocation,
}

impl Decl<'_> {
    fn malformed(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::malformed(self.location, message)
    }

    fn unsupported(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::unsupported(self.location, message)
    }

    fn operand(&self) -> Result<&Operand, DecodeError> {
        self.inst
            .operand(0)
            .ok_or_else(|| {
                self.malformed(format!("{} has no declared operand", self.inst.opcode.name()))
            })
    }

    /// Register and mask of a 1-D `v#`/`o#` operand.
    fn register(&self) -> Result<(u32, ComponentMask), DecodeError> {
        let operand = self.operand()?;
        match operand.index {
            OperandIndex::D1(reg) => Ok((reg, operand.mask)),
            OperandIndex::D2(..) => Err(self.unsupported(format!(
                "{}: per-vertex (2-D) registers of hull/domain/geometry shaders",
                operand.ty
            ))),
            other => Err(self.malformed(format!(
                "{}: unexpected index dimension {:?}",
                operand.ty,
                other.dimension()
            ))),
        }
    }

    fn system_name(&self) -> Result<SystemName, DecodeError> {
        match self.inst.decl {
            Some(Declaration::InputSystemValue { name })
            | Some(Declaration::InputPsSystemValue { name, .. })
            | Some(Declaration::OutputSystemValue { name }) => Ok(name),
            _ => Err(self.malformed(format!(
                "{} is missing its system value",
                self.inst.opcode.name()
            ))),
        }
    }

    fn interpolation(&self) -> Result<Interpolation, DecodeError> {
        let mode = match self.inst.decl {
            Some(Declaration::InputPs { interpolation })
            | Some(Declaration::InputPsSystemValue { interpolation, .. }) => interpolation,
            _ => InterpolationMode::Undefined,
        };
        Interpolation::from_mode(mode)
            .ok_or_else(|| self.malformed(format!("invalid interpolation mode {mode}")))
    }

    fn input_element(
        &self,
        reg: u32,
        mask: ComponentMask,
    ) -> Result<&SignatureElement, DecodeError> {
        self.signatures
            .find_input(reg, mask)
            .ok_or_else(|| self.malformed(format!("v{reg} has no input signature element")))
    }

    fn output_element(
        &self,
        reg: u32,
        mask: ComponentMask,
    ) -> Result<&SignatureElement, DecodeError> {
        self.signatures
            .find_output(reg, mask)
            .ok_or_else(|| self.malformed(format!("o{reg} has no output signature element")))
    }

    fn require_stage(&self, stage: ShaderStage) -> Result<(), DecodeError> {
        if self.stage != stage {
            return Err(self.unsupported(format!(
                "{} is not valid in {:?} shaders",
                self.inst.opcode.name(),
                self.stage
            )));
        }
        Ok(())
    }
}

impl IoState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one IO declaration.
    pub fn declare(
        &mut self,
        stage: ShaderStage,
        signatures: &ShaderSignatures,
        inst: &Instruction,
        location: InstructionLocation,
    ) -> Result<(), DecodeError> {
        let decl = Decl {
            stage,
            signatures,
            inst,
            location,
        };
        match inst.opcode {
            Opcode::DclInput => self.declare_input(&decl),
            Opcode::DclInputSgv => self.declare_input_sgv(&decl),
            Opcode::DclInputSiv => Err(decl.unsupported(
                "dcl_input_siv (hull/domain/geometry system values)",
            )),
            Opcode::DclInputPs => {
                decl.require_stage(ShaderStage::Pixel)?;
                self.declare_input_ps(&decl)
            }
            Opcode::DclInputPsSiv => {
                decl.require_stage(ShaderStage::Pixel)?;
                self.declare_input_ps_siv(&decl)
            }
            Opcode::DclInputPsSgv => {
                decl.require_stage(ShaderStage::Pixel)?;
                self.declare_input_ps_sgv(&decl)
            }
            Opcode::DclOutput => self.declare_output(&decl),
            Opcode::DclOutputSiv => self.declare_output_siv(&decl),
            Opcode::DclOutputSgv => {
                Err(decl.unsupported("dcl_output_sgv (geometry shader outputs)"))
            }
            other => Err(decl.malformed(format!("{} is not an IO declaration", other.name()))),
        }
    }

    fn init_input(
        &mut self,
        decl: &Decl<'_>,
        input: FunctionInput,
        reg: u32,
        mask: ComponentMask,
    ) -> Result<(), DecodeError> {
        self.touch_input(decl, reg)?;
        let argument = self.signature.define_input(input);
        self.prelogue.push(PrelogueEffect::InitInputRegister {
            argument,
            register: reg,
            mask,
        });
        Ok(())
    }

    fn touch_input(&mut self, decl: &Decl<'_>, reg: u32) -> Result<(), DecodeError> {
        let end = register_end(decl, reg)?;
        self.max_input_register = self.max_input_register.max(end);
        Ok(())
    }

    fn pop_output(
        &mut self,
        decl: &Decl<'_>,
        output: FunctionOutput,
        reg: u32,
        mask: ComponentMask,
    ) -> Result<(), DecodeError> {
        let end = register_end(decl, reg)?;
        let output = self.signature.define_output(output);
        self.epilogue.push(EpilogueEffect::PopOutputRegister {
            register: reg,
            mask,
            output,
        });
        self.max_output_register = self.max_output_register.max(end);
        Ok(())
    }

    fn bind_builtin(
        &mut self,
        decl: &Decl<'_>,
        builtin: ComputeBuiltin,
        input: FunctionInput,
    ) -> Result<(), DecodeError> {
        decl.require_stage(ShaderStage::Compute)?;
        let argument = self.signature.define_input(input);
        self.prelogue
            .push(PrelogueEffect::BindComputeBuiltin { argument, builtin });
        Ok(())
    }

    fn declare_input(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let ty = decl.operand()?.ty;
        match ty {
            OperandType::InputThreadId => self.bind_builtin(
                decl,
                ComputeBuiltin::ThreadPositionInGrid,
                FunctionInput::ThreadPositionInGrid,
            ),
            OperandType::InputThreadGroupId => self.bind_builtin(
                decl,
                ComputeBuiltin::ThreadgroupPositionInGrid,
                FunctionInput::ThreadgroupPositionInGrid,
            ),
            OperandType::InputThreadIdInGroup => self.bind_builtin(
                decl,
                ComputeBuiltin::ThreadPositionInThreadgroup,
                FunctionInput::ThreadPositionInThreadgroup,
            ),
            OperandType::InputThreadIdInGroupFlattened => self.bind_builtin(
                decl,
                ComputeBuiltin::ThreadIndexInThreadgroup,
                FunctionInput::ThreadIndexInThreadgroup,
            ),
            OperandType::CycleCounter => {
                debug!("ignoring vCycleCounter declaration");
                Ok(())
            }
            OperandType::InputCoverageMask | OperandType::InnerCoverage => {
                Err(decl.unsupported(format!("{ty} input")))
            }
            OperandType::InputDomainPoint
            | OperandType::OutputControlPointId
            | OperandType::InputPrimitiveId
            | OperandType::InputForkInstanceId
            | OperandType::InputJoinInstanceId
            | OperandType::InputGsInstanceId => Err(decl.unsupported(format!(
                "{ty} input (hull/domain/geometry shaders)"
            ))),
            OperandType::Input => {
                let (reg, mask) = decl.register()?;
                if decl.stage != ShaderStage::Vertex {
                    return Err(decl.unsupported(format!(
                        "dcl_input v{reg} in {:?} shaders",
                        decl.stage
                    )));
                }
                let element = decl.input_element(reg, mask)?;
                let input = FunctionInput::VertexStageIn {
                    attribute: reg,
                    ty: AttributeType::from_component_type(element.component_type),
                    name: element.full_semantic(),
                };
                self.init_input(decl, input, reg, mask)?;
                Ok(())
            }
            other => Err(decl.malformed(format!("dcl_input of unexpected register type {other}"))),
        }
    }

    fn declare_input_sgv(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let (reg, mask) = decl.register()?;
        let name = decl.system_name()?;
        match name {
            SystemName::VertexId | SystemName::InstanceId => {
                decl.require_stage(ShaderStage::Vertex)?;
                self.touch_input(decl, reg)?;
                let (value, base) = if name == SystemName::VertexId {
                    (FunctionInput::VertexId, FunctionInput::BaseVertex)
                } else {
                    (FunctionInput::InstanceId, FunctionInput::BaseInstance)
                };
                let value = self.signature.define_input(value);
                let base = self.signature.define_input(base);
                self.prelogue.push(PrelogueEffect::StoreRelativeId {
                    value,
                    base,
                    register: reg,
                    mask,
                });
            }
            SystemName::SampleIndex => {
                self.init_input(decl, FunctionInput::SampleIndex, reg, mask)?
            }
            SystemName::PrimitiveId => {
                self.init_input(decl, FunctionInput::PrimitiveId, reg, mask)?
            }
            SystemName::IsFrontFace => {
                self.init_input(decl, FunctionInput::FrontFacing, reg, mask)?
            }
            other => return Err(decl.unsupported(format!("input system value {other}"))),
        }
        Ok(())
    }

    fn declare_input_ps(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let (reg, mask) = decl.register()?;
        let interpolation = decl.interpolation()?;
        let element = decl.input_element(reg, mask)?;
        let input = FunctionInput::FragmentStageIn {
            name: element.full_semantic(),
            ty: AttributeType::from_component_type(element.component_type),
            interpolation,
        };
        self.init_input(decl, input, reg, mask)?;
        Ok(())
    }

    fn declare_input_ps_siv(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let (reg, mask) = decl.register()?;
        let interpolation = decl.interpolation()?;
        let input = match decl.system_name()? {
            SystemName::Position => {
                if interpolation.is_perspective() {
                    return Err(decl.unsupported(format!(
                        "{interpolation:?} interpolation of the fragment position"
                    )));
                }
                FunctionInput::Position { interpolation }
            }
            SystemName::RenderTargetArrayIndex => {
                require_flat(decl, interpolation)?;
                FunctionInput::RenderTargetArrayIndex
            }
            SystemName::ViewportArrayIndex => {
                require_flat(decl, interpolation)?;
                FunctionInput::ViewportArrayIndex
            }
            other => return Err(decl.unsupported(format!("pixel input system value {other}"))),
        };
        self.init_input(decl, input, reg, mask)?;
        Ok(())
    }

    fn declare_input_ps_sgv(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let (reg, mask) = decl.register()?;
        let interpolation = decl.interpolation()?;
        let input = match decl.system_name()? {
            SystemName::IsFrontFace => FunctionInput::FrontFacing,
            SystemName::SampleIndex => FunctionInput::SampleIndex,
            other => return Err(decl.unsupported(format!("pixel input system value {other}"))),
        };
        require_flat(decl, interpolation)?;
        self.init_input(decl, input, reg, mask)?;
        Ok(())
    }

    fn declare_output(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let ty = decl.operand()?.ty;
        let argument = match ty {
            OperandType::OutputDepth => Some(DepthArgument::Any),
            OperandType::OutputDepthGreaterEqual => Some(DepthArgument::Greater),
            OperandType::OutputDepthLessEqual => Some(DepthArgument::Less),
            _ => None,
        };
        if let Some(argument) = argument {
            decl.require_stage(ShaderStage::Pixel)?;
            if self.depth_output {
                return Err(decl.malformed("depth output is declared twice"));
            }
            self.depth_output = true;
            self.prelogue.push(PrelogueEffect::AllocateDepthOutput);
            let output = self.signature.define_output(FunctionOutput::Depth { argument });
            self.epilogue.push(EpilogueEffect::PopDepthOutput { output });
            return Ok(());
        }

        match ty {
            OperandType::OutputStencilRef | OperandType::OutputCoverageMask => {
                Err(decl.unsupported(format!("{ty} output")))
            }
            OperandType::Output => {
                let (reg, mask) = decl.register()?;
                let element = decl.output_element(reg, mask)?;
                let attr = AttributeType::from_component_type(element.component_type);
                let output = match decl.stage {
                    ShaderStage::Pixel => FunctionOutput::RenderTarget {
                        index: reg,
                        ty: attr,
                    },
                    ShaderStage::Vertex => FunctionOutput::Vertex {
                        name: element.full_semantic(),
                        ty: attr,
                    },
                    other => {
                        return Err(
                            decl.unsupported(format!("o{reg} is not valid in {other:?} shaders"))
                        )
                    }
                };
                self.pop_output(decl, output, reg, mask)?;
                Ok(())
            }
            other => Err(decl.malformed(format!("dcl_output of unexpected register type {other}"))),
        }
    }

    fn declare_output_siv(&mut self, decl: &Decl<'_>) -> Result<(), DecodeError> {
        let (reg, mask) = decl.register()?;
        match decl.system_name()? {
            SystemName::Position => {
                decl.require_stage(ShaderStage::Vertex)?;
                self.pop_output(decl, FunctionOutput::Position, reg, mask)?;
                Ok(())
            }
            other => Err(decl.unsupported(format!("output system value {other}"))),
        }
    }
}

/// One past `reg`, for the max register counters.
fn register_end(decl: &Decl<'_>, reg: u32) -> Result<u32, DecodeError> {
    reg.checked_add(1)
        .ok_or_else(|| decl.malformed(format!("register index {reg} is out of range")))
}

fn require_flat(decl: &Decl<'_>, interpolation: Interpolation) -> Result<(), DecodeError> {
    if interpolation != Interpolation::Flat {
        return Err(decl.malformed(format!(
            "integer system value declared with {interpolation:?} interpolation"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sm5_ir::{RegisterComponentType, SignatureElement};

    fn v(reg: u32, mask: ComponentMask) -> Operand {
        Operand::register(OperandType::Input, OperandIndex::D1(reg)).with_mask(mask)
    }

    fn o(reg: u32, mask: ComponentMask) -> Operand {
        Operand::register(OperandType::Output, OperandIndex::D1(reg)).with_mask(mask)
    }

    fn declare(
        io: &mut IoState,
        stage: ShaderStage,
        sigs: &ShaderSignatures,
        inst: Instruction,
    ) -> Result<(), DecodeError> {
        io.declare(stage, sigs, &inst, InstructionLocation::default())
    }

    #[test]
    fn vertex_id_defines_two_arguments() {
        let mut io = IoState::new();
        let inst = Instruction::declaration(
            Opcode::DclInputSgv,
            v(2, ComponentMask::X),
            Declaration::InputSystemValue {
                name: SystemName::VertexId,
            },
        );
        declare(&mut io, ShaderStage::Vertex, &ShaderSignatures::default(), inst).unwrap();

        assert_eq!(
            io.signature.inputs(),
            &[FunctionInput::VertexId, FunctionInput::BaseVertex]
        );
        assert_eq!(
            io.prelogue,
            vec![PrelogueEffect::StoreRelativeId {
                value: 0,
                base: 1,
                register: 2,
                mask: ComponentMask::X,
            }]
        );
        assert_eq!(io.max_input_register, 3);
    }

    #[test]
    fn stage_in_attribute_uses_signature_type() {
        let sigs = ShaderSignatures {
            inputs: vec![SignatureElement::new("BLENDINDICES", 0, 1, ComponentMask::XYZW)
                .with_component_type(RegisterComponentType::Uint32)],
            outputs: Vec::new(),
        };
        let mut io = IoState::new();
        let inst = Instruction::declaration(
            Opcode::DclInput,
            v(1, ComponentMask::XYZW),
            Declaration::Input,
        );
        declare(&mut io, ShaderStage::Vertex, &sigs, inst).unwrap();
        assert_eq!(
            io.signature.inputs(),
            &[FunctionInput::VertexStageIn {
                attribute: 1,
                ty: AttributeType::Int4,
                name: "BLENDINDICES0".into(),
            }]
        );
    }

    #[test]
    fn missing_signature_element_is_malformed() {
        let mut io = IoState::new();
        let inst = Instruction::declaration(
            Opcode::DclInput,
            v(0, ComponentMask::XYZW),
            Declaration::Input,
        );
        let sigs = ShaderSignatures::default();
        let err = declare(&mut io, ShaderStage::Vertex, &sigs, inst).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn second_depth_output_is_malformed() {
        let mut io = IoState::new();
        let depth = || {
            Instruction::declaration(
                Opcode::DclOutput,
                Operand::special(OperandType::OutputDepthLessEqual),
                Declaration::Output,
            )
        };
        let sigs = ShaderSignatures::default();
        declare(&mut io, ShaderStage::Pixel, &sigs, depth()).unwrap();
        assert_eq!(
            io.signature.outputs(),
            &[FunctionOutput::Depth {
                argument: DepthArgument::Less
            }]
        );
        assert_eq!(io.prelogue, vec![PrelogueEffect::AllocateDepthOutput]);
        assert_eq!(io.epilogue, vec![EpilogueEffect::PopDepthOutput { output: 0 }]);

        assert!(declare(&mut io, ShaderStage::Pixel, &sigs, depth())
            .unwrap_err()
            .is_malformed());
    }

    #[test]
    fn pixel_outputs_are_render_targets() {
        let sigs = ShaderSignatures {
            inputs: Vec::new(),
            outputs: vec![SignatureElement::new("SV_Target", 1, 1, ComponentMask::XYZW)],
        };
        let mut io = IoState::new();
        let inst = Instruction::declaration(
            Opcode::DclOutput,
            o(1, ComponentMask::XYZW),
            Declaration::Output,
        );
        declare(&mut io, ShaderStage::Pixel, &sigs, inst).unwrap();
        assert_eq!(
            io.signature.outputs(),
            &[FunctionOutput::RenderTarget {
                index: 1,
                ty: AttributeType::Float4,
            }]
        );
        assert_eq!(io.max_output_register, 2);
    }

    #[test]
    fn thread_ids_bind_builtins() {
        let mut io = IoState::new();
        let inst = Instruction::declaration(
            Opcode::DclInput,
            Operand::special(OperandType::InputThreadIdInGroupFlattened),
            Declaration::Input,
        );
        let sigs = ShaderSignatures::default();
        declare(&mut io, ShaderStage::Compute, &sigs, inst.clone()).unwrap();
        assert_eq!(
            io.prelogue,
            vec![PrelogueEffect::BindComputeBuiltin {
                argument: 0,
                builtin: ComputeBuiltin::ThreadIndexInThreadgroup,
            }]
        );
        assert_eq!(io.max_input_register, 0);

        let mut io = IoState::new();
        assert!(declare(&mut io, ShaderStage::Vertex, &sigs, inst)
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn last_register_index_is_malformed() {
        let mut io = IoState::new();
        let front_face = Instruction::declaration(
            Opcode::DclInputSgv,
            v(u32::MAX, ComponentMask::X),
            Declaration::InputSystemValue {
                name: SystemName::IsFrontFace,
            },
        );
        let sigs = ShaderSignatures::default();
        let err = declare(&mut io, ShaderStage::Pixel, &sigs, front_face).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(err.message(), "register index 4294967295 is out of range");
        assert!(io.prelogue.is_empty());
        assert_eq!(io.max_input_register, 0);
    }

    #[test]
    fn unsupported_declarations() {
        let sigs = ShaderSignatures::default();
        let mut io = IoState::new();
        let clip = Instruction::declaration(
            Opcode::DclOutputSiv,
            o(2, ComponentMask::X),
            Declaration::OutputSystemValue {
                name: SystemName::ClipDistance,
            },
        );
        assert!(declare(&mut io, ShaderStage::Vertex, &sigs, clip)
            .unwrap_err()
            .is_unsupported());

        let coverage = Instruction::declaration(
            Opcode::DclInput,
            Operand::special(OperandType::InputCoverageMask),
            Declaration::Input,
        );
        assert!(declare(&mut io, ShaderStage::Pixel, &sigs, coverage)
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn position_input_requires_no_perspective() {
        let mut io = IoState::new();
        let inst = |interpolation| {
            Instruction::declaration(
                Opcode::DclInputPsSiv,
                v(0, ComponentMask::XYZW),
                Declaration::InputPsSystemValue {
                    name: SystemName::Position,
                    interpolation,
                },
            )
        };
        let sigs = ShaderSignatures::default();
        let no_perspective = inst(InterpolationMode::LinearNoPerspective);
        declare(&mut io, ShaderStage::Pixel, &sigs, no_perspective).unwrap();
        assert_eq!(
            io.signature.inputs(),
            &[FunctionInput::Position {
                interpolation: Interpolation::CenterNoPerspective
            }]
        );
        assert!(declare(&mut io, ShaderStage::Pixel, &sigs, inst(InterpolationMode::Linear))
            .unwrap_err()
            .is_unsupported());
    }
}
