use sm5_ir::{Opcode, ShaderModel, ShaderProgram, ShaderSignatures, ShaderStage};
use tracing::debug;

use crate::binding_table::{assemble, BindingTable, ShaderReflection};
use crate::builder::CfgBuilder;
use crate::cfg::Cfg;
use crate::effect::{EpilogueEffect, PrelogueEffect};
use crate::error::{DecodeError, InstructionLocation};
use crate::io::{is_io_declaration, IoState};
use crate::lower::InstructionLowering;
use crate::resolve::{is_resource_declaration, resolve};
use crate::shader_info::ShaderInfo;
use crate::signature::{FunctionInput, FunctionSignature, ARGUMENT_BUFFER_BIND_INDEX};
use crate::usage::track_usage;

/// Deepest `if`/`loop`/`switch` nesting accepted by default.
pub const DEFAULT_MAX_CONTROL_FLOW_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub max_control_flow_nesting: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_control_flow_nesting: DEFAULT_MAX_CONTROL_FLOW_NESTING,
        }
    }
}

/// Everything produced for one program.
#[derive(Debug, Clone)]
pub struct CompiledShader<L> {
    pub stage: ShaderStage,
    pub model: ShaderModel,
    pub cfg: Cfg<L>,
    pub info: ShaderInfo,
    pub signature: FunctionSignature,
    pub prelogue: Vec<PrelogueEffect>,
    pub epilogue: Vec<EpilogueEffect>,
    pub max_input_register: u32,
    pub max_output_register: u32,
    pub threadgroup_size: Option<[u32; 3]>,
    pub binding_table: BindingTable,
    /// Argument index of [`FunctionInput::BindingTable`], when the table is non-empty.
    pub binding_table_argument: Option<u32>,
}

impl<L> CompiledShader<L> {
    pub fn reflection(&self) -> ShaderReflection {
        ShaderReflection::new(&self.binding_table, self.threadgroup_size)
    }
}

/// Opcodes of stages and features this front end does not translate.
fn is_stage_foreign(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Emit
            | Opcode::Cut
            | Opcode::EmitThenCut
            | Opcode::EmitStream
            | Opcode::CutStream
            | Opcode::EmitThenCutStream
            | Opcode::HsDecls
            | Opcode::HsControlPointPhase
            | Opcode::HsForkPhase
            | Opcode::HsJoinPhase
            | Opcode::Label
            | Opcode::Call
            | Opcode::Callc
            | Opcode::InterfaceCall
            | Opcode::DclStream
            | Opcode::DclFunctionBody
            | Opcode::DclFunctionTable
            | Opcode::DclInterface
            | Opcode::DclGsOutputPrimitiveTopology
            | Opcode::DclGsInputPrimitive
            | Opcode::DclMaxOutputVertexCount
            | Opcode::DclGsInstanceCount
            | Opcode::DclInputControlPointCount
            | Opcode::DclOutputControlPointCount
            | Opcode::DclTessDomain
            | Opcode::DclTessPartitioning
            | Opcode::DclTessOutputPrimitive
            | Opcode::DclHsMaxTessFactor
            | Opcode::DclHsForkPhaseInstanceCount
            | Opcode::DclHsJoinPhaseInstanceCount
    )
}

/// Builds the CFG, binding model and effect lists of `program` in one pass.
///
/// `signatures` supplies the types and semantic names of stage-in/stage-out attributes.
/// Ordinary instructions are handed to `lowering` in program order.
pub fn compile<Lw: InstructionLowering>(
    program: &ShaderProgram,
    signatures: &ShaderSignatures,
    lowering: &mut Lw,
    options: &CompileOptions,
) -> Result<CompiledShader<Lw::Lowered>, DecodeError> {
    let stage = program.stage;
    if !matches!(
        stage,
        ShaderStage::Vertex | ShaderStage::Pixel | ShaderStage::Compute
    ) {
        return Err(DecodeError::unsupported(
            InstructionLocation::default(),
            format!("{stage:?} shaders"),
        ));
    }

    let mut builder = CfgBuilder::new(options.max_control_flow_nesting);
    let mut info = ShaderInfo::new();
    let mut io = IoState::new();

    for (index, inst) in program.instructions.iter().enumerate() {
        if builder.is_returned() {
            debug!(
                remaining = program.instructions.len() - index,
                "ignoring instructions after the final ret"
            );
            break;
        }
        let location = InstructionLocation::of(index, inst);
        match inst.opcode {
            Opcode::Nop => {}
            op if is_resource_declaration(op) => resolve(&mut info, stage, inst, location)?,
            op if is_io_declaration(op) => io.declare(stage, signatures, inst, location)?,
            op if is_stage_foreign(op) => {
                return Err(DecodeError::unsupported(location, op.name()));
            }
            op if op.is_control_flow() => builder.control_flow(inst, location, stage)?,
            Opcode::Unknown(raw) => {
                return Err(DecodeError::malformed(
                    location,
                    format!("unknown opcode {raw}"),
                ));
            }
            _ => {
                track_usage(&mut info, inst, location)?;
                let lowered = lowering.lower(inst, location, &info)?;
                builder.append(lowered);
            }
        }
    }

    let end = InstructionLocation {
        instruction_index: program.instructions.len(),
        at_dword: program.instructions.last().map_or(0, |inst| inst.at_dword),
    };
    let cfg = builder.finish(end)?;

    let threadgroup_size = match (stage, info.thread_group_size) {
        (ShaderStage::Compute, None) => {
            return Err(DecodeError::malformed(
                end,
                "compute shader without dcl_thread_group",
            ));
        }
        (ShaderStage::Compute, size) => size,
        _ => None,
    };

    let binding_table = assemble(&info);
    let mut signature = io.signature;
    let binding_table_argument = binding_table.bind_index().map(|location| {
        debug_assert_eq!(location, ARGUMENT_BUFFER_BIND_INDEX);
        signature.define_input(FunctionInput::BindingTable { location })
    });

    debug!(
        ?stage,
        blocks = cfg.len(),
        bindings = binding_table.len(),
        inputs = signature.inputs().len(),
        outputs = signature.outputs().len(),
        "compiled shader"
    );

    Ok(CompiledShader {
        stage,
        model: program.model,
        cfg,
        info,
        signature,
        prelogue: io.prelogue,
        epilogue: io.epilogue,
        max_input_register: io.max_input_register,
        max_output_register: io.max_output_register,
        threadgroup_size,
        binding_table,
        binding_table_argument,
    })
}
