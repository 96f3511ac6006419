mod common;

use common::*;
use pretty_assertions::assert_eq;
use sm5_front::{
    run_epilogue, run_prelogue, AttributeType, ComputeBuiltin, DepthArgument, EffectError,
    EpilogueEffect, FunctionContext, FunctionInput, FunctionOutput, Interpolation,
    PrelogueEffect,
};
use sm5_ir::{
    ComponentMask, Declaration, Instruction, InterpolationMode, Opcode, Operand, OperandIndex,
    OperandType, RegisterComponentType, ShaderSignatures, ShaderStage, SystemName,
};

/// Context whose values are expression strings; every side effect is logged.
#[derive(Default)]
struct Recorder {
    arguments: u32,
    returns_void: bool,
    depth_allocated: bool,
    log: Vec<String>,
}

impl Recorder {
    fn with_arguments(arguments: usize) -> Self {
        Self {
            arguments: arguments as u32,
            ..Self::default()
        }
    }
}

impl FunctionContext for Recorder {
    type Value = String;

    fn argument(&mut self, index: u32) -> Result<String, EffectError> {
        if index >= self.arguments {
            return Err(EffectError::MissingArgument(index));
        }
        Ok(format!("arg{index}"))
    }

    fn sub(&mut self, lhs: String, rhs: String) -> String {
        format!("({lhs} - {rhs})")
    }

    fn store_input_register(&mut self, register: u32, _mask: ComponentMask, value: String) {
        self.log.push(format!("v{register} = {value}"));
    }

    fn bind_compute_builtin(&mut self, builtin: ComputeBuiltin, value: String) {
        self.log.push(format!("{builtin:?} = {value}"));
    }

    fn allocate_depth_output(&mut self) -> Result<(), EffectError> {
        if self.depth_allocated {
            return Err(EffectError::DepthSlotReallocated);
        }
        self.depth_allocated = true;
        self.log.push("depth slot".into());
        Ok(())
    }

    fn load_depth_output(&mut self) -> Result<String, EffectError> {
        if !self.depth_allocated {
            return Err(EffectError::DepthSlotUnallocated);
        }
        Ok("depth".into())
    }

    fn load_output_register(&mut self, register: u32, _mask: ComponentMask) -> String {
        format!("o{register}")
    }

    fn insert_return_value(&mut self, aggregate: String, position: u32, value: String) -> String {
        format!("{aggregate} | {position}:{value}")
    }

    fn undefined_return(&mut self) -> Option<String> {
        (!self.returns_void).then(|| "ret".to_string())
    }
}

fn v(register: u32, mask: ComponentMask) -> Operand {
    Operand::register(OperandType::Input, OperandIndex::D1(register)).with_mask(mask)
}

fn o(register: u32, mask: ComponentMask) -> Operand {
    Operand::register(OperandType::Output, OperandIndex::D1(register)).with_mask(mask)
}

fn input_sgv(operand: Operand, name: SystemName) -> Instruction {
    dcl(
        Opcode::DclInputSgv,
        operand,
        Declaration::InputSystemValue { name },
    )
}

fn input_ps(operand: Operand, interpolation: InterpolationMode) -> Instruction {
    dcl(
        Opcode::DclInputPs,
        operand,
        Declaration::InputPs { interpolation },
    )
}

fn input_ps_value(
    opcode: Opcode,
    operand: Operand,
    name: SystemName,
    interpolation: InterpolationMode,
) -> Instruction {
    dcl(
        opcode,
        operand,
        Declaration::InputPsSystemValue {
            name,
            interpolation,
        },
    )
}

fn output(operand: Operand) -> Instruction {
    dcl(Opcode::DclOutput, operand, Declaration::Output)
}

fn thread_input(ty: OperandType) -> Instruction {
    dcl(Opcode::DclInput, Operand::special(ty), Declaration::Input)
}

fn vertex_signatures() -> ShaderSignatures {
    ShaderSignatures {
        inputs: vec![element("POSITION", 0, 1, ComponentMask::XYZW)],
        outputs: vec![
            element("SV_Position", 0, 0, ComponentMask::XYZW),
            element("TEXCOORD", 0, 1, (ComponentMask::X | ComponentMask::Y)),
        ],
    }
}

#[test]
fn vertex_shader_io() {
    let shader = compile_with(
        ShaderStage::Vertex,
        &vertex_signatures(),
        vec![
            input_sgv(v(0, ComponentMask::X), SystemName::VertexId),
            dcl(Opcode::DclInput, v(1, ComponentMask::XYZW), Declaration::Input),
            input_sgv(v(2, ComponentMask::X), SystemName::InstanceId),
            dcl(
                Opcode::DclOutputSiv,
                o(0, ComponentMask::XYZW),
                Declaration::OutputSystemValue {
                    name: SystemName::Position,
                },
            ),
            output(o(1, (ComponentMask::X | ComponentMask::Y))),
            op(Opcode::Ret),
        ],
    )
    .unwrap();

    assert_eq!(
        shader.signature.inputs(),
        &[
            FunctionInput::VertexId,
            FunctionInput::BaseVertex,
            FunctionInput::VertexStageIn {
                attribute: 1,
                ty: AttributeType::Float4,
                name: "POSITION0".into(),
            },
            FunctionInput::InstanceId,
            FunctionInput::BaseInstance,
        ]
    );
    assert_eq!(
        shader.prelogue,
        vec![
            PrelogueEffect::StoreRelativeId {
                value: 0,
                base: 1,
                register: 0,
                mask: ComponentMask::X,
            },
            PrelogueEffect::InitInputRegister {
                argument: 2,
                register: 1,
                mask: ComponentMask::XYZW,
            },
            PrelogueEffect::StoreRelativeId {
                value: 3,
                base: 4,
                register: 2,
                mask: ComponentMask::X,
            },
        ]
    );
    assert_eq!(
        shader.signature.outputs(),
        &[
            FunctionOutput::Position,
            FunctionOutput::Vertex {
                name: "TEXCOORD0".into(),
                ty: AttributeType::Float4,
            },
        ]
    );
    assert_eq!(
        shader.epilogue,
        vec![
            EpilogueEffect::PopOutputRegister {
                register: 0,
                mask: ComponentMask::XYZW,
                output: 0,
            },
            EpilogueEffect::PopOutputRegister {
                register: 1,
                mask: (ComponentMask::X | ComponentMask::Y),
                output: 1,
            },
        ]
    );
    assert_eq!(shader.max_input_register, 3);
    assert_eq!(shader.max_output_register, 2);

    let mut ctx = Recorder::with_arguments(shader.signature.inputs().len());
    run_prelogue(&mut ctx, &shader.prelogue).unwrap();
    assert_eq!(
        ctx.log,
        vec![
            "v0 = (arg0 - arg1)",
            "v1 = arg2",
            "v2 = (arg3 - arg4)",
        ]
    );
    assert_eq!(
        run_epilogue(&mut ctx, &shader.epilogue).unwrap().as_deref(),
        Some("ret | 0:o0 | 1:o1")
    );
}

#[test]
fn pixel_shader_io() {
    let signatures = ShaderSignatures {
        inputs: vec![
            element("TEXCOORD", 0, 1, (ComponentMask::X | ComponentMask::Y)),
            element("COLOR", 0, 3, ComponentMask::XYZW)
                .with_component_type(RegisterComponentType::Uint32),
        ],
        outputs: vec![element("SV_Target", 0, 0, ComponentMask::XYZW)],
    };
    let shader = compile_with(
        ShaderStage::Pixel,
        &signatures,
        vec![
            input_ps_value(
                Opcode::DclInputPsSiv,
                v(0, ComponentMask::XYZW),
                SystemName::Position,
                InterpolationMode::LinearNoPerspective,
            ),
            input_ps(v(1, (ComponentMask::X | ComponentMask::Y)), InterpolationMode::Linear),
            input_ps_value(
                Opcode::DclInputPsSgv,
                v(2, ComponentMask::X),
                SystemName::IsFrontFace,
                InterpolationMode::Constant,
            ),
            input_ps(v(3, ComponentMask::XYZW), InterpolationMode::Constant),
            output(o(0, ComponentMask::XYZW)),
            output(Operand::special(OperandType::OutputDepth)),
            op(Opcode::Ret),
        ],
    )
    .unwrap();

    assert_eq!(
        shader.signature.inputs(),
        &[
            FunctionInput::Position {
                interpolation: Interpolation::CenterNoPerspective,
            },
            FunctionInput::FragmentStageIn {
                name: "TEXCOORD0".into(),
                ty: AttributeType::Float4,
                interpolation: Interpolation::CenterPerspective,
            },
            FunctionInput::FrontFacing,
            FunctionInput::FragmentStageIn {
                name: "COLOR0".into(),
                ty: AttributeType::Int4,
                interpolation: Interpolation::Flat,
            },
        ]
    );
    assert_eq!(
        shader.signature.outputs(),
        &[
            FunctionOutput::RenderTarget {
                index: 0,
                ty: AttributeType::Float4,
            },
            FunctionOutput::Depth {
                argument: DepthArgument::Any,
            },
        ]
    );
    assert_eq!(shader.prelogue.last(), Some(&PrelogueEffect::AllocateDepthOutput));
    assert_eq!(
        shader.epilogue,
        vec![
            EpilogueEffect::PopOutputRegister {
                register: 0,
                mask: ComponentMask::XYZW,
                output: 0,
            },
            EpilogueEffect::PopDepthOutput { output: 1 },
        ]
    );
    assert_eq!(shader.max_input_register, 4);
    assert_eq!(shader.max_output_register, 1);

    let mut ctx = Recorder::with_arguments(shader.signature.inputs().len());
    run_prelogue(&mut ctx, &shader.prelogue).unwrap();
    assert_eq!(
        ctx.log,
        vec!["v0 = arg0", "v1 = arg1", "v2 = arg2", "v3 = arg3", "depth slot"]
    );
    assert_eq!(
        run_epilogue(&mut ctx, &shader.epilogue).unwrap().as_deref(),
        Some("ret | 0:o0 | 1:depth")
    );
}

#[test]
fn compute_builtins() {
    let shader = compile_with(
        ShaderStage::Compute,
        &ShaderSignatures::default(),
        vec![
            dcl(
                Opcode::DclThreadGroup,
                Operand::special(OperandType::Null),
                Declaration::ThreadGroup { x: 16, y: 16, z: 1 },
            ),
            dcl(
                Opcode::DclUavRaw,
                Operand::register(OperandType::UnorderedAccessView, OperandIndex::D1(0)),
                Declaration::UavRaw { flags: 0, space: 0 },
            ),
            thread_input(OperandType::InputThreadId),
            thread_input(OperandType::InputThreadIdInGroupFlattened),
            thread_input(OperandType::InputThreadGroupId),
            thread_input(OperandType::CycleCounter),
            op(Opcode::Ret),
        ],
    )
    .unwrap();

    assert_eq!(
        shader.signature.inputs(),
        &[
            FunctionInput::ThreadPositionInGrid,
            FunctionInput::ThreadIndexInThreadgroup,
            FunctionInput::ThreadgroupPositionInGrid,
            FunctionInput::BindingTable { location: 30 },
        ]
    );
    assert_eq!(shader.binding_table_argument, Some(3));
    assert!(shader.signature.is_void());
    assert_eq!(shader.max_input_register, 0);

    let mut ctx = Recorder {
        arguments: shader.signature.inputs().len() as u32,
        returns_void: true,
        ..Recorder::default()
    };
    run_prelogue(&mut ctx, &shader.prelogue).unwrap();
    assert_eq!(
        ctx.log,
        vec![
            "ThreadPositionInGrid = arg0",
            "ThreadIndexInThreadgroup = arg1",
            "ThreadgroupPositionInGrid = arg2",
        ]
    );
    assert_eq!(run_epilogue(&mut ctx, &shader.epilogue), Ok(None));
}

#[test]
fn replay_failures() {
    let mut ctx = Recorder::with_arguments(1);
    let effects = [
        PrelogueEffect::InitInputRegister {
            argument: 0,
            register: 0,
            mask: ComponentMask::XYZW,
        },
        PrelogueEffect::StoreRelativeId {
            value: 0,
            base: 1,
            register: 1,
            mask: ComponentMask::X,
        },
    ];
    assert_eq!(
        run_prelogue(&mut ctx, &effects),
        Err(EffectError::MissingArgument(1))
    );
    // Effects before the failing one have run.
    assert_eq!(ctx.log, vec!["v0 = arg0"]);

    let mut ctx = Recorder::default();
    assert_eq!(
        run_prelogue(
            &mut ctx,
            &[PrelogueEffect::AllocateDepthOutput, PrelogueEffect::AllocateDepthOutput]
        ),
        Err(EffectError::DepthSlotReallocated)
    );

    let mut ctx = Recorder::default();
    assert_eq!(
        run_epilogue(&mut ctx, &[EpilogueEffect::PopDepthOutput { output: 0 }]),
        Err(EffectError::DepthSlotUnallocated)
    );

    let mut ctx = Recorder {
        returns_void: true,
        ..Recorder::default()
    };
    let pop = EpilogueEffect::PopOutputRegister {
        register: 0,
        mask: ComponentMask::XYZW,
        output: 0,
    };
    assert_eq!(run_epilogue(&mut ctx, &[pop]), Err(EffectError::VoidReturn));
}

#[test]
fn last_register_index_is_malformed() {
    let front_face = compile_with(
        ShaderStage::Pixel,
        &ShaderSignatures::default(),
        vec![
            input_ps_value(
                Opcode::DclInputPsSgv,
                v(u32::MAX, ComponentMask::X),
                SystemName::IsFrontFace,
                InterpolationMode::Constant,
            ),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(front_face.is_malformed(), "{front_face}");
    assert_eq!(front_face.message(), "register index 4294967295 is out of range");
    assert_eq!(front_face.location().instruction_index, 0);

    let vertex_id = compile_with(
        ShaderStage::Vertex,
        &ShaderSignatures::default(),
        vec![
            input_sgv(v(u32::MAX, ComponentMask::X), SystemName::VertexId),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(vertex_id.is_malformed(), "{vertex_id}");

    let sigs = ShaderSignatures {
        inputs: Vec::new(),
        outputs: vec![element("TEXCOORD", 0, u32::MAX, ComponentMask::XYZW)],
    };
    let texcoord = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![output(o(u32::MAX, ComponentMask::XYZW)), op(Opcode::Ret)],
    )
    .unwrap_err();
    assert!(texcoord.is_malformed(), "{texcoord}");
}

#[test]
fn stage_checks() {
    let sigs = vertex_signatures();

    let err = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![
            input_ps(v(1, ComponentMask::XYZW), InterpolationMode::Linear),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_unsupported());

    let err = compile_with(
        ShaderStage::Pixel,
        &sigs,
        vec![
            input_ps_value(
                Opcode::DclInputPsSgv,
                v(2, ComponentMask::X),
                SystemName::IsFrontFace,
                InterpolationMode::Linear,
            ),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_malformed());

    let err = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![
            thread_input(OperandType::InputThreadId),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_unsupported());

    let err = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![
            output(Operand::special(OperandType::OutputDepth)),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_unsupported());

    // o2 has no output signature element.
    let err = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![output(o(2, ComponentMask::XYZW)), op(Opcode::Ret)],
    )
    .unwrap_err();
    assert!(err.is_malformed());
    assert_eq!(err.message(), "o2 has no output signature element");

    let err = compile_with(
        ShaderStage::Pixel,
        &sigs,
        vec![
            output(Operand::special(OperandType::OutputStencilRef)),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_unsupported());

    let err = compile_with(
        ShaderStage::Vertex,
        &sigs,
        vec![
            dcl(
                Opcode::DclInputSiv,
                v(0, ComponentMask::X),
                Declaration::InputSystemValue {
                    name: SystemName::ClipDistance,
                },
            ),
            op(Opcode::Ret),
        ],
    )
    .unwrap_err();
    assert!(err.is_unsupported());
}
