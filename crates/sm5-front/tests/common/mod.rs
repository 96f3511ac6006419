#![allow(dead_code)]

use sm5_front::{compile, BlockId, Cfg, CompileOptions, CompiledShader, DecodeError, Passthrough};
use sm5_ir::{
    ComponentMask, Declaration, Instruction, Opcode, Operand, OperandIndex, OperandType,
    ShaderModel, ShaderProgram, ShaderSignatures, ShaderStage, SignatureElement,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn r(index: u32) -> Operand {
    Operand::register(OperandType::Temp, OperandIndex::D1(index))
}

pub fn op(opcode: Opcode) -> Instruction {
    Instruction::new(opcode)
}

/// `mov r<tag>, r0`, tagged through its dword offset so tests can find it again.
pub fn mov(tag: usize) -> Instruction {
    Instruction::new(Opcode::Mov)
        .with_operand(r(tag as u32))
        .with_operand(r(0))
        .at(tag)
}

/// Opcodes taking a condition (`if`, `breakc`, `retc`, ...) on `r0.x`.
pub fn cond(opcode: Opcode) -> Instruction {
    Instruction::new(opcode).with_operand(r(0).with_mask(ComponentMask::X))
}

pub fn case(value: u32) -> Instruction {
    Instruction::new(Opcode::Case).with_operand(Operand::immediate_u32(value))
}

pub fn dcl(opcode: Opcode, operand: Operand, decl: Declaration) -> Instruction {
    Instruction::declaration(opcode, operand, decl)
}

pub fn program(stage: ShaderStage, insts: Vec<Instruction>) -> ShaderProgram {
    ShaderProgram {
        stage,
        model: ShaderModel::SM_5_0,
        instructions: insts,
    }
}

pub fn compile_with(
    stage: ShaderStage,
    signatures: &ShaderSignatures,
    insts: Vec<Instruction>,
) -> Result<CompiledShader<Instruction>, DecodeError> {
    init_tracing();
    compile(
        &program(stage, insts),
        signatures,
        &mut Passthrough,
        &CompileOptions::default(),
    )
}

pub fn compile_ok(stage: ShaderStage, insts: Vec<Instruction>) -> CompiledShader<Instruction> {
    compile_with(stage, &ShaderSignatures::default(), insts).expect("shader should compile")
}

pub fn compile_err(stage: ShaderStage, insts: Vec<Instruction>) -> DecodeError {
    compile_with(stage, &ShaderSignatures::default(), insts).expect_err("shader should be rejected")
}

/// Tags of the `mov`s in a block, in order.
pub fn tags(cfg: &Cfg<Instruction>, id: BlockId) -> Vec<usize> {
    cfg.block(id).lowered().map(|inst| inst.at_dword).collect()
}

/// Every block with the given debug name, in allocation order.
pub fn blocks_named(cfg: &Cfg<Instruction>, name: &str) -> Vec<BlockId> {
    cfg.iter()
        .filter(|(_, b)| b.name == name)
        .map(|(id, _)| id)
        .collect()
}

pub fn block_named(cfg: &Cfg<Instruction>, name: &str) -> BlockId {
    let found = blocks_named(cfg, name);
    assert_eq!(found.len(), 1, "expected exactly one {name} block");
    found[0]
}

pub fn element(name: &str, index: u32, register: u32, mask: ComponentMask) -> SignatureElement {
    SignatureElement::new(name, index, register, mask)
}
