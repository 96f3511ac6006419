use crate::decl::Declaration;
use crate::opcode::{Opcode, INSTRUCTION_TEST_BOOLEAN_SHIFT};
use crate::operand::Operand;

/// Shader stage declared by the version token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Pixel (fragment) shader.
    Pixel,
    /// Vertex shader.
    Vertex,
    /// Geometry shader.
    Geometry,
    /// Hull shader.
    Hull,
    /// Domain shader.
    Domain,
    /// Compute shader.
    Compute,
    /// Unrecognized program type.
    Unknown(u16),
}

/// Shader model version (`vs_5_0` → `5.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModel {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl ShaderModel {
    /// Shader model 5.0.
    pub const SM_5_0: Self = Self { major: 5, minor: 0 };
    /// Shader model 5.1.
    pub const SM_5_1: Self = Self { major: 5, minor: 1 };

    /// Whether resource declarations use the SM5.1 `[lower:upper]` range form.
    pub fn uses_resource_ranges(self) -> bool {
        self >= Self::SM_5_1
    }
}

/// Splits a version token into stage and model.
pub fn decode_version_token(version: u32) -> (ShaderStage, ShaderModel) {
    // D3D10+ shader bytecode version token layout:
    // - bits 0..=3: minor version
    // - bits 4..=7: major version
    // - bits 16..=31: program type
    let minor = (version & 0xF) as u8;
    let major = ((version >> 4) & 0xF) as u8;
    let ty = (version >> 16) as u16;

    let stage = match ty {
        0 => ShaderStage::Pixel,
        1 => ShaderStage::Vertex,
        2 => ShaderStage::Geometry,
        3 => ShaderStage::Hull,
        4 => ShaderStage::Domain,
        5 => ShaderStage::Compute,
        other => ShaderStage::Unknown(other),
    };

    (stage, ShaderModel { major, minor })
}

/// Boolean test applied by conditional opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestBoolean {
    /// `_z`: taken when the condition is zero.
    Zero,
    /// `_nz`: taken when the condition is non-zero.
    #[default]
    NonZero,
}

impl TestBoolean {
    /// Reads the test bit from a raw opcode token.
    pub const fn from_opcode_token(token: u32) -> Self {
        if (token >> INSTRUCTION_TEST_BOOLEAN_SHIFT) & 1 != 0 {
            Self::NonZero
        } else {
            Self::Zero
        }
    }
}

/// One decoded instruction or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode.
    pub opcode: Opcode,
    /// DWORD offset of the opcode token in the program (diagnostics only).
    pub at_dword: usize,
    /// `_z` / `_nz` for conditional opcodes.
    pub test: TestBoolean,
    /// `_sat` result modifier.
    pub saturate: bool,
    /// Operands in encoding order.
    pub operands: Vec<Operand>,
    /// Declaration payload for `dcl_*` and `customdata`.
    pub decl: Option<Declaration>,
}

impl Instruction {
    /// An instruction with no operands.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            at_dword: 0,
            test: TestBoolean::NonZero,
            saturate: false,
            operands: Vec::new(),
            decl: None,
        }
    }

    /// A declaration of `operand` with the given payload.
    pub fn declaration(opcode: Opcode, operand: Operand, decl: Declaration) -> Self {
        Self::new(opcode).with_operand(operand).with_decl(decl)
    }

    /// Appends an operand.
    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    /// Sets the declaration payload.
    pub fn with_decl(mut self, decl: Declaration) -> Self {
        self.decl = Some(decl);
        self
    }

    /// Sets the boolean test.
    pub fn with_test(mut self, test: TestBoolean) -> Self {
        self.test = test;
        self
    }

    /// Sets the DWORD offset.
    pub fn at(mut self, at_dword: usize) -> Self {
        self.at_dword = at_dword;
        self
    }

    /// Operand `n`, if present.
    pub fn operand(&self, n: usize) -> Option<&Operand> {
        self.operands.get(n)
    }
}

/// A decoded shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    /// Stage declared by the version token.
    pub stage: ShaderStage,
    /// Shader model declared by the version token.
    pub model: ShaderModel,
    /// Declarations and instructions in program order.
    pub instructions: Vec<Instruction>,
}

impl ShaderProgram {
    /// An empty program.
    pub fn new(stage: ShaderStage, model: ShaderModel) -> Self {
        Self {
            stage,
            model,
            instructions: Vec::new(),
        }
    }

    /// Appends an instruction.
    pub fn push(&mut self, inst: Instruction) -> &mut Self {
        self.instructions.push(inst);
        self
    }
}
