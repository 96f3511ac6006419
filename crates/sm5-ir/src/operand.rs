//! Operands of decoded SM4/SM5 instructions.

use bitflags::bitflags;

numeric_enum! {
    /// Register file / operand kind (`D3D10_SB_OPERAND_TYPE`).
    pub enum OperandType {
        Temp = 0 => "r",
        Input = 1 => "v",
        Output = 2 => "o",
        IndexableTemp = 3 => "x",
        Immediate32 = 4 => "l",
        Immediate64 = 5 => "d",
        Sampler = 6 => "s",
        Resource = 7 => "t",
        ConstantBuffer = 8 => "cb",
        ImmediateConstantBuffer = 9 => "icb",
        Label = 10 => "label",
        InputPrimitiveId = 11 => "vPrim",
        OutputDepth = 12 => "oDepth",
        Null = 13 => "null",
        Rasterizer = 14 => "rasterizer",
        OutputCoverageMask = 15 => "oMask",
        Stream = 16 => "m",
        FunctionBody = 17 => "fb",
        FunctionTable = 18 => "ft",
        Interface = 19 => "fp",
        FunctionInput = 20 => "fi",
        FunctionOutput = 21 => "fo",
        OutputControlPointId = 22 => "vOutputControlPointID",
        InputForkInstanceId = 23 => "vForkInstanceID",
        InputJoinInstanceId = 24 => "vJoinInstanceID",
        InputControlPoint = 25 => "vicp",
        OutputControlPoint = 26 => "vocp",
        InputPatchConstant = 27 => "vpc",
        InputDomainPoint = 28 => "vDomain",
        ThisPointer = 29 => "this",
        UnorderedAccessView = 30 => "u",
        ThreadGroupSharedMemory = 31 => "g",
        InputThreadId = 32 => "vThreadID",
        InputThreadGroupId = 33 => "vThreadGroupID",
        InputThreadIdInGroup = 34 => "vThreadIDInGroup",
        InputCoverageMask = 35 => "vCoverage",
        InputThreadIdInGroupFlattened = 36 => "vThreadIDInGroupFlattened",
        InputGsInstanceId = 37 => "vGSInstanceID",
        OutputDepthGreaterEqual = 38 => "oDepthGE",
        OutputDepthLessEqual = 39 => "oDepthLE",
        CycleCounter = 40 => "vCycleCounter",
        OutputStencilRef = 41 => "oStencilRef",
        InnerCoverage = 42 => "vInnerCoverage",
    }
}

bitflags! {
    /// 4-component mask (`x=1, y=2, z=4, w=8`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentMask: u8 {
        /// `.x`
        const X = 0b0001;
        /// `.y`
        const Y = 0b0010;
        /// `.z`
        const Z = 0b0100;
        /// `.w`
        const W = 0b1000;
        /// `.xyzw`
        const XYZW = 0b1111;
    }
}

impl ComponentMask {
    /// Number of vector lanes needed to hold every selected component.
    ///
    /// This is the position of the highest set bit (`.xz` needs 3 lanes), not the
    /// population count.
    pub const fn channel_count(self) -> u32 {
        8 - self.bits().leading_zeros()
    }
}

/// 4-component swizzle; each lane is `0..=3` for x/y/z/w.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    /// `.xyzw`
    pub const XYZW: Self = Self([0, 1, 2, 3]);
    /// `.xxxx`
    pub const XXXX: Self = Self([0, 0, 0, 0]);

    /// Whether the swizzle leaves components in place.
    pub fn is_identity(self) -> bool {
        self == Self::XYZW
    }
}

impl Default for Swizzle {
    fn default() -> Self {
        Self::XYZW
    }
}

/// Source operand modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandModifier {
    /// No modifier.
    #[default]
    None,
    /// `-x`
    Neg,
    /// `|x|`
    Abs,
    /// `-|x|`
    AbsNeg,
}

/// Number of register indices an operand carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexDimension {
    /// No index (immediates, `oDepth`, `vThreadID`, ...).
    D0,
    /// `r0`, `t3`, `s1` (legacy SM4/SM5.0 resource form).
    D1,
    /// `cb0[4]`, `vicp[2][1]` (legacy constant-buffer form).
    D2,
    /// `t0[2:5]` (SM5.1 range form: range id, lower bound, upper bound).
    D3,
}

/// Immediate register indices of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandIndex {
    /// No index.
    #[default]
    None,
    /// One index.
    D1(u32),
    /// Two indices.
    D2(u32, u32),
    /// Three indices.
    D3(u32, u32, u32),
}

impl OperandIndex {
    /// Number of indices present.
    pub const fn dimension(self) -> IndexDimension {
        match self {
            Self::None => IndexDimension::D0,
            Self::D1(..) => IndexDimension::D1,
            Self::D2(..) => IndexDimension::D2,
            Self::D3(..) => IndexDimension::D3,
        }
    }

    /// Returns index `n` (0-based) if present.
    pub const fn get(self, n: usize) -> Option<u32> {
        match (self, n) {
            (Self::D1(a), 0) | (Self::D2(a, _), 0) | (Self::D3(a, _, _), 0) => Some(a),
            (Self::D2(_, b), 1) | (Self::D3(_, b, _), 1) => Some(b),
            (Self::D3(_, _, c), 2) => Some(c),
            _ => None,
        }
    }
}

/// A decoded operand.
///
/// Only immediate index addressing is modelled here. Relative addressing (`r0[r1.x + 2]`)
/// is meaningful to per-instruction lowering, which receives the full instruction from
/// the decoder; declarations only ever use immediate indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    /// Register file.
    pub ty: OperandType,
    /// Immediate indices.
    pub index: OperandIndex,
    /// Component count (0, 1 or 4).
    pub num_components: u8,
    /// Write/declaration mask for 4-component operands.
    pub mask: ComponentMask,
    /// Source swizzle for 4-component operands.
    pub swizzle: Swizzle,
    /// Source modifier.
    pub modifier: OperandModifier,
    /// Immediate payload for [`OperandType::Immediate32`] operands.
    pub immediate: [u32; 4],
}

impl Operand {
    /// A 4-component register operand with a full mask and identity swizzle.
    pub fn register(ty: OperandType, index: OperandIndex) -> Self {
        Self {
            ty,
            index,
            num_components: 4,
            mask: ComponentMask::XYZW,
            swizzle: Swizzle::XYZW,
            modifier: OperandModifier::None,
            immediate: [0; 4],
        }
    }

    /// A 0-component operand without indices (e.g. `vThreadID` in a declaration).
    pub fn special(ty: OperandType) -> Self {
        Self {
            num_components: 0,
            mask: ComponentMask::empty(),
            ..Self::register(ty, OperandIndex::None)
        }
    }

    /// A scalar 32-bit immediate (`l(value)`).
    pub fn immediate_u32(value: u32) -> Self {
        Self {
            ty: OperandType::Immediate32,
            index: OperandIndex::None,
            num_components: 1,
            mask: ComponentMask::X,
            swizzle: Swizzle::XXXX,
            modifier: OperandModifier::None,
            immediate: [value, 0, 0, 0],
        }
    }

    /// A 4-component 32-bit immediate.
    pub fn immediate_vec4(values: [u32; 4]) -> Self {
        Self {
            ty: OperandType::Immediate32,
            index: OperandIndex::None,
            num_components: 4,
            mask: ComponentMask::XYZW,
            swizzle: Swizzle::XYZW,
            modifier: OperandModifier::None,
            immediate: values,
        }
    }

    /// Replaces the write/declaration mask.
    pub fn with_mask(mut self, mask: ComponentMask) -> Self {
        self.mask = mask;
        self
    }

    /// Replaces the swizzle.
    pub fn with_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.swizzle = swizzle;
        self
    }

    /// First register index, if any.
    pub fn register_index(&self) -> Option<u32> {
        self.index.get(0)
    }
}
