//! SM4/SM5 opcode table and opcode-token bitfields.
//!
//! Values are the canonical IDs from the D3D10/D3D11 tokenized program format
//! (`D3D10_SB_OPCODE_*` / `D3D11_SB_OPCODE_*`).

/// Low 11 bits of an opcode token hold the opcode type.
pub const OPCODE_TYPE_MASK: u32 = 0x7ff;

/// Instruction length (in DWORDs, including the opcode token) lives in bits 24..=30.
pub const INSTRUCTION_LENGTH_SHIFT: u32 = 24;
/// Mask applied after [`INSTRUCTION_LENGTH_SHIFT`].
pub const INSTRUCTION_LENGTH_MASK: u32 = 0x7f;

/// If set on an opcode token, one or more extended opcode tokens follow.
pub const OPCODE_EXTENDED_BIT: u32 = 0x8000_0000;

/// `_sat` result modifier.
pub const INSTRUCTION_SATURATE_BIT: u32 = 0x0000_2000;

/// Conditional opcodes (`if`, `breakc`, `continuec`, `retc`, `discard`) encode `_z`/`_nz`
/// in bit 18 of the opcode token.
pub const INSTRUCTION_TEST_BOOLEAN_SHIFT: u32 = 18;

/// UAV declaration flag: `globallycoherent`.
pub const UAV_FLAG_GLOBALLY_COHERENT: u32 = 0x0001_0000;
/// UAV declaration flag: rasterizer ordered view.
pub const UAV_FLAG_RASTERIZER_ORDERED: u32 = 0x0002_0000;
/// UAV declaration flag: the view has an order-preserving (append/consume/counter) counter.
pub const UAV_FLAG_HAS_ORDER_PRESERVING_COUNTER: u32 = 0x0080_0000;

/// `customdata` class field shift (bits 11..=31 of the opcode token).
pub const CUSTOMDATA_CLASS_SHIFT: u32 = 11;

numeric_enum! {
    /// SM4/SM5 opcode.
    pub enum Opcode {
        Add = 0 => "add",
        And = 1 => "and",
        Break = 2 => "break",
        Breakc = 3 => "breakc",
        Call = 4 => "call",
        Callc = 5 => "callc",
        Case = 6 => "case",
        Continue = 7 => "continue",
        Continuec = 8 => "continuec",
        Cut = 9 => "cut",
        Default = 10 => "default",
        DerivRtx = 11 => "deriv_rtx",
        DerivRty = 12 => "deriv_rty",
        Discard = 13 => "discard",
        Div = 14 => "div",
        Dp2 = 15 => "dp2",
        Dp3 = 16 => "dp3",
        Dp4 = 17 => "dp4",
        Else = 18 => "else",
        Emit = 19 => "emit",
        EmitThenCut = 20 => "emitthen_cut",
        EndIf = 21 => "endif",
        EndLoop = 22 => "endloop",
        EndSwitch = 23 => "endswitch",
        Eq = 24 => "eq",
        Exp = 25 => "exp",
        Frc = 26 => "frc",
        Ftoi = 27 => "ftoi",
        Ftou = 28 => "ftou",
        Ge = 29 => "ge",
        Iadd = 30 => "iadd",
        If = 31 => "if",
        Ieq = 32 => "ieq",
        Ige = 33 => "ige",
        Ilt = 34 => "ilt",
        Imad = 35 => "imad",
        Imax = 36 => "imax",
        Imin = 37 => "imin",
        Imul = 38 => "imul",
        Ine = 39 => "ine",
        Ineg = 40 => "ineg",
        Ishl = 41 => "ishl",
        Ishr = 42 => "ishr",
        Itof = 43 => "itof",
        Label = 44 => "label",
        Ld = 45 => "ld",
        LdMs = 46 => "ld_ms",
        Log = 47 => "log",
        Loop = 48 => "loop",
        Lt = 49 => "lt",
        Mad = 50 => "mad",
        Min = 51 => "min",
        Max = 52 => "max",
        CustomData = 53 => "customdata",
        Mov = 54 => "mov",
        Movc = 55 => "movc",
        Mul = 56 => "mul",
        Ne = 57 => "ne",
        Nop = 58 => "nop",
        Not = 59 => "not",
        Or = 60 => "or",
        ResInfo = 61 => "resinfo",
        Ret = 62 => "ret",
        Retc = 63 => "retc",
        RoundNe = 64 => "round_ne",
        RoundNi = 65 => "round_ni",
        RoundPi = 66 => "round_pi",
        RoundZ = 67 => "round_z",
        Rsq = 68 => "rsq",
        Sample = 69 => "sample",
        SampleC = 70 => "sample_c",
        SampleCLz = 71 => "sample_c_lz",
        SampleL = 72 => "sample_l",
        SampleD = 73 => "sample_d",
        SampleB = 74 => "sample_b",
        Sqrt = 75 => "sqrt",
        Switch = 76 => "switch",
        SinCos = 77 => "sincos",
        Udiv = 78 => "udiv",
        Ult = 79 => "ult",
        Uge = 80 => "uge",
        Umul = 81 => "umul",
        Umad = 82 => "umad",
        Umax = 83 => "umax",
        Umin = 84 => "umin",
        Ushr = 85 => "ushr",
        Utof = 86 => "utof",
        Xor = 87 => "xor",
        DclResource = 88 => "dcl_resource",
        DclConstantBuffer = 89 => "dcl_constantbuffer",
        DclSampler = 90 => "dcl_sampler",
        DclIndexRange = 91 => "dcl_indexrange",
        DclGsOutputPrimitiveTopology = 92 => "dcl_outputtopology",
        DclGsInputPrimitive = 93 => "dcl_inputprimitive",
        DclMaxOutputVertexCount = 94 => "dcl_maxout",
        DclInput = 95 => "dcl_input",
        DclInputSgv = 96 => "dcl_input_sgv",
        DclInputSiv = 97 => "dcl_input_siv",
        DclInputPs = 98 => "dcl_input_ps",
        DclInputPsSgv = 99 => "dcl_input_ps_sgv",
        DclInputPsSiv = 100 => "dcl_input_ps_siv",
        DclOutput = 101 => "dcl_output",
        DclOutputSgv = 102 => "dcl_output_sgv",
        DclOutputSiv = 103 => "dcl_output_siv",
        DclTemps = 104 => "dcl_temps",
        DclIndexableTemp = 105 => "dcl_indexableTemp",
        DclGlobalFlags = 106 => "dcl_globalFlags",
        Lod = 108 => "lod",
        Gather4 = 109 => "gather4",
        SamplePos = 110 => "samplepos",
        SampleInfo = 111 => "sampleinfo",
        HsDecls = 113 => "hs_decls",
        HsControlPointPhase = 114 => "hs_control_point_phase",
        HsForkPhase = 115 => "hs_fork_phase",
        HsJoinPhase = 116 => "hs_join_phase",
        EmitStream = 117 => "emit_stream",
        CutStream = 118 => "cut_stream",
        EmitThenCutStream = 119 => "emitthen_cut_stream",
        InterfaceCall = 120 => "fcall",
        BufInfo = 121 => "bufinfo",
        DerivRtxCoarse = 122 => "deriv_rtx_coarse",
        DerivRtxFine = 123 => "deriv_rtx_fine",
        DerivRtyCoarse = 124 => "deriv_rty_coarse",
        DerivRtyFine = 125 => "deriv_rty_fine",
        Gather4C = 126 => "gather4_c",
        Gather4Po = 127 => "gather4_po",
        Gather4PoC = 128 => "gather4_po_c",
        Rcp = 129 => "rcp",
        F32ToF16 = 130 => "f32tof16",
        F16ToF32 = 131 => "f16tof32",
        Uaddc = 132 => "uaddc",
        Usubb = 133 => "usubb",
        CountBits = 134 => "countbits",
        FirstBitHi = 135 => "firstbit_hi",
        FirstBitLo = 136 => "firstbit_lo",
        FirstBitShi = 137 => "firstbit_shi",
        Ubfe = 138 => "ubfe",
        Ibfe = 139 => "ibfe",
        Bfi = 140 => "bfi",
        Bfrev = 141 => "bfrev",
        Swapc = 142 => "swapc",
        DclStream = 143 => "dcl_stream",
        DclFunctionBody = 144 => "dcl_function_body",
        DclFunctionTable = 145 => "dcl_function_table",
        DclInterface = 146 => "dcl_interface",
        DclInputControlPointCount = 147 => "dcl_input_control_point_count",
        DclOutputControlPointCount = 148 => "dcl_output_control_point_count",
        DclTessDomain = 149 => "dcl_tessellator_domain",
        DclTessPartitioning = 150 => "dcl_tessellator_partitioning",
        DclTessOutputPrimitive = 151 => "dcl_tessellator_output_primitive",
        DclHsMaxTessFactor = 152 => "dcl_hs_max_tessfactor",
        DclHsForkPhaseInstanceCount = 153 => "dcl_hs_fork_phase_instance_count",
        DclHsJoinPhaseInstanceCount = 154 => "dcl_hs_join_phase_instance_count",
        DclThreadGroup = 155 => "dcl_thread_group",
        DclUavTyped = 156 => "dcl_uav_typed",
        DclUavRaw = 157 => "dcl_uav_raw",
        DclUavStructured = 158 => "dcl_uav_structured",
        DclTgsmRaw = 159 => "dcl_tgsm_raw",
        DclTgsmStructured = 160 => "dcl_tgsm_structured",
        DclResourceRaw = 161 => "dcl_resource_raw",
        DclResourceStructured = 162 => "dcl_resource_structured",
        LdUavTyped = 163 => "ld_uav_typed",
        StoreUavTyped = 164 => "store_uav_typed",
        LdRaw = 165 => "ld_raw",
        StoreRaw = 166 => "store_raw",
        LdStructured = 167 => "ld_structured",
        StoreStructured = 168 => "store_structured",
        AtomicAnd = 169 => "atomic_and",
        AtomicOr = 170 => "atomic_or",
        AtomicXor = 171 => "atomic_xor",
        AtomicCmpStore = 172 => "atomic_cmp_store",
        AtomicIadd = 173 => "atomic_iadd",
        AtomicImax = 174 => "atomic_imax",
        AtomicImin = 175 => "atomic_imin",
        AtomicUmax = 176 => "atomic_umax",
        AtomicUmin = 177 => "atomic_umin",
        ImmAtomicAlloc = 178 => "imm_atomic_alloc",
        ImmAtomicConsume = 179 => "imm_atomic_consume",
        ImmAtomicIadd = 180 => "imm_atomic_iadd",
        ImmAtomicAnd = 181 => "imm_atomic_and",
        ImmAtomicOr = 182 => "imm_atomic_or",
        ImmAtomicXor = 183 => "imm_atomic_xor",
        ImmAtomicExch = 184 => "imm_atomic_exch",
        ImmAtomicCmpExch = 185 => "imm_atomic_cmp_exch",
        ImmAtomicImax = 186 => "imm_atomic_imax",
        ImmAtomicImin = 187 => "imm_atomic_imin",
        ImmAtomicUmax = 188 => "imm_atomic_umax",
        ImmAtomicUmin = 189 => "imm_atomic_umin",
        Sync = 190 => "sync",
        Dadd = 191 => "dadd",
        Dmax = 192 => "dmax",
        Dmin = 193 => "dmin",
        Dmul = 194 => "dmul",
        Deq = 195 => "deq",
        Dge = 196 => "dge",
        Dlt = 197 => "dlt",
        Dne = 198 => "dne",
        Dmov = 199 => "dmov",
        Dmovc = 200 => "dmovc",
        Dtof = 201 => "dtof",
        Ftod = 202 => "ftod",
        EvalSnapped = 203 => "eval_snapped",
        EvalSampleIndex = 204 => "eval_sample_index",
        EvalCentroid = 205 => "eval_centroid",
        DclGsInstanceCount = 206 => "dcl_gs_instance_count",
        Abort = 207 => "abort",
        DebugBreak = 208 => "debug_break",
        Ddiv = 210 => "ddiv",
        Dfma = 211 => "dfma",
        Drcp = 212 => "drcp",
        Msad = 213 => "msad",
        Dtoi = 214 => "dtoi",
        Dtou = 215 => "dtou",
        Itod = 216 => "itod",
        Utod = 217 => "utod",
    }
}

impl Opcode {
    /// Extracts the opcode type from a raw opcode token.
    pub const fn from_token(token: u32) -> Self {
        Self::from_raw(token & OPCODE_TYPE_MASK)
    }

    /// Whether this opcode is a `dcl_*` declaration.
    ///
    /// `customdata` is not included: it may carry declarations (the immediate constant
    /// buffer) but can also appear as comments in the executable stream.
    pub const fn is_declaration(self) -> bool {
        matches!(
            self,
            Self::DclResource
                | Self::DclConstantBuffer
                | Self::DclSampler
                | Self::DclIndexRange
                | Self::DclGsOutputPrimitiveTopology
                | Self::DclGsInputPrimitive
                | Self::DclMaxOutputVertexCount
                | Self::DclInput
                | Self::DclInputSgv
                | Self::DclInputSiv
                | Self::DclInputPs
                | Self::DclInputPsSgv
                | Self::DclInputPsSiv
                | Self::DclOutput
                | Self::DclOutputSgv
                | Self::DclOutputSiv
                | Self::DclTemps
                | Self::DclIndexableTemp
                | Self::DclGlobalFlags
                | Self::DclStream
                | Self::DclFunctionBody
                | Self::DclFunctionTable
                | Self::DclInterface
                | Self::DclInputControlPointCount
                | Self::DclOutputControlPointCount
                | Self::DclTessDomain
                | Self::DclTessPartitioning
                | Self::DclTessOutputPrimitive
                | Self::DclHsMaxTessFactor
                | Self::DclHsForkPhaseInstanceCount
                | Self::DclHsJoinPhaseInstanceCount
                | Self::DclThreadGroup
                | Self::DclUavTyped
                | Self::DclUavRaw
                | Self::DclUavStructured
                | Self::DclTgsmRaw
                | Self::DclTgsmStructured
                | Self::DclResourceRaw
                | Self::DclResourceStructured
                | Self::DclGsInstanceCount
        )
    }

    /// Whether this opcode opens, closes or branches out of a structured scope.
    pub const fn is_control_flow(self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Else
                | Self::EndIf
                | Self::Loop
                | Self::EndLoop
                | Self::Break
                | Self::Breakc
                | Self::Continue
                | Self::Continuec
                | Self::Switch
                | Self::Case
                | Self::Default
                | Self::EndSwitch
                | Self::Ret
                | Self::Retc
                | Self::Discard
        )
    }
}

/// Decodes the instruction length (in DWORDs) from a raw opcode token.
pub const fn instruction_length(token: u32) -> usize {
    ((token >> INSTRUCTION_LENGTH_SHIFT) & INSTRUCTION_LENGTH_MASK) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_control_flow_ids() {
        assert_eq!(Opcode::from_raw(31), Opcode::If);
        assert_eq!(Opcode::from_raw(18), Opcode::Else);
        assert_eq!(Opcode::from_raw(21), Opcode::EndIf);
        assert_eq!(Opcode::from_raw(48), Opcode::Loop);
        assert_eq!(Opcode::from_raw(76), Opcode::Switch);
        assert_eq!(Opcode::from_raw(62), Opcode::Ret);
        assert_eq!(Opcode::DclThreadGroup.raw(), 155);
    }

    #[test]
    fn reserved_ids_are_unknown() {
        assert_eq!(Opcode::from_raw(107), Opcode::Unknown(107));
        assert_eq!(Opcode::from_raw(209), Opcode::Unknown(209));
        assert_eq!(Opcode::Unknown(4000).raw(), 4000);
        assert_eq!(Opcode::Unknown(4000).to_string(), "unknown(4000)");
    }

    #[test]
    fn token_fields() {
        // if_nz, length 3
        let token = 31 | (1 << INSTRUCTION_TEST_BOOLEAN_SHIFT) | (3 << INSTRUCTION_LENGTH_SHIFT);
        assert_eq!(Opcode::from_token(token), Opcode::If);
        assert_eq!(instruction_length(token), 3);
    }

    #[test]
    fn classification() {
        assert!(Opcode::DclUavStructured.is_declaration());
        assert!(!Opcode::CustomData.is_declaration());
        assert!(Opcode::Retc.is_control_flow());
        assert!(!Opcode::Mov.is_control_flow());
        assert_eq!(Opcode::SampleCLz.name(), "sample_c_lz");
    }
}
