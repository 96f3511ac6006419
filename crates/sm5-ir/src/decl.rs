//! Payloads carried by declaration opcodes.
//!
//! The declared register/resource itself is always operand 0 of the owning
//! [`Instruction`](crate::Instruction); the payload holds whatever the opcode token and
//! trailing DWORDs encode beyond that operand.

use crate::operand::ComponentMask;

numeric_enum! {
    /// System-value name (`D3D10_SB_NAME`).
    pub enum SystemName {
        Undefined = 0 => "undefined",
        Position = 1 => "position",
        ClipDistance = 2 => "clip_distance",
        CullDistance = 3 => "cull_distance",
        RenderTargetArrayIndex = 4 => "rendertarget_array_index",
        ViewportArrayIndex = 5 => "viewport_array_index",
        VertexId = 6 => "vertex_id",
        PrimitiveId = 7 => "primitive_id",
        InstanceId = 8 => "instance_id",
        IsFrontFace = 9 => "is_front_face",
        SampleIndex = 10 => "sampleIndex",
        FinalQuadEdgeTessFactor = 11 => "finalQuadUeq0EdgeTessFactor",
        FinalQuadInsideTessFactor = 12 => "finalQuadUInsideTessFactor",
        FinalTriEdgeTessFactor = 13 => "finalTriUeq0EdgeTessFactor",
        FinalTriInsideTessFactor = 14 => "finalTriInsideTessFactor",
        FinalLineDetailTessFactor = 15 => "finalLineDetailTessFactor",
        FinalLineDensityTessFactor = 16 => "finalLineDensityTessFactor",
    }
}

numeric_enum! {
    /// Pixel shader input interpolation mode (`D3D10_SB_INTERPOLATION_MODE`).
    pub enum InterpolationMode {
        Undefined = 0 => "undefined",
        Constant = 1 => "constant",
        Linear = 2 => "linear",
        LinearCentroid = 3 => "linear centroid",
        LinearNoPerspective = 4 => "linear noperspective",
        LinearNoPerspectiveCentroid = 5 => "linear noperspective centroid",
        LinearSample = 6 => "linear sample",
        LinearNoPerspectiveSample = 7 => "linear noperspective sample",
    }
}

numeric_enum! {
    /// Resource view dimension (`D3D10_SB_RESOURCE_DIMENSION`).
    pub enum ResourceDimension {
        Undefined = 0 => "unknown",
        Buffer = 1 => "buffer",
        Texture1D = 2 => "texture1d",
        Texture2D = 3 => "texture2d",
        Texture2DMs = 4 => "texture2dms",
        Texture3D = 5 => "texture3d",
        TextureCube = 6 => "texturecube",
        Texture1DArray = 7 => "texture1darray",
        Texture2DArray = 8 => "texture2darray",
        Texture2DMsArray = 9 => "texture2dmsarray",
        TextureCubeArray = 10 => "texturecubearray",
        RawBuffer = 11 => "raw_buffer",
        StructuredBuffer = 12 => "structured_buffer",
    }
}

numeric_enum! {
    /// Per-component resource return type (`D3D10_SB_RESOURCE_RETURN_TYPE`).
    pub enum ResourceReturnType {
        Unorm = 1 => "unorm",
        Snorm = 2 => "snorm",
        Sint = 3 => "sint",
        Uint = 4 => "uint",
        Float = 5 => "float",
        Mixed = 6 => "mixed",
        Double = 7 => "double",
        Continued = 8 => "continued",
        Unused = 9 => "unused",
    }
}

numeric_enum! {
    /// Sampler declaration mode (`D3D10_SB_SAMPLER_MODE`).
    pub enum SamplerMode {
        Default = 0 => "mode_default",
        Comparison = 1 => "mode_comparison",
        Mono = 2 => "mode_mono",
    }
}

numeric_enum! {
    /// `customdata` block class.
    pub enum CustomDataClass {
        Comment = 0 => "comment",
        DebugInfo = 1 => "debuginfo",
        Opaque = 2 => "opaque",
        ImmediateConstantBuffer = 3 => "dcl_immediateConstantBuffer",
        ShaderMessage = 4 => "shader_message",
        ClipPlaneConstantMappingsForDx9 = 5 => "clip_plane_constant_mappings_for_dx9",
    }
}

/// Decoded declaration payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `dcl_constantbuffer cb#[size]` / `CB#[lb:ub][size], space=N`.
    ConstantBuffer {
        /// Declared size in 16-byte (vec4) elements.
        size_in_vec4: u32,
        /// Register space (SM5.1; zero otherwise).
        space: u32,
        /// `dynamicIndexed` access pattern.
        dynamically_indexed: bool,
    },
    /// `dcl_sampler s#, mode`.
    Sampler {
        /// Sampler mode.
        mode: SamplerMode,
        /// Register space.
        space: u32,
    },
    /// `dcl_resource_<dim> (<types>) t#`.
    Resource {
        /// View dimension.
        dimension: ResourceDimension,
        /// Return type of each component.
        return_type: [ResourceReturnType; 4],
        /// Sample count for multisampled views.
        sample_count: u32,
        /// Register space.
        space: u32,
    },
    /// `dcl_resource_raw t#`.
    ResourceRaw {
        /// Register space.
        space: u32,
    },
    /// `dcl_resource_structured t#, stride`.
    ResourceStructured {
        /// Structure stride in bytes.
        stride: u32,
        /// Register space.
        space: u32,
    },
    /// `dcl_uav_typed_<dim> (<types>) u#`.
    UavTyped {
        /// View dimension.
        dimension: ResourceDimension,
        /// Return type of each component.
        return_type: [ResourceReturnType; 4],
        /// Raw UAV flag bits from the opcode token.
        flags: u32,
        /// Register space.
        space: u32,
    },
    /// `dcl_uav_raw u#`.
    UavRaw {
        /// Raw UAV flag bits from the opcode token.
        flags: u32,
        /// Register space.
        space: u32,
    },
    /// `dcl_uav_structured u#, stride`.
    UavStructured {
        /// Structure stride in bytes.
        stride: u32,
        /// Raw UAV flag bits from the opcode token.
        flags: u32,
        /// Register space.
        space: u32,
    },
    /// `dcl_temps N`.
    Temps {
        /// Number of `r#` registers.
        count: u32,
    },
    /// `dcl_indexableTemp x#[N], components`.
    IndexableTemp {
        /// Indexable temp array id (`x#`).
        index: u32,
        /// Number of registers in the array.
        register_count: u32,
        /// Components present in each register.
        mask: ComponentMask,
    },
    /// `dcl_thread_group x, y, z`.
    ThreadGroup {
        /// Thread-group size along x.
        x: u32,
        /// Thread-group size along y.
        y: u32,
        /// Thread-group size along z.
        z: u32,
    },
    /// `dcl_tgsm_raw g#, byte_count`.
    TgsmRaw {
        /// Size in bytes.
        byte_count: u32,
    },
    /// `dcl_tgsm_structured g#, stride, count`.
    TgsmStructured {
        /// Structure stride in bytes.
        stride: u32,
        /// Number of structures.
        count: u32,
    },
    /// `dcl_input v#` (also used for compute thread-id inputs).
    Input,
    /// `dcl_input_sgv` / `dcl_input_siv`.
    InputSystemValue {
        /// System value.
        name: SystemName,
    },
    /// `dcl_input_ps <interpolation> v#`.
    InputPs {
        /// Interpolation mode.
        interpolation: InterpolationMode,
    },
    /// `dcl_input_ps_sgv` / `dcl_input_ps_siv`.
    InputPsSystemValue {
        /// System value.
        name: SystemName,
        /// Interpolation mode.
        interpolation: InterpolationMode,
    },
    /// `dcl_output o#` (also `oDepth` and friends).
    Output,
    /// `dcl_output_sgv` / `dcl_output_siv`.
    OutputSystemValue {
        /// System value.
        name: SystemName,
    },
    /// `dcl_globalFlags`.
    GlobalFlags {
        /// Raw flag bits.
        flags: u32,
    },
    /// `dcl_indexrange v#, count`.
    IndexRange {
        /// Number of registers in the range.
        count: u32,
    },
    /// `customdata` block.
    CustomData {
        /// Block class.
        class: CustomDataClass,
        /// Payload DWORDs (excluding the opcode and length tokens).
        data: Vec<u32>,
    },
    /// A declaration whose payload is irrelevant to this model (tessellation, GS, ...).
    Other,
}
