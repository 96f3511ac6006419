//! Entry-point function signature assembled from IO declarations.
//!
//! Every declaration that needs a function argument or a return-value member defines it
//! here and receives its index; effects refer to arguments and outputs by that index.

use sm5_ir::{InterpolationMode, RegisterComponentType};

/// The reserved buffer location of the binding table argument.
pub const ARGUMENT_BUFFER_BIND_INDEX: u32 = 30;

/// Vector type of a user attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float4,
    Int4,
}

impl AttributeType {
    pub fn from_component_type(ty: RegisterComponentType) -> Self {
        match ty {
            RegisterComponentType::Float32 => Self::Float4,
            _ => Self::Int4,
        }
    }
}

/// Interpolation qualifier of a fragment input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    CenterPerspective,
    CenterNoPerspective,
    CentroidPerspective,
    CentroidNoPerspective,
    SamplePerspective,
    SampleNoPerspective,
    Flat,
}

impl Interpolation {
    /// Maps a declared interpolation mode; `None` for undefined modes.
    pub fn from_mode(mode: InterpolationMode) -> Option<Self> {
        Some(match mode {
            InterpolationMode::Constant => Self::Flat,
            InterpolationMode::Linear => Self::CenterPerspective,
            InterpolationMode::LinearCentroid => Self::CentroidPerspective,
            InterpolationMode::LinearNoPerspective => Self::CenterNoPerspective,
            InterpolationMode::LinearNoPerspectiveCentroid => Self::CentroidNoPerspective,
            InterpolationMode::LinearSample => Self::SamplePerspective,
            InterpolationMode::LinearNoPerspectiveSample => Self::SampleNoPerspective,
            InterpolationMode::Undefined | InterpolationMode::Unknown(_) => return None,
        })
    }

    pub fn is_perspective(self) -> bool {
        matches!(
            self,
            Self::CenterPerspective | Self::CentroidPerspective | Self::SamplePerspective
        )
    }
}

/// Conservative depth qualifier of a depth output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthArgument {
    Any,
    Greater,
    Less,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionInput {
    VertexId,
    BaseVertex,
    InstanceId,
    BaseInstance,
    SampleIndex,
    PrimitiveId,
    FrontFacing,
    VertexStageIn {
        attribute: u32,
        ty: AttributeType,
        name: String,
    },
    FragmentStageIn {
        name: String,
        ty: AttributeType,
        interpolation: Interpolation,
    },
    Position {
        interpolation: Interpolation,
    },
    RenderTargetArrayIndex,
    ViewportArrayIndex,
    ThreadPositionInGrid,
    ThreadgroupPositionInGrid,
    ThreadPositionInThreadgroup,
    ThreadIndexInThreadgroup,
    /// The binding table, bound at [`ARGUMENT_BUFFER_BIND_INDEX`].
    BindingTable {
        location: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionOutput {
    Position,
    Depth { argument: DepthArgument },
    RenderTarget { index: u32, ty: AttributeType },
    Vertex { name: String, ty: AttributeType },
}

/// Arguments and return-value members of the generated entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionSignature {
    inputs: Vec<FunctionInput>,
    outputs: Vec<FunctionOutput>,
}

impl FunctionSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument and returns its index.
    pub fn define_input(&mut self, input: FunctionInput) -> u32 {
        self.inputs.push(input);
        (self.inputs.len() - 1) as u32
    }

    /// Appends a return-value member and returns its position.
    pub fn define_output(&mut self, output: FunctionOutput) -> u32 {
        self.outputs.push(output);
        (self.outputs.len() - 1) as u32
    }

    pub fn inputs(&self) -> &[FunctionInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FunctionOutput] {
        &self.outputs
    }

    pub fn input(&self, index: u32) -> Option<&FunctionInput> {
        self.inputs.get(index as usize)
    }

    /// A function without outputs returns nothing.
    pub fn is_void(&self) -> bool {
        self.outputs.is_empty()
    }
}
