use crate::operand::ComponentMask;

numeric_enum! {
    /// Component type recorded in a signature element (`D3D_REGISTER_COMPONENT_TYPE`).
    pub enum RegisterComponentType {
        Unspecified = 0 => "unknown",
        Uint32 = 1 => "uint",
        Sint32 = 2 => "int",
        Float32 = 3 => "float",
    }
}

/// One `ISGN`/`OSGN` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureElement {
    /// Semantic name (`TEXCOORD`, `SV_Position`, ...).
    pub semantic_name: String,
    /// Semantic index.
    pub semantic_index: u32,
    /// Register the element is packed into.
    pub register: u32,
    /// Components of the register the element occupies.
    pub mask: ComponentMask,
    /// Component type.
    pub component_type: RegisterComponentType,
    /// Raw `D3D_NAME` system value (zero for user semantics).
    pub system_value: u32,
}

impl SignatureElement {
    /// A user-semantic float element.
    pub fn new(
        semantic_name: impl Into<String>,
        semantic_index: u32,
        register: u32,
        mask: ComponentMask,
    ) -> Self {
        Self {
            semantic_name: semantic_name.into(),
            semantic_index,
            register,
            mask,
            component_type: RegisterComponentType::Float32,
            system_value: 0,
        }
    }

    /// Replaces the component type.
    pub fn with_component_type(mut self, component_type: RegisterComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    /// `NAME` followed by the semantic index, e.g. `TEXCOORD3`.
    pub fn full_semantic(&self) -> String {
        format!("{}{}", self.semantic_name, self.semantic_index)
    }
}

/// Input and output signatures of one shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSignatures {
    /// `ISGN` elements.
    pub inputs: Vec<SignatureElement>,
    /// `OSGN` elements.
    pub outputs: Vec<SignatureElement>,
}

impl ShaderSignatures {
    /// Finds the input element packed into `register` that overlaps `mask`.
    pub fn find_input(&self, register: u32, mask: ComponentMask) -> Option<&SignatureElement> {
        find(&self.inputs, register, mask)
    }

    /// Finds the output element packed into `register` that overlaps `mask`.
    pub fn find_output(&self, register: u32, mask: ComponentMask) -> Option<&SignatureElement> {
        find(&self.outputs, register, mask)
    }
}

fn find(
    elements: &[SignatureElement],
    register: u32,
    mask: ComponentMask,
) -> Option<&SignatureElement> {
    elements
        .iter()
        .find(|e| e.register == register && e.mask.intersects(mask))
}
