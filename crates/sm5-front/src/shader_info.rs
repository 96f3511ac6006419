//! Passive record of everything a program declares.
//!
//! [`ShaderInfo`] is filled by the resolver while the CFG builder walks the instruction
//! stream and is read by the binding-table assembler afterwards. It never refers back to
//! instructions; every entry is plain data.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use sm5_ir::opcode::{
    UAV_FLAG_GLOBALLY_COHERENT, UAV_FLAG_HAS_ORDER_PRESERVING_COUNTER, UAV_FLAG_RASTERIZER_ORDERED,
};
use sm5_ir::{ComponentMask, ResourceDimension, SamplerMode};

/// Number of registers covered by a binding range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeSize {
    Bounded(u32),
    /// SM5.1 `[lower:*]` ranges (upper bound encoded as `u32::MAX`).
    Unbounded,
}

impl fmt::Display for RangeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Register range a declaration binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingRange {
    pub range_id: u32,
    pub lower_bound: u32,
    pub size: RangeSize,
    pub space: u32,
}

impl BindingRange {
    /// The SM5.0 form: one register, bound at its own id.
    pub const fn single(range_id: u32) -> Self {
        Self {
            range_id,
            lower_bound: range_id,
            size: RangeSize::Bounded(1),
            space: 0,
        }
    }
}

/// The four kinds of bindings that land in the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConstantBuffer,
    Sampler,
    ShaderResourceView,
    UnorderedAccessView,
}

impl ResourceKind {
    /// Register-file prefix used in binding names (`cb3`, `s0`, `t1`, `u2`).
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::ConstantBuffer => "cb",
            Self::Sampler => "s",
            Self::ShaderResourceView => "t",
            Self::UnorderedAccessView => "u",
        }
    }
}

/// Scalar element type of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Float,
    Int,
    Uint,
}

/// Memory layout of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewLayout {
    /// Texture or typed buffer.
    Typed,
    /// Byte-address buffer (4-byte elements).
    Raw,
    /// Structured buffer with the given byte stride.
    Structured { stride: u32 },
}

bitflags! {
    /// How the program touches a shader resource view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SrvUsage: u8 {
        const SAMPLED = 1 << 0;
        const COMPARED = 1 << 1;
    }
}

bitflags! {
    /// How the program touches an unordered access view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UavUsage: u8 {
        const READ = 1 << 0;
        const WRITTEN = 1 << 1;
    }
}

bitflags! {
    /// UAV declaration flags, at their opcode-token bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UavFlags: u32 {
        const GLOBALLY_COHERENT = UAV_FLAG_GLOBALLY_COHERENT;
        const RASTERIZER_ORDERED = UAV_FLAG_RASTERIZER_ORDERED;
        const HAS_ORDER_PRESERVING_COUNTER = UAV_FLAG_HAS_ORDER_PRESERVING_COUNTER;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBufferInfo {
    pub range: BindingRange,
    pub size_in_vec4: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerInfo {
    pub range: BindingRange,
    pub mode: SamplerMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderResourceViewInfo {
    pub range: BindingRange,
    pub dimension: ResourceDimension,
    pub component_type: ScalarType,
    pub layout: ViewLayout,
    pub usage: SrvUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnorderedAccessViewInfo {
    pub range: BindingRange,
    pub dimension: ResourceDimension,
    pub component_type: ScalarType,
    pub layout: ViewLayout,
    pub flags: UavFlags,
    pub usage: UavUsage,
}

/// Thread-group shared memory (`g#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadgroupMemoryInfo {
    /// Element stride in bytes (1 for raw declarations).
    pub stride: u32,
    /// Element count (bytes for raw declarations).
    pub count: u32,
    /// Total size in 32-bit words.
    pub size_in_uint: u32,
    pub structured: bool,
}

/// `dcl_indexableTemp x#[N], components`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexableTempInfo {
    pub register_count: u32,
    pub mask: ComponentMask,
}

/// Declarations collected over one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInfo {
    pub cbuffers: BTreeMap<u32, ConstantBufferInfo>,
    pub samplers: BTreeMap<u32, SamplerInfo>,
    pub srvs: BTreeMap<u32, ShaderResourceViewInfo>,
    pub uavs: BTreeMap<u32, UnorderedAccessViewInfo>,
    pub tgsm: BTreeMap<u32, ThreadgroupMemoryInfo>,
    pub indexable_temps: BTreeMap<u32, IndexableTempInfo>,
    pub temp_register_count: u32,
    /// `dcl_immediateConstantBuffer` rows.
    pub immediate_constants: Vec<[u32; 4]>,
    /// `dcl_thread_group` (compute only).
    pub thread_group_size: Option<[u32; 3]>,
    /// Every table binding in the order its declaration was encountered.
    pub binding_order: Vec<(ResourceKind, u32)>,
}

impl ShaderInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a binding of `kind` with `range_id` was declared.
    pub fn is_declared(&self, kind: ResourceKind, range_id: u32) -> bool {
        match kind {
            ResourceKind::ConstantBuffer => self.cbuffers.contains_key(&range_id),
            ResourceKind::Sampler => self.samplers.contains_key(&range_id),
            ResourceKind::ShaderResourceView => self.srvs.contains_key(&range_id),
            ResourceKind::UnorderedAccessView => self.uavs.contains_key(&range_id),
        }
    }

    /// Binding range of a declared table binding.
    pub fn range(&self, kind: ResourceKind, range_id: u32) -> Option<BindingRange> {
        match kind {
            ResourceKind::ConstantBuffer => self.cbuffers.get(&range_id).map(|i| i.range),
            ResourceKind::Sampler => self.samplers.get(&range_id).map(|i| i.range),
            ResourceKind::ShaderResourceView => self.srvs.get(&range_id).map(|i| i.range),
            ResourceKind::UnorderedAccessView => self.uavs.get(&range_id).map(|i| i.range),
        }
    }

    pub fn binding_count(&self) -> usize {
        self.binding_order.len()
    }
}
