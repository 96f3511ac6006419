//! Binding table assembly.
//!
//! Constant buffers, samplers, shader resource views and unordered access views are
//! not bound to individual slots. They are collected into one argument buffer, passed
//! to the entry point at [`ARGUMENT_BUFFER_BIND_INDEX`], with one entry per declaration
//! in the order the declarations appear. Source register numbers only name entries.

use sm5_ir::ResourceDimension;

use crate::shader_info::{ResourceKind, ScalarType, ShaderInfo, SrvUsage, UavUsage};
use crate::signature::ARGUMENT_BUFFER_BIND_INDEX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
    Sample,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingEntry {
    /// `cb<id>`, `s<id>`, `t<id>` or `u<id>`.
    pub name: String,
    pub kind: ResourceKind,
    pub range_id: u32,
    pub access: AccessMode,
    /// Element type; `None` for samplers. Constant buffers are `uint4` arrays.
    pub component_type: Option<ScalarType>,
    /// View dimension of SRVs and UAVs.
    pub dimension: Option<ResourceDimension>,
    /// SRV read through a comparison sampler (`sample_c`, `gather4_c`, ...).
    pub compared: bool,
    /// Position in the argument buffer.
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    entries: Vec<BindingEntry>,
}

impl BindingTable {
    pub fn entries(&self) -> &[BindingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, kind: ResourceKind, range_id: u32) -> Option<&BindingEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == kind && e.range_id == range_id)
    }

    /// The buffer location the table is bound at, if it has any entries.
    pub fn bind_index(&self) -> Option<u32> {
        (!self.is_empty()).then_some(ARGUMENT_BUFFER_BIND_INDEX)
    }
}

fn srv_access(usage: SrvUsage) -> AccessMode {
    if usage.contains(SrvUsage::SAMPLED) {
        AccessMode::Sample
    } else {
        AccessMode::Read
    }
}

fn uav_access(usage: UavUsage) -> AccessMode {
    match (usage.contains(UavUsage::READ), usage.contains(UavUsage::WRITTEN)) {
        (true, true) => AccessMode::ReadWrite,
        (false, true) => AccessMode::Write,
        _ => AccessMode::Read,
    }
}

/// Lays out every table binding of `info` in declaration order.
pub fn assemble(info: &ShaderInfo) -> BindingTable {
    let mut entries: Vec<BindingEntry> = Vec::with_capacity(info.binding_count());
    for &(kind, range_id) in &info.binding_order {
        let entry = |access, component_type, dimension, compared| BindingEntry {
            name: format!("{}{range_id}", kind.prefix()),
            kind,
            range_id,
            access,
            component_type,
            dimension,
            compared,
            index: entries.len() as u32,
        };
        let described = match kind {
            ResourceKind::ConstantBuffer => info
                .cbuffers
                .get(&range_id)
                .map(|_| entry(AccessMode::Read, Some(ScalarType::Uint), None, false)),
            ResourceKind::Sampler => info
                .samplers
                .get(&range_id)
                .map(|_| entry(AccessMode::Read, None, None, false)),
            ResourceKind::ShaderResourceView => info.srvs.get(&range_id).map(|srv| {
                entry(
                    srv_access(srv.usage),
                    Some(srv.component_type),
                    Some(srv.dimension),
                    srv.usage.contains(SrvUsage::COMPARED),
                )
            }),
            ResourceKind::UnorderedAccessView => info.uavs.get(&range_id).map(|uav| {
                entry(
                    uav_access(uav.usage),
                    Some(uav.component_type),
                    Some(uav.dimension),
                    false,
                )
            }),
        };
        if let Some(described) = described {
            entries.push(described);
        }
    }
    BindingTable { entries }
}

/// What the runtime needs to know to bind a compiled shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    /// `Some(30)` when the shader takes a binding table.
    pub argument_buffer_bind_index: Option<u32>,
    /// Table entries in argument-buffer order.
    pub arguments: Vec<(ResourceKind, u32)>,
    /// Compute shaders only.
    pub threadgroup_size: Option<[u32; 3]>,
}

impl ShaderReflection {
    pub fn new(table: &BindingTable, threadgroup_size: Option<[u32; 3]>) -> Self {
        Self {
            argument_buffer_bind_index: table.bind_index(),
            arguments: table
                .entries()
                .iter()
                .map(|e| (e.kind, e.range_id))
                .collect(),
            threadgroup_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_info::{
        BindingRange, SamplerInfo, ShaderResourceViewInfo, UavFlags, UnorderedAccessViewInfo,
        ViewLayout,
    };
    use pretty_assertions::assert_eq;
    use sm5_ir::SamplerMode;

    #[test]
    fn empty_table_has_no_slot() {
        let table = assemble(&ShaderInfo::new());
        assert!(table.is_empty());
        assert_eq!(table.bind_index(), None);
        assert_eq!(ShaderReflection::new(&table, None), ShaderReflection::default());
    }

    #[test]
    fn entries_carry_view_dimension() {
        let mut info = ShaderInfo::new();
        info.srvs.insert(
            1,
            ShaderResourceViewInfo {
                range: BindingRange::single(1),
                dimension: ResourceDimension::TextureCube,
                component_type: ScalarType::Float,
                layout: ViewLayout::Typed,
                usage: SrvUsage::SAMPLED | SrvUsage::COMPARED,
            },
        );
        info.samplers.insert(
            0,
            SamplerInfo {
                range: BindingRange::single(0),
                mode: SamplerMode::Comparison,
            },
        );
        info.uavs.insert(
            0,
            UnorderedAccessViewInfo {
                range: BindingRange::single(0),
                dimension: ResourceDimension::RawBuffer,
                component_type: ScalarType::Uint,
                layout: ViewLayout::Raw,
                flags: UavFlags::empty(),
                usage: UavUsage::WRITTEN,
            },
        );
        info.binding_order = vec![
            (ResourceKind::ShaderResourceView, 1),
            (ResourceKind::Sampler, 0),
            (ResourceKind::UnorderedAccessView, 0),
            // Never declared; skipped.
            (ResourceKind::ConstantBuffer, 4),
        ];

        let table = assemble(&info);
        assert_eq!(info.binding_count(), 4);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.entries()[0],
            BindingEntry {
                name: "t1".into(),
                kind: ResourceKind::ShaderResourceView,
                range_id: 1,
                access: AccessMode::Sample,
                component_type: Some(ScalarType::Float),
                dimension: Some(ResourceDimension::TextureCube),
                compared: true,
                index: 0,
            }
        );
        let sampler = table.get(ResourceKind::Sampler, 0).unwrap();
        assert_eq!((sampler.dimension, sampler.compared, sampler.index), (None, false, 1));
        let uav = table.get(ResourceKind::UnorderedAccessView, 0).unwrap();
        assert_eq!(uav.dimension, Some(ResourceDimension::RawBuffer));
        assert_eq!(uav.access, AccessMode::Write);
        assert_eq!(uav.index, 2);
    }

    #[test]
    fn uav_access_modes() {
        assert_eq!(uav_access(UavUsage::empty()), AccessMode::Read);
        assert_eq!(uav_access(UavUsage::READ), AccessMode::Read);
        assert_eq!(uav_access(UavUsage::WRITTEN), AccessMode::Write);
        assert_eq!(uav_access(UavUsage::all()), AccessMode::ReadWrite);
        assert_eq!(srv_access(SrvUsage::COMPARED | SrvUsage::SAMPLED), AccessMode::Sample);
        assert_eq!(srv_access(SrvUsage::empty()), AccessMode::Read);
    }
}
