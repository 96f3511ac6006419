//! Resource binding resolver.
//!
//! Turns `dcl_*` resource declarations into [`ShaderInfo`] entries. Both operand
//! encodings are accepted:
//!
//! - SM4/SM5.0: `t3`, `s1`, `u0` (1-D) and `cb2[16]` (2-D). The range id is the binding
//!   register; the range has size 1 in space 0.
//! - SM5.1: `T3[2:5], space=1` (3-D: range id, lower bound, upper bound). An upper bound
//!   of `u32::MAX` means the range is unbounded.

use sm5_ir::{
    CustomDataClass, Declaration, IndexDimension, Instruction, Opcode, Operand, OperandIndex,
    ResourceDimension, ResourceReturnType, SamplerMode, ShaderStage,
};
use tracing::{debug, trace};

use crate::error::{DecodeError, InstructionLocation};
use crate::shader_info::{
    BindingRange, ConstantBufferInfo, IndexableTempInfo, RangeSize, ResourceKind, SamplerInfo,
    ScalarType, ShaderInfo, ShaderResourceViewInfo, SrvUsage, ThreadgroupMemoryInfo, UavFlags,
    UavUsage, UnorderedAccessViewInfo, ViewLayout,
};

/// Whether `opcode` is handled by [`resolve`] rather than by the IO declaration handler.
pub fn is_resource_declaration(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::DclConstantBuffer
            | Opcode::DclSampler
            | Opcode::DclResource
            | Opcode::DclResourceRaw
            | Opcode::DclResourceStructured
            | Opcode::DclUavTyped
            | Opcode::DclUavRaw
            | Opcode::DclUavStructured
            | Opcode::DclTemps
            | Opcode::DclIndexableTemp
            | Opcode::DclThreadGroup
            | Opcode::DclTgsmRaw
            | Opcode::DclTgsmStructured
            | Opcode::DclGlobalFlags
            | Opcode::DclIndexRange
            | Opcode::CustomData
    )
}

/// Records one resource declaration in `info`.
pub fn resolve(
    info: &mut ShaderInfo,
    stage: ShaderStage,
    inst: &Instruction,
    location: InstructionLocation,
) -> Result<(), DecodeError> {
    let malformed = |msg: String| DecodeError::malformed(location, msg);
    let payload = || {
        inst.decl.as_ref().ok_or_else(|| {
            DecodeError::malformed(
                location,
                format!("{} is missing its declaration payload", inst.opcode.name()),
            )
        })
    };

    match (inst.opcode, payload()?) {
        (
            Opcode::DclConstantBuffer,
            &Declaration::ConstantBuffer {
                size_in_vec4,
                space,
                ..
            },
        ) => {
            let operand = operand0(inst, location)?;
            let range = binding_range(operand, IndexDimension::D2, space, location)?;
            declare(info, ResourceKind::ConstantBuffer, range.range_id, location)?;
            trace!(
                range_id = range.range_id,
                lower_bound = range.lower_bound,
                size = %range.size,
                size_in_vec4,
                "constant buffer"
            );
            info.cbuffers.insert(
                range.range_id,
                ConstantBufferInfo {
                    range,
                    size_in_vec4,
                },
            );
        }
        (Opcode::DclSampler, &Declaration::Sampler { mode, space }) => {
            if let SamplerMode::Unknown(raw) = mode {
                return Err(malformed(format!("invalid sampler mode {raw}")));
            }
            let operand = operand0(inst, location)?;
            let range = binding_range(operand, IndexDimension::D1, space, location)?;
            declare(info, ResourceKind::Sampler, range.range_id, location)?;
            trace!(range_id = range.range_id, %mode, "sampler");
            info.samplers.insert(range.range_id, SamplerInfo { range, mode });
        }
        (
            Opcode::DclResource,
            &Declaration::Resource {
                dimension,
                return_type,
                space,
                ..
            },
        ) => {
            let dimension = view_dimension(dimension, location)?;
            let component_type = scalar_type(return_type[0], location)?;
            declare_srv(info, inst, location, space, dimension, component_type, ViewLayout::Typed)?;
        }
        (Opcode::DclResourceRaw, &Declaration::ResourceRaw { space }) => {
            declare_srv(
                info,
                inst,
                location,
                space,
                ResourceDimension::RawBuffer,
                ScalarType::Uint,
                ViewLayout::Raw,
            )?;
        }
        (Opcode::DclResourceStructured, &Declaration::ResourceStructured { stride, space }) => {
            declare_srv(
                info,
                inst,
                location,
                space,
                ResourceDimension::StructuredBuffer,
                ScalarType::Uint,
                ViewLayout::Structured { stride },
            )?;
        }
        (
            Opcode::DclUavTyped,
            &Declaration::UavTyped {
                dimension,
                return_type,
                flags,
                space,
            },
        ) => {
            let dimension = view_dimension(dimension, location)?;
            let component_type = scalar_type(return_type[0], location)?;
            let view = UavDecl {
                dimension,
                component_type,
                layout: ViewLayout::Typed,
                flags,
                space,
            };
            declare_uav(info, inst, location, view)?;
        }
        (Opcode::DclUavRaw, &Declaration::UavRaw { flags, space }) => {
            let view = UavDecl {
                dimension: ResourceDimension::RawBuffer,
                component_type: ScalarType::Uint,
                layout: ViewLayout::Raw,
                flags,
                space,
            };
            declare_uav(info, inst, location, view)?;
        }
        (
            Opcode::DclUavStructured,
            &Declaration::UavStructured {
                stride,
                flags,
                space,
            },
        ) => {
            let view = UavDecl {
                dimension: ResourceDimension::StructuredBuffer,
                component_type: ScalarType::Uint,
                layout: ViewLayout::Structured { stride },
                flags,
                space,
            };
            declare_uav(info, inst, location, view)?;
        }
        (Opcode::DclTemps, &Declaration::Temps { count }) => {
            info.temp_register_count = count;
        }
        (
            Opcode::DclIndexableTemp,
            &Declaration::IndexableTemp {
                index,
                register_count,
                mask,
            },
        ) => {
            if info.indexable_temps.contains_key(&index) {
                return Err(malformed(format!("x{index} is declared twice")));
            }
            info.indexable_temps.insert(
                index,
                IndexableTempInfo {
                    register_count,
                    mask,
                },
            );
        }
        (Opcode::DclThreadGroup, &Declaration::ThreadGroup { x, y, z }) => {
            require_compute(stage, inst, location)?;
            if x == 0 || y == 0 || z == 0 {
                return Err(malformed(format!(
                    "thread group size {x}x{y}x{z} has a zero dimension"
                )));
            }
            if info.thread_group_size.is_some() {
                return Err(malformed("thread group size is declared twice".into()));
            }
            info.thread_group_size = Some([x, y, z]);
        }
        (Opcode::DclTgsmRaw, &Declaration::TgsmRaw { byte_count }) => {
            require_compute(stage, inst, location)?;
            if byte_count % 4 != 0 {
                return Err(malformed(format!(
                    "raw thread group shared memory size {byte_count} is not a multiple of 4"
                )));
            }
            declare_tgsm(
                info,
                inst,
                location,
                ThreadgroupMemoryInfo {
                    stride: 1,
                    count: byte_count,
                    size_in_uint: byte_count / 4,
                    structured: false,
                },
            )?;
        }
        (Opcode::DclTgsmStructured, &Declaration::TgsmStructured { stride, count }) => {
            require_compute(stage, inst, location)?;
            if stride % 4 != 0 {
                return Err(malformed(format!(
                    "structured thread group shared memory stride {stride} is not a multiple of 4"
                )));
            }
            let size_in_uint = (stride / 4).checked_mul(count).ok_or_else(|| {
                malformed(format!("thread group shared memory {stride}x{count} overflows"))
            })?;
            declare_tgsm(
                info,
                inst,
                location,
                ThreadgroupMemoryInfo {
                    stride,
                    count,
                    size_in_uint,
                    structured: true,
                },
            )?;
        }
        (Opcode::DclGlobalFlags, &Declaration::GlobalFlags { flags }) => {
            trace!(flags, "global flags");
        }
        (Opcode::DclIndexRange, &Declaration::IndexRange { count }) => {
            trace!(count, "index range");
        }
        (Opcode::CustomData, Declaration::CustomData { class, data }) => match class {
            CustomDataClass::ImmediateConstantBuffer => {
                if data.len() % 4 != 0 {
                    return Err(malformed(format!(
                        "immediate constant buffer of {} bytes is not whole 16-byte rows",
                        data.len() * 4
                    )));
                }
                if !info.immediate_constants.is_empty() {
                    return Err(malformed("immediate constant buffer is declared twice".into()));
                }
                info.immediate_constants = data
                    .chunks_exact(4)
                    .map(|row| [row[0], row[1], row[2], row[3]])
                    .collect();
            }
            other => debug!(class = %other, dwords = data.len(), "ignoring customdata block"),
        },
        (opcode, decl) => {
            return Err(malformed(format!(
                "{} carries an unexpected payload {decl:?}",
                opcode.name()
            )));
        }
    }

    Ok(())
}

fn operand0(inst: &Instruction, location: InstructionLocation) -> Result<&Operand, DecodeError> {
    inst.operand(0).ok_or_else(|| {
        DecodeError::malformed(
            location,
            format!("{} has no declared operand", inst.opcode.name()),
        )
    })
}

/// Decodes the binding range of a declared operand.
///
/// `legacy` is the index dimension of the pre-5.1 form for this register file.
fn binding_range(
    operand: &Operand,
    legacy: IndexDimension,
    space: u32,
    location: InstructionLocation,
) -> Result<BindingRange, DecodeError> {
    match operand.index {
        OperandIndex::D1(id) if legacy == IndexDimension::D1 => Ok(BindingRange::single(id)),
        OperandIndex::D2(id, _) if legacy == IndexDimension::D2 => Ok(BindingRange::single(id)),
        OperandIndex::D3(range_id, lower_bound, upper_bound) => {
            let size = if upper_bound == u32::MAX {
                RangeSize::Unbounded
            } else if upper_bound < lower_bound {
                return Err(DecodeError::malformed(
                    location,
                    format!("binding range [{lower_bound}:{upper_bound}] is inverted"),
                ));
            } else {
                RangeSize::Bounded(upper_bound - lower_bound + 1)
            };
            Ok(BindingRange {
                range_id,
                lower_bound,
                size,
                space,
            })
        }
        other => Err(DecodeError::malformed(
            location,
            format!(
                "{}: unexpected index dimension {:?} for a resource declaration",
                operand.ty,
                other.dimension()
            ),
        )),
    }
}

/// Appends `(kind, range_id)` to the declaration order, rejecting duplicates.
fn declare(
    info: &mut ShaderInfo,
    kind: ResourceKind,
    range_id: u32,
    location: InstructionLocation,
) -> Result<(), DecodeError> {
    if info.is_declared(kind, range_id) {
        return Err(DecodeError::malformed(
            location,
            format!("{}{range_id} is declared twice", kind.prefix()),
        ));
    }
    info.binding_order.push((kind, range_id));
    Ok(())
}

fn declare_srv(
    info: &mut ShaderInfo,
    inst: &Instruction,
    location: InstructionLocation,
    space: u32,
    dimension: ResourceDimension,
    component_type: ScalarType,
    layout: ViewLayout,
) -> Result<(), DecodeError> {
    let range = binding_range(operand0(inst, location)?, IndexDimension::D1, space, location)?;
    declare(info, ResourceKind::ShaderResourceView, range.range_id, location)?;
    trace!(range_id = range.range_id, %dimension, ?layout, "shader resource view");
    info.srvs.insert(
        range.range_id,
        ShaderResourceViewInfo {
            range,
            dimension,
            component_type,
            layout,
            usage: SrvUsage::empty(),
        },
    );
    Ok(())
}

struct UavDecl {
    dimension: ResourceDimension,
    component_type: ScalarType,
    layout: ViewLayout,
    flags: u32,
    space: u32,
}

fn declare_uav(
    info: &mut ShaderInfo,
    inst: &Instruction,
    location: InstructionLocation,
    view: UavDecl,
) -> Result<(), DecodeError> {
    let range = binding_range(operand0(inst, location)?, IndexDimension::D1, view.space, location)?;
    declare(info, ResourceKind::UnorderedAccessView, range.range_id, location)?;
    let flags = UavFlags::from_bits_truncate(view.flags);
    trace!(range_id = range.range_id, dimension = %view.dimension, ?flags, "unordered access view");
    info.uavs.insert(
        range.range_id,
        UnorderedAccessViewInfo {
            range,
            dimension: view.dimension,
            component_type: view.component_type,
            layout: view.layout,
            flags,
            usage: UavUsage::empty(),
        },
    );
    Ok(())
}

fn declare_tgsm(
    info: &mut ShaderInfo,
    inst: &Instruction,
    location: InstructionLocation,
    tgsm: ThreadgroupMemoryInfo,
) -> Result<(), DecodeError> {
    let id = operand0(inst, location)?
        .register_index()
        .ok_or_else(|| DecodeError::malformed(location, "g# declaration without an index"))?;
    if info.tgsm.contains_key(&id) {
        return Err(DecodeError::malformed(location, format!("g{id} is declared twice")));
    }
    trace!(
        id,
        size_in_uint = tgsm.size_in_uint,
        structured = tgsm.structured,
        "thread group shared memory"
    );
    info.tgsm.insert(id, tgsm);
    Ok(())
}

fn require_compute(
    stage: ShaderStage,
    inst: &Instruction,
    location: InstructionLocation,
) -> Result<(), DecodeError> {
    if stage != ShaderStage::Compute {
        return Err(DecodeError::unsupported(
            location,
            format!("{} is only valid in compute shaders", inst.opcode.name()),
        ));
    }
    Ok(())
}

fn view_dimension(
    dimension: ResourceDimension,
    location: InstructionLocation,
) -> Result<ResourceDimension, DecodeError> {
    match dimension {
        ResourceDimension::Undefined | ResourceDimension::Unknown(_) => Err(
            DecodeError::malformed(location, format!("invalid resource dimension {dimension}")),
        ),
        other => Ok(other),
    }
}

fn scalar_type(
    ty: ResourceReturnType,
    location: InstructionLocation,
) -> Result<ScalarType, DecodeError> {
    match ty {
        ResourceReturnType::Float | ResourceReturnType::Unorm | ResourceReturnType::Snorm => {
            Ok(ScalarType::Float)
        }
        ResourceReturnType::Sint => Ok(ScalarType::Int),
        ResourceReturnType::Uint => Ok(ScalarType::Uint),
        ResourceReturnType::Unknown(raw) => Err(DecodeError::malformed(
            location,
            format!("invalid resource return type {raw}"),
        )),
        other => Err(DecodeError::unsupported(
            location,
            format!("resource return type {other}"),
        )),
    }
}
