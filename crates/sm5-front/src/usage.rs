//! Resource usage tracking.
//!
//! The binding table's access modes depend on how views are used, which is only known
//! once the instruction stream has been seen. Every non-declaration instruction passes
//! through [`track_usage`] before it is lowered.

use sm5_ir::{Instruction, Opcode, OperandType};

use crate::error::{DecodeError, InstructionLocation};
use crate::shader_info::{ShaderInfo, SrvUsage, UavUsage};

fn srv_usage(opcode: Opcode) -> SrvUsage {
    match opcode {
        Opcode::Sample
        | Opcode::SampleL
        | Opcode::SampleD
        | Opcode::SampleB
        | Opcode::Gather4
        | Opcode::Gather4Po
        | Opcode::Lod => SrvUsage::SAMPLED,
        Opcode::SampleC | Opcode::SampleCLz | Opcode::Gather4C | Opcode::Gather4PoC => {
            SrvUsage::SAMPLED | SrvUsage::COMPARED
        }
        _ => SrvUsage::empty(),
    }
}

fn uav_usage(opcode: Opcode) -> UavUsage {
    match opcode {
        Opcode::LdUavTyped | Opcode::LdRaw | Opcode::LdStructured => UavUsage::READ,
        Opcode::StoreUavTyped | Opcode::StoreRaw | Opcode::StoreStructured => UavUsage::WRITTEN,
        Opcode::AtomicAnd
        | Opcode::AtomicOr
        | Opcode::AtomicXor
        | Opcode::AtomicCmpStore
        | Opcode::AtomicIadd
        | Opcode::AtomicImax
        | Opcode::AtomicImin
        | Opcode::AtomicUmax
        | Opcode::AtomicUmin
        | Opcode::ImmAtomicAlloc
        | Opcode::ImmAtomicConsume
        | Opcode::ImmAtomicIadd
        | Opcode::ImmAtomicAnd
        | Opcode::ImmAtomicOr
        | Opcode::ImmAtomicXor
        | Opcode::ImmAtomicExch
        | Opcode::ImmAtomicCmpExch
        | Opcode::ImmAtomicImax
        | Opcode::ImmAtomicImin
        | Opcode::ImmAtomicUmax
        | Opcode::ImmAtomicUmin => UavUsage::READ | UavUsage::WRITTEN,
        _ => UavUsage::empty(),
    }
}

/// Marks the views `inst` references and rejects references to undeclared ones.
pub fn track_usage(
    info: &mut ShaderInfo,
    inst: &Instruction,
    location: InstructionLocation,
) -> Result<(), DecodeError> {
    for operand in &inst.operands {
        let Some(range_id) = operand.register_index() else {
            continue;
        };
        match operand.ty {
            OperandType::Resource => {
                let srv = info.srvs.get_mut(&range_id).ok_or_else(|| {
                    DecodeError::malformed(location, format!("t{range_id} is not declared"))
                })?;
                srv.usage |= srv_usage(inst.opcode);
            }
            OperandType::UnorderedAccessView => {
                let uav = info.uavs.get_mut(&range_id).ok_or_else(|| {
                    DecodeError::malformed(location, format!("u{range_id} is not declared"))
                })?;
                uav.usage |= uav_usage(inst.opcode);
            }
            OperandType::Sampler if !info.samplers.contains_key(&range_id) => {
                return Err(DecodeError::malformed(
                    location,
                    format!("s{range_id} is not declared"),
                ));
            }
            OperandType::ThreadGroupSharedMemory if !info.tgsm.contains_key(&range_id) => {
                return Err(DecodeError::malformed(
                    location,
                    format!("g{range_id} is not declared"),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
