//! Front end of the SM4/SM5 shader translator.
//!
//! [`compile`] walks a decoded [`ShaderProgram`](sm5_ir::ShaderProgram) once and
//! produces:
//!
//! - a control-flow graph of basic blocks reconstructed from the structured
//!   `if`/`loop`/`switch` opcodes ([`cfg`], [`builder`]),
//! - the resolved resource declarations ([`ShaderInfo`]) and the binding table that
//!   collects them into one argument buffer at location
//!   [`ARGUMENT_BUFFER_BIND_INDEX`] ([`binding_table`]),
//! - the entry-point signature and the prelogue/epilogue effects that move system values
//!   and attributes between function arguments and the shader's register files
//!   ([`signature`], [`effect`]).
//!
//! Per-instruction lowering is supplied by the caller through [`InstructionLowering`].

pub mod binding_table;
pub mod builder;
pub mod cfg;
pub mod compile;
pub mod effect;
pub mod error;
pub mod io;
pub mod lower;
pub mod resolve;
pub mod shader_info;
pub mod signature;
pub mod usage;

pub use binding_table::{assemble, AccessMode, BindingEntry, BindingTable, ShaderReflection};
pub use cfg::{BasicBlock, BlockId, BlockInst, Cfg, Condition, Terminator};
pub use compile::{compile, CompileOptions, CompiledShader, DEFAULT_MAX_CONTROL_FLOW_NESTING};
pub use effect::{
    run_epilogue, run_prelogue, ComputeBuiltin, EpilogueEffect, FunctionContext, PrelogueEffect,
};
pub use error::{DecodeError, EffectError, InstructionLocation};
pub use lower::{InstructionLowering, Passthrough};
pub use shader_info::{
    BindingRange, RangeSize, ResourceKind, ScalarType, ShaderInfo, SrvUsage, UavFlags, UavUsage,
    ViewLayout,
};
pub use signature::{
    AttributeType, DepthArgument, FunctionInput, FunctionOutput, FunctionSignature,
    Interpolation, ARGUMENT_BUFFER_BIND_INDEX,
};
