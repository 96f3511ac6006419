//! Prelogue/epilogue effects.
//!
//! IO declarations do not touch the generated function directly. Each one records a
//! tagged descriptor bound to the argument or output index it was assigned; the code
//! generator replays the lists through [`run_prelogue`] (at function entry) and
//! [`run_epilogue`] (in the return block) against its own [`FunctionContext`].

use sm5_ir::ComponentMask;
use tracing::trace;

use crate::error::EffectError;

/// Compute-stage builtin arguments that are bound to the context instead of copied into
/// the input register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeBuiltin {
    ThreadPositionInGrid,
    ThreadgroupPositionInGrid,
    ThreadPositionInThreadgroup,
    ThreadIndexInThreadgroup,
}

/// Work done at function entry, before the entry block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrelogueEffect {
    /// `input[register].mask = argument(value) - argument(base)`.
    ///
    /// Vertex and instance ids are exposed to the shader relative to the draw's base.
    StoreRelativeId {
        value: u32,
        base: u32,
        register: u32,
        mask: ComponentMask,
    },
    /// `input[register].mask = argument(argument)`.
    InitInputRegister {
        argument: u32,
        register: u32,
        mask: ComponentMask,
    },
    BindComputeBuiltin {
        argument: u32,
        builtin: ComputeBuiltin,
    },
    /// Reserves the scalar slot `oDepth` writes go to.
    AllocateDepthOutput,
}

/// Work done in the return block to build the return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpilogueEffect {
    /// `ret[output] = output_register[register].mask`.
    PopOutputRegister {
        register: u32,
        mask: ComponentMask,
        output: u32,
    },
    /// `ret[output] = depth_slot`.
    PopDepthOutput { output: u32 },
}

/// Operations the code generator provides for effect replay.
pub trait FunctionContext {
    type Value: Clone;

    fn argument(&mut self, index: u32) -> Result<Self::Value, EffectError>;
    fn sub(&mut self, lhs: Self::Value, rhs: Self::Value) -> Self::Value;
    fn store_input_register(&mut self, register: u32, mask: ComponentMask, value: Self::Value);
    fn bind_compute_builtin(&mut self, builtin: ComputeBuiltin, value: Self::Value);
    fn allocate_depth_output(&mut self) -> Result<(), EffectError>;
    fn load_depth_output(&mut self) -> Result<Self::Value, EffectError>;
    fn load_output_register(&mut self, register: u32, mask: ComponentMask) -> Self::Value;
    fn insert_return_value(
        &mut self,
        aggregate: Self::Value,
        position: u32,
        value: Self::Value,
    ) -> Self::Value;

    /// The initial return aggregate; `None` for functions returning nothing.
    fn undefined_return(&mut self) -> Option<Self::Value>;
}

/// Replays `effects` in order.
pub fn run_prelogue<C: FunctionContext>(
    ctx: &mut C,
    effects: &[PrelogueEffect],
) -> Result<(), EffectError> {
    for effect in effects {
        trace!(?effect, "prelogue");
        match *effect {
            PrelogueEffect::StoreRelativeId {
                value,
                base,
                register,
                mask,
            } => {
                let value = ctx.argument(value)?;
                let base = ctx.argument(base)?;
                let relative = ctx.sub(value, base);
                ctx.store_input_register(register, mask, relative);
            }
            PrelogueEffect::InitInputRegister {
                argument,
                register,
                mask,
            } => {
                let value = ctx.argument(argument)?;
                ctx.store_input_register(register, mask, value);
            }
            PrelogueEffect::BindComputeBuiltin { argument, builtin } => {
                let value = ctx.argument(argument)?;
                ctx.bind_compute_builtin(builtin, value);
            }
            PrelogueEffect::AllocateDepthOutput => ctx.allocate_depth_output()?,
        }
    }
    Ok(())
}

/// Replays `effects` in order, threading the return aggregate through them.
///
/// Returns the final aggregate, or `None` when the function returns nothing.
pub fn run_epilogue<C: FunctionContext>(
    ctx: &mut C,
    effects: &[EpilogueEffect],
) -> Result<Option<C::Value>, EffectError> {
    let mut aggregate = ctx.undefined_return();
    for effect in effects {
        trace!(?effect, "epilogue");
        let current = aggregate.take().ok_or(EffectError::VoidReturn)?;
        let (position, value) = match *effect {
            EpilogueEffect::PopOutputRegister {
                register,
                mask,
                output,
            } => (output, ctx.load_output_register(register, mask)),
            EpilogueEffect::PopDepthOutput { output } => (output, ctx.load_depth_output()?),
        };
        aggregate = Some(ctx.insert_return_value(current, position, value));
    }
    Ok(aggregate)
}
