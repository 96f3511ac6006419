//! Structured control-flow reconstruction.
//!
//! The token stream nests scopes implicitly (`if ... else ... endif`, `loop ... endloop`,
//! `switch ... case ... endswitch`). [`CfgBuilder`] keeps an explicit stack of open
//! scopes, each carrying the blocks its closing and branching opcodes jump to, and
//! appends everything else to the current block.

use std::collections::BTreeMap;

use sm5_ir::{Instruction, Opcode, Operand, OperandType, ShaderStage};
use tracing::trace;

use crate::cfg::{BlockId, BlockInst, Cfg, Condition, Terminator};
use crate::error::{DecodeError, InstructionLocation};

#[derive(Debug)]
enum Frame {
    If {
        alternative: BlockId,
        /// Set by `else`; without one the alternative block is the merge point.
        merge: Option<BlockId>,
    },
    Loop {
        entrance: BlockId,
        exit: BlockId,
    },
    Switch {
        dispatch: BlockId,
        exit: BlockId,
        selector: Operand,
        cases: BTreeMap<u32, BlockId>,
        default: Option<BlockId>,
    },
}

impl Frame {
    fn break_target(&self) -> Option<BlockId> {
        match self {
            Self::Loop { exit, .. } | Self::Switch { exit, .. } => Some(*exit),
            Self::If { .. } => None,
        }
    }

    fn continue_target(&self) -> Option<BlockId> {
        match self {
            Self::Loop { entrance, .. } => Some(*entrance),
            Self::If { .. } | Self::Switch { .. } => None,
        }
    }
}

/// Incremental CFG construction over one instruction stream.
#[derive(Debug)]
pub struct CfgBuilder<L> {
    cfg: Cfg<L>,
    current: BlockId,
    stack: Vec<Frame>,
    max_nesting: usize,
    returned: bool,
}

fn err(
    inst: &Instruction,
    location: InstructionLocation,
    message: impl Into<String>,
) -> DecodeError {
    let message = message.into();
    DecodeError::malformed(location, format!("{}: {message}", inst.opcode.name()))
}

fn condition(inst: &Instruction, location: InstructionLocation) -> Result<Condition, DecodeError> {
    let operand = inst
        .operand(0)
        .ok_or_else(|| err(inst, location, "missing condition operand"))?;
    Ok(Condition {
        operand: operand.clone(),
        test: inst.test,
    })
}

impl<L> CfgBuilder<L> {
    pub fn new(max_nesting: usize) -> Self {
        let cfg = Cfg::new();
        let current = cfg.entry();
        Self {
            cfg,
            current,
            stack: Vec::new(),
            max_nesting,
            returned: false,
        }
    }

    /// Whether the top-level `ret` has been seen.
    pub fn is_returned(&self) -> bool {
        self.returned
    }

    pub fn current(&self) -> BlockId {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Appends an instruction to the current block.
    pub fn append(&mut self, inst: L) {
        self.cfg.push(self.current, BlockInst::Lowered(inst));
    }

    /// Closes the current block with `terminator`.
    fn close(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        terminator: Terminator,
    ) -> Result<(), DecodeError> {
        self.cfg
            .terminate(self.current, terminator)
            .map_err(|e| err(inst, location, e.to_string()))
    }

    fn jump(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        target: BlockId,
    ) -> Result<(), DecodeError> {
        self.close(inst, location, Terminator::Unconditional(target))
    }

    /// `cond ? target : <fresh block>`, continuing in the fresh block.
    fn branch_out(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        target: BlockId,
        name: &'static str,
    ) -> Result<(), DecodeError> {
        let cond = condition(inst, location)?;
        let otherwise = self.cfg.add_block(name);
        self.close(
            inst,
            location,
            Terminator::Conditional {
                cond,
                if_true: target,
                if_false: otherwise,
            },
        )?;
        self.current = otherwise;
        Ok(())
    }

    fn push(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        frame: Frame,
    ) -> Result<(), DecodeError> {
        if self.stack.len() >= self.max_nesting {
            return Err(err(
                inst,
                location,
                format!(
                    "control flow nesting exceeds maximum {} levels",
                    self.max_nesting
                ),
            ));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn break_target(&self) -> Option<BlockId> {
        self.stack.iter().rev().find_map(Frame::break_target)
    }

    fn continue_target(&self) -> Option<BlockId> {
        self.stack.iter().rev().find_map(Frame::continue_target)
    }

    /// Handles one control-flow opcode (see [`Opcode::is_control_flow`]).
    pub fn control_flow(
        &mut self,
        inst: &Instruction,
        location: InstructionLocation,
        stage: ShaderStage,
    ) -> Result<(), DecodeError> {
        match inst.opcode {
            Opcode::If => {
                let cond = condition(inst, location)?;
                let if_true = self.cfg.add_block("if_true");
                let alternative = self.cfg.add_block("if_alternative");
                self.push(
                    inst,
                    location,
                    Frame::If {
                        alternative,
                        merge: None,
                    },
                )?;
                self.close(
                    inst,
                    location,
                    Terminator::Conditional {
                        cond,
                        if_true,
                        if_false: alternative,
                    },
                )?;
                self.current = if_true;
            }
            Opcode::Else => {
                let endif = match self.stack.last() {
                    Some(Frame::If { merge: None, .. }) => self.cfg.add_block("endif"),
                    Some(Frame::If { merge: Some(_), .. }) => {
                        return Err(err(inst, location, "second else for the same if"))
                    }
                    _ => return Err(err(inst, location, "else without matching if")),
                };
                self.jump(inst, location, endif)?;
                if let Some(Frame::If { alternative, merge }) = self.stack.last_mut() {
                    *merge = Some(endif);
                    self.current = *alternative;
                }
            }
            Opcode::EndIf => {
                let target = match self.stack.last() {
                    Some(&Frame::If { alternative, merge }) => merge.unwrap_or(alternative),
                    _ => return Err(err(inst, location, "endif without matching if")),
                };
                self.jump(inst, location, target)?;
                self.stack.pop();
                self.current = target;
            }
            Opcode::Loop => {
                let entrance = self.cfg.add_block("loop_entrance");
                let exit = self.cfg.add_block("endloop");
                self.push(inst, location, Frame::Loop { entrance, exit })?;
                self.jump(inst, location, entrance)?;
                self.current = entrance;
            }
            Opcode::EndLoop => {
                let (entrance, exit) = match self.stack.last() {
                    Some(&Frame::Loop { entrance, exit }) => (entrance, exit),
                    _ => return Err(err(inst, location, "endloop without matching loop")),
                };
                self.jump(inst, location, entrance)?;
                self.stack.pop();
                self.current = exit;
            }
            Opcode::Break => {
                let target = self
                    .break_target()
                    .ok_or_else(|| err(inst, location, "break outside of loop or switch"))?;
                self.jump(inst, location, target)?;
                self.current = self.cfg.add_block("after_break");
            }
            Opcode::Breakc => {
                let target = self
                    .break_target()
                    .ok_or_else(|| err(inst, location, "breakc outside of loop or switch"))?;
                self.branch_out(inst, location, target, "after_breakc")?;
            }
            Opcode::Continue => {
                let target = self
                    .continue_target()
                    .ok_or_else(|| err(inst, location, "continue outside of loop"))?;
                self.jump(inst, location, target)?;
                self.current = self.cfg.add_block("after_continue");
            }
            Opcode::Continuec => {
                let target = self
                    .continue_target()
                    .ok_or_else(|| err(inst, location, "continuec outside of loop"))?;
                self.branch_out(inst, location, target, "after_continuec")?;
            }
            Opcode::Switch => {
                let selector = inst
                    .operand(0)
                    .cloned()
                    .ok_or_else(|| err(inst, location, "missing selector operand"))?;
                let exit = self.cfg.add_block("endswitch");
                // Code between `switch` and the first `case` has no label; it is kept in
                // a block nothing dispatches to.
                let empty = self.cfg.add_block("switch_empty");
                self.push(
                    inst,
                    location,
                    Frame::Switch {
                        dispatch: self.current,
                        exit,
                        selector,
                        cases: BTreeMap::new(),
                        default: None,
                    },
                )?;
                self.current = empty;
            }
            Opcode::Case => {
                let value = case_value(inst, location)?;
                if !matches!(self.stack.last(), Some(Frame::Switch { .. })) {
                    return Err(err(inst, location, "case outside of switch"));
                }
                let body = self.cfg.add_block("switch_case");
                if let Some(Frame::Switch { cases, .. }) = self.stack.last_mut() {
                    if cases.insert(value, body).is_some() {
                        return Err(err(inst, location, format!("duplicate case {value}")));
                    }
                }
                // Fall through from the previous label.
                self.jump(inst, location, body)?;
                self.current = body;
            }
            Opcode::Default => {
                let body = match self.stack.last() {
                    Some(Frame::Switch { default: None, .. }) => {
                        self.cfg.add_block("switch_default")
                    }
                    Some(Frame::Switch { default: Some(_), .. }) => {
                        return Err(err(inst, location, "second default in the same switch"))
                    }
                    _ => return Err(err(inst, location, "default outside of switch")),
                };
                if let Some(Frame::Switch { default, .. }) = self.stack.last_mut() {
                    *default = Some(body);
                }
                self.jump(inst, location, body)?;
                self.current = body;
            }
            Opcode::EndSwitch => {
                let Some(Frame::Switch {
                    dispatch,
                    exit,
                    selector,
                    cases,
                    default,
                }) = self.stack.pop()
                else {
                    return Err(err(inst, location, "endswitch without matching switch"));
                };
                self.jump(inst, location, exit)?;
                trace!(cases = cases.len(), has_default = default.is_some(), "switch");
                self.cfg
                    .terminate(
                        dispatch,
                        Terminator::Switch {
                            selector,
                            cases,
                            default: default.unwrap_or(exit),
                        },
                    )
                    .map_err(|e| err(inst, location, e.to_string()))?;
                self.current = exit;
            }
            Opcode::Ret => {
                let exit = self.cfg.exit();
                self.jump(inst, location, exit)?;
                if self.stack.is_empty() {
                    self.returned = true;
                } else {
                    self.current = self.cfg.add_block("after_ret");
                }
            }
            Opcode::Retc => {
                let exit = self.cfg.exit();
                self.branch_out(inst, location, exit, "after_retc")?;
            }
            Opcode::Discard => {
                if stage != ShaderStage::Pixel {
                    return Err(DecodeError::unsupported(
                        location,
                        format!("{}: only valid in pixel shaders", inst.opcode.name()),
                    ));
                }
                let cond = condition(inst, location)?;
                let fulfilled = self.cfg.add_block("discard_fulfilled");
                let otherwise = self.cfg.add_block("discard_otherwise");
                self.cfg.push(fulfilled, BlockInst::PixelDiscard);
                self.cfg
                    .terminate(fulfilled, Terminator::Unconditional(otherwise))
                    .map_err(|e| err(inst, location, e.to_string()))?;
                self.close(
                    inst,
                    location,
                    Terminator::Conditional {
                        cond,
                        if_true: fulfilled,
                        if_false: otherwise,
                    },
                )?;
                self.current = otherwise;
            }
            other => {
                return Err(err(
                    inst,
                    location,
                    format!("{} is not a control flow opcode", other.name()),
                ))
            }
        }
        Ok(())
    }

    /// Returns the graph once the top-level `ret` has been seen.
    pub fn finish(self, end: InstructionLocation) -> Result<Cfg<L>, DecodeError> {
        if !self.returned {
            return Err(DecodeError::malformed(end, "unexpected end of shader"));
        }
        trace!(blocks = self.cfg.len(), "control flow graph built");
        Ok(self.cfg)
    }
}

/// The 1-component immediate of a `case` label.
fn case_value(inst: &Instruction, location: InstructionLocation) -> Result<u32, DecodeError> {
    match inst.operand(0) {
        Some(op) if op.ty == OperandType::Immediate32 && op.num_components == 1 => {
            Ok(op.immediate[0])
        }
        _ => Err(err(inst, location, "case label must be a scalar immediate")),
    }
}
