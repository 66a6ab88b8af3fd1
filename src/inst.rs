//! Instruction records emitted by the code generator.
//!
//! A compiled expression is an ordered [`Program`] of [`Inst`] records. The
//! records are the compatibility surface; the `Display` impls render them as
//! AT&T-syntax x86 text (`movl $5, %eax`), which is what the demo driver
//! prints. Spill traffic uses plain `Move` records with a memory operand.

use std::fmt;

use crate::core::register_file::RegId;
use crate::core::symbols::SlotId;

/// Branch-target label, unique within one compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// Arithmetic opcode for the in-place `Arith` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
}

impl ArithOp {
    fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "addl",
            ArithOp::Sub => "subl",
        }
    }
}

/// Branch condition for `CondJump`, matching the flags set by `Compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl Cond {
    fn suffix(self) -> &'static str {
        match self {
            Cond::Eq => "e",
            Cond::Ne => "ne",
            Cond::Lt => "l",
            Cond::Gt => "g",
        }
    }
}

/// Instruction operand: a scratch register, an overflow slot, or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loc {
    Reg(RegId),
    Mem(SlotId),
    Imm(i32),
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Reg(reg) => write!(f, "{reg}"),
            Loc::Mem(slot) => write!(f, "{slot}"),
            Loc::Imm(value) => write!(f, "${value}"),
        }
    }
}

/// One emitted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
    Move { dst: Loc, src: Loc },
    Arith { op: ArithOp, dst: Loc, src: Loc },
    Compare { lhs: Loc, rhs: Loc },
    CondJump { cond: Cond, target: Label },
    Jump { target: Label },
    Label(Label),
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // AT&T operand order: source first.
            Inst::Move { dst, src } => write!(f, "\tmovl {src}, {dst}"),
            Inst::Arith { op, dst, src } => write!(f, "\t{} {src}, {dst}", op.mnemonic()),
            Inst::Compare { lhs, rhs } => write!(f, "\tcmpl {rhs}, {lhs}"),
            Inst::CondJump { cond, target } => write!(f, "\tj{} {target}", cond.suffix()),
            Inst::Jump { target } => write!(f, "\tjmp {target}"),
            Inst::Label(label) => write!(f, "{label}:"),
        }
    }
}

/// Ordered instruction stream produced by one compilation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    insts: Vec<Inst>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn as_slice(&self) -> &[Inst] {
        &self.insts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Inst> {
        self.insts.iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Inst;
    type IntoIter = std::slice::Iter<'a, Inst>;

    fn into_iter(self) -> Self::IntoIter {
        self.insts.iter()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.insts {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}
