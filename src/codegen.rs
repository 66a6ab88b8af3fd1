// This module implements the recursive code generator that lowers expression trees to
// instruction streams. CodeGen walks a tree depth-first via eval, returning a Value for
// every subtree (Immediate for compile-time constants, Symbol for live intermediate
// values) and appending instructions to its Program. Variables are declared and
// resolved through the session binding table, with every read producing a mandatory
// fresh copy. Arithmetic uses four Immediate/Symbol templates that destructively reuse
// a symbol operand's register where one exists; comparisons constant-fold when both
// operands are immediate and otherwise emit a compare followed by a boolean diamond
// built from a fresh label pair. The compile function is the one-shot entry point over
// a fresh session, returning the finished Program together with the final Value, which
// the caller owns.

//! Recursive code generator.
//!
//! [`CodeGen::eval`] walks an expression tree depth-first, consulting the
//! session's symbol table for residency and the binding table for variable
//! names, and appends instructions to the program as it returns. Every
//! subtree evaluates to exactly one [`Value`]: either a compile-time
//! constant or a live symbol the producer must eventually release.

use crate::core::error::CompileResult;
use crate::core::register_file::RegId;
use crate::core::session::{Session, SessionStats};
use crate::core::symbols::SymbolId;
use crate::inst::{ArithOp, Cond, Inst, Loc, Program};
use crate::tree::{Expr, Operator};

/// Result of evaluating one subtree.
///
/// An `Immediate` carries no allocator resource. A `Symbol` is a live
/// intermediate value; whoever produced it releases it after its last use,
/// unless it is handed further up as the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Immediate(i32),
    Symbol(SymbolId),
}

/// Code generator over one compilation session.
#[derive(Debug, Default)]
pub struct CodeGen<'a> {
    session: Session<'a>,
    program: Program,
}

impl<'a> CodeGen<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator over a shrunk register pool, for pressure tests.
    pub fn with_registers(count: usize) -> Self {
        Self {
            session: Session::with_registers(count),
            program: Program::new(),
        }
    }

    pub fn session(&self) -> &Session<'a> {
        &self.session
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    /// Evaluate a subtree to a [`Value`], emitting its instructions.
    ///
    /// A returned `Symbol` is owned by the caller; release it with
    /// [`CodeGen::release`] after its last use.
    pub fn eval(&mut self, expr: &'a Expr<'a>) -> CompileResult<Value> {
        match *expr {
            Expr::Literal(value) => Ok(Value::Immediate(value)),
            Expr::Variable {
                name,
                declare,
                assign,
                subexpr,
            } => self.eval_variable(name, declare, assign, subexpr),
            Expr::Operation { op, lhs, rhs } if op.is_comparison() => {
                self.eval_compare(op, lhs, rhs)
            }
            Expr::Operation { op, lhs, rhs } => self.eval_arith(op, lhs, rhs),
        }
    }

    /// Release a symbol result that is no longer needed.
    pub fn release(&mut self, value: Value) -> CompileResult<()> {
        if let Value::Symbol(id) = value {
            self.session.symbols.release(id)?;
        }
        Ok(())
    }

    /// Pin a symbol into a register, e.g. to read a final result's
    /// location.
    pub fn pin_to_register(&mut self, id: SymbolId) -> CompileResult<RegId> {
        Ok(self.ensure(&[id])?[0])
    }

    fn ensure(&mut self, ids: &[SymbolId]) -> CompileResult<Vec<RegId>> {
        self.session.symbols.ensure_resident(ids, &mut self.program)
    }

    fn emit(&mut self, inst: Inst) {
        log::trace!("emit {inst:?}");
        self.program.push(inst);
    }

    fn eval_variable(
        &mut self,
        name: &'a str,
        declare: bool,
        assign: bool,
        subexpr: Option<&'a Expr<'a>>,
    ) -> CompileResult<Value> {
        let var = if declare {
            self.session.bindings.declare(name, &mut self.session.symbols)?
        } else {
            self.session.bindings.resolve(name)?
        };

        if assign {
            let sub = subexpr.expect("assignment carries a subexpression");
            match self.eval(sub)? {
                Value::Immediate(value) => {
                    let regs = self.ensure(&[var])?;
                    self.emit(Inst::Move {
                        dst: Loc::Reg(regs[0]),
                        src: Loc::Imm(value),
                    });
                }
                Value::Symbol(src) => {
                    let regs = self.ensure(&[var, src])?;
                    self.emit(Inst::Move {
                        dst: Loc::Reg(regs[0]),
                        src: Loc::Reg(regs[1]),
                    });
                    // The source was a freshly computed intermediate.
                    self.session.symbols.release(src)?;
                }
            }
        }

        // Every read returns a fresh copy, so in-place arithmetic on the
        // result cannot corrupt the variable's stored value.
        let copy = self.session.symbols.allocate();
        let regs = self.ensure(&[copy, var])?;
        self.emit(Inst::Move {
            dst: Loc::Reg(regs[0]),
            src: Loc::Reg(regs[1]),
        });
        Ok(Value::Symbol(copy))
    }

    fn eval_arith(
        &mut self,
        op: Operator,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> CompileResult<Value> {
        let op = arith_op(op);
        let a = self.eval(lhs)?;
        let b = self.eval(rhs)?;

        match (a, b) {
            // Immediates carry no storage, so materialize into a fresh
            // symbol; values are computed at run time.
            (Value::Immediate(x), Value::Immediate(y)) => {
                let result = self.session.symbols.allocate();
                let regs = self.ensure(&[result])?;
                self.emit(Inst::Move {
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Imm(x),
                });
                self.emit(Inst::Arith {
                    op,
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Imm(y),
                });
                Ok(Value::Symbol(result))
            }
            (Value::Immediate(x), Value::Symbol(b)) => {
                let result = self.session.symbols.allocate();
                let regs = self.ensure(&[result, b])?;
                self.emit(Inst::Move {
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Imm(x),
                });
                self.emit(Inst::Arith {
                    op,
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Reg(regs[1]),
                });
                self.session.symbols.release(b)?;
                Ok(Value::Symbol(result))
            }
            // A symbol operand's register doubles as the destination.
            (Value::Symbol(a), Value::Immediate(y)) => {
                let regs = self.ensure(&[a])?;
                self.emit(Inst::Arith {
                    op,
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Imm(y),
                });
                Ok(Value::Symbol(a))
            }
            (Value::Symbol(a), Value::Symbol(b)) => {
                let regs = self.ensure(&[a, b])?;
                self.emit(Inst::Arith {
                    op,
                    dst: Loc::Reg(regs[0]),
                    src: Loc::Reg(regs[1]),
                });
                self.session.symbols.release(b)?;
                Ok(Value::Symbol(a))
            }
        }
    }

    fn eval_compare(
        &mut self,
        op: Operator,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> CompileResult<Value> {
        let a = self.eval(lhs)?;
        let b = self.eval(rhs)?;

        // Both sides known at compile time: fold to a single move.
        if let (Value::Immediate(x), Value::Immediate(y)) = (a, b) {
            let truth = match op {
                Operator::Eq => x == y,
                Operator::Neq => x != y,
                Operator::Lt => x < y,
                Operator::Gt => x > y,
                Operator::Add | Operator::Sub => unreachable!("not a comparison"),
            };
            let result = self.session.symbols.allocate();
            let regs = self.ensure(&[result])?;
            self.emit(Inst::Move {
                dst: Loc::Reg(regs[0]),
                src: Loc::Imm(truth as i32),
            });
            return Ok(Value::Symbol(result));
        }

        // The compare wants its symbol operand first; when the operands
        // had to swap for that, order-sensitive conditions invert.
        let swapped = match (a, b) {
            (Value::Symbol(a), Value::Symbol(b)) => {
                let regs = self.ensure(&[a, b])?;
                self.emit(Inst::Compare {
                    lhs: Loc::Reg(regs[0]),
                    rhs: Loc::Reg(regs[1]),
                });
                self.session.symbols.release(a)?;
                self.session.symbols.release(b)?;
                false
            }
            (Value::Symbol(a), Value::Immediate(y)) => {
                let regs = self.ensure(&[a])?;
                self.emit(Inst::Compare {
                    lhs: Loc::Reg(regs[0]),
                    rhs: Loc::Imm(y),
                });
                self.session.symbols.release(a)?;
                false
            }
            (Value::Immediate(x), Value::Symbol(b)) => {
                let regs = self.ensure(&[b])?;
                self.emit(Inst::Compare {
                    lhs: Loc::Reg(regs[0]),
                    rhs: Loc::Imm(x),
                });
                self.session.symbols.release(b)?;
                true
            }
            (Value::Immediate(_), Value::Immediate(_)) => unreachable!("folded above"),
        };

        let result = self.session.symbols.allocate();
        let regs = self.ensure(&[result])?;
        let reg = regs[0];
        let (on_true, done) = self.session.fresh_label_pair();

        // Boolean diamond: the result holds exactly 0 or 1 on either path.
        self.emit(Inst::CondJump {
            cond: branch_cond(op, swapped),
            target: on_true,
        });
        self.emit(Inst::Move {
            dst: Loc::Reg(reg),
            src: Loc::Imm(0),
        });
        self.emit(Inst::Jump { target: done });
        self.emit(Inst::Label(on_true));
        self.emit(Inst::Move {
            dst: Loc::Reg(reg),
            src: Loc::Imm(1),
        });
        self.emit(Inst::Label(done));

        Ok(Value::Symbol(result))
    }
}

fn arith_op(op: Operator) -> ArithOp {
    match op {
        Operator::Add => ArithOp::Add,
        Operator::Sub => ArithOp::Sub,
        other => unreachable!("{other:?} is not arithmetic"),
    }
}

/// Branch condition for a comparison, inverted for order-sensitive
/// operators when the compare operands were swapped.
fn branch_cond(op: Operator, swapped: bool) -> Cond {
    match (op, swapped) {
        (Operator::Eq, _) => Cond::Eq,
        (Operator::Neq, _) => Cond::Ne,
        (Operator::Lt, false) | (Operator::Gt, true) => Cond::Lt,
        (Operator::Gt, false) | (Operator::Lt, true) => Cond::Gt,
        (Operator::Add | Operator::Sub, _) => unreachable!("not a comparison"),
    }
}

/// Compile a whole expression tree in a fresh session.
///
/// Returns the instruction stream together with the final value. A
/// `Symbol` result is owned by the caller: it is deliberately not
/// auto-released here, since the caller may still need its location (via
/// [`CodeGen::eval`] and [`CodeGen::pin_to_register`] when the session must
/// outlive the call).
pub fn compile<'a>(expr: &'a Expr<'a>) -> CompileResult<(Program, Value)> {
    let mut gen = CodeGen::new();
    let value = gen.eval(expr)?;
    log::debug!("compiled {} instructions", gen.program().len());
    Ok((gen.into_program(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ExprArena;

    #[test]
    fn test_literal_emits_nothing() {
        let arena = ExprArena::new();
        let mut gen = CodeGen::new();
        let value = gen.eval(arena.literal(42)).unwrap();
        assert_eq!(value, Value::Immediate(42));
        assert!(gen.program().is_empty());
    }

    #[test]
    fn test_compile_returns_unreleased_final_value() {
        let arena = ExprArena::new();

        // An immediate result carries no allocator resource.
        let (program, value) = compile(arena.literal(42)).unwrap();
        assert!(program.is_empty());
        assert_eq!(value, Value::Immediate(42));

        // A symbol result is handed to the caller, not auto-released.
        let expr = arena.binary(Operator::Add, arena.literal(2), arena.literal(3));
        let (_, value) = compile(expr).unwrap();
        assert!(matches!(value, Value::Symbol(_)));
    }

    #[test]
    fn test_add_of_literals_is_move_then_add() {
        let arena = ExprArena::new();
        let expr = arena.binary(Operator::Add, arena.literal(2), arena.literal(3));
        let (program, _) = compile(expr).unwrap();

        assert_eq!(program.len(), 2);
        assert!(matches!(
            program.as_slice()[0],
            Inst::Move {
                src: Loc::Imm(2),
                ..
            }
        ));
        assert!(matches!(
            program.as_slice()[1],
            Inst::Arith {
                op: ArithOp::Add,
                src: Loc::Imm(3),
                ..
            }
        ));
    }

    #[test]
    fn test_symbol_imm_reuses_operand_register() {
        let arena = ExprArena::new();
        // (1 + 2) - 4: the subtraction reuses the addition's register.
        let sum = arena.binary(Operator::Add, arena.literal(1), arena.literal(2));
        let expr = arena.binary(Operator::Sub, sum, arena.literal(4));

        let mut gen = CodeGen::new();
        let value = gen.eval(expr).unwrap();

        assert_eq!(gen.program().len(), 3);
        let Value::Symbol(result) = value else {
            panic!("expected a symbol result");
        };
        let reg = gen.pin_to_register(result).unwrap();
        match gen.program().as_slice()[2] {
            Inst::Arith {
                op: ArithOp::Sub,
                dst: Loc::Reg(dst),
                src: Loc::Imm(4),
            } => assert_eq!(dst, reg),
            other => panic!("unexpected instruction {other:?}"),
        }
    }

    #[test]
    fn test_comparison_folding() {
        let arena = ExprArena::new();
        let expr = arena.binary(Operator::Lt, arena.literal(3), arena.literal(7));
        let (program, _) = compile(expr).unwrap();

        assert_eq!(program.len(), 1);
        assert!(matches!(
            program.as_slice()[0],
            Inst::Move {
                src: Loc::Imm(1),
                ..
            }
        ));

        let expr = arena.binary(Operator::Lt, arena.literal(7), arena.literal(3));
        let (program, _) = compile(expr).unwrap();
        assert!(matches!(
            program.as_slice()[0],
            Inst::Move {
                src: Loc::Imm(0),
                ..
            }
        ));
    }

    #[test]
    fn test_swapped_compare_inverts_order_sensitive_conditions() {
        let arena = ExprArena::new();
        // 3 < x: the symbol goes first in the compare, so the branch
        // condition becomes "greater".
        let x = arena.variable(true, true, "x", Some(arena.literal(9)));
        let expr = arena.binary(Operator::Lt, arena.literal(3), x);
        let (program, _) = compile(expr).unwrap();

        let cond = program
            .iter()
            .find_map(|inst| match inst {
                Inst::CondJump { cond, .. } => Some(*cond),
                _ => None,
            })
            .expect("comparison emits a conditional jump");
        assert_eq!(cond, Cond::Gt);

        // Equality is direction-insensitive and stays as-is.
        let y = arena.variable(true, true, "y", Some(arena.literal(9)));
        let expr = arena.binary(Operator::Eq, arena.literal(3), y);
        let (program, _) = compile(expr).unwrap();
        let cond = program
            .iter()
            .find_map(|inst| match inst {
                Inst::CondJump { cond, .. } => Some(*cond),
                _ => None,
            })
            .unwrap();
        assert_eq!(cond, Cond::Eq);
    }

    #[test]
    fn test_error_propagation() {
        let arena = ExprArena::new();
        let mut gen = CodeGen::new();

        let undeclared = arena.variable(false, false, "y", None);
        assert_eq!(
            gen.eval(undeclared),
            Err(crate::core::CompileError::UndefinedVariable("y".into()))
        );

        let first = arena.variable(true, false, "x", None);
        let again = arena.variable(true, false, "x", None);
        gen.eval(first).unwrap();
        assert_eq!(
            gen.eval(again),
            Err(crate::core::CompileError::DuplicateDeclaration("x".into()))
        );
    }
}
