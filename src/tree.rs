//! Arena-backed expression tree.
//!
//! Trees arrive from an upstream builder (a parser, a test, the demo
//! driver) already constructed; the generator only walks them. Nodes and
//! variable names are allocated in a [`bumpalo`] arena owned by
//! [`ExprArena`], so a whole tree shares one lifetime and is freed in one
//! go. Constructors are arity-checked: a malformed tree is a contract
//! violation at construction time, never a generator error.

use bumpalo::Bump;

/// Expression operators. All are strictly binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Eq,
    Neq,
    Lt,
    Gt,
}

impl Operator {
    pub fn arity(self) -> usize {
        2
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Operator::Eq | Operator::Neq | Operator::Lt | Operator::Gt)
    }
}

/// One node of an expression tree. Immutable once built.
#[derive(Debug)]
pub enum Expr<'a> {
    Literal(i32),
    Variable {
        name: &'a str,
        declare: bool,
        assign: bool,
        subexpr: Option<&'a Expr<'a>>,
    },
    Operation {
        op: Operator,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    },
}

/// Arena owning the nodes and names of expression trees.
#[derive(Default)]
pub struct ExprArena {
    bump: Bump,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn literal(&self, value: i32) -> &Expr<'_> {
        self.bump.alloc(Expr::Literal(value))
    }

    /// Variable reference. `assign` requires a subexpression and nothing
    /// else may carry one.
    pub fn variable<'a>(
        &'a self,
        declare: bool,
        assign: bool,
        name: &str,
        subexpr: Option<&'a Expr<'a>>,
    ) -> &'a Expr<'a> {
        assert_eq!(
            assign,
            subexpr.is_some(),
            "assignment takes exactly one subexpression"
        );
        self.bump.alloc(Expr::Variable {
            name: self.bump.alloc_str(name),
            declare,
            assign,
            subexpr,
        })
    }

    /// Binary operation; arity is fixed by the signature.
    pub fn binary<'a>(
        &'a self,
        op: Operator,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> &'a Expr<'a> {
        self.bump.alloc(Expr::Operation { op, lhs, rhs })
    }

    /// List-shaped constructor matching the input contract; the operand
    /// count must equal the operator's arity.
    pub fn operation<'a>(&'a self, op: Operator, operands: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        assert_eq!(
            operands.len(),
            op.arity(),
            "{op:?} takes {} operands",
            op.arity()
        );
        self.binary(op, operands[0], operands[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shapes() {
        let arena = ExprArena::new();
        let five = arena.literal(5);
        let x = arena.variable(true, true, "x", Some(five));
        let expr = arena.binary(Operator::Add, x, arena.literal(1));

        match expr {
            Expr::Operation { op, lhs, .. } => {
                assert_eq!(*op, Operator::Add);
                assert!(matches!(lhs, Expr::Variable { name: "x", .. }));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_operation_list_constructor() {
        let arena = ExprArena::new();
        let expr = arena.operation(Operator::Lt, &[arena.literal(1), arena.literal(2)]);
        assert!(matches!(expr, Expr::Operation { op: Operator::Lt, .. }));
    }

    #[test]
    #[should_panic(expected = "takes 2 operands")]
    fn test_arity_mismatch_is_rejected_at_construction() {
        let arena = ExprArena::new();
        arena.operation(Operator::Add, &[arena.literal(1)]);
    }

    #[test]
    #[should_panic(expected = "exactly one subexpression")]
    fn test_assignment_without_subexpr_is_rejected() {
        let arena = ExprArena::new();
        arena.variable(true, true, "x", None);
    }
}
