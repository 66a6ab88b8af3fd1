//! etcc - expression-tree compiler core.
//!
//! Translates a small expression-tree IR (integer literals, variables with
//! declare/assign semantics, binary arithmetic and comparisons) into a
//! linear instruction stream over five scratch registers plus a growable
//! overflow area. The interesting part is the symbol allocator: every
//! intermediate value is a symbol whose storage moves between registers and
//! memory on demand, with index-order eviction when the pool runs dry.
//!
//! # Usage
//!
//! ```
//! use etcc::{compile, ExprArena, Operator};
//!
//! let arena = ExprArena::new();
//! let x = arena.variable(true, true, "x", Some(arena.literal(5)));
//! let expr = arena.binary(Operator::Add, x, arena.literal(1));
//!
//! let (program, result) = compile(expr).unwrap();
//! print!("{program}");
//! assert!(matches!(result, etcc::Value::Symbol(_)));
//! ```
//!
//! # Architecture
//!
//! - [`tree`] - arena-backed expression nodes and arity-checked builders
//! - [`core`] - symbol allocator, register pool, bindings, session state
//! - [`inst`] - instruction records and AT&T-syntax rendering
//! - [`codegen`] - the recursive generator and `compile` entry point

pub mod codegen;
pub mod core;
pub mod inst;
pub mod tree;

// Re-export the common surface.
pub use codegen::{compile, CodeGen, Value};
pub use core::{
    BindingTable, CompileError, CompileResult, RegId, Residency, Session, SessionStats, SlotId,
    SymbolId, SymbolTable,
};
pub use inst::{ArithOp, Cond, Inst, Label, Loc, Program};
pub use tree::{Expr, ExprArena, Operator};
