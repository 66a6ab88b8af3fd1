// This module defines error types for expression compilation using the thiserror crate
// for idiomatic Rust error handling. CompileError is the main error enum covering the
// failure scenarios of the generator and allocator: duplicate variable declarations,
// references to undeclared variables, operand sets that exceed the scratch register
// pool, and release of an already-dead symbol. Each variant carries relevant context
// (variable names, symbol ids) for debugging. The module also provides CompileResult<T>
// as a convenience type alias for Result<T, CompileError>. These error types enable
// proper error propagation throughout the generator with descriptive error messages via
// the Display trait implementation provided by thiserror.

//! Error types for expression compilation.
//!
//! Using thiserror for idiomatic error handling. The first three variants
//! are recoverable compile errors that propagate to the compilation entry
//! point; `ReleaseOfDeadSymbol` signals a bug in the generator itself and is
//! only surfaced so the allocator never corrupts state over it.

use thiserror::Error;

use crate::core::symbols::SymbolId;

/// Main error type for expression compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("duplicate declaration of variable `{0}`")]
    DuplicateDeclaration(String),

    #[error("use of undeclared variable `{0}`")]
    UndefinedVariable(String),

    #[error("operand set exceeds the scratch register pool")]
    RegisterExhaustion,

    #[error("release of dead symbol {0:?}")]
    ReleaseOfDeadSymbol(SymbolId),
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
