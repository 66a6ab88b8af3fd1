//! Core compilation infrastructure.
//!
//! # Key Components
//!
//! ## Symbol Allocation (`symbols`)
//! - Symbol table with register/memory residency tracking
//! - Symmetric promotion and demotion with index-order eviction
//! - Growable overflow area for evicted values
//!
//! ## Register Pool (`register_file`)
//! - Fixed scratch register set with per-register ownership
//!
//! ## Variable Bindings (`bindings`)
//! - Flat declare-once name table over arena-interned names
//!
//! ## Session Management (`session`)
//! - Per-compilation state bundle and label counter
//! - Compilation statistics

pub mod bindings;
pub mod error;
pub mod register_file;
pub mod session;
pub mod symbols;

pub use bindings::BindingTable;
pub use error::{CompileError, CompileResult};
pub use register_file::{RegId, RegisterFile, SCRATCH_REGS};
pub use session::{Session, SessionStats};
pub use symbols::{AllocStats, Residency, SlotId, SymbolId, SymbolTable};
