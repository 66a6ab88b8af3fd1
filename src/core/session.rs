// This module defines the per-compilation Session object that bundles all mutable
// compilation state: the SymbolTable (registers and overflow slots), the variable
// BindingTable and the label counter used for branch targets. Sessions are constructed
// fresh for each compilation, either over the full scratch pool (new) or a shrunk pool
// for register-pressure tests (with_registers), and issue monotonically increasing
// labels via fresh_label/fresh_label_pair. SessionStats aggregates the allocator
// counters with the session-level ones (variables declared, labels issued) and carries
// a Display implementation for human-readable reporting in the demo driver.

//! Per-compilation session state.
//!
//! A [`Session`] bundles everything one compilation mutates: the symbol
//! table (registers, overflow slots), the variable binding table and the
//! label counter. Sessions are created fresh per compilation and discarded
//! afterwards; nothing here is process-wide, so independent compilations
//! never observe each other's register ownership or label numbers.

use std::fmt;

use crate::core::bindings::BindingTable;
use crate::core::symbols::SymbolTable;
use crate::inst::Label;

/// All mutable state of one compilation.
#[derive(Debug, Default)]
pub struct Session<'a> {
    pub symbols: SymbolTable,
    pub bindings: BindingTable<'a>,
    next_label: u32,
}

impl<'a> Session<'a> {
    /// Session over the full scratch register pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session over a shrunk register pool, for pressure tests.
    pub fn with_registers(count: usize) -> Self {
        Self {
            symbols: SymbolTable::with_registers(count),
            ..Self::default()
        }
    }

    /// Issue a never-before-used branch target label.
    pub fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Issue the two labels of one boolean diamond.
    pub fn fresh_label_pair(&mut self) -> (Label, Label) {
        (self.fresh_label(), self.fresh_label())
    }

    /// Snapshot of the session counters.
    pub fn stats(&self) -> SessionStats {
        let alloc = self.symbols.stats();
        SessionStats {
            symbols_allocated: alloc.symbols_allocated,
            evictions: alloc.evictions,
            reloads: alloc.reloads,
            variables_declared: self.bindings.len(),
            labels_issued: self.next_label as usize,
        }
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionStats {
    pub symbols_allocated: usize,
    pub evictions: usize,
    pub reloads: usize,
    pub variables_declared: usize,
    pub labels_issued: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation session statistics:")?;
        writeln!(f, "  Symbols allocated: {}", self.symbols_allocated)?;
        writeln!(f, "  Evictions: {}", self.evictions)?;
        writeln!(f, "  Reloads: {}", self.reloads)?;
        writeln!(f, "  Variables declared: {}", self.variables_declared)?;
        writeln!(f, "  Labels issued: {}", self.labels_issued)
    }
}
