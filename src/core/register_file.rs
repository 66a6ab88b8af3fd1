//! Scratch register pool.
//!
//! The pool is the five x86-32 scratch registers. Each register is either
//! free or owned by exactly one live symbol; the symbol table in
//! [`crate::core::symbols`] drives all ownership changes. The pool length is
//! fixed at construction (tests shrink it to force eviction) and capped at
//! the scratch set.

use std::fmt;

use crate::core::symbols::SymbolId;

/// Names of the scratch registers, in allocation/eviction scan order.
pub const SCRATCH_REGS: [&str; 5] = ["%eax", "%ecx", "%edx", "%esi", "%edi"];

/// Identifier of one scratch register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegId(u8);

impl RegId {
    pub(crate) fn new(index: usize) -> Self {
        debug_assert!(index < SCRATCH_REGS.len());
        Self(index as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        SCRATCH_REGS[self.index()]
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ownership table for the scratch pool.
#[derive(Debug)]
pub struct RegisterFile {
    owners: Vec<Option<SymbolId>>,
}

impl RegisterFile {
    /// Create a pool covering the first `len` scratch registers.
    pub fn new(len: usize) -> Self {
        assert!(
            (1..=SCRATCH_REGS.len()).contains(&len),
            "register pool length must be 1..={}",
            SCRATCH_REGS.len()
        );
        Self {
            owners: vec![None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// First free register in index order, if any.
    pub fn find_free(&self) -> Option<RegId> {
        self.owners.iter().position(Option::is_none).map(RegId::new)
    }

    pub fn owner(&self, reg: RegId) -> Option<SymbolId> {
        self.owners[reg.index()]
    }

    /// Hand a free register to `owner`.
    pub fn assign(&mut self, reg: RegId, owner: SymbolId) {
        let slot = &mut self.owners[reg.index()];
        assert!(slot.is_none(), "register {reg} is already owned");
        *slot = Some(owner);
    }

    /// Return an owned register to the free pool.
    pub fn free(&mut self, reg: RegId) {
        let slot = &mut self.owners[reg.index()];
        assert!(slot.is_some(), "register {reg} is not in use");
        *slot = None;
    }

    pub fn in_use_count(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }

    /// Registers with their current owners, in scan order.
    pub fn iter(&self) -> impl Iterator<Item = (RegId, Option<SymbolId>)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .map(|(i, owner)| (RegId::new(i), *owner))
    }
}
