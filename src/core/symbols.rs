// This module implements the symbol table at the heart of the allocator. SymbolTable
// tracks every intermediate value as a symbol with a stable SymbolId and a residency
// state (register, overflow slot, or transiently unplaced), owning both the scratch
// RegisterFile and the growable overflow area. SymbolId values are reused after release
// and the entry table doubles in length when it fills. ensure_resident is the central
// operation: it places every requested symbol in a register, promoting from memory
// (emitting a load, freeing the slot) and evicting the first register whose owner is
// not part of the request (emitting a store to a freshly allocated slot), reporting
// RegisterExhaustion when the request itself covers the whole pool. AllocStats counts
// allocations, evictions and reloads, and residency_consistent exposes the invariant
// check used by debug assertions and tests.

//! Symbol table and register/memory residency management.
//!
//! Every intermediate value produced during generation is a *symbol*: a
//! stable identity whose storage moves between a scratch register and an
//! overflow slot without the identity changing. The table owns the register
//! pool and the overflow area and performs all promotion, demotion and
//! eviction, emitting the load/store traffic into the caller's program.
//!
//! Residency invariant: the set of in-use registers always equals the set of
//! live symbols currently placed in a register.

use std::fmt;

use crate::core::error::{CompileError, CompileResult};
use crate::core::register_file::{RegId, RegisterFile, SCRATCH_REGS};
use crate::inst::{Inst, Loc, Program};

/// Initial symbol table length; the table doubles when exhausted.
const INIT_SYMBOL_CAPACITY: usize = 5;
const GROWTH_FACTOR: usize = 2;

/// Slot word size used for the `%rbp`-relative rendering.
const SLOT_BYTES: u32 = 4;

/// Handle to a live intermediate value. Dead ids are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of one overflow slot, rendered relative to `%rbp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u32);

impl SlotId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}(%rbp)", (self.0 + 1) * SLOT_BYTES)
    }
}

/// Where a placed symbol's value currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Register(RegId),
    Memory(SlotId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolState {
    Dead,
    /// Live, but no register was free at allocation; placement happens on
    /// the next `ensure_resident` that requests it.
    Unplaced,
    Placed(Residency),
}

/// Allocation statistics, reported through the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocStats {
    pub symbols_allocated: usize,
    pub evictions: usize,
    pub reloads: usize,
}

/// Symbol table owning the register pool and the overflow area.
#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<SymbolState>,
    registers: RegisterFile,
    slots: Vec<Option<SymbolId>>,
    stats: AllocStats,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Table over the full scratch pool.
    pub fn new() -> Self {
        Self::with_registers(SCRATCH_REGS.len())
    }

    /// Table over a shrunk pool, used to exercise eviction under pressure.
    pub fn with_registers(count: usize) -> Self {
        Self {
            entries: vec![SymbolState::Dead; INIT_SYMBOL_CAPACITY],
            registers: RegisterFile::new(count),
            slots: Vec::new(),
            stats: AllocStats::default(),
        }
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn stats(&self) -> AllocStats {
        self.stats
    }

    /// Create a new live symbol, placing it directly into a free register
    /// when one exists. Never fails; the table grows as needed.
    pub fn allocate(&mut self) -> SymbolId {
        let index = match self.entries.iter().position(|s| *s == SymbolState::Dead) {
            Some(index) => index,
            None => {
                let old_len = self.entries.len();
                self.entries
                    .resize(old_len * GROWTH_FACTOR, SymbolState::Dead);
                old_len
            }
        };

        let id = SymbolId::from_index(index);
        self.entries[index] = match self.registers.find_free() {
            Some(reg) => {
                self.registers.assign(reg, id);
                SymbolState::Placed(Residency::Register(reg))
            }
            None => SymbolState::Unplaced,
        };
        self.stats.symbols_allocated += 1;
        log::trace!("allocated {id:?} ({:?})", self.entries[index]);
        id
    }

    /// Destroy a live symbol, freeing its register or slot.
    pub fn release(&mut self, id: SymbolId) -> CompileResult<()> {
        match self.entries.get(id.index()).copied() {
            None | Some(SymbolState::Dead) => Err(CompileError::ReleaseOfDeadSymbol(id)),
            Some(SymbolState::Unplaced) => {
                self.entries[id.index()] = SymbolState::Dead;
                Ok(())
            }
            Some(SymbolState::Placed(Residency::Register(reg))) => {
                self.registers.free(reg);
                self.entries[id.index()] = SymbolState::Dead;
                Ok(())
            }
            Some(SymbolState::Placed(Residency::Memory(slot))) => {
                self.slots[slot.index()] = None;
                self.entries[id.index()] = SymbolState::Dead;
                Ok(())
            }
        }
    }

    pub fn is_live(&self, id: SymbolId) -> bool {
        !matches!(
            self.entries.get(id.index()),
            None | Some(SymbolState::Dead)
        )
    }

    /// Current storage of a live, placed symbol.
    pub fn residency(&self, id: SymbolId) -> Option<Residency> {
        match self.entries.get(id.index())? {
            SymbolState::Placed(residency) => Some(*residency),
            _ => None,
        }
    }

    fn register_of(&self, id: SymbolId) -> Option<RegId> {
        match self.residency(id)? {
            Residency::Register(reg) => Some(reg),
            Residency::Memory(_) => None,
        }
    }

    /// Guarantee every requested symbol is in a register simultaneously,
    /// returning their registers in request order.
    ///
    /// Symbols already resident are kept. Missing ones are promoted into
    /// free registers first; when none is free, registers are scanned in
    /// index order for one whose owner is not itself requested, and that
    /// owner is evicted to an overflow slot. If every register is owned by
    /// a member of the request, the working set exceeds the pool and the
    /// call fails with [`CompileError::RegisterExhaustion`].
    pub fn ensure_resident(
        &mut self,
        requested: &[SymbolId],
        out: &mut Program,
    ) -> CompileResult<Vec<RegId>> {
        for &id in requested {
            assert!(self.is_live(id), "requested residency of dead {id:?}");
            if self.register_of(id).is_some() {
                continue;
            }

            let reg = match self.registers.find_free() {
                Some(reg) => reg,
                None => {
                    let victim = self
                        .registers
                        .iter()
                        .find(|(_, owner)| {
                            owner.is_some_and(|owner| !requested.contains(&owner))
                        })
                        .map(|(reg, _)| reg)
                        .ok_or(CompileError::RegisterExhaustion)?;
                    self.demote(victim, out);
                    victim
                }
            };
            self.promote(id, reg, out);
        }

        debug_assert!(self.residency_consistent());

        Ok(requested
            .iter()
            .map(|&id| {
                self.register_of(id)
                    .expect("requested symbol resident after placement")
            })
            .collect())
    }

    /// Move a register's owner out to a fresh overflow slot.
    fn demote(&mut self, reg: RegId, out: &mut Program) {
        let owner = self
            .registers
            .owner(reg)
            .expect("demoting a free register");
        let slot = self.alloc_slot(owner);
        out.push(Inst::Move {
            dst: Loc::Mem(slot),
            src: Loc::Reg(reg),
        });
        self.registers.free(reg);
        self.entries[owner.index()] = SymbolState::Placed(Residency::Memory(slot));
        self.stats.evictions += 1;
        log::trace!("evicted {owner:?} from {reg} to {slot}");
    }

    /// Move a non-resident symbol into the given free register, reloading
    /// from its slot when it was evicted earlier.
    fn promote(&mut self, id: SymbolId, reg: RegId, out: &mut Program) {
        match self.entries[id.index()] {
            SymbolState::Unplaced => {}
            SymbolState::Placed(Residency::Memory(slot)) => {
                out.push(Inst::Move {
                    dst: Loc::Reg(reg),
                    src: Loc::Mem(slot),
                });
                self.slots[slot.index()] = None;
                self.stats.reloads += 1;
                log::trace!("reloaded {id:?} from {slot} into {reg}");
            }
            state => unreachable!("promoting {id:?} in state {state:?}"),
        }
        self.registers.assign(reg, id);
        self.entries[id.index()] = SymbolState::Placed(Residency::Register(reg));
    }

    fn alloc_slot(&mut self, owner: SymbolId) -> SlotId {
        let index = match self.slots.iter().position(Option::is_none) {
            Some(index) => index,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.slots[index] = Some(owner);
        SlotId(index as u32)
    }

    /// Check the residency invariant: in-use registers and register-resident
    /// symbols are the same set, and slot ownership mirrors memory residency.
    pub fn residency_consistent(&self) -> bool {
        let regs_ok = self.registers.iter().all(|(reg, owner)| match owner {
            Some(owner) => {
                self.residency(owner) == Some(Residency::Register(reg))
            }
            None => self
                .entries
                .iter()
                .all(|s| *s != SymbolState::Placed(Residency::Register(reg))),
        });

        let slots_ok = self.slots.iter().enumerate().all(|(i, owner)| {
            let slot = SlotId(i as u32);
            match owner {
                Some(owner) => self.residency(*owner) == Some(Residency::Memory(slot)),
                None => self
                    .entries
                    .iter()
                    .all(|s| *s != SymbolState::Placed(Residency::Memory(slot))),
            }
        });

        regs_ok && slots_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_places_into_free_registers_first() {
        let mut symbols = SymbolTable::with_registers(2);
        let a = symbols.allocate();
        let b = symbols.allocate();
        let c = symbols.allocate();

        assert!(matches!(symbols.residency(a), Some(Residency::Register(_))));
        assert!(matches!(symbols.residency(b), Some(Residency::Register(_))));
        // Pool is full; c is live but unplaced until requested.
        assert!(symbols.is_live(c));
        assert_eq!(symbols.residency(c), None);
        assert!(symbols.residency_consistent());
    }

    #[test]
    fn test_dead_ids_are_reused() {
        let mut symbols = SymbolTable::new();
        let a = symbols.allocate();
        symbols.release(a).unwrap();
        let b = symbols.allocate();
        assert_eq!(a, b);
    }

    #[test]
    fn test_table_grows_past_initial_capacity() {
        let mut symbols = SymbolTable::new();
        let ids: Vec<_> = (0..INIT_SYMBOL_CAPACITY + 3)
            .map(|_| symbols.allocate())
            .collect();
        for &id in &ids {
            assert!(symbols.is_live(id));
        }
        assert!(symbols.residency_consistent());
    }

    #[test]
    fn test_release_of_dead_symbol_is_reported() {
        let mut symbols = SymbolTable::new();
        let a = symbols.allocate();
        symbols.release(a).unwrap();
        assert_eq!(
            symbols.release(a),
            Err(CompileError::ReleaseOfDeadSymbol(a))
        );
    }

    #[test]
    fn test_eviction_picks_first_unrequested_owner() {
        let mut symbols = SymbolTable::with_registers(2);
        let mut out = Program::new();

        let a = symbols.allocate();
        let b = symbols.allocate();
        let c = symbols.allocate();

        // b sits in %ecx; requesting {a, c} must evict b, not a.
        let regs = symbols.ensure_resident(&[a, c], &mut out).unwrap();
        assert_eq!(regs.len(), 2);
        assert!(matches!(symbols.residency(b), Some(Residency::Memory(_))));
        assert!(matches!(symbols.residency(a), Some(Residency::Register(_))));
        assert!(matches!(symbols.residency(c), Some(Residency::Register(_))));

        // Exactly one store was emitted for the eviction.
        assert_eq!(out.len(), 1);
        assert!(matches!(
            out.as_slice()[0],
            Inst::Move {
                dst: Loc::Mem(_),
                src: Loc::Reg(_)
            }
        ));
        assert!(symbols.residency_consistent());
    }

    #[test]
    fn test_promotion_reloads_from_slot_and_frees_it() {
        let mut symbols = SymbolTable::with_registers(2);
        let mut out = Program::new();

        let a = symbols.allocate();
        let b = symbols.allocate();
        let c = symbols.allocate();
        symbols.ensure_resident(&[a, c], &mut out).unwrap();

        // Bring b back; a or c gets evicted in its stead.
        let regs = symbols.ensure_resident(&[b], &mut out).unwrap();
        assert_eq!(symbols.residency(b), Some(Residency::Register(regs[0])));

        // store b, store victim, load b
        assert_eq!(out.len(), 3);
        assert!(matches!(
            out.as_slice()[2],
            Inst::Move {
                dst: Loc::Reg(_),
                src: Loc::Mem(_)
            }
        ));
        assert_eq!(symbols.stats().evictions, 2);
        assert_eq!(symbols.stats().reloads, 1);
        assert!(symbols.residency_consistent());
    }

    #[test]
    fn test_register_exhaustion_when_request_exceeds_pool() {
        let mut symbols = SymbolTable::with_registers(2);
        let mut out = Program::new();

        let a = symbols.allocate();
        let b = symbols.allocate();
        let c = symbols.allocate();

        assert_eq!(
            symbols.ensure_resident(&[a, b, c], &mut out),
            Err(CompileError::RegisterExhaustion)
        );
    }

    #[test]
    fn test_already_resident_request_emits_nothing() {
        let mut symbols = SymbolTable::new();
        let mut out = Program::new();

        let a = symbols.allocate();
        let b = symbols.allocate();
        let regs = symbols.ensure_resident(&[a, b], &mut out).unwrap();

        assert!(out.is_empty());
        assert_eq!(regs[0], symbols.register_of(a).unwrap());
        assert_eq!(regs[1], symbols.register_of(b).unwrap());
    }
}
