//! Variable binding table.
//!
//! Flat single-scope mapping from declared names to their backing symbols.
//! Names live in the caller's expression arena, so the table borrows them.

use hashbrown::HashMap;

use crate::core::error::{CompileError, CompileResult};
use crate::core::symbols::{SymbolId, SymbolTable};

/// Name-to-symbol map for declared variables.
#[derive(Debug, Default)]
pub struct BindingTable<'a> {
    map: HashMap<&'a str, SymbolId>,
}

impl<'a> BindingTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to a freshly allocated symbol. A name may only be
    /// declared once.
    pub fn declare(
        &mut self,
        name: &'a str,
        symbols: &mut SymbolTable,
    ) -> CompileResult<SymbolId> {
        if self.map.contains_key(name) {
            return Err(CompileError::DuplicateDeclaration(name.to_string()));
        }
        let id = symbols.allocate();
        self.map.insert(name, id);
        log::debug!("declared `{name}` as {id:?}");
        Ok(id)
    }

    /// Look up a previously declared name.
    pub fn resolve(&self, name: &str) -> CompileResult<SymbolId> {
        self.map
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_then_resolve() {
        let mut symbols = SymbolTable::new();
        let mut bindings = BindingTable::new();

        let id = bindings.declare("x", &mut symbols).unwrap();
        assert_eq!(bindings.resolve("x").unwrap(), id);
        assert!(symbols.is_live(id));
    }

    #[test]
    fn test_duplicate_declaration() {
        let mut symbols = SymbolTable::new();
        let mut bindings = BindingTable::new();

        bindings.declare("x", &mut symbols).unwrap();
        assert_eq!(
            bindings.declare("x", &mut symbols),
            Err(CompileError::DuplicateDeclaration("x".into()))
        );
    }

    #[test]
    fn test_undefined_variable() {
        let bindings = BindingTable::new();
        assert_eq!(
            bindings.resolve("y"),
            Err(CompileError::UndefinedVariable("y".into()))
        );
    }
}
