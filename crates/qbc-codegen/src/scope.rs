// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Nested symbol tables.
//!
//! Scopes live in an arena and point at their parent by id. A table maps
//! names to the node id of the declaring node; it owns nothing.

use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::error::{CodegenErrorKind, OpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    symbols: IndexMap<String, NodeId>,
}

#[derive(Debug, Default)]
pub struct Scopes {
    scopes: Vec<ScopeData>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData { parent, symbols: IndexMap::new() });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0 as usize].parent
    }

    pub fn register(&mut self, scope: ScopeId, name: &str, decl: NodeId) -> OpResult<()> {
        let symbols = &mut self.scopes[scope.0 as usize].symbols;
        if symbols.contains_key(name) {
            return Err(CodegenErrorKind::DuplicateSymbol { name: name.to_string() });
        }
        symbols.insert(name.to_string(), decl);
        Ok(())
    }

    /// Declaration of `name` in `scope` itself.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<NodeId> {
        self.scopes[scope.0 as usize].symbols.get(name).copied()
    }

    /// Nearest declaration of `name`, searching outward from `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<NodeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(decl) = self.lookup_local(id, name) {
                return Some(decl);
            }
            current = self.parent(id);
        }
        None
    }

    /// Declarations of `scope`, most recent first.
    pub fn declarations_rev(&self, scope: ScopeId) -> Vec<NodeId> {
        self.scopes[scope.0 as usize].symbols.values().rev().copied().collect()
    }

    pub fn clear(&mut self, scope: ScopeId) {
        self.scopes[scope.0 as usize].symbols.clear();
    }

    /// Scopes from `scope` outward up to, not including, `until`.
    pub fn chain_until(&self, scope: ScopeId, until: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == until {
                break;
            }
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_in_one_scope_fails() {
        let mut scopes = Scopes::new();
        let s = scopes.open(None);
        scopes.register(s, "x", NodeId(1)).unwrap();
        assert_eq!(
            scopes.register(s, "x", NodeId(2)),
            Err(CodegenErrorKind::DuplicateSymbol { name: "x".to_string() })
        );
    }

    #[test]
    fn child_shadows_parent() {
        let mut scopes = Scopes::new();
        let outer = scopes.open(None);
        let inner = scopes.open(Some(outer));
        scopes.register(outer, "x", NodeId(1)).unwrap();
        scopes.register(outer, "y", NodeId(2)).unwrap();
        scopes.register(inner, "x", NodeId(3)).unwrap();

        assert_eq!(scopes.resolve(inner, "x"), Some(NodeId(3)));
        assert_eq!(scopes.resolve(inner, "y"), Some(NodeId(2)));
        assert_eq!(scopes.resolve(outer, "x"), Some(NodeId(1)));
        assert_eq!(scopes.resolve(inner, "z"), None);
    }

    #[test]
    fn declarations_come_back_in_reverse_order() {
        let mut scopes = Scopes::new();
        let s = scopes.open(None);
        // names chosen so that sorted order differs from registration order
        for (i, name) in ["m", "a", "z", "b"].iter().enumerate() {
            scopes.register(s, name, NodeId(i as u32)).unwrap();
        }
        assert_eq!(
            scopes.declarations_rev(s),
            vec![NodeId(3), NodeId(2), NodeId(1), NodeId(0)]
        );
        scopes.clear(s);
        assert!(scopes.declarations_rev(s).is_empty());
        assert_eq!(scopes.resolve(s, "m"), None);
    }

    #[test]
    fn chain_stops_below_target() {
        let mut scopes = Scopes::new();
        let a = scopes.open(None);
        let b = scopes.open(Some(a));
        let c = scopes.open(Some(b));
        assert_eq!(scopes.chain_until(c, a), vec![c, b]);
        assert_eq!(scopes.chain_until(a, a), Vec::<ScopeId>::new());
    }
}
