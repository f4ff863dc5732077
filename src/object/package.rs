//! `Package` entities: namespaces chained by `parent`, used both for
//! user-defined packages and as the Engine's root "world" scope (spec
//! §4.3/§4.5).

use crate::core::heap::{GcHeap, HeapObj, PackageData};
use crate::core::value::{Handle, Symbol, Value};
use crate::object::table;

pub fn create(heap: &mut GcHeap, name: Option<Symbol>, parent: Option<Handle>) -> Handle {
    let h = heap.alloc(HeapObj::Package(PackageData::new(name, parent)));
    if let Some(p) = parent {
        heap.write_barrier(p, h);
        if let HeapObj::Package(pd) = heap.get_mut(p) {
            pd.children.push(h);
        }
    }
    h
}

/// Every Package registered directly under this one (spec §4.3 "can
/// enumerate its children").
pub fn children(heap: &GcHeap, pkg: Handle) -> Vec<Handle> {
    match heap.get(pkg) {
        HeapObj::Package(p) => p.children.clone(),
        _ => Vec::new(),
    }
}

/// The dotted name path from the world package down to this one (spec §4.3
/// "knows its dotted name path"), e.g. `a.b.c`. A package with no name at
/// some level along the chain (the anonymous world root) contributes
/// nothing to the path.
pub fn dotted_name(heap: &GcHeap, interner: &crate::core::interner::Interner, pkg: Handle) -> String {
    let mut parts = Vec::new();
    let mut current = Some(pkg);
    while let Some(h) = current {
        match heap.get(h) {
            HeapObj::Package(p) => {
                if let Some(name) = p.name {
                    if let Some(bytes) = interner.lookup(name) {
                        parts.push(String::from_utf8_lossy(bytes).into_owned());
                    }
                }
                current = p.parent;
            }
            _ => break,
        }
    }
    parts.reverse();
    parts.join(".")
}

pub fn set_slot(heap: &mut GcHeap, pkg: Handle, name: Symbol, value: Value, force: bool) -> table::SetOutcome {
    if let Some(h) = value.handle() {
        heap.write_barrier(pkg, h);
    }
    match heap.get_mut(pkg) {
        HeapObj::Package(p) => table::try_set(&mut p.slots, name, value, force),
        _ => table::SetOutcome::Ok,
    }
}

/// Look up `name` in this package's own scope only.
pub fn get_own_slot(heap: &GcHeap, pkg: Handle, name: Symbol) -> Option<Value> {
    match heap.get(pkg) {
        HeapObj::Package(p) => p.slots.get(name).map(|s| s.value),
        _ => None,
    }
}

/// Walk outward through enclosing packages (spec §4.3 nested lookup):
/// this package's scope, then its parent's, and so on up to the world.
pub fn resolve(heap: &GcHeap, pkg: Handle, name: Symbol) -> Option<Value> {
    let mut current = Some(pkg);
    while let Some(h) = current {
        if let Some(v) = get_own_slot(heap, h, name) {
            return Some(v);
        }
        current = match heap.get(h) {
            HeapObj::Package(p) => p.parent,
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_through_to_parent_scope() {
        let mut heap = GcHeap::new();
        let world = create(&mut heap, None, None);
        let name = Symbol(3);
        set_slot(&mut heap, world, name, Value::Int(7), false);
        let nested = create(&mut heap, Some(Symbol(4)), Some(world));
        assert_eq!(resolve(&heap, nested, name), Some(Value::Int(7)));
    }

    #[test]
    fn child_registration_and_dotted_name() {
        let mut heap = GcHeap::new();
        let mut interner = crate::core::interner::Interner::new();
        let a_sym = interner.intern(b"a");
        let b_sym = interner.intern(b"b");
        let world = create(&mut heap, None, None);
        let a = create(&mut heap, Some(a_sym), Some(world));
        let b = create(&mut heap, Some(b_sym), Some(a));
        assert_eq!(children(&heap, world), vec![a]);
        assert_eq!(children(&heap, a), vec![b]);
        assert_eq!(dotted_name(&heap, &interner, b), "a.b");
    }
}
