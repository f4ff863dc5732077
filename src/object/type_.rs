//! `Type` entities: method tables, a linear base chain, and an optional
//! user-defined delegate (spec §4.3).
//!
//! The base-chain walk in `is_derived_from` is grounded on
//! `original_source/libpika/PClassInfo.cpp::ClassInfo::IsDerivedFrom` —
//! Pika's C++ core keeps a similar `super` singly-linked chain for its
//! builtin `ClassInfo` hierarchy; script-level `Type` reuses the same shape.

use crate::core::heap::{GcHeap, HeapObj, TypeData};
use crate::core::value::{Handle, Symbol, Value};

pub fn create(heap: &mut GcHeap, name: Option<Symbol>, base: Option<Handle>) -> Handle {
    heap.alloc(HeapObj::Type(TypeData::new(name, base)))
}

pub fn set_method(heap: &mut GcHeap, type_handle: Handle, name: Symbol, value: Value) {
    if let Some(h) = value.handle() {
        heap.write_barrier(type_handle, h);
    }
    if let HeapObj::Type(t) = heap.get_mut(type_handle) {
        t.methods.set(name, value);
    }
}

pub fn set_delegate(heap: &mut GcHeap, type_handle: Handle, delegate: Handle) {
    heap.write_barrier(type_handle, delegate);
    if let HeapObj::Type(t) = heap.get_mut(type_handle) {
        t.delegate = Some(delegate);
    }
}

/// Look up `name` in this type's own method table only (no base walk).
pub fn get_own_method(heap: &GcHeap, type_handle: Handle, name: Symbol) -> Option<Value> {
    match heap.get(type_handle) {
        HeapObj::Type(t) => t.methods.get(name).map(|s| s.value),
        _ => None,
    }
}

/// Walk the base chain (this type, then its base, then its base's base...)
/// looking for `name` in each type's method table.
pub fn resolve_method(heap: &GcHeap, type_handle: Handle, name: Symbol) -> Option<Value> {
    let mut current = Some(type_handle);
    while let Some(h) = current {
        if let Some(v) = get_own_method(heap, h, name) {
            return Some(v);
        }
        current = match heap.get(h) {
            HeapObj::Type(t) => t.base,
            _ => None,
        };
    }
    None
}

pub fn delegate_of(heap: &GcHeap, type_handle: Handle) -> Option<Handle> {
    match heap.get(type_handle) {
        HeapObj::Type(t) => t.delegate,
        _ => None,
    }
}

pub fn set_constructor(heap: &mut GcHeap, type_handle: Handle, ctor: Handle) {
    heap.write_barrier(type_handle, ctor);
    if let HeapObj::Type(t) = heap.get_mut(type_handle) {
        t.constructor = Some(ctor);
    }
}

pub fn constructor_of(heap: &GcHeap, type_handle: Handle) -> Option<Handle> {
    match heap.get(type_handle) {
        HeapObj::Type(t) => t.constructor,
        _ => None,
    }
}

pub fn set_abstract(heap: &mut GcHeap, type_handle: Handle, value: bool) {
    if let HeapObj::Type(t) = heap.get_mut(type_handle) {
        t.is_abstract = value;
    }
}

pub fn set_final(heap: &mut GcHeap, type_handle: Handle, value: bool) {
    if let HeapObj::Type(t) = heap.get_mut(type_handle) {
        t.is_final = value;
    }
}

pub fn is_abstract(heap: &GcHeap, type_handle: Handle) -> bool {
    matches!(heap.get(type_handle), HeapObj::Type(t) if t.is_abstract)
}

pub fn is_final(heap: &GcHeap, type_handle: Handle) -> bool {
    matches!(heap.get(type_handle), HeapObj::Type(t) if t.is_final)
}

/// `new`-style construction errors (spec §4.3: abstract types forbid direct
/// construction; final types forbid subtyping — this only enforces the
/// former, subtyping enforcement belongs to whatever defines a new Type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructError {
    Abstract,
    NoConstructor,
}

/// Resolve the Function a `new`-style call against this type should invoke
/// (spec §4.3 "a `new`-style call resolves to the Type's constructor").
pub fn resolve_constructor(heap: &GcHeap, type_handle: Handle) -> Result<Handle, ConstructError> {
    if is_abstract(heap, type_handle) {
        return Err(ConstructError::Abstract);
    }
    constructor_of(heap, type_handle).ok_or(ConstructError::NoConstructor)
}

/// True if `candidate` appears anywhere on `type_handle`'s base chain
/// (including `type_handle` itself).
pub fn is_derived_from(heap: &GcHeap, type_handle: Handle, candidate: Handle) -> bool {
    let mut current = Some(type_handle);
    while let Some(h) = current {
        if h == candidate {
            return true;
        }
        current = match heap.get(h) {
            HeapObj::Type(t) => t.base,
            _ => None,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Symbol;

    #[test]
    fn base_chain_method_is_found_through_subtype() {
        let mut heap = GcHeap::new();
        let base = create(&mut heap, Some(Symbol(0)), None);
        let method_name = Symbol(1);
        set_method(&mut heap, base, method_name, Value::Int(42));
        let derived = create(&mut heap, Some(Symbol(2)), Some(base));
        assert_eq!(resolve_method(&heap, derived, method_name), Some(Value::Int(42)));
    }

    #[test]
    fn is_derived_from_walks_full_chain() {
        let mut heap = GcHeap::new();
        let grandparent = create(&mut heap, None, None);
        let parent = create(&mut heap, None, Some(grandparent));
        let child = create(&mut heap, None, Some(parent));
        assert!(is_derived_from(&heap, child, grandparent));
        assert!(!is_derived_from(&heap, grandparent, child));
    }

    #[test]
    fn abstract_type_rejects_construction() {
        let mut heap = GcHeap::new();
        let ty = create(&mut heap, Some(Symbol(0)), None);
        set_abstract(&mut heap, ty, true);
        assert_eq!(resolve_constructor(&heap, ty), Err(ConstructError::Abstract));
    }

    #[test]
    fn constructor_resolves_once_set() {
        let mut heap = GcHeap::new();
        let ty = create(&mut heap, Some(Symbol(0)), None);
        let ctor = heap.alloc(crate::core::heap::HeapObj::Table(crate::core::value::Table::new()));
        set_constructor(&mut heap, ty, ctor);
        assert_eq!(resolve_constructor(&heap, ty), Ok(ctor));
    }
}
