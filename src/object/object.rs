//! Instances (spec §4.3): a slot table plus the four-step slot resolution
//! order — instance table, type method table, base chain, user-defined
//! delegate.

use crate::core::heap::{GcHeap, HeapObj, ObjectData};
use crate::core::value::{Handle, Symbol, Value};
use crate::object::{table, type_};

pub fn create(heap: &mut GcHeap, type_obj: Option<Handle>) -> Handle {
    heap.alloc(HeapObj::Object(ObjectData::new(type_obj)))
}

/// Outcome of a slot lookup: where, if anywhere, the value was found, or
/// that resolution must fall through to invoking a user-defined delegate
/// function (the delegate is itself script/native code the VM must call —
/// this layer only identifies that a call is needed).
pub enum Resolved {
    Found(Value),
    Delegate(Handle),
    Miss,
}

/// Slot resolution order (spec §4.3): instance slots, then the type's
/// method table, then its base chain, then — only if every prior step
/// missed — a user-defined delegate on the type.
pub fn resolve_slot(heap: &GcHeap, obj: Handle, name: Symbol) -> Resolved {
    let (type_obj, instance_hit) = match heap.get(obj) {
        HeapObj::Object(o) => (o.type_obj, o.slots.get(name).map(|s| s.value)),
        _ => (None, None),
    };
    if let Some(v) = instance_hit {
        return Resolved::Found(v);
    }
    if let Some(type_handle) = type_obj {
        if let Some(v) = type_::resolve_method(heap, type_handle, name) {
            return Resolved::Found(v);
        }
        if let Some(delegate) = type_::delegate_of(heap, type_handle) {
            return Resolved::Delegate(delegate);
        }
    }
    Resolved::Miss
}

pub fn set_slot(heap: &mut GcHeap, obj: Handle, name: Symbol, value: Value, force: bool) -> table::SetOutcome {
    if let Some(h) = value.handle() {
        heap.write_barrier(obj, h);
    }
    match heap.get_mut(obj) {
        HeapObj::Object(o) => table::try_set(&mut o.slots, name, value, force),
        _ => table::SetOutcome::Ok,
    }
}

pub fn type_of(heap: &GcHeap, obj: Handle) -> Option<Handle> {
    match heap.get(obj) {
        HeapObj::Object(o) => o.type_obj,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Symbol;
    use crate::object::type_;

    #[test]
    fn instance_slot_shadows_type_method() {
        let mut heap = GcHeap::new();
        let ty = type_::create(&mut heap, None, None);
        let name = Symbol(5);
        type_::set_method(&mut heap, ty, name, Value::Int(1));
        let obj = create(&mut heap, Some(ty));
        set_slot(&mut heap, obj, name, Value::Int(2), false);
        match resolve_slot(&heap, obj, name) {
            Resolved::Found(Value::Int(2)) => {}
            _ => panic!("instance slot should shadow the type method"),
        }
    }

    #[test]
    fn missing_slot_falls_through_to_delegate() {
        let mut heap = GcHeap::new();
        let ty = type_::create(&mut heap, None, None);
        let delegate = heap.alloc(crate::core::heap::HeapObj::Table(crate::core::value::Table::new()));
        type_::set_delegate(&mut heap, ty, delegate);
        let obj = create(&mut heap, Some(ty));
        match resolve_slot(&heap, obj, Symbol(99)) {
            Resolved::Delegate(h) => assert_eq!(h, delegate),
            _ => panic!("expected delegate fallback"),
        }
    }
}
