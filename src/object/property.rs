//! Property slots: a getter/setter pair bound as a slot value (spec §4.3).
//!
//! A property's `Value` form is `Value::Property(Handle)`; accessing it at
//! the object layer only identifies which getter/setter to invoke. Actually
//! calling them is the VM's job (`vm::context::Context::call`), since
//! invocation needs a call stack.

use crate::core::heap::{GcHeap, HeapObj, PropertyData};
use crate::core::value::{Handle, Value};

pub fn create(heap: &mut GcHeap, getter: Option<Value>, setter: Option<Value>) -> Handle {
    let h = heap.alloc(HeapObj::Property(PropertyData { getter, setter }));
    if let Some(g) = getter.and_then(|v| v.handle()) {
        heap.write_barrier(h, g);
    }
    if let Some(s) = setter.and_then(|v| v.handle()) {
        heap.write_barrier(h, s);
    }
    h
}

pub fn getter(heap: &GcHeap, prop: Handle) -> Option<Value> {
    match heap.get(prop) {
        HeapObj::Property(p) => p.getter,
        _ => None,
    }
}

pub fn setter(heap: &GcHeap, prop: Handle) -> Option<Value> {
    match heap.get(prop) {
        HeapObj::Property(p) => p.setter,
        _ => None,
    }
}
