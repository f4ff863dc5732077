//! `UserData` entities: opaque native-owned data exposed to scripts (spec
//! §3.2/§4.7). Two flavors per spec: an `External` pointer the host retains
//! ownership of, and a `Managed` box dropped when the GC collects it.

use crate::core::heap::{GcHeap, HeapObj};
use crate::core::value::{Handle, UserDataBox, UserDataKind};

pub fn create_managed<T: std::any::Any>(heap: &mut GcHeap, value: T) -> Handle {
    heap.alloc(HeapObj::UserData(UserDataBox {
        kind: UserDataKind::Managed(Box::new(value)),
        mark: None,
        finalize: None,
    }))
}

pub fn create_external(heap: &mut GcHeap, ptr: *mut std::ffi::c_void) -> Handle {
    heap.alloc(HeapObj::UserData(UserDataBox {
        kind: UserDataKind::External(ptr),
        mark: None,
        finalize: None,
    }))
}

pub fn downcast_ref<T: std::any::Any>(heap: &GcHeap, h: Handle) -> Option<&T> {
    match heap.get(h) {
        HeapObj::UserData(b) => match &b.kind {
            UserDataKind::Managed(boxed) => boxed.downcast_ref::<T>(),
            UserDataKind::External(_) => None,
        },
        _ => None,
    }
}

pub fn downcast_mut<T: std::any::Any>(heap: &mut GcHeap, h: Handle) -> Option<&mut T> {
    match heap.get_mut(h) {
        HeapObj::UserData(b) => match &mut b.kind {
            UserDataKind::Managed(boxed) => boxed.downcast_mut::<T>(),
            UserDataKind::External(_) => None,
        },
        _ => None,
    }
}
