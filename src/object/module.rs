//! Module cache entries (spec §4.6), grounded on
//! `original_source/libpika/PModule.cpp`'s four outcomes for an import
//! cache entry (loading sentinel, resolved Module, resolved Package, or a
//! Function whose invocation produces the result Package).

use crate::core::heap::{GcHeap, HeapObj, ModuleData};
use crate::core::value::Handle;

pub fn create_loading(heap: &mut GcHeap) -> Handle {
    heap.alloc(HeapObj::Module(ModuleData::Loading))
}

pub fn resolve_to_package(heap: &mut GcHeap, module_entry: Handle, result: Handle) {
    heap.write_barrier(module_entry, result);
    if let HeapObj::Module(m) = heap.get_mut(module_entry) {
        *m = ModuleData::Package(result);
    }
}

pub fn is_loading(heap: &GcHeap, h: Handle) -> bool {
    matches!(heap.get(h), HeapObj::Module(ModuleData::Loading))
}

pub fn result_handle(heap: &GcHeap, h: Handle) -> Option<Handle> {
    match heap.get(h) {
        HeapObj::Module(ModuleData::Module(r))
        | HeapObj::Module(ModuleData::Package(r))
        | HeapObj::Module(ModuleData::Function(r)) => Some(*r),
        _ => None,
    }
}
