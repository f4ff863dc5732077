//! Shared helpers over any heap entity addressed by a `Handle` (spec §4.3).
//!
//! `IsDerivedFrom`'s base-chain walk is grounded on
//! `original_source/libpika/PClassInfo.cpp::ClassInfo::IsDerivedFrom`: walk
//! `super` links until a match or the chain ends. `object::type_` reuses the
//! same walk for Pika's `Type` base chain.

use crate::core::heap::{GcHeap, HeapObj};
use crate::core::value::Handle;

/// Human-readable type name for diagnostics (spec §7 error messages embed
/// this).
pub fn kind_name(heap: &GcHeap, h: Handle) -> &'static str {
    match heap.get(h) {
        HeapObj::Str(_) => "String",
        HeapObj::Table(_) => "Table",
        HeapObj::Object(_) => "Object",
        HeapObj::Package(_) => "Package",
        HeapObj::Type(_) => "Type",
        HeapObj::Function(_) => "Function",
        HeapObj::Array(_) => "Array",
        HeapObj::Dictionary(_) => "Dictionary",
        HeapObj::ByteArray(_) => "ByteArray",
        HeapObj::UserData(_) => "UserData",
        HeapObj::Property(_) => "Property",
        HeapObj::Module(_) => "Module",
        HeapObj::Script(_) => "Script",
    }
}
