//! The tagged value representation (spec L1) and the heap-object payloads it
//! can reference.
//!
//! Reference: `original_source/libpika/PValue.cpp`, `Pika.h` (`Value`, `Tag`).

use std::rc::Rc;

/// Index into the GC-managed heap. Carries no ownership; liveness is decided
/// by the collector (`core::gc::Collector`), not by reference counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u32);

/// Interned string identifier (distinct from a `Handle` because symbols never
/// move and are never individually collected; see `core::interner`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Symbol(pub u32);

bitflags::bitflags! {
    /// Per-slot attribute bits (spec §3.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttrBits: u8 {
        const PROTECTED   = 0b001;
        const READ_ONLY   = 0b010;
        const FORCE_WRITE = 0b100;
    }
}

impl Default for AttrBits {
    fn default() -> Self {
        AttrBits::empty()
    }
}

/// A tagged scalar/reference carrier. Trivially `Copy`; the discriminant fully
/// determines which payload is meaningful (spec §3.1 invariant).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(Handle),
    Object(Handle),
    Property(Handle),
    UserData(Handle),
}

impl Value {
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Property(_) => "property",
            Value::UserData(_) => "userdata",
        }
    }

    /// Only `null` and `false` are false; every other value (including `0`
    /// and the empty string) is true at this layer. String/array specific
    /// emptiness rules, if a script wants them, are expressed through the
    /// conventionally-named `asBool` slot at the object layer, not baked in
    /// here.
    pub fn to_bool(self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn handle(self) -> Option<Handle> {
        match self {
            Value::Str(h) | Value::Object(h) | Value::Property(h) | Value::UserData(h) => Some(h),
            _ => None,
        }
    }
}

/// Interned, immutable text (spec §3.2/§4.2).
#[derive(Debug, Clone)]
pub struct PikaString {
    pub bytes: Rc<Vec<u8>>,
    pub hash: u64,
    pub has_nulls: bool,
}

impl PikaString {
    pub fn new(bytes: Vec<u8>) -> Self {
        let has_nulls = bytes.contains(&0);
        let hash = Self::hash_bytes(&bytes);
        Self {
            bytes: Rc::new(bytes),
            hash,
            has_nulls,
        }
    }

    /// FNV-1a; cheap, stable across runs, good enough for an intern key.
    pub fn hash_bytes(bytes: &[u8]) -> u64 {
        let mut h: u64 = 0xcbf29ce484222325;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        h
    }
}

/// A single attributed slot, as stored in a `Table`.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub value: Value,
    pub attrs: AttrBits,
}

impl Slot {
    pub fn plain(value: Value) -> Self {
        Self {
            value,
            attrs: AttrBits::empty(),
        }
    }
}

/// Attribute map: key/value slots with per-slot attribute bits (spec §3.2,
/// §3.3). Backs instance slots, Package scopes, and Type method tables.
/// Keyed by interned `Symbol` rather than an arbitrary `Value`: every
/// production use of a Pika `Table` as an object scope is keyed by
/// identifier, and restricting the key type avoids requiring `Value` (which
/// carries an `f64`) to implement `Hash`/`Eq`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub slots: indexmap::IndexMap<Symbol, Slot>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: Symbol) -> Option<&Slot> {
        self.slots.get(&key)
    }

    pub fn set(&mut self, key: Symbol, value: Value) {
        self.slots
            .entry(key)
            .and_modify(|s| s.value = value)
            .or_insert_with(|| Slot::plain(value));
    }

    pub fn set_with_attrs(&mut self, key: Symbol, value: Value, attrs: AttrBits) {
        self.slots.insert(key, Slot { value, attrs });
    }
}

/// Dense Value sequence (spec §3.2 `Array`). Unlike the teacher's PHP
/// `ArrayData` (a sparse, insertion-ordered map with a cached next index),
/// Pika's `Array` is dense; `push` is the only growth operation that needs a
/// cursor, and `Vec`'s own length serves that role.
#[derive(Debug, Clone, Default)]
pub struct PikaArray {
    pub items: Vec<Value>,
}

impl PikaArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, v: Value) {
        self.items.push(v);
    }
}

/// A hashable projection of `Value`, used only as a `Dictionary` key. Reals
/// hash by bit pattern; `Object`/`Property`/`UserData` hash by handle
/// identity (not deep equality — reference-type map keys compare by identity
/// in most prototype languages, Pika included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DictKey {
    Null,
    Bool(bool),
    Int(i64),
    RealBits(u64),
    Str(Handle),
    Ref(Handle),
}

impl DictKey {
    pub fn from_value(v: Value) -> Self {
        match v {
            Value::Null => DictKey::Null,
            Value::Bool(b) => DictKey::Bool(b),
            Value::Int(i) => DictKey::Int(i),
            Value::Real(f) => DictKey::RealBits(f.to_bits()),
            Value::Str(h) => DictKey::Str(h),
            Value::Object(h) | Value::Property(h) | Value::UserData(h) => DictKey::Ref(h),
        }
    }
}

/// Value→Value map (spec §3.2 `Dictionary`). Iteration order is
/// intentionally undocumented upstream (spec §9 Open Question); callers must
/// not depend on it, so this is a plain `HashMap` rather than an `IndexMap`.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    pub map: std::collections::HashMap<DictKey, (Value, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        self.map.insert(DictKey::from_value(key), (key, value));
    }

    pub fn get(&self, key: Value) -> Option<Value> {
        self.map.get(&DictKey::from_value(key)).map(|(_, v)| *v)
    }

    pub fn remove(&mut self, key: Value) -> Option<Value> {
        self.map.remove(&DictKey::from_value(key)).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Endianness for `ByteArray` wire reads/writes (spec §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Mutable byte buffer with a read/write cursor (spec §3.2 `ByteArray`).
#[derive(Debug, Clone)]
pub struct ByteArray {
    pub bytes: Vec<u8>,
    pub pos: usize,
    pub endian: Endian,
    pub auto_grow: bool,
}

impl ByteArray {
    pub fn new(endian: Endian) -> Self {
        Self {
            bytes: Vec::new(),
            pos: 0,
            endian,
            auto_grow: true,
        }
    }

    /// Setting `length` shorter than the current position clamps position to
    /// the new end (spec §8 boundary behavior).
    pub fn set_length(&mut self, len: usize) {
        self.bytes.resize(len, 0);
        if self.pos > len {
            self.pos = len;
        }
    }
}

/// Opaque native-data box (spec §3.2/§4.7 `UserData`). Two flavors per spec
/// §4.7: external-pointer (caller-owned memory) and managed (freed with the
/// box).
pub enum UserDataKind {
    External(*mut std::ffi::c_void),
    Managed(Box<dyn std::any::Any>),
}

pub struct UserDataBox {
    pub kind: UserDataKind,
    pub mark: Option<fn(&UserDataBox, &mut dyn FnMut(Handle))>,
    pub finalize: Option<fn(&mut UserDataBox)>,
}

impl std::fmt::Debug for UserDataBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDataBox").finish_non_exhaustive()
    }
}

impl Drop for UserDataBox {
    fn drop(&mut self) {
        if let Some(fin) = self.finalize {
            fin(self);
        }
    }
}
