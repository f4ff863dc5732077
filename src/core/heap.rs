//! GC-managed object storage (spec §3/§4.1).
//!
//! Pairs a `core::gc::Collector` (pure color/state bookkeeping) with the
//! actual payload array. `HeapObj` is the tagged union of everything a
//! `Handle` can address; it lives here rather than under `object::` so that
//! `object::*` can stay a pure behavior layer over `Handle`s without owning
//! any data of its own, avoiding a `core` <-> `object` cycle.
//!
//! Grounded on the teacher's `core/heap.rs` (`Arena`: alloc/get/get_mut/free
//! over a `Vec` with a free list) for the storage half, and
//! `original_source/libpika/PCollector.cpp` for collection semantics (see
//! `core::gc`).

use crate::core::gc::Collector;
use crate::core::value::{ByteArray, Dictionary, PikaArray, PikaString, Table, UserDataBox, Value};

/// Everything reachable through a `Handle`. Stands in for the teacher's
/// `GCObject -> Basic -> Object -> Package -> Type` inheritance chain (spec
/// §9 redesign note): one flat enum instead of a class hierarchy.
#[derive(Debug)]
pub enum HeapObj {
    Str(PikaString),
    /// A bare attribute table, used where no richer entity (Object,
    /// Package, Type) is needed — e.g. a function's closed-over scope.
    Table(Table),
    Object(ObjectData),
    Package(PackageData),
    Type(TypeData),
    Function(FunctionData),
    Array(PikaArray),
    Dictionary(Dictionary),
    ByteArray(ByteArray),
    UserData(UserDataBox),
    Property(PropertyData),
    Module(ModuleData),
    Script(ScriptData),
    Context(crate::vm::context::ContextData),
}

/// Instance state (spec §4.3): a slot table plus the type it was
/// instantiated from.
#[derive(Debug)]
pub struct ObjectData {
    pub slots: Table,
    pub type_obj: Option<crate::core::value::Handle>,
}

impl ObjectData {
    pub fn new(type_obj: Option<crate::core::value::Handle>) -> Self {
        Self {
            slots: Table::new(),
            type_obj,
        }
    }
}

/// A lexical scope / namespace (spec §4.3). A package's slot table doubles
/// as the world object's global scope when it has no parent. Packages form
/// a tree rooted at the global "world" package (spec §4.3): `parent` points
/// up, `children` lists every Package/Type registered under this one, which
/// together let a Package compute its dotted name path and enumerate its
/// children (spec §3.2 Package key attributes).
#[derive(Debug)]
pub struct PackageData {
    pub slots: Table,
    pub parent: Option<crate::core::value::Handle>,
    pub name: Option<crate::core::value::Symbol>,
    pub children: Vec<crate::core::value::Handle>,
}

impl PackageData {
    pub fn new(name: Option<crate::core::value::Symbol>, parent: Option<crate::core::value::Handle>) -> Self {
        Self {
            slots: Table::new(),
            parent,
            name,
            children: Vec::new(),
        }
    }
}

/// A class-like entity (spec §4.3): method table plus a single base (no
/// multiple inheritance per spec's base *chain*, a linear list not a DAG),
/// plus the constructor/abstract/final bookkeeping spec §3.2 lists among a
/// Type's key attributes.
#[derive(Debug)]
pub struct TypeData {
    pub name: Option<crate::core::value::Symbol>,
    pub methods: Table,
    pub base: Option<crate::core::value::Handle>,
    /// Called when instance slot lookup falls through the base chain
    /// entirely (spec §4.3 "user-defined delegate").
    pub delegate: Option<crate::core::value::Handle>,
    /// The Function invoked by a `new`-style call to produce a fresh
    /// instance (spec §4.3).
    pub constructor: Option<crate::core::value::Handle>,
    /// Forbids direct construction (spec §3.2/§4.3).
    pub is_abstract: bool,
    /// Forbids subtyping (spec §3.2/§4.3).
    pub is_final: bool,
}

impl TypeData {
    pub fn new(name: Option<crate::core::value::Symbol>, base: Option<crate::core::value::Handle>) -> Self {
        Self {
            name,
            methods: Table::new(),
            base,
            delegate: None,
            constructor: None,
            is_abstract: false,
            is_final: false,
        }
    }
}

/// A getter/setter pair bound as a slot value (spec §4.3 property slots).
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyData {
    pub getter: Option<Value>,
    pub setter: Option<Value>,
}

/// Either a script-compiled function body or a native callback (spec §4.4).
pub enum Def {
    Bytecode(BytecodeDef),
    Native(NativeFn),
}

impl std::fmt::Debug for Def {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Def::Bytecode(b) => f.debug_tuple("Bytecode").field(b).finish(),
            Def::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A `(pc, line)` breakpoint in the line map: the source line becomes `line`
/// starting at instruction `pc` and holds until the next entry (spec §4.8,
/// consumed by the instruction-level debugger to detect line changes).
pub type LineMapEntry = (u32, u32);

#[derive(Debug, Clone)]
pub struct BytecodeDef {
    pub name: Option<crate::core::value::Symbol>,
    pub arity: u16,
    pub is_variadic: bool,
    pub num_locals: u16,
    pub code: std::rc::Rc<Vec<crate::vm::opcode::OpCode>>,
    /// Constant operands (spec §3.2 Def "literal pool"), indexed by
    /// `OpCode::LoadConst`.
    pub literals: std::rc::Rc<Vec<Value>>,
    pub defaults: Vec<Value>,
    pub line_map: std::rc::Rc<Vec<LineMapEntry>>,
}

impl BytecodeDef {
    /// The source line active at instruction `pc` (spec §4.8 instruction
    /// debugger: "checks whether the current line ... changed").
    pub fn line_at(&self, pc: usize) -> u32 {
        let mut line = 0;
        for &(at, l) in self.line_map.iter() {
            if at as usize <= pc {
                line = l;
            } else {
                break;
            }
        }
        line
    }
}

pub type NativeFn = fn(&mut crate::vm::context::Context<'_>, &[Value]) -> Result<Value, crate::engine::error::PikaError>;

/// A bound function: a `Def` plus the closure scope and optional receiver it
/// was bound against (spec §4.4).
#[derive(Debug)]
pub struct FunctionData {
    pub def: std::rc::Rc<Def>,
    pub closure: Option<crate::core::value::Handle>,
    pub bound_self: Option<Value>,
}

/// Module cache entry states (spec §4.6, grounded on `PImport.cpp`'s
/// distinct `Loading`/`Module`/`Package`/`Function` outcomes).
#[derive(Debug)]
pub enum ModuleData {
    Loading,
    Module(crate::core::value::Handle),
    Package(crate::core::value::Handle),
    Function(crate::core::value::Handle),
}

#[derive(Debug)]
pub struct ScriptData {
    pub path: std::rc::Rc<str>,
    pub root: Option<crate::core::value::Handle>,
    /// Set once `run()` has executed the top-level function (spec §3.2
    /// Script "run-once flag"); a second `run()` is a no-op that returns the
    /// cached result instead of re-executing side effects.
    pub has_run: bool,
    pub result: Option<crate::core::value::Value>,
}

/// Tracing contract: push every `Handle` directly owned by this object into
/// `push`. The collector calls this during `GrayScan`/`Sweep` re-gray; it
/// never recurses itself (recursion happens iteratively in
/// `core::gc::Collector::run_incremental_with`'s gray-scan loop).
pub trait Traceable {
    fn trace(&self, push: &mut dyn FnMut(crate::core::value::Handle));
}

impl Traceable for HeapObj {
    fn trace(&self, push: &mut dyn FnMut(crate::core::value::Handle)) {
        match self {
            HeapObj::Str(_) => {}
            HeapObj::Table(t) => trace_table(t, push),
            HeapObj::Object(o) => {
                trace_table(&o.slots, push);
                if let Some(h) = o.type_obj {
                    push(h);
                }
            }
            HeapObj::Package(p) => {
                trace_table(&p.slots, push);
                if let Some(h) = p.parent {
                    push(h);
                }
                for &h in &p.children {
                    push(h);
                }
            }
            HeapObj::Type(t) => {
                trace_table(&t.methods, push);
                if let Some(h) = t.base {
                    push(h);
                }
                if let Some(h) = t.delegate {
                    push(h);
                }
                if let Some(h) = t.constructor {
                    push(h);
                }
            }
            HeapObj::Function(f) => {
                if let Some(h) = f.closure {
                    push(h);
                }
                if let Some(v) = f.bound_self {
                    trace_value(v, push);
                }
                if let Def::Bytecode(b) = f.def.as_ref() {
                    for d in &b.defaults {
                        trace_value(*d, push);
                    }
                    for l in b.literals.iter() {
                        trace_value(*l, push);
                    }
                }
            }
            HeapObj::Array(a) => {
                for v in &a.items {
                    trace_value(*v, push);
                }
            }
            HeapObj::Dictionary(d) => {
                for (k, v) in d.map.values() {
                    trace_value(*k, push);
                    trace_value(*v, push);
                }
            }
            HeapObj::ByteArray(_) => {}
            HeapObj::UserData(u) => {
                if let Some(mark) = u.mark {
                    mark(u, push);
                }
            }
            HeapObj::Property(p) => {
                if let Some(v) = p.getter {
                    trace_value(v, push);
                }
                if let Some(v) = p.setter {
                    trace_value(v, push);
                }
            }
            HeapObj::Module(m) => match m {
                ModuleData::Loading => {}
                ModuleData::Module(h) | ModuleData::Package(h) | ModuleData::Function(h) => push(*h),
            },
            HeapObj::Script(s) => {
                if let Some(h) = s.root {
                    push(h);
                }
                if let Some(v) = s.result {
                    trace_value(v, push);
                }
            }
            HeapObj::Context(c) => {
                for v in &c.stack {
                    trace_value(*v, push);
                }
                for f in &c.frames {
                    push(f.function);
                }
            }
        }
    }
}

fn trace_table(t: &Table, push: &mut dyn FnMut(crate::core::value::Handle)) {
    for slot in t.slots.values() {
        trace_value(slot.value, push);
    }
}

fn trace_value(v: Value, push: &mut dyn FnMut(crate::core::value::Handle)) {
    if let Some(h) = v.handle() {
        push(h);
    }
}

/// Owns both the collector's color/state bookkeeping and the payload array
/// it indexes into. The two are kept in lockstep: a `Handle` is valid in one
/// iff it is valid in the other.
pub struct GcHeap {
    collector: Collector,
    storage: Vec<Option<HeapObj>>,
}

impl GcHeap {
    pub fn new() -> Self {
        Self {
            collector: Collector::new(),
            storage: Vec::new(),
        }
    }

    pub fn alloc(&mut self, obj: HeapObj) -> crate::core::value::Handle {
        let idx = self.collector.alloc();
        self.ensure_capacity(idx);
        self.storage[idx as usize] = Some(obj);
        crate::core::value::Handle(idx)
    }

    fn ensure_capacity(&mut self, idx: u32) {
        if self.storage.len() <= idx as usize {
            self.storage.resize_with(idx as usize + 1, || None);
        }
    }

    pub fn get(&self, h: crate::core::value::Handle) -> &HeapObj {
        self.storage[h.0 as usize]
            .as_ref()
            .expect("dangling Handle: slot was swept while still referenced")
    }

    pub fn get_mut(&mut self, h: crate::core::value::Handle) -> &mut HeapObj {
        self.storage[h.0 as usize]
            .as_mut()
            .expect("dangling Handle: slot was swept while still referenced")
    }

    pub fn add_as_root(&mut self, h: crate::core::value::Handle) {
        self.collector.add_as_root(h.0);
    }

    pub fn remove_as_root(&mut self, h: crate::core::value::Handle) -> bool {
        self.collector.remove_as_root(h.0)
    }

    pub fn set_persistent(&mut self, h: crate::core::value::Handle, persistent: bool) {
        self.collector.set_persistent(h.0, persistent);
    }

    pub fn write_barrier(&mut self, container: crate::core::value::Handle, referent: crate::core::value::Handle) {
        self.collector.write_barrier(container.0, referent.0);
    }

    pub fn change_context(&mut self, ctx: Option<crate::core::value::Handle>) {
        self.collector.change_context(ctx.map(|h| h.0));
    }

    pub fn pause(&mut self) {
        self.collector.pause();
    }

    pub fn resume(&mut self) {
        self.collector.resume();
    }

    pub fn live_count(&self) -> usize {
        self.collector.live_count()
    }

    /// Whether `h` still names a live slot (spec §4.2: the Engine's string
    /// table prunes entries whose target string was swept).
    pub fn is_live(&self, h: crate::core::value::Handle) -> bool {
        self.storage.get(h.0 as usize).map(|s| s.is_some()).unwrap_or(false)
    }

    /// Run one incremental unit of work, tracing through `self.storage`.
    /// Mirrors `Collector::Check()` (spec §4.1).
    pub fn step(&mut self) {
        let storage = &self.storage;
        self.collector.check(|idx, push| {
            if let Some(obj) = &storage[idx as usize] {
                obj.trace(&mut |h| push(h.0));
            }
        });
        self.drop_swept_payloads();
    }

    /// `CheckIf()` counterpart of `step` — only runs when the allocation
    /// counter is exhausted.
    pub fn step_if_due(&mut self) {
        let storage = &self.storage;
        self.collector.check_if(|idx, push| {
            if let Some(obj) = &storage[idx as usize] {
                obj.trace(&mut |h| push(h.0));
            }
        });
        self.drop_swept_payloads();
    }

    fn drop_swept_payloads(&mut self) {
        for idx in 0..self.storage.len() as u32 {
            if self.storage[idx as usize].is_some() && !self.collector.is_live(idx) {
                self.storage[idx as usize] = None;
            }
        }
    }

    /// Drive a full collection cycle to completion, then physically drop
    /// swept slots' payloads (the collector only tracks color/liveness; the
    /// heap is responsible for actually dropping `HeapObj` values).
    pub fn collect(&mut self) {
        let storage = &self.storage;
        self.collector.full_collect(|idx, push| {
            if let Some(obj) = &storage[idx as usize] {
                obj.trace(&mut |h| push(h.0));
            }
        });
        self.drop_swept_payloads();
    }
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::PikaString;

    #[test]
    fn alloc_and_get_roundtrip() {
        let mut heap = GcHeap::new();
        let h = heap.alloc(HeapObj::Str(PikaString::new(b"hi".to_vec())));
        match heap.get(h) {
            HeapObj::Str(s) => assert_eq!(s.bytes.as_slice(), b"hi"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unreachable_cycle_is_collected() {
        let mut heap = GcHeap::new();
        let a = heap.alloc(HeapObj::Table(Table::new()));
        let b = heap.alloc(HeapObj::Table(Table::new()));
        // a references b, b references a: a cycle with no external root.
        let sym = crate::core::value::Symbol(0);
        if let HeapObj::Table(t) = heap.get_mut(a) {
            t.set(sym, Value::Object(b));
        }
        if let HeapObj::Table(t) = heap.get_mut(b) {
            t.set(sym, Value::Object(a));
        }
        let before = heap.live_count();
        heap.collect();
        assert!(heap.live_count() < before);
    }

    #[test]
    fn rooted_object_survives_collection() {
        let mut heap = GcHeap::new();
        let root = heap.alloc(HeapObj::Str(PikaString::new(b"keep".to_vec())));
        heap.add_as_root(root);
        heap.collect();
        match heap.get(root) {
            HeapObj::Str(s) => assert_eq!(s.bytes.as_slice(), b"keep"),
            _ => panic!("wrong variant"),
        }
    }
}
