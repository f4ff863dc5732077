//! End-to-end scenarios exercising the runtime the way an embedder would,
//! one test per literal scenario this system is built against: string
//! identity, incremental GC safety, import caching/circularity, ByteArray
//! round-tripping, the call protocol's stack-depth invariant, and Property
//! access going through the call machinery rather than handing back the
//! descriptor.

use pika_rt::core::heap::{GcHeap, HeapObj};
use pika_rt::core::value::{Endian, Value};
use pika_rt::engine::engine::Engine;
use pika_rt::engine::error::PikaError;
use pika_rt::engine::import::ImportHook;
use pika_rt::object::{array_, bytearray, function, object, property, type_};
use pika_rt::vm::context::{self, Context};

#[test]
fn string_interning_identity() {
    let mut engine = Engine::create();
    let s1 = engine.get_string(b"hello");
    let s2 = engine.get_string(b"hello");
    assert_eq!(s1, s2, "identical byte sequences must intern to the same handle");
}

#[test]
fn incremental_gc_safety_over_a_long_reference_chain() {
    let mut heap = GcHeap::new();

    let mut newest = array_::create(&mut heap);
    for _ in 0..9_999 {
        let next = array_::create(&mut heap);
        array_::push(&mut heap, next, Value::Object(newest));
        newest = next;
    }

    heap.add_as_root(newest);
    let before = heap.live_count();
    heap.collect();
    let after = heap.live_count();

    assert_eq!(before, 10_000, "chain should hold exactly 10,000 live arrays before collection");
    assert_eq!(after, 10_000, "the whole chain is reachable through the single root and must survive intact");
}

struct ExportingScriptHook {
    name: &'static str,
}

impl ImportHook for ExportingScriptHook {
    fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<pika_rt::core::value::Handle, PikaError>> {
        if name != self.name {
            return None;
        }
        Some(Ok(pika_rt::object::package::create(&mut ctx.engine.heap, None, None)))
    }
}

struct SelfImportingHook {
    name: &'static str,
}

impl ImportHook for SelfImportingHook {
    fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<pika_rt::core::value::Handle, PikaError>> {
        if name != self.name {
            return None;
        }
        Some(ctx.import(self.name))
    }
}

#[test]
fn repeated_import_of_the_same_module_returns_the_same_package() {
    let mut engine = Engine::create();
    engine.add_import_hook(Box::new(ExportingScriptHook { name: "m" }));
    let ctx_handle = context::create(&mut engine);
    let mut ctx = Context::new(&mut engine, ctx_handle);

    let first = ctx.import("m").unwrap();
    let second = ctx.import("m").unwrap();
    assert_eq!(first, second, "both imports of 'm' must yield the same Package");
}

#[test]
fn a_module_that_imports_itself_raises_circular_dependency() {
    let mut engine = Engine::create();
    engine.add_import_hook(Box::new(SelfImportingHook { name: "m" }));
    let ctx_handle = context::create(&mut engine);
    let mut ctx = Context::new(&mut engine, ctx_handle);

    let err = ctx.import("m").unwrap_err();
    assert!(err.message.contains("circular dependency"), "got: {}", err.message);
}

#[test]
fn bytearray_round_trips_big_endian_byte_word_and_dword() {
    let mut heap = GcHeap::new();
    let ba = bytearray::create(&mut heap, Endian::Big);

    assert!(bytearray::write_byte(&mut heap, ba, 0x01));
    assert!(bytearray::write_u16(&mut heap, ba, 0x0203));
    assert!(bytearray::write_u32(&mut heap, ba, 0x04050607));

    if let HeapObj::ByteArray(b) = heap.get_mut(ba) {
        b.pos = 0;
    }

    assert_eq!(bytearray::read_byte(&mut heap, ba), Some(0x01));
    assert_eq!(bytearray::read_u16(&mut heap, ba), Some(0x0203));
    assert_eq!(bytearray::read_u32(&mut heap, ba), Some(0x04050607));
}

fn native_add_two(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    match (args.first(), args.get(1)) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(Value::Int(a + b)),
        _ => Err(PikaError::type_error("expected two Ints")),
    }
}

#[test]
fn native_call_with_two_args_and_one_return_increases_caller_stack_depth_by_one() {
    use pika_rt::vm::opcode::OpCode;

    let mut engine = Engine::create();
    let func = function::create_native(&mut engine.heap, native_add_two);

    // marker, callee, arg1, arg2, Call(2) -> [marker, result]; Return with
    // expected_returns=2 hands both back, so a passing result demonstrates
    // the net stack effect of the call (push callee+2 args, pop 3, push 1
    // result) is +1 relative to the depth just before the callee/args were
    // pushed, while anything already on the stack below is untouched.
    let code = vec![
        OpCode::LoadConst(0),
        OpCode::LoadConst(1),
        OpCode::LoadConst(2),
        OpCode::LoadConst(3),
        OpCode::Call(2),
        OpCode::Return,
    ];
    let literals = vec![Value::Int(999), Value::Object(func), Value::Int(2), Value::Int(3)];
    let wrapper = function::create_bytecode(&mut engine.heap, None, 0, false, 0, code, literals, Vec::new(), Vec::new(), None);

    let ctx_handle = context::create(&mut engine);
    let mut ctx = Context::new(&mut engine, ctx_handle);
    let result = ctx.call(wrapper, &[], 2).unwrap();
    assert_eq!(result, vec![Value::Int(999), Value::Int(5)]);
}

fn getter_42(_ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value, PikaError> {
    Ok(Value::Int(42))
}

#[test]
fn reading_a_property_backed_slot_yields_the_getters_result_not_the_descriptor() {
    let mut engine = Engine::create();
    let getter_fn = function::create_native(&mut engine.heap, getter_42);
    let prop = property::create(&mut engine.heap, Some(Value::Object(getter_fn)), None);

    let ty = type_::create(&mut engine.heap, None, None);
    let name = engine.interner.intern(b"answer");
    type_::set_method(&mut engine.heap, ty, name, Value::Object(prop));
    let instance = object::create(&mut engine.heap, Some(ty));

    let ctx_handle = context::create(&mut engine);
    let mut ctx = Context::new(&mut engine, ctx_handle);

    use pika_rt::vm::opcode::OpCode;
    let bytecode = vec![OpCode::LoadLocal(0), OpCode::GetSlot(name), OpCode::Return];
    let top_level = function::create_bytecode(&mut ctx.engine.heap, None, 1, false, 1, bytecode, Vec::new(), Vec::new(), Vec::new(), None);

    let result = ctx.call(top_level, &[Value::Object(instance)], 1).unwrap();
    assert_eq!(result, vec![Value::Int(42)], "slot access must run the getter, not surface the Property object");
}
