//! Loaded source files (spec §3.2 `Script`): a compiled top-level function
//! plus a run-once guard.
//!
//! `run()` is grounded on `original_source/libpika/PImport.cpp`'s
//! `Pika_importScript` (`script->Run(0)` then `script->GetImportResult()`):
//! running a Script executes its compiled top-level Function through the
//! normal call protocol and records whatever it returns; a second `run()`
//! is a no-op that returns the same cached `Value` again (spec §3.2
//! "run-once flag").

use crate::core::heap::{GcHeap, HeapObj, ScriptData};
use crate::core::value::{Handle, Value};
use crate::engine::error::PikaError;
use crate::vm::context::Context;

pub fn create(heap: &mut GcHeap, path: std::rc::Rc<str>) -> Handle {
    heap.alloc(HeapObj::Script(ScriptData {
        path,
        root: None,
        has_run: false,
        result: None,
    }))
}

pub fn set_root(heap: &mut GcHeap, script: Handle, root: Handle) {
    heap.write_barrier(script, root);
    if let HeapObj::Script(s) = heap.get_mut(script) {
        s.root = Some(root);
    }
}

pub fn root(heap: &GcHeap, script: Handle) -> Option<Handle> {
    match heap.get(script) {
        HeapObj::Script(s) => s.root,
        _ => None,
    }
}

pub fn path(heap: &GcHeap, script: Handle) -> std::rc::Rc<str> {
    match heap.get(script) {
        HeapObj::Script(s) => s.path.clone(),
        _ => panic!("Handle does not refer to a Script"),
    }
}

pub fn has_run(heap: &GcHeap, script: Handle) -> bool {
    matches!(heap.get(script), HeapObj::Script(s) if s.has_run)
}

/// The Value `run()` produced, if it has already run — used by the import
/// pipeline to fetch the published result Package without re-running the
/// script (spec §4.6 "Script loader ... returns the script's result
/// Package").
pub fn result(heap: &GcHeap, script: Handle) -> Option<Value> {
    match heap.get(script) {
        HeapObj::Script(s) => s.result,
        _ => None,
    }
}

/// Run the Script's compiled top-level function (spec §6.1 `Script::run`).
/// The first call invokes the top level with `args` packed into the single
/// Array parameter the call protocol expects, and records whatever `Value`
/// it returns; every later call is a no-op that returns that same `Value`
/// without re-executing side effects.
pub fn run(ctx: &mut Context<'_>, script: Handle, args: &[Value]) -> Result<Value, PikaError> {
    if has_run(&ctx.engine.heap, script) {
        return Ok(result(&ctx.engine.heap, script).unwrap_or(Value::Null));
    }

    let top_level = root(&ctx.engine.heap, script).ok_or_else(|| PikaError::runtime("script has no compiled top level"))?;

    let arg_array = crate::object::array_::create(&mut ctx.engine.heap);
    for a in args {
        crate::object::array_::push(&mut ctx.engine.heap, arg_array, *a);
    }
    let returned = ctx.call(top_level, &[Value::Object(arg_array)], 1)?;
    let result_value = returned.into_iter().next().unwrap_or(Value::Null);

    if let Some(h) = result_value.handle() {
        ctx.engine.heap.write_barrier(script, h);
    }
    if let HeapObj::Script(s) = ctx.engine.heap.get_mut(script) {
        s.has_run = true;
        s.result = Some(result_value);
    }

    Ok(result_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::engine::Engine;
    use crate::object::function;
    use crate::vm::opcode::OpCode;

    #[test]
    fn second_run_is_a_no_op_returning_the_cached_result() {
        let mut engine = Engine::create();
        // fn(args) { return 7 }
        let code = vec![OpCode::LoadConst(0), OpCode::Return];
        let top_level = function::create_bytecode(&mut engine.heap, None, 1, false, 1, code, vec![Value::Int(7)], Vec::new(), Vec::new(), None);
        let script = create(&mut engine.heap, std::rc::Rc::from("demo.pika"));
        set_root(&mut engine.heap, script, top_level);

        let ctx_handle = crate::vm::context::create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);

        let first = run(&mut ctx, script, &[]).unwrap();
        assert_eq!(first, Value::Int(7));
        assert!(has_run(&ctx.engine.heap, script));

        let second = run(&mut ctx, script, &[]).unwrap();
        assert_eq!(second, Value::Int(7));
    }
}
