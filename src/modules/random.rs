//! Bundled `random` module: a seedable generator exposed as script-visible
//! methods, grounded on `original_source/libpika/PRandom.cpp`'s `Random`
//! type (`opCall`/`next`, `nextReal`, `generate`, `setSeed`/`getSeed`).
//! The Mersenne-Twister implementation itself is replaced by the `rand`
//! crate (spec §9 "macro-generated native wrappers" redesign note extends
//! naturally to "hand-rolled PRNG core" — no reason to hand-roll MT19937
//! when the pack's own dependency stack already carries a vetted one).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::binding::native::{install_module, Binding};
use crate::core::value::{Handle, Value};
use crate::engine::engine::Engine;
use crate::engine::error::PikaError;
use crate::object::userdata;
use crate::vm::context::Context;

struct RandomState {
    rng: StdRng,
    seed: u64,
}

fn with_state<'a>(heap: &'a mut crate::core::heap::GcHeap, h: Handle) -> Result<&'a mut RandomState, PikaError> {
    userdata::downcast_mut::<RandomState>(heap, h).ok_or_else(|| PikaError::type_error("expected a Random UserData"))
}

fn new_with_seed(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let seed = match args.first() {
        Some(Value::Int(i)) => *i as u64,
        _ => 0,
    };
    let state = RandomState {
        rng: StdRng::seed_from_u64(seed),
        seed,
    };
    Ok(Value::UserData(userdata::create_managed(&mut ctx.engine.heap, state)))
}

fn receiver(args: &[Value]) -> Result<Handle, PikaError> {
    match args.first() {
        Some(Value::UserData(h)) => Ok(*h),
        _ => Err(PikaError::type_error("expected a Random receiver")),
    }
}

fn next_int(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let state = with_state(&mut ctx.engine.heap, h)?;
    Ok(Value::Int(state.rng.gen::<i64>()))
}

fn next_real(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let state = with_state(&mut ctx.engine.heap, h)?;
    Ok(Value::Real(state.rng.gen::<f64>()))
}

fn set_seed(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let seed = match args.get(1) {
        Some(Value::Int(i)) => *i as u64,
        _ => return Err(PikaError::type_error("setSeed expects an Int")),
    };
    let state = with_state(&mut ctx.engine.heap, h)?;
    state.seed = seed;
    state.rng = StdRng::seed_from_u64(seed);
    Ok(Value::Null)
}

fn get_seed(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let state = with_state(&mut ctx.engine.heap, h)?;
    Ok(Value::Int(state.seed as i64))
}

pub fn install(engine: &mut Engine, parent: Handle) -> Handle {
    install_module(
        engine,
        parent,
        "random",
        &[
            Binding::StaticMethod("new", new_with_seed),
            Binding::Method("next", next_int),
            Binding::Method("nextReal", next_real),
            Binding::Method("setSeed", set_seed),
            Binding::Method("getSeed", get_seed),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_instance(engine: &mut Engine, pkg: Handle, seed: i64) -> (Handle, Handle) {
        let ctx_handle = crate::vm::context::create(engine);
        let sym = engine.interner.find(b"new").unwrap();
        let func = match crate::object::package::get_own_slot(&engine.heap, pkg, sym) {
            Some(Value::Object(h)) => h,
            _ => panic!("new not installed"),
        };
        let mut ctx = Context::new(engine, ctx_handle);
        let result = ctx.call(func, &[Value::Int(seed)], 1).unwrap();
        let instance = match result[0] {
            Value::UserData(h) => h,
            _ => panic!("expected a UserData instance"),
        };
        (ctx_handle, instance)
    }

    #[test]
    fn same_seed_reproduces_the_same_sequence() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let (ctx1, inst1) = make_instance(&mut engine, pkg, 42);
        let sym_next = engine.interner.find(b"next").unwrap();
        let func = match crate::object::package::get_own_slot(&engine.heap, pkg, sym_next) {
            Some(Value::Object(h)) => h,
            _ => panic!("next not installed"),
        };
        let a = {
            let mut ctx = Context::new(&mut engine, ctx1);
            ctx.call(func, &[Value::UserData(inst1)], 1).unwrap()
        };

        let (ctx2, inst2) = make_instance(&mut engine, pkg, 42);
        let b = {
            let mut ctx = Context::new(&mut engine, ctx2);
            ctx.call(func, &[Value::UserData(inst2)], 1).unwrap()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn get_seed_reports_last_set_seed() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let (ctx_handle, inst) = make_instance(&mut engine, pkg, 7);
        let sym_get = engine.interner.find(b"getSeed").unwrap();
        let func = match crate::object::package::get_own_slot(&engine.heap, pkg, sym_get) {
            Some(Value::Object(h)) => h,
            _ => panic!("getSeed not installed"),
        };
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.call(func, &[Value::UserData(inst)], 1).unwrap();
        assert_eq!(result, vec![Value::Int(7)]);
    }
}
