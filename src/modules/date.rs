//! Bundled `date` module: a `UserData`-boxed timestamp with the same
//! field-property surface as `original_source/libpika/PDate.cpp`'s `Date`
//! type (`sec`/`min`/`hour`/`mday`/`mon`/`year`/`wday`/`yday`), backed by
//! `chrono` rather than the original's libc `struct tm` wrapping.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::binding::native::{install_module, Binding};
use crate::core::value::{Handle, Value};
use crate::engine::engine::Engine;
use crate::engine::error::PikaError;
use crate::object::userdata;
use crate::vm::context::Context;

struct DateState {
    when: NaiveDateTime,
}

fn receiver(args: &[Value]) -> Result<Handle, PikaError> {
    match args.first() {
        Some(Value::UserData(h)) => Ok(*h),
        _ => Err(PikaError::type_error("expected a Date receiver")),
    }
}

fn with_state<'a>(heap: &'a crate::core::heap::GcHeap, h: Handle) -> Result<&'a DateState, PikaError> {
    userdata::downcast_ref::<DateState>(heap, h).ok_or_else(|| PikaError::type_error("expected a Date UserData"))
}

fn from_epoch(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let secs = match args.first() {
        Some(Value::Int(i)) => *i,
        _ => return Err(PikaError::type_error("fromEpoch expects an Int")),
    };
    let when = chrono::DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| PikaError::runtime("timestamp out of range"))?
        .naive_utc();
    Ok(Value::UserData(userdata::create_managed(&mut ctx.engine.heap, DateState { when })))
}

fn sec(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.second() as i64))
}

fn min(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.minute() as i64))
}

fn hour(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.hour() as i64))
}

fn mday(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.day() as i64))
}

fn mon(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.month0() as i64))
}

fn year(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.year() as i64))
}

fn wday(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.weekday().num_days_from_sunday() as i64))
}

fn yday(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    Ok(Value::Int(with_state(&ctx.engine.heap, h)?.when.ordinal0() as i64))
}

/// Seconds between two Dates (spec's `original_source` grounding names this
/// `opSub`, the teacher's operator-overload convention; here it's a plain
/// named method since operator dispatch is out of scope).
fn diff(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let a = receiver(args)?;
    let b = match args.get(1) {
        Some(Value::UserData(h)) => *h,
        _ => return Err(PikaError::type_error("diff expects a second Date")),
    };
    let a_when = with_state(&ctx.engine.heap, a)?.when;
    let b_when = with_state(&ctx.engine.heap, b)?.when;
    Ok(Value::Int((a_when - b_when).num_seconds()))
}

pub fn install(engine: &mut Engine, parent: Handle) -> Handle {
    install_module(
        engine,
        parent,
        "date",
        &[
            Binding::StaticMethod("fromEpoch", from_epoch),
            Binding::Method("sec", sec),
            Binding::Method("min", min),
            Binding::Method("hour", hour),
            Binding::Method("mday", mday),
            Binding::Method("mon", mon),
            Binding::Method("year", year),
            Binding::Method("wday", wday),
            Binding::Method("yday", yday),
            Binding::Method("diff", diff),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(engine: &mut Engine, pkg: Handle, method: &str, args: &[Value]) -> Value {
        let ctx_handle = crate::vm::context::create(engine);
        let sym = engine.interner.find(method.as_bytes()).unwrap();
        let func = match crate::object::package::get_own_slot(&engine.heap, pkg, sym) {
            Some(Value::Object(h)) => h,
            _ => panic!("{method} not installed"),
        };
        let mut ctx = Context::new(engine, ctx_handle);
        ctx.call(func, args, 1).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn epoch_zero_is_the_unix_origin() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let instance = call(&mut engine, pkg, "fromEpoch", &[Value::Int(0)]);
        assert_eq!(call(&mut engine, pkg, "year", &[instance]), Value::Int(1970));
        assert_eq!(call(&mut engine, pkg, "mon", &[instance]), Value::Int(0));
        assert_eq!(call(&mut engine, pkg, "mday", &[instance]), Value::Int(1));
    }

    #[test]
    fn diff_reports_elapsed_seconds() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let later = call(&mut engine, pkg, "fromEpoch", &[Value::Int(100)]);
        let earlier = call(&mut engine, pkg, "fromEpoch", &[Value::Int(40)]);
        assert_eq!(call(&mut engine, pkg, "diff", &[later, earlier]), Value::Int(60));
    }
}
