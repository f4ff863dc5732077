//! Bundled `bytearray` module (spec §6.4): installs a `ByteArray` native
//! constructor plus read/write methods over `object::bytearray` as a
//! Package under the world, the way `original_source/libpika/PByteArray.cpp`
//! exposes `ByteArray` as a builtin script-visible type.

use crate::binding::native::{install_module, Binding};
use crate::core::value::{Endian, Value};
use crate::engine::engine::Engine;
use crate::engine::error::PikaError;
use crate::object::bytearray;
use crate::vm::context::Context;

fn new_big(ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value, PikaError> {
    let h = bytearray::create(&mut ctx.engine.heap, Endian::Big);
    Ok(Value::Object(h))
}

fn new_little(ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value, PikaError> {
    let h = bytearray::create(&mut ctx.engine.heap, Endian::Little);
    Ok(Value::Object(h))
}

fn write_byte(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let (target, value) = two_args(args)?;
    let byte = expect_int(value)? as u8;
    Ok(Value::Bool(bytearray::write_byte(&mut ctx.engine.heap, target, byte)))
}

fn read_byte(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let target = one_arg(args)?;
    Ok(bytearray::read_byte(&mut ctx.engine.heap, target).map(|b| Value::Int(b as i64)).unwrap_or(Value::Null))
}

fn write_u32(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let (target, value) = two_args(args)?;
    let word = expect_int(value)? as u32;
    Ok(Value::Bool(bytearray::write_u32(&mut ctx.engine.heap, target, word)))
}

fn read_u32(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let target = one_arg(args)?;
    Ok(bytearray::read_u32(&mut ctx.engine.heap, target).map(|v| Value::Int(v as i64)).unwrap_or(Value::Null))
}

fn set_length(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let (target, value) = two_args(args)?;
    bytearray::set_length(&mut ctx.engine.heap, target, expect_int(value)? as usize);
    Ok(Value::Null)
}

fn length(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let target = one_arg(args)?;
    Ok(Value::Int(bytearray::len(&ctx.engine.heap, target) as i64))
}

fn one_arg(args: &[Value]) -> Result<crate::core::value::Handle, PikaError> {
    match args.first() {
        Some(Value::Object(h)) => Ok(*h),
        _ => Err(PikaError::type_error("expected a ByteArray receiver")),
    }
}

fn two_args(args: &[Value]) -> Result<(crate::core::value::Handle, Value), PikaError> {
    let target = one_arg(args)?;
    let value = args.get(1).copied().ok_or_else(|| PikaError::arity(2, args.len() as u16))?;
    Ok((target, value))
}

fn expect_int(v: Value) -> Result<i64, PikaError> {
    match v {
        Value::Int(i) => Ok(i),
        _ => Err(PikaError::type_error("expected an Int")),
    }
}

pub fn install(engine: &mut Engine, parent: crate::core::value::Handle) -> crate::core::value::Handle {
    install_module(
        engine,
        parent,
        "bytearray",
        &[
            Binding::StaticMethod("newBig", new_big),
            Binding::StaticMethod("newLittle", new_little),
            Binding::Method("writeByte", write_byte),
            Binding::Method("readByte", read_byte),
            Binding::Method("writeU32", write_u32),
            Binding::Method("readU32", read_u32),
            Binding::Method("setLength", set_length),
            Binding::Method("length", length),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_constructor_produces_a_bytearray_value() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let ctx_handle = crate::vm::context::create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let sym = ctx.engine.interner.find(b"newBig").unwrap();
        let func = match crate::object::package::get_own_slot(&ctx.engine.heap, pkg, sym) {
            Some(Value::Object(h)) => h,
            _ => panic!("newBig not installed"),
        };
        let result = ctx.call(func, &[], 1).unwrap();
        assert!(matches!(result[0], Value::Object(_)));
    }
}
