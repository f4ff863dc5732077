//! Bundled `regex` module (spec §9 redesign note: "platform regex back-end
//! selection at compile time" becomes "a trait with pluggable
//! implementations chosen at runtime"). `PatternEngine` is that trait; the
//! only implementation shipped here wraps the `regex` crate, but a host
//! embedding Pika could swap in a different engine (e.g. to match the
//! platform-specific behavior `original_source/modules/re/PlatRE.cpp`
//! special-cased) without touching the script-visible binding layer.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::binding::native::{install_module, Binding};
use crate::core::value::{Handle, Value};
use crate::engine::engine::Engine;
use crate::engine::error::PikaError;
use crate::object::userdata;
use crate::vm::context::Context;

pub trait PatternEngine: Send + Sync {
    fn is_match(&self, pattern: &str, text: &str) -> Result<bool, String>;
    fn find(&self, pattern: &str, text: &str) -> Result<Option<(usize, usize)>, String>;
}

lazy_static! {
    /// Compiling a `regex::Regex` walks the whole pattern; scripts tend to
    /// reuse the same handful of patterns across many calls, so cache the
    /// compiled form process-wide rather than recompiling on every
    /// `isMatch`/`find`.
    static ref COMPILED: Mutex<HashMap<String, regex::Regex>> = Mutex::new(HashMap::new());
}

fn compiled(pattern: &str) -> Result<regex::Regex, String> {
    let mut cache = COMPILED.lock().unwrap();
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = regex::Regex::new(pattern).map_err(|e| e.to_string())?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

pub struct RegexCrateEngine;

impl PatternEngine for RegexCrateEngine {
    fn is_match(&self, pattern: &str, text: &str) -> Result<bool, String> {
        let re = compiled(pattern)?;
        Ok(re.is_match(text))
    }

    fn find(&self, pattern: &str, text: &str) -> Result<Option<(usize, usize)>, String> {
        let re = compiled(pattern)?;
        Ok(re.find(text).map(|m| (m.start(), m.end())))
    }
}

struct CompiledPattern {
    source: String,
}

fn receiver(args: &[Value]) -> Result<Handle, PikaError> {
    match args.first() {
        Some(Value::UserData(h)) => Ok(*h),
        _ => Err(PikaError::type_error("expected a Pattern receiver")),
    }
}

fn expect_str(ctx: &Context<'_>, v: Value) -> Result<String, PikaError> {
    match v {
        Value::Str(h) => match ctx.engine.heap.get(h) {
            crate::core::heap::HeapObj::Str(s) => Ok(String::from_utf8_lossy(&s.bytes).into_owned()),
            _ => Err(PikaError::type_error("expected a Str")),
        },
        _ => Err(PikaError::type_error("expected a Str")),
    }
}

fn compile(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let source = expect_str(ctx, args.first().copied().unwrap_or(Value::Null))?;
    Ok(Value::UserData(userdata::create_managed(&mut ctx.engine.heap, CompiledPattern { source })))
}

fn is_match(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let text = expect_str(ctx, args.get(1).copied().unwrap_or(Value::Null))?;
    let source = userdata::downcast_ref::<CompiledPattern>(&ctx.engine.heap, h)
        .ok_or_else(|| PikaError::type_error("expected a compiled Pattern"))?
        .source
        .clone();
    let engine = RegexCrateEngine;
    engine.is_match(&source, &text).map(Value::Bool).map_err(|e| PikaError::runtime(e))
}

fn find(ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
    let h = receiver(args)?;
    let text = expect_str(ctx, args.get(1).copied().unwrap_or(Value::Null))?;
    let source = userdata::downcast_ref::<CompiledPattern>(&ctx.engine.heap, h)
        .ok_or_else(|| PikaError::type_error("expected a compiled Pattern"))?
        .source
        .clone();
    let engine = RegexCrateEngine;
    match engine.find(&source, &text).map_err(|e| PikaError::runtime(e))? {
        Some((start, end)) => {
            let arr = crate::object::array_::create(&mut ctx.engine.heap);
            crate::object::array_::push(&mut ctx.engine.heap, arr, Value::Int(start as i64));
            crate::object::array_::push(&mut ctx.engine.heap, arr, Value::Int(end as i64));
            Ok(Value::Object(arr))
        }
        None => Ok(Value::Null),
    }
}

pub fn install(engine: &mut Engine, parent: Handle) -> Handle {
    install_module(
        engine,
        parent,
        "regex",
        &[
            Binding::StaticMethod("compile", compile),
            Binding::Method("isMatch", is_match),
            Binding::Method("find", find),
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

    fn pika_str(engine: &mut Engine, s: &str) -> Value {
        Value::Str(engine.get_string(s.as_bytes()))
    }

    #[test]
    fn is_match_recognizes_a_substring_pattern() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let pattern = pika_str(&mut engine, r"\d+");
        let compiled = call(&mut engine, pkg, "compile", &[pattern]);
        let text = pika_str(&mut engine, "room 42");
        let result = call(&mut engine, pkg, "isMatch", &[compiled, text]);
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn find_returns_match_span() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install(&mut engine, world);
        let pattern = pika_str(&mut engine, r"\d+");
        let compiled = call(&mut engine, pkg, "compile", &[pattern]);
        let text = pika_str(&mut engine, "room 42");
        let result = call(&mut engine, pkg, "find", &[compiled, text]);
        match result {
            Value::Object(arr) => {
                assert_eq!(crate::object::array_::get(&engine.heap, arr, 0), Some(Value::Int(5)));
                assert_eq!(crate::object::array_::get(&engine.heap, arr, 1), Some(Value::Int(7)));
            }
            _ => panic!("expected an Array"),
        }
    }
}
