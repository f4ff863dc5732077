//! Declarative native-binding surface (spec §4.7): describe a package's
//! exposed methods/properties/constants as data, then apply the
//! description against an `Engine`, rather than hand-writing slot
//! registration calls at every call site.
//!
//! Generalizes the teacher's `ExtensionRegistry::register_function` /
//! `register_class` / `register_constant` (`runtime/registry.rs`), which
//! registered PHP functions/classes/constants one kind at a time, into a
//! single declarative list applied uniformly to a Package or Type.

use crate::core::heap::{HeapObj, NativeFn};
use crate::core::value::{Handle, Value};
use crate::engine::engine::Engine;
use crate::object::{function, package, property, type_};

/// One entry in a native binding description (spec §4.7's four binding
/// kinds).
pub enum Binding {
    Method(&'static str, NativeFn),
    StaticMethod(&'static str, NativeFn),
    Property(&'static str, NativeFn, Option<NativeFn>),
    Constant(&'static str, Value),
    /// Register a second name resolving to the same slot as an existing one
    /// (spec §4.7 "an Alias binding installs a second name for an existing
    /// slot without duplicating its value").
    Alias(&'static str, &'static str),
}

/// Apply `bindings` as instance methods/constants on `target` (a Package
/// acting as a namespace, or a plain Object slot table).
pub fn bind_package(engine: &mut Engine, target: Handle, bindings: &[Binding]) {
    for binding in bindings {
        match binding {
            Binding::Method(name, f) | Binding::StaticMethod(name, f) => {
                let func = function::create_native(&mut engine.heap, *f);
                set_named(engine, target, name, Value::Object(func));
            }
            Binding::Property(name, getter, setter) => {
                let getter_fn = function::create_native(&mut engine.heap, *getter);
                let setter_val = setter.map(|s| Value::Object(function::create_native(&mut engine.heap, s)));
                let prop = property::create(&mut engine.heap, Some(Value::Object(getter_fn)), setter_val);
                set_named(engine, target, name, Value::Property(prop));
            }
            Binding::Constant(name, value) => {
                set_named(engine, target, name, *value);
            }
            Binding::Alias(alias, original) => {
                let sym = engine.interner.intern(original.as_bytes());
                if let Some(v) = package::get_own_slot(&engine.heap, target, sym) {
                    set_named(engine, target, alias, v);
                }
            }
        }
    }
}

/// Apply `bindings` as methods on a Type's method table — for `Method`
/// entries, `StaticMethod` is treated identically here since the spec
/// draws no calling-convention distinction at the binding layer (a
/// `StaticMethod` simply never receives a bound `self`, which is the
/// caller's responsibility, not the binder's).
pub fn bind_type(engine: &mut Engine, target: Handle, bindings: &[Binding]) {
    for binding in bindings {
        match binding {
            Binding::Method(name, f) | Binding::StaticMethod(name, f) => {
                let func = function::create_native(&mut engine.heap, *f);
                let sym = engine.interner.intern(name.as_bytes());
                type_::set_method(&mut engine.heap, target, sym, Value::Object(func));
            }
            Binding::Property(name, getter, setter) => {
                let getter_fn = function::create_native(&mut engine.heap, *getter);
                let setter_val = setter.map(|s| Value::Object(function::create_native(&mut engine.heap, s)));
                let prop = property::create(&mut engine.heap, Some(Value::Object(getter_fn)), setter_val);
                let sym = engine.interner.intern(name.as_bytes());
                type_::set_method(&mut engine.heap, target, sym, Value::Property(prop));
            }
            Binding::Constant(name, value) => {
                let sym = engine.interner.intern(name.as_bytes());
                type_::set_method(&mut engine.heap, target, sym, *value);
            }
            Binding::Alias(alias, original) => {
                let orig_sym = engine.interner.intern(original.as_bytes());
                if let Some(v) = type_::resolve_method(&engine.heap, target, orig_sym) {
                    let alias_sym = engine.interner.intern(alias.as_bytes());
                    type_::set_method(&mut engine.heap, target, alias_sym, v);
                }
            }
        }
    }
}

fn set_named(engine: &mut Engine, target: Handle, name: &str, value: Value) {
    let sym = engine.interner.intern(name.as_bytes());
    match engine.heap.get(target) {
        HeapObj::Package(_) => {
            package::set_slot(&mut engine.heap, target, sym, value, true);
        }
        HeapObj::Object(_) => {
            crate::object::object::set_slot(&mut engine.heap, target, sym, value, true);
        }
        _ => {}
    }
}

/// Create a new child Package under `parent`, bind it, and return its
/// `Handle` — the shape every bundled module in `crate::modules` uses to
/// install itself (spec §4.7 "a module is a Package populated through the
/// binding surface").
pub fn install_module(engine: &mut Engine, parent: Handle, name: &str, bindings: &[Binding]) -> Handle {
    let sym = engine.interner.intern(name.as_bytes());
    let pkg = package::create(&mut engine.heap, Some(sym), Some(parent));
    bind_package(engine, pkg, bindings);
    pkg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::PikaError;

    fn answer(_ctx: &mut crate::vm::context::Context<'_>, _args: &[Value]) -> Result<Value, PikaError> {
        Ok(Value::Int(42))
    }

    #[test]
    fn install_module_binds_method_under_named_package() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install_module(&mut engine, world, "math", &[Binding::Method("answer", answer)]);
        let sym = engine.interner.find(b"answer").unwrap();
        assert!(package::get_own_slot(&engine.heap, pkg, sym).is_some());
    }

    #[test]
    fn constant_binding_is_readable_immediately() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install_module(&mut engine, world, "consts", &[Binding::Constant("PI_ISH", Value::Int(3))]);
        let sym = engine.interner.find(b"PI_ISH").unwrap();
        assert_eq!(package::get_own_slot(&engine.heap, pkg, sym), Some(Value::Int(3)));
    }

    #[test]
    fn alias_resolves_to_same_value_as_original() {
        let mut engine = Engine::create();
        let world = engine.world;
        let pkg = install_module(
            &mut engine,
            world,
            "aliased",
            &[Binding::Constant("ORIGINAL", Value::Int(7)), Binding::Alias("COPY", "ORIGINAL")],
        );
        let sym = engine.interner.find(b"COPY").unwrap();
        assert_eq!(package::get_own_slot(&engine.heap, pkg, sym), Some(Value::Int(7)));
    }
}
