//! The call protocol and bytecode interpreter (spec §4.4): operand stack,
//! frame stack, the arity/variadic/default dance from `object::function`,
//! and the suspend/resume machinery that makes a Context "the unit of
//! coroutine-style suspension" (spec §4.4) rather than a per-function
//! generator object as in the teacher's `GeneratorState`.
//!
//! Grounded on the teacher's `vm/frame.rs` (`CallFrame`) and `vm/stack.rs`
//! (`Stack`) for shape, and `vm/engine.rs`'s main dispatch loop for the
//! fetch-decode-execute structure, generalized from PHP opcodes to
//! `vm::opcode::OpCode`.

use crate::core::heap::{Def, HeapObj};
use crate::core::value::{Handle, Symbol, Value};
use crate::engine::engine::Engine;
use crate::engine::error::{ErrorKind, PikaError};
use crate::engine::hooks::{Dispatch, HookEvent};
use crate::object::{function, object, package};
use crate::vm::frame::CallFrame;
use crate::vm::opcode::OpCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    /// Not currently running; either fresh or parked on a `Yield`.
    Suspended,
    Running,
    /// Ran to completion or unwound past its outermost frame on an error.
    Dead,
}

/// The heap-resident state backing a Context (spec §4.4, stored as
/// `HeapObj::Context` so active-context pinning works through the same
/// `Handle` mechanism as every other GC entity).
#[derive(Debug)]
pub struct ContextData {
    pub stack: Vec<Value>,
    pub frames: Vec<CallFrame>,
    pub status: ContextStatus,
}

impl ContextData {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            status: ContextStatus::Suspended,
        }
    }
}

impl Default for ContextData {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create(engine: &mut Engine) -> Handle {
    engine.heap.alloc(HeapObj::Context(ContextData::new()))
}

/// A lightweight view binding a heap-resident `ContextData` to the `Engine`
/// that owns it, for the duration of a call. Native functions receive this
/// rather than the bare `Handle` so they can reach the heap, interner, and
/// global scope while also operating on their own operand stack.
///
/// Constructed fresh at each entry point (`call`, `resume`) rather than kept
/// alive across yields, since an `Engine` can only be borrowed by one
/// `Context` at a time anyway (spec §4.5 single active-Context stack).
pub struct Context<'a> {
    pub engine: &'a mut Engine,
    pub handle: Handle,
}

impl<'a> Context<'a> {
    pub fn new(engine: &'a mut Engine, handle: Handle) -> Self {
        Self { engine, handle }
    }

    fn data(&self) -> &ContextData {
        match self.engine.heap.get(self.handle) {
            HeapObj::Context(c) => c,
            _ => panic!("Handle does not refer to a Context"),
        }
    }

    fn data_mut(&mut self) -> &mut ContextData {
        match self.engine.heap.get_mut(self.handle) {
            HeapObj::Context(c) => c,
            _ => panic!("Handle does not refer to a Context"),
        }
    }

    pub fn status(&self) -> ContextStatus {
        self.data().status
    }

    pub fn push(&mut self, v: Value) {
        self.data_mut().stack.push(v);
    }

    pub fn pop(&mut self) -> Value {
        self.data_mut().stack.pop().unwrap_or(Value::Null)
    }

    /// Invoke `func` with `args`, running it to completion (or until it
    /// `Yield`s, for a Bytecode Def) and returning `expected_returns` values,
    /// padded with `null` or truncated per the call protocol (spec §4.4
    /// step 4). This is the single entry point native code and the
    /// top-level embedder both call through.
    pub fn call(&mut self, func: Handle, args: &[Value], expected_returns: u16) -> Result<Vec<Value>, PikaError> {
        let was_running = self.data().status == ContextStatus::Running;
        if !was_running {
            self.engine.push_context(self.handle);
            self.data_mut().status = ContextStatus::Running;
        }
        let result = self.call_inner(func, args, expected_returns);
        if !was_running {
            self.data_mut().status = if self.data().frames.is_empty() {
                ContextStatus::Dead
            } else {
                ContextStatus::Suspended
            };
            self.engine.pop_context();
        }
        result
    }

    /// Resolve a dotted module name through the engine's import pipeline
    /// (spec §4.6). The cache is checked *before* the pipeline is moved out
    /// of the engine, and only a miss takes it out for the hook-dispatch
    /// span — so a hook that itself calls `Context::import` reentrantly
    /// (e.g. a module importing itself, or a legitimate nested dependency)
    /// resolves against the cache directly rather than finding the
    /// pipeline already moved out. A cycle is caught by the `Loading`
    /// sentinel the cache check observes, not by this method refusing to
    /// reenter.
    pub fn import(&mut self, name: &str) -> Result<Handle, PikaError> {
        let sym = self.engine.interner.intern(name.as_bytes());

        if let Some(cached) = self.engine.module_cache_get(sym) {
            return crate::engine::import::resolve_cache_hit(self, name, cached);
        }

        let loading = crate::object::module::create_loading(&mut self.engine.heap);
        self.engine.module_cache_insert(sym, loading);

        let mut pipeline = self
            .engine
            .imports
            .take()
            .expect("import pipeline not in use (concurrent dispatch on the same Context?)");
        let result = pipeline.dispatch_hooks(self, name);
        self.engine.imports = Some(pipeline);

        crate::engine::import::finish_import(self, name, sym, loading, result)
    }

    fn call_inner(&mut self, func: Handle, args: &[Value], expected_returns: u16) -> Result<Vec<Value>, PikaError> {
        self.engine.hooks.dispatch(HookEvent::Call, &mut self.engine.heap, self.handle, Some(func));

        let (def, bound_self) = match self.engine.heap.get(func) {
            HeapObj::Function(f) => (f.def.clone(), f.bound_self),
            _ => return Err(PikaError::type_error("value is not callable")),
        };

        let mut full_args = Vec::with_capacity(args.len() + 1);
        if let Some(self_value) = bound_self {
            full_args.push(self_value);
        }
        full_args.extend_from_slice(args);

        let prepared = function::prepare_args(&def, &full_args).map_err(|e| PikaError::arity(e.expected, e.got))?;

        match def.as_ref() {
            Def::Native(native) => {
                self.engine
                    .hooks
                    .dispatch(HookEvent::NativeCall, &mut self.engine.heap, self.handle, Some(func));
                let result = native(self, &prepared.locals)?;
                Ok(pad_or_truncate(vec![result], expected_returns))
            }
            Def::Bytecode(bc) => {
                let base = self.data().stack.len();
                let num_locals = bc.num_locals as usize;
                let mut locals = prepared.locals;
                locals.resize(num_locals.max(locals.len()), Value::Null);
                if bc.is_variadic {
                    let arr = crate::object::array_::create(&mut self.engine.heap);
                    for v in prepared.variadic_tail {
                        crate::object::array_::push(&mut self.engine.heap, arr, v);
                    }
                    if let Some(last) = locals.last_mut() {
                        *last = Value::Object(arr);
                    }
                }
                self.data_mut().stack.extend(locals);
                self.data_mut().frames.push(CallFrame::new(func, base, expected_returns));
                let result = self.run();
                match result {
                    Ok(values) => Ok(pad_or_truncate(values, expected_returns)),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Drive the fetch-decode-execute loop for the topmost frame until it
    /// returns, yields, or raises. Returns the values passed to `Return`.
    fn run(&mut self) -> Result<Vec<Value>, PikaError> {
        loop {
            let frame_idx = self.data().frames.len() - 1;
            let (func, pc) = {
                let frame = &self.data().frames[frame_idx];
                (frame.function, frame.pc)
            };
            let bc = match self.engine.heap.get(func) {
                HeapObj::Function(f) => match f.def.as_ref() {
                    Def::Bytecode(b) => b.clone(),
                    Def::Native(_) => unreachable!("native Def pushed a bytecode frame"),
                },
                _ => unreachable!("frame.function does not refer to a Function"),
            };

            self.engine
                .hooks
                .dispatch(HookEvent::Instruction, &mut self.engine.heap, self.handle, None);

            let op = match bc.code.get(pc) {
                Some(op) => *op,
                None => {
                    // Fell off the end without an explicit Return: the spec
                    // treats this as returning no values.
                    self.pop_frame();
                    return Ok(Vec::new());
                }
            };
            self.data_mut().frames[frame_idx].pc += 1;

            match self.execute(op, frame_idx, &bc) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Returned(values)) => return Ok(values),
                Ok(Flow::Yielded) => return Ok(Vec::new()),
                Err(e) => {
                    if let Some(resumed) = self.unwind_to_handler(frame_idx, &e) {
                        let _ = resumed;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    fn pop_frame(&mut self) {
        if let Some(frame) = self.data_mut().frames.pop() {
            self.data_mut().stack.truncate(frame.base);
        }
    }

    /// Unwind the frame stack looking for a `try`-marked frame (spec §4.4
    /// "a marker frame set by a try-style opcode"); returns `Some(())` if
    /// one absorbed the error (leaving execution to resume there), `None`
    /// if the error should propagate out of this Context entirely.
    fn unwind_to_handler(&mut self, from: usize, _err: &PikaError) -> Option<()> {
        let mut idx = from;
        loop {
            let handler_pc = self.data().frames[idx].handler_pc;
            if let Some(pc) = handler_pc {
                self.data_mut().frames.truncate(idx + 1);
                self.data_mut().frames[idx].pc = pc;
                return Some(());
            }
            if idx == 0 {
                self.data_mut().frames.clear();
                return None;
            }
            idx -= 1;
        }
    }

    fn execute(&mut self, op: OpCode, frame_idx: usize, bc: &crate::core::heap::BytecodeDef) -> Result<Flow, PikaError> {
        match op {
            OpCode::LoadConst(i) => {
                let v = bc.literals.get(i as usize).copied().unwrap_or(Value::Null);
                self.push(v);
            }
            OpCode::LoadLocal(i) => {
                let base = self.data().frames[frame_idx].base;
                let v = self.data().stack.get(base + i as usize).copied().unwrap_or(Value::Null);
                self.push(v);
            }
            OpCode::StoreLocal(i) => {
                let v = self.pop();
                let base = self.data().frames[frame_idx].base;
                let idx = base + i as usize;
                if let Some(slot) = self.data_mut().stack.get_mut(idx) {
                    *slot = v;
                }
            }
            OpCode::Pop => {
                self.pop();
            }
            OpCode::Dup => {
                let v = self.data().stack.last().copied().unwrap_or(Value::Null);
                self.push(v);
            }
            OpCode::GetSlot(name) => {
                let recv = self.pop();
                let v = self.get_slot_value(recv, name)?;
                self.push(v);
            }
            OpCode::SetSlot(name) => {
                let value = self.pop();
                let recv = self.pop();
                self.set_slot_value(recv, name, value)?;
            }
            OpCode::GetGlobal(name) => {
                let v = package::resolve(&self.engine.heap, self.engine.world, name).unwrap_or(Value::Null);
                self.push(v);
            }
            OpCode::SetGlobal(name) => {
                let v = self.pop();
                package::set_slot(&mut self.engine.heap, self.engine.world, name, v, false);
            }
            OpCode::NewArray => {
                let h = crate::object::array_::create(&mut self.engine.heap);
                self.push(Value::Object(h));
            }
            OpCode::ArrayPush => {
                let value = self.pop();
                let arr = self.pop();
                if let Value::Object(h) = arr {
                    crate::object::array_::push(&mut self.engine.heap, h, value);
                }
                self.push(arr);
            }
            OpCode::Call(argc) => {
                // Most calls pass a handful of arguments; inline storage
                // avoids a heap allocation on the hot call path (mirrors the
                // teacher's `CallFrame::args: SmallVec<[Val; 4]>`).
                let mut args: smallvec::SmallVec<[Value; 4]> = smallvec::SmallVec::with_capacity(argc as usize);
                for _ in 0..argc {
                    args.push(self.pop());
                }
                args.reverse();
                let callee = self.pop();
                let func = match callee {
                    Value::Object(h) if matches!(self.engine.heap.get(h), HeapObj::Function(_)) => h,
                    _ => return Err(PikaError::type_error("value is not callable")),
                };
                let results = self.call(func, &args, 1)?;
                self.push(results.into_iter().next().unwrap_or(Value::Null));
            }
            OpCode::Return => {
                let count = self.data().frames[frame_idx].expected_returns.max(1);
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(self.pop());
                }
                values.reverse();
                self.pop_frame();
                return Ok(Flow::Returned(values));
            }
            OpCode::Yield => {
                self.data_mut().status = ContextStatus::Suspended;
                return Ok(Flow::Yielded);
            }
            OpCode::Jump(delta) => {
                self.offset_pc(frame_idx, delta);
            }
            OpCode::JumpIfFalse(delta) => {
                let cond = self.pop();
                if !truthy(cond) {
                    self.offset_pc(frame_idx, delta);
                }
            }
            OpCode::Add => self.binary_arith(|a, b| a + b, |a, b| a + b)?,
            OpCode::Sub => self.binary_arith(|a, b| a - b, |a, b| a - b)?,
            OpCode::Mul => self.binary_arith(|a, b| a * b, |a, b| a * b)?,
            OpCode::Div => self.binary_div()?,
            OpCode::Mod => self.binary_mod()?,
            OpCode::Neg => {
                let v = self.pop();
                self.push(match v {
                    Value::Int(i) => Value::Int(-i),
                    Value::Real(r) => Value::Real(-r),
                    _ => return Err(PikaError::type_error("operand to unary '-' is not numeric")),
                });
            }
            OpCode::Not => {
                let v = self.pop();
                self.push(Value::Bool(!truthy(v)));
            }
            OpCode::Eq => {
                let b = self.pop();
                let a = self.pop();
                self.push(Value::Bool(a == b));
            }
            OpCode::Ne => {
                let b = self.pop();
                let a = self.pop();
                self.push(Value::Bool(a != b));
            }
            OpCode::Lt => self.compare(|o| o == std::cmp::Ordering::Less)?,
            OpCode::Le => self.compare(|o| o != std::cmp::Ordering::Greater)?,
            OpCode::Gt => self.compare(|o| o == std::cmp::Ordering::Greater)?,
            OpCode::Ge => self.compare(|o| o != std::cmp::Ordering::Less)?,
            OpCode::Concat => {
                let b = self.pop();
                let a = self.pop();
                let bytes = [self.display_bytes(a), self.display_bytes(b)].concat();
                let h = self.engine.get_string(&bytes);
                self.push(Value::Str(h));
            }
            OpCode::Halt => {
                self.pop_frame();
                return Ok(Flow::Returned(Vec::new()));
            }
        }
        Ok(Flow::Continue)
    }

    fn offset_pc(&mut self, frame_idx: usize, delta: i32) {
        let frame = &mut self.data_mut().frames[frame_idx];
        frame.pc = (frame.pc as i64 + delta as i64) as usize;
    }

    /// If `v` names a Property object, invoke its getter through the call
    /// protocol and return what the getter returns rather than the
    /// Property descriptor itself (spec §4.3/§8 scenario 6: reading a
    /// Property-backed slot yields the getter's result, not the
    /// descriptor). Plain values pass through unchanged.
    fn resolve_through_property_getter(&mut self, recv: Value, v: Value) -> Result<Value, PikaError> {
        let Value::Object(h) = v else { return Ok(v) };
        if !matches!(self.engine.heap.get(h), HeapObj::Property(_)) {
            return Ok(v);
        }
        let getter = crate::object::property::getter(&self.engine.heap, h)
            .ok_or_else(|| PikaError::type_error("property has no getter"))?;
        let Value::Object(getter_fn) = getter else {
            return Err(PikaError::type_error("property getter is not callable"));
        };
        self.call(getter_fn, &[recv], 1).map(|mut v| v.pop().unwrap_or(Value::Null))
    }

    fn get_slot_value(&mut self, recv: Value, name: Symbol) -> Result<Value, PikaError> {
        match recv {
            Value::Object(h) => match object::resolve_slot(&self.engine.heap, h, name) {
                object::Resolved::Found(v) => self.resolve_through_property_getter(recv, v),
                object::Resolved::Delegate(delegate) => {
                    let name_bytes = self.engine.interner.lookup(name).unwrap_or(b"").to_vec();
                    let key = Value::Str(self.engine.get_string(&name_bytes));
                    self.call(delegate, &[recv, key], 1).map(|mut v| v.pop().unwrap_or(Value::Null))
                }
                object::Resolved::Miss => Ok(Value::Null),
            },
            _ => Err(PikaError::type_error("cannot read a slot of a non-object value")),
        }
    }

    fn set_slot_value(&mut self, recv: Value, name: Symbol, value: Value) -> Result<(), PikaError> {
        match recv {
            Value::Object(h) => {
                if let object::Resolved::Found(Value::Object(prop_h)) = object::resolve_slot(&self.engine.heap, h, name) {
                    if matches!(self.engine.heap.get(prop_h), HeapObj::Property(_)) {
                        let setter = crate::object::property::setter(&self.engine.heap, prop_h)
                            .ok_or_else(|| PikaError::type_error("property has no setter"))?;
                        let Value::Object(setter_fn) = setter else {
                            return Err(PikaError::type_error("property setter is not callable"));
                        };
                        self.call(setter_fn, &[recv, value], 0)?;
                        return Ok(());
                    }
                }
                match object::set_slot(&mut self.engine.heap, h, name, value, false) {
                    crate::object::table::SetOutcome::Ok => Ok(()),
                    // spec §4.3 "Slot writes honor attribute bits: read-only fails with a type error".
                    crate::object::table::SetOutcome::ReadOnly => Err(PikaError::type_error("cannot write to a read-only slot")),
                }
            }
            _ => Err(PikaError::type_error("cannot set a slot of a non-object value")),
        }
    }

    fn binary_arith(&mut self, fi: impl Fn(i64, i64) -> i64, fr: impl Fn(f64, f64) -> f64) -> Result<(), PikaError> {
        let b = self.pop();
        let a = self.pop();
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => Value::Int(fi(x, y)),
            (Value::Real(x), Value::Real(y)) => Value::Real(fr(x, y)),
            (Value::Int(x), Value::Real(y)) => Value::Real(fr(x as f64, y)),
            (Value::Real(x), Value::Int(y)) => Value::Real(fr(x, y as f64)),
            _ => return Err(PikaError::new(ErrorKind::Arithmetic, "operands are not numeric")),
        };
        self.push(result);
        Ok(())
    }

    fn binary_div(&mut self) -> Result<(), PikaError> {
        let b = self.pop();
        let a = self.pop();
        let result = match (a, b) {
            (Value::Int(_), Value::Int(0)) => return Err(PikaError::new(ErrorKind::DivideByZero, "division by zero")),
            (Value::Int(x), Value::Int(y)) => Value::Int(x / y),
            (Value::Real(x), Value::Real(y)) => Value::Real(x / y),
            (Value::Int(x), Value::Real(y)) => Value::Real(x as f64 / y),
            (Value::Real(x), Value::Int(y)) => Value::Real(x / y as f64),
            _ => return Err(PikaError::new(ErrorKind::Arithmetic, "operands are not numeric")),
        };
        self.push(result);
        Ok(())
    }

    fn binary_mod(&mut self) -> Result<(), PikaError> {
        let b = self.pop();
        let a = self.pop();
        let result = match (a, b) {
            (Value::Int(_), Value::Int(0)) => return Err(PikaError::new(ErrorKind::DivideByZero, "modulo by zero")),
            (Value::Int(x), Value::Int(y)) => Value::Int(x % y),
            _ => return Err(PikaError::new(ErrorKind::Arithmetic, "operands are not integers")),
        };
        self.push(result);
        Ok(())
    }

    fn compare(&mut self, test: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), PikaError> {
        let b = self.pop();
        let a = self.pop();
        let ord = match (a, b) {
            (Value::Int(x), Value::Int(y)) => x.cmp(&y),
            (Value::Real(x), Value::Real(y)) => x.partial_cmp(&y).ok_or_else(|| PikaError::new(ErrorKind::Arithmetic, "NaN is unordered"))?,
            (Value::Int(x), Value::Real(y)) => (x as f64).partial_cmp(&y).ok_or_else(|| PikaError::new(ErrorKind::Arithmetic, "NaN is unordered"))?,
            (Value::Real(x), Value::Int(y)) => x.partial_cmp(&(y as f64)).ok_or_else(|| PikaError::new(ErrorKind::Arithmetic, "NaN is unordered"))?,
            _ => return Err(PikaError::new(ErrorKind::Type, "operands are not comparable")),
        };
        self.push(Value::Bool(test(ord)));
        Ok(())
    }

    fn display_bytes(&self, v: Value) -> Vec<u8> {
        match v {
            Value::Null => b"null".to_vec(),
            Value::Bool(true) => b"true".to_vec(),
            Value::Bool(false) => b"false".to_vec(),
            Value::Int(i) => i.to_string().into_bytes(),
            Value::Real(r) => r.to_string().into_bytes(),
            Value::Str(h) => match self.engine.heap.get(h) {
                HeapObj::Str(s) => s.bytes.as_ref().clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

enum Flow {
    Continue,
    Returned(Vec<Value>),
    Yielded,
}

fn truthy(v: Value) -> bool {
    !matches!(v, Value::Null | Value::Bool(false))
}

fn pad_or_truncate(mut values: Vec<Value>, expected: u16) -> Vec<Value> {
    let expected = expected as usize;
    if values.len() < expected {
        values.resize(expected, Value::Null);
    } else {
        values.truncate(expected.max(values.len().min(expected)));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_native(engine: &mut Engine, f: crate::core::heap::NativeFn) -> Handle {
        function::create_native(&mut engine.heap, f)
    }

    fn add_one(_ctx: &mut Context<'_>, args: &[Value]) -> Result<Value, PikaError> {
        match args.first() {
            Some(Value::Int(i)) => Ok(Value::Int(i + 1)),
            _ => Err(PikaError::type_error("expected an Int")),
        }
    }

    #[test]
    fn native_call_returns_padded_single_value() {
        let mut engine = Engine::create();
        let func = push_native(&mut engine, add_one);
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.call(func, &[Value::Int(41)], 1).unwrap();
        assert_eq!(result, vec![Value::Int(42)]);
    }

    #[test]
    fn native_call_pads_deficit_with_null() {
        let mut engine = Engine::create();
        let func = push_native(&mut engine, add_one);
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.call(func, &[Value::Int(1)], 2).unwrap();
        assert_eq!(result, vec![Value::Int(2), Value::Null]);
    }

    #[test]
    fn bytecode_return_yields_declared_values() {
        let mut engine = Engine::create();
        // fn() { return 7 }
        let code = vec![OpCode::LoadConst(0), OpCode::Return];
        let func = function::create_bytecode(&mut engine.heap, None, 0, false, 0, code, vec![Value::Int(7)], Vec::new(), Vec::new(), None);
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.call(func, &[], 1).unwrap();
        assert_eq!(result, vec![Value::Int(7)]);
    }

    #[test]
    fn arithmetic_adds_two_locals() {
        let mut engine = Engine::create();
        // fn(a, b) { return a + b }
        let code = vec![OpCode::LoadLocal(0), OpCode::LoadLocal(1), OpCode::Add, OpCode::Return];
        let func = function::create_bytecode(&mut engine.heap, None, 2, false, 2, code, Vec::new(), Vec::new(), Vec::new(), None);
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.call(func, &[Value::Int(3), Value::Int(4)], 1).unwrap();
        assert_eq!(result, vec![Value::Int(7)]);
    }

    #[test]
    fn division_by_zero_raises_arithmetic_error() {
        let mut engine = Engine::create();
        let code = vec![OpCode::LoadConst(0), OpCode::LoadConst(1), OpCode::Div, OpCode::Return];
        let func = function::create_bytecode(
            &mut engine.heap,
            None,
            0,
            false,
            0,
            code,
            vec![Value::Int(1), Value::Int(0)],
            Vec::new(),
            Vec::new(),
            None,
        );
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let err = ctx.call(func, &[], 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivideByZero);
    }

    #[test]
    fn writing_a_read_only_slot_raises_type_error() {
        let mut engine = Engine::create();
        let obj = object::create(&mut engine.heap, None);
        let name = engine.interner.intern(b"frozen");
        object::set_slot(&mut engine.heap, obj, name, Value::Int(1), false);
        if let HeapObj::Object(o) = engine.heap.get_mut(obj) {
            o.slots.set_with_attrs(name, Value::Int(1), crate::core::value::AttrBits::READ_ONLY);
        }
        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let err = ctx.set_slot_value(Value::Object(obj), name, Value::Int(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    fn getter_42(_ctx: &mut Context<'_>, _args: &[Value]) -> Result<Value, PikaError> {
        Ok(Value::Int(42))
    }

    #[test]
    fn reading_a_property_slot_invokes_the_getter_instead_of_returning_the_descriptor() {
        let mut engine = Engine::create();
        let getter = function::create_native(&mut engine.heap, getter_42);
        let prop = crate::object::property::create(&mut engine.heap, Some(Value::Object(getter)), None);
        let ty = crate::object::type_::create(&mut engine.heap, None, None);
        let name = engine.interner.intern(b"answer");
        crate::object::type_::set_method(&mut engine.heap, ty, name, Value::Object(prop));
        let instance = object::create(&mut engine.heap, Some(ty));

        let ctx_handle = create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        let result = ctx.get_slot_value(Value::Object(instance), name).unwrap();
        assert_eq!(result, Value::Int(42));
    }
}
