//! `Function`/`Def` entities and the argument-preparation half of the call
//! protocol (spec §4.4 step 1: arity check, variadic packing, default
//! filling). Frame setup/teardown and the native-vs-bytecode dispatch live
//! in `vm::context`, which calls into `prepare_args` before pushing a frame.

use crate::core::heap::{BytecodeDef, Def, FunctionData, HeapObj, NativeFn};
use crate::core::value::{Handle, Symbol, Value};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArityError {
    pub expected: u16,
    pub got: u16,
}

pub fn create_bytecode(
    heap: &mut crate::core::heap::GcHeap,
    name: Option<Symbol>,
    arity: u16,
    is_variadic: bool,
    num_locals: u16,
    code: Vec<crate::vm::opcode::OpCode>,
    literals: Vec<Value>,
    defaults: Vec<Value>,
    line_map: Vec<crate::core::heap::LineMapEntry>,
    closure: Option<Handle>,
) -> Handle {
    let def = Def::Bytecode(BytecodeDef {
        name,
        arity,
        is_variadic,
        num_locals,
        code: Rc::new(code),
        literals: Rc::new(literals),
        defaults,
        line_map: Rc::new(line_map),
    });
    let h = heap.alloc(HeapObj::Function(FunctionData {
        def: Rc::new(def),
        closure,
        bound_self: None,
    }));
    if let Some(c) = closure {
        heap.write_barrier(h, c);
    }
    h
}

pub fn create_native(heap: &mut crate::core::heap::GcHeap, native: NativeFn) -> Handle {
    heap.alloc(HeapObj::Function(FunctionData {
        def: Rc::new(Def::Native(native)),
        closure: None,
        bound_self: None,
    }))
}

/// Bind a `self` value to an existing function, producing a new bound
/// Function sharing the same `Def` (spec §4.4 "bound self").
pub fn bind_self(heap: &mut crate::core::heap::GcHeap, func: Handle, self_value: Value) -> Handle {
    let (def, closure) = match heap.get(func) {
        HeapObj::Function(f) => (f.def.clone(), f.closure),
        _ => panic!("Handle does not refer to a Function"),
    };
    let h = heap.alloc(HeapObj::Function(FunctionData {
        def,
        closure,
        bound_self: Some(self_value),
    }));
    if let Some(c) = closure {
        heap.write_barrier(h, c);
    }
    if let Some(sh) = self_value.handle() {
        heap.write_barrier(h, sh);
    }
    h
}

/// Result of preparing a call's arguments: the fixed-position locals (with
/// defaults filled where the caller underflowed), plus any surplus
/// arguments a variadic Def wants packed into its trailing Array parameter.
/// Packing the tail into an actual `Array` heap object needs `&mut GcHeap`,
/// so that last step is left to `vm::context`.
pub struct PreparedArgs {
    pub locals: Vec<Value>,
    pub variadic_tail: Vec<Value>,
}

/// Arity-check, variadic-pack, and default-fill `args` against the Def's
/// declared signature (spec §4.4 call protocol step 1, §8 invariant "for
/// every call with n arguments against a non-variadic Def expecting k: n=k
/// or an arity error").
pub fn prepare_args(def: &Def, args: &[Value]) -> Result<PreparedArgs, ArityError> {
    match def {
        Def::Native(_) => Ok(PreparedArgs {
            locals: args.to_vec(),
            variadic_tail: Vec::new(),
        }),
        Def::Bytecode(b) => {
            let arity = b.arity as usize;
            if b.is_variadic {
                let fixed_count = arity.min(args.len());
                let mut locals: Vec<Value> = args[..fixed_count].to_vec();
                while locals.len() < arity {
                    let default_idx = locals.len();
                    locals.push(b.defaults.get(default_idx).copied().unwrap_or(Value::Null));
                }
                let variadic_tail = if args.len() > arity {
                    args[arity..].to_vec()
                } else {
                    Vec::new()
                };
                Ok(PreparedArgs { locals, variadic_tail })
            } else {
                if args.len() > arity {
                    return Err(ArityError {
                        expected: b.arity,
                        got: args.len() as u16,
                    });
                }
                let mut locals = args.to_vec();
                while locals.len() < arity {
                    let missing = arity - locals.len();
                    let default_idx = b.defaults.len().saturating_sub(missing);
                    locals.push(b.defaults.get(default_idx).copied().unwrap_or(Value::Null));
                }
                Ok(PreparedArgs {
                    locals,
                    variadic_tail: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_def(arity: u16, defaults: Vec<Value>) -> Def {
        Def::Bytecode(BytecodeDef {
            name: None,
            arity,
            is_variadic: false,
            num_locals: arity,
            code: Rc::new(Vec::new()),
            literals: Rc::new(Vec::new()),
            defaults,
            line_map: Rc::new(Vec::new()),
        })
    }

    #[test]
    fn exact_arity_passes_through() {
        let def = fixed_def(2, Vec::new());
        let result = prepare_args(&def, &[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(result.locals, vec![Value::Int(1), Value::Int(2)]);
        assert!(result.variadic_tail.is_empty());
    }

    #[test]
    fn underflow_without_defaults_fills_null() {
        let def = fixed_def(2, Vec::new());
        let result = prepare_args(&def, &[Value::Int(1)]).unwrap();
        assert_eq!(result.locals, vec![Value::Int(1), Value::Null]);
    }

    #[test]
    fn underflow_with_defaults_fills_declared_default() {
        let def = fixed_def(2, vec![Value::Int(99)]);
        let result = prepare_args(&def, &[Value::Int(1)]).unwrap();
        assert_eq!(result.locals, vec![Value::Int(1), Value::Int(99)]);
    }

    #[test]
    fn variadic_packs_surplus_into_tail() {
        let def = Def::Bytecode(BytecodeDef {
            name: None,
            arity: 1,
            is_variadic: true,
            num_locals: 1,
            code: Rc::new(Vec::new()),
            literals: Rc::new(Vec::new()),
            defaults: Vec::new(),
            line_map: Rc::new(Vec::new()),
        });
        let result = prepare_args(&def, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result.locals, vec![Value::Int(1)]);
        assert_eq!(result.variadic_tail, vec![Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn overflow_on_non_variadic_is_arity_error() {
        let def = fixed_def(1, Vec::new());
        let err = prepare_args(&def, &[Value::Int(1), Value::Int(2)]).unwrap_err();
        assert_eq!(err, ArityError { expected: 1, got: 2 });
    }
}
