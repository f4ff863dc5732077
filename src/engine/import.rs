//! Module/import pipeline (spec §4.6): resolve a dotted module name to a
//! cached entry, claiming it for the importer on a cache miss so a cycle
//! importing itself observes the `Loading` sentinel instead of recursing
//! forever.
//!
//! Grounded on `original_source/libpika/PImport.cpp`'s four cache states
//! (`Loading`/`Module`/`Package`/`Function`) and first-claim-wins dispatch
//! across registered loader hooks — generalized from the teacher's
//! single-rooted "include path" resolution
//! (`runtime::context::EngineContext`'s include handling) to a pluggable
//! hook chain. The engine's own `module_cache_*` methods (§4.5) own the
//! cache storage and the `Loading` sentinel; this module only orchestrates
//! hook dispatch and cache-hit re-resolution against that cache.

use crate::core::heap::{HeapObj, ModuleData};
use crate::core::value::{Handle, Symbol, Value};
use crate::engine::error::PikaError;
use crate::object::module;
use crate::vm::context::Context;

/// A source of modules: given a dotted name, either produce the resulting
/// entity or decline (spec §4.6 "first hook to claim the name wins; no
/// fallback to a later hook once one has claimed it").
pub trait ImportHook {
    /// `Some(Ok(handle))` — claimed and resolved to `handle` (a Package,
    /// Function, or plain Object, per spec §4.6).
    /// `Some(Err(e))` — claimed but failed to load.
    /// `None` — declines; pipeline tries the next hook.
    fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>>;
}

#[derive(Default)]
pub struct ImportPipeline {
    hooks: Vec<Box<dyn ImportHook>>,
}

impl ImportPipeline {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Box<dyn ImportHook>) {
        self.hooks.push(hook);
    }

    /// Resolve `name` end to end against this pipeline's own hook list and
    /// `ctx.engine`'s module cache (spec §4.6 `import(name)`). Used when a
    /// caller holds a standalone `ImportPipeline` rather than going through
    /// `Context::import`/`Engine`'s own pipeline field; the two share the
    /// cache-check and hook-dispatch halves below so both stay consistent.
    pub fn import(&mut self, ctx: &mut Context<'_>, name: &str) -> Result<Handle, PikaError> {
        let sym = ctx.engine.interner.intern(name.as_bytes());

        if let Some(cached) = ctx.engine.module_cache_get(sym) {
            return resolve_cache_hit(ctx, name, cached);
        }

        let loading = module::create_loading(&mut ctx.engine.heap);
        ctx.engine.module_cache_insert(sym, loading);

        let result = self.dispatch_hooks(ctx, name);
        finish_import(ctx, name, sym, loading, result)
    }

    /// Run only the hook-dispatch half: try each hook in registration order,
    /// first claim wins (spec §4.6 "first hook to claim the name wins").
    /// Split out from `import` so `Context::import` can perform the
    /// cache check itself (without moving this pipeline out of the engine)
    /// before ever reaching this method — that ordering is what lets a
    /// hook's own reentrant `Context::import` call of the same name observe
    /// the `Loading` sentinel and fail as a cycle instead of deadlocking on
    /// an already-moved-out pipeline.
    pub(crate) fn dispatch_hooks(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>> {
        for hook in self.hooks.iter_mut() {
            if let Some(outcome) = hook.try_load(ctx, name) {
                return Some(outcome);
            }
        }
        None
    }
}

pub(crate) fn resolve_cache_hit(ctx: &mut Context<'_>, name: &str, cached: Handle) -> Result<Handle, PikaError> {
    match ctx.engine.heap.get(cached) {
        HeapObj::Module(ModuleData::Loading) => Err(PikaError::circular_dependency(name)),
        HeapObj::Module(ModuleData::Module(pkg)) | HeapObj::Module(ModuleData::Package(pkg)) => Ok(*pkg),
        HeapObj::Module(ModuleData::Function(f)) => {
            let f = *f;
            let result = ctx.call(f, &[], 1)?;
            match result.into_iter().next() {
                Some(Value::Object(h)) if matches!(ctx.engine.heap.get(h), HeapObj::Package(_)) => Ok(h),
                _ => Err(PikaError::runtime(format!("import hook for '{name}' did not return a Package"))),
            }
        }
        _ => Err(PikaError::import_failed(name)),
    }
}

pub(crate) fn finish_import(
    ctx: &mut Context<'_>,
    name: &str,
    sym: Symbol,
    loading: Handle,
    result: Option<Result<Handle, PikaError>>,
) -> Result<Handle, PikaError> {
    match result {
        Some(Ok(handle)) => {
            module::resolve_to_package(&mut ctx.engine.heap, loading, handle);
            Ok(handle)
        }
        Some(Err(e)) => {
            ctx.engine.module_cache_remove(sym);
            Err(e)
        }
        None => {
            ctx.engine.module_cache_remove(sym);
            Err(PikaError::import_failed(name))
        }
    }
}

/// Per-slot interned `Symbol` for a dotted import name, mostly useful for
/// callers that want to pre-check `Engine::module_cache_is_loading`.
pub fn intern_name(ctx: &mut Context<'_>, name: &str) -> Symbol {
    ctx.engine.interner.intern(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::engine::Engine;
    use crate::object::package;

    struct StaticHook {
        name: &'static str,
    }

    impl ImportHook for StaticHook {
        fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>> {
            if name == self.name {
                Some(Ok(package::create(&mut ctx.engine.heap, None, None)))
            } else {
                None
            }
        }
    }

    struct SelfImportingHook;

    impl ImportHook for SelfImportingHook {
        fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>> {
            if name != "cyclic" {
                return None;
            }
            let mut inner = ImportPipeline::new();
            inner.add_hook(Box::new(SelfImportingHook));
            Some(inner.import(ctx, "cyclic"))
        }
    }

    fn with_ctx<F: FnOnce(&mut Context<'_>)>(f: F) {
        let mut engine = Engine::create();
        let ctx_handle = crate::vm::context::create(&mut engine);
        let mut ctx = Context::new(&mut engine, ctx_handle);
        f(&mut ctx);
    }

    #[test]
    fn second_import_of_same_name_hits_cache() {
        with_ctx(|ctx| {
            let mut pipeline = ImportPipeline::new();
            pipeline.add_hook(Box::new(StaticHook { name: "a.b" }));
            let first = pipeline.import(ctx, "a.b").unwrap();
            let second = pipeline.import(ctx, "a.b").unwrap();
            assert_eq!(first, second);
        });
    }

    #[test]
    fn unresolved_name_is_import_failed() {
        with_ctx(|ctx| {
            let mut pipeline = ImportPipeline::new();
            pipeline.add_hook(Box::new(StaticHook { name: "a.b" }));
            let err = pipeline.import(ctx, "missing").unwrap_err();
            assert_eq!(err.message, "import failed: missing");
        });
    }

    #[test]
    fn reimporting_while_loading_is_circular() {
        with_ctx(|ctx| {
            let mut pipeline = ImportPipeline::new();
            pipeline.add_hook(Box::new(SelfImportingHook));
            let err = pipeline.import(ctx, "cyclic").unwrap_err();
            assert_eq!(err.message, "circular dependency: cyclic");
        });
    }

    #[test]
    fn failed_import_does_not_poison_the_cache_for_a_later_retry() {
        with_ctx(|ctx| {
            let mut pipeline = ImportPipeline::new();
            pipeline.add_hook(Box::new(StaticHook { name: "a.b" }));
            assert!(pipeline.import(ctx, "missing").is_err());
            pipeline.add_hook(Box::new(StaticHook { name: "missing" }));
            assert!(pipeline.import(ctx, "missing").is_ok());
        });
    }
}
