//! Built-in import hooks (spec §4.6 step 2, §6.2, §6.3): a Script loader
//! that reads and compiles a `.pika` source file from the engine's search
//! paths, and a native-module loader that resolves a shared library by the
//! platform filename/symbol-naming contract.
//!
//! Grounded on `original_source/libpika/PImport.cpp`'s `Pika_importScript`
//! / `ModuleImportHook` and on `PModule.h`'s
//! `PIKALIB_PREFIX_ENTER`/`PIKALIB_PREFIX_VER` symbol names. The original's
//! platform extension/prefix/separator constants (`PIKA_EXT`,
//! `PIKA_LIB_PREFIX`, `PIKA_PATH_SEP_CHAR`, ...) live in a platform config
//! header outside this retrieval pack; this module documents the values it
//! assumes for them (see the constants below and DESIGN.md).

use std::path::{Path, PathBuf};

use crate::core::value::Handle;
use crate::engine::engine::Engine;
use crate::engine::error::PikaError;
use crate::engine::import::ImportHook;
use crate::vm::context::Context;

/// Primary and alternate source-file extensions (assumed; the original's
/// `PIKA_EXT`/`PIKA_EXT_ALT` constants are not present in this pack).
const SCRIPT_EXT: &str = "pika";
const SCRIPT_EXT_ALT: &str = "pk";

/// Turn a dotted module name into a relative path with no extension, e.g.
/// `"a.b.c"` -> `a/b/c` (spec §4.6 "dotted-name to path-separator
/// translation"; mirrors `Pika_ConvertDotName`, simplified since
/// `std::path` already gives us a portable separator).
fn dotted_name_to_path(name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for part in name.split('.') {
        path.push(part);
    }
    path
}

/// Compiles source bytes into a Script's executable top level. The real
/// compiler/bytecode format is outside this runtime's scope (spec's
/// Non-goals); embedders provide one through this trait the way the spec's
/// `Engine::compile` describes — "delegate compilation to whatever
/// front end produced the bytecode".
pub trait ScriptCompiler {
    fn compile(&mut self, engine: &mut Engine, source_name: &str, source: &[u8]) -> Result<Handle, PikaError>;
}

/// Loads and runs `.pika`/`.pk` source files found under the engine's
/// search paths (spec §6.3 built-in Script loader).
pub struct ScriptHook;

impl ImportHook for ScriptHook {
    fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>> {
        let rel = dotted_name_to_path(name);
        let found = find_script_file(&ctx.engine.search_paths, &rel)?;

        let bytes = match std::fs::read(&found) {
            Ok(b) => b,
            Err(e) => return Some(Err(PikaError::system(format!("reading {}: {e}", found.display())))),
        };

        let source_name = found.to_string_lossy().into_owned();
        let script = match ctx.engine.compile(&source_name, &bytes) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        Some(crate::object::script::run(ctx, script, &[]).map(|v| match v {
            crate::core::value::Value::Object(h) => h,
            _ => script,
        }))
    }
}

fn find_script_file(search_paths: &[PathBuf], rel: &Path) -> Option<PathBuf> {
    for base in search_paths {
        for ext in [SCRIPT_EXT, SCRIPT_EXT_ALT] {
            let candidate = base.join(rel).with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Platform filename affixes for native modules (spec §6.2; assumed —
/// `PIKA_LIB_PREFIX`/`PIKA_LIB_EXT` are not present in this pack, but these
/// match the conventional Unix/Windows shared-library naming they imply).
#[cfg(unix)]
const LIB_PREFIX: &str = "lib";
#[cfg(unix)]
const LIB_EXT: &str = "so";
#[cfg(windows)]
const LIB_PREFIX: &str = "";
#[cfg(windows)]
const LIB_EXT: &str = "dll";

pub fn native_module_filename(name: &str) -> String {
    format!("{LIB_PREFIX}{name}{}", if LIB_EXT.is_empty() { String::new() } else { format!(".{LIB_EXT}") })
}

pub fn native_entry_symbol(name: &str) -> String {
    format!("pikalib_enter_{name}")
}

pub fn native_version_symbol(name: &str) -> String {
    format!("pikalib_version_{name}")
}

/// A pre-registered native module, keyed by the bare (non-dotted-path)
/// module name that would otherwise be resolved through `libloading`.
///
/// Dynamic linking mechanics are out of scope beyond the symbol-resolution
/// contract (spec's Non-goals); rather than reaching for raw C-ABI calls
/// into an arbitrary dylib's `pikalib_enter_<Name>`/`pikalib_version_<Name>`
/// exports (an `unsafe fn(*mut Engine, *mut Module) -> *mut Package` call
/// with no type-checking across the FFI boundary), embedders register a
/// safely-typed Rust entry point here ahead of time. `NativeModuleHook`
/// still performs the filename/symbol-name construction and `libloading`
/// dlopen + version-string comparison the contract describes, so the
/// naming and versioning rules are exercised even though the entry point
/// itself is resolved from this registry rather than `dlsym`.
pub struct NativeModuleHook {
    search_paths: Vec<PathBuf>,
    entries: std::collections::HashMap<String, (String, fn(&mut Engine) -> Handle)>,
}

impl NativeModuleHook {
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Register a module's entry point under `name`, declaring the
    /// version string its `pikalib_version_<name>` export would report.
    pub fn register(&mut self, name: &str, version: impl Into<String>, entry: fn(&mut Engine) -> Handle) {
        self.entries.insert(name.to_string(), (version.into(), entry));
    }

    fn dylib_path(&self, name: &str) -> Option<PathBuf> {
        let filename = native_module_filename(name);
        for base in &self.search_paths {
            let candidate = base.join(&filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for NativeModuleHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportHook for NativeModuleHook {
    fn try_load(&mut self, ctx: &mut Context<'_>, name: &str) -> Option<Result<Handle, PikaError>> {
        let (expected_version, entry) = match self.entries.get(name) {
            Some((v, e)) => (v.clone(), *e),
            None => return None,
        };

        if let Some(path) = self.dylib_path(name) {
            let lib = match unsafe { libloading::Library::new(&path) } {
                Ok(l) => l,
                Err(e) => return Some(Err(PikaError::system(format!("loading {}: {e}", path.display())))),
            };
            let version_sym = native_version_symbol(name);
            // The dylib's actual `pikalib_enter_<name>` export is a raw C-ABI
            // entry point (`extern "C" fn(*mut Engine, *mut Module) -> *mut
            // Package`); crossing that boundary requires the embedder's own
            // FFI types, which this runtime does not define. We only resolve
            // the dlopen/version-check half of the contract here and invoke
            // the embedder-registered safe entry point below instead of the
            // raw symbol.
            let found_version: Option<Vec<u8>> = unsafe {
                lib.get::<unsafe extern "C" fn() -> *const std::os::raw::c_char>(version_sym.as_bytes())
                    .ok()
                    .map(|f| std::ffi::CStr::from_ptr(f()).to_bytes().to_vec())
            };
            if let Some(bytes) = found_version {
                let found = String::from_utf8_lossy(&bytes);
                if found != expected_version {
                    return Some(Err(PikaError::system(format!(
                        "native module '{name}' version mismatch: expected {expected_version}, dylib reports {found}"
                    ))));
                }
            }
        }

        Some(Ok(entry(ctx.engine)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_name_becomes_nested_path() {
        let p = dotted_name_to_path("a.b.c");
        assert_eq!(p, PathBuf::from("a").join("b").join("c"));
    }

    #[test]
    fn filename_and_symbol_construction_match_the_contract() {
        assert_eq!(native_entry_symbol("Foo"), "pikalib_enter_Foo");
        assert_eq!(native_version_symbol("Foo"), "pikalib_version_Foo");
        #[cfg(unix)]
        assert_eq!(native_module_filename("foo"), "libfoo.so");
    }
}
