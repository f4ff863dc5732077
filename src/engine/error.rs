//! Error taxonomy (spec §7), implemented as a plain enum with manual
//! `Display`/`std::error::Error` impls rather than `thiserror`, mirroring the
//! teacher's `vm::engine::VmError` (`vm/engine.rs`) shape. `anyhow` stays
//! confined to the `pika` binary (spec §7 "no anyhow/thiserror inside the
//! library crate").

use crate::core::value::{Handle, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Runtime,
    Arithmetic,
    Overflow,
    Underflow,
    DivideByZero,
    Index,
    Type,
    System,
    Assert,
    Script,
    Custom,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Underflow => "underflow",
            ErrorKind::DivideByZero => "divide-by-zero",
            ErrorKind::Index => "index",
            ErrorKind::Type => "type",
            ErrorKind::System => "system",
            ErrorKind::Assert => "assert",
            ErrorKind::Script => "script",
            ErrorKind::Custom => "custom",
        }
    }
}

/// All errors carry a human-readable message and an optional associated
/// object — the raised Value (spec §7).
#[derive(Debug, Clone)]
pub struct PikaError {
    pub kind: ErrorKind,
    pub message: String,
    pub raised: Option<Value>,
}

impl PikaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raised: None,
        }
    }

    pub fn with_value(kind: ErrorKind, message: impl Into<String>, value: Value) -> Self {
        Self {
            kind,
            message: message.into(),
            raised: Some(value),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::System, message)
    }

    /// "Allocation failure -> system" (spec §7 recovery policy); kept as a
    /// named constructor since the collector itself is infallible (spec
    /// §4.1) and only the wrapping allocator can fail this way.
    pub fn out_of_memory() -> Self {
        Self::new(ErrorKind::System, "out of memory")
    }

    pub fn import_failed(name: &str) -> Self {
        Self::new(ErrorKind::Runtime, format!("import failed: {name}"))
    }

    pub fn circular_dependency(name: &str) -> Self {
        Self::new(ErrorKind::Runtime, format!("circular dependency: {name}"))
    }

    pub fn arity(expected: u16, got: u16) -> Self {
        Self::new(
            ErrorKind::Runtime,
            format!("arity mismatch: expected {expected} argument(s), got {got}"),
        )
    }
}

impl std::fmt::Display for PikaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for PikaError {}

/// Uncaught errors surface to the embedder with kind, message, and
/// originating Context (spec §7).
#[derive(Debug, Clone)]
pub struct UncaughtError {
    pub error: PikaError,
    pub context: Handle,
}
