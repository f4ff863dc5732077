//! Pika: an embeddable, dynamically-typed scripting language runtime.
//!
//! Layered roughly bottom-up: `core` (arena allocation, tagged values, the
//! tri-color collector, identifier interning), `object` (the Object/
//! Package/Type/Function entity model built on top of `core`), `vm` (the
//! call protocol and bytecode interpreter), `engine` (the process-wide
//! coordinator, error taxonomy, hooks, and import pipeline), `binding`
//! (the declarative native-binding surface), and `modules` (a handful of
//! bundled native modules built entirely on that surface).

pub mod binding;
pub mod core;
pub mod engine;
pub mod modules;
pub mod object;
pub mod vm;
