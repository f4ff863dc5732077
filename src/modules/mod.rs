//! Bundled native modules (spec §4.7/§6): small standard-library packages
//! built entirely on top of `binding::native`, demonstrating the native
//! binding surface end to end rather than hand-wiring slots.

pub mod bytearray;
pub mod date;
pub mod random;
pub mod regex;
