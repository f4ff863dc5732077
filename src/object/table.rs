//! Attribute-aware reads/writes over `core::value::Table` (spec §3.3).
//!
//! A plain `Table::set` always overwrites; the rules around `protected`,
//! `read_only`, and `force_write` only matter at the object-model layer
//! where a write might be coming from outside the defining scope, so they
//! live here rather than on `Table` itself.

use crate::core::value::{AttrBits, Slot, Symbol, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Ok,
    /// The slot is `read_only` and the write didn't carry `force_write`.
    ReadOnly,
}

/// Attempt to set `key` to `value`, honoring `read_only` unless `force`.
/// `protected` is enforced by the caller (it depends on which scope is
/// doing the writing, which this layer doesn't know about).
pub fn try_set(table: &mut Table, key: Symbol, value: Value, force: bool) -> SetOutcome {
    if let Some(existing) = table.slots.get(&key) {
        if existing.attrs.contains(AttrBits::READ_ONLY) && !force {
            return SetOutcome::ReadOnly;
        }
    }
    table.set(key, value);
    SetOutcome::Ok
}

pub fn is_protected(table: &Table, key: Symbol) -> bool {
    table
        .slots
        .get(&key)
        .map(|s| s.attrs.contains(AttrBits::PROTECTED))
        .unwrap_or(false)
}

pub fn get_slot(table: &Table, key: Symbol) -> Option<&Slot> {
    table.slots.get(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    #[test]
    fn read_only_slot_rejects_plain_write() {
        let mut table = Table::new();
        let key = Symbol(0);
        table.set_with_attrs(key, Value::Int(1), AttrBits::READ_ONLY);
        assert_eq!(try_set(&mut table, key, Value::Int(2), false), SetOutcome::ReadOnly);
        assert_eq!(table.get(key).unwrap().value, Value::Int(1));
    }

    #[test]
    fn force_write_overrides_read_only() {
        let mut table = Table::new();
        let key = Symbol(0);
        table.set_with_attrs(key, Value::Int(1), AttrBits::READ_ONLY);
        assert_eq!(try_set(&mut table, key, Value::Int(2), true), SetOutcome::Ok);
        assert_eq!(table.get(key).unwrap().value, Value::Int(2));
    }
}
