//! Debugger/event hook surface (spec §4.8): "Hooks are first-class; multiple
//! handlers may register per event ... Event dispatch iterates handlers in
//! registration order; any handler returning 'handled' short-circuits."
//!
//! Grounded on the teacher's extension-registration discipline (ordered
//! registration, `ExtensionRegistry::register_extension` in
//! `runtime/registry.rs`) generalized from "load a PHP extension" to
//! "register an event handler", and on
//! `original_source/libpika/PDebugger.cpp`'s hook-per-event model for the
//! event set itself.

use crate::core::heap::GcHeap;
use crate::core::value::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Call,
    Return,
    Yield,
    NativeCall,
    Instruction,
    Except,
    Import,
}

/// Whether a handler fully handled the event (short-circuiting later
/// handlers) or passed it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    PassThrough,
}

/// A single registered event handler. `context` is the Context the event
/// fired on; `subject` is event-specific (the called Function, the raised
/// error object, etc).
pub trait Hook {
    fn on_event(&mut self, heap: &mut GcHeap, context: Handle, subject: Option<Handle>) -> Dispatch;

    /// Called when the hook is removed (spec §4.8 "Hooks release their own
    /// resources on removal").
    fn release(&mut self) {}
}

#[derive(Default)]
pub struct HookRegistry {
    handlers: std::collections::HashMap<HookEvent, Vec<Box<dyn Hook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hook(&mut self, event: HookEvent, handler: Box<dyn Hook>) {
        self.handlers.entry(event).or_default().push(handler);
    }

    /// Remove every handler registered for `event`, calling each one's
    /// `release` first. There is no per-handler identity in this surface
    /// (spec doesn't define one beyond "remove_hook(event, handler)"); a
    /// caller that needs single-handler removal should wrap its handler in
    /// a removable guard of its own.
    pub fn remove_hooks(&mut self, event: HookEvent) {
        if let Some(mut handlers) = self.handlers.remove(&event) {
            for h in handlers.iter_mut() {
                h.release();
            }
        }
    }

    /// Dispatch an event to every registered handler in registration order;
    /// stop at the first one that returns `Handled` (spec §4.8).
    pub fn dispatch(&mut self, event: HookEvent, heap: &mut GcHeap, context: Handle, subject: Option<Handle>) -> Dispatch {
        if let Some(handlers) = self.handlers.get_mut(&event) {
            for handler in handlers.iter_mut() {
                if handler.on_event(heap, context, subject) == Dispatch::Handled {
                    return Dispatch::Handled;
                }
            }
        }
        Dispatch::PassThrough
    }

    pub fn has_handlers(&self, event: HookEvent) -> bool {
        self.handlers.get(&event).map(|v| !v.is_empty()).unwrap_or(false)
    }
}

/// The instruction-level debugger hook (spec §4.8): fires a user callback
/// only when the current source line changes since the last `INSTRUCTION`
/// event, per the function's line map.
pub struct LineTracker {
    last_line: Option<u32>,
    pub callback: Handle,
}

impl LineTracker {
    pub fn new(callback: Handle) -> Self {
        Self {
            last_line: None,
            callback,
        }
    }

    /// Returns `true` (and records the new line) the first time `line` is
    /// observed in a row; repeated observations of the same line return
    /// `false` so the callback only fires on an actual line change.
    pub fn note_line(&mut self, line: u32) -> bool {
        if self.last_line == Some(line) {
            false
        } else {
            self.last_line = Some(line);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysHandled;
    impl Hook for AlwaysHandled {
        fn on_event(&mut self, _heap: &mut GcHeap, _context: Handle, _subject: Option<Handle>) -> Dispatch {
            Dispatch::Handled
        }
    }

    struct NeverHandled(std::rc::Rc<std::cell::Cell<u32>>);
    impl Hook for NeverHandled {
        fn on_event(&mut self, _heap: &mut GcHeap, _context: Handle, _subject: Option<Handle>) -> Dispatch {
            self.0.set(self.0.get() + 1);
            Dispatch::PassThrough
        }
    }

    #[test]
    fn first_handled_short_circuits_later_handlers() {
        let mut registry = HookRegistry::new();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        registry.add_hook(HookEvent::Call, Box::new(NeverHandled(calls.clone())));
        registry.add_hook(HookEvent::Call, Box::new(AlwaysHandled));
        registry.add_hook(HookEvent::Call, Box::new(NeverHandled(calls.clone())));
        let mut heap = GcHeap::new();
        let ctx = heap.alloc(crate::core::heap::HeapObj::Table(crate::core::value::Table::new()));
        let result = registry.dispatch(HookEvent::Call, &mut heap, ctx, None);
        assert_eq!(result, Dispatch::Handled);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn line_tracker_only_fires_on_change() {
        let mut tracker = LineTracker::new(Handle(0));
        assert!(tracker.note_line(1));
        assert!(!tracker.note_line(1));
        assert!(tracker.note_line(2));
    }
}
