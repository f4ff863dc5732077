//! Incremental tri-color mark/sweep collector (spec §4.1).
//!
//! Reference: `original_source/libpika/PCollector.cpp` (`Collector`,
//! `GCObject`, `RootObject`). The original keeps three intrusive doubly
//! linked lists of raw `GCObject*` nodes; a node's color *is* which
//! sentinel's list it currently sits on. This port keeps the same structure
//! but threads it through arena indices instead of raw pointers (spec §9
//! redesign note: allocation handle + generation-free arena instead of a
//! manual reference graph), and tracks each node's color explicitly rather
//! than inferring it from list membership, which is the one place this
//! implementation trades a pointer trick for an explicit field.
//!
//! This module only manages color/list/state bookkeeping; it knows nothing
//! about what a node's payload actually contains. `core::heap::GcHeap` owns
//! both this collector and the parallel value storage, and supplies the
//! trace callback at each step.

/// Default number of gray objects processed per incremental `step()`,
/// mirroring `GC_NUM_ALLOCS` in the original (the original uses the same
/// constant both to count allocations between steps and as an iteration
/// budget; this keeps the same dual use).
pub const GC_NUM_ALLOCS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Gray,
    Black,
}

/// Collector state machine (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcState {
    RootScan,
    GrayScan,
    Sweep,
    Suspended,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    color: Color,
    prev: u32,
    next: u32,
    persistent: bool,
    /// Set once a slot has been swept/freed; reused on next alloc.
    live: bool,
}

/// Reserved sentinel indices; never valid object handles.
const WHITE_SENTINEL: u32 = 0;
const GRAY_SENTINEL: u32 = 1;
const BLACK_SENTINEL: u32 = 2;
pub const FIRST_REAL_SLOT: u32 = 3;

/// Tri-color mark/sweep collector over an index space shared with a
/// separate value-storage array (see `core::heap::GcHeap`).
pub struct Collector {
    nodes: Vec<Node>,
    free_slots: Vec<u32>,
    /// Root set: externally pinned handles (spec §4.1 "Root registration").
    /// O(n) in the root count, "assumed small" per spec.
    roots: Vec<u32>,
    /// The Context currently executing; force-regrayed on every context
    /// switch and again atomically before sweep (spec §4.1).
    active_context: Option<u32>,
    state: GcState,
    saved_state: GcState,
    pause_depth: u32,
    /// Allocations remaining before the next incremental step runs.
    num_allocations: usize,
    scan_cursor: u32,
    sweep_cursor: u32,
    pub live_count: usize,
}

impl Collector {
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(FIRST_REAL_SLOT as usize);
        // whites, grays, blacks sentinels, each initially pointing at itself.
        for i in 0..FIRST_REAL_SLOT {
            nodes.push(Node {
                color: match i {
                    0 => Color::White,
                    1 => Color::Gray,
                    _ => Color::Black,
                },
                prev: i,
                next: i,
                persistent: true,
                live: false,
            });
        }
        Self {
            nodes,
            free_slots: Vec::new(),
            roots: Vec::new(),
            active_context: None,
            state: GcState::RootScan,
            saved_state: GcState::RootScan,
            pause_depth: 0,
            num_allocations: GC_NUM_ALLOCS,
            scan_cursor: GRAY_SENTINEL,
            sweep_cursor: WHITE_SENTINEL,
            live_count: 0,
        }
    }

    fn sentinel(color: Color) -> u32 {
        match color {
            Color::White => WHITE_SENTINEL,
            Color::Gray => GRAY_SENTINEL,
            Color::Black => BLACK_SENTINEL,
        }
    }

    fn unlink(&mut self, idx: u32) {
        let (prev, next) = (self.nodes[idx as usize].prev, self.nodes[idx as usize].next);
        self.nodes[prev as usize].next = next;
        self.nodes[next as usize].prev = prev;
    }

    fn insert_after(&mut self, idx: u32, after: u32) {
        let color = self.nodes[after as usize].color;
        let after_next = self.nodes[after as usize].next;
        self.nodes[idx as usize].color = color;
        self.nodes[idx as usize].prev = after;
        self.nodes[idx as usize].next = after_next;
        self.nodes[after_next as usize].prev = idx;
        self.nodes[after as usize].next = idx;
    }

    fn move_to(&mut self, idx: u32, color: Color) {
        self.unlink(idx);
        self.insert_after(idx, Self::sentinel(color));
        self.nodes[idx as usize].color = color;
    }

    /// Allocate a fresh (or recycled) node on the white list. Returns its
    /// index. Mirrors `Collector::Add` (runs an incremental step when the
    /// allocation counter has been exhausted).
    pub fn alloc(&mut self) -> u32 {
        if self.num_allocations == 0 {
            if self.state != GcState::Suspended {
                self.run_incremental();
            }
        } else {
            self.num_allocations -= 1;
        }

        let idx = if let Some(idx) = self.free_slots.pop() {
            idx
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Node {
                color: Color::White,
                prev: idx,
                next: idx,
                persistent: false,
                live: false,
            });
            idx
        };
        self.nodes[idx as usize].persistent = false;
        self.nodes[idx as usize].live = true;
        self.insert_after(idx, WHITE_SENTINEL);
        self.live_count += 1;
        idx
    }

    pub fn set_persistent(&mut self, idx: u32, persistent: bool) {
        self.nodes[idx as usize].persistent = persistent;
    }

    pub fn is_persistent(&self, idx: u32) -> bool {
        self.nodes[idx as usize].persistent
    }

    pub fn is_live(&self, idx: u32) -> bool {
        (idx as usize) < self.nodes.len() && self.nodes[idx as usize].live
    }

    pub fn color(&self, idx: u32) -> Color {
        self.nodes[idx as usize].color
    }

    /// Write barrier: a black container just received a reference to
    /// `referent`. If `referent` is white, promote it to gray so the
    /// tri-color invariant (no black→white edge) keeps holding (spec §4.1,
    /// §8 invariant).
    pub fn write_barrier(&mut self, container: u32, referent: u32) {
        if self.nodes[container as usize].color == Color::Black
            && self.nodes[referent as usize].color == Color::White
        {
            self.move_to(referent, Color::Gray);
        }
    }

    fn move_to_gray_if_white(&mut self, idx: u32) {
        if self.nodes[idx as usize].color == Color::White {
            self.move_to(idx, Color::Gray);
        }
    }

    /// Unconditionally gray an object, regardless of its current color
    /// (used for root scanning and active-context pinning).
    pub fn force_to_gray(&mut self, idx: u32) {
        self.move_to(idx, Color::Gray);
    }

    pub fn add_as_root(&mut self, idx: u32) {
        self.force_to_gray(idx);
        self.roots.push(idx);
    }

    /// O(n) in root count, per spec.
    pub fn remove_as_root(&mut self, idx: u32) -> bool {
        if let Some(pos) = self.roots.iter().position(|&r| r == idx) {
            self.roots.remove(pos);
            self.move_to_gray_if_white(idx);
            true
        } else {
            false
        }
    }

    /// Force-regray the outgoing active Context on every context switch
    /// (spec §4.1 "Active-context pinning"), independent of collector state.
    pub fn change_context(&mut self, new_ctx: Option<u32>) {
        if let Some(old) = self.active_context {
            self.force_to_gray(old);
        }
        self.active_context = new_ctx;
    }

    pub fn pause(&mut self) {
        self.pause_depth += 1;
        if self.state != GcState::Suspended {
            self.saved_state = self.state;
            self.state = GcState::Suspended;
        }
    }

    pub fn resume(&mut self) {
        if self.pause_depth > 0 {
            self.pause_depth -= 1;
        }
        if self.pause_depth == 0 {
            self.state = self.saved_state;
            if self.num_allocations == 0 {
                self.run_incremental();
            }
        }
    }

    pub fn pause_depth(&self) -> u32 {
        self.pause_depth
    }

    pub fn state(&self) -> GcState {
        self.state
    }

    /// `Check()`: run a step regardless of the allocation counter, unless
    /// suspended. Kept distinct from `check_if` per spec §9 Open Question —
    /// the two call-site disciplines are both exposed rather than merged.
    pub fn check<F: FnMut(u32, &mut dyn FnMut(u32))>(&mut self, trace: F) {
        if self.state != GcState::Suspended {
            self.run_incremental_with(trace);
        }
    }

    /// `CheckIf()`: only run a step when the allocation counter has reached
    /// zero and the collector isn't suspended.
    pub fn check_if<F: FnMut(u32, &mut dyn FnMut(u32))>(&mut self, trace: F) {
        if self.state != GcState::Suspended && self.num_allocations == 0 {
            self.run_incremental_with(trace);
        }
    }

    fn run_incremental(&mut self) {
        self.run_incremental_with(|_, _| {});
    }

    /// Advance the state machine one increment, calling `trace(idx,
    /// &mut push_child)` for each object scanned out of gray.
    pub fn run_incremental_with<F: FnMut(u32, &mut dyn FnMut(u32))>(&mut self, mut trace: F) {
        if self.state == GcState::Suspended {
            return;
        }
        match self.state {
            GcState::RootScan => {
                // Roots are supplied externally via `add_as_root` /
                // `change_context`; here we simply seed the scan cursor and
                // advance to GrayScan (mirrors `IncrementalMoveRoots` stage
                // 1+2 with root scanning delegated to the heap/engine).
                for &r in &self.roots.clone() {
                    self.move_to_gray_if_white(r);
                }
                if let Some(ctx) = self.active_context {
                    self.move_to_gray_if_white(ctx);
                }
                self.state = GcState::GrayScan;
                self.scan_cursor = self.nodes[GRAY_SENTINEL as usize].next;
                self.num_allocations = GC_NUM_ALLOCS;
            }
            GcState::GrayScan => {
                let mut budget = GC_NUM_ALLOCS;
                while self.scan_cursor != GRAY_SENTINEL
                    && self.nodes[self.scan_cursor as usize].color == Color::Gray
                    && budget > 0
                {
                    let cur = self.scan_cursor;
                    let next = self.nodes[cur as usize].next;
                    let mut to_gray: Vec<u32> = Vec::new();
                    trace(cur, &mut |child| to_gray.push(child));
                    for child in to_gray {
                        self.move_to_gray_if_white(child);
                    }
                    self.unlink(cur);
                    self.insert_after(cur, BLACK_SENTINEL);
                    self.nodes[cur as usize].color = Color::Black;
                    self.scan_cursor = next;
                    budget -= 1;
                }
                if self.scan_cursor == GRAY_SENTINEL
                    || self.nodes[self.scan_cursor as usize].color != Color::Gray
                {
                    self.state = GcState::Sweep;
                    self.sweep_cursor = self.nodes[WHITE_SENTINEL as usize].next;
                }
            }
            GcState::Sweep => {
                // Atomically re-gray the active context before sweeping, so
                // it is never mistakenly collected mid-run (spec §4.1).
                if let Some(ctx) = self.active_context {
                    self.force_to_gray(ctx);
                    let mut cur = self.nodes[GRAY_SENTINEL as usize].next;
                    while cur != GRAY_SENTINEL && self.nodes[cur as usize].color == Color::Gray {
                        let next = self.nodes[cur as usize].next;
                        let mut to_gray: Vec<u32> = Vec::new();
                        trace(cur, &mut |child| to_gray.push(child));
                        for child in to_gray {
                            self.move_to_gray_if_white(child);
                        }
                        self.unlink(cur);
                        self.insert_after(cur, BLACK_SENTINEL);
                        self.nodes[cur as usize].color = Color::Black;
                        cur = next;
                    }
                }

                let mut freed = Vec::new();
                let mut budget = GC_NUM_ALLOCS;
                let mut cur = self.nodes[WHITE_SENTINEL as usize].next;
                while cur != WHITE_SENTINEL && self.nodes[cur as usize].color == Color::White && budget > 0 {
                    let next = self.nodes[cur as usize].next;
                    self.unlink(cur);
                    self.live_count = self.live_count.saturating_sub(1);
                    if self.nodes[cur as usize].persistent {
                        self.insert_after(cur, BLACK_SENTINEL);
                        self.nodes[cur as usize].color = Color::Black;
                    } else {
                        self.nodes[cur as usize].live = false;
                        freed.push(cur);
                    }
                    cur = next;
                    budget -= 1;
                }
                self.sweep_cursor = cur;

                for f in freed {
                    self.free_slots.push(f);
                }

                if self.sweep_cursor == WHITE_SENTINEL
                    || self.nodes[self.sweep_cursor as usize].color != Color::White
                {
                    // Sweep finished: swap white/black roles for the next
                    // cycle (old blacks become next cycle's whites).
                    self.swap_white_black();
                    self.state = GcState::RootScan;
                    self.num_allocations = GC_NUM_ALLOCS;
                }
            }
            GcState::Suspended => {}
        }
    }

    fn swap_white_black(&mut self) {
        for node in self.nodes.iter_mut() {
            node.color = match node.color {
                Color::White => Color::Black,
                Color::Black => Color::White,
                Color::Gray => Color::Gray,
            };
        }
        self.nodes.swap(WHITE_SENTINEL as usize, BLACK_SENTINEL as usize);
        // Swapping the sentinels' positions also swapped their own next/prev
        // pointers into each other's slot; fix up by restoring their colors.
        self.nodes[WHITE_SENTINEL as usize].color = Color::White;
        self.nodes[BLACK_SENTINEL as usize].color = Color::Black;
        // Re-point every node whose prev/next referenced the swapped
        // sentinel indices is unnecessary: we swapped the *contents* of the
        // two slots (including prev/next), so the lists themselves moved
        // wholesale along with the slot identities. Only the two sentinel
        // indices' own self-consistency needs re-establishing when a list is
        // empty (prev==next==self).
        if self.nodes[WHITE_SENTINEL as usize].next == BLACK_SENTINEL {
            self.nodes[WHITE_SENTINEL as usize].next = WHITE_SENTINEL;
            self.nodes[WHITE_SENTINEL as usize].prev = WHITE_SENTINEL;
        }
        if self.nodes[BLACK_SENTINEL as usize].next == WHITE_SENTINEL {
            self.nodes[BLACK_SENTINEL as usize].next = BLACK_SENTINEL;
            self.nodes[BLACK_SENTINEL as usize].prev = BLACK_SENTINEL;
        }
    }

    /// Run a full (non-incremental) collection to completion. A full run
    /// during the deepest nested pause is a no-op (spec §8 boundary
    /// behavior).
    pub fn full_collect<F: Fn(u32, &mut dyn FnMut(u32))>(&mut self, trace: F) {
        if self.state == GcState::Suspended {
            return;
        }
        // Drive the state machine through RootScan -> GrayScan -> Sweep ->
        // RootScan, looping each phase until it transitions.
        let start = self.state;
        loop {
            self.run_incremental_with(&trace);
            if self.state == GcState::RootScan && start != GcState::RootScan {
                break;
            }
            if start == GcState::RootScan && self.state == GcState::RootScan {
                // Completed exactly one full cycle.
                break;
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_starts_white() {
        let mut c = Collector::new();
        let a = c.alloc();
        assert_eq!(c.color(a), Color::White);
    }

    #[test]
    fn pause_blocks_incremental_work() {
        let mut c = Collector::new();
        c.pause();
        c.pause();
        assert_eq!(c.pause_depth(), 2);
        c.full_collect(|_, _| {});
        assert_eq!(c.state(), GcState::Suspended);
        c.resume();
        assert_eq!(c.pause_depth(), 1);
        assert_eq!(c.state(), GcState::Suspended);
        c.resume();
        assert_eq!(c.pause_depth(), 0);
    }

    #[test]
    fn write_barrier_regrays_white_into_black_container() {
        let mut c = Collector::new();
        let container = c.alloc();
        let referent = c.alloc();
        c.force_to_gray(container);
        c.move_to(container, Color::Black);
        assert_eq!(c.color(referent), Color::White);
        c.write_barrier(container, referent);
        assert_eq!(c.color(referent), Color::Gray);
    }

    #[test]
    fn unreachable_object_is_reclaimed() {
        let mut c = Collector::new();
        let root = c.alloc();
        let garbage = c.alloc();
        c.add_as_root(root);
        let before = c.live_count();
        c.full_collect(|_, _| {});
        assert!(c.live_count() < before);
        assert!(c.free_slots.contains(&garbage) || !c.nodes[garbage as usize].live);
    }

    #[test]
    fn persistent_object_survives_sweep() {
        let mut c = Collector::new();
        let obj = c.alloc();
        c.set_persistent(obj, true);
        c.full_collect(|_, _| {});
        assert!(c.nodes[obj as usize].live);
    }
}
