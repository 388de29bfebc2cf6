//! The arena that owns every heap-allocated value, with two-color
//! mark-and-sweep collection.
//!
//! All reference-carrying values (strings, symbols, lists, structs, and
//! compiled functions) live in one arena and are addressed by [`HeapId`].
//! Slots freed by the sweep are recycled through a free list, so surviving
//! ids stay stable across collections.
//!
//! The collector alternates a global reachable color between two states.
//! A collection flips the color, paints everything reachable from the roots
//! with the new color, and frees every slot still carrying the old one.
//! Fresh allocations are painted the opposite of the current reachable
//! color, which is exactly the color the next collection will paint
//! reachable objects with: an object allocated after one collection is kept
//! through the following one.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::{
    bytecode::{Code, Instruction},
    error::{Error, RunResult},
    intern::Interner,
    value::Value,
};

/// Unique identifier for a value stored inside the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// The two mark colors. Which one means "reachable" alternates per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Blue,
}

impl Color {
    fn swapped(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }
}

/// Payload of one arena slot.
///
/// `Str` is shared by string and symbol values; the distinction lives in the
/// `Value` tag, not in the arena.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(Box<str>),
    List(Vec<Value>),
    /// Symbol-keyed record. Keys are interned symbol ids; iteration order is
    /// insertion order and stays stable between mutations.
    Struct(IndexMap<HeapId, Value>),
    Code(Code),
}

impl HeapData {
    fn variant_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "Str",
            Self::List(_) => "List",
            Self::Struct(_) => "Struct",
            Self::Code(_) => "Code",
        }
    }
}

#[derive(Debug)]
struct Slot {
    data: HeapData,
    color: Color,
}

/// Snapshot of heap state at a point in time.
///
/// Used for monitoring heap growth from the host and in tests that assert
/// collection behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total arena capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by variant name.
    pub objects_by_type: BTreeMap<&'static str, usize>,
    /// Number of interned strings and symbols currently live.
    pub interned_strings: usize,
}

impl HeapStats {
    /// Computes the difference between `self` ("before") and `other`
    /// ("after"). Positive deltas mean growth.
    #[must_use]
    pub fn diff(&self, other: &Self) -> HeapDiff {
        let mut objects_by_type_delta = BTreeMap::new();
        for (&type_name, &count) in &self.objects_by_type {
            let after = other.objects_by_type.get(type_name).copied().unwrap_or(0);
            objects_by_type_delta.insert(type_name, isize_delta(count, after));
        }
        for (&type_name, &count) in &other.objects_by_type {
            if !self.objects_by_type.contains_key(type_name) {
                objects_by_type_delta.insert(type_name, count as isize);
            }
        }
        HeapDiff {
            live_objects_delta: isize_delta(self.live_objects, other.live_objects),
            free_slots_delta: isize_delta(self.free_slots, other.free_slots),
            total_slots_delta: isize_delta(self.total_slots, other.total_slots),
            objects_by_type_delta,
            interned_strings_delta: isize_delta(self.interned_strings, other.interned_strings),
        }
    }
}

/// Difference between two heap snapshots.
///
/// Useful for understanding what a snippet of evaluated code allocated or
/// freed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapDiff {
    /// Change in live object count (`after - before`).
    pub live_objects_delta: isize,
    /// Change in free slot count.
    pub free_slots_delta: isize,
    /// Change in total slot count.
    pub total_slots_delta: isize,
    /// Per-type deltas for types present in either snapshot.
    pub objects_by_type_delta: BTreeMap<&'static str, isize>,
    /// Change in interned string count.
    pub interned_strings_delta: isize,
}

impl HeapDiff {
    /// Returns `true` when every delta is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_objects_delta == 0
            && self.free_slots_delta == 0
            && self.total_slots_delta == 0
            && self.interned_strings_delta == 0
            && self.objects_by_type_delta.values().all(|&delta| delta == 0)
    }
}

impl std::fmt::Display for HeapDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "HeapDiff: no changes");
        }
        write!(
            f,
            "HeapDiff: {:+} live objects, {:+} slots",
            self.live_objects_delta, self.total_slots_delta
        )?;
        for (&type_name, &delta) in &self.objects_by_type_delta {
            if delta != 0 {
                write!(f, "\n  {type_name}: {delta:+}")?;
            }
        }
        if self.interned_strings_delta != 0 {
            write!(f, "\n  Interned strings: {:+}", self.interned_strings_delta)?;
        }
        Ok(())
    }
}

fn isize_delta(before: usize, after: usize) -> isize {
    (after as isize).wrapping_sub(before as isize)
}

/// The memory manager: arena, interner, and collector.
#[derive(Debug)]
pub(crate) struct Heap {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    interner: Interner,
    reachable_color: Color,
    /// Values pinned by native functions across re-entrant evaluation.
    keep_alive: Vec<Value>,
    /// Optional live-object ceiling; allocations beyond it fail.
    max_live: Option<usize>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(256),
            free: Vec::new(),
            interner: Interner::default(),
            reachable_color: Color::Red,
            keep_alive: Vec::new(),
            max_live: None,
            live: 0,
        }
    }

    /// Sets the live-object ceiling. `None` removes the limit.
    pub fn set_limit(&mut self, max_live: Option<usize>) {
        self.max_live = max_live;
    }

    /// Allocates a slot for `data`, recycling a freed slot when one exists.
    ///
    /// New objects are painted the opposite of the current reachable color
    /// so they are kept through the next collection.
    pub fn alloc(&mut self, data: HeapData) -> RunResult<HeapId> {
        if let Some(max) = self.max_live
            && self.live >= max
        {
            return Err(Error::out_of_memory(format!(
                "live-object limit of {max} reached while allocating a {}",
                data.variant_name()
            )));
        }
        self.live += 1;
        let slot = Slot {
            data,
            color: self.reachable_color.swapped(),
        };
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(slot);
            Ok(HeapId(index))
        } else {
            self.slots.push(Some(slot));
            Ok(HeapId(self.slots.len() - 1))
        }
    }

    /// Allocates (or reuses) the interned slot for `content`.
    ///
    /// Equal content always returns the same handle; this is what makes
    /// symbol comparison and string equality a single id comparison.
    pub fn alloc_str(&mut self, content: &str) -> RunResult<HeapId> {
        if let Some(id) = self.interner.get(content) {
            return Ok(id);
        }
        let owned: Box<str> = content.into();
        let id = self.alloc(HeapData::Str(owned.clone()))?;
        self.interner.insert(owned, id);
        Ok(id)
    }

    /// Allocates a list of `len` slots, each initialized to `none`.
    pub fn alloc_list_of_len(&mut self, len: usize) -> RunResult<HeapId> {
        self.alloc(HeapData::List(vec![Value::None; len]))
    }

    /// Allocates a list holding a copy of `values`.
    pub fn alloc_list_from_slice(&mut self, values: &[Value]) -> RunResult<HeapId> {
        self.alloc(HeapData::List(values.to_vec()))
    }

    /// Allocates an empty struct.
    pub fn alloc_struct(&mut self) -> RunResult<HeapId> {
        self.alloc(HeapData::Struct(IndexMap::new()))
    }

    /// Allocates a compiled function object.
    pub fn alloc_code(&mut self, code: Code) -> RunResult<HeapId> {
        self.alloc(HeapData::Code(code))
    }

    /// Returns the payload for a live id.
    ///
    /// # Panics
    /// Panics if `id` refers to a freed slot, which would mean a reachable
    /// handle escaped the root set.
    pub fn get(&self, id: HeapId) -> &HeapData {
        self.slots[id.index()]
            .as_ref()
            .map(|slot| &slot.data)
            .expect("heap id refers to a freed slot")
    }

    /// Mutable access to the payload for a live id.
    ///
    /// # Panics
    /// Panics if `id` refers to a freed slot.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        self.slots[id.index()]
            .as_mut()
            .map(|slot| &mut slot.data)
            .expect("heap id refers to a freed slot")
    }

    /// Returns the interned content for a string or symbol id.
    pub fn str_content(&self, id: HeapId) -> &str {
        match self.get(id) {
            HeapData::Str(content) => content,
            other => panic!("expected interned content, found {}", other.variant_name()),
        }
    }

    /// Returns the elements of a list id.
    pub fn list(&self, id: HeapId) -> &[Value] {
        match self.get(id) {
            HeapData::List(values) => values,
            other => panic!("expected a list, found {}", other.variant_name()),
        }
    }

    /// Returns the compiled function for a bytecode id.
    pub fn code(&self, id: HeapId) -> &Code {
        match self.get(id) {
            HeapData::Code(code) => code,
            other => panic!("expected bytecode, found {}", other.variant_name()),
        }
    }

    /// Looks up already-interned content without allocating.
    pub fn interned(&self, content: &str) -> Option<HeapId> {
        self.interner.get(content)
    }

    /// Pins a value so it survives collections triggered from re-entrant
    /// evaluation inside a native function.
    pub fn keep_alive(&mut self, value: Value) {
        self.keep_alive.push(value);
    }

    /// Releases one pin previously placed with [`keep_alive`](Self::keep_alive).
    pub fn allow_death(&mut self, value: Value) {
        if let Some(pos) = self.keep_alive.iter().rposition(|pinned| *pinned == value) {
            self.keep_alive.swap_remove(pos);
        }
    }

    /// Runs a full mark-and-sweep collection over the given roots.
    ///
    /// The keep-alive pin set is always part of the root set.
    pub fn collect(&mut self, roots: impl Iterator<Item = Value>) {
        self.reachable_color = self.reachable_color.swapped();
        let mut work: Vec<HeapId> = roots.filter_map(Value::heap_id).collect();
        work.extend(self.keep_alive.iter().filter_map(|value| value.heap_id()));
        self.mark(work);
        self.sweep();
    }

    /// Paints everything reachable from the worklist with the current
    /// reachable color.
    fn mark(&mut self, mut work: Vec<HeapId>) {
        while let Some(id) = work.pop() {
            let Some(slot) = self.slots[id.index()].as_mut() else {
                panic!("reachable heap id refers to a freed slot");
            };
            if slot.color == self.reachable_color {
                continue;
            }
            slot.color = self.reachable_color;
            match &slot.data {
                HeapData::Str(_) => {}
                HeapData::List(values) => {
                    work.extend(values.iter().filter_map(|value| value.heap_id()));
                }
                HeapData::Struct(fields) => {
                    for (key, value) in fields {
                        work.push(*key);
                        work.extend(value.heap_id());
                    }
                }
                HeapData::Code(code) => {
                    for instruction in code.instructions() {
                        match instruction {
                            Instruction::Push(value) => work.extend(value.heap_id()),
                            Instruction::DerefGlobal(id)
                            | Instruction::DerefLocal(id)
                            | Instruction::Import(id) => work.push(*id),
                            _ => {}
                        }
                    }
                }
            }
        }
    }

    /// Frees every slot not painted with the current reachable color.
    fn sweep(&mut self) {
        for index in 0..self.slots.len() {
            let Some(slot) = &self.slots[index] else {
                continue;
            };
            if slot.color == self.reachable_color {
                continue;
            }
            let slot = self.slots[index].take().expect("slot checked above");
            if let HeapData::Str(content) = &slot.data {
                self.interner.remove(content);
            }
            self.free.push(index);
            self.live -= 1;
        }
    }

    /// Number of live objects.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Takes a snapshot of the current heap state.
    pub fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        for slot in self.slots.iter().flatten() {
            *objects_by_type.entry(slot.data.variant_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects: self.live,
            free_slots: self.free.len(),
            total_slots: self.slots.len(),
            objects_by_type,
            interned_strings: self.interner.len(),
        }
    }
}
