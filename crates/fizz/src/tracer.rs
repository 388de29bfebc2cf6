//! Execution tracing hooks for host-side observability.
//!
//! A host can attach a [`VmTracer`] to watch the VM work: one event per
//! dispatched instruction, one per function call, one per collection, one
//! per module import. The default is no tracer and no overhead beyond a
//! branch per step. Tracers are also how the test suite observes GC and
//! call behavior without poking at VM internals.

use std::{cell::RefCell, rc::Rc};

/// One observable VM event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// An instruction was dispatched at the given frame depth.
    Step { frame_depth: usize },
    /// A bytecode function was called. The name is empty for anonymous
    /// lambdas and module top-level code.
    Call { name: String },
    /// A collection finished with this many objects surviving.
    Gc { live_objects: usize },
    /// A module file was loaded and evaluated.
    Import { path: String },
}

/// Observer attached to a VM with [`Vm::set_tracer`](crate::Vm::set_tracer).
pub trait VmTracer: std::fmt::Debug {
    /// Called for every [`TraceEvent`] the VM emits.
    fn trace(&mut self, event: &TraceEvent);
}

/// Tracer that discards all events.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {
    fn trace(&mut self, _event: &TraceEvent) {}
}

/// Tracer that writes every event to stderr. Intended for debugging
/// embedded scripts.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn trace(&mut self, event: &TraceEvent) {
        eprintln!("{event:?}");
    }
}

/// Tracer that records events into shared storage.
///
/// Cloning shares the storage, so a host can keep one handle, hand a clone
/// to the VM, and inspect the events afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    events: Rc<RefCell<Vec<TraceEvent>>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether anything has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Drains and returns the recorded events.
    #[must_use]
    pub fn take_events(&self) -> Vec<TraceEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    /// Counts recorded events matching a predicate.
    pub fn count_matching(&self, predicate: impl Fn(&TraceEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }
}

impl VmTracer for RecordingTracer {
    fn trace(&mut self, event: &TraceEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_recording_tracer_shares_storage_across_clones() {
        let tracer = RecordingTracer::new();
        let mut handle = tracer.clone();
        handle.trace(&TraceEvent::Step { frame_depth: 1 });
        handle.trace(&TraceEvent::Call { name: "fib".to_owned() });
        assert_eq!(tracer.len(), 2);
        assert_eq!(
            tracer.take_events(),
            vec![
                TraceEvent::Step { frame_depth: 1 },
                TraceEvent::Call { name: "fib".to_owned() },
            ]
        );
        assert!(tracer.is_empty());
    }

    #[test]
    fn test_count_matching() {
        let mut tracer = RecordingTracer::new();
        tracer.trace(&TraceEvent::Step { frame_depth: 1 });
        tracer.trace(&TraceEvent::Gc { live_objects: 3 });
        tracer.trace(&TraceEvent::Step { frame_depth: 2 });
        assert_eq!(tracer.count_matching(|e| matches!(e, TraceEvent::Step { .. })), 2);
    }
}
