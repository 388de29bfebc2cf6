#![doc = include_str!("../../../README.md")]

mod builtins;
mod bytecode;
mod diagnostics;
mod error;
mod expressions;
mod heap;
mod intern;
mod module;
mod parse;
mod tokenize;
pub mod tracer;
mod value;

pub use crate::{
    bytecode::{GcStrategy, Vm},
    diagnostics::{Diagnostic, Diagnostics},
    error::{Error, ErrorKind, RunResult},
    heap::{HeapDiff, HeapId, HeapStats},
    tracer::{NoopTracer, RecordingTracer, StderrTracer, TraceEvent, VmTracer},
    value::{NativeFn, Value},
};
