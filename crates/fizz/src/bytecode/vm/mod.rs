//! The virtual machine and the host-facing evaluation API.
//!
//! The VM executes compiled code against a data stack and a frame stack.
//! Frames marked as host boundaries partition the frame stack: returning
//! from one yields control back to the `eval_no_reset` invocation that
//! pushed it, which is what makes native functions able to re-enter the
//! evaluator. Symbols resolve through the current frame's owning module;
//! imports load, compile, and evaluate module files on demand.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    builtins,
    bytecode::{Instruction, compile_module},
    diagnostics::Diagnostics,
    error::{Error, RunResult},
    expressions::build_ir,
    heap::{Heap, HeapId, HeapStats},
    module::{GLOBAL_MODULE, GLOBAL_MODULE_NAME, Module, ModuleId, default_alias, parse_qualified},
    parse::parse,
    tracer::{TraceEvent, VmTracer},
    value::{NativeFn, Value},
};

/// Default ceiling on the size of an imported module file.
const DEFAULT_IMPORT_LIMIT: u64 = 64 * 1024 * 1024;

/// Preallocated data stack capacity.
const STACK_CAPACITY: usize = 4096;

/// Preallocated frame stack capacity.
const FRAME_CAPACITY: usize = 128;

/// When the garbage collector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcStrategy {
    /// Only when the host calls [`Vm::run_gc`].
    Manual,
    /// Every 256 dispatch steps.
    #[default]
    Per256Calls,
}

/// A single function activation record.
#[derive(Debug)]
struct Frame {
    /// The executing code object.
    code: HeapId,
    /// Instruction cursor into the code object.
    ip: usize,
    /// Stack index where this frame's local region (its arguments) begins.
    stack_base: usize,
    /// Whether returning from this frame crosses the host boundary and
    /// terminates the current run.
    host_boundary: bool,
}

/// The fizz virtual machine.
///
/// A VM owns its memory manager, data and frame stacks, the module
/// registry (global module first), and the diagnostics sink. It is
/// single-threaded; all operations must be serialized by the host.
#[derive(Debug)]
pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    /// Module slab addressed by `ModuleId`; slot 0 is the global module.
    modules: Vec<Option<Module>>,
    modules_free: Vec<usize>,
    /// Canonical module name to slab slot, insertion-ordered with the
    /// global module first.
    registry: IndexMap<Box<str>, ModuleId>,
    diagnostics: Diagnostics,
    gc_strategy: GcStrategy,
    /// Dispatch step counter driving the `Per256Calls` strategy.
    steps: u64,
    import_limit: u64,
    tracer: Option<Box<dyn VmTracer>>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Creates a VM with the default GC strategy and all builtins
    /// registered into the global module.
    #[must_use]
    pub fn new() -> Self {
        Self::with_gc_strategy(GcStrategy::default())
    }

    /// Creates a VM with the given GC strategy.
    #[must_use]
    pub fn with_gc_strategy(gc_strategy: GcStrategy) -> Self {
        let directory = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let global = Module::new(GLOBAL_MODULE_NAME, directory);
        let mut registry = IndexMap::new();
        registry.insert(Box::from(GLOBAL_MODULE_NAME), GLOBAL_MODULE);
        let mut vm = Self {
            heap: Heap::new(),
            stack: Vec::with_capacity(STACK_CAPACITY),
            frames: Vec::with_capacity(FRAME_CAPACITY),
            modules: vec![Some(global)],
            modules_free: Vec::new(),
            registry,
            diagnostics: Diagnostics::new(),
            gc_strategy,
            steps: 0,
            import_limit: DEFAULT_IMPORT_LIMIT,
            tracer: None,
        };
        builtins::register(&mut vm).expect("builtin registration fits in a fresh heap");
        vm
    }

    /// Parses, compiles, and evaluates `source` as top-level code of the
    /// global module, returning the value of the last expression (or
    /// `none` for empty input).
    ///
    /// Definitions persist in the global module across calls.
    pub fn eval_str(&mut self, source: &str) -> RunResult<Value> {
        self.reset();
        let code_id = self.compile_source(GLOBAL_MODULE, source)?;
        self.eval_no_reset(Value::ByteCode(code_id), &[])
    }

    /// Evaluates a callable with the given arguments after resetting the
    /// stacks.
    pub fn eval_function(&mut self, func: Value, args: &[Value]) -> RunResult<Value> {
        self.reset();
        self.eval_no_reset(func, args)
    }

    /// The re-entrant evaluation primitive.
    ///
    /// Bytecode callees run inside a host-boundary frame until it returns;
    /// native callees are invoked directly. Unlike the public entry points
    /// this does not reset the stacks, so native functions may call it
    /// mid-execution. On error the stacks are truncated back to their
    /// state at entry.
    pub fn eval_no_reset(&mut self, func: Value, args: &[Value]) -> RunResult<Value> {
        match func {
            Value::ByteCode(code_id) => {
                let code = self.heap.code(code_id);
                if code.arg_count() != args.len() {
                    return Err(arity_mismatch(code.name(), code.arg_count(), args.len()));
                }
                let stack_len = self.stack.len();
                let frame_len = self.frames.len();
                self.frames.push(Frame {
                    code: code_id,
                    ip: 0,
                    stack_base: stack_len,
                    host_boundary: true,
                });
                self.stack.extend_from_slice(args);
                if self.tracer.is_some() {
                    let name = self.heap.code(code_id).name().to_owned();
                    self.emit(TraceEvent::Call { name });
                }
                self.run().inspect_err(|_| {
                    self.frames.truncate(frame_len);
                    self.stack.truncate(stack_len);
                })
            }
            Value::NativeFn(function) => function(self, args),
            other => Err(Error::type_error(format!("{} is not callable", other.type_name()))),
        }
    }

    /// Registers a native function under `name` in the global module.
    pub fn register_function(&mut self, name: &str, function: NativeFn) -> RunResult<()> {
        let symbol = self.heap.alloc_str(name)?;
        self.module_mut(GLOBAL_MODULE).set_value(symbol, Value::NativeFn(function));
        Ok(())
    }

    /// Looks up a binding in the global module.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<Value> {
        let symbol = self.heap.interned(name)?;
        self.module(GLOBAL_MODULE).get_value(symbol)
    }

    /// Allocates an interned string value.
    pub fn make_string(&mut self, content: &str) -> RunResult<Value> {
        Ok(Value::Str(self.heap.alloc_str(content)?))
    }

    /// Allocates an interned symbol value.
    pub fn make_symbol(&mut self, name: &str) -> RunResult<Value> {
        Ok(Value::Symbol(self.heap.alloc_str(name)?))
    }

    /// Allocates a list holding a copy of `values`.
    pub fn make_list(&mut self, values: &[Value]) -> RunResult<Value> {
        Ok(Value::List(self.heap.alloc_list_from_slice(values)?))
    }

    /// Returns the content of a string or symbol value.
    #[must_use]
    pub fn str_content(&self, value: Value) -> Option<&str> {
        match value {
            Value::Str(id) | Value::Symbol(id) => Some(self.heap.str_content(id)),
            _ => None,
        }
    }

    /// Returns the elements of a list value.
    #[must_use]
    pub fn list_elements(&self, value: Value) -> Option<&[Value]> {
        match value {
            Value::List(id) => Some(self.heap.list(id)),
            _ => None,
        }
    }

    /// Renders the printed representation of a value.
    #[must_use]
    pub fn display(&self, value: Value) -> String {
        value.display_string(&self.heap)
    }

    /// Runs a full garbage collection now.
    ///
    /// Roots are the data stack, the code of every active frame, and every
    /// registered module's bindings; values pinned via the heap's
    /// keep-alive set are always retained.
    pub fn run_gc(&mut self) {
        {
            let Self {
                heap,
                stack,
                frames,
                modules,
                ..
            } = self;
            let stack_roots = stack.iter().copied();
            let frame_roots = frames.iter().map(|frame| Value::ByteCode(frame.code));
            let module_roots = modules.iter().flatten().flat_map(Module::gc_roots);
            heap.collect(stack_roots.chain(frame_roots).chain(module_roots));
        }
        let live_objects = self.heap.live_objects();
        self.emit(TraceEvent::Gc { live_objects });
    }

    /// Attaches a tracer observing VM events.
    pub fn set_tracer(&mut self, tracer: Box<dyn VmTracer>) {
        self.tracer = Some(tracer);
    }

    /// Detaches and returns the current tracer.
    pub fn take_tracer(&mut self) -> Option<Box<dyn VmTracer>> {
        self.tracer.take()
    }

    /// Replaces the GC strategy.
    pub fn set_gc_strategy(&mut self, gc_strategy: GcStrategy) {
        self.gc_strategy = gc_strategy;
    }

    /// Sets the ceiling on imported module file size, in bytes.
    pub fn set_import_limit(&mut self, bytes: u64) {
        self.import_limit = bytes;
    }

    /// Sets the heap's live-object ceiling. `None` removes the limit.
    pub fn set_heap_limit(&mut self, max_live: Option<usize>) {
        self.heap.set_limit(max_live);
    }

    /// Takes a snapshot of heap state.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// The diagnostics collected by parsing and lowering since the last
    /// [`clear_diagnostics`](Self::clear_diagnostics).
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Discards collected diagnostics.
    pub fn clear_diagnostics(&mut self) {
        self.diagnostics.clear();
    }

    /// Current data stack depth. Zero between public evaluations.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Current frame stack depth. Zero between public evaluations.
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn heap(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Names of all registered modules, global first.
    pub(crate) fn module_names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(|name| name.as_ref())
    }

    /// The module owning the currently executing code, or the global
    /// module when no frame is active.
    pub(crate) fn current_module(&self) -> ModuleId {
        self.frames
            .last()
            .map_or(GLOBAL_MODULE, |frame| self.heap.code(frame.code).module())
    }

    pub(crate) fn set_module_value(&mut self, module: ModuleId, symbol: HeapId, value: Value) {
        self.module_mut(module).set_value(symbol, value);
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
    }

    /// Parses and compiles `source` as top-level code of `module`.
    fn compile_source(&mut self, module: ModuleId, source: &str) -> RunResult<HeapId> {
        let asts = parse(source, &mut self.diagnostics)?;
        let ret = build_ir(&asts, &mut self.diagnostics)?;
        compile_module(&mut self.heap, module, &ret)
    }

    fn module(&self, id: ModuleId) -> &Module {
        self.modules[id.index()].as_ref().expect("module slot is live")
    }

    fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        self.modules[id.index()].as_mut().expect("module slot is live")
    }

    fn add_module(&mut self, module: Module) -> ModuleId {
        let name = Box::from(module.name());
        let id = if let Some(index) = self.modules_free.pop() {
            self.modules[index] = Some(module);
            ModuleId::new(index)
        } else {
            self.modules.push(Some(module));
            ModuleId::new(self.modules.len() - 1)
        };
        self.registry.insert(name, id);
        id
    }

    /// Deletes a module, e.g. after a failed import.
    fn remove_module(&mut self, id: ModuleId) {
        self.registry.retain(|_, registered| *registered != id);
        self.modules[id.index()] = None;
        self.modules_free.push(id.index());
    }

    /// Dispatches instructions until the boundary frame pushed by the
    /// caller returns, yielding its result.
    fn run(&mut self) -> RunResult<Value> {
        loop {
            self.steps += 1;
            if self.gc_strategy == GcStrategy::Per256Calls && self.steps % 256 == 0 {
                self.run_gc();
            }
            if self.tracer.is_some() {
                let frame_depth = self.frames.len();
                self.emit(TraceEvent::Step { frame_depth });
            }
            let frame = self.current_frame();
            let Some(instruction) = self.heap.code(frame.code).instructions().get(frame.ip).copied() else {
                return Err(Error::runtime_error("instruction cursor ran past the end of bytecode"));
            };
            self.current_frame_mut().ip += 1;
            match instruction {
                Instruction::Push(value) => self.stack.push(value),
                Instruction::DerefGlobal(symbol) => {
                    let value = self.deref_global(symbol)?;
                    self.stack.push(value);
                }
                Instruction::DerefLocal(symbol) => {
                    let value = self.deref_local(symbol)?;
                    self.stack.push(value);
                }
                Instruction::GetArg(index) => {
                    let base = self.current_frame().stack_base;
                    let Some(value) = self.stack.get(base + index).copied() else {
                        return Err(Error::runtime_error(format!("argument index {index} is outside the frame")));
                    };
                    self.stack.push(value);
                }
                Instruction::Eval(n) => self.eval_op(n)?,
                Instruction::Jump(delta) => self.current_frame_mut().ip += delta,
                Instruction::JumpIf(delta) => match self.pop()? {
                    Value::Bool(true) => self.current_frame_mut().ip += delta,
                    Value::Bool(false) => {}
                    other => {
                        return Err(Error::type_error(format!(
                            "if predicate must be a boolean, got {}",
                            other.type_name()
                        )));
                    }
                },
                Instruction::Import(path) => self.import_module(path)?,
                Instruction::Ret => {
                    if let Some(value) = self.ret_op() {
                        return Ok(value);
                    }
                }
            }
        }
    }

    fn emit(&mut self, event: TraceEvent) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.trace(&event);
        }
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("run loop requires an active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("run loop requires an active frame")
    }

    fn pop(&mut self) -> RunResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| Error::runtime_error("pop from an empty stack"))
    }

    /// Executes `Eval n`: the callee sits `norm_n` slots below the top with
    /// its arguments above it. `n == 0` consumes the frame's entire local
    /// region.
    fn eval_op(&mut self, n: usize) -> RunResult<()> {
        let base = self.current_frame().stack_base;
        let norm_n = if n == 0 {
            self.stack
                .len()
                .checked_sub(base)
                .ok_or_else(|| Error::runtime_error("stack shrank below the frame base"))?
        } else {
            n
        };
        if norm_n == 0 {
            return Err(Error::runtime_error("call expansion found an empty argument region"));
        }
        if self.stack.len() < norm_n {
            return Err(Error::runtime_error("call requires more values than the stack holds"));
        }
        let callee_index = self.stack.len() - norm_n;
        let callee = self.stack[callee_index];
        let arg_count = norm_n - 1;
        match callee {
            Value::ByteCode(code_id) => {
                let code = self.heap.code(code_id);
                if code.arg_count() != arg_count {
                    return Err(arity_mismatch(code.name(), code.arg_count(), arg_count));
                }
                self.frames.push(Frame {
                    code: code_id,
                    ip: 0,
                    stack_base: callee_index + 1,
                    host_boundary: false,
                });
                if self.tracer.is_some() {
                    let name = self.heap.code(code_id).name().to_owned();
                    self.emit(TraceEvent::Call { name });
                }
            }
            Value::NativeFn(function) => {
                // The argument slots stay on the stack for the duration of
                // the call, keeping them reachable across any collection
                // the native triggers.
                let args: SmallVec<[Value; 8]> = self.stack[callee_index + 1..].iter().copied().collect();
                let result = function(self, &args)?;
                self.stack.truncate(callee_index + 1);
                self.stack[callee_index] = result;
            }
            // A non-callable applied to no arguments evaluates to itself,
            // so a form like (aux/x) reads a plain binding. It is already
            // in the result slot.
            _ if arg_count == 0 => {}
            other => {
                return Err(Error::type_error(format!("{} is not callable", other.type_name())));
            }
        }
        Ok(())
    }

    /// Executes `Ret`. Returns the result value when the popped frame was a
    /// host boundary, ending the current run.
    fn ret_op(&mut self) -> Option<Value> {
        let frame = self.frames.pop().expect("Ret requires an active frame");
        let value = if self.stack.len() > frame.stack_base {
            *self.stack.last().expect("stack length checked above")
        } else {
            Value::None
        };
        self.stack.truncate(frame.stack_base);
        if frame.host_boundary {
            return Some(value);
        }
        // The slot immediately below the frame base held the callee;
        // replace it with the return value.
        let callee_slot = frame.stack_base - 1;
        self.stack[callee_slot] = value;
        None
    }

    fn deref_global(&self, symbol: HeapId) -> RunResult<Value> {
        self.module(GLOBAL_MODULE)
            .get_value(symbol)
            .ok_or_else(|| Error::symbol_not_found(self.heap.str_content(symbol)))
    }

    /// Resolves a module-local (possibly `alias/`-qualified) symbol against
    /// the current frame's owning module.
    fn deref_local(&self, symbol: HeapId) -> RunResult<Value> {
        let owner = self.current_module();
        let content = self.heap.str_content(symbol);
        match parse_qualified(content) {
            (None, _) => self
                .module(owner)
                .get_value(symbol)
                .ok_or_else(|| Error::symbol_not_found(content)),
            (Some(alias), name) => {
                let target = self
                    .module(owner)
                    .alias(alias)
                    .ok_or_else(|| Error::symbol_not_found(content))?;
                self.heap
                    .interned(name)
                    .and_then(|name_id| self.module(target).get_value(name_id))
                    .ok_or_else(|| Error::symbol_not_found(content))
            }
        }
    }

    /// Executes `ImportModule`: resolves the path against the importing
    /// module's directory, loads and evaluates the file once, and installs
    /// the default alias. A module that fails to load is deleted again.
    fn import_module(&mut self, path: HeapId) -> RunResult<()> {
        let importer = self.current_module();
        let relative = self.heap.str_content(path).to_owned();
        let resolved = self.module(importer).directory().join(&relative);
        let full_path = fs::canonicalize(&resolved)
            .map_err(|err| Error::file_error(format!("cannot resolve import {relative}: {err}")))?;
        let full_name = full_path.to_string_lossy().into_owned();
        let alias = default_alias(&full_name).to_owned();

        if let Some(existing) = self.registry.get(full_name.as_str()).copied() {
            self.module_mut(importer).set_alias(alias, existing);
            return Ok(());
        }

        let metadata =
            fs::metadata(&full_path).map_err(|err| Error::file_error(format!("cannot stat {full_name}: {err}")))?;
        if metadata.len() > self.import_limit {
            return Err(Error::file_error(format!(
                "{full_name} is {} bytes, over the import limit of {} bytes",
                metadata.len(),
                self.import_limit
            )));
        }
        let source =
            fs::read_to_string(&full_path).map_err(|err| Error::file_error(format!("cannot read {full_name}: {err}")))?;

        let directory = full_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let module_id = self.add_module(Module::new(full_name, directory));
        let outcome = self
            .compile_source(module_id, &source)
            .and_then(|code_id| self.eval_no_reset(Value::ByteCode(code_id), &[]));
        match outcome {
            Ok(_) => {
                self.module_mut(importer).set_alias(alias, module_id);
                let path = self.module(module_id).name().to_owned();
                self.emit(TraceEvent::Import { path });
                Ok(())
            }
            Err(err) => {
                self.remove_module(module_id);
                Err(err)
            }
        }
    }
}

fn arity_mismatch(name: &str, expected: usize, got: usize) -> Error {
    let name = if name.is_empty() { "<lambda>" } else { name };
    Error::arity_error(format!("{name} expects {expected} arguments, got {got}"))
}
