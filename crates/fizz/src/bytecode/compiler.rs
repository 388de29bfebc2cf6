//! Lowers the intermediate tree into bytecode bound to a module.
//!
//! The compiler resolves every free identifier at emit time: positional
//! parameters become `GetArg`, names defined at the target module's top
//! level (or explicitly `alias/`-qualified) become `DerefLocal`, and
//! everything else becomes `DerefGlobal`. The set of top-level names is
//! collected by a pre-walk of the root `Ret` before emission starts, so a
//! definition may be referenced textually before it executes.
//!
//! `define` and `import` are only emitted while compiling module top-level
//! code; anywhere else they are a syntax error.

use ahash::AHashSet;

use super::{code::Code, op::Instruction};
use crate::{
    error::{Error, RunResult},
    expressions::{Constant, Expr, Ret, top_level_defines},
    heap::{Heap, HeapId},
    module::{ModuleId, parse_qualified},
    value::Value,
};

/// Name of the internal definition builtin the compiler expands `define`
/// into a call of.
pub(crate) const DEFINE_BUILTIN: &str = "%define%";

/// Compiles a lowered program as top-level code for `module`.
///
/// The returned code object takes no arguments, ends with `Ret`, and is
/// allocated in the heap arena.
pub(crate) fn compile_module(heap: &mut Heap, module: ModuleId, ret: &Ret) -> RunResult<HeapId> {
    let defined = top_level_defines(ret);
    let mut instructions = Vec::new();
    let mut compiler = Compiler {
        heap: &mut *heap,
        module,
        defined: &defined,
        params: &[],
    };
    for expr in &ret.exprs {
        compiler.compile_top(expr, &mut instructions)?;
    }
    instructions.push(Instruction::Ret);
    heap.alloc_code(Code::new("", 0, instructions, module))
}

struct Compiler<'a> {
    heap: &'a mut Heap,
    module: ModuleId,
    /// Names bound by top-level `define` forms of the target module.
    defined: &'a AHashSet<Box<str>>,
    /// Positional parameters of the lambda being compiled; empty at module
    /// top level.
    params: &'a [Box<str>],
}

impl Compiler<'_> {
    /// Compiles a direct child of the root `Ret`, where `define` and
    /// `import` are legal.
    fn compile_top(&mut self, expr: &Expr, out: &mut Vec<Instruction>) -> RunResult<()> {
        match expr {
            Expr::Define { name, expr } => self.compile_define(name, expr, out),
            Expr::Import { path } => {
                let path_id = self.heap.alloc_str(path)?;
                out.push(Instruction::Import(path_id));
                Ok(())
            }
            _ => self.compile_expr(expr, out),
        }
    }

    /// Compiles a nested expression, where `define` and `import` are not.
    fn compile_expr(&mut self, expr: &Expr, out: &mut Vec<Instruction>) -> RunResult<()> {
        match expr {
            Expr::Constant(constant) => {
                let value = self.compile_constant(constant)?;
                out.push(Instruction::Push(value));
                Ok(())
            }
            Expr::Deref(name) => self.compile_deref(name, out),
            Expr::Call { func, args } => {
                self.compile_expr(func, out)?;
                for arg in args {
                    self.compile_expr(arg, out)?;
                }
                out.push(Instruction::Eval(args.len() + 1));
                Ok(())
            }
            Expr::If { pred, then, otherwise } => self.compile_if(pred, then, otherwise.as_deref(), out),
            Expr::Lambda { name, params, body } => self.compile_lambda(name, params, body, out),
            Expr::Define { .. } => Err(Error::syntax_error("define is only legal at module top level")),
            Expr::Import { .. } => Err(Error::syntax_error("import is only legal at module top level")),
        }
    }

    fn compile_constant(&mut self, constant: &Constant) -> RunResult<Value> {
        Ok(match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Float(f) => Value::Float(*f),
            Constant::Str(s) => Value::Str(self.heap.alloc_str(s)?),
            Constant::Symbol(s) => Value::Symbol(self.heap.alloc_str(s)?),
        })
    }

    /// Resolves an identifier by priority: positional argument, then
    /// module-local (qualified or top-level-defined), then global.
    fn compile_deref(&mut self, name: &str, out: &mut Vec<Instruction>) -> RunResult<()> {
        if let Some(index) = self.params.iter().position(|param| &**param == name) {
            out.push(Instruction::GetArg(index));
            return Ok(());
        }
        let (alias, symbol) = parse_qualified(name);
        let instruction = if alias.is_some() {
            // Qualified names keep their alias in the operand; the VM
            // resolves it against the owning module's alias table.
            Instruction::DerefLocal(self.heap.alloc_str(name)?)
        } else if self.defined.contains(name) {
            Instruction::DerefLocal(self.heap.alloc_str(symbol)?)
        } else {
            Instruction::DerefGlobal(self.heap.alloc_str(symbol)?)
        };
        out.push(instruction);
        Ok(())
    }

    /// Emits `pred; JumpIf(len(else)+1); else; Jump(len(then)); then`.
    ///
    /// A missing else branch compiles to a `none` constant. Jump deltas are
    /// instruction counts.
    fn compile_if(
        &mut self,
        pred: &Expr,
        then: &Expr,
        otherwise: Option<&Expr>,
        out: &mut Vec<Instruction>,
    ) -> RunResult<()> {
        self.compile_expr(pred, out)?;
        let mut else_branch = Vec::new();
        match otherwise {
            Some(expr) => self.compile_expr(expr, &mut else_branch)?,
            None => else_branch.push(Instruction::Push(Value::None)),
        }
        let mut then_branch = Vec::new();
        self.compile_expr(then, &mut then_branch)?;
        out.push(Instruction::JumpIf(else_branch.len() + 1));
        out.extend(else_branch);
        out.push(Instruction::Jump(then_branch.len()));
        out.extend(then_branch);
        Ok(())
    }

    /// Compiles a lambda body with a fresh compiler bound to its parameter
    /// list and pushes the resulting code object as a constant.
    fn compile_lambda(
        &mut self,
        name: &str,
        params: &[Box<str>],
        body: &[Expr],
        out: &mut Vec<Instruction>,
    ) -> RunResult<()> {
        let mut instructions = Vec::new();
        let mut inner = Compiler {
            heap: &mut *self.heap,
            module: self.module,
            defined: self.defined,
            params,
        };
        for expr in body {
            inner.compile_expr(expr, &mut instructions)?;
        }
        instructions.push(Instruction::Ret);
        let code_id = self
            .heap
            .alloc_code(Code::new(name, params.len(), instructions, self.module))?;
        out.push(Instruction::Push(Value::ByteCode(code_id)));
        Ok(())
    }

    /// Expands `define` into a call of the internal `%define%` builtin:
    /// push `%define%`, push the symbol, evaluate the expression, `Eval 3`.
    fn compile_define(&mut self, name: &str, expr: &Expr, out: &mut Vec<Instruction>) -> RunResult<()> {
        let define_id = self.heap.alloc_str(DEFINE_BUILTIN)?;
        out.push(Instruction::DerefGlobal(define_id));
        let symbol = self.heap.alloc_str(name)?;
        out.push(Instruction::Push(Value::Symbol(symbol)));
        self.compile_expr(expr, out)?;
        out.push(Instruction::Eval(3));
        Ok(())
    }
}
