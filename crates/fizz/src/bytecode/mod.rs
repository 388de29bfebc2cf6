//! Bytecode representation, compiler, and virtual machine.
//!
//! Surface syntax is lowered (tokens -> AST -> IR) and then compiled here
//! into instruction sequences bound to a module, which the stack-based VM
//! executes.
//!
//! # Module Structure
//!
//! - `op` - the instruction set
//! - `code` - compiled function objects
//! - `compiler` - IR to bytecode lowering
//! - `vm` - the virtual machine and public evaluation API

pub(crate) use code::Code;
pub(crate) use compiler::{DEFINE_BUILTIN, compile_module};
pub(crate) use op::Instruction;
pub use vm::{GcStrategy, Vm};

mod code;
mod compiler;
mod op;
mod vm;
