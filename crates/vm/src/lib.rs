//! Rill virtual machine
//!
//! Loader and interpreter for the stack-assembly listing produced by
//! the `rill-compiler` crate. A [`Vm`] owns an operand stack, a memory
//! map from variable names to values, and a program counter into the
//! loaded instruction vector; labels resolve through a table built at
//! load time.
//!
//! ```no_run
//! use rill_vm::Vm;
//!
//! let mut vm = Vm::new();
//! vm.load("LOAD 5\nADD 2\nSTORE a")?;
//! vm.run()?;
//! assert_eq!(vm.memory().get("a").map(|v| v.to_string()), Some("7".into()));
//! # Ok::<(), rill_vm::VmError>(())
//! ```
//!
//! The whole machine is single-threaded and synchronous; `run` is a
//! tight loop over the instruction vector with no suspension points.

pub mod error;
pub mod machine;
pub mod program;
pub mod value;

pub use error::VmError;
pub use machine::Vm;
pub use program::{AluOp, Instr, Program, Source};
pub use value::Value;
