//! Stack-machine executor
//!
//! Interprets a loaded [`Program`] over an operand stack, a memory map,
//! and a program counter. The pc advances by one per step except for
//! jumps (which set it from the label table) and `RETURN` (which
//! halts).
//!
//! `STORE` copies the top of stack into memory without popping; extra
//! values left behind by that choice are harmless because only the
//! final top and the memory map are inspected after a run. Calls are
//! stubs: `CALL` verifies the stack holds the declared argument count
//! and leaves it untouched.

use crate::error::VmError;
use crate::program::{AluOp, Instr, Program, Source};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, trace};

/// The virtual machine: stack, memory, program counter, label table
#[derive(Debug, Default)]
pub struct Vm {
    stack: Vec<Value>,
    memory: HashMap<String, Value>,
    pc: usize,
    program: Program,
}

impl Vm {
    pub fn new() -> Self {
        Vm::default()
    }

    /// Load an assembly listing, replacing any previous program. Stack
    /// and memory are cleared so one machine can be reused.
    pub fn load(&mut self, assembly: &str) -> Result<(), VmError> {
        self.program = Program::load(assembly)?;
        self.stack.clear();
        self.memory.clear();
        self.pc = 0;
        debug!(
            instructions = self.program.instrs.len(),
            labels = self.program.labels.len(),
            "program loaded"
        );
        Ok(())
    }

    /// Execute the loaded program from the start.
    pub fn run(&mut self) -> Result<(), VmError> {
        let program = std::mem::take(&mut self.program);
        let result = self.execute(&program);
        self.program = program;
        result
    }

    fn execute(&mut self, program: &Program) -> Result<(), VmError> {
        self.pc = 0;

        while self.pc < program.instrs.len() {
            let instr = &program.instrs[self.pc];
            trace!(pc = self.pc, ?instr, depth = self.stack.len(), "step");

            match instr {
                Instr::Push(value) => self.stack.push(value.clone()),

                Instr::LoadVar(name) => {
                    let value = self
                        .memory
                        .get(name)
                        .cloned()
                        .ok_or_else(|| VmError::UninitializedVariable(name.clone()))?;
                    self.stack.push(value);
                }

                Instr::Store(name) => {
                    // Copy without popping (shipped semantics).
                    let value = self
                        .stack
                        .last()
                        .cloned()
                        .ok_or(VmError::StackUnderflow("STORE"))?;
                    self.memory.insert(name.clone(), value);
                }

                Instr::Alu { op, operand } => {
                    let a = self.pop(op.name())?;
                    let b = match operand {
                        Some(source) => self.resolve(source)?,
                        None => self.pop(op.name())?,
                    };
                    let result = apply_alu(*op, &a, &b)?;
                    self.stack.push(result);
                }

                Instr::Not => {
                    let value = self.pop("NOT")?;
                    self.stack
                        .push(Value::Int(if value.is_truthy() { 0 } else { 1 }));
                }

                Instr::Cast(target) => {
                    let value = self.pop("CAST")?;
                    let result = match target.to_ascii_lowercase().as_str() {
                        "int" => value.cast_int()?,
                        "float" => value.cast_float()?,
                        "bool" => value.cast_bool(),
                        other => return Err(VmError::UnsupportedCast(other.to_string())),
                    };
                    self.stack.push(result);
                }

                Instr::Param(source) => {
                    let value = self.resolve(source)?;
                    self.stack.push(value);
                }

                Instr::Call { name, argc } => {
                    // Stub: no activation record, no transfer of
                    // control. The staged arguments stay on the stack.
                    if self.stack.len() < *argc {
                        return Err(VmError::StackUnderflow("CALL"));
                    }
                    debug!(function = %name, argc, "call stub");
                }

                Instr::Return => {
                    match self.stack.last() {
                        Some(value) => debug!(%value, "return with value (stub)"),
                        None => debug!("return without value (stub)"),
                    }
                    break;
                }

                Instr::Jump(label) => {
                    self.pc = self.label_target(program, label)?;
                    continue;
                }

                Instr::Jumpf(label) => {
                    let condition = self.pop("IF_FALSE")?;
                    if !condition.is_truthy() {
                        self.pc = self.label_target(program, label)?;
                        continue;
                    }
                }
            }

            self.pc += 1;
        }

        Ok(())
    }

    fn label_target(&self, program: &Program, label: &str) -> Result<usize, VmError> {
        program
            .labels
            .get(label)
            .copied()
            .ok_or_else(|| VmError::MissingLabel(label.to_string()))
    }

    fn pop(&mut self, opcode: &'static str) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow(opcode))
    }

    fn resolve(&self, source: &Source) -> Result<Value, VmError> {
        match source {
            Source::Lit(value) => Ok(value.clone()),
            Source::Var(name) => self
                .memory
                .get(name)
                .cloned()
                .ok_or_else(|| VmError::UninitializedVariable(name.clone())),
        }
    }

    /// Top of the operand stack after a run, if any.
    pub fn final_top(&self) -> Option<&Value> {
        self.stack.last()
    }

    /// The memory map: variable name to value.
    pub fn memory(&self) -> &HashMap<String, Value> {
        &self.memory
    }

    /// The operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }
}

fn apply_alu(op: AluOp, a: &Value, b: &Value) -> Result<Value, VmError> {
    let flag = |v: bool| Value::Int(if v { 1 } else { 0 });
    match op {
        AluOp::Add => a.add(b),
        AluOp::Sub => a.sub(b),
        AluOp::Mul => a.mul(b),
        AluOp::Div => a.div(b),
        AluOp::Eq => Ok(flag(a.loose_eq(b))),
        AluOp::Neq => Ok(flag(!a.loose_eq(b))),
        AluOp::Lt => Ok(flag(a.compare(b, "LT")? == Ordering::Less)),
        AluOp::Gt => Ok(flag(a.compare(b, "GT")? == Ordering::Greater)),
        AluOp::Le => Ok(flag(a.compare(b, "LE")? != Ordering::Greater)),
        AluOp::Ge => Ok(flag(a.compare(b, "GE")? != Ordering::Less)),
    }
}
