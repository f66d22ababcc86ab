//! Object code generation for Rill
//!
//! Lowers the quadruple sequence into a line-oriented stack-assembly
//! listing. Two peephole optimizations run over a first scan of the
//! input:
//!
//! 1. Constant-temporary propagation: a temporary defined by a plain
//!    copy from a non-temporary operand aliases that operand; resolved
//!    positions substitute the recorded text.
//! 2. One-use temporary folding: when an instruction writes a temporary
//!    referenced exactly once and the next quad stores that temporary
//!    into a named variable, the pair fuses into a single
//!    load/operate/store sequence and the store quad is skipped.
//!
//! Outside the fused path only plain copies resolve through the temp
//! map; binary operands are emitted as written.

use crate::ir::{Operand, Quad, QuadOp};
use std::collections::HashMap;

/// Mnemonic for an operator quad, if it has one.
fn mnemonic(op: QuadOp) -> Option<&'static str> {
    match op {
        QuadOp::Add => Some("ADD"),
        QuadOp::Sub => Some("SUB"),
        QuadOp::Mul => Some("MUL"),
        QuadOp::Div => Some("DIV"),
        QuadOp::Eq => Some("EQ"),
        QuadOp::Ne => Some("NEQ"),
        QuadOp::Lt => Some("LT"),
        QuadOp::Gt => Some("GT"),
        QuadOp::Le => Some("LE"),
        QuadOp::Ge => Some("GE"),
        QuadOp::Not => Some("NOT"),
        _ => None,
    }
}

/// Lower quadruples to assembly text, newline-joined.
pub fn generate_object(quads: &[Quad]) -> String {
    // First pass: record constant-temporary aliases and count how many
    // times each temporary appears as an operand.
    let mut temp_map: HashMap<u32, String> = HashMap::new();
    let mut usage_count: HashMap<u32, u32> = HashMap::new();

    for quad in quads {
        if quad.op == QuadOp::Assign {
            if let (Some(Operand::Temp(t)), Some(src)) = (&quad.dest, &quad.arg1) {
                if !src.is_temp() {
                    temp_map.insert(*t, src.to_string());
                }
            }
        }
        for arg in [&quad.arg1, &quad.arg2] {
            if let Some(Operand::Temp(t)) = arg {
                *usage_count.entry(*t).or_insert(0) += 1;
            }
        }
    }

    let resolve = |operand: &Operand| -> String {
        if let Operand::Temp(t) = operand {
            if let Some(text) = temp_map.get(t) {
                return text.clone();
            }
        }
        operand.to_string()
    };
    let raw = |operand: &Operand| operand.to_string();

    // Second pass: emit, fusing single-use temporaries into the store
    // that follows them.
    let mut code: Vec<String> = Vec::new();
    let mut skip_next = false;

    for (i, quad) in quads.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }

        // Fold `t = <produce>` followed by `x = t` when t has exactly
        // one use and x is a named variable.
        let fused_store = match &quad.dest {
            Some(Operand::Temp(t)) if usage_count.get(t).copied().unwrap_or(0) == 1 => {
                quads.get(i + 1).and_then(|next| {
                    let stores_temp = next.op == QuadOp::Assign
                        && next.arg1 == Some(Operand::Temp(*t))
                        && next.dest.as_ref().is_some_and(|d| !d.is_temp());
                    if stores_temp { next.dest.clone() } else { None }
                })
            }
            _ => None,
        };

        if let Some(store_to) = fused_store {
            if emit_producer(&mut code, quad, &store_to, &resolve) {
                skip_next = true;
                continue;
            }
        }

        match quad.op {
            QuadOp::Assign => {
                if let (Some(dest), Some(src)) = (&quad.dest, &quad.arg1) {
                    code.push(format!("LOAD {}", resolve(src)));
                    code.push(format!("STORE {}", raw(dest)));
                }
            }

            QuadOp::Add
            | QuadOp::Sub
            | QuadOp::Mul
            | QuadOp::Div
            | QuadOp::Eq
            | QuadOp::Ne
            | QuadOp::Lt
            | QuadOp::Le
            | QuadOp::Gt
            | QuadOp::Ge => {
                if let (Some(dest), Some(a), Some(b), Some(mn)) =
                    (&quad.dest, &quad.arg1, &quad.arg2, mnemonic(quad.op))
                {
                    code.push(format!("LOAD {}", raw(a)));
                    code.push(format!("{} {}", mn, raw(b)));
                    code.push(format!("STORE {}", raw(dest)));
                }
            }

            QuadOp::Not => {
                if let (Some(dest), Some(a)) = (&quad.dest, &quad.arg1) {
                    code.push(format!("LOAD {}", raw(a)));
                    code.push("NOT".to_string());
                    code.push(format!("STORE {}", raw(dest)));
                }
            }

            QuadOp::Cast(ty) => {
                if let (Some(dest), Some(a)) = (&quad.dest, &quad.arg1) {
                    code.push(format!("LOAD {}", raw(a)));
                    code.push(format!("CAST {}", ty));
                    code.push(format!("STORE {}", raw(dest)));
                }
            }

            QuadOp::Param => {
                if let Some(a) = &quad.arg1 {
                    code.push(format!("PARAM {}", raw(a)));
                }
            }

            QuadOp::Call => {
                if let (Some(name), Some(argc)) = (&quad.arg1, &quad.arg2) {
                    code.push(format!("CALL {}, {}", raw(name), raw(argc)));
                    if let Some(dest) = &quad.dest {
                        code.push(format!("STORE {}", raw(dest)));
                    }
                }
            }

            QuadOp::Return => match &quad.arg1 {
                Some(a) => code.push(format!("RETURN {}", raw(a))),
                None => code.push("RETURN".to_string()),
            },

            QuadOp::IfFalse => {
                if let (Some(cond), Some(target)) = (&quad.arg1, &quad.arg2) {
                    code.push(format!("IF_FALSE {} GOTO {}", raw(cond), raw(target)));
                }
            }

            QuadOp::Goto => {
                if let Some(target) = &quad.arg1 {
                    code.push(format!("GOTO {}", raw(target)));
                }
            }

            QuadOp::Label => {
                if let Some(name) = &quad.dest {
                    code.push(format!("LABEL {}:", raw(name)));
                }
            }
        }
    }

    code.join("\n")
}

/// Emit the fused form of a value-producing quad, storing into
/// `store_to` instead of the quad's own temporary. Returns false for
/// quads that do not produce a storable value, leaving normal emission
/// to handle them.
fn emit_producer(
    code: &mut Vec<String>,
    quad: &Quad,
    store_to: &Operand,
    resolve: &dyn Fn(&Operand) -> String,
) -> bool {
    match quad.op {
        QuadOp::Assign => {
            if let Some(a) = &quad.arg1 {
                code.push(format!("LOAD {}", resolve(a)));
                code.push(format!("STORE {}", store_to));
                return true;
            }
            false
        }

        QuadOp::Add
        | QuadOp::Sub
        | QuadOp::Mul
        | QuadOp::Div
        | QuadOp::Eq
        | QuadOp::Ne
        | QuadOp::Lt
        | QuadOp::Le
        | QuadOp::Gt
        | QuadOp::Ge => {
            if let (Some(a), Some(b), Some(mn)) = (&quad.arg1, &quad.arg2, mnemonic(quad.op)) {
                code.push(format!("LOAD {}", resolve(a)));
                code.push(format!("{} {}", mn, resolve(b)));
                code.push(format!("STORE {}", store_to));
                return true;
            }
            false
        }

        QuadOp::Not => {
            if let Some(a) = &quad.arg1 {
                code.push(format!("LOAD {}", resolve(a)));
                code.push("NOT".to_string());
                code.push(format!("STORE {}", store_to));
                return true;
            }
            false
        }

        QuadOp::Cast(ty) => {
            if let Some(a) = &quad.arg1 {
                code.push(format!("LOAD {}", resolve(a)));
                code.push(format!("CAST {}", ty));
                code.push(format!("STORE {}", store_to));
                return true;
            }
            false
        }

        QuadOp::Call => {
            if let (Some(name), Some(argc)) = (&quad.arg1, &quad.arg2) {
                code.push(format!("CALL {}, {}", name, argc));
                code.push(format!("STORE {}", store_to));
                return true;
            }
            false
        }

        _ => false,
    }
}
