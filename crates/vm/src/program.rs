//! Assembly loader for the Rill virtual machine
//!
//! Parses the line-oriented listing produced by the compiler's object
//! code stage into an instruction vector plus a label table. Loading is
//! a single pass: a label records the current program length as its
//! target; every `LOAD` operand is classified at load time so the
//! executor never re-parses text.
//!
//! Classification: `TRUE`/`FALSE` (case-insensitive) become the
//! integers 1/0; a token containing a decimal point parses as a float,
//! other digit runs as an integer; quoted `"..."` and `'c'` operands
//! become string values; anything else is a deferred variable
//! reference. `IF_FALSE x GOTO L` expands into the classified load of
//! `x` followed by a conditional jump.

use crate::error::VmError;
use crate::value::Value;
use std::collections::HashMap;

/// Arithmetic and comparison opcodes that take an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl AluOp {
    pub fn name(self) -> &'static str {
        match self {
            AluOp::Add => "ADD",
            AluOp::Sub => "SUB",
            AluOp::Mul => "MUL",
            AluOp::Div => "DIV",
            AluOp::Eq => "EQ",
            AluOp::Neq => "NEQ",
            AluOp::Lt => "LT",
            AluOp::Gt => "GT",
            AluOp::Le => "LE",
            AluOp::Ge => "GE",
        }
    }

    fn from_mnemonic(text: &str) -> Option<AluOp> {
        match text {
            "ADD" => Some(AluOp::Add),
            "SUB" => Some(AluOp::Sub),
            "MUL" => Some(AluOp::Mul),
            "DIV" => Some(AluOp::Div),
            "EQ" => Some(AluOp::Eq),
            "NEQ" => Some(AluOp::Neq),
            "LT" => Some(AluOp::Lt),
            "GT" => Some(AluOp::Gt),
            "LE" => Some(AluOp::Le),
            "GE" => Some(AluOp::Ge),
            _ => None,
        }
    }
}

/// A classified operand: literal value or deferred memory lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Lit(Value),
    Var(String),
}

/// One executable instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Push a literal
    Push(Value),
    /// Push the value of a variable from memory
    LoadVar(String),
    /// Copy the top of stack into memory without popping
    Store(String),
    /// Pop one value, combine with the operand (or a second pop)
    Alu { op: AluOp, operand: Option<Source> },
    /// Pop and push the boolean complement
    Not,
    /// Pop and coerce to the named type
    Cast(String),
    /// Push a staged call argument
    Param(Source),
    /// Call stub: verifies stack depth only
    Call { name: String, argc: usize },
    /// Halt
    Return,
    Jump(String),
    /// Pop the condition, jump when falsy
    Jumpf(String),
}

/// A loaded program: instruction vector plus label table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instrs: Vec<Instr>,
    pub labels: HashMap<String, usize>,
}

impl Program {
    /// Parse an assembly listing. Blank lines and `;` comment lines are
    /// ignored. Labels may appear as `LABEL x:` or as a leading `x:`
    /// prefix on an instruction line.
    pub fn load(text: &str) -> Result<Program, VmError> {
        let mut program = Program::default();

        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            // Leading `x:` label prefix, shared line with an instruction
            if let Some(first) = line.split_whitespace().next() {
                if first.ends_with(':') && !first.eq_ignore_ascii_case("LABEL") {
                    let name = first.trim_end_matches(':').to_string();
                    program.labels.insert(name, program.instrs.len());
                    line = line[first.len()..].trim_start();
                    if line.is_empty() {
                        continue;
                    }
                }
            }

            program.parse_instruction(line, line_no)?;
        }

        Ok(program)
    }

    fn parse_instruction(&mut self, line: &str, line_no: usize) -> Result<(), VmError> {
        let malformed = || VmError::MalformedInstruction {
            line: line_no,
            text: line.to_string(),
        };

        let (opcode, rest) = match line.split_once(char::is_whitespace) {
            Some((op, rest)) => (op, rest.trim()),
            None => (line, ""),
        };

        match opcode {
            "LABEL" => {
                let name = rest.split_whitespace().next().ok_or_else(malformed)?;
                if !name.ends_with(':') {
                    return Err(malformed());
                }
                self.labels
                    .insert(name.trim_end_matches(':').to_string(), self.instrs.len());
            }

            "LOAD" => {
                if rest.is_empty() {
                    return Err(malformed());
                }
                self.instrs.push(match classify(rest) {
                    Source::Lit(value) => Instr::Push(value),
                    Source::Var(name) => Instr::LoadVar(name),
                });
            }

            "STORE" => {
                if rest.is_empty() {
                    return Err(malformed());
                }
                self.instrs.push(Instr::Store(rest.to_string()));
            }

            "NOT" => self.instrs.push(Instr::Not),

            "CAST" => {
                if rest.is_empty() {
                    return Err(malformed());
                }
                self.instrs.push(Instr::Cast(rest.to_string()));
            }

            "PARAM" => {
                if rest.is_empty() {
                    return Err(malformed());
                }
                self.instrs.push(Instr::Param(classify(rest)));
            }

            "CALL" => {
                // CALL <name>, <argc>
                let (name, argc) = rest.split_once(',').ok_or_else(malformed)?;
                let argc: usize = argc.trim().parse().map_err(|_| malformed())?;
                self.instrs.push(Instr::Call {
                    name: name.trim().to_string(),
                    argc,
                });
            }

            "RETURN" => self.instrs.push(Instr::Return),

            "GOTO" => {
                if rest.is_empty() {
                    return Err(malformed());
                }
                self.instrs.push(Instr::Jump(rest.to_string()));
            }

            "IF_FALSE" => {
                // IF_FALSE <x> GOTO <label>
                let parts: Vec<&str> = rest.split_whitespace().collect();
                if parts.len() < 3 || !parts[parts.len() - 2].eq_ignore_ascii_case("GOTO") {
                    return Err(malformed());
                }
                let target = parts[parts.len() - 1].to_string();
                let condition = parts[..parts.len() - 2].join(" ");
                self.instrs.push(match classify(&condition) {
                    Source::Lit(value) => Instr::Push(value),
                    Source::Var(name) => Instr::LoadVar(name),
                });
                self.instrs.push(Instr::Jumpf(target));
            }

            _ => {
                if let Some(op) = AluOp::from_mnemonic(opcode) {
                    let operand = if rest.is_empty() {
                        None
                    } else {
                        Some(classify(rest))
                    };
                    self.instrs.push(Instr::Alu { op, operand });
                } else {
                    return Err(VmError::UnknownInstruction {
                        line: line_no,
                        text: line.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Classify an operand token at load time.
pub fn classify(text: &str) -> Source {
    if text.eq_ignore_ascii_case("true") {
        return Source::Lit(Value::Int(1));
    }
    if text.eq_ignore_ascii_case("false") {
        return Source::Lit(Value::Int(0));
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Source::Lit(Value::Str(text[1..text.len() - 1].to_string()));
    }
    if text.len() == 3 && text.starts_with('\'') && text.ends_with('\'') {
        return Source::Lit(Value::Str(text[1..2].to_string()));
    }
    if text.contains('.') {
        if let Ok(value) = text.parse::<f64>() {
            return Source::Lit(Value::Float(value));
        }
    } else if let Ok(value) = text.parse::<i64>() {
        return Source::Lit(Value::Int(value));
    }
    Source::Var(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_literals() {
        assert_eq!(classify("TRUE"), Source::Lit(Value::Int(1)));
        assert_eq!(classify("false"), Source::Lit(Value::Int(0)));
        assert_eq!(classify("42"), Source::Lit(Value::Int(42)));
        assert_eq!(classify("3.14"), Source::Lit(Value::Float(3.14)));
        assert_eq!(classify("\"hola\""), Source::Lit(Value::Str("hola".into())));
        assert_eq!(classify("'c'"), Source::Lit(Value::Str("c".into())));
        assert_eq!(classify("x"), Source::Var("x".into()));
        assert_eq!(classify("a.b"), Source::Var("a.b".into()));
    }

    #[test]
    fn test_load_classifies_push_vs_loadvar() {
        let program = Program::load("LOAD 5\nLOAD x\nLOAD true").unwrap();
        assert_eq!(
            program.instrs,
            vec![
                Instr::Push(Value::Int(5)),
                Instr::LoadVar("x".into()),
                Instr::Push(Value::Int(1)),
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let program = Program::load("; header comment\n\nLOAD 1\n   \n; another\nSTORE a").unwrap();
        assert_eq!(program.instrs.len(), 2);
    }

    #[test]
    fn test_label_forms() {
        let program = Program::load("LABEL L1:\nLOAD 1\nL2: LOAD 2\nGOTO L1").unwrap();
        assert_eq!(program.labels.get("L1"), Some(&0));
        assert_eq!(program.labels.get("L2"), Some(&1));
        assert_eq!(program.instrs.len(), 3);
    }

    #[test]
    fn test_if_false_expands_to_load_and_jumpf() {
        let program = Program::load("IF_FALSE t3 GOTO L1").unwrap();
        assert_eq!(
            program.instrs,
            vec![Instr::LoadVar("t3".into()), Instr::Jumpf("L1".into())]
        );
    }

    #[test]
    fn test_if_false_with_literal_condition() {
        let program = Program::load("IF_FALSE false GOTO L2").unwrap();
        assert_eq!(
            program.instrs,
            vec![Instr::Push(Value::Int(0)), Instr::Jumpf("L2".into())]
        );
    }

    #[test]
    fn test_call_parses_name_and_argc() {
        let program = Program::load("CALL sumar, 2").unwrap();
        assert_eq!(
            program.instrs,
            vec![Instr::Call {
                name: "sumar".into(),
                argc: 2,
            }]
        );
    }

    #[test]
    fn test_param_is_a_real_instruction() {
        let program = Program::load("PARAM t1\nPARAM 5").unwrap();
        assert_eq!(
            program.instrs,
            vec![
                Instr::Param(Source::Var("t1".into())),
                Instr::Param(Source::Lit(Value::Int(5))),
            ]
        );
    }

    #[test]
    fn test_alu_with_and_without_operand() {
        let program = Program::load("ADD 2\nADD x\nNOT").unwrap();
        assert_eq!(
            program.instrs,
            vec![
                Instr::Alu {
                    op: AluOp::Add,
                    operand: Some(Source::Lit(Value::Int(2))),
                },
                Instr::Alu {
                    op: AluOp::Add,
                    operand: Some(Source::Var("x".into())),
                },
                Instr::Not,
            ]
        );
    }

    #[test]
    fn test_quoted_string_operand_with_spaces() {
        let program = Program::load("LOAD \"hola mundo\"").unwrap();
        assert_eq!(
            program.instrs,
            vec![Instr::Push(Value::Str("hola mundo".into()))]
        );
    }

    #[test]
    fn test_unknown_instruction_rejected() {
        let err = Program::load("LOAD 1\nFROB x").unwrap_err();
        assert_eq!(
            err,
            VmError::UnknownInstruction {
                line: 2,
                text: "FROB x".into(),
            }
        );
    }

    #[test]
    fn test_malformed_call_rejected() {
        assert!(matches!(
            Program::load("CALL sumar"),
            Err(VmError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn test_empty_program() {
        let program = Program::load("").unwrap();
        assert!(program.instrs.is_empty());
        assert!(program.labels.is_empty());
    }
}
