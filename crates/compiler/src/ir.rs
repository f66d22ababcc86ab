//! Intermediate representation for Rill
//!
//! Lowers the statement list into a linear quadruple sequence
//! `(dest, op, arg1, arg2)` with fresh temporaries `t1, t2, ...` and
//! labels `L1, L2, ...`. Generation is a pure function of the AST: the
//! counters restart at zero for every [`Generator::generate`] call and
//! the output is byte-identical across runs for the same input.
//!
//! Identifiers are used directly as operands; only literals and
//! computed results get temporaries. Scope markers are a semantic
//! concept and lower to nothing.

use crate::ast::{BinOp, Expr, Stmt};
use crate::types::Type;
use std::fmt;

/// One operand of a quadruple.
///
/// Temporaries are their own variant rather than a name prefix, so the
/// object-code pass can tell `t1` from a user variable that merely
/// starts with `t`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Compiler temporary `t<k>`
    Temp(u32),
    /// Named variable (or function name in a `call` quad)
    Var(String),
    /// Jump target `L<k>`
    Label(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Char(char),
    /// Argument count in a `call` quad
    Argc(usize),
}

impl Operand {
    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(n) => write!(f, "t{}", n),
            Operand::Var(name) => write!(f, "{}", name),
            Operand::Label(name) => write!(f, "{}", name),
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Float(v) => write!(f, "{}", format_float(*v)),
            Operand::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Operand::Str(s) => write!(f, "\"{}\"", s),
            Operand::Char(c) => write!(f, "'{}'", c),
            Operand::Argc(n) => write!(f, "{}", n),
        }
    }
}

/// Render a float keeping a decimal point even for whole values, so a
/// reloaded operand is still recognizably a float.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Quadruple operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadOp {
    /// Plain copy `dest = arg1`
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Logical negation `dest = !arg1`
    Not,
    /// Type conversion `dest = cast_<type>(arg1)`
    Cast(Type),
    /// Stage one call argument
    Param,
    /// `dest = call arg1, arg2` (function name, argument count)
    Call,
    Return,
    /// Conditional jump: `if_false arg1 goto arg2`
    IfFalse,
    Goto,
    /// Jump target definition; the label name is in `dest`
    Label,
}

impl QuadOp {
    pub fn from_bin(op: BinOp) -> QuadOp {
        match op {
            BinOp::Add => QuadOp::Add,
            BinOp::Sub => QuadOp::Sub,
            BinOp::Mul => QuadOp::Mul,
            BinOp::Div => QuadOp::Div,
            BinOp::Eq => QuadOp::Eq,
            BinOp::Ne => QuadOp::Ne,
            BinOp::Lt => QuadOp::Lt,
            BinOp::Le => QuadOp::Le,
            BinOp::Gt => QuadOp::Gt,
            BinOp::Ge => QuadOp::Ge,
        }
    }
}

impl fmt::Display for QuadOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuadOp::Assign => write!(f, "="),
            QuadOp::Add => write!(f, "+"),
            QuadOp::Sub => write!(f, "-"),
            QuadOp::Mul => write!(f, "*"),
            QuadOp::Div => write!(f, "/"),
            QuadOp::Eq => write!(f, "=="),
            QuadOp::Ne => write!(f, "!="),
            QuadOp::Lt => write!(f, "<"),
            QuadOp::Le => write!(f, "<="),
            QuadOp::Gt => write!(f, ">"),
            QuadOp::Ge => write!(f, ">="),
            QuadOp::Not => write!(f, "!"),
            QuadOp::Cast(ty) => write!(f, "cast_{}", ty),
            QuadOp::Param => write!(f, "param"),
            QuadOp::Call => write!(f, "call"),
            QuadOp::Return => write!(f, "return"),
            QuadOp::IfFalse => write!(f, "if_false"),
            QuadOp::Goto => write!(f, "goto"),
            QuadOp::Label => write!(f, "label"),
        }
    }
}

/// One linear IR operation
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub dest: Option<Operand>,
    pub op: QuadOp,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
}

impl Quad {
    pub fn new(
        dest: Option<Operand>,
        op: QuadOp,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
    ) -> Self {
        Quad {
            dest,
            op,
            arg1,
            arg2,
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field(op: &Option<Operand>) -> String {
            match op {
                Some(operand) => operand.to_string(),
                None => "_".to_string(),
            }
        }
        write!(
            f,
            "({}, {}, {}, {})",
            field(&self.dest),
            self.op,
            field(&self.arg1),
            field(&self.arg2)
        )
    }
}

/// Generate quadruples for a whole program.
pub fn generate_ir(program: &[Stmt]) -> Vec<Quad> {
    Generator::new().generate(program)
}

/// Quadruple generator with monotonic temporary and label counters
pub struct Generator {
    temp_counter: u32,
    label_counter: u32,
    code: Vec<Quad>,
}

impl Generator {
    pub fn new() -> Self {
        Generator {
            temp_counter: 0,
            label_counter: 0,
            code: Vec::new(),
        }
    }

    /// Lower a program. Counters and the output buffer restart on
    /// every call, so one generator can be reused across compiles.
    pub fn generate(&mut self, program: &[Stmt]) -> Vec<Quad> {
        self.temp_counter = 0;
        self.label_counter = 0;
        self.code = Vec::new();

        for stmt in program {
            self.gen_statement(stmt);
        }
        std::mem::take(&mut self.code)
    }

    fn new_temp(&mut self) -> Operand {
        self.temp_counter += 1;
        Operand::Temp(self.temp_counter)
    }

    fn new_label(&mut self) -> String {
        self.label_counter += 1;
        format!("L{}", self.label_counter)
    }

    fn emit(&mut self, dest: Option<Operand>, op: QuadOp, arg1: Option<Operand>, arg2: Option<Operand>) {
        self.code.push(Quad::new(dest, op, arg1, arg2));
    }

    /// Lower an expression, returning the operand that holds its
    /// result. Literals are materialized into temporaries; identifiers
    /// pass through untouched.
    fn gen_expression(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Int(v) => self.materialize(Operand::Int(*v)),
            Expr::Float(v) => self.materialize(Operand::Float(*v)),
            Expr::Bool(v) => self.materialize(Operand::Bool(*v)),
            Expr::Str(s) => self.materialize(Operand::Str(s.clone())),
            Expr::Char(c) => self.materialize(Operand::Char(*c)),

            Expr::Ident(name) => Operand::Var(name.clone()),

            Expr::Not(inner) => {
                let value = self.gen_expression(inner);
                let result = self.new_temp();
                self.emit(Some(result.clone()), QuadOp::Not, Some(value), None);
                result
            }

            Expr::Cast(target, inner) => {
                let value = self.gen_expression(inner);
                let result = self.new_temp();
                self.emit(Some(result.clone()), QuadOp::Cast(*target), Some(value), None);
                result
            }

            Expr::Call(name, args) => self.gen_call(name, args),

            Expr::Binary(op, left, right) => {
                let lhs = self.gen_expression(left);
                let rhs = self.gen_expression(right);
                let result = self.new_temp();
                self.emit(
                    Some(result.clone()),
                    QuadOp::from_bin(*op),
                    Some(lhs),
                    Some(rhs),
                );
                result
            }
        }
    }

    fn materialize(&mut self, literal: Operand) -> Operand {
        let temp = self.new_temp();
        self.emit(Some(temp.clone()), QuadOp::Assign, Some(literal), None);
        temp
    }

    /// Arguments lower left to right, then `param` quads in the same
    /// order, then the `call` itself.
    fn gen_call(&mut self, name: &str, args: &[Expr]) -> Operand {
        let mut staged = Vec::with_capacity(args.len());
        for arg in args {
            staged.push(self.gen_expression(arg));
        }
        for value in staged {
            self.emit(None, QuadOp::Param, Some(value), None);
        }
        let result = self.new_temp();
        self.emit(
            Some(result.clone()),
            QuadOp::Call,
            Some(Operand::Var(name.to_string())),
            Some(Operand::Argc(args.len())),
        );
        result
    }

    fn gen_statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Declaration { name, init, .. } => {
                // A declaration without an initializer emits nothing;
                // storage appears on first assignment.
                if let Some(init) = init {
                    let value = self.gen_expression(init);
                    self.emit(
                        Some(Operand::Var(name.clone())),
                        QuadOp::Assign,
                        Some(value),
                        None,
                    );
                }
            }

            Stmt::Assignment { name, expr } => {
                let value = self.gen_expression(expr);
                self.emit(
                    Some(Operand::Var(name.clone())),
                    QuadOp::Assign,
                    Some(value),
                    None,
                );
            }

            Stmt::If {
                cond,
                then_block,
                else_block: None,
            } => {
                let cond_value = self.gen_expression(cond);
                let else_label = self.new_label();
                let end_label = self.new_label();
                self.emit(
                    None,
                    QuadOp::IfFalse,
                    Some(cond_value),
                    Some(Operand::Label(else_label.clone())),
                );
                for stmt in then_block {
                    self.gen_statement(stmt);
                }
                self.emit(None, QuadOp::Goto, Some(Operand::Label(end_label.clone())), None);
                // Both labels are emitted even without an else-block so
                // the listing shape is uniform.
                self.emit(Some(Operand::Label(else_label)), QuadOp::Label, None, None);
                self.emit(Some(Operand::Label(end_label)), QuadOp::Label, None, None);
            }

            Stmt::If {
                cond,
                then_block,
                else_block: Some(else_block),
            } => {
                let cond_value = self.gen_expression(cond);
                let else_label = self.new_label();
                let end_label = self.new_label();
                self.emit(
                    None,
                    QuadOp::IfFalse,
                    Some(cond_value),
                    Some(Operand::Label(else_label.clone())),
                );
                for stmt in then_block {
                    self.gen_statement(stmt);
                }
                self.emit(None, QuadOp::Goto, Some(Operand::Label(end_label.clone())), None);
                self.emit(Some(Operand::Label(else_label)), QuadOp::Label, None, None);
                for stmt in else_block {
                    self.gen_statement(stmt);
                }
                self.emit(Some(Operand::Label(end_label)), QuadOp::Label, None, None);
            }

            Stmt::While { cond, body } => {
                let start_label = self.new_label();
                let end_label = self.new_label();
                self.emit(
                    Some(Operand::Label(start_label.clone())),
                    QuadOp::Label,
                    None,
                    None,
                );
                let cond_value = self.gen_expression(cond);
                self.emit(
                    None,
                    QuadOp::IfFalse,
                    Some(cond_value),
                    Some(Operand::Label(end_label.clone())),
                );
                for stmt in body {
                    self.gen_statement(stmt);
                }
                self.emit(None, QuadOp::Goto, Some(Operand::Label(start_label)), None);
                self.emit(Some(Operand::Label(end_label)), QuadOp::Label, None, None);
            }

            Stmt::Return(expr) => match expr {
                Some(expr) => {
                    let value = self.gen_expression(expr);
                    self.emit(None, QuadOp::Return, Some(value), None);
                }
                None => self.emit(None, QuadOp::Return, None, None),
            },

            Stmt::CallStmt { name, args } => {
                // Same lowering as the expression form; the result
                // temporary is simply never read.
                self.gen_call(name, args);
            }

            // Signatures carry no runtime behavior and bodies are not
            // lowered.
            Stmt::FuncDecl { .. } => {}

            // Scopes are a semantic concept, not an IR one.
            Stmt::BlockEnter | Stmt::BlockExit => {}
        }
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parser::parse;

    fn ir_for(source: &str) -> Vec<Quad> {
        let tokens = tokenize(source).expect("lexes");
        let ast = parse(&tokens).expect("parses");
        generate_ir(&ast)
    }

    fn temp(n: u32) -> Option<Operand> {
        Some(Operand::Temp(n))
    }

    fn var(name: &str) -> Option<Operand> {
        Some(Operand::Var(name.to_string()))
    }

    #[test]
    fn test_addition_lowering() {
        // int a = 5 + 2;
        let quads = ir_for("int a = 5 + 2;");
        assert_eq!(
            quads,
            vec![
                Quad::new(temp(1), QuadOp::Assign, Some(Operand::Int(5)), None),
                Quad::new(temp(2), QuadOp::Assign, Some(Operand::Int(2)), None),
                Quad::new(temp(3), QuadOp::Add, temp(1), temp(2)),
                Quad::new(var("a"), QuadOp::Assign, temp(3), None),
            ]
        );
    }

    #[test]
    fn test_bool_literal_lowering() {
        let quads = ir_for("bool activo = false;");
        assert_eq!(
            quads,
            vec![
                Quad::new(temp(1), QuadOp::Assign, Some(Operand::Bool(false)), None),
                Quad::new(var("activo"), QuadOp::Assign, temp(1), None),
            ]
        );
    }

    #[test]
    fn test_identifiers_pass_through() {
        // x + 1 loads x directly, no temp for the variable
        let quads = ir_for("int x = 10; x = x + 1;");
        assert_eq!(
            quads[2],
            Quad::new(temp(2), QuadOp::Assign, Some(Operand::Int(1)), None)
        );
        assert_eq!(quads[3], Quad::new(temp(3), QuadOp::Add, var("x"), temp(2)));
        // Final quad stores a temporary back into x
        let last = quads.last().unwrap();
        assert_eq!(last.dest, var("x"));
        assert_eq!(last.op, QuadOp::Assign);
        assert!(last.arg1.as_ref().unwrap().is_temp());
    }

    #[test]
    fn test_declaration_without_init_emits_nothing() {
        assert!(ir_for("int x;").is_empty());
    }

    #[test]
    fn test_not_lowering() {
        let quads = ir_for("bool activo = !false;");
        assert_eq!(
            quads,
            vec![
                Quad::new(temp(1), QuadOp::Assign, Some(Operand::Bool(false)), None),
                Quad::new(temp(2), QuadOp::Not, temp(1), None),
                Quad::new(var("activo"), QuadOp::Assign, temp(2), None),
            ]
        );
    }

    #[test]
    fn test_cast_lowering() {
        let quads = ir_for("int x = int(\"5\");");
        assert!(quads
            .iter()
            .any(|q| q.op == QuadOp::Cast(crate::types::Type::Int)));
    }

    #[test]
    fn test_if_emits_both_labels() {
        let quads = ir_for("int x = 10; if (x > 5) { int y = 1; }");
        let labels: Vec<&Quad> = quads.iter().filter(|q| q.op == QuadOp::Label).collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].dest, Some(Operand::Label("L1".to_string())));
        assert_eq!(labels[1].dest, Some(Operand::Label("L2".to_string())));
        assert!(quads.iter().any(|q| q.op == QuadOp::IfFalse));
        assert!(quads.iter().any(|q| q.op == QuadOp::Goto));
    }

    #[test]
    fn test_if_else_shape() {
        let quads = ir_for("int x = 10; if (x > 5) { int y = 1; } else { int y = 0; }");
        let if_false = quads
            .iter()
            .position(|q| q.op == QuadOp::IfFalse)
            .expect("if_false present");
        let goto = quads
            .iter()
            .position(|q| q.op == QuadOp::Goto)
            .expect("goto present");
        let labels: Vec<usize> = quads
            .iter()
            .enumerate()
            .filter(|(_, q)| q.op == QuadOp::Label)
            .map(|(i, _)| i)
            .collect();
        // if_false ... goto ... L1 ... else-block ... L2
        assert!(if_false < goto);
        assert_eq!(labels.len(), 2);
        assert!(goto < labels[0]);
        assert!(labels[0] + 1 < labels[1], "else block sits between labels");
        // Exactly one unconditional goto: none after the else block
        assert_eq!(quads.iter().filter(|q| q.op == QuadOp::Goto).count(), 1);
    }

    #[test]
    fn test_while_shape() {
        let quads = ir_for("int i = 0; while (i < 3) { i = i + 1; }");
        // L1 label first, condition, if_false L2, body, goto L1, L2 label
        let start = quads
            .iter()
            .position(|q| q.op == QuadOp::Label && q.dest == Some(Operand::Label("L1".to_string())))
            .expect("loop start label");
        let if_false = quads
            .iter()
            .position(|q| q.op == QuadOp::IfFalse)
            .expect("exit test");
        let goto = quads
            .iter()
            .position(|q| q.op == QuadOp::Goto)
            .expect("back edge");
        let end = quads
            .iter()
            .position(|q| q.op == QuadOp::Label && q.dest == Some(Operand::Label("L2".to_string())))
            .expect("loop end label");
        assert!(start < if_false && if_false < goto && goto < end);
        assert_eq!(
            quads[goto].arg1,
            Some(Operand::Label("L1".to_string())),
            "back edge targets the loop start"
        );
    }

    #[test]
    fn test_call_lowering_order() {
        let quads = ir_for("int f(int a, int b) { return a; } int r = f(3, 4);");
        assert_eq!(
            quads,
            vec![
                Quad::new(temp(1), QuadOp::Assign, Some(Operand::Int(3)), None),
                Quad::new(temp(2), QuadOp::Assign, Some(Operand::Int(4)), None),
                Quad::new(None, QuadOp::Param, temp(1), None),
                Quad::new(None, QuadOp::Param, temp(2), None),
                Quad::new(temp(3), QuadOp::Call, var("f"), Some(Operand::Argc(2))),
                Quad::new(var("r"), QuadOp::Assign, temp(3), None),
            ]
        );
    }

    #[test]
    fn test_return_lowering() {
        let ast = vec![Stmt::Return(None)];
        let quads = generate_ir(&ast);
        assert_eq!(quads, vec![Quad::new(None, QuadOp::Return, None, None)]);
    }

    #[test]
    fn test_counters_reset_between_generations() {
        let mut generator = Generator::new();
        let tokens = tokenize("int a = 1;").unwrap();
        let ast = parse(&tokens).unwrap();
        let first = generator.generate(&ast);
        let second = generator.generate(&ast);
        assert_eq!(first, second);
        assert_eq!(first[0].dest, temp(1));
    }

    #[test]
    fn test_deterministic_output() {
        let source = "int x = 10; if (x > 5) { int y = 1; } else { int y = 0; }";
        assert_eq!(ir_for(source), ir_for(source));
    }

    #[test]
    fn test_every_jump_target_has_one_label() {
        let source = "int x = 1; if (x > 0) { int a = 1; } else { int b = 2; } \
                      int i = 0; while (i < 2) { i = i + 1; }";
        let quads = ir_for(source);
        let mut targets = Vec::new();
        for quad in &quads {
            match quad.op {
                QuadOp::IfFalse => targets.push(quad.arg2.clone()),
                QuadOp::Goto => targets.push(quad.arg1.clone()),
                _ => {}
            }
        }
        for target in targets {
            let Some(Operand::Label(name)) = target else {
                panic!("jump without label target");
            };
            let defs = quads
                .iter()
                .filter(|q| {
                    q.op == QuadOp::Label && q.dest == Some(Operand::Label(name.clone()))
                })
                .count();
            assert_eq!(defs, 1, "label {} defined exactly once", name);
        }
    }

    #[test]
    fn test_quad_display() {
        let quad = Quad::new(temp(1), QuadOp::Assign, Some(Operand::Int(5)), None);
        assert_eq!(quad.to_string(), "(t1, =, 5, _)");
        let quad = Quad::new(None, QuadOp::IfFalse, temp(3), Some(Operand::Label("L1".into())));
        assert_eq!(quad.to_string(), "(_, if_false, t3, L1)");
    }

    #[test]
    fn test_float_operands_keep_decimal_point() {
        let quads = ir_for("float f = 2.0;");
        assert_eq!(quads[0].arg1, Some(Operand::Float(2.0)));
        assert_eq!(quads[0].arg1.as_ref().unwrap().to_string(), "2.0");
    }
}
