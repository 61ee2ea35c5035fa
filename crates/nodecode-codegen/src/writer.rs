//! TypeScript source emitter.

use crate::ast::*;
use crate::EmitOptions;

/// Emits a compiled [`Program`] as TypeScript source.
pub struct TsWriter {
    output: String,
    indent: usize,
    options: EmitOptions,
}

impl TsWriter {
    pub fn new(options: EmitOptions) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            options,
        }
    }

    /// Emit a program with default options.
    pub fn emit(program: &Program) -> String {
        Self::emit_with(program, &EmitOptions::default())
    }

    /// Emit a program. Functions are separated by a blank line.
    pub fn emit_with(program: &Program, options: &EmitOptions) -> String {
        let mut writer = Self::new(options.clone());
        for (i, function) in program.functions.iter().enumerate() {
            if i > 0 {
                writer.output.push('\n');
            }
            writer.write_function(function);
        }
        writer.output
    }

    /// Emit a single function declaration.
    pub fn emit_function(function: &FunctionDecl, options: &EmitOptions) -> String {
        let mut writer = Self::new(options.clone());
        writer.write_function(function);
        writer.output
    }

    fn write_indent(&mut self) {
        let width = self.indent * self.options.indent_width;
        self.output.extend(std::iter::repeat(' ').take(width));
    }

    fn write_function(&mut self, function: &FunctionDecl) {
        self.write_indent();
        self.output.push_str("function ");
        self.output.push_str(&function.name);
        self.output.push('(');
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(&param.name);
            self.output.push_str(": ");
            self.write_type(param.ty);
        }
        self.output.push(')');
        if let Some(ty) = function.return_type.filter(|_| self.options.return_types) {
            self.output.push_str(": ");
            self.write_type(ty);
        }
        self.output.push_str(" {\n");

        self.indent += 1;
        for stmt in &function.body {
            self.write_stmt(stmt);
        }
        self.indent -= 1;

        self.write_indent();
        self.output.push_str("}\n");
    }

    fn write_type(&mut self, ty: TypeAnnotation) {
        self.output.push_str(ty.keyword.as_str());
        if ty.array {
            self.output.push_str("[]");
        }
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        match stmt {
            Stmt::Const { name, ty, init } => {
                self.output.push_str("const ");
                self.output.push_str(name);
                if let Some(ty) = ty {
                    self.output.push_str(": ");
                    self.write_type(*ty);
                }
                self.output.push_str(" = ");
                self.write_expr(init);
            }
            Stmt::Return(value) => {
                self.output.push_str("return ");
                self.write_expr(value);
            }
        }
        self.output.push_str(";\n");
    }

    fn write_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(lit) => self.write_literal(lit),

            Expr::Ident(name) => self.output.push_str(name),

            Expr::Binary { left, op, right } => {
                self.write_operand(left, *op, false);
                self.output.push(' ');
                self.output.push_str(op.token());
                self.output.push(' ');
                self.write_operand(right, *op, true);
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.write_wrapped(test, matches!(**test, Expr::Conditional { .. }));
                self.output.push_str(" ? ");
                self.write_expr(consequent);
                self.output.push_str(" : ");
                self.write_expr(alternate);
            }

            Expr::Call { callee, args } => {
                self.write_object(callee);
                self.output.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.write_expr(arg);
                }
                self.output.push(')');
            }

            Expr::Member { object, property } => {
                self.write_object(object);
                self.output.push('.');
                self.output.push_str(property);
            }

            Expr::Index { object, index } => {
                self.write_object(object);
                self.output.push('[');
                self.write_expr(index);
                self.output.push(']');
            }
        }
    }

    /// Writes an operand of `parent`, adding parentheses only where
    /// precedence or associativity require them.
    fn write_operand(&mut self, expr: &Expr, parent: BinaryOp, is_right: bool) {
        let needs_parens = match expr {
            Expr::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (op.precedence() == parent.precedence()
                        && is_right != parent.is_right_associative())
            }
            Expr::Conditional { .. } => true,
            // `-2 ** x` is a syntax error.
            Expr::Literal(Literal::Number(n)) => {
                parent == BinaryOp::Exp && !is_right && n.is_sign_negative()
            }
            _ => false,
        };
        self.write_wrapped(expr, needs_parens);
    }

    /// Writes the object of a call, member or index expression.
    fn write_object(&mut self, expr: &Expr) {
        let needs_parens = matches!(
            expr,
            Expr::Binary { .. } | Expr::Conditional { .. } | Expr::Literal(Literal::Number(_))
        );
        self.write_wrapped(expr, needs_parens);
    }

    fn write_wrapped(&mut self, expr: &Expr, parens: bool) {
        if parens {
            self.output.push('(');
        }
        self.write_expr(expr);
        if parens {
            self.output.push(')');
        }
    }

    fn write_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Number(n) => self.output.push_str(&format_number(*n)),
            Literal::String(s) => {
                self.output.push('"');
                self.output.push_str(&escape_string(s));
                self.output.push('"');
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        n.to_string()
    }
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
