//! Deterministic source emission for the instrumented tree.
//!
//! Literal lexemes are reproduced verbatim from the tokens; every compound
//! subexpression is parenthesized so the emitted program never depends on
//! re-deriving precedence. Formatting is fixed (4-space indent, one statement
//! per line) so instrumenting the same submission twice yields identical
//! bytes.

use super::ast::{ArrowBody, Declarator, Expr, ForInit, Program, PropKey, Stmt};

pub fn generate(program: &Program, snapshot: &str) -> String {
    let mut cg = Codegen {
        out: String::new(),
        indent: 0,
        snapshot: snapshot.to_string(),
    };
    for stmt in &program.body {
        cg.stmt(stmt);
    }
    cg.out
}

struct Codegen {
    out: String,
    indent: usize,
    snapshot: String,
}

impl Codegen {
    fn push_line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { kind, decls, .. } => {
                let rendered = decls
                    .iter()
                    .map(|d| self.declarator(d))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push_line(&format!("{} {};", kind.keyword(), rendered));
            }
            Stmt::Expr { expr, .. } => {
                let rendered = self.expr(expr);
                self.push_line(&format!("{};", rendered));
            }
            Stmt::Record { line } => {
                let call = format!("__record({}, {});", line, self.snapshot);
                self.push_line(&call);
            }
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                let test = self.expr(test);
                self.push_line(&format!("if ({}) {{", test));
                self.body(consequent);
                match alternate {
                    Some(alt) => {
                        self.push_line("} else {");
                        self.body(alt);
                        self.push_line("}");
                    }
                    None => self.push_line("}"),
                }
            }
            Stmt::While { test, body, .. } => {
                let test = self.expr(test);
                self.push_line(&format!("while ({}) {{", test));
                self.body(body);
                self.push_line("}");
            }
            Stmt::DoWhile { body, test, .. } => {
                self.push_line("do {");
                self.body(body);
                let test = self.expr(test);
                self.push_line(&format!("}} while ({});", test));
            }
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                let init = match init {
                    Some(ForInit::Decl { kind, decls }) => {
                        let rendered = decls
                            .iter()
                            .map(|d| self.declarator(d))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("{} {}", kind.keyword(), rendered)
                    }
                    Some(ForInit::Expr(expr)) => self.expr(expr),
                    None => String::new(),
                };
                let test = test.as_ref().map(|e| self.expr(e)).unwrap_or_default();
                let update = update.as_ref().map(|e| self.expr(e)).unwrap_or_default();
                self.push_line(&format!("for ({}; {}; {}) {{", init, test, update));
                self.body(body);
                self.push_line("}");
            }
            Stmt::ForIn {
                kind,
                name,
                of,
                right,
                body,
                ..
            } => {
                let head = match kind {
                    Some(kind) => format!("{} {}", kind.keyword(), name),
                    None => name.clone(),
                };
                let op = if *of { "of" } else { "in" };
                let right = self.expr(right);
                self.push_line(&format!("for ({} {} {}) {{", head, op, right));
                self.body(body);
                self.push_line("}");
            }
            Stmt::Function {
                name, params, body, ..
            } => {
                self.push_line(&format!("function {}({}) {{", name, params.join(", ")));
                self.indent += 1;
                for stmt in body {
                    self.stmt(stmt);
                }
                self.indent -= 1;
                self.push_line("}");
            }
            Stmt::Return { arg, .. } => match arg {
                Some(arg) => {
                    let rendered = self.expr(arg);
                    self.push_line(&format!("return {};", rendered));
                }
                None => self.push_line("return;"),
            },
            Stmt::Break { .. } => self.push_line("break;"),
            Stmt::Continue { .. } => self.push_line("continue;"),
            Stmt::Block { body, .. } => {
                self.push_line("{");
                self.indent += 1;
                for stmt in body {
                    self.stmt(stmt);
                }
                self.indent -= 1;
                self.push_line("}");
            }
            Stmt::Empty { .. } => self.push_line(";"),
        }
    }

    /// Emits a statement as the indented contents of a brace pair the caller
    /// has already opened. Block statements contribute their children
    /// directly so braces are never doubled.
    fn body(&mut self, stmt: &Stmt) {
        self.indent += 1;
        match stmt {
            Stmt::Block { body, .. } => {
                for child in body {
                    self.stmt(child);
                }
            }
            other => self.stmt(other),
        }
        self.indent -= 1;
    }

    fn declarator(&mut self, decl: &Declarator) -> String {
        match &decl.init {
            Some(init) => {
                let rendered = self.expr(init);
                format!("{} = {}", decl.name, rendered)
            }
            None => decl.name.clone(),
        }
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Number(raw) | Expr::Str(raw) | Expr::Template(raw) => raw.clone(),
            Expr::Bool(true) => "true".to_string(),
            Expr::Bool(false) => "false".to_string(),
            Expr::Null => "null".to_string(),
            Expr::Undefined => "undefined".to_string(),
            Expr::Ident(name) => name.clone(),
            Expr::Array(elements) => {
                let rendered = elements
                    .iter()
                    .map(|e| self.expr(e))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", rendered)
            }
            Expr::Object(props) => {
                let rendered = props
                    .iter()
                    .map(|(key, value)| {
                        let key = match key {
                            PropKey::Ident(name) => name.clone(),
                            PropKey::Str(raw) | PropKey::Number(raw) => raw.clone(),
                        };
                        let value = self.expr(value);
                        format!("{}: {}", key, value)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({{{}}})", rendered)
            }
            Expr::Unary { op, arg } => {
                let arg = self.expr(arg);
                if op.chars().all(|c| c.is_ascii_alphabetic()) {
                    format!("({} {})", op, arg)
                } else {
                    format!("({}{})", op, arg)
                }
            }
            Expr::Update { op, prefix, arg } => {
                let arg = self.expr(arg);
                if *prefix {
                    format!("({}{})", op, arg)
                } else {
                    format!("({}{})", arg, op)
                }
            }
            Expr::Binary { op, left, right } | Expr::Logical { op, left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                format!("({} {} {})", left, op, right)
            }
            Expr::Cond {
                test,
                consequent,
                alternate,
            } => {
                let test = self.expr(test);
                let consequent = self.expr(consequent);
                let alternate = self.expr(alternate);
                format!("({} ? {} : {})", test, consequent, alternate)
            }
            Expr::Assign { op, target, value } => {
                let target = self.expr(target);
                let value = self.expr(value);
                format!("({} {} {})", target, op, value)
            }
            Expr::Call { callee, args } => {
                let callee = self.expr(callee);
                let args = args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", callee, args)
            }
            Expr::New { callee, args } => {
                let callee = self.expr(callee);
                let args = args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("(new {}({}))", callee, args)
            }
            Expr::Member { object, property } => {
                let object = self.expr(object);
                format!("{}.{}", object, property)
            }
            Expr::Index { object, index } => {
                let object = self.expr(object);
                let index = self.expr(index);
                format!("{}[{}]", object, index)
            }
            Expr::Arrow { params, body } => match body {
                ArrowBody::Expr(expr) => {
                    let rendered = self.expr(expr);
                    format!("(({}) => {})", params.join(", "), rendered)
                }
                ArrowBody::Block(stmts) => {
                    let mut nested = Codegen {
                        out: String::new(),
                        indent: self.indent + 1,
                        snapshot: self.snapshot.clone(),
                    };
                    for stmt in stmts {
                        nested.stmt(stmt);
                    }
                    let closing = "    ".repeat(self.indent);
                    format!(
                        "(({}) => {{\n{}{}}})",
                        params.join(", "),
                        nested.out,
                        closing
                    )
                }
            },
        }
    }
}
