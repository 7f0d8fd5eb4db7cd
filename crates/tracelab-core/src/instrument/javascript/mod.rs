//! AST-based instrumentation pass for JavaScript.
//!
//! The submission is parsed, record calls are woven between statements, and
//! the whole program is re-emitted behind a small tracer prelude. A record
//! call snapshots every declared variable through `__probe`, which turns
//! reads of not-yet-initialized bindings into `undefined` instead of a
//! `ReferenceError`. The instrumented process writes the finished step array
//! as its entire standard output.
//!
//! Placement rules: one record call after every non-declaration statement in
//! a statement list, plus one at the top of each loop body so every
//! iteration is observed on entry. Statement lists include function and
//! arrow bodies wherever they appear in an expression. Loop bodies are
//! normalized to blocks first; `if` branches are only instrumented when the
//! submission already braced them.

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;

use super::{InstrumentError, InstrumentationPass, InstrumentedProgram};
use ast::{ArrowBody, Expr, ForInit, Program, Stmt};

/// File name the instrumented program is written under.
pub const PROGRAM_FILE: &str = "program.js";

const PRELUDE: &str = r#"const __trace = [];
const __start = Date.now();
function __probe(read) {
    try {
        return read();
    } catch (err) {
        return undefined;
    }
}
function __record(line, state) {
    if (Date.now() - __start > __BUDGET__) {
        return;
    }
    const frozen = {};
    for (const key in state) {
        if (state[key] === undefined) {
            continue;
        }
        try {
            frozen[key] = JSON.parse(JSON.stringify(state[key]));
        } catch (err) {
            frozen[key] = "[Complex Data]";
        }
    }
    __trace.push({ line: line, variables: frozen, stdout: "" });
}
console.log = function () {
    const text = Array.prototype.map.call(arguments, String).join(" ") + "\n";
    if (__trace.length > 0) {
        __trace[__trace.length - 1].stdout += text;
    }
};
"#;

pub struct JsAstPass {
    trace_budget_ms: u64,
}

impl JsAstPass {
    /// `trace_budget_ms` caps how long the tracer keeps recording; past the
    /// budget the program still runs but records nothing further.
    pub fn new(trace_budget_ms: u64) -> Self {
        Self { trace_budget_ms }
    }
}

impl InstrumentationPass for JsAstPass {
    fn instrument(&self, source: &str) -> Result<InstrumentedProgram, InstrumentError> {
        let mut program = parser::parse(source)?;

        let names = collect_declared_names(&program);
        let snapshot = build_snapshot(&names);

        instrument_block(&mut program.body);

        let body = codegen::generate(&program, &snapshot);
        let mut out = PRELUDE.replace("__BUDGET__", &self.trace_budget_ms.to_string());
        out.push_str("try {\n");
        out.push_str(&body);
        out.push_str("} catch (err) {\n}\n");
        out.push_str("process.stdout.write(JSON.stringify(__trace));\n");

        Ok(InstrumentedProgram {
            source: out,
            file_name: PROGRAM_FILE.to_string(),
        })
    }
}

/// The snapshot expression inlined at every record site. Reads happen in the
/// lexical scope of the site, so whatever is visible there is captured.
fn build_snapshot(names: &[String]) -> String {
    if names.is_empty() {
        return "{}".to_string();
    }
    let probes = names
        .iter()
        .map(|name| format!("{}: __probe(() => {})", name, name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{ {} }}", probes)
}

/// Declared variable names across the whole program, first occurrence first.
/// Function names and parameters are not snapshotted.
fn collect_declared_names(program: &Program) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &program.body {
        collect_stmt(stmt, &mut names);
    }
    names
}

fn push_name(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

fn collect_stmt(stmt: &Stmt, names: &mut Vec<String>) {
    match stmt {
        Stmt::VarDecl { decls, .. } => {
            for decl in decls {
                push_name(names, &decl.name);
                if let Some(init) = &decl.init {
                    collect_expr(init, names);
                }
            }
        }
        Stmt::Expr { expr, .. } => collect_expr(expr, names),
        Stmt::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            collect_expr(test, names);
            collect_stmt(consequent, names);
            if let Some(alt) = alternate {
                collect_stmt(alt, names);
            }
        }
        Stmt::While { test, body, .. } | Stmt::DoWhile { test, body, .. } => {
            collect_expr(test, names);
            collect_stmt(body, names);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            match init {
                Some(ForInit::Decl { decls, .. }) => {
                    for decl in decls {
                        push_name(names, &decl.name);
                        if let Some(init) = &decl.init {
                            collect_expr(init, names);
                        }
                    }
                }
                Some(ForInit::Expr(expr)) => collect_expr(expr, names),
                None => {}
            }
            if let Some(test) = test {
                collect_expr(test, names);
            }
            if let Some(update) = update {
                collect_expr(update, names);
            }
            collect_stmt(body, names);
        }
        Stmt::ForIn {
            name, right, body, ..
        } => {
            push_name(names, name);
            collect_expr(right, names);
            collect_stmt(body, names);
        }
        Stmt::Function { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, names);
            }
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                collect_stmt(stmt, names);
            }
        }
        Stmt::Return { arg: Some(arg), .. } => collect_expr(arg, names),
        _ => {}
    }
}

/// Declarations can hide anywhere an expression can: inside arrow bodies
/// passed as call arguments, nested in assignments, conditionals, array and
/// object literals. Walk every child.
fn collect_expr(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::Array(items) => {
            for item in items {
                collect_expr(item, names);
            }
        }
        Expr::Object(props) => {
            for (_, value) in props {
                collect_expr(value, names);
            }
        }
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => collect_expr(arg, names),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            collect_expr(left, names);
            collect_expr(right, names);
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            collect_expr(test, names);
            collect_expr(consequent, names);
            collect_expr(alternate, names);
        }
        Expr::Assign { target, value, .. } => {
            collect_expr(target, names);
            collect_expr(value, names);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            collect_expr(callee, names);
            for arg in args {
                collect_expr(arg, names);
            }
        }
        Expr::Member { object, .. } => collect_expr(object, names),
        Expr::Index { object, index } => {
            collect_expr(object, names);
            collect_expr(index, names);
        }
        Expr::Arrow { body, .. } => match body {
            ArrowBody::Expr(expr) => collect_expr(expr, names),
            ArrowBody::Block(stmts) => {
                for stmt in stmts {
                    collect_stmt(stmt, names);
                }
            }
        },
        _ => {}
    }
}

/// Rewrites a statement list in place: each statement is followed by a
/// record call carrying its line, except declarations, whose effect is
/// visible at the next recorded step anyway.
fn instrument_block(body: &mut Vec<Stmt>) {
    let original = std::mem::take(body);
    let mut rewritten = Vec::with_capacity(original.len() * 2);
    for mut stmt in original {
        instrument_stmt(&mut stmt);
        let line = stmt.line();
        let is_decl = matches!(stmt, Stmt::VarDecl { .. });
        rewritten.push(stmt);
        if !is_decl {
            rewritten.push(Stmt::Record { line });
        }
    }
    *body = rewritten;
}

fn instrument_stmt(stmt: &mut Stmt) {
    match stmt {
        Stmt::Block { body, .. } | Stmt::Function { body, .. } => instrument_block(body),
        Stmt::VarDecl { decls, .. } => {
            for decl in decls {
                if let Some(init) = &mut decl.init {
                    instrument_expr(init);
                }
            }
        }
        Stmt::Expr { expr, .. } => instrument_expr(expr),
        Stmt::Return { arg: Some(arg), .. } => instrument_expr(arg),
        Stmt::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            instrument_expr(test);
            instrument_stmt(consequent);
            if let Some(alt) = alternate {
                instrument_stmt(alt);
            }
        }
        Stmt::While { line, test, body } | Stmt::DoWhile { line, body, test } => {
            instrument_expr(test);
            instrument_loop_body(*line, body);
        }
        Stmt::For {
            line,
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Decl { decls, .. }) => {
                    for decl in decls {
                        if let Some(init) = &mut decl.init {
                            instrument_expr(init);
                        }
                    }
                }
                Some(ForInit::Expr(expr)) => instrument_expr(expr),
                None => {}
            }
            if let Some(test) = test {
                instrument_expr(test);
            }
            if let Some(update) = update {
                instrument_expr(update);
            }
            instrument_loop_body(*line, body);
        }
        Stmt::ForIn {
            line, right, body, ..
        } => {
            instrument_expr(right);
            instrument_loop_body(*line, body);
        }
        _ => {}
    }
}

/// Arrow function blocks are statement lists like any other; declarations
/// inside them are observed the same way top-level ones are.
fn instrument_expr(expr: &mut Expr) {
    match expr {
        Expr::Array(items) => {
            for item in items {
                instrument_expr(item);
            }
        }
        Expr::Object(props) => {
            for (_, value) in props {
                instrument_expr(value);
            }
        }
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => instrument_expr(arg),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            instrument_expr(left);
            instrument_expr(right);
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            instrument_expr(test);
            instrument_expr(consequent);
            instrument_expr(alternate);
        }
        Expr::Assign { target, value, .. } => {
            instrument_expr(target);
            instrument_expr(value);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            instrument_expr(callee);
            for arg in args {
                instrument_expr(arg);
            }
        }
        Expr::Member { object, .. } => instrument_expr(object),
        Expr::Index { object, index } => {
            instrument_expr(object);
            instrument_expr(index);
        }
        Expr::Arrow { body, .. } => match body {
            ArrowBody::Expr(expr) => instrument_expr(expr),
            ArrowBody::Block(stmts) => instrument_block(stmts),
        },
        _ => {}
    }
}

fn instrument_loop_body(header_line: u32, body: &mut Box<Stmt>) {
    blockify(body);
    if let Stmt::Block { body: inner, .. } = body.as_mut() {
        instrument_block(inner);
        inner.insert(0, Stmt::Record { line: header_line });
    }
}

/// Single-statement loop bodies are wrapped in a block so the per-iteration
/// record call has somewhere to live.
fn blockify(body: &mut Box<Stmt>) {
    if !matches!(body.as_ref(), Stmt::Block { .. }) {
        let line = body.line();
        let inner = std::mem::replace(body.as_mut(), Stmt::Empty { line });
        *body.as_mut() = Stmt::Block {
            line,
            body: vec![inner],
        };
    }
}
