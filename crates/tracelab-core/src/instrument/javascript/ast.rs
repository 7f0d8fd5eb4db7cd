//! Syntax tree for the supported JavaScript subset.
//!
//! Every statement keeps the 1-based source line of its first token; that
//! line is what record calls report. `Stmt::Record` never comes out of the
//! parser, it is synthesized by the instrumentation walk.

#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Decl { kind: DeclKind, decls: Vec<Declarator> },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl {
        line: u32,
        kind: DeclKind,
        decls: Vec<Declarator>,
    },
    Expr {
        line: u32,
        expr: Expr,
    },
    If {
        line: u32,
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        line: u32,
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        line: u32,
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        line: u32,
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// Covers both `for..of` (`of: true`) and `for..in` (`of: false`).
    ForIn {
        line: u32,
        kind: Option<DeclKind>,
        name: String,
        of: bool,
        right: Expr,
        body: Box<Stmt>,
    },
    Function {
        line: u32,
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Return {
        line: u32,
        arg: Option<Expr>,
    },
    Break {
        line: u32,
    },
    Continue {
        line: u32,
    },
    Block {
        line: u32,
        body: Vec<Stmt>,
    },
    Empty {
        line: u32,
    },
    /// Synthesized snapshot call, never produced by the parser.
    Record {
        line: u32,
    },
}

impl Stmt {
    pub fn line(&self) -> u32 {
        match self {
            Stmt::VarDecl { line, .. }
            | Stmt::Expr { line, .. }
            | Stmt::If { line, .. }
            | Stmt::While { line, .. }
            | Stmt::DoWhile { line, .. }
            | Stmt::For { line, .. }
            | Stmt::ForIn { line, .. }
            | Stmt::Function { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Break { line }
            | Stmt::Continue { line }
            | Stmt::Block { line, .. }
            | Stmt::Empty { line }
            | Stmt::Record { line } => *line,
        }
    }
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Ident(String),
    /// Raw lexeme including quotes.
    Str(String),
    Number(String),
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// Raw lexeme, reproduced verbatim.
    Number(String),
    /// Raw lexeme including quotes.
    Str(String),
    /// Raw lexeme including backticks.
    Template(String),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(PropKey, Expr)>),
    Unary {
        op: &'static str,
        arg: Box<Expr>,
    },
    Update {
        op: &'static str,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: &'static str,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cond {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: &'static str,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
}
