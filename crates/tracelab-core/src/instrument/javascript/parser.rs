//! Recursive-descent parser for the supported JavaScript subset.
//!
//! Statements are parsed by keyword dispatch; expressions use binding-power
//! climbing. Semicolons are optional after statements, which approximates
//! automatic semicolon insertion closely enough for short learner programs.
//! Anything outside the subset (classes, destructuring, template
//! interpolation, async) is a syntax error, which callers degrade to an
//! empty trace.

use super::super::InstrumentError;
use super::ast::{ArrowBody, DeclKind, Declarator, Expr, ForInit, Program, PropKey, Stmt};
use super::lexer::{tokenize, Token, TokenKind};

/// Words that can never be plain identifiers.
const KEYWORDS: &[&str] = &[
    "var", "let", "const", "if", "else", "while", "do", "for", "function", "return", "break",
    "continue", "true", "false", "null", "undefined", "typeof", "new", "in", "class", "switch",
    "case", "default", "throw", "try", "catch", "finally", "delete", "void", "this", "async",
    "await", "yield",
];

enum InfixKind {
    Binary,
    BinaryRight,
    Logical,
    Assign,
    Cond,
}

/// Left binding power per infix operator. Right-associative operators reuse
/// the same power on the right-hand side; left-associative ones add one.
fn infix_bp(op: &str) -> Option<(u8, InfixKind)> {
    let entry = match op {
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "**=" => (2, InfixKind::Assign),
        "?" => (4, InfixKind::Cond),
        "||" | "??" => (6, InfixKind::Logical),
        "&&" => (7, InfixKind::Logical),
        "|" => (8, InfixKind::Binary),
        "^" => (9, InfixKind::Binary),
        "&" => (10, InfixKind::Binary),
        "==" | "!=" | "===" | "!==" => (11, InfixKind::Binary),
        "<" | ">" | "<=" | ">=" => (12, InfixKind::Binary),
        "<<" | ">>" | ">>>" => (13, InfixKind::Binary),
        "+" | "-" => (14, InfixKind::Binary),
        "*" | "/" | "%" => (15, InfixKind::Binary),
        "**" => (16, InfixKind::BinaryRight),
        _ => return None,
    };
    Some(entry)
}

const UNARY_BP: u8 = 17;
const ASSIGN_BP: u8 = 2;

pub fn parse(source: &str) -> Result<Program, InstrumentError> {
    let tokens = tokenize(source).map_err(InstrumentError::Syntax)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_program(&mut self) -> Result<Program, InstrumentError> {
        let mut body = Vec::new();
        while !matches!(self.peek().kind, TokenKind::Eof) {
            body.push(self.parse_stmt()?);
        }
        Ok(Program { body })
    }

    // ---- token plumbing ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn line(&self) -> u32 {
        self.peek().line
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_punct(&self, p: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.at_punct(p) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), InstrumentError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", p)))
        }
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> Result<String, InstrumentError> {
        match &self.peek().kind {
            TokenKind::Ident(name) if !KEYWORDS.contains(&name.as_str()) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn error(&self, message: &str) -> InstrumentError {
        let found = match &self.peek().kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::Number(raw) | TokenKind::Str(raw) | TokenKind::Template(raw) => {
                format!("'{}'", raw)
            }
        };
        InstrumentError::Syntax(format!("line {}: {}, found {}", self.line(), message, found))
    }

    /// Semicolons are optional statement terminators.
    fn semicolon(&mut self) {
        self.eat_punct(";");
    }

    // ---- statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, InstrumentError> {
        let line = self.line();
        if self.at_punct(";") {
            self.bump();
            return Ok(Stmt::Empty { line });
        }
        if self.at_punct("{") {
            return self.parse_block();
        }
        if self.at_kw("var") || self.at_kw("let") || self.at_kw("const") {
            let (kind, decls) = self.parse_var_decl()?;
            self.semicolon();
            return Ok(Stmt::VarDecl { line, kind, decls });
        }
        if self.eat_kw("if") {
            self.expect_punct("(")?;
            let test = self.parse_expr(0)?;
            self.expect_punct(")")?;
            let consequent = Box::new(self.parse_stmt()?);
            let alternate = if self.eat_kw("else") {
                Some(Box::new(self.parse_stmt()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                line,
                test,
                consequent,
                alternate,
            });
        }
        if self.eat_kw("while") {
            self.expect_punct("(")?;
            let test = self.parse_expr(0)?;
            self.expect_punct(")")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::While { line, test, body });
        }
        if self.eat_kw("do") {
            let body = Box::new(self.parse_stmt()?);
            if !self.eat_kw("while") {
                return Err(self.error("expected 'while' after do body"));
            }
            self.expect_punct("(")?;
            let test = self.parse_expr(0)?;
            self.expect_punct(")")?;
            self.semicolon();
            return Ok(Stmt::DoWhile { line, body, test });
        }
        if self.eat_kw("for") {
            return self.parse_for(line);
        }
        if self.eat_kw("function") {
            let name = self.expect_ident()?;
            let params = self.parse_params()?;
            let body = self.parse_block_body()?;
            return Ok(Stmt::Function {
                line,
                name,
                params,
                body,
            });
        }
        if self.eat_kw("return") {
            let arg = if self.at_punct(";")
                || self.at_punct("}")
                || matches!(self.peek().kind, TokenKind::Eof)
            {
                None
            } else {
                Some(self.parse_expr(0)?)
            };
            self.semicolon();
            return Ok(Stmt::Return { line, arg });
        }
        if self.eat_kw("break") {
            self.semicolon();
            return Ok(Stmt::Break { line });
        }
        if self.eat_kw("continue") {
            self.semicolon();
            return Ok(Stmt::Continue { line });
        }

        let expr = self.parse_expr(0)?;
        self.semicolon();
        Ok(Stmt::Expr { line, expr })
    }

    fn parse_block(&mut self) -> Result<Stmt, InstrumentError> {
        let line = self.line();
        let body = self.parse_block_body()?;
        Ok(Stmt::Block { line, body })
    }

    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, InstrumentError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.at_punct("}") {
            if matches!(self.peek().kind, TokenKind::Eof) {
                return Err(self.error("unclosed block"));
            }
            body.push(self.parse_stmt()?);
        }
        self.bump();
        Ok(body)
    }

    fn decl_kind(&mut self) -> Option<DeclKind> {
        let kind = if self.at_kw("var") {
            DeclKind::Var
        } else if self.at_kw("let") {
            DeclKind::Let
        } else if self.at_kw("const") {
            DeclKind::Const
        } else {
            return None;
        };
        self.bump();
        Some(kind)
    }

    fn parse_var_decl(&mut self) -> Result<(DeclKind, Vec<Declarator>), InstrumentError> {
        let kind = match self.decl_kind() {
            Some(kind) => kind,
            None => return Err(self.error("expected declaration keyword")),
        };
        let mut decls = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.eat_punct("=") {
                Some(self.parse_expr(ASSIGN_BP)?)
            } else {
                None
            };
            decls.push(Declarator { name, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok((kind, decls))
    }

    fn parse_for(&mut self, line: u32) -> Result<Stmt, InstrumentError> {
        self.expect_punct("(")?;

        // Declaration-style init may turn out to be a for-of/for-in head.
        if let Some(kind) = self.decl_kind() {
            let name = self.expect_ident()?;
            if self.at_kw("of") || self.at_kw("in") {
                let of = self.eat_kw("of") || {
                    self.bump();
                    false
                };
                let right = self.parse_expr(0)?;
                self.expect_punct(")")?;
                let body = Box::new(self.parse_stmt()?);
                return Ok(Stmt::ForIn {
                    line,
                    kind: Some(kind),
                    name,
                    of,
                    right,
                    body,
                });
            }

            let mut decls = Vec::new();
            let init = if self.eat_punct("=") {
                Some(self.parse_expr(ASSIGN_BP)?)
            } else {
                None
            };
            decls.push(Declarator { name, init });
            while self.eat_punct(",") {
                let name = self.expect_ident()?;
                let init = if self.eat_punct("=") {
                    Some(self.parse_expr(ASSIGN_BP)?)
                } else {
                    None
                };
                decls.push(Declarator { name, init });
            }
            self.expect_punct(";")?;
            return self.parse_for_tail(line, Some(ForInit::Decl { kind, decls }));
        }

        if self.eat_punct(";") {
            return self.parse_for_tail(line, None);
        }

        let expr = self.parse_expr(0)?;
        if self.at_kw("of") || self.at_kw("in") {
            let name = match expr {
                Expr::Ident(name) => name,
                _ => return Err(self.error("for-of target must be an identifier")),
            };
            let of = self.eat_kw("of") || {
                self.bump();
                false
            };
            let right = self.parse_expr(0)?;
            self.expect_punct(")")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::ForIn {
                line,
                kind: None,
                name,
                of,
                right,
                body,
            });
        }
        self.expect_punct(";")?;
        self.parse_for_tail(line, Some(ForInit::Expr(expr)))
    }

    fn parse_for_tail(
        &mut self,
        line: u32,
        init: Option<ForInit>,
    ) -> Result<Stmt, InstrumentError> {
        let test = if self.at_punct(";") {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect_punct(";")?;
        let update = if self.at_punct(")") {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For {
            line,
            init,
            test,
            update,
            body,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<String>, InstrumentError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        if !self.at_punct(")") {
            loop {
                params.push(self.expect_ident()?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok(params)
    }

    // ---- expressions ----

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, InstrumentError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            // Postfix forms bind tighter than any infix operator.
            if self.at_punct("(") {
                let args = self.parse_args()?;
                lhs = Expr::Call {
                    callee: Box::new(lhs),
                    args,
                };
                continue;
            }
            if self.eat_punct(".") {
                let property = match &self.peek().kind {
                    TokenKind::Ident(name) => name.clone(),
                    _ => return Err(self.error("expected property name")),
                };
                self.bump();
                lhs = Expr::Member {
                    object: Box::new(lhs),
                    property,
                };
                continue;
            }
            if self.eat_punct("[") {
                let index = self.parse_expr(0)?;
                self.expect_punct("]")?;
                lhs = Expr::Index {
                    object: Box::new(lhs),
                    index: Box::new(index),
                };
                continue;
            }
            if self.at_punct("++") || self.at_punct("--") {
                let op = if self.at_punct("++") { "++" } else { "--" };
                self.bump();
                lhs = Expr::Update {
                    op,
                    prefix: false,
                    arg: Box::new(lhs),
                };
                continue;
            }

            let op = match &self.peek().kind {
                TokenKind::Punct(p) => *p,
                _ => break,
            };
            let (lbp, kind) = match infix_bp(op) {
                Some(entry) => entry,
                None => break,
            };
            if lbp < min_bp {
                break;
            }
            self.bump();

            lhs = match kind {
                InfixKind::Binary => Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(self.parse_expr(lbp + 1)?),
                },
                InfixKind::BinaryRight => Expr::Binary {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(self.parse_expr(lbp)?),
                },
                InfixKind::Logical => Expr::Logical {
                    op,
                    left: Box::new(lhs),
                    right: Box::new(self.parse_expr(lbp + 1)?),
                },
                InfixKind::Assign => {
                    if !matches!(lhs, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
                        return Err(self.error("invalid assignment target"));
                    }
                    Expr::Assign {
                        op,
                        target: Box::new(lhs),
                        value: Box::new(self.parse_expr(lbp)?),
                    }
                }
                InfixKind::Cond => {
                    let consequent = self.parse_expr(0)?;
                    self.expect_punct(":")?;
                    let alternate = self.parse_expr(lbp - 1)?;
                    Expr::Cond {
                        test: Box::new(lhs),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    }
                }
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, InstrumentError> {
        match self.peek().kind.clone() {
            TokenKind::Number(raw) => {
                self.bump();
                Ok(Expr::Number(raw))
            }
            TokenKind::Str(raw) => {
                self.bump();
                Ok(Expr::Str(raw))
            }
            TokenKind::Template(raw) => {
                self.bump();
                Ok(Expr::Template(raw))
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => {
                    self.bump();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.bump();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.bump();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.bump();
                    Ok(Expr::Undefined)
                }
                "typeof" => {
                    self.bump();
                    Ok(Expr::Unary {
                        op: "typeof",
                        arg: Box::new(self.parse_expr(UNARY_BP)?),
                    })
                }
                "new" => {
                    self.bump();
                    self.parse_new()
                }
                _ if KEYWORDS.contains(&name.as_str()) => Err(self.error("unexpected keyword")),
                _ => {
                    self.bump();
                    // Single-parameter arrow without parentheses.
                    if self.eat_punct("=>") {
                        let body = self.parse_arrow_body()?;
                        Ok(Expr::Arrow {
                            params: vec![name],
                            body,
                        })
                    } else {
                        Ok(Expr::Ident(name))
                    }
                }
            },
            TokenKind::Punct("(") => {
                if self.arrow_params_ahead() {
                    self.bump();
                    let mut params = Vec::new();
                    if !self.at_punct(")") {
                        loop {
                            params.push(self.expect_ident()?);
                            if !self.eat_punct(",") {
                                break;
                            }
                        }
                    }
                    self.expect_punct(")")?;
                    self.expect_punct("=>")?;
                    let body = self.parse_arrow_body()?;
                    Ok(Expr::Arrow { params, body })
                } else {
                    self.bump();
                    let inner = self.parse_expr(0)?;
                    self.expect_punct(")")?;
                    Ok(inner)
                }
            }
            TokenKind::Punct("[") => {
                self.bump();
                let mut elements = Vec::new();
                if !self.at_punct("]") {
                    loop {
                        elements.push(self.parse_expr(ASSIGN_BP)?);
                        if !self.eat_punct(",") {
                            break;
                        }
                        if self.at_punct("]") {
                            break;
                        }
                    }
                }
                self.expect_punct("]")?;
                Ok(Expr::Array(elements))
            }
            TokenKind::Punct("{") => self.parse_object(),
            TokenKind::Punct(op @ ("!" | "~" | "+" | "-")) => {
                self.bump();
                Ok(Expr::Unary {
                    op,
                    arg: Box::new(self.parse_expr(UNARY_BP)?),
                })
            }
            TokenKind::Punct(op @ ("++" | "--")) => {
                self.bump();
                Ok(Expr::Update {
                    op,
                    prefix: true,
                    arg: Box::new(self.parse_expr(UNARY_BP)?),
                })
            }
            _ => Err(self.error("expected expression")),
        }
    }

    fn parse_new(&mut self) -> Result<Expr, InstrumentError> {
        let mut callee = Expr::Ident(self.expect_ident()?);
        loop {
            if self.eat_punct(".") {
                let property = match &self.peek().kind {
                    TokenKind::Ident(name) => name.clone(),
                    _ => return Err(self.error("expected property name")),
                };
                self.bump();
                callee = Expr::Member {
                    object: Box::new(callee),
                    property,
                };
            } else {
                break;
            }
        }
        let args = if self.at_punct("(") {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, InstrumentError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        if !self.at_punct(")") {
            loop {
                args.push(self.parse_expr(ASSIGN_BP)?);
                if !self.eat_punct(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok(args)
    }

    fn parse_object(&mut self) -> Result<Expr, InstrumentError> {
        self.expect_punct("{")?;
        let mut props = Vec::new();
        while !self.at_punct("}") {
            let key = match self.peek().kind.clone() {
                TokenKind::Ident(name) => {
                    self.bump();
                    PropKey::Ident(name)
                }
                TokenKind::Str(raw) => {
                    self.bump();
                    PropKey::Str(raw)
                }
                TokenKind::Number(raw) => {
                    self.bump();
                    PropKey::Number(raw)
                }
                _ => return Err(self.error("expected property key")),
            };
            let value = if self.eat_punct(":") {
                self.parse_expr(ASSIGN_BP)?
            } else {
                // Shorthand property.
                match &key {
                    PropKey::Ident(name) => Expr::Ident(name.clone()),
                    _ => return Err(self.error("expected ':' after property key")),
                }
            };
            props.push((key, value));
            if !self.eat_punct(",") {
                break;
            }
        }
        self.expect_punct("}")?;
        Ok(Expr::Object(props))
    }

    fn parse_arrow_body(&mut self) -> Result<ArrowBody, InstrumentError> {
        if self.at_punct("{") {
            Ok(ArrowBody::Block(self.parse_block_body()?))
        } else {
            Ok(ArrowBody::Expr(Box::new(self.parse_expr(ASSIGN_BP)?)))
        }
    }

    /// Distinguishes arrow parameter lists from parenthesized expressions by
    /// scanning ahead for `) =>` at matching depth.
    fn arrow_params_ahead(&self) -> bool {
        let mut depth = 1usize;
        let mut i = self.pos + 1;
        while i < self.tokens.len() {
            match &self.tokens[i].kind {
                TokenKind::Punct("(") => depth += 1,
                TokenKind::Punct(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Punct("=>"))
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let program = parse("x = 1 + 2 * 3;").unwrap();
        let expr = match &program.body[0] {
            Stmt::Expr { expr, .. } => expr,
            other => panic!("unexpected statement {:?}", other),
        };
        match expr {
            Expr::Assign { value, .. } => match value.as_ref() {
                Expr::Binary { op: "+", right, .. } => {
                    assert!(matches!(right.as_ref(), Expr::Binary { op: "*", .. }));
                }
                other => panic!("unexpected value {:?}", other),
            },
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target_is_rejected() {
        assert!(parse("1 = 2;").is_err());
        assert!(parse("a + b = 2;").is_err());
    }

    #[test]
    fn for_of_head_is_recognized() {
        let program = parse("for (let item of items) {}").unwrap();
        match &program.body[0] {
            Stmt::ForIn { kind, name, of, .. } => {
                assert_eq!(*kind, Some(DeclKind::Let));
                assert_eq!(name, "item");
                assert!(of);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn arrow_functions_parse_in_both_forms() {
        assert!(parse("const f = (a, b) => a + b;").is_ok());
        assert!(parse("const g = x => { return x * 2; };").is_ok());
        // Plain parenthesized expression still works.
        assert!(parse("let y = (1 + 2) * 3;").is_ok());
    }

    #[test]
    fn missing_semicolons_are_tolerated() {
        let program = parse("let a = 1\nlet b = 2\nconsole.log(a + b)").unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn statement_lines_come_from_first_token() {
        let program = parse("let a = 1;\n\nwhile (a < 3) {\n  a++;\n}").unwrap();
        assert_eq!(program.body[0].line(), 1);
        assert_eq!(program.body[1].line(), 3);
    }

    #[test]
    fn unsupported_constructs_are_syntax_errors() {
        assert!(parse("class Foo {}").is_err());
        assert!(parse("let [a, b] = pair;").is_err());
        assert!(parse("if (x").is_err());
    }
}
