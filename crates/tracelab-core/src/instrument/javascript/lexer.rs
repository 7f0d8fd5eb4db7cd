//! Tokenizer for the supported JavaScript subset.
//!
//! Tokens carry 1-based line numbers; literal tokens keep their raw source
//! text so code generation reproduces them byte-for-byte.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal, raw lexeme.
    Number(String),
    /// String literal, raw lexeme including quotes.
    Str(String),
    /// Template literal without interpolation, raw lexeme including backticks.
    Template(String),
    /// Identifier or keyword.
    Ident(String),
    /// Punctuator or operator.
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

/// Multi-character punctuators, longest first so maximal munch works.
const PUNCTUATORS: &[&str] = &[
    ">>>", "===", "!==", "**=", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "**", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "<<", ">>", "+", "-", "*", "/", "%", "<", ">", "=", "!", "?",
    ":", ";", ",", ".", "(", ")", "[", "]", "{", "}", "&", "|", "^", "~",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line: u32 = 1;

    while pos < bytes.len() {
        let c = bytes[pos] as char;

        if c == '\n' {
            line += 1;
            pos += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Line comment
        if c == '/' && bytes.get(pos + 1) == Some(&b'/') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        // Block comment
        if c == '/' && bytes.get(pos + 1) == Some(&b'*') {
            pos += 2;
            loop {
                if pos + 1 >= bytes.len() {
                    return Err(format!("line {}: unterminated block comment", line));
                }
                if bytes[pos] == b'\n' {
                    line += 1;
                }
                if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                    pos += 2;
                    break;
                }
                pos += 1;
            }
            continue;
        }

        // String literal
        if c == '"' || c == '\'' {
            let quote = bytes[pos];
            let start = pos;
            pos += 1;
            loop {
                if pos >= bytes.len() || bytes[pos] == b'\n' {
                    return Err(format!("line {}: unterminated string literal", line));
                }
                if bytes[pos] == b'\\' {
                    pos += 2;
                    continue;
                }
                if bytes[pos] == quote {
                    pos += 1;
                    break;
                }
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Str(source[start..pos].to_string()),
                line,
            });
            continue;
        }

        // Template literal, interpolation not supported
        if c == '`' {
            let start = pos;
            let start_line = line;
            pos += 1;
            loop {
                if pos >= bytes.len() {
                    return Err(format!("line {}: unterminated template literal", start_line));
                }
                if bytes[pos] == b'$' && bytes.get(pos + 1) == Some(&b'{') {
                    return Err(format!(
                        "line {}: template interpolation is not supported",
                        line
                    ));
                }
                if bytes[pos] == b'\n' {
                    line += 1;
                }
                if bytes[pos] == b'\\' {
                    pos += 2;
                    continue;
                }
                if bytes[pos] == b'`' {
                    pos += 1;
                    break;
                }
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Template(source[start..pos].to_string()),
                line: start_line,
            });
            continue;
        }

        // Number literal
        if c.is_ascii_digit() {
            let start = pos;
            if c == '0' && matches!(bytes.get(pos + 1), Some(b'x') | Some(b'X')) {
                pos += 2;
                while pos < bytes.len() && (bytes[pos] as char).is_ascii_hexdigit() {
                    pos += 1;
                }
            } else {
                while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                    pos += 1;
                }
                if bytes.get(pos) == Some(&b'.') {
                    pos += 1;
                    while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                        pos += 1;
                    }
                }
                if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
                    pos += 1;
                    if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) {
                        pos += 1;
                    }
                    while pos < bytes.len() && (bytes[pos] as char).is_ascii_digit() {
                        pos += 1;
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Number(source[start..pos].to_string()),
                line,
            });
            continue;
        }

        // Identifier or keyword
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let start = pos;
            while pos < bytes.len() {
                let ch = bytes[pos] as char;
                if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                    pos += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..pos].to_string()),
                line,
            });
            continue;
        }

        // Punctuator
        let rest = &source[pos..];
        match PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            Some(p) => {
                tokens.push(Token {
                    kind: TokenKind::Punct(p),
                    line,
                });
                pos += p.len();
            }
            None => return Err(format!("line {}: unexpected character '{}'", line, c)),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn operators_use_maximal_munch() {
        assert_eq!(
            kinds("a === b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("==="),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("++")[0], TokenKind::Punct("++"));
        assert_eq!(kinds(">>>")[0], TokenKind::Punct(">>>"));
    }

    #[test]
    fn literals_keep_raw_text() {
        assert_eq!(kinds("3.14")[0], TokenKind::Number("3.14".into()));
        assert_eq!(kinds("0xFF")[0], TokenKind::Number("0xFF".into()));
        assert_eq!(kinds(r#""a\"b""#)[0], TokenKind::Str(r#""a\"b""#.into()));
        assert_eq!(kinds("'x'")[0], TokenKind::Str("'x'".into()));
        assert_eq!(kinds("`hi`")[0], TokenKind::Template("`hi`".into()));
    }

    #[test]
    fn line_numbers_survive_comments_and_templates() {
        let tokens = tokenize("// one\n/* two\nthree */\nfoo").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("foo".into()));
        assert_eq!(tokens[0].line, 4);
    }

    #[test]
    fn interpolation_and_unterminated_strings_are_errors() {
        assert!(tokenize("`a${b}`").is_err());
        assert!(tokenize("\"abc").is_err());
        assert!(tokenize("/* open").is_err());
    }
}
