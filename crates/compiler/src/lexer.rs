//! Lexer for Rill source text
//!
//! Produces a flat token stream with 1-indexed source positions. The
//! lexer is the sole authority on lexical validity: malformed numbers,
//! unterminated strings, and stray characters are rejected here, before
//! the parser ever runs.

use std::fmt;

/// Token classification.
///
/// `==` and the relational operators get their own kinds; `=`, `!=`,
/// `!` and the arithmetic operators share the `Operator` kind and are
/// distinguished by lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    Str,
    Char,
    Operator,
    Equals,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
}

/// A token with source position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    /// True if this token is the given keyword.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lexeme == word
    }

    /// True if this token is the given operator lexeme.
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.lexeme == op
    }
}

/// Reserved words of the language
const KEYWORDS: &[&str] = &[
    "int", "float", "bool", "string", "char", "const", "if", "else", "while", "return", "true",
    "false",
];

/// Lexical error with source position
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexError {
    fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        LexError {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Tokenize a source string.
///
/// `// ...` comments run to end of line and are discarded. String and
/// char lexemes keep their surrounding quotes; downstream stages rely
/// on that shape.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut column = 1;

    while i < chars.len() {
        let c = chars[i];

        // Whitespace
        if c == '\n' {
            i += 1;
            line += 1;
            column = 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            column += 1;
            continue;
        }

        // Comments: // to end of line
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let start_column = column;

        // Numbers. A run of digits, dots, and identifier characters is
        // taken whole so that `123abc` and `3.14.15` are rejected as
        // malformed numbers instead of splitting into two tokens.
        if c.is_ascii_digit() {
            let mut lexeme = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.' || chars[i] == '_')
            {
                lexeme.push(chars[i]);
                i += 1;
                column += 1;
            }
            if !is_well_formed_number(&lexeme) {
                return Err(LexError::new(
                    format!("malformed number '{}'", lexeme),
                    line,
                    start_column,
                ));
            }
            tokens.push(Token::new(TokenKind::Number, lexeme, line, start_column));
            continue;
        }

        // Identifiers and keywords
        if c.is_alphabetic() || c == '_' {
            let mut lexeme = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                lexeme.push(chars[i]);
                i += 1;
                column += 1;
            }
            let kind = if KEYWORDS.contains(&lexeme.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::new(kind, lexeme, line, start_column));
            continue;
        }

        // String literals: "..." on a single line
        if c == '"' {
            let mut lexeme = String::from('"');
            i += 1;
            column += 1;
            loop {
                match chars.get(i) {
                    Some('"') => {
                        lexeme.push('"');
                        i += 1;
                        column += 1;
                        break;
                    }
                    Some('\n') | None => {
                        return Err(LexError::new(
                            "unterminated string literal",
                            line,
                            start_column,
                        ));
                    }
                    Some(&ch) => {
                        lexeme.push(ch);
                        i += 1;
                        column += 1;
                    }
                }
            }
            tokens.push(Token::new(TokenKind::Str, lexeme, line, start_column));
            continue;
        }

        // Char literals: 'c'
        if c == '\'' {
            let inner = chars.get(i + 1).copied();
            let close = chars.get(i + 2).copied();
            match (inner, close) {
                (Some(ch), Some('\'')) if ch != '\'' && ch != '\n' => {
                    let lexeme = format!("'{}'", ch);
                    i += 3;
                    column += 3;
                    tokens.push(Token::new(TokenKind::Char, lexeme, line, start_column));
                    continue;
                }
                _ => {
                    return Err(LexError::new(
                        "invalid character literal",
                        line,
                        start_column,
                    ));
                }
            }
        }

        // Operators and punctuation
        let next = chars.get(i + 1).copied();
        let (kind, lexeme, width) = match (c, next) {
            ('=', Some('=')) => (TokenKind::Equals, "==", 2),
            ('=', _) => (TokenKind::Operator, "=", 1),
            ('!', Some('=')) => (TokenKind::Operator, "!=", 2),
            ('!', _) => (TokenKind::Operator, "!", 1),
            ('<', Some('=')) => (TokenKind::LessEqual, "<=", 2),
            ('<', _) => (TokenKind::Less, "<", 1),
            ('>', Some('=')) => (TokenKind::GreaterEqual, ">=", 2),
            ('>', _) => (TokenKind::Greater, ">", 1),
            ('+', _) => (TokenKind::Operator, "+", 1),
            ('-', _) => (TokenKind::Operator, "-", 1),
            ('*', _) => (TokenKind::Operator, "*", 1),
            ('/', _) => (TokenKind::Operator, "/", 1),
            ('(', _) => (TokenKind::LParen, "(", 1),
            (')', _) => (TokenKind::RParen, ")", 1),
            ('{', _) => (TokenKind::LBrace, "{", 1),
            ('}', _) => (TokenKind::RBrace, "}", 1),
            (',', _) => (TokenKind::Comma, ",", 1),
            (';', _) => (TokenKind::Semicolon, ";", 1),
            _ => {
                return Err(LexError::new(
                    format!("unexpected character '{}'", c),
                    line,
                    start_column,
                ));
            }
        };
        tokens.push(Token::new(kind, lexeme, line, start_column));
        i += width;
        column += width;
    }

    Ok(tokens)
}

/// Digits, or digits with exactly one interior decimal point.
fn is_well_formed_number(text: &str) -> bool {
    if text.chars().all(|c| c.is_ascii_digit()) {
        return !text.is_empty();
    }
    let mut parts = text.splitn(2, '.');
    let (whole, frac) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
    !whole.is_empty()
        && !frac.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}
