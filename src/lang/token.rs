use std::fmt;

/// One lexical unit of calculator input
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Always finite once the lexer hands it out
    Number(f64),
    Ident(String),
    /// `let`, matched case-insensitively
    Let,
    /// `=`
    Assign,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `(`
    LParen,
    /// `)`
    RParen,
    Eof,
    /// Human readable description of what went wrong
    Error(String),
}

impl Token {
    /// Map a single punctuation character to its token
    pub fn from_punct(c: char) -> Option<Token> {
        let tok = match c {
            '*' => Token::Multiply,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Divide,
            '=' => Token::Assign,
            '(' => Token::LParen,
            ')' => Token::RParen,
            _ => return None,
        };

        Some(tok)
    }

    /// Whether this token can be the last token of an operand
    ///
    /// A `-` following one of these is always the binary operator.
    pub fn ends_operand(&self) -> bool {
        matches!(self, Token::Number(_) | Token::Ident(_) | Token::RParen)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Let => write!(f, "let"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Multiply => write!(f, "*"),
            Token::Divide => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "EOF"),
            Token::Error(msg) => write!(f, "{}", msg),
        }
    }
}

#[test]
fn test_display() {
    let tests = vec![
        (Token::Number(3.0), "3"),
        (Token::Number(-0.5), "-0.5"),
        (Token::Ident("foo".to_string()), "foo"),
        (Token::Let, "let"),
        (Token::Assign, "="),
        (Token::Divide, "/"),
        (Token::Eof, "EOF"),
        (Token::Error("bad".to_string()), "bad"),
    ];

    for (tok, expected) in tests {
        assert_eq!(tok.to_string(), expected);
    }
}

#[test]
fn test_from_punct() {
    assert_eq!(Token::from_punct('('), Some(Token::LParen));
    assert_eq!(Token::from_punct('-'), Some(Token::Minus));
    assert_eq!(Token::from_punct('$'), None);
    assert_eq!(Token::from_punct(';'), None);
}
