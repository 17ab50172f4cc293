//! Tokenizer for calculator input.
//!
//! The whole input is tokenized up front; inputs are a single line or two so there is nothing to
//! be gained from streaming. Errors are not raised here. Malformed input becomes a
//! `Token::Error` in the stream and the evaluator reports it when it reaches that token.
//!
//! A `-` is folded into a numeric literal when it is directly followed by a digit or `.` and the
//! previous token does not end an operand. So `-3` is one literal, `3-3` is a subtraction and
//! `3--3` subtracts `-3`.

use crate::lang::token::Token;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Last token handed out, used to tell a negative literal from subtraction
    prev: Option<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            prev: None,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn lookahead(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn starts_number(&self, c: char) -> bool {
        if c.is_ascii_digit() || c == '.' {
            return true;
        }

        if c != '-' || self.prev.as_ref().map_or(false, Token::ends_operand) {
            return false;
        }

        matches!(self.lookahead(), Some(d) if d.is_ascii_digit() || d == '.')
    }

    fn scan_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let start = self.position;
        while let Some(c) = self.current() {
            if !pred(c) {
                break;
            }
            self.position += 1;
        }

        self.input[start..self.position].iter().collect()
    }

    fn scan_number(&mut self) -> Token {
        let start = self.position;
        if self.current() == Some('-') {
            self.position += 1;
        }
        self.scan_while(|c| c.is_ascii_digit() || c == '.');

        let text: String = self.input[start..self.position].iter().collect();
        parse_number(&text)
    }

    fn scan_ident(&mut self) -> Token {
        let text = self.scan_while(char::is_alphabetic);
        if text.eq_ignore_ascii_case("let") {
            Token::Let
        } else {
            Token::Ident(text)
        }
    }

    /// Return the next token, or `Token::Eof` forever once input is exhausted
    pub fn next_token(&mut self) -> Token {
        let tok = loop {
            let c = match self.current() {
                Some(c) => c,
                None => break Token::Eof,
            };

            if matches!(c, ' ' | '\t' | '\r' | '\n' | ';') {
                self.position += 1;
                continue;
            }

            if self.starts_number(c) {
                break self.scan_number();
            }

            if let Some(tok) = Token::from_punct(c) {
                self.position += 1;
                break tok;
            }

            if c.is_alphabetic() {
                break self.scan_ident();
            }

            // Always step past the offending character so lexing makes progress
            self.position += 1;
            break Token::Error(format!("unknown character {}", c));
        };

        self.prev = Some(tok.clone());
        tok
    }
}

/// Validate and convert the text of a numeric literal
pub fn parse_number(text: &str) -> Token {
    if text.matches('.').count() > 1 {
        return Token::Error(format!("too many periods in '{}'", text));
    }

    if text.rfind('-').map_or(false, |idx| idx > 0) {
        return Token::Error(format!(
            "- can only appear at the start of a number, found: {}",
            text
        ));
    }

    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Token::Number(n),
        Ok(_) => Token::Error(format!("failed to parse number: '{}' is out of range", text)),
        Err(e) => Token::Error(format!("failed to parse number: {}", e)),
    }
}

/// Tokenize all of `input`
///
/// The returned buffer always ends with two `Token::Eof`s so a cursor can peek one token past
/// its position without bounds checks.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        let tok = lexer.next_token();
        if tok.is_eof() {
            break;
        }
        tokens.push(tok);
    }

    tokens.push(Token::Eof);
    tokens.push(Token::Eof);
    tokens
}

#[cfg(test)]
fn lex_all(input: &str) -> Vec<Token> {
    let mut tokens = tokenize(input);
    tokens.truncate(tokens.len() - 2);
    tokens
}

#[test]
fn test_lexer() {
    use Token::*;

    let tokens = lex_all("LEt * = 3 + 4 * 5 - 1 / 2");
    assert_eq!(
        tokens,
        vec![
            Let,
            Multiply,
            Assign,
            Number(3.0),
            Plus,
            Number(4.0),
            Multiply,
            Number(5.0),
            Minus,
            Number(1.0),
            Divide,
            Number(2.0),
        ]
    );
}

#[test]
fn test_minus_folding() {
    use Token::*;

    let tests = vec![
        ("-3", vec![Number(-3.0)]),
        ("3-3", vec![Number(3.0), Minus, Number(3.0)]),
        ("3--3", vec![Number(3.0), Minus, Number(-3.0)]),
        ("3 - -3", vec![Number(3.0), Minus, Number(-3.0)]),
        ("-1 + 3", vec![Number(-1.0), Plus, Number(3.0)]),
        ("a -1", vec![Ident("a".to_string()), Minus, Number(1.0)]),
        ("(2)-1", vec![LParen, Number(2.0), RParen, Minus, Number(1.0)]),
        ("x = -.5", vec![Ident("x".to_string()), Assign, Number(-0.5)]),
        ("- 3", vec![Minus, Number(3.0)]),
        ("-(1)", vec![Minus, LParen, Number(1.0), RParen]),
    ];

    for (input, expected) in tests {
        assert_eq!(lex_all(input), expected, "input: {}", input);
    }
}

#[test]
fn test_separators() {
    use Token::*;

    assert_eq!(
        lex_all("a = 1;\tb = 2\r\n"),
        vec![
            Ident("a".to_string()),
            Assign,
            Number(1.0),
            Ident("b".to_string()),
            Assign,
            Number(2.0),
        ]
    );
    assert_eq!(lex_all(" ;; \n"), vec![]);
}

#[test]
fn test_numbers() {
    let fmax = format!("9999{:.1}", f64::MAX);

    let tests = vec![
        ("-3", None),
        (".1", None),
        ("1.", None),
        (".1.1", Some("too many periods in '.1.1'")),
        ("$", Some("unknown character $")),
        (fmax.as_str(), Some("failed to parse number")),
        (".", Some("failed to parse number")),
    ];

    for (input, error) in tests {
        let found = lex_all(input).into_iter().find_map(|tok| match tok {
            Token::Error(msg) => Some(msg),
            _ => None,
        });

        match (error, found) {
            (None, None) => (),
            (Some(expected), Some(msg)) => assert!(
                msg.contains(expected),
                "input {}: expected '{}' in '{}'",
                input,
                expected,
                msg
            ),
            (expected, found) => panic!(
                "input {}: expected {:?}, found {:?}",
                input, expected, found
            ),
        }
    }
}

#[test]
fn test_misplaced_minus() {
    match parse_number("3-3") {
        Token::Error(msg) => assert_eq!(msg, "- can only appear at the start of a number, found: 3-3"),
        tok => panic!("unexpected token {:?}", tok),
    }
    assert_eq!(parse_number("-3"), Token::Number(-3.0));
}

#[test]
fn test_unknown_character_progress() {
    use Token::*;

    let tokens = lex_all("1 $ 2 @@");
    assert_eq!(
        tokens,
        vec![
            Number(1.0),
            Error("unknown character $".to_string()),
            Number(2.0),
            Error("unknown character @".to_string()),
            Error("unknown character @".to_string()),
        ]
    );
}

#[test]
fn test_eof_repeats() {
    let mut lexer = Lexer::new("1");
    assert_eq!(lexer.next_token(), Token::Number(1.0));
    for _ in 0..3 {
        assert_eq!(lexer.next_token(), Token::Eof);
    }

    let tokens = tokenize("");
    assert_eq!(tokens, vec![Token::Eof, Token::Eof]);
}

#[test]
fn test_identifiers() {
    use Token::*;

    assert_eq!(
        lex_all("letter LET Pi e"),
        vec![
            Ident("letter".to_string()),
            Let,
            Ident("Pi".to_string()),
            Ident("e".to_string()),
        ]
    );
    assert_eq!(
        lex_all("ab1"),
        vec![Ident("ab".to_string()), Number(1.0)]
    );
}
