//! Recursive descent evaluator.
//!
//! There is no AST. Each grammar rule consumes tokens and computes its value directly:
//!
//! ```text
//! factor := NUMBER | IDENT | LET | '(' expr ')' | '-' NUMBER
//! term   := factor ( ('*' | '/') factor )*
//! expr   := term [ '=' expr ] | term ( ('+' | '-') term )*
//! ```
//!
//! Assignment comes in two spellings, `let x = ...` and `x = ...`. `factor` hands back `let` and
//! any identifier followed by `=` unresolved so `expr` can finish the assignment.

use std::fmt;

use anyhow::{anyhow, bail, Result};
use log::debug;

use crate::lang::lexer::tokenize;
use crate::lang::token::Token;
use crate::lang::variables::{Variables, RESULT};

/// Value produced by `factor` and `term`
enum Operand {
    Number(f64),
    /// A bare `let`; `expr` expects an assignment to follow
    Let,
    /// Identifier on the left hand side of `=`, not looked up
    Target(String),
}

impl Operand {
    fn into_number(self) -> Result<f64> {
        match self {
            Operand::Number(n) => Ok(n),
            other => bail!("{} is not a number", other),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Let => write!(f, "let"),
            Operand::Target(name) => write!(f, "{}", name),
        }
    }
}

fn apply(op: &Token, lhs: f64, rhs: f64) -> Result<f64> {
    let res = match op {
        Token::Plus => lhs + rhs,
        Token::Minus => lhs - rhs,
        Token::Multiply => lhs * rhs,
        Token::Divide => {
            if rhs == 0.0 {
                bail!("Attempted division by zero: {}/{}", lhs, rhs);
            }
            lhs / rhs
        }
        _ => bail!("{} is not an arithmetic operator", op),
    };

    Ok(res)
}

/// Deepest nesting of parentheses and chained assignments `run` accepts
pub const MAX_DEPTH: usize = 128;

pub struct Evaluator {
    tokens: Vec<Token>,
    position: usize,
    /// Number of `expr` calls currently nested inside parentheses or assignments
    depth: usize,
    variables: Variables,
}

impl Evaluator {
    /// Create an evaluator with nothing loaded and only the builtin constants defined
    pub fn new() -> Self {
        Self {
            tokens: tokenize(""),
            position: 0,
            depth: 0,
            variables: Variables::new(),
        }
    }

    /// Replace the pending input with `input`
    ///
    /// Variables (and `result`) carry over from earlier runs.
    pub fn load(&mut self, input: &str) {
        self.tokens = tokenize(input);
        self.position = 0;
        self.depth = 0;
        debug!("loaded {} tokens", self.tokens.len() - 2);
    }

    /// Look up a variable, including `result` and the builtin constants
    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name)
    }

    /// Evaluate every pending statement
    ///
    /// Returns the value of the last statement as `Token::Number`, the first failure as
    /// `Token::Error`, or `Token::Eof` if there was nothing to evaluate. Assignments made before
    /// a failing statement are kept.
    pub fn run(&mut self) -> Token {
        let mut last = None;

        while !self.peek().is_eof() {
            match self.expr() {
                Ok(val) => last = Some(val),
                Err(e) => {
                    debug!("run failed: {}", e);
                    return Token::Error(e.to_string());
                }
            }
        }

        match last {
            Some(val) => {
                self.variables.insert(RESULT, val);
                Token::Number(val)
            }
            None => Token::Eof,
        }
    }

    /// Load `input` and run it
    pub fn eval(&mut self, input: &str) -> Token {
        self.load(input);
        self.run()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_second(&self) -> &Token {
        &self.tokens[self.position + 1]
    }

    /// Consume the current token
    ///
    /// The cursor never moves past the first trailing `Eof`, so `peek_second` stays in bounds.
    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.position].clone();
        if !tok.is_eof() {
            self.position += 1;
        }

        tok
    }

    fn factor(&mut self) -> Result<Operand> {
        if let (Token::Ident(name), Token::Assign) = (self.peek(), self.peek_second()) {
            let name = name.clone();
            self.advance();
            return Ok(Operand::Target(name));
        }

        let val = match self.advance() {
            Token::Number(n) => Operand::Number(n),
            Token::Ident(name) => self
                .variables
                .get(&name)
                .map(Operand::Number)
                .ok_or_else(|| anyhow!("undefined variable: {}", name))?,
            Token::Let => Operand::Let,
            Token::LParen => {
                let val = self.nested_expr()?;
                match self.advance() {
                    Token::RParen => Operand::Number(val),
                    tok => bail!("expected ')' after expression found {}", tok),
                }
            }
            // Only literals may be negated
            Token::Minus => match self.advance() {
                Token::Number(n) => Operand::Number(-n),
                tok => bail!("Unexpected token inside factor: {}", tok),
            },
            Token::Eof => bail!("unexpected EOF in factor"),
            Token::Error(msg) => return Err(anyhow!(msg)),
            tok => bail!("Unexpected token inside factor: {}", tok),
        };

        Ok(val)
    }

    fn term(&mut self) -> Result<Operand> {
        let mut lhs = self.factor()?;

        while matches!(self.peek(), Token::Multiply | Token::Divide) {
            let op = self.advance();
            let rhs = self.factor()?;
            lhs = Operand::Number(apply(&op, lhs.into_number()?, rhs.into_number()?)?);
        }

        Ok(lhs)
    }

    fn expr(&mut self) -> Result<f64> {
        let name = match self.term()? {
            Operand::Number(n) => return self.sum(n),
            Operand::Let => {
                let name = match self.advance() {
                    Token::Ident(name) => name,
                    tok => bail!("{} is not an identifier", tok),
                };
                match self.advance() {
                    Token::Assign => (),
                    tok => bail!("{} is not an assignment statement: found {}", name, tok),
                }
                name
            }
            Operand::Target(name) => {
                // `factor` only returns a target when `=` is next
                self.advance();
                name
            }
        };

        let val = self.nested_expr()?;
        debug!("assign {} = {}", name, val);
        self.variables.insert(&name, val);

        Ok(val)
    }

    /// `expr` one level further down, bounded so deep input fails instead of exhausting the stack
    fn nested_expr(&mut self) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            bail!("expression nested too deeply (limit {})", MAX_DEPTH);
        }

        self.depth += 1;
        let res = self.expr();
        self.depth -= 1;

        res
    }

    /// Fold `+`/`-` terms onto `lhs`, left to right
    fn sum(&mut self, mut lhs: f64) -> Result<f64> {
        while matches!(self.peek(), Token::Plus | Token::Minus) {
            let op = self.advance();
            let rhs = self.term()?.into_number()?;
            lhs = apply(&op, lhs, rhs)?;
        }

        Ok(lhs)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
fn expect_number(input: &str) -> f64 {
    let mut eval = Evaluator::new();
    match eval.eval(input) {
        Token::Number(n) => n,
        tok => panic!("'{}' did not evaluate to a number: {:?}", input, tok),
    }
}

#[cfg(test)]
fn expect_error(eval: &mut Evaluator, input: &str, expected: &str) {
    match eval.eval(input) {
        Token::Error(msg) => assert!(
            msg.contains(expected),
            "'{}': expected error containing '{}', found '{}'",
            input,
            expected,
            msg
        ),
        tok => panic!("'{}' did not fail: {:?}", input, tok),
    }
}

#[test]
fn test_expression() {
    let tests = vec![
        ("1", 1.0),
        ("1 + 2", 3.0),
        ("1 + 2 * 3", 7.0),
        ("1 / 3", 1.0 / 3.0),
        ("1 / 3 * 9", 3.0),
        ("( 1 / 3 ) * 9", 3.0),
        ("1 - 3", -2.0),
        ("10 - 4 - 3", 3.0),
        ("16 / 4 / 2", 2.0),
        ("-1 + 3", 2.0),
        ("3--3", 6.0),
        ("3 - - 3", 6.0),
        ("(1+2)*4", 12.0),
        ("((1+2)*4)", 12.0),
        ("2 * (3 + 4) - 1", 13.0),
        ("0.5 + .25", 0.75),
        ("pi * 2", std::f64::consts::PI * 2.0),
        ("e", std::f64::consts::E),
    ];

    for (input, expected) in tests {
        let val = expect_number(input);
        assert!(
            (val - expected).abs() < 1e-9,
            "'{}': expected {}, found {}",
            input,
            expected,
            val
        );
    }
}

#[test]
fn test_division_by_zero() {
    let tests = vec!["1/0", "1 / 0", "let a = 1 ; let b = 0 ; a / b ;", "5 / (2 - 2)"];

    for input in tests {
        let mut eval = Evaluator::new();
        expect_error(&mut eval, input, "division by zero");
    }

    let mut eval = Evaluator::new();
    expect_error(&mut eval, "1/0", "Attempted division by zero: 1/0");
}

#[test]
fn test_assign() {
    let tests = vec![
        ("let a = 3", "a", 3.0),
        ("LET a = 3", "a", 3.0),
        ("let a = 1; let b = 2; let c = 3; let d = a+ b * c", "d", 7.0),
        ("a = 6", "a", 6.0),
        ("a = 1; b = 2; c = 3;  d = a + b * c", "d", 7.0),
        ("a = -1", "a", -1.0),
        ("a = b = 4", "b", 4.0),
        ("a = b = 4", "a", 4.0),
        ("pi = 3", "pi", 3.0),
    ];

    for (input, name, expected) in tests {
        let mut eval = Evaluator::new();
        match eval.eval(input) {
            Token::Number(_) => (),
            tok => panic!("'{}' failed: {:?}", input, tok),
        }
        assert_eq!(eval.variable(name), Some(expected), "'{}'", input);
    }

    let mut eval = Evaluator::new();
    assert_eq!(eval.eval("let a = 3; a * 3"), Token::Number(9.0));
    assert_eq!(eval.variable("a"), Some(3.0));
}

#[test]
fn test_undefined_variable() {
    let tests = vec![
        "let a = 1 + b",
        "let a = 1 - b",
        "let a = 1 / b",
        "let a = 1 * b",
        "let a =  b + 1",
        "let a =  b - 1",
        "let a =  b / 1",
        "let a =  b * 2",
        "PI",
    ];

    for input in tests {
        let mut eval = Evaluator::new();
        expect_error(&mut eval, input, "undefined variable");
        assert_eq!(eval.variable("a"), None);
    }
}

#[test]
fn test_errors() {
    let tests = vec![
        ("let 1 = 1", "is not an identifier"),
        ("let foo = ; ", "EOF"),
        ("let foo foo ; ", "not an assignment statement"),
        ("let foo = ( 1 + 2 * 3 ", "expected ')'"),
        (")", "Unexpected token inside factor"),
        ("1 +", "unexpected EOF"),
        ("2 * 3 $", "unknown character $"),
        ("1.2.3 + 1", "too many periods"),
        ("let * 3", "let is not a number"),
        ("1 + = 2", "Unexpected token inside factor: ="),
    ];

    for (input, expected) in tests {
        let mut eval = Evaluator::new();
        expect_error(&mut eval, input, expected);
    }
}

#[test]
fn test_unary_minus_literals_only() {
    let mut eval = Evaluator::new();
    assert_eq!(eval.eval("a = 2"), Token::Number(2.0));

    expect_error(&mut eval, "-(1+2)", "Unexpected token inside factor: (");
    expect_error(&mut eval, "- a", "Unexpected token inside factor: a");
    expect_error(&mut eval, "1 * -a", "Unexpected token inside factor: a");
    assert_eq!(eval.eval("- 2"), Token::Number(-2.0));
}

#[test]
fn test_let_as_value() {
    let mut eval = Evaluator::new();
    expect_error(&mut eval, "let a = let", "EOF is not an identifier");
    assert_eq!(eval.variable("a"), None);

    expect_error(&mut eval, "let a = 1 + let", "let is not a number");
}

#[test]
fn test_result() {
    let mut eval = Evaluator::new();
    assert_eq!(eval.variable(RESULT), None);

    assert_eq!(eval.eval("2 * 21"), Token::Number(42.0));
    assert_eq!(eval.variable(RESULT), Some(42.0));

    assert_eq!(eval.eval("result + 1"), Token::Number(43.0));
    assert_eq!(eval.variable(RESULT), Some(43.0));

    // Failed and empty runs leave the last result alone
    expect_error(&mut eval, "1/0", "division by zero");
    assert_eq!(eval.variable(RESULT), Some(43.0));
    assert_eq!(eval.eval("  ;  "), Token::Eof);
    assert_eq!(eval.variable(RESULT), Some(43.0));
}

#[test]
fn test_session() {
    let mut eval = Evaluator::new();
    assert_eq!(eval.run(), Token::Eof);

    eval.load("x = 10");
    assert_eq!(eval.run(), Token::Number(10.0));
    // Everything was consumed by the previous run
    assert_eq!(eval.run(), Token::Eof);

    eval.load("x / 4");
    assert_eq!(eval.run(), Token::Number(2.5));

    // Assignments before a failure are kept
    expect_error(&mut eval, "y = 1; z = q", "undefined variable: q");
    assert_eq!(eval.variable("y"), Some(1.0));
    assert_eq!(eval.variable("z"), None);
}

#[test]
fn test_independent_sessions() {
    let mut a = Evaluator::new();
    let b = Evaluator::new();
    assert_eq!(a.eval("x = 1"), Token::Number(1.0));
    assert_eq!(b.variable("x"), None);
}

#[test]
fn test_nesting_limit() {
    let mut eval = Evaluator::new();
    expect_error(&mut eval, &"(".repeat(100_000), "nested too deeply");

    let parens = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
    expect_error(&mut eval, &parens, "nested too deeply");

    let chain = format!("{}1", "a = ".repeat(5000));
    expect_error(&mut eval, &chain, "nested too deeply");
    assert_eq!(eval.variable("a"), None);

    // Depth unwinds with each closing paren, so siblings don't add up
    let shallow = format!("{}2{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(
        eval.eval(&format!("{} + {}", shallow, shallow)),
        Token::Number(4.0)
    );
    assert_eq!(
        eval.eval(&format!("{}1", "a = ".repeat(100))),
        Token::Number(1.0)
    );
}

#[cfg(test)]
mod props {
    use proptest::prelude::*;

    use super::*;

    /// Variable-free arithmetic; nested chains render in parentheses
    #[derive(Debug, Clone)]
    enum Arith {
        Num(u32),
        Chain(Box<Arith>, Vec<(char, Arith)>),
    }

    impl Arith {
        fn render(&self) -> String {
            match self {
                Arith::Num(n) => n.to_string(),
                Arith::Chain(first, rest) => {
                    let mut out = first.render_operand();
                    for (op, operand) in rest {
                        out.push_str(&format!(" {} {}", op, operand.render_operand()));
                    }
                    out
                }
            }
        }

        fn render_operand(&self) -> String {
            match self {
                Arith::Num(_) => self.render(),
                Arith::Chain(..) => format!("({})", self.render()),
            }
        }

        /// `*` and `/` fold first, then `+` and `-`, each left to right
        ///
        /// `None` if any division by zero happens along the way.
        fn value(&self) -> Option<f64> {
            let (first, rest) = match self {
                Arith::Num(n) => return Some(f64::from(*n)),
                Arith::Chain(first, rest) => (first, rest),
            };

            let mut terms = vec![('+', first.value()?)];
            for (op, operand) in rest {
                let rhs = operand.value()?;
                match (op, terms.last_mut()) {
                    ('*', Some((_, lhs))) => *lhs *= rhs,
                    ('/', Some((_, lhs))) => {
                        if rhs == 0.0 {
                            return None;
                        }
                        *lhs /= rhs;
                    }
                    _ => terms.push((*op, rhs)),
                }
            }

            let mut acc = terms[0].1;
            for (op, val) in &terms[1..] {
                if *op == '+' {
                    acc += val;
                } else {
                    acc -= val;
                }
            }

            Some(acc)
        }
    }

    fn arith() -> impl Strategy<Value = Arith> {
        let leaf = (0u32..100).prop_map(Arith::Num);
        leaf.prop_recursive(4, 32, 4, |inner| {
            let op = prop::sample::select(vec!['+', '-', '*', '/']);
            (inner.clone(), prop::collection::vec((op, inner), 0..4))
                .prop_map(|(first, rest)| Arith::Chain(Box::new(first), rest))
        })
    }

    proptest! {
        #[test]
        fn test_run_any_input(
            input in "\\PC{0,64}",
            noise in "[0-9a-z.+*/=()\\- ;]{0,64}",
        ) {
            let mut eval = Evaluator::new();
            for line in &[input, noise] {
                match eval.eval(line) {
                    Token::Number(n) => prop_assert_eq!(eval.variable(RESULT), Some(n)),
                    Token::Error(_) | Token::Eof => (),
                    tok => prop_assert!(false, "unexpected token {:?}", tok),
                }
            }
        }

        #[test]
        fn test_matches_reference_fold(expr in arith()) {
            let input = expr.render();
            let mut eval = Evaluator::new();
            match (expr.value(), eval.eval(&input)) {
                (Some(expected), Token::Number(n)) => prop_assert_eq!(n, expected, "input: {}", input),
                (None, Token::Error(msg)) => prop_assert!(msg.contains("division by zero"), "{}", msg),
                (expected, tok) => prop_assert!(
                    false,
                    "{}: expected {:?}, found {:?}",
                    input,
                    expected,
                    tok
                ),
            }
        }
    }
}
