use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Completer, Helper, Highlighter, Hinter, Result};

/// Helper that extends editor
///
/// Currently only implements `Validator` trait to trigger multiline editing when a `\` is seen at
/// the end of a line.
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplHelper {}

impl ReplHelper {
    pub fn new() -> Self {
        ReplHelper {}
    }
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> Result<ValidationResult> {
        if ctx.input().ends_with('\\') {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Remove the multiline escapes created by `ReplHelper`
pub fn fixup_input(input: &str) -> String {
    input.replace("\\\n", " ").trim().to_string()
}

/// Whether the line asks to leave the REPL
pub fn is_quit(input: &str) -> bool {
    input.starts_with("exit") || input.starts_with("quit")
}

/// Render a result, dropping the fractional part when there is none
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        format!("{}", n as i64)
    } else {
        format!("{:.6}", n)
    }
}

#[test]
fn test_fixup_input() {
    assert_eq!(fixup_input("1 + \\\n2"), "1 +  2");
    assert_eq!(fixup_input("1 + \\ \n2"), "1 + \\ \n2");
    assert_eq!(fixup_input("  let a = 3 \n"), "let a = 3");
    assert_eq!(fixup_input(""), "");
}

#[test]
fn test_is_quit() {
    assert!(is_quit("exit"));
    assert!(is_quit("quit now"));
    assert!(!is_quit("a = exit"));
    assert!(!is_quit("let quit = 1"));
}

#[test]
fn test_format_number() {
    let tests = vec![
        (3.0, "3"),
        (-12.0, "-12"),
        (0.0, "0"),
        (-0.0, "0"),
        (1.0 / 3.0, "0.333333"),
        (2.5, "2.500000"),
        (f64::INFINITY, "inf"),
    ];

    for (n, expected) in tests {
        assert_eq!(format_number(n), expected);
    }
}
