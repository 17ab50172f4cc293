use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{config::Config as EditorConfig, Editor, Helper};
use simplelog::{Config as LogConfig, LevelFilter, SimpleLogger};

use calc::lang::eval::Evaluator;
use calc::lang::token::Token;

mod input;

use input::{fixup_input, format_number, is_quit, ReplHelper};

const HISTORY_FILE: &str = ".calc_history";
const PROMPT: &str = "calc> ";

/// A simple floating-point calculator
///
/// Evaluates the given expression, or starts a REPL when none is given. Quote the expression if
/// it uses `*` so the shell does not glob it.
#[derive(Parser)]
#[command(version)]
struct Opt {
    /// Show debug output
    #[arg(short, long)]
    debug: bool,
    /// Where to keep REPL history
    #[arg(long, default_value = HISTORY_FILE)]
    history: PathBuf,
    /// Expression to evaluate, words are joined with spaces
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    expression: Vec<String>,
}

fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    };

    match SimpleLogger::init(filter, LogConfig::default()) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to init logger: {}", e),
    }
}

fn init_editor() -> Result<Editor<ReplHelper, DefaultHistory>> {
    let config = EditorConfig::builder().auto_add_history(true).build();
    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(ReplHelper::new()));

    Ok(editor)
}

fn init_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>, path: &Path) {
    let _ = editor.load_history(path);
}

fn save_history<H: Helper>(editor: &mut Editor<H, DefaultHistory>, path: &Path) -> Result<()> {
    match editor.save_history(path) {
        Ok(_) => Ok(()),
        Err(e) => bail!("Failed to save history: {}", e),
    }
}

fn welcome() {
    println!("calc v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or 'quit' to quit");
    println!();
}

/// Evaluate `line`, returning `None` if it held no statements
fn evaluate(calc: &mut Evaluator, line: &str) -> Result<Option<f64>> {
    match calc.eval(line) {
        Token::Number(n) => Ok(Some(n)),
        Token::Eof => Ok(None),
        Token::Error(msg) => Err(anyhow!(msg)),
        tok => bail!("unexpected output {}", tok),
    }
}

fn run_once(expression: &[String]) -> Result<()> {
    let line = expression.join(" ");
    info!("evaluating: {}", line);

    let mut calc = Evaluator::new();
    match evaluate(&mut calc, &line)? {
        Some(n) => {
            println!("{}", format_number(n));
            Ok(())
        }
        None => bail!("no expression"),
    }
}

fn repl(history: &Path) -> Result<()> {
    let mut editor = init_editor()?;
    init_history(&mut editor, history);
    welcome();

    let mut calc = Evaluator::new();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                info!("read: {}", &line);

                let line = fixup_input(&line);
                if is_quit(&line) {
                    break;
                }

                match evaluate(&mut calc, &line) {
                    Ok(Some(n)) => println!("{}", format_number(n)),
                    Ok(None) => (),
                    // Keep the session (and its variables) alive; only one-shot mode exits non-zero
                    Err(e) => eprintln!("error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("Press Ctrl-D or type 'quit' to quit");
            }
            Err(ReadlineError::Eof) => {
                println!("quit");
                break;
            }
            Err(e) => {
                error!("Unexpected error: {}", e);
                println!("quit");
                break;
            }
        }
    }

    save_history(&mut editor, history)
}

fn main() -> Result<()> {
    let opts = Opt::parse();
    init_logging(opts.debug)?;

    if opts.expression.is_empty() {
        repl(&opts.history)
    } else {
        run_once(&opts.expression)
    }
}
