pub mod eval;
pub mod lexer;
pub mod token;
pub mod variables;
