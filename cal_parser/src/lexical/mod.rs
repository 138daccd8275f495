//! Lexical analysis
//!
//! Converts C/AL export text into the token sequence the parser consumes.
//! Malformed input (unknown characters, unterminated strings or comments)
//! never fails tokenization; only the compile-time resource limits do.

pub mod analyzer;

use crate::tokens::Token;

pub use analyzer::{LexerError, LexicalAnalyzer, LexicalMetrics};

/// Tokenize `source`; the result always ends with an `Eof` token
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    LexicalAnalyzer::new(source).tokenize().map(|(tokens, _)| tokens)
}

/// Tokenize and return the collected counters as well
pub fn tokenize_with_metrics(source: &str) -> Result<(Vec<Token>, LexicalMetrics), LexerError> {
    LexicalAnalyzer::new(source).tokenize()
}
