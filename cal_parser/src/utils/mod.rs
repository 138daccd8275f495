//! Shared primitive types used by the lexer, the parser and the tree.

pub mod span;

pub use span::{Position, Span};
