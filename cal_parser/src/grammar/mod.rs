//! C/AL grammar: keywords, syntax tree and the recursive-descent builders

pub mod ast;
pub mod builders;
pub mod keywords;

pub use ast::nodes::*;
pub use keywords::{can_be_identifier, is_reserved, Keyword};
