//! Token model and cursor
//!
//! - [`Token`] / [`TokenKind`]: one lexeme with its exact source text and span
//! - [`TokenStream`]: the cursor the parser reads from, with bounded
//!   lookahead, brace depth tracking and a synthetic end-of-input token

pub mod token;
pub mod token_stream;

pub use token::{Token, TokenKind};
pub use token_stream::{TokenStream, TokenStreamError};

pub use crate::utils::{Position, Span};
