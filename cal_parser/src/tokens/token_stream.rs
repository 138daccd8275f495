//! Token cursor used by the parser
//!
//! Holds the significant tokens of one document. The lexer's `Eof` token is
//! filtered out on construction; once the cursor runs past the last token a
//! synthetic end-of-input token positioned at the end of the last real token
//! is returned instead. Consuming `{`/`}` updates a brace depth counter that
//! section-boundary checks use to tell a section keyword from the same word
//! inside a nested property value.
use super::token::{Token, TokenKind};
use crate::utils::Span;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
    brace_depth: usize,
    eof: Token,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof_span = tokens
            .iter()
            .rev()
            .find(|t| t.kind == TokenKind::Eof)
            .or_else(|| tokens.last())
            .map(|t| t.span)
            .unwrap_or_else(Span::dummy);

        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();

        let eof_span = tokens.last().map(|t| t.span).unwrap_or(eof_span);

        Self {
            tokens,
            position: 0,
            brace_depth: 0,
            eof: Token::eof_at(eof_span),
        }
    }

    /// Current token, or the synthetic end-of-input token
    pub fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.eof)
    }

    /// Token `n` positions ahead of the current one (`peek_ahead(0) == peek()`)
    pub fn peek_ahead(&self, n: usize) -> &Token {
        self.tokens.get(self.position + n).unwrap_or(&self.eof)
    }

    /// Last consumed token, or the current one when nothing was consumed yet
    pub fn previous(&self) -> &Token {
        match self.position.checked_sub(1) {
            Some(index) => self.tokens.get(index).unwrap_or(&self.eof),
            None => self.peek(),
        }
    }

    /// Consume the current token; at end of input the synthetic token is
    /// returned and the cursor does not move
    pub fn advance(&mut self) -> Token {
        let Some(token) = self.tokens.get(self.position) else {
            return self.eof.clone();
        };
        match token.kind {
            TokenKind::LeftBrace => self.brace_depth += 1,
            TokenKind::RightBrace => self.brace_depth = self.brace_depth.saturating_sub(1),
            _ => {}
        }
        self.position += 1;
        token.clone()
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub fn check_next(&self, kind: TokenKind) -> bool {
        self.peek_ahead(1).kind == kind
    }

    /// Consume the current token if it has the given kind
    pub fn advance_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Consume a token of `kind` or fail without moving
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, TokenStreamError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let found = self.peek();
        if found.kind == TokenKind::Eof {
            Err(TokenStreamError::UnexpectedEndOfStream {
                expected: kind,
                span: found.span,
            })
        } else {
            Err(TokenStreamError::UnexpectedToken {
                expected: kind,
                found: found.kind,
                span: found.span,
            })
        }
    }

    pub fn brace_depth(&self) -> usize {
        self.brace_depth
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Span from the token at `start_position` to the last consumed token.
    /// When nothing was consumed since `start_position` the result is a
    /// zero-width span at the current token.
    pub fn span_from(&self, start_position: usize) -> Span {
        if self.position <= start_position {
            return Span::point(self.peek().span.start);
        }
        let start = self
            .tokens
            .get(start_position)
            .map(|t| t.span)
            .unwrap_or(self.eof.span);
        start.merge(self.previous().span)
    }

    /// Tokens in `[start, end)`, clamped to the stream
    pub fn tokens_between(&self, start: usize, end: usize) -> &[Token] {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        &self.tokens[start..end]
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenStreamError {
    #[error("Expected {expected}, found {found} at {span}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        span: Span,
    },

    #[error("Expected {expected}, but reached end of input at {span}")]
    UnexpectedEndOfStream { expected: TokenKind, span: Span },
}

impl TokenStreamError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } | Self::UnexpectedEndOfStream { span, .. } => *span,
        }
    }
}
