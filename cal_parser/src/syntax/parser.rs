//! Parser state: token cursor, diagnostics and the nesting guard
//!
//! The grammar itself lives in `grammar::builders`; this type only carries
//! the mutable state the builders thread through. A parser handles exactly
//! one document and is consumed by [`CalParser::parse`].

use crate::config::compile_time::syntax::{MAX_DIAGNOSTICS, MAX_PARSE_DEPTH};
use crate::config::runtime::ParserPreferences;
use crate::grammar::builders::atomic::{join_tokens, Parser};
use crate::grammar::builders::objects::parse_document;
use crate::logging::codes;
use crate::syntax::error::{ParseError, ParseOutput, SkippedRegion, SyntaxError, SyntaxResult};
use crate::tokens::{Token, TokenKind, TokenStream, TokenStreamError};
use crate::utils::Span;
use crate::{log_debug, log_success, log_warning};

pub struct CalParser {
    tokens: TokenStream,
    errors: Vec<ParseError>,
    skipped_regions: Vec<SkippedRegion>,
    nesting_depth: usize,
    diagnostics_capped: bool,
    preferences: ParserPreferences,
}

impl CalParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_preferences(tokens, ParserPreferences::default())
    }

    pub fn with_preferences(tokens: Vec<Token>, preferences: ParserPreferences) -> Self {
        Self {
            tokens: TokenStream::new(tokens),
            errors: Vec::new(),
            skipped_regions: Vec::new(),
            nesting_depth: 0,
            diagnostics_capped: false,
            preferences,
        }
    }

    /// Parse the whole document. Never fails: every problem is a diagnostic
    /// on the returned output.
    pub fn parse(mut self) -> ParseOutput {
        log_debug!("Starting C/AL parse", "tokens" => self.tokens.len());

        let document = parse_document(&mut self);

        log_success!(
            codes::success::AST_CONSTRUCTION_COMPLETE,
            "Syntax tree constructed",
            "has_object" => document.object.is_some(),
            "diagnostics" => self.errors.len(),
            "skipped_regions" => self.skipped_regions.len()
        );

        ParseOutput {
            document,
            errors: self.errors,
            skipped_regions: self.skipped_regions,
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn skipped_regions(&self) -> &[SkippedRegion] {
        &self.skipped_regions
    }

    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl Parser for CalParser {
    fn peek(&self) -> &Token {
        self.tokens.peek()
    }

    fn peek_ahead(&self, n: usize) -> &Token {
        self.tokens.peek_ahead(n)
    }

    fn previous(&self) -> &Token {
        self.tokens.previous()
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens.check_next(kind)
    }

    fn advance(&mut self) -> Token {
        self.tokens.advance()
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token, TokenStreamError> {
        self.tokens.expect(kind)
    }

    fn is_at_end(&self) -> bool {
        self.tokens.is_at_end()
    }

    fn position(&self) -> usize {
        self.tokens.position()
    }

    fn brace_depth(&self) -> usize {
        self.tokens.brace_depth()
    }

    fn span_from(&self, start: usize) -> Span {
        self.tokens.span_from(start)
    }

    fn record_error(&mut self, error: ParseError) {
        if self.errors.len() >= MAX_DIAGNOSTICS {
            if !self.diagnostics_capped {
                self.diagnostics_capped = true;
                log_warning!(
                    code = codes::syntax::DIAGNOSTIC_LIMIT_REACHED,
                    "Diagnostic limit reached",
                    span = error.span(),
                    "limit" => MAX_DIAGNOSTICS
                );
                self.errors.push(ParseError::new(
                    codes::syntax::DIAGNOSTIC_LIMIT_REACHED,
                    format!(
                        "More than {} diagnostics, the rest are not reported",
                        MAX_DIAGNOSTICS
                    ),
                    error.span(),
                ));
            }
            return;
        }

        log_debug!("Recorded diagnostic",
            "code" => error.code(),
            "line" => error.line(),
            "column" => error.column()
        );
        self.errors.push(error);
    }

    fn record_skipped(&mut self, start: usize, reason: &str) {
        let end = self.tokens.position();
        if end <= start {
            return;
        }
        let token_count = end - start;

        if self.preferences.log_recovery_details {
            log_debug!("Skipped tokens", "reason" => reason, "tokens" => token_count);
        }
        if !self.preferences.record_skipped_regions {
            return;
        }

        let text = join_tokens(self.tokens.tokens_between(start, end));
        self.skipped_regions.push(SkippedRegion {
            span: self.tokens.span_from(start),
            reason: reason.to_string(),
            token_count,
            text,
        });
    }

    fn enter_nesting(&mut self) -> SyntaxResult<()> {
        if self.nesting_depth >= MAX_PARSE_DEPTH {
            return Err(SyntaxError::max_recursion_depth(self.peek().span));
        }
        self.nesting_depth += 1;
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }
}
