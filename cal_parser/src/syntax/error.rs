//! Syntax errors and the diagnostics recorded from them
//!
//! Builders fail with a [`SyntaxError`]; recovery points turn each one into a
//! [`ParseError`] and keep going. Source text only reaches a message through
//! [`TokenDescription`], which truncates and cleans the fragment first.

use crate::config::compile_time::logging::MAX_LOG_MESSAGE_LENGTH;
use crate::config::compile_time::syntax::MAX_SANITIZED_FRAGMENT_LENGTH;
use crate::grammar::ast::nodes::Document;
use crate::grammar::builders::types::TypeStringError;
use crate::grammar::keywords::Keyword;
use crate::logging::{codes, Code};
use crate::tokens::{Token, TokenKind, TokenStreamError};
use crate::utils::Span;
use serde::Serialize;
use std::fmt;

pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Printable, bounded description of a source token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescription(String);

impl TokenDescription {
    pub fn of(token: &Token) -> Self {
        let description = match token.kind {
            TokenKind::Keyword(keyword) => format!("'{}'", keyword.as_str()),
            TokenKind::Identifier | TokenKind::QuotedIdentifier => {
                format!("identifier '{}'", sanitize_fragment(&token.value()))
            }
            TokenKind::String => {
                format!("string literal ({} chars)", token.value().chars().count())
            }
            TokenKind::Integer
            | TokenKind::Decimal
            | TokenKind::Date
            | TokenKind::Time
            | TokenKind::DateTime => format!("'{}'", sanitize_fragment(&token.text)),
            TokenKind::PreprocessorDirective => "preprocessor directive".to_string(),
            TokenKind::Unknown => match token.text.chars().next() {
                Some(ch) => format!("character U+{:04X}", ch as u32),
                None => "unknown character".to_string(),
            },
            TokenKind::Eof => "end of input".to_string(),
            other => other.describe(),
        };
        Self(description)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cap a source fragment and replace anything non-printable
fn sanitize_fragment(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .take(MAX_SANITIZED_FRAGMENT_LENGTH)
        .map(|ch| if ch.is_control() || ch == '\'' { '?' } else { ch })
        .collect();
    if text.chars().count() > MAX_SANITIZED_FRAGMENT_LENGTH {
        cleaned.push_str("...");
    }
    cleaned
}

/// Failures raised by grammar builders
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyntaxError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: TokenDescription,
        span: Span,
    },

    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: String, span: Span },

    #[error("Cannot use reserved keyword '{keyword}' as {role}")]
    ReservedKeyword {
        keyword: Keyword,
        role: &'static str,
        span: Span,
    },

    #[error("Invalid integer literal {found}")]
    InvalidInteger { found: TokenDescription, span: Span },

    #[error("Invalid type descriptor: {source}")]
    InvalidTypeDescriptor { source: TypeStringError, span: Span },

    #[error("Array declares {count} dimensions, at most {max} are allowed")]
    ArrayDimensionLimit { count: usize, max: usize, span: Span },

    #[error("FOR loop variable must be a name or a member access")]
    InvalidForTarget { span: Span },

    #[error("Missing {what} name")]
    MissingName { what: &'static str, span: Span },

    #[error("Unknown trigger {name}")]
    UnknownTrigger { name: TokenDescription, span: Span },

    #[error("{construct} is not supported in C/AL, use {suggestion} instead")]
    AlOnlyConstruct {
        construct: &'static str,
        suggestion: &'static str,
        span: Span,
    },

    #[error("Missing '{delimiter}' before {found}")]
    MissingDelimiter {
        delimiter: &'static str,
        found: TokenDescription,
        span: Span,
    },

    #[error("Maximum nesting depth exceeded")]
    MaxRecursionDepth { span: Span },
}

impl SyntaxError {
    /// `expected` was wanted but `found` is next; end of input gets its own variant
    pub fn expected(expected: impl Into<String>, found: &Token) -> Self {
        if found.kind == TokenKind::Eof {
            Self::UnexpectedEndOfInput {
                expected: expected.into(),
                span: found.span,
            }
        } else {
            Self::UnexpectedToken {
                expected: expected.into(),
                found: TokenDescription::of(found),
                span: found.span,
            }
        }
    }

    /// Cursor expectation failure, described by the token actually found
    pub fn from_stream_error(error: &TokenStreamError, found: &Token) -> Self {
        match error {
            TokenStreamError::UnexpectedToken { expected, span, .. } => Self::UnexpectedToken {
                expected: expected.describe(),
                found: TokenDescription::of(found),
                span: *span,
            },
            TokenStreamError::UnexpectedEndOfStream { expected, span } => {
                Self::UnexpectedEndOfInput {
                    expected: expected.describe(),
                    span: *span,
                }
            }
        }
    }

    pub fn reserved_keyword(keyword: Keyword, role: &'static str, span: Span) -> Self {
        Self::ReservedKeyword {
            keyword,
            role,
            span,
        }
    }

    pub fn al_only(construct: &'static str, suggestion: &'static str, span: Span) -> Self {
        Self::AlOnlyConstruct {
            construct,
            suggestion,
            span,
        }
    }

    pub fn missing_delimiter(delimiter: &'static str, found: &Token) -> Self {
        Self::MissingDelimiter {
            delimiter,
            found: TokenDescription::of(found),
            span: found.span,
        }
    }

    pub fn max_recursion_depth(span: Span) -> Self {
        Self::MaxRecursionDepth { span }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END_OF_INPUT,
            Self::ReservedKeyword { .. } => codes::syntax::RESERVED_KEYWORD_AS_IDENTIFIER,
            Self::InvalidInteger { .. } => codes::syntax::INVALID_INTEGER_LITERAL,
            Self::InvalidTypeDescriptor { .. } => codes::syntax::INVALID_TYPE_DESCRIPTOR,
            Self::ArrayDimensionLimit { .. } => codes::syntax::ARRAY_DIMENSION_LIMIT,
            Self::InvalidForTarget { .. } => codes::syntax::INVALID_FOR_TARGET,
            Self::MissingName { .. } => codes::syntax::MISSING_NAME,
            Self::UnknownTrigger { .. } => codes::syntax::UNKNOWN_TRIGGER,
            Self::AlOnlyConstruct { .. } => codes::syntax::AL_ONLY_CONSTRUCT,
            Self::MissingDelimiter { .. } => codes::syntax::MISSING_DELIMITER,
            Self::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::ReservedKeyword { span, .. }
            | Self::InvalidInteger { span, .. }
            | Self::InvalidTypeDescriptor { span, .. }
            | Self::ArrayDimensionLimit { span, .. }
            | Self::InvalidForTarget { span }
            | Self::MissingName { span, .. }
            | Self::UnknownTrigger { span, .. }
            | Self::AlOnlyConstruct { span, .. }
            | Self::MissingDelimiter { span, .. }
            | Self::MaxRecursionDepth { span } => *span,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}

/// A recorded diagnostic: code, cleaned message and location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    code: Code,
    message: String,
    span: Span,
}

impl ParseError {
    pub fn new(code: Code, message: impl AsRef<str>, span: Span) -> Self {
        Self {
            code,
            message: sanitize_message(message.as_ref()),
            span,
        }
    }

    pub fn from_syntax_error(error: &SyntaxError) -> Self {
        Self::new(error.error_code(), error.to_string(), error.span())
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn column(&self) -> u32 {
        self.span.start.column
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: [{}] {}",
            self.line(),
            self.column(),
            self.code,
            self.message
        )
    }
}

impl From<&SyntaxError> for ParseError {
    fn from(error: &SyntaxError) -> Self {
        Self::from_syntax_error(error)
    }
}

fn sanitize_message(message: &str) -> String {
    message
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .take(MAX_LOG_MESSAGE_LENGTH)
        .collect()
}

/// Tokens stepped over during recovery or section skipping.
///
/// Carries raw source text, so it stays out of serialized output and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRegion {
    pub span: Span,
    pub reason: String,
    pub token_count: usize,
    pub text: String,
}

/// Everything one parse produces; parsing itself never fails
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub document: Document,
    pub errors: Vec<ParseError>,
    pub skipped_regions: Vec<SkippedRegion>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The serializable part of the output
    pub fn report(&self) -> ParseReport<'_> {
        ParseReport {
            document: &self.document,
            errors: &self.errors,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParseReport<'a> {
    pub document: &'a Document,
    pub errors: &'a [ParseError],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    fn token(kind: TokenKind, text: &str) -> Token {
        let end = Position::new(4 + text.len(), 1, 5 + text.len() as u32);
        Token::new(kind, text, Span::new(Position::new(4, 1, 5), end))
    }

    #[test]
    fn test_error_code_mapping() {
        let found = token(TokenKind::Keyword(Keyword::If), "IF");
        assert_eq!(SyntaxError::expected("';'", &found).error_code().as_str(), "E050");

        let eof = Token::eof_at(Span::dummy());
        assert_eq!(SyntaxError::expected("';'", &eof).error_code().as_str(), "E051");

        let reserved = SyntaxError::reserved_keyword(Keyword::If, "variable name", found.span);
        assert_eq!(reserved.error_code().as_str(), "E053");
        assert_eq!(
            reserved.to_string(),
            "Cannot use reserved keyword 'IF' as variable name"
        );

        assert_eq!(
            SyntaxError::max_recursion_depth(found.span).error_code().as_str(),
            "E087"
        );
    }

    #[test]
    fn test_descriptions_never_echo_string_contents() {
        let secret = token(TokenKind::String, "'password=hunter2'");
        let description = TokenDescription::of(&secret);
        assert_eq!(description.as_str(), "string literal (16 chars)");
        assert!(!description.as_str().contains("hunter2"));
    }

    #[test]
    fn test_long_identifiers_are_truncated() {
        let long_name = "A".repeat(MAX_SANITIZED_FRAGMENT_LENGTH + 40);
        let description = TokenDescription::of(&token(TokenKind::Identifier, &long_name));
        assert!(description.as_str().ends_with("...'"));
        assert!(description.as_str().len() < long_name.len());
    }

    #[test]
    fn test_control_characters_are_replaced() {
        let description = TokenDescription::of(&token(TokenKind::Identifier, "Bad\u{7}Name"));
        assert_eq!(description.as_str(), "identifier 'Bad?Name'");

        let error = ParseError::new(
            codes::syntax::UNEXPECTED_TOKEN,
            "line\nbreak\u{0}",
            Span::dummy(),
        );
        assert_eq!(error.message(), "line break ");
    }

    #[test]
    fn test_parse_error_display_and_location() {
        let found = token(TokenKind::Semicolon, ";");
        let error = ParseError::from_syntax_error(&SyntaxError::expected("THEN", &found));

        assert_eq!(error.line(), 1);
        assert_eq!(error.column(), 5);
        assert_eq!(error.message(), "Expected THEN, found ';'");
        assert_eq!(error.to_string(), "1:5: [E050] Expected THEN, found ';'");
    }

    #[test]
    fn test_error_metadata() {
        let found = token(TokenKind::Identifier, "x");
        let error = SyntaxError::expected("':'", &found);
        assert!(error.is_recoverable());
        assert_eq!(error.category(), "Syntax");
        assert!(!error.recommended_action().is_empty());
        let depth = SyntaxError::MaxRecursionDepth { span: found.span };
        assert!(depth.is_recoverable());
        assert_eq!(depth.severity(), "High");
    }
}
