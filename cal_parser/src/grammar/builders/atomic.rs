//! Parser trait and the leaf-level builders shared by every grammar rule
//!
//! Builders are free functions over `&mut dyn Parser`; the trait exposes the
//! token cursor, diagnostic sinks and the nesting guard, nothing else.

use crate::grammar::keywords::{can_be_identifier, Keyword};
use crate::syntax::{ParseError, SyntaxError, SyntaxResult, TokenDescription};
use crate::tokens::{Token, TokenKind, TokenStreamError};
use crate::utils::Span;

/// Cursor and diagnostic sink that builders work against
pub trait Parser {
    // === NAVIGATION ===
    fn peek(&self) -> &Token;
    fn peek_ahead(&self, n: usize) -> &Token;
    fn previous(&self) -> &Token;
    /// One-token lookahead past the current token
    fn check_next(&self, kind: TokenKind) -> bool;
    fn advance(&mut self) -> Token;
    /// Consume a token of `kind` or fail without moving
    fn consume(&mut self, kind: TokenKind) -> Result<Token, TokenStreamError>;
    fn is_at_end(&self) -> bool;

    // === POSITION AND SPANS ===
    /// Index of the current token, used as a start marker for spans
    fn position(&self) -> usize;
    /// Curly-brace depth after the tokens consumed so far
    fn brace_depth(&self) -> usize;
    fn span_from(&self, start: usize) -> Span;

    // === DIAGNOSTICS ===
    fn record_error(&mut self, error: ParseError);
    /// Note that tokens `[start, current)` were stepped over
    fn record_skipped(&mut self, start: usize, reason: &str);

    // === NESTING GUARD ===
    fn enter_nesting(&mut self) -> SyntaxResult<()>;
    fn exit_nesting(&mut self);
}

/// Record a builder failure as a diagnostic
pub fn report(parser: &mut dyn Parser, error: SyntaxError) {
    parser.record_error(ParseError::from_syntax_error(&error));
}

/// Run `rule` one nesting level deeper; the level is released on every path
pub fn nested<T>(
    parser: &mut dyn Parser,
    rule: impl FnOnce(&mut dyn Parser) -> SyntaxResult<T>,
) -> SyntaxResult<T> {
    parser.enter_nesting()?;
    let result = rule(parser);
    parser.exit_nesting();
    result
}

pub fn check(parser: &dyn Parser, kind: TokenKind) -> bool {
    parser.peek().kind == kind
}

pub fn check_keyword(parser: &dyn Parser, keyword: Keyword) -> bool {
    parser.peek().is_keyword(keyword)
}

pub fn advance_if(parser: &mut dyn Parser, kind: TokenKind) -> Option<Token> {
    if check(parser, kind) {
        Some(parser.advance())
    } else {
        None
    }
}

pub fn advance_if_keyword(parser: &mut dyn Parser, keyword: Keyword) -> bool {
    advance_if(parser, TokenKind::Keyword(keyword)).is_some()
}

/// Consume a token of `kind` or fail without moving
pub fn expect(parser: &mut dyn Parser, kind: TokenKind) -> SyntaxResult<Token> {
    match parser.consume(kind) {
        Ok(token) => Ok(token),
        Err(error) => Err(SyntaxError::from_stream_error(&error, parser.peek())),
    }
}

pub fn expect_keyword(parser: &mut dyn Parser, keyword: Keyword) -> SyntaxResult<Token> {
    expect(parser, TokenKind::Keyword(keyword))
}

/// Consume a `;`; a missing one is recorded and parsing carries on when the
/// next token already starts something else
pub fn expect_semicolon_lenient(parser: &mut dyn Parser) {
    if advance_if(parser, TokenKind::Semicolon).is_none() {
        let error = SyntaxError::missing_delimiter(";", parser.peek());
        report(parser, error);
    }
}

/// Parse an integer token. Values that overflow `i64` are recorded and
/// replaced with 0 so the surrounding construct survives.
pub fn parse_integer(parser: &mut dyn Parser) -> SyntaxResult<i64> {
    let negative = advance_if(parser, TokenKind::Minus).is_some();
    let token = expect(parser, TokenKind::Integer)?;
    let value = integer_value(parser, &token);
    Ok(if negative { -value } else { value })
}

/// Numeric value of an integer token, recording a diagnostic on overflow
pub fn integer_value(parser: &mut dyn Parser, token: &Token) -> i64 {
    match token.text.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            report(
                parser,
                SyntaxError::InvalidInteger {
                    found: TokenDescription::of(token),
                    span: token.span,
                },
            );
            0
        }
    }
}

/// Unsigned size such as a text length or an array dimension
pub fn parse_size(parser: &mut dyn Parser) -> SyntaxResult<u32> {
    let token = expect(parser, TokenKind::Integer)?;
    match token.text.parse::<u32>() {
        Ok(value) => Ok(value),
        Err(_) => {
            report(
                parser,
                SyntaxError::InvalidInteger {
                    found: TokenDescription::of(&token),
                    span: token.span,
                },
            );
            Ok(0)
        }
    }
}

/// Optional `@number` suffix on a declared name
pub fn parse_auto_number(parser: &mut dyn Parser) -> SyntaxResult<Option<i64>> {
    if advance_if(parser, TokenKind::At).is_none() {
        return Ok(None);
    }
    parse_integer(parser).map(Some)
}

/// Name in declaration position, with its optional `@number` suffix.
///
/// Reserved keywords fail with a diagnostic naming `role`.
pub fn parse_declared_name(
    parser: &mut dyn Parser,
    role: &'static str,
) -> SyntaxResult<(String, Option<i64>)> {
    let token = parser.peek().clone();
    if !can_be_identifier(token.kind) {
        return Err(match token.kind {
            TokenKind::Keyword(keyword) => SyntaxError::reserved_keyword(keyword, role, token.span),
            _ => SyntaxError::expected(role, &token),
        });
    }
    parser.advance();
    let id = parse_auto_number(parser)?;
    Ok((token.value(), id))
}

/// Whether the upcoming tokens look like `name :` or `name @n :`
pub fn looks_like_declaration(parser: &dyn Parser) -> bool {
    matches!(
        parser.peek_ahead(1).kind,
        TokenKind::Colon | TokenKind::At
    )
}

/// Join tokens into text, inserting a single space wherever the source had
/// a gap between two tokens
pub fn join_tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        if let Some(previous) = previous {
            if !token.is_adjacent_to(previous) {
                text.push(' ');
            }
        }
        text.push_str(&token.text);
        previous = Some(token);
    }
    text
}

/// Consume tokens while `keep_going` holds and brackets stay balanced.
///
/// `keep_going` is only consulted outside `()`, `[]` and `{}` opened within
/// the run, so separators inside nested brackets are taken verbatim.
pub fn collect_raw(parser: &mut dyn Parser, keep_going: impl Fn(&Token) -> bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    loop {
        let token = parser.peek();
        if token.kind == TokenKind::Eof {
            break;
        }
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                if depth == 0 {
                    if !keep_going(token) {
                        break;
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {
                if depth == 0 && !keep_going(token) {
                    break;
                }
            }
        }
        tokens.push(parser.advance());
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use crate::syntax::CalParser;
    use assert_matches::assert_matches;

    fn parser_for(source: &str) -> CalParser {
        CalParser::new(tokenize(source).expect("tokenize"))
    }

    #[test]
    fn test_declared_name_with_auto_number() {
        let mut parser = parser_for("Customer@1000 : Record 18");
        let (name, id) = parse_declared_name(&mut parser, "variable name").unwrap();
        assert_eq!(name, "Customer");
        assert_eq!(id, Some(1000));
        assert!(check(&parser, TokenKind::Colon));
    }

    #[test]
    fn test_check_next_does_not_consume() {
        let mut parser = parser_for("CODE { }");
        assert!(parser.check_next(TokenKind::LeftBrace));
        assert!(!parser.check_next(TokenKind::RightBrace));
        assert!(check_keyword(&parser, Keyword::Code));
        parser.advance();
        assert!(parser.check_next(TokenKind::RightBrace));
    }

    #[test]
    fn test_quoted_name_is_unquoted() {
        let mut parser = parser_for("\"Sales Header\"@1001 :");
        let (name, _) = parse_declared_name(&mut parser, "variable name").unwrap();
        assert_eq!(name, "Sales Header");
    }

    #[test]
    fn test_reserved_keyword_as_name() {
        let mut parser = parser_for("IF : Integer");
        let error = parse_declared_name(&mut parser, "variable name").unwrap_err();
        assert_matches!(
            error,
            SyntaxError::ReservedKeyword {
                keyword: Keyword::If,
                ..
            }
        );
        assert_eq!(error.to_string(), "Cannot use reserved keyword 'IF' as variable name");
    }

    #[test]
    fn test_type_keywords_allowed_as_names() {
        let mut parser = parser_for("Page@1 : Integer");
        let (name, _) = parse_declared_name(&mut parser, "variable name").unwrap();
        assert_eq!(name, "Page");
    }

    #[test]
    fn test_integer_overflow_becomes_placeholder() {
        let mut parser = parser_for("99999999999999999999999");
        assert_eq!(parse_integer(&mut parser).unwrap(), 0);
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E054");
    }

    #[test]
    fn test_expect_reports_found_token() {
        let mut parser = parser_for("x");
        let error = expect(&mut parser, TokenKind::Semicolon).unwrap_err();
        assert_eq!(error.to_string(), "Expected ';', found identifier 'x'");

        let mut empty = parser_for("");
        assert_matches!(
            expect(&mut empty, TokenKind::Semicolon),
            Err(SyntaxError::UnexpectedEndOfInput { .. })
        );
    }

    #[test]
    fn test_join_tokens_preserves_gaps() {
        let tokens = tokenize("Sales Header No. 2").unwrap();
        let content: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        assert_eq!(join_tokens(&content), "Sales Header No. 2");
    }

    #[test]
    fn test_collect_raw_keeps_nested_separators() {
        let mut parser = parser_for("[ENU=Customer;DEU=Debitor]; Next");
        let tokens = collect_raw(&mut parser, |t| t.kind != TokenKind::Semicolon);
        assert_eq!(join_tokens(&tokens), "[ENU=Customer;DEU=Debitor]");
        assert!(check(&parser, TokenKind::Semicolon));
    }

    #[test]
    fn test_nested_releases_level_on_error() {
        let mut parser = parser_for("x");
        let result: SyntaxResult<()> = nested(&mut parser, |p| {
            Err(SyntaxError::expected("';'", p.peek()))
        });
        assert!(result.is_err());
        assert_eq!(parser.nesting_depth(), 0);
    }
}
