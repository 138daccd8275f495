//! Error recovery: running a rule with a fallback and resynchronizing the
//! cursor on a structural boundary after a failure

use crate::grammar::builders::atomic::{advance_if, report, Parser};
use crate::grammar::keywords::Keyword;
use crate::syntax::SyntaxResult;
use crate::tokens::{Token, TokenKind};
use crate::log_debug;

/// Run `rule`; on failure record the error, skip to one of `recovery` at the
/// starting brace depth (or past the braces the item opened) and return `None`.
///
/// A trailing `;` after the skipped tokens is consumed. At least one token is
/// consumed on failure unless the cursor sits on a closing brace of an
/// enclosing block, so callers looping over items always make progress.
pub fn parse_with_recovery<T>(
    parser: &mut dyn Parser,
    recovery: &[TokenKind],
    rule: impl FnOnce(&mut dyn Parser) -> SyntaxResult<T>,
) -> Option<T> {
    let base_depth = parser.brace_depth();
    let start = parser.position();

    let error = match rule(parser) {
        Ok(value) => return Some(value),
        Err(error) => error,
    };
    report(parser, error);

    let skip_start = parser.position();
    loop {
        let token = parser.peek();
        if token.kind == TokenKind::Eof {
            break;
        }
        let depth = parser.brace_depth();
        if token.kind == TokenKind::RightBrace {
            if depth <= base_depth {
                break;
            }
            if depth == base_depth + 1 {
                parser.advance();
                break;
            }
        } else if depth <= base_depth && recovery.contains(&token.kind) {
            break;
        }
        parser.advance();
    }
    advance_if(parser, TokenKind::Semicolon);

    if parser.position() == start && !parser.is_at_end() && !is_closing_brace(parser.peek()) {
        parser.advance();
    }
    if parser.position() > skip_start {
        parser.record_skipped(skip_start, "error recovery");
    }
    None
}

fn is_closing_brace(token: &Token) -> bool {
    token.kind == TokenKind::RightBrace
}

/// Keywords a statement-level resynchronization stops in front of
fn is_statement_boundary(token: &Token) -> bool {
    match token.kind {
        TokenKind::Keyword(keyword) => {
            matches!(
                keyword,
                Keyword::Begin | Keyword::End | Keyword::Until | Keyword::Var
            ) || keyword.is_declaration_boundary()
        }
        TokenKind::RightBrace => true,
        _ => false,
    }
}

/// Skip to the next statement boundary: past a `;`, or in front of
/// BEGIN/END/UNTIL/VAR, a declaration keyword or a closing brace
pub fn synchronize_statement(parser: &mut dyn Parser) {
    let start = parser.position();
    loop {
        let token = parser.peek();
        if token.kind == TokenKind::Eof || is_statement_boundary(token) {
            break;
        }
        if token.kind == TokenKind::Semicolon {
            parser.advance();
            break;
        }
        parser.advance();
    }
    if parser.position() > start {
        parser.record_skipped(start, "statement recovery");
    }
}

/// A section keyword at the object body's depth; `CODE` only counts when its
/// brace follows, since `Code` is also a type name
pub fn at_section_start(parser: &dyn Parser) -> bool {
    match parser.peek().kind {
        TokenKind::Keyword(Keyword::Code) => parser.check_next(TokenKind::LeftBrace),
        TokenKind::Keyword(keyword) => keyword.is_section(),
        _ => false,
    }
}

/// Skip to the next section keyword or the object's closing brace, both at
/// `object_depth`
pub fn synchronize_section(parser: &mut dyn Parser, object_depth: usize, reason: &str) {
    let start = parser.position();
    while !parser.is_at_end() {
        let depth = parser.brace_depth();
        if depth <= object_depth
            && (parser.peek().kind == TokenKind::RightBrace || at_section_start(parser))
        {
            break;
        }
        parser.advance();
    }
    if parser.position() > start {
        log_debug!("Skipped to section boundary",
            "reason" => reason,
            "tokens" => parser.position() - start
        );
        parser.record_skipped(start, reason);
    }
}

/// Documentation trigger `BEGIN END.` closing a CODE section
pub fn at_documentation_trigger(parser: &dyn Parser) -> bool {
    parser.peek().is_keyword(Keyword::Begin)
        && parser.peek_ahead(1).is_keyword(Keyword::End)
        && parser.peek_ahead(2).kind == TokenKind::Dot
}

/// Skip to the next declaration inside a CODE section: a PROCEDURE,
/// FUNCTION, LOCAL, TRIGGER or EVENT keyword, the documentation trigger or
/// the section's closing brace
pub fn synchronize_declaration(parser: &mut dyn Parser, code_depth: usize) {
    let start = parser.position();
    while !parser.is_at_end() {
        let token = parser.peek();
        let at_code_depth = parser.brace_depth() <= code_depth;
        let boundary = match token.kind {
            TokenKind::Keyword(keyword) => keyword.is_declaration_boundary(),
            TokenKind::RightBrace => at_code_depth,
            _ => false,
        };
        if boundary || at_documentation_trigger(parser) {
            break;
        }
        parser.advance();
    }
    if parser.position() > start {
        parser.record_skipped(start, "declaration recovery");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::builders::atomic::expect;
    use crate::lexical::tokenize;
    use crate::syntax::{CalParser, SyntaxError};

    fn parser_for(source: &str) -> CalParser {
        CalParser::new(tokenize(source).expect("tokenize"))
    }

    #[test]
    fn test_recovery_skips_to_semicolon() {
        let mut parser = parser_for("A = 1 2 3; B = 4;");
        let result: Option<()> = parse_with_recovery(&mut parser, &[TokenKind::Semicolon], |p| {
            Err(SyntaxError::expected("value", p.peek()))
        });

        assert!(result.is_none());
        assert_eq!(parser.peek().text, "B");
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.skipped_regions().len(), 1);
    }

    #[test]
    fn test_recovery_consumes_the_items_own_braces() {
        let mut parser = parser_for("{ 1 ; ; broken { x } } { 2 }");
        let result = parse_with_recovery(&mut parser, &[TokenKind::LeftBrace], |p| {
            expect(p, TokenKind::LeftBrace)?;
            expect(p, TokenKind::Semicolon)
        });

        assert!(result.is_none());
        assert!(parser.peek().is(TokenKind::LeftBrace));
        assert_eq!(parser.brace_depth(), 0);
    }

    #[test]
    fn test_recovery_stops_at_enclosing_brace() {
        let mut parser = parser_for("{ x }");
        parser.advance();
        parser.advance();
        let result: Option<()> =
            parse_with_recovery(&mut parser, &[TokenKind::Semicolon], |p| {
                Err(SyntaxError::expected("';'", p.peek()))
            });

        assert!(result.is_none());
        assert!(parser.peek().is(TokenKind::RightBrace));
    }

    #[test]
    fn test_statement_sync_stops_before_end() {
        let mut parser = parser_for("x y z END");
        synchronize_statement(&mut parser);
        assert!(parser.peek().is_keyword(Keyword::End));

        let mut parser = parser_for("x y; z");
        synchronize_statement(&mut parser);
        assert_eq!(parser.peek().text, "z");
    }

    #[test]
    fn test_section_sync_ignores_code_type_name() {
        let mut parser = parser_for("x : Code 20 ; KEYS { }");
        synchronize_section(&mut parser, 0, "test");
        assert!(parser.peek().is_keyword(Keyword::Keys));
    }

    #[test]
    fn test_declaration_sync_stops_at_procedure() {
        let mut parser = parser_for("garbage ( ; LOCAL PROCEDURE Foo@1();");
        synchronize_declaration(&mut parser, 0);
        assert!(parser.peek().is_keyword(Keyword::Local));
    }
}
