//! Statement builders
//!
//! Clauses the language allows to be empty (`IF x THEN;`, `WHILE x DO;`,
//! `1: ;` in a CASE) produce `Statement::Empty` instead of an error.

use crate::grammar::ast::nodes::*;
use crate::grammar::builders::atomic::{
    advance_if, advance_if_keyword, check, expect, expect_keyword, nested, report, Parser,
};
use crate::grammar::builders::expressions::{
    parse_expression, parse_postfix, parse_range_or_expression,
};
use crate::grammar::builders::helpers::synchronize_statement;
use crate::grammar::keywords::Keyword;
use crate::syntax::{SyntaxError, SyntaxResult};
use crate::tokens::{Token, TokenKind};
use crate::utils::Span;

/// Tokens that close a statement list without belonging to it
fn ends_statement_list(token: &Token) -> bool {
    match token.kind {
        TokenKind::Keyword(Keyword::End) | TokenKind::Keyword(Keyword::Until) => true,
        TokenKind::Keyword(keyword) => keyword.is_declaration_boundary(),
        TokenKind::RightBrace | TokenKind::Eof => true,
        _ => false,
    }
}

/// Tokens that close a branch, leaving it empty
fn ends_branch(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Semicolon
            | TokenKind::Keyword(Keyword::Else)
            | TokenKind::Keyword(Keyword::End)
            | TokenKind::Keyword(Keyword::Until)
            | TokenKind::RightBrace
            | TokenKind::Eof
    )
}

/// Statements separated by `;` up to END, UNTIL, a declaration keyword or a
/// closing brace, none of which is consumed.
///
/// A statement that fails is recorded and skipped; the list carries on with
/// the next one.
pub fn parse_statement_list(parser: &mut dyn Parser) -> Vec<Statement> {
    let mut statements = Vec::new();
    loop {
        if ends_statement_list(parser.peek()) {
            break;
        }
        if let Some(semicolon) = advance_if(parser, TokenKind::Semicolon) {
            statements.push(Statement::Empty {
                span: semicolon.span,
            });
            continue;
        }

        let before = parser.position();
        match parse_statement(parser) {
            Ok(statement) => {
                statements.push(statement);
                if advance_if(parser, TokenKind::Semicolon).is_none()
                    && !ends_statement_list(parser.peek())
                {
                    let error = SyntaxError::missing_delimiter(";", parser.peek());
                    report(parser, error);
                }
            }
            Err(error) => {
                report(parser, error);
                synchronize_statement(parser);
                if parser.position() == before && !ends_statement_list(parser.peek()) {
                    parser.advance();
                    parser.record_skipped(before, "statement recovery");
                }
            }
        }
    }
    statements
}

/// `BEGIN statements END`, the END included
pub fn parse_block(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Begin)?;
    let statements = parse_statement_list(parser);
    expect_keyword(parser, Keyword::End)?;
    Ok(Statement::Block {
        statements,
        span: parser.span_from(start),
    })
}

/// Body of a trigger or procedure: the statements of its BEGIN..END block
pub fn parse_body(parser: &mut dyn Parser) -> SyntaxResult<Vec<Statement>> {
    match parse_block(parser)? {
        Statement::Block { statements, .. } => Ok(statements),
        other => Ok(vec![other]),
    }
}

pub fn parse_statement(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    nested(parser, parse_statement_kind)
}

fn parse_statement_kind(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let token = parser.peek();
    match token.kind {
        TokenKind::Keyword(Keyword::Begin) => parse_block(parser),
        TokenKind::Keyword(Keyword::If) => parse_if(parser),
        TokenKind::Keyword(Keyword::While) => parse_while(parser),
        TokenKind::Keyword(Keyword::Repeat) => parse_repeat(parser),
        TokenKind::Keyword(Keyword::For) => parse_for(parser),
        TokenKind::Keyword(Keyword::Case) => parse_case(parser),
        TokenKind::Keyword(Keyword::Exit) => parse_exit(parser),
        TokenKind::Keyword(Keyword::With) => parse_with(parser),
        TokenKind::Keyword(Keyword::Break) => {
            let token = parser.advance();
            Ok(Statement::Break { span: token.span })
        }
        TokenKind::PreprocessorDirective => {
            let directive = parser.advance();
            report(
                parser,
                SyntaxError::al_only(
                    "Preprocessor directive",
                    "a separate object version",
                    directive.span,
                ),
            );
            Ok(Statement::Empty {
                span: directive.span,
            })
        }
        TokenKind::Keyword(keyword) if keyword.is_statement() => {
            Err(SyntaxError::expected("statement", token))
        }
        _ => parse_assignment_or_call(parser),
    }
}

/// A branch body, or an empty statement when the branch has none
fn parse_branch(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    if ends_branch(parser.peek()) {
        return Ok(Statement::Empty {
            span: Span::point(parser.peek().span.start),
        });
    }
    parse_statement(parser)
}

fn parse_if(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::If)?;
    let condition = parse_expression(parser)?;
    expect_keyword(parser, Keyword::Then)?;
    let then_branch = parse_branch(parser)?;
    let else_branch = if advance_if_keyword(parser, Keyword::Else) {
        Some(Box::new(parse_branch(parser)?))
    } else {
        None
    };
    Ok(Statement::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch,
        span: parser.span_from(start),
    })
}

fn parse_while(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::While)?;
    let condition = parse_expression(parser)?;
    expect_keyword(parser, Keyword::Do)?;
    let body = parse_branch(parser)?;
    Ok(Statement::While {
        condition,
        body: Box::new(body),
        span: parser.span_from(start),
    })
}

fn parse_repeat(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Repeat)?;
    let body = parse_statement_list(parser);
    expect_keyword(parser, Keyword::Until)?;
    let condition = parse_expression(parser)?;
    Ok(Statement::Repeat {
        body,
        condition,
        span: parser.span_from(start),
    })
}

fn parse_for(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::For)?;

    let variable = match parse_postfix(parser)? {
        target @ Expression::Identifier { .. } => target,
        target @ Expression::MemberAccess { scope: false, .. } => target,
        other => {
            let span = other.span();
            report(parser, SyntaxError::InvalidForTarget { span });
            Expression::placeholder(span)
        }
    };

    expect(parser, TokenKind::Assign)?;
    let from = parse_expression(parser)?;
    let direction = if advance_if_keyword(parser, Keyword::To) {
        ForDirection::To
    } else if advance_if_keyword(parser, Keyword::DownTo) {
        ForDirection::DownTo
    } else {
        return Err(SyntaxError::expected("TO or DOWNTO", parser.peek()));
    };
    let to = parse_expression(parser)?;
    expect_keyword(parser, Keyword::Do)?;
    let body = parse_branch(parser)?;

    Ok(Statement::For {
        variable,
        from,
        to,
        direction,
        body: Box::new(body),
        span: parser.span_from(start),
    })
}

fn parse_case(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Case)?;
    let expression = parse_expression(parser)?;
    expect_keyword(parser, Keyword::Of)?;

    let mut branches = Vec::new();
    loop {
        let token = parser.peek();
        if token.is_keyword(Keyword::Else) || ends_statement_list(token) {
            break;
        }
        if advance_if(parser, TokenKind::Semicolon).is_some() {
            continue;
        }

        let before = parser.position();
        match parse_case_branch(parser) {
            Ok(branch) => {
                branches.push(branch);
                if advance_if(parser, TokenKind::Semicolon).is_none()
                    && !check(parser, TokenKind::Keyword(Keyword::Else))
                    && !ends_statement_list(parser.peek())
                {
                    let error = SyntaxError::missing_delimiter(";", parser.peek());
                    report(parser, error);
                }
            }
            Err(error) => {
                report(parser, error);
                synchronize_statement(parser);
                if parser.position() == before && !ends_statement_list(parser.peek()) {
                    parser.advance();
                    parser.record_skipped(before, "case branch recovery");
                }
            }
        }
    }

    let else_branch = if advance_if_keyword(parser, Keyword::Else) {
        Some(parse_statement_list(parser))
    } else {
        None
    };
    expect_keyword(parser, Keyword::End)?;

    Ok(Statement::Case {
        expression,
        branches,
        else_branch,
        span: parser.span_from(start),
    })
}

fn parse_case_branch(parser: &mut dyn Parser) -> SyntaxResult<CaseBranch> {
    let start = parser.position();
    let mut values = vec![parse_range_or_expression(parser)?];
    while advance_if(parser, TokenKind::Comma).is_some() {
        values.push(parse_range_or_expression(parser)?);
    }
    expect(parser, TokenKind::Colon)?;
    let statement = parse_branch(parser)?;
    Ok(CaseBranch {
        values,
        statement,
        span: parser.span_from(start),
    })
}

fn parse_exit(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Exit)?;
    let mut value = None;
    if advance_if(parser, TokenKind::LeftParen).is_some() {
        if !check(parser, TokenKind::RightParen) {
            value = Some(parse_expression(parser)?);
        }
        expect(parser, TokenKind::RightParen)?;
    }
    Ok(Statement::Exit {
        value,
        span: parser.span_from(start),
    })
}

fn parse_with(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    expect_keyword(parser, Keyword::With)?;
    let record = parse_expression(parser)?;
    expect_keyword(parser, Keyword::Do)?;
    let body = parse_branch(parser)?;
    Ok(Statement::With {
        record,
        body: Box::new(body),
        span: parser.span_from(start),
    })
}

fn assignment_operator(kind: TokenKind) -> Option<AssignmentOperator> {
    match kind {
        TokenKind::Assign => Some(AssignmentOperator::Assign),
        TokenKind::PlusAssign => Some(AssignmentOperator::AddAssign),
        TokenKind::MinusAssign => Some(AssignmentOperator::SubtractAssign),
        TokenKind::MultiplyAssign => Some(AssignmentOperator::MultiplyAssign),
        TokenKind::DivideAssign => Some(AssignmentOperator::DivideAssign),
        _ => None,
    }
}

/// `target := value`, a compound assignment, or a bare call
fn parse_assignment_or_call(parser: &mut dyn Parser) -> SyntaxResult<Statement> {
    let start = parser.position();
    let target = parse_postfix(parser)?;

    let Some(operator) = assignment_operator(parser.peek().kind) else {
        let span = target.span();
        return Ok(Statement::Call {
            expression: target,
            span,
        });
    };
    parser.advance();
    let right = parse_expression(parser)?;

    let value = match operator.binary_operator() {
        Some(binary) => {
            let span = target.span().merge(right.span());
            Expression::Binary {
                operator: binary,
                left: Box::new(target.clone()),
                right: Box::new(right),
                span,
            }
        }
        None => right,
    };

    Ok(Statement::Assignment {
        target,
        operator,
        value,
        span: parser.span_from(start),
    })
}
