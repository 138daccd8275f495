//! Expression builders
//!
//! Precedence climbing, lowest to highest:
//!
//! ```text
//! OR XOR  >  AND  >  = <>  >  < <= > >= IN  >  + -  >  * / DIV MOD  >  NOT -  >  postfix
//! ```
//!
//! Operator keywords are matched case-insensitively by the lexer, so
//! `x and y` and `X AND Y` produce the same node.

use crate::grammar::ast::nodes::*;
use crate::grammar::builders::atomic::{
    advance_if, check, expect, integer_value, nested, report, Parser,
};
use crate::grammar::keywords::Keyword;
use crate::syntax::{SyntaxError, SyntaxResult};
use crate::tokens::{Token, TokenKind};

/// Parse a full expression
pub fn parse_expression(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    nested(parser, |parser| {
        let condition = parse_or(parser)?;
        if check(parser, TokenKind::Question) {
            return parse_ternary(parser, condition);
        }
        Ok(condition)
    })
}

/// `cond ? a : b` is AL syntax; record it, consume both branches and keep
/// the condition so the statement around it still parses
fn parse_ternary(parser: &mut dyn Parser, condition: Expression) -> SyntaxResult<Expression> {
    let question = parser.advance();
    report(
        parser,
        SyntaxError::al_only(
            "The ternary operator '?'",
            "IF ... THEN ... ELSE",
            question.span,
        ),
    );
    parse_or(parser)?;
    if advance_if(parser, TokenKind::Colon).is_some() {
        parse_or(parser)?;
    }
    Ok(condition)
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let span = left.span().merge(right.span());
    Expression::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

fn parse_or(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_and(parser)?;
    loop {
        let operator = match parser.peek().kind {
            TokenKind::Keyword(Keyword::Or) => BinaryOperator::Or,
            TokenKind::Keyword(Keyword::Xor) => BinaryOperator::Xor,
            _ => break,
        };
        parser.advance();
        let right = parse_and(parser)?;
        left = binary(operator, left, right);
    }
    Ok(left)
}

fn parse_and(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_equality(parser)?;
    while check(parser, TokenKind::Keyword(Keyword::And)) {
        parser.advance();
        let right = parse_equality(parser)?;
        left = binary(BinaryOperator::And, left, right);
    }
    Ok(left)
}

fn parse_equality(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_relational(parser)?;
    loop {
        let operator = match parser.peek().kind {
            TokenKind::Equal => BinaryOperator::Equal,
            TokenKind::NotEqual => BinaryOperator::NotEqual,
            _ => break,
        };
        parser.advance();
        let right = parse_relational(parser)?;
        left = binary(operator, left, right);
    }
    Ok(left)
}

fn parse_relational(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_additive(parser)?;
    loop {
        let operator = match parser.peek().kind {
            TokenKind::Less => BinaryOperator::Less,
            TokenKind::LessEqual => BinaryOperator::LessEqual,
            TokenKind::Greater => BinaryOperator::Greater,
            TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
            TokenKind::Keyword(Keyword::In) => BinaryOperator::In,
            _ => break,
        };
        parser.advance();
        let right = if operator == BinaryOperator::In && check(parser, TokenKind::LeftBracket) {
            parse_set_literal(parser)?
        } else {
            parse_additive(parser)?
        };
        left = binary(operator, left, right);
    }
    Ok(left)
}

fn parse_additive(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_multiplicative(parser)?;
    loop {
        let operator = match parser.peek().kind {
            TokenKind::Plus => BinaryOperator::Add,
            TokenKind::Minus => BinaryOperator::Subtract,
            _ => break,
        };
        parser.advance();
        let right = parse_multiplicative(parser)?;
        left = binary(operator, left, right);
    }
    Ok(left)
}

fn parse_multiplicative(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let mut left = parse_unary(parser)?;
    loop {
        let operator = match parser.peek().kind {
            TokenKind::Multiply => BinaryOperator::Multiply,
            TokenKind::Divide => BinaryOperator::Divide,
            TokenKind::Keyword(Keyword::Div) => BinaryOperator::IntegerDivide,
            TokenKind::Keyword(Keyword::Mod) => BinaryOperator::Modulo,
            _ => break,
        };
        parser.advance();
        let right = parse_unary(parser)?;
        left = binary(operator, left, right);
    }
    Ok(left)
}

fn parse_unary(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let operator = match parser.peek().kind {
        TokenKind::Keyword(Keyword::Not) => UnaryOperator::Not,
        TokenKind::Minus => UnaryOperator::Negate,
        TokenKind::Plus => UnaryOperator::Plus,
        _ => return parse_postfix(parser),
    };
    let operator_token = parser.advance();
    let operand = nested(parser, parse_unary)?;
    let span = operator_token.span.merge(operand.span());
    Ok(Expression::Unary {
        operator,
        operand: Box::new(operand),
        span,
    })
}

/// Primary expression followed by any chain of `.member`, `::value`,
/// `(args)` and `[indices]`
pub fn parse_postfix(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let start = parser.position();
    let mut expression = parse_primary(parser)?;
    loop {
        match parser.peek().kind {
            TokenKind::Dot => {
                parser.advance();
                let member = expect_member(parser, "member name after '.'")?;
                expression = Expression::MemberAccess {
                    object: Box::new(expression),
                    member,
                    scope: false,
                    span: parser.span_from(start),
                };
            }
            TokenKind::DoubleColon => {
                parser.advance();
                let member = expect_member(parser, "option value after '::'")?;
                expression = Expression::MemberAccess {
                    object: Box::new(expression),
                    member,
                    scope: true,
                    span: parser.span_from(start),
                };
            }
            TokenKind::LeftParen => {
                parser.advance();
                let arguments = parse_expression_list(parser, TokenKind::RightParen)?;
                expect(parser, TokenKind::RightParen)?;
                expression = Expression::Call {
                    callee: Box::new(expression),
                    arguments,
                    span: parser.span_from(start),
                };
            }
            TokenKind::LeftBracket => {
                parser.advance();
                let indices = parse_expression_list(parser, TokenKind::RightBracket)?;
                expect(parser, TokenKind::RightBracket)?;
                expression = Expression::ArrayAccess {
                    array: Box::new(expression),
                    indices,
                    span: parser.span_from(start),
                };
            }
            _ => break,
        }
    }
    Ok(expression)
}

/// Name after `.` or `::`; keywords and quoted names are accepted, as is a
/// quoted string for option values such as `Type::" "`
fn expect_member(parser: &mut dyn Parser, expected: &'static str) -> SyntaxResult<String> {
    let token = parser.peek();
    match token.kind {
        TokenKind::Identifier
        | TokenKind::QuotedIdentifier
        | TokenKind::Keyword(_)
        | TokenKind::String
        | TokenKind::Integer => Ok(parser.advance().value()),
        _ => Err(SyntaxError::expected(expected, token)),
    }
}

/// Comma-separated expressions up to (not including) `close`
fn parse_expression_list(
    parser: &mut dyn Parser,
    close: TokenKind,
) -> SyntaxResult<Vec<Expression>> {
    let mut items = Vec::new();
    if check(parser, close) {
        return Ok(items);
    }
    loop {
        items.push(parse_expression(parser)?);
        if advance_if(parser, TokenKind::Comma).is_none() {
            break;
        }
    }
    Ok(items)
}

/// Keywords that can never begin an operand
fn ends_expression(keyword: Keyword) -> bool {
    keyword.is_statement()
        || keyword.is_word_operator()
        || keyword.is_declaration_boundary()
        || matches!(keyword, Keyword::Var)
}

fn parse_primary(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let token = parser.peek().clone();
    match token.kind {
        TokenKind::Integer => {
            parser.advance();
            let value = integer_value(parser, &token);
            Ok(literal(&token, LiteralKind::Integer, LiteralValue::Integer(value)))
        }
        TokenKind::Decimal => {
            parser.advance();
            let value = token.text.parse::<f64>().unwrap_or_default();
            Ok(literal(&token, LiteralKind::Decimal, LiteralValue::Decimal(value)))
        }
        TokenKind::String => {
            parser.advance();
            Ok(literal(&token, LiteralKind::String, LiteralValue::Text(token.value())))
        }
        TokenKind::Date => {
            parser.advance();
            Ok(temporal_literal(&token, LiteralKind::Date, 1))
        }
        TokenKind::Time => {
            parser.advance();
            Ok(temporal_literal(&token, LiteralKind::Time, 1))
        }
        TokenKind::DateTime => {
            parser.advance();
            Ok(temporal_literal(&token, LiteralKind::DateTime, 2))
        }
        TokenKind::Keyword(Keyword::True) | TokenKind::Keyword(Keyword::False) => {
            parser.advance();
            let value = token.is_keyword(Keyword::True);
            Ok(literal(&token, LiteralKind::Boolean, LiteralValue::Boolean(value)))
        }
        TokenKind::LeftParen => {
            parser.advance();
            let inner = parse_expression(parser)?;
            expect(parser, TokenKind::RightParen)?;
            Ok(inner)
        }
        TokenKind::LeftBracket => parse_set_literal(parser),
        TokenKind::Identifier | TokenKind::QuotedIdentifier => {
            parser.advance();
            Ok(Expression::Identifier {
                name: token.value(),
                span: token.span,
            })
        }
        TokenKind::Keyword(keyword) if !ends_expression(keyword) => {
            parser.advance();
            Ok(Expression::Identifier {
                name: token.text.clone(),
                span: token.span,
            })
        }
        _ => Err(SyntaxError::expected("expression", &token)),
    }
}

fn literal(token: &Token, literal: LiteralKind, value: LiteralValue) -> Expression {
    Expression::Literal {
        literal,
        raw: token.text.clone(),
        value,
        span: token.span,
    }
}

/// Date/time literal; the value is the text without its `D`/`T`/`DT` suffix
fn temporal_literal(token: &Token, kind: LiteralKind, suffix_len: usize) -> Expression {
    let digits_end = token.text.len().saturating_sub(suffix_len);
    let digits = token.text.get(..digits_end).unwrap_or_default().to_string();
    literal(token, kind, LiteralValue::Text(digits))
}

/// `[]`, `[a, b..c, ..d, e..]`
pub fn parse_set_literal(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let start = parser.position();
    expect(parser, TokenKind::LeftBracket)?;
    let mut elements = Vec::new();
    if !check(parser, TokenKind::RightBracket) {
        loop {
            elements.push(parse_range_or_expression(parser)?);
            if advance_if(parser, TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    expect(parser, TokenKind::RightBracket)?;
    Ok(Expression::Set {
        elements,
        span: parser.span_from(start),
    })
}

/// An expression, or a closed or open-ended range built around `..`
pub fn parse_range_or_expression(parser: &mut dyn Parser) -> SyntaxResult<Expression> {
    let start = parser.position();
    if advance_if(parser, TokenKind::DotDot).is_some() {
        let end = parse_expression(parser)?;
        return Ok(Expression::Range {
            start: None,
            end: Some(Box::new(end)),
            span: parser.span_from(start),
        });
    }

    let first = parse_expression(parser)?;
    if advance_if(parser, TokenKind::DotDot).is_none() {
        return Ok(first);
    }
    let end = if range_end_follows(parser) {
        Some(Box::new(parse_expression(parser)?))
    } else {
        None
    };
    Ok(Expression::Range {
        start: Some(Box::new(first)),
        end,
        span: parser.span_from(start),
    })
}

fn range_end_follows(parser: &dyn Parser) -> bool {
    !matches!(
        parser.peek().kind,
        TokenKind::Comma | TokenKind::RightBracket | TokenKind::Colon | TokenKind::Eof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use crate::syntax::CalParser;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> (Expression, CalParser) {
        let mut parser = CalParser::new(tokenize(source).expect("tokenize"));
        let expression = parse_expression(&mut parser).expect("expression");
        (expression, parser)
    }

    fn operator_of(expression: &Expression) -> BinaryOperator {
        match expression {
            Expression::Binary { operator, .. } => *operator,
            other => panic!("expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_word_operators_are_case_insensitive() {
        for source in ["x and y", "X AND Y", "X And Y"] {
            let (expression, _) = parse(source);
            assert_eq!(operator_of(&expression), BinaryOperator::And);
            assert_eq!(operator_of(&expression).as_str(), "AND");
        }
    }

    #[test]
    fn test_precedence_multiplication_binds_tighter() {
        let (expression, _) = parse("a + b * c");
        assert_matches!(
            &expression,
            Expression::Binary { operator: BinaryOperator::Add, right, .. }
                if operator_of(right) == BinaryOperator::Multiply
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let (expression, _) = parse("a OR b AND c");
        assert_matches!(
            &expression,
            Expression::Binary { operator: BinaryOperator::Or, right, .. }
                if operator_of(right) == BinaryOperator::And
        );
    }

    #[test]
    fn test_in_with_set_literal() {
        let (expression, _) = parse("x IN [1,5..10,20]");
        let Expression::Binary { operator, right, .. } = expression else {
            panic!("expected IN expression");
        };
        assert_eq!(operator, BinaryOperator::In);

        let Expression::Set { elements, .. } = *right else {
            panic!("expected set literal");
        };
        assert_eq!(elements.len(), 3);
        assert_matches!(
            &elements[0],
            Expression::Literal { value: LiteralValue::Integer(1), .. }
        );
        assert_matches!(
            &elements[1],
            Expression::Range { start: Some(_), end: Some(_), .. }
        );
        assert_matches!(
            &elements[2],
            Expression::Literal { value: LiteralValue::Integer(20), .. }
        );
    }

    #[test]
    fn test_empty_set() {
        let (expression, _) = parse("x IN []");
        assert_matches!(
            expression,
            Expression::Binary { right, .. }
                if matches!(*right, Expression::Set { ref elements, .. } if elements.is_empty())
        );
    }

    #[test]
    fn test_open_ended_ranges() {
        let (expression, _) = parse("x IN [..5, 10..]");
        let Expression::Binary { right, .. } = expression else {
            panic!("expected IN expression");
        };
        let Expression::Set { elements, .. } = *right else {
            panic!("expected set literal");
        };
        assert_matches!(&elements[0], Expression::Range { start: None, end: Some(_), .. });
        assert_matches!(&elements[1], Expression::Range { start: Some(_), end: None, .. });
    }

    #[test]
    fn test_postfix_chain() {
        let (expression, _) = parse("Cust.GET(\"No.\", 1).Name[2, 3]");
        let Expression::ArrayAccess { array, indices, .. } = expression else {
            panic!("expected array access");
        };
        assert_eq!(indices.len(), 2);
        assert_matches!(
            *array,
            Expression::MemberAccess { ref member, scope: false, .. } if member == "Name"
        );
    }

    #[test]
    fn test_option_scope_access() {
        let (expression, _) = parse("Status::Released");
        assert_matches!(
            expression,
            Expression::MemberAccess { ref member, scope: true, .. } if member == "Released"
        );

        let (quoted, _) = parse("Type::\" \"");
        assert_matches!(
            quoted,
            Expression::MemberAccess { ref member, scope: true, .. } if member == " "
        );
    }

    #[test]
    fn test_scope_access_requires_a_name() {
        let mut parser = CalParser::new(tokenize("Status::;").unwrap());
        assert!(parse_expression(&mut parser).is_err());
    }

    #[test]
    fn test_keywords_as_identifiers_in_expressions() {
        let (expression, _) = parse("PAGE.RUNMODAL(21, Cust)");
        let Expression::Call { callee, arguments, .. } = expression else {
            panic!("expected call");
        };
        assert_eq!(arguments.len(), 2);
        assert_matches!(
            *callee,
            Expression::MemberAccess { ref object, .. }
                if matches!(**object, Expression::Identifier { ref name, .. } if name == "PAGE")
        );
    }

    #[test]
    fn test_literals_keep_raw_text_and_value() {
        let (date, _) = parse("010124D");
        assert_matches!(
            date,
            Expression::Literal { literal: LiteralKind::Date, ref raw, value: LiteralValue::Text(ref digits), .. }
                if raw == "010124D" && digits == "010124"
        );

        let (text, _) = parse("'It''s'");
        assert_matches!(
            text,
            Expression::Literal { value: LiteralValue::Text(ref value), .. } if value == "It's"
        );

        let (flag, _) = parse("true");
        assert_matches!(flag, Expression::Literal { value: LiteralValue::Boolean(true), .. });
    }

    #[test]
    fn test_unary_operators() {
        let (expression, _) = parse("NOT -x");
        assert_matches!(
            expression,
            Expression::Unary { operator: UnaryOperator::Not, ref operand, .. }
                if matches!(**operand, Expression::Unary { operator: UnaryOperator::Negate, .. })
        );
    }

    #[test]
    fn test_ternary_is_reported_and_consumed() {
        let (expression, parser) = parse("a ? b : c");
        assert_matches!(expression, Expression::Identifier { ref name, .. } if name == "a");
        assert!(parser.is_at_end());
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E060");
    }

    #[test]
    fn test_span_covers_whole_expression() {
        let source = "a + b * c";
        let (expression, _) = parse(source);
        assert_eq!(expression.span().slice(source), source);
    }

    #[test]
    fn test_deep_nesting_hits_depth_limit() {
        let source = format!("{}x{}", "(".repeat(5000), ")".repeat(5000));
        let mut parser = CalParser::new(tokenize(&source).unwrap());
        let result = parse_expression(&mut parser);
        assert_matches!(result, Err(SyntaxError::MaxRecursionDepth { .. }));
        assert_eq!(parser.nesting_depth(), 0);
    }
}
