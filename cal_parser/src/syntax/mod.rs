//! Syntax analysis: token sequence to syntax tree
//!
//! [`CalParser`] drives the grammar builders over one document. Parsing
//! never fails as a whole; malformed constructs become [`ParseError`]
//! diagnostics on the [`ParseOutput`] and the tree keeps whatever parsed.

mod error;
mod parser;

pub use crate::grammar::ast::nodes::Document;
pub use error::{
    ParseError, ParseOutput, ParseReport, SkippedRegion, SyntaxError, SyntaxResult,
    TokenDescription,
};
pub use parser::CalParser;

use crate::tokens::Token;
use crate::log_debug;

/// Parse a token sequence produced by `lexical::tokenize`
pub fn parse_tokens(tokens: Vec<Token>) -> ParseOutput {
    log_debug!("Starting syntax analysis", "tokens" => tokens.len());
    CalParser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::ast::nodes::*;
    use crate::lexical::tokenize;
    use assert_matches::assert_matches;

    #[test]
    fn test_set_literal_in_condition() {
        let source = "OBJECT Codeunit 1 T
            {
              CODE
              {
                PROCEDURE P@1();
                BEGIN
                  IF x IN [1,5..10,20] THEN
                    EXIT;
                END;

                BEGIN
                END.
              }
            }";
        let output = parse_tokens(tokenize(source).unwrap());
        assert!(output.errors.is_empty());

        let code = output.document.object.unwrap().code.unwrap();
        let Statement::If { condition, .. } = &code.procedures[0].body[0] else {
            panic!("expected IF statement");
        };
        let Expression::Binary {
            operator: BinaryOperator::In,
            right,
            ..
        } = condition
        else {
            panic!("expected IN expression");
        };
        let Expression::Set { elements, .. } = right.as_ref() else {
            panic!("expected set literal");
        };
        assert_eq!(elements.len(), 3);
        assert_matches!(&elements[0], Expression::Literal { raw, .. } if raw == "1");
        assert_matches!(
            &elements[1],
            Expression::Range {
                start: Some(_),
                end: Some(_),
                ..
            }
        );
        assert_matches!(&elements[2], Expression::Literal { raw, .. } if raw == "20");
    }

    #[test]
    fn test_empty_set_literal() {
        let source = "OBJECT Codeunit 1 T { CODE { PROCEDURE P@1(); BEGIN b := x IN []; END; BEGIN END. } }";
        let output = parse_tokens(tokenize(source).unwrap());
        let code = output.document.object.unwrap().code.unwrap();
        assert_matches!(
            &code.procedures[0].body[0],
            Statement::Assignment {
                value: Expression::Binary { right, .. },
                ..
            } if matches!(right.as_ref(), Expression::Set { elements, .. } if elements.is_empty())
        );
    }

    #[test]
    fn test_report_serializes_document_and_errors() {
        let output = parse_tokens(tokenize("OBJECT Table 18 Customer { FIELDS { { 1 ;;No. ;Code20 } } }").unwrap());
        let json = serde_json::to_value(output.report()).unwrap();
        assert_eq!(json["document"]["object"]["kind"], "Table");
        assert_eq!(json["document"]["object"]["fields"][0]["name"], "No.");
        assert_eq!(json["errors"], serde_json::json!([]));
    }
}
