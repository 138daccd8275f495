//! Object-level builders
//!
//! `OBJECT <kind> <id> <name> { sections }`. Sections are dispatched on
//! their keyword at the object body's brace depth; sections without a tree
//! representation (CONTROLS, ACTIONS, DATAITEMS, ...) are stepped over by
//! brace depth, because their keywords also occur as plain words inside
//! nested property values.

use crate::config::compile_time::syntax::MAX_PROPERTY_NAME_TOKENS;
use crate::grammar::ast::nodes::*;
use crate::grammar::builders::atomic::{
    advance_if, check, check_keyword, collect_raw, expect, expect_keyword, join_tokens,
    parse_integer, report, Parser,
};
use crate::grammar::builders::declarations::{
    parse_code_section, parse_trigger_body, parse_variable_block,
};
use crate::grammar::builders::helpers::{parse_with_recovery, synchronize_section};
use crate::grammar::builders::types::parse_data_type;
use crate::grammar::keywords::Keyword;
use crate::logging::codes;
use crate::syntax::{SyntaxError, SyntaxResult};
use crate::tokens::{Token, TokenKind};
use crate::{log_debug, log_success};

/// Name given to a field whose name column is empty
pub const MISSING_FIELD_NAME: &str = "<missing>";

/// Whole document: at most one object. Never fails; problems end up as
/// diagnostics and the object is `None` when nothing usable was found.
pub fn parse_document(parser: &mut dyn Parser) -> Document {
    let start = parser.position();
    if parser.is_at_end() {
        return Document {
            object: None,
            span: parser.span_from(start),
        };
    }

    let object = match parse_object(parser) {
        Ok(object) => Some(object),
        Err(error) => {
            report(parser, error);
            None
        }
    };

    if !parser.is_at_end() {
        let error = SyntaxError::expected("end of input", parser.peek());
        report(parser, error);
        let trailing = parser.position();
        while !parser.is_at_end() {
            parser.advance();
        }
        parser.record_skipped(trailing, "trailing input");
    }

    Document {
        object,
        span: parser.span_from(start),
    }
}

pub fn parse_object(parser: &mut dyn Parser) -> SyntaxResult<ObjectDeclaration> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Object)?;

    let kind_token = parser.peek().clone();
    let kind = kind_token
        .kind
        .as_keyword()
        .and_then(ObjectKind::from_keyword)
        .ok_or_else(|| SyntaxError::expected("object type", &kind_token))?;
    parser.advance();

    let id = parse_integer(parser)?;
    let name = parse_object_name(parser);
    if name.is_empty() {
        let span = parser.peek().span;
        report(parser, SyntaxError::MissingName { what: "object", span });
    }

    expect(parser, TokenKind::LeftBrace)?;
    let object_depth = parser.brace_depth();

    let mut object = ObjectDeclaration {
        kind,
        id,
        name,
        properties: Vec::new(),
        fields: Vec::new(),
        keys: Vec::new(),
        field_groups: Vec::new(),
        code: None,
        span: parser.span_from(start),
    };
    let mut object_variables = Vec::new();

    loop {
        let before = parser.position();
        let next = parser.peek().kind;
        let outcome = match next {
            TokenKind::Keyword(Keyword::Object) if at_object_properties(parser) => {
                skip_section(parser, object_depth, 3);
                Ok(())
            }
            TokenKind::Keyword(Keyword::Properties) => {
                parse_properties_section(parser).map(|p| object.properties.extend(p))
            }
            TokenKind::Keyword(Keyword::Fields) => {
                parse_fields_section(parser).map(|f| object.fields.extend(f))
            }
            TokenKind::Keyword(Keyword::Keys) => {
                parse_keys_section(parser).map(|k| object.keys.extend(k))
            }
            TokenKind::Keyword(Keyword::FieldGroups) => {
                parse_field_groups_section(parser).map(|g| object.field_groups.extend(g))
            }
            TokenKind::Keyword(Keyword::Code) if parser.check_next(TokenKind::LeftBrace) => {
                parse_code_section(parser).map(|c| object.code = Some(c))
            }
            TokenKind::Keyword(Keyword::Var) => {
                parser.advance();
                object_variables.extend(parse_variable_block(parser));
                Ok(())
            }
            TokenKind::Keyword(keyword) if keyword.is_skipped_section() => {
                skip_section(parser, object_depth, 1);
                Ok(())
            }
            _ => break,
        };

        if let Err(error) = outcome {
            report(parser, error);
            synchronize_section(parser, object_depth, "section recovery");
            if parser.position() == before {
                break;
            }
        }
    }

    if !object_variables.is_empty() {
        let code = object.code.get_or_insert_with(CodeSection::default);
        object_variables.append(&mut code.variables);
        code.variables = object_variables;
    }

    if advance_if(parser, TokenKind::RightBrace).is_none() {
        let error = SyntaxError::expected("'}' closing the object", parser.peek());
        report(parser, error);
    }
    object.span = parser.span_from(start);
    Ok(object)
}

/// `OBJECT-PROPERTIES`, the export's date/time/version block
fn at_object_properties(parser: &dyn Parser) -> bool {
    parser.peek_ahead(1).kind == TokenKind::Minus
        && parser.peek_ahead(2).is_keyword(Keyword::Properties)
}

/// A single quoted name, or every token up to the object's `{`
fn parse_object_name(parser: &mut dyn Parser) -> String {
    if check(parser, TokenKind::QuotedIdentifier) && parser.check_next(TokenKind::LeftBrace) {
        return parser.advance().value();
    }
    let mut tokens = Vec::new();
    while !parser.is_at_end() && !check(parser, TokenKind::LeftBrace) {
        tokens.push(parser.advance());
    }
    join_tokens(&tokens).trim().to_string()
}

/// Step over a section whose heading is `heading_tokens` long, up to the
/// next section keyword or the object's closing brace
fn skip_section(parser: &mut dyn Parser, object_depth: usize, heading_tokens: usize) {
    let start = parser.position();
    let heading: Vec<Token> = (0..heading_tokens).map(|_| parser.advance()).collect();
    let section = join_tokens(&heading);

    synchronize_section(parser, object_depth, "unsupported section");
    log_success!(
        codes::success::SECTION_SKIPPED,
        "Skipped section without tree representation",
        "section" => section,
        "tokens" => parser.position() - start
    );
}

// === PROPERTIES ===

fn parse_properties_section(parser: &mut dyn Parser) -> SyntaxResult<Vec<Property>> {
    expect_keyword(parser, Keyword::Properties)?;
    expect(parser, TokenKind::LeftBrace)?;
    let properties = parse_property_list(parser);
    expect(parser, TokenKind::RightBrace)?;
    Ok(properties)
}

/// `Name=Value;` entries up to the enclosing `}`
pub fn parse_property_list(parser: &mut dyn Parser) -> Vec<Property> {
    let mut properties = Vec::new();
    while !parser.is_at_end() && !check(parser, TokenKind::RightBrace) {
        if advance_if(parser, TokenKind::Semicolon).is_some() {
            continue;
        }
        if let Some(property) =
            parse_with_recovery(parser, &[TokenKind::Semicolon], parse_property)
        {
            properties.push(property);
        }
    }
    properties
}

fn ends_property_name(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::Equal
            | TokenKind::Semicolon
            | TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::Eof
    )
}

/// Property name: one token before `=`, or a short run of words such as
/// `SQL Data Type`
fn parse_property_name(parser: &mut dyn Parser) -> SyntaxResult<String> {
    if parser.check_next(TokenKind::Equal) && !ends_property_name(parser.peek()) {
        return Ok(parser.advance().value());
    }

    let mut length = 0;
    while length < MAX_PROPERTY_NAME_TOKENS && !ends_property_name(parser.peek_ahead(length)) {
        length += 1;
    }
    if length == 0 || parser.peek_ahead(length).kind != TokenKind::Equal {
        return Err(SyntaxError::expected("property name", parser.peek()));
    }

    let tokens: Vec<Token> = (0..length).map(|_| parser.advance()).collect();
    Ok(join_tokens(&tokens))
}

/// A value opening with VAR, or with a BEGIN that ends its line or is
/// directly followed by END. `Description=Begin of period` is plain text.
fn at_trigger_value(parser: &dyn Parser) -> bool {
    if check_keyword(parser, Keyword::Var) {
        return true;
    }
    let begin = parser.peek();
    if !begin.is_keyword(Keyword::Begin) {
        return false;
    }
    let next = parser.peek_ahead(1);
    next.kind == TokenKind::Eof
        || next.is_keyword(Keyword::End)
        || next.span.start.line > begin.span.end.line
}

/// `Name=Value` or `Name=[VAR ...] BEGIN ... END`; the trailing `;` is
/// optional in front of a closing brace
pub fn parse_property(parser: &mut dyn Parser) -> SyntaxResult<Property> {
    let start = parser.position();
    let name = parse_property_name(parser)?;
    expect(parser, TokenKind::Equal)?;

    let mut property = Property {
        name,
        value: String::new(),
        trigger_body: None,
        trigger_variables: Vec::new(),
        span: parser.span_from(start),
    };

    if at_trigger_value(parser) {
        let (variables, body) = parse_trigger_body(parser)?;
        property.trigger_body = Some(body);
        property.trigger_variables = variables;
    } else {
        let tokens = collect_raw(parser, |t| {
            !matches!(t.kind, TokenKind::Semicolon | TokenKind::RightBrace)
        });
        property.value = join_tokens(&tokens);
    }

    property.span = parser.span_from(start);
    advance_if(parser, TokenKind::Semicolon);
    Ok(property)
}

// === FIELDS ===

/// `{ ... }` entries of FIELDS, KEYS or FIELDGROUPS, each parsed by `item`
fn parse_braced_items<T>(
    parser: &mut dyn Parser,
    keyword: Keyword,
    item: fn(&mut dyn Parser) -> SyntaxResult<T>,
) -> SyntaxResult<Vec<T>> {
    expect_keyword(parser, keyword)?;
    expect(parser, TokenKind::LeftBrace)?;

    let mut items = Vec::new();
    loop {
        match parser.peek().kind {
            TokenKind::RightBrace | TokenKind::Eof => break,
            TokenKind::LeftBrace => {
                if let Some(value) = parse_with_recovery(parser, &[TokenKind::LeftBrace], item) {
                    items.push(value);
                }
            }
            _ => {
                let error = SyntaxError::expected("'{'", parser.peek());
                report(parser, error);
                let start = parser.position();
                while !parser.is_at_end()
                    && !check(parser, TokenKind::LeftBrace)
                    && !check(parser, TokenKind::RightBrace)
                {
                    parser.advance();
                }
                parser.record_skipped(start, "stray tokens between entries");
            }
        }
    }

    expect(parser, TokenKind::RightBrace)?;
    Ok(items)
}

fn parse_fields_section(parser: &mut dyn Parser) -> SyntaxResult<Vec<FieldDeclaration>> {
    parse_braced_items(parser, Keyword::Fields, parse_field)
}

/// Tokens of one `;`-separated column, up to but excluding the `;`
fn parse_column(parser: &mut dyn Parser) -> String {
    let tokens = collect_raw(parser, |t| {
        !matches!(t.kind, TokenKind::Semicolon | TokenKind::RightBrace)
    });
    join_tokens(&tokens).trim().to_string()
}

/// `{ FieldNo ; FieldClass ; Name ; DataType [; properties and triggers] }`
pub fn parse_field(parser: &mut dyn Parser) -> SyntaxResult<FieldDeclaration> {
    let start = parser.position();
    expect(parser, TokenKind::LeftBrace)?;

    let field_no = parse_integer(parser)?;
    expect(parser, TokenKind::Semicolon)?;
    let field_class = parse_column(parser);
    expect(parser, TokenKind::Semicolon)?;

    let name_start = parser.peek().span;
    let mut name = if check(parser, TokenKind::QuotedIdentifier)
        && parser.check_next(TokenKind::Semicolon)
    {
        parser.advance().value()
    } else {
        parse_column(parser)
    };
    if name.is_empty() {
        report(
            parser,
            SyntaxError::MissingName {
                what: "field",
                span: name_start,
            },
        );
        name = MISSING_FIELD_NAME.to_string();
    }
    expect(parser, TokenKind::Semicolon)?;

    let data_type = parse_data_type(parser)?;

    let mut properties = Vec::new();
    let mut triggers = Vec::new();
    if advance_if(parser, TokenKind::Semicolon).is_some() {
        for property in parse_property_list(parser) {
            match property.trigger_body {
                Some(body) => triggers.push(TriggerDeclaration {
                    name: property.name,
                    variables: property.trigger_variables,
                    body,
                    span: property.span,
                }),
                None => properties.push(property),
            }
        }
    }

    expect(parser, TokenKind::RightBrace)?;
    log_debug!("Parsed field", "field_no" => field_no, "triggers" => triggers.len());

    Ok(FieldDeclaration {
        field_no,
        field_class,
        name,
        data_type,
        properties,
        triggers,
        span: parser.span_from(start),
    })
}

// === KEYS AND FIELD GROUPS ===

/// Split a column on top-level commas into trimmed, non-empty names
fn split_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut current = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                names.push(join_tokens(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(token.clone());
    }
    names.push(join_tokens(&current));

    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn parse_name_list(parser: &mut dyn Parser) -> Vec<String> {
    let tokens = collect_raw(parser, |t| {
        !matches!(t.kind, TokenKind::Semicolon | TokenKind::RightBrace)
    });
    split_names(&tokens)
}

fn parse_keys_section(parser: &mut dyn Parser) -> SyntaxResult<Vec<KeyDeclaration>> {
    parse_braced_items(parser, Keyword::Keys, parse_key)
}

/// `{ [enabled] ; Field,Field [; properties] }`
pub fn parse_key(parser: &mut dyn Parser) -> SyntaxResult<KeyDeclaration> {
    let start = parser.position();
    expect(parser, TokenKind::LeftBrace)?;
    parse_column(parser);
    expect(parser, TokenKind::Semicolon)?;

    let fields = parse_name_list(parser);
    let properties = if advance_if(parser, TokenKind::Semicolon).is_some() {
        parse_property_list(parser)
    } else {
        Vec::new()
    };

    expect(parser, TokenKind::RightBrace)?;
    Ok(KeyDeclaration {
        fields,
        properties,
        span: parser.span_from(start),
    })
}

fn parse_field_groups_section(
    parser: &mut dyn Parser,
) -> SyntaxResult<Vec<FieldGroupDeclaration>> {
    parse_braced_items(parser, Keyword::FieldGroups, parse_field_group)
}

/// `{ id ; Name ; Field,Field }`
pub fn parse_field_group(parser: &mut dyn Parser) -> SyntaxResult<FieldGroupDeclaration> {
    let start = parser.position();
    expect(parser, TokenKind::LeftBrace)?;
    let id = parse_integer(parser)?;
    expect(parser, TokenKind::Semicolon)?;
    let name = parse_column(parser);
    expect(parser, TokenKind::Semicolon)?;
    let fields = parse_name_list(parser);
    advance_if(parser, TokenKind::Semicolon);
    expect(parser, TokenKind::RightBrace)?;

    Ok(FieldGroupDeclaration {
        id,
        name,
        fields,
        span: parser.span_from(start),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use crate::syntax::CalParser;
    use assert_matches::assert_matches;

    fn parse(source: &str) -> (Document, CalParser) {
        let mut parser = CalParser::new(tokenize(source).expect("tokenize"));
        let document = parse_document(&mut parser);
        (document, parser)
    }

    fn object(document: &Document) -> &ObjectDeclaration {
        document.object.as_ref().expect("object")
    }

    #[test]
    fn test_minimal_table() {
        let (document, parser) = parse("OBJECT Table 50000 Test { FIELDS { { 1;;Name;Text50 } } }");
        let object = object(&document);

        assert_eq!(object.kind, ObjectKind::Table);
        assert_eq!(object.id, 50000);
        assert_eq!(object.name, "Test");
        assert_eq!(object.fields.len(), 1);
        assert_eq!(object.fields[0].name, "Name");
        assert_eq!(object.fields[0].data_type.type_name, "Text50");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_empty_input() {
        let (document, parser) = parse("");
        assert!(document.object.is_none());
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_not_an_object() {
        let (document, parser) = parse("PROCEDURE Foo();");
        assert!(document.object.is_none());
        assert!(!parser.errors().is_empty());
    }

    #[test]
    fn test_multi_word_object_name() {
        let (document, _) = parse("OBJECT Codeunit 80 Sales-Post { }");
        assert_eq!(object(&document).name, "Sales-Post");

        let (document, _) = parse("OBJECT Page 21 Customer Card { }");
        assert_eq!(object(&document).name, "Customer Card");

        let (document, _) = parse("OBJECT Report 206 \"Sales - Invoice\" { }");
        assert_eq!(object(&document).name, "Sales - Invoice");
    }

    #[test]
    fn test_properties_with_trigger() {
        let (document, parser) = parse(
            "OBJECT Codeunit 50000 Runner
             {
               OBJECT-PROPERTIES
               {
                 Date=01.01.18;
                 Time=12:00:00;
               }
               PROPERTIES
               {
                 Permissions=TableData 18=rimd;
                 SQL Data Type=Varchar;
                 CaptionML=[ENU=Runner;DEU=Laeufer];
                 OnRun=VAR
                         Counter@1000 : Integer;
                       BEGIN
                         Counter := 1;
                       END;
                 Description=Last }
             }",
        );
        let object = object(&document);
        let properties = &object.properties;

        assert_eq!(properties.len(), 5);
        assert_eq!(properties[0].name, "Permissions");
        assert_eq!(properties[0].value, "TableData 18=rimd");
        assert_eq!(properties[1].name, "SQL Data Type");
        assert_eq!(properties[2].value, "[ENU=Runner;DEU=Laeufer]");
        assert!(properties[3].is_trigger());
        assert_eq!(properties[3].trigger_variables.len(), 1);
        assert_eq!(properties[4].value, "Last");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_field_with_properties_and_trigger() {
        let (document, parser) = parse(
            "OBJECT Table 18 Customer
             {
               FIELDS
               {
                 { 1   ;   ;No.                 ;Code20        ;CaptionML=ENU=No.;
                                                                OnValidate=BEGIN
                                                                             TestNoSeries;
                                                                           END;

                                                                AltSearchField=Search Name }
                 { 3   ;   ;\"Search Name\"      ;Code50         }
                 { 59  ;FlowField;Balance       ;Decimal       ;FieldClass=FlowField }
               }
             }",
        );
        let fields = &object(&document).fields;

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "No.");
        assert_eq!(fields[0].data_type.length, Some(20));
        assert_eq!(fields[0].properties.len(), 2);
        assert_eq!(fields[0].triggers.len(), 1);
        assert_eq!(fields[0].triggers[0].name, "OnValidate");
        assert_eq!(fields[1].name, "Search Name");
        assert_eq!(fields[2].field_class, "FlowField");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_apostrophe_in_caption_stays_inside_the_field() {
        let (document, parser) = parse(
            "OBJECT Table 50000 Test
             {
               FIELDS
               {
                 { 1 ; ;Name ;Text50 ;CaptionML=ENU=Customer's Name }
                 { 2 ; ;City ;Text30 }
               }
             }",
        );
        let fields = &object(&document).fields;

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].properties[0].value, "ENU=Customer's Name");
        assert_eq!(fields[1].name, "City");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_begin_as_plain_property_text() {
        let (document, parser) = parse(
            "OBJECT Table 50000 Periods
             {
               PROPERTIES
               {
                 Description=Begin of period;
                 OnInsert=BEGIN END;
                 Permissions=TableData 18=r;
               }
               FIELDS
               {
                 { 1 ; ;A ;Integer }
               }
             }",
        );
        let object = object(&document);

        assert_eq!(object.properties.len(), 3);
        assert_eq!(object.properties[0].value, "Begin of period");
        assert!(!object.properties[0].is_trigger());
        assert!(object.properties[1].is_trigger());
        assert_eq!(object.properties[2].value, "TableData 18=r");
        assert_eq!(object.fields.len(), 1);
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_malformed_field_is_skipped() {
        let (document, parser) = parse(
            "OBJECT Table 50000 Test
             {
               FIELDS
               {
                 { 1 ;  ;Name   ;Text50 }
                 { x ;  ;Broken ;Text50 ;Editable=No }
                 { 3 ;  ;City   ;Text30 }
               }
             }",
        );
        let fields = &object(&document).fields;

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name, "City");
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn test_missing_field_name_gets_placeholder() {
        let (document, parser) = parse("OBJECT Table 1 T { FIELDS { { 1 ; ; ;Integer } } }");
        assert_eq!(object(&document).fields[0].name, MISSING_FIELD_NAME);
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E058");
    }

    #[test]
    fn test_keys_and_field_groups() {
        let (document, parser) = parse(
            "OBJECT Table 18 Customer
             {
               KEYS
               {
                 {    ;No.                                     ;Clustered=Yes }
                 {    ;Search Name                              }
                 {    ;Customer Posting Group,Currency Code     }
               }
               FIELDGROUPS
               {
                 { 1   ;DropDown            ;No.,Name,City }
               }
             }",
        );
        let object = object(&document);

        assert_eq!(object.keys.len(), 3);
        assert_eq!(object.keys[0].fields, vec!["No."]);
        assert_eq!(object.keys[0].properties.len(), 1);
        assert_eq!(
            object.keys[2].fields,
            vec!["Customer Posting Group", "Currency Code"]
        );
        assert_eq!(object.field_groups[0].name, "DropDown");
        assert_eq!(object.field_groups[0].fields, vec!["No.", "Name", "City"]);
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_unsupported_sections_are_skipped_by_depth() {
        let (document, parser) = parse(
            "OBJECT Page 21 Customer Card
             {
               PROPERTIES
               {
                 SourceTable=Table18;
               }
               CONTROLS
               {
                 { 1   ;0   ;Container ;
                             ActionList=ACTIONS
                             {
                               { 2 ;1 ;Action ;CaptionML=ENU=Keys }
                             } }
               }
               CODE
               {
                 BEGIN
                 END.
               }
             }",
        );
        let object = object(&document);

        assert_eq!(object.properties.len(), 1);
        assert!(object.code.is_some());
        assert!(parser.errors().is_empty());
        assert_eq!(parser.skipped_regions().len(), 1);
    }

    #[test]
    fn test_object_level_variables_merge_into_code() {
        let (document, _) = parse(
            "OBJECT Codeunit 1 Globals
             {
               VAR
                 Setup@1000 : Record 98;
               CODE
               {
                 VAR
                   Counter@1001 : Integer;

                 BEGIN
                 END.
               }
             }",
        );
        let code = object(&document).code.as_ref().expect("code");
        let names: Vec<&str> = code.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Setup", "Counter"]);
    }

    #[test]
    fn test_truncated_object_keeps_parsed_sections() {
        let (document, parser) = parse("OBJECT Table 50000 Test { FIELDS { { 1;;Name;Text50 } }");
        let object = object(&document);
        assert_eq!(object.fields.len(), 1);
        assert_matches!(parser.errors().last(), Some(error) if error.code().as_str() == "E051");
    }
}
