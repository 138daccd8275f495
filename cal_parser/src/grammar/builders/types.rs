//! Data type builders
//!
//! Dispatch is on the first token of the type, case-insensitively:
//! `ARRAY [..] OF`, object references with an ID (`Record 18`), `TextConst`,
//! `DotNet`/`Automation` descriptors, inline option strings, and plain or
//! sized names (`Integer`, `Code20`, `Text[30]`).

use crate::config::compile_time::syntax::MAX_ARRAY_DIMENSIONS;
use crate::grammar::ast::nodes::{AutomationTypeInfo, DataType, DotNetTypeInfo};
use crate::grammar::builders::atomic::{
    advance_if, advance_if_keyword, check, expect, expect_keyword, nested, parse_integer,
    parse_size, report, Parser,
};
use crate::grammar::keywords::Keyword;
use crate::logging::{codes, Code};
use crate::syntax::{SyntaxError, SyntaxResult};
use crate::tokens::TokenKind;
use regex::Regex;
use std::sync::OnceLock;

/// Malformed DotNet or Automation type descriptors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeStringError {
    #[error("{0} type must be followed by a quoted descriptor")]
    MissingDescriptor(&'static str),

    #[error("DotNet descriptor does not start with a quoted assembly reference")]
    MissingAssemblyReference,

    #[error("DotNet descriptor has no type name after the assembly reference")]
    MissingTypeName,

    #[error("Automation descriptor does not match {{TypeLib}} Version:{{Class}}:'Library'.Class")]
    MalformedAutomationDescriptor,
}

impl TypeStringError {
    pub fn error_code(&self) -> Code {
        codes::syntax::INVALID_TYPE_DESCRIPTOR
    }
}

/// Type names whose trailing digits are a length (`Code20`, `Text100`)
const SIZABLE_TYPES: &[&str] = &["Code", "Text", "Decimal"];

pub fn parse_data_type(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let token = parser.peek().clone();
    match token.kind {
        TokenKind::Keyword(Keyword::Array) => parse_array_type(parser),
        TokenKind::Keyword(keyword) if keyword.is_object_reference_type() || keyword == Keyword::Form => {
            parse_object_reference(parser, keyword)
        }
        TokenKind::Keyword(Keyword::TextConst) => parse_text_constant(parser),
        TokenKind::Keyword(Keyword::DotNet) => parse_dotnet_type(parser),
        TokenKind::Keyword(Keyword::Automation) => parse_automation_type(parser),
        TokenKind::String => {
            parser.advance();
            let mut data_type = DataType::named(token.text.clone(), token.span);
            data_type.option_string = Some(token.value());
            Ok(data_type)
        }
        TokenKind::Identifier | TokenKind::Keyword(Keyword::Code) => parse_simple_type(parser),
        _ => Err(SyntaxError::expected("data type", &token)),
    }
}

/// `Integer`, `Code20`, `Text[30]`
fn parse_simple_type(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let start = parser.position();
    let name = parser.advance().text;
    let (base, embedded_length) = split_embedded_size(&name);

    let mut data_type = DataType::named(name.clone(), parser.span_from(start));
    data_type.length = embedded_length;

    if advance_if(parser, TokenKind::LeftBracket).is_some() {
        let length = parse_size(parser)?;
        expect(parser, TokenKind::RightBracket)?;
        data_type.type_name = format!("{}[{}]", base, length);
        data_type.length = Some(length);
    }

    data_type.span = parser.span_from(start);
    Ok(data_type)
}

/// Split `Code20` into `("Code", Some(20))`; other names are returned whole
fn split_embedded_size(name: &str) -> (&str, Option<u32>) {
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(index, _)| index);

    let Some(index) = digits_start else {
        return (name, None);
    };
    let (base, digits) = name.split_at(index);
    if !SIZABLE_TYPES.iter().any(|t| t.eq_ignore_ascii_case(base)) {
        return (name, None);
    }
    match digits.parse::<u32>() {
        Ok(length) => (base, Some(length)),
        Err(_) => (name, None),
    }
}

/// `ARRAY [d1,d2,...] OF [TEMPORARY] element`
fn parse_array_type(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Array)?;
    let open = expect(parser, TokenKind::LeftBracket)?;

    let mut dimensions = vec![parse_size(parser)?];
    while advance_if(parser, TokenKind::Comma).is_some() {
        dimensions.push(parse_size(parser)?);
    }
    let close = expect(parser, TokenKind::RightBracket)?;

    if dimensions.len() > MAX_ARRAY_DIMENSIONS {
        report(
            parser,
            SyntaxError::ArrayDimensionLimit {
                count: dimensions.len(),
                max: MAX_ARRAY_DIMENSIONS,
                span: open.span.merge(close.span),
            },
        );
    }

    expect_keyword(parser, Keyword::Of)?;
    let temporary = advance_if_keyword(parser, Keyword::Temporary);
    let element = nested(parser, parse_data_type)?;

    let dimension_list: Vec<String> = dimensions.iter().map(|d| d.to_string()).collect();
    let type_name = format!(
        "ARRAY [{}] OF {}{}",
        dimension_list.join(","),
        if temporary { "TEMPORARY " } else { "" },
        element.type_name
    );

    let mut data_type = DataType::named(type_name, parser.span_from(start));
    data_type.array_dimensions = dimensions;
    data_type.element_type = Some(Box::new(element));
    data_type.temporary_elements = temporary;
    Ok(data_type)
}

fn reference_display_name(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::Record => "Record",
        Keyword::Codeunit => "Codeunit",
        Keyword::Page => "Page",
        Keyword::Report => "Report",
        Keyword::Query => "Query",
        Keyword::XmlPort => "XMLport",
        Keyword::TestPage => "TestPage",
        Keyword::TestRequestPage => "TestRequestPage",
        Keyword::Form => "Form",
        other => other.as_str(),
    }
}

/// `Record 18`, `Codeunit 80`; only the record's ID is kept as a field
fn parse_object_reference(parser: &mut dyn Parser, keyword: Keyword) -> SyntaxResult<DataType> {
    let start = parser.position();
    parser.advance();
    let display = reference_display_name(keyword);

    if !check(parser, TokenKind::Integer) {
        return Ok(DataType::named(display, parser.span_from(start)));
    }
    let id = parse_integer(parser)?;
    let mut data_type = DataType::named(format!("{} {}", display, id), parser.span_from(start));
    if keyword == Keyword::Record {
        data_type.table_id = Some(id);
    }
    Ok(data_type)
}

/// `TextConst 'ENU=...;DEU=...'`; the text itself is not kept
fn parse_text_constant(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let start = parser.position();
    expect_keyword(parser, Keyword::TextConst)?;
    while advance_if(parser, TokenKind::String).is_some() {
        advance_if(parser, TokenKind::Comma);
    }
    Ok(DataType::named("TextConst", parser.span_from(start)))
}

/// The quoted descriptor after DotNet/Automation, as raw text
fn take_descriptor(parser: &mut dyn Parser, type_name: &'static str) -> Option<String> {
    match parser.peek().kind {
        TokenKind::QuotedIdentifier | TokenKind::String => Some(parser.advance().value()),
        _ => {
            let span = parser.peek().span;
            report(
                parser,
                SyntaxError::InvalidTypeDescriptor {
                    source: TypeStringError::MissingDescriptor(type_name),
                    span,
                },
            );
            None
        }
    }
}

fn parse_dotnet_type(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let start = parser.position();
    expect_keyword(parser, Keyword::DotNet)?;
    let mut data_type = DataType::named("DotNet", parser.span_from(start));

    if let Some(descriptor) = take_descriptor(parser, "DotNet") {
        match parse_dotnet_descriptor(&descriptor) {
            Ok(info) => data_type.dotnet = Some(info),
            Err(source) => {
                let span = parser.previous().span;
                report(parser, SyntaxError::InvalidTypeDescriptor { source, span });
            }
        }
    }
    data_type.span = parser.span_from(start);
    Ok(data_type)
}

fn parse_automation_type(parser: &mut dyn Parser) -> SyntaxResult<DataType> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Automation)?;
    let mut data_type = DataType::named("Automation", parser.span_from(start));

    if let Some(descriptor) = take_descriptor(parser, "Automation") {
        match parse_automation_descriptor(&descriptor) {
            Ok(info) => data_type.automation = Some(info),
            Err(source) => {
                let span = parser.previous().span;
                report(parser, SyntaxError::InvalidTypeDescriptor { source, span });
            }
        }
    }
    data_type.span = parser.span_from(start);
    Ok(data_type)
}

/// Split `'assembly, Version=...'.Namespace.Type`
pub fn parse_dotnet_descriptor(descriptor: &str) -> Result<DotNetTypeInfo, TypeStringError> {
    let rest = descriptor
        .strip_prefix('\'')
        .ok_or(TypeStringError::MissingAssemblyReference)?;
    let close = rest
        .find('\'')
        .ok_or(TypeStringError::MissingAssemblyReference)?;

    let assembly_reference = rest[..close].trim();
    if assembly_reference.is_empty() {
        return Err(TypeStringError::MissingAssemblyReference);
    }

    let type_name = rest[close + 1..]
        .strip_prefix('.')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(TypeStringError::MissingTypeName)?;

    Ok(DotNetTypeInfo {
        assembly_reference: assembly_reference.to_string(),
        type_name: type_name.to_string(),
    })
}

fn automation_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^\{(?P<type_lib>[0-9A-Fa-f-]+)\}\s+(?P<version>[0-9]+(?:\.[0-9]+)*):\{(?P<class>[0-9A-Fa-f-]+)\}:'(?P<library>[^']*)'\.(?P<class_name>.+)$",
            )
            .ok()
        })
        .as_ref()
}

/// Split `{TypeLibGUID} Version:{ClassGUID}:'TypeLibName'.ClassName`
pub fn parse_automation_descriptor(
    descriptor: &str,
) -> Result<AutomationTypeInfo, TypeStringError> {
    let captures = automation_pattern()
        .and_then(|pattern| pattern.captures(descriptor.trim()))
        .ok_or(TypeStringError::MalformedAutomationDescriptor)?;
    let part = |name: &str| {
        captures
            .name(name)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Ok(AutomationTypeInfo {
        type_lib_guid: part("type_lib"),
        version: part("version"),
        class_guid: part("class"),
        type_lib_name: part("library"),
        class_name: part("class_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize;
    use crate::syntax::CalParser;
    use assert_matches::assert_matches;

    fn parse_type(source: &str) -> (DataType, CalParser) {
        let mut parser = CalParser::new(tokenize(source).expect("tokenize"));
        let data_type = parse_data_type(&mut parser).expect("data type");
        (data_type, parser)
    }

    #[test]
    fn test_embedded_size() {
        let (data_type, _) = parse_type("Code20");
        assert_eq!(data_type.type_name, "Code20");
        assert_eq!(data_type.length, Some(20));

        let (text, _) = parse_type("Text100");
        assert_eq!(text.length, Some(100));

        let (plain, _) = parse_type("Integer");
        assert_eq!(plain.type_name, "Integer");
        assert_eq!(plain.length, None);
    }

    #[test]
    fn test_digits_on_unsized_type_are_part_of_the_name() {
        assert_eq!(split_embedded_size("Int64"), ("Int64", None));
        assert_eq!(split_embedded_size("Decimal5"), ("Decimal", Some(5)));
    }

    #[test]
    fn test_bracketed_length() {
        let (data_type, _) = parse_type("Text[30]");
        assert_eq!(data_type.type_name, "Text[30]");
        assert_eq!(data_type.length, Some(30));

        let (code, _) = parse_type("Code[20]");
        assert_eq!(code.type_name, "Code[20]");
    }

    #[test]
    fn test_record_reference_keeps_table_id() {
        let (record, _) = parse_type("Record 18");
        assert_eq!(record.type_name, "Record 18");
        assert_eq!(record.table_id, Some(18));

        let (codeunit, _) = parse_type("Codeunit 80");
        assert_eq!(codeunit.type_name, "Codeunit 80");
        assert_eq!(codeunit.table_id, None);

        let (test_page, _) = parse_type("TestPage 21");
        assert_eq!(test_page.type_name, "TestPage 21");
    }

    #[test]
    fn test_array_type() {
        let (array, parser) = parse_type("ARRAY [2,3] OF Decimal");
        assert_eq!(array.array_dimensions, vec![2, 3]);
        assert_eq!(array.type_name, "ARRAY [2,3] OF Decimal");
        assert_matches!(array.element_type.as_deref(), Some(DataType { type_name, .. }) if type_name == "Decimal");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_array_of_temporary_records() {
        let (array, _) = parse_type("ARRAY [5] OF TEMPORARY Record 36");
        assert!(array.temporary_elements);
        assert_eq!(array.type_name, "ARRAY [5] OF TEMPORARY Record 36");
    }

    #[test]
    fn test_array_dimension_limit() {
        let (array, parser) = parse_type("ARRAY[1,2,3,4,5,6,7,8,9,10,11] OF Integer");
        assert_eq!(array.array_dimensions.len(), 11);
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E056");

        // diagnostic covers the bracketed dimension list
        let span = parser.errors()[0].span();
        assert_eq!(span.start.offset, 5);
        assert_eq!(span.end.offset, 30);
        assert!(parser.peek().is(TokenKind::Eof));
    }

    #[test]
    fn test_text_constant_content_is_discarded() {
        let (text, parser) = parse_type("TextConst 'ENU=Hello;DEU=Hallo';");
        assert_eq!(text.type_name, "TextConst");
        assert!(parser.peek().is(TokenKind::Semicolon));
    }

    #[test]
    fn test_inline_option_string() {
        let (option, _) = parse_type("'Open,Pending,Posted'");
        assert_eq!(option.type_name, "'Open,Pending,Posted'");
        assert_eq!(option.option_string.as_deref(), Some("Open,Pending,Posted"));
    }

    #[test]
    fn test_dotnet_type() {
        let (dotnet, parser) = parse_type(
            "DotNet \"'mscorlib, Version=4.0.0.0, Culture=neutral'.System.Text.StringBuilder\"",
        );
        let info = dotnet.dotnet.expect("dotnet info");
        assert_eq!(info.assembly_reference, "mscorlib, Version=4.0.0.0, Culture=neutral");
        assert_eq!(info.type_name, "System.Text.StringBuilder");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_malformed_dotnet_is_recorded() {
        let (dotnet, parser) = parse_type("DotNet \"System.String\"");
        assert!(dotnet.dotnet.is_none());
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E055");

        assert_eq!(
            parse_dotnet_descriptor("'mscorlib'."),
            Err(TypeStringError::MissingTypeName)
        );
        assert_eq!(
            parse_dotnet_descriptor("''.System.String"),
            Err(TypeStringError::MissingAssemblyReference)
        );
    }

    #[test]
    fn test_automation_descriptor() {
        let info = parse_automation_descriptor(
            "{F935DC20-1CF0-11D0-ADB9-00C04FD58A0B} 1.0:{0D43FE01-F093-11CF-8940-00A0C9054228}:'Windows Script Host Object Model'.FileSystemObject",
        )
        .expect("descriptor");
        assert_eq!(info.type_lib_guid, "F935DC20-1CF0-11D0-ADB9-00C04FD58A0B");
        assert_eq!(info.version, "1.0");
        assert_eq!(info.class_guid, "0D43FE01-F093-11CF-8940-00A0C9054228");
        assert_eq!(info.type_lib_name, "Windows Script Host Object Model");
        assert_eq!(info.class_name, "FileSystemObject");

        assert_eq!(
            parse_automation_descriptor("Word.Application"),
            Err(TypeStringError::MalformedAutomationDescriptor)
        );
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let mut parser = CalParser::new(tokenize(";").unwrap());
        assert_matches!(
            parse_data_type(&mut parser),
            Err(SyntaxError::UnexpectedToken { .. })
        );
    }
}
