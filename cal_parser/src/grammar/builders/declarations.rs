//! Declaration builders: VAR blocks, parameters, procedures, triggers,
//! events and the CODE section that holds them

use crate::grammar::ast::nodes::*;
use crate::grammar::builders::atomic::{
    advance_if, advance_if_keyword, check, check_keyword, expect, expect_keyword,
    expect_semicolon_lenient, looks_like_declaration, parse_auto_number, parse_declared_name,
    report, Parser,
};
use crate::grammar::builders::helpers::{
    at_documentation_trigger, at_section_start, parse_with_recovery, synchronize_declaration,
};
use crate::grammar::builders::statements::parse_body;
use crate::grammar::builders::types::parse_data_type;
use crate::grammar::keywords::{al_only_modifier, can_be_identifier, is_known_trigger, Keyword};
use crate::syntax::{SyntaxError, SyntaxResult, TokenDescription};
use crate::tokens::TokenKind;
use crate::log_debug;

/// Recovery points for a malformed variable or parameter
const VARIABLE_RECOVERY: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::Keyword(Keyword::Begin),
    TokenKind::Keyword(Keyword::Procedure),
    TokenKind::Keyword(Keyword::Function),
    TokenKind::Keyword(Keyword::Local),
    TokenKind::Keyword(Keyword::Trigger),
    TokenKind::Keyword(Keyword::Event),
];

/// Tokens that close a VAR block. BEGIN and `[` are not among them: a
/// declaration-shaped BEGIN is reported as a misused keyword, and a `[`
/// inside a block belongs to a type such as `Text[50]`.
fn ends_variable_block(parser: &dyn Parser) -> bool {
    match parser.peek().kind {
        TokenKind::Keyword(keyword) if keyword.is_declaration_boundary() => true,
        TokenKind::RightBrace | TokenKind::Eof => true,
        _ => at_section_start(parser),
    }
}

/// Declarations after a consumed `VAR`, up to the first token that cannot
/// start one
pub fn parse_variable_block(parser: &mut dyn Parser) -> Vec<VariableDeclaration> {
    let mut variables = Vec::new();
    loop {
        if ends_variable_block(parser) {
            break;
        }
        if !can_be_identifier(parser.peek().kind) {
            if !looks_like_declaration(parser) {
                break;
            }
            skip_misnamed_declaration(parser);
            continue;
        }
        if let Some(variable) = parse_with_recovery(parser, VARIABLE_RECOVERY, parse_variable) {
            variables.push(variable);
        }
    }
    variables
}

/// `VAR` followed by its declarations, or nothing when no VAR comes next
pub fn parse_optional_variables(parser: &mut dyn Parser) -> Vec<VariableDeclaration> {
    if advance_if_keyword(parser, Keyword::Var) {
        parse_variable_block(parser)
    } else {
        Vec::new()
    }
}

/// A declaration whose name is a reserved word: report it and step over it
/// so the rest of the block still parses
fn skip_misnamed_declaration(parser: &mut dyn Parser) {
    let token = parser.peek().clone();
    let error = match token.kind {
        TokenKind::Keyword(keyword) => {
            SyntaxError::reserved_keyword(keyword, "variable name", token.span)
        }
        _ => SyntaxError::expected("variable name", &token),
    };
    report(parser, error);

    let start = parser.position();
    parser.advance();
    while !parser.is_at_end() {
        if advance_if(parser, TokenKind::Semicolon).is_some() {
            break;
        }
        if check_keyword(parser, Keyword::Begin) || ends_variable_block(parser) {
            break;
        }
        parser.advance();
    }
    parser.record_skipped(start, "misnamed declaration");
}

/// `Name[@n] : [TEMPORARY] Type [INDATASET] [WITHEVENTS] [RUNONCLIENT]
/// [SECURITYFILTERING(mode)] ;`
pub fn parse_variable(parser: &mut dyn Parser) -> SyntaxResult<VariableDeclaration> {
    let start = parser.position();
    let (name, id) = parse_declared_name(parser, "variable name")?;
    expect(parser, TokenKind::Colon)?;
    let is_temporary = advance_if_keyword(parser, Keyword::Temporary);
    let data_type = parse_data_type(parser)?;

    let mut variable = VariableDeclaration {
        name,
        id,
        data_type,
        is_temporary,
        in_data_set: false,
        with_events: false,
        run_on_client: false,
        security_filtering: None,
        span: parser.span_from(start),
    };

    loop {
        match parser.peek().kind {
            TokenKind::Keyword(Keyword::InDataSet) => variable.in_data_set = true,
            TokenKind::Keyword(Keyword::WithEvents) => variable.with_events = true,
            TokenKind::Keyword(Keyword::RunOnClient) => variable.run_on_client = true,
            TokenKind::Keyword(Keyword::SecurityFiltering) => {
                parser.advance();
                variable.security_filtering = Some(parse_security_filtering_mode(parser)?);
                continue;
            }
            _ => break,
        }
        parser.advance();
    }

    variable.span = parser.span_from(start);
    expect_semicolon_lenient(parser);
    Ok(variable)
}

/// `(Filtered)` after SECURITYFILTERING
fn parse_security_filtering_mode(parser: &mut dyn Parser) -> SyntaxResult<String> {
    expect(parser, TokenKind::LeftParen)?;
    let mode = match parser.peek().kind {
        kind if can_be_identifier(kind) => parser.advance().value(),
        _ => return Err(SyntaxError::expected("security filtering mode", parser.peek())),
    };
    expect(parser, TokenKind::RightParen)?;
    Ok(mode)
}

// === PARAMETERS ===

/// `( [VAR] Name[@n] : [TEMPORARY] Type ; ... )`
pub fn parse_parameter_list(parser: &mut dyn Parser) -> SyntaxResult<Vec<ParameterDeclaration>> {
    expect(parser, TokenKind::LeftParen)?;
    let mut parameters = Vec::new();

    while !check(parser, TokenKind::RightParen) && !parser.is_at_end() {
        parameters.push(parse_parameter(parser)?);
        if advance_if(parser, TokenKind::Semicolon).is_none()
            && advance_if(parser, TokenKind::Comma).is_none()
        {
            break;
        }
    }

    expect(parser, TokenKind::RightParen)?;
    Ok(parameters)
}

fn parse_parameter(parser: &mut dyn Parser) -> SyntaxResult<ParameterDeclaration> {
    let start = parser.position();
    let by_reference = advance_if_keyword(parser, Keyword::Var);
    let (name, id) = parse_declared_name(parser, "parameter name")?;
    expect(parser, TokenKind::Colon)?;
    let is_temporary = advance_if_keyword(parser, Keyword::Temporary);
    let data_type = parse_data_type(parser)?;

    // Client-side and filtering modifiers are accepted but not modelled
    loop {
        match parser.peek().kind {
            TokenKind::Keyword(Keyword::WithEvents) | TokenKind::Keyword(Keyword::RunOnClient) => {
                parser.advance();
            }
            TokenKind::Keyword(Keyword::SecurityFiltering) => {
                parser.advance();
                parse_security_filtering_mode(parser)?;
            }
            _ => break,
        }
    }

    Ok(ParameterDeclaration {
        name,
        id,
        data_type,
        by_reference,
        is_temporary,
        span: parser.span_from(start),
    })
}

// === PROCEDURES, TRIGGERS, EVENTS ===

/// An AL access modifier (`internal`, `protected`, `public`) in front of a
/// procedure keyword
fn at_al_modifier(parser: &dyn Parser) -> bool {
    let token = parser.peek();
    token.kind == TokenKind::Identifier
        && al_only_modifier(&token.text).is_some()
        && matches!(
            parser.peek_ahead(1).kind,
            TokenKind::Keyword(Keyword::Procedure)
                | TokenKind::Keyword(Keyword::Function)
                | TokenKind::Keyword(Keyword::Local)
        )
}

/// `[LOCAL] PROCEDURE Name[@n](params) [[Name[@n]] : Type] ; [VAR ...] [BEGIN ... END] ;`
pub fn parse_procedure(parser: &mut dyn Parser) -> SyntaxResult<ProcedureDeclaration> {
    let start = parser.position();

    if at_al_modifier(parser) {
        let modifier = parser.advance();
        if let Some((_, suggestion)) = al_only_modifier(&modifier.text) {
            report(
                parser,
                SyntaxError::al_only("AL access modifier", suggestion, modifier.span),
            );
        }
    }

    let is_local = advance_if_keyword(parser, Keyword::Local);
    if !advance_if_keyword(parser, Keyword::Procedure) {
        expect_keyword(parser, Keyword::Function)?;
    }

    let (name, id) = parse_declared_name(parser, "procedure name")?;
    let parameters = parse_parameter_list(parser)?;

    let mut return_name = None;
    let mut return_type = None;
    if can_be_identifier(parser.peek().kind) && looks_like_declaration(parser) {
        let (name, _) = parse_declared_name(parser, "return value name")?;
        return_name = Some(name);
    }
    if advance_if(parser, TokenKind::Colon).is_some() {
        return_type = Some(parse_data_type(parser)?);
    }
    expect_semicolon_lenient(parser);

    let variables = parse_optional_variables(parser);
    let body = parse_optional_body(parser)?;
    advance_if(parser, TokenKind::Semicolon);

    Ok(ProcedureDeclaration {
        name,
        id,
        is_local,
        parameters,
        return_type,
        return_name,
        variables,
        body,
        span: parser.span_from(start),
    })
}

fn parse_optional_body(parser: &mut dyn Parser) -> SyntaxResult<Vec<Statement>> {
    if check_keyword(parser, Keyword::Begin) {
        parse_body(parser)
    } else {
        Ok(Vec::new())
    }
}

/// `[VAR ...] BEGIN ... END` of a trigger property
pub fn parse_trigger_body(
    parser: &mut dyn Parser,
) -> SyntaxResult<(Vec<VariableDeclaration>, Vec<Statement>)> {
    let variables = parse_optional_variables(parser);
    let body = parse_body(parser)?;
    Ok((variables, body))
}

/// `TRIGGER Name[@n][()] ; [VAR ...] [BEGIN ... END] ;`
pub fn parse_trigger(parser: &mut dyn Parser) -> SyntaxResult<TriggerDeclaration> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Trigger)?;

    let name_token = parser.peek().clone();
    let (name, _) = parse_declared_name(parser, "trigger name")?;
    if !is_known_trigger(&name) {
        report(
            parser,
            SyntaxError::UnknownTrigger {
                name: TokenDescription::of(&name_token),
                span: name_token.span,
            },
        );
    }

    if advance_if(parser, TokenKind::LeftParen).is_some() {
        expect(parser, TokenKind::RightParen)?;
    }
    expect_semicolon_lenient(parser);

    let variables = parse_optional_variables(parser);
    let body = parse_optional_body(parser)?;
    advance_if(parser, TokenKind::Semicolon);

    Ok(TriggerDeclaration {
        name,
        variables,
        body,
        span: parser.span_from(start),
    })
}

/// Event binding name; the `@n` suffix stays part of it
fn parse_event_name(parser: &mut dyn Parser, role: &'static str) -> SyntaxResult<String> {
    let token = parser.peek().clone();
    if !can_be_identifier(token.kind) {
        return Err(SyntaxError::expected(role, &token));
    }
    parser.advance();
    let name = token.value();
    Ok(match parse_auto_number(parser)? {
        Some(number) => format!("{}@{}", name, number),
        None => name,
    })
}

/// `EVENT Subscriber[@n]::EventName[@n](params) ; [VAR ...] [BEGIN ... END] ;`
pub fn parse_event(parser: &mut dyn Parser) -> SyntaxResult<EventDeclaration> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Event)?;
    let subscriber_name = parse_event_name(parser, "event subscriber name")?;
    expect(parser, TokenKind::DoubleColon)?;
    let event_name = parse_event_name(parser, "event name")?;

    let parameters = if check(parser, TokenKind::LeftParen) {
        parse_parameter_list(parser)?
    } else {
        Vec::new()
    };
    expect_semicolon_lenient(parser);

    let variables = parse_optional_variables(parser);
    let body = parse_optional_body(parser)?;
    advance_if(parser, TokenKind::Semicolon);

    Ok(EventDeclaration {
        subscriber_name,
        event_name,
        parameters,
        variables,
        body,
        span: parser.span_from(start),
    })
}

// === CODE SECTION ===

/// Step over a bracketed attribute list such as `[External]` or
/// `[EventSubscriber(Codeunit,80,OnBeforePost)]`
fn skip_attribute_list(parser: &mut dyn Parser) {
    let start = parser.position();
    let mut depth = 0usize;
    while !parser.is_at_end() {
        match parser.advance().kind {
            TokenKind::LeftBracket => depth += 1,
            TokenKind::RightBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    log_debug!("Skipped attribute list", "tokens" => parser.position() - start);
}

fn starts_declaration(parser: &dyn Parser) -> bool {
    parser
        .peek()
        .kind
        .as_keyword()
        .is_some_and(Keyword::is_declaration_boundary)
        || at_al_modifier(parser)
}

/// Record a failed declaration and move on to the next one
fn recover_declaration(parser: &mut dyn Parser, error: SyntaxError, before: usize, code_depth: usize) {
    report(parser, error);
    if parser.position() == before && !parser.is_at_end() {
        parser.advance();
    }
    synchronize_declaration(parser, code_depth);
    if parser.position() > before {
        log_debug!("Recovered from malformed declaration",
            "tokens" => parser.position() - before
        );
    }
}

/// `CODE { [VAR ...] declarations [BEGIN END.] }`
pub fn parse_code_section(parser: &mut dyn Parser) -> SyntaxResult<CodeSection> {
    let start = parser.position();
    expect_keyword(parser, Keyword::Code)?;
    expect(parser, TokenKind::LeftBrace)?;
    let code_depth = parser.brace_depth();

    let mut section = CodeSection::default();
    loop {
        let kind = parser.peek().kind;
        match kind {
            TokenKind::Eof | TokenKind::RightBrace => break,
            TokenKind::Keyword(Keyword::Var) => {
                parser.advance();
                section.variables.extend(parse_variable_block(parser));
            }
            TokenKind::LeftBracket => skip_attribute_list(parser),
            _ if at_documentation_trigger(parser) => {
                parser.advance();
                parser.advance();
                parser.advance();
            }
            _ if starts_declaration(parser) => {
                let before = parser.position();
                let result = match parser.peek().kind {
                    TokenKind::Keyword(Keyword::Trigger) => {
                        parse_trigger(parser).map(|t| section.triggers.push(t))
                    }
                    TokenKind::Keyword(Keyword::Event) => {
                        parse_event(parser).map(|e| section.events.push(e))
                    }
                    _ => parse_procedure(parser).map(|p| section.procedures.push(p)),
                };
                if let Err(error) = result {
                    recover_declaration(parser, error, before, code_depth);
                }
            }
            _ => {
                let before = parser.position();
                let error = SyntaxError::expected("declaration", parser.peek());
                recover_declaration(parser, error, before, code_depth);
            }
        }
    }

    expect(parser, TokenKind::RightBrace)?;
    section.span = parser.span_from(start);
    Ok(section)
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

    fn code_section(source: &str) -> (CodeSection, CalParser) {
        let mut parser = parser_for(source);
        let section = parse_code_section(&mut parser).expect("code section");
        (section, parser)
    }

    #[test]
    fn test_variable_modifiers() {
        let mut parser = parser_for(
            "VAR
               TempLine@1000 : TEMPORARY Record 37;
               Cust@1001 : Record 18 SECURITYFILTERING(Filtered);
               Visible@1002 : Boolean INDATASET;
               Xml@1003 : DotNet \"'System.Xml'.System.Xml.XmlDocument\" WITHEVENTS RUNONCLIENT;
             BEGIN",
        );
        let variables = parse_optional_variables(&mut parser);

        assert_eq!(variables.len(), 4);
        assert!(variables[0].is_temporary);
        assert_eq!(variables[0].data_type.table_id, Some(37));
        assert_eq!(variables[1].security_filtering.as_deref(), Some("Filtered"));
        assert!(variables[2].in_data_set);
        assert!(variables[3].with_events && variables[3].run_on_client);
        assert!(parser.peek().is_keyword(Keyword::Begin));
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_reserved_keyword_variable_is_skipped() {
        let mut parser = parser_for("VAR IF@1000 : Integer; Counter@1001 : Integer; BEGIN");
        let variables = parse_optional_variables(&mut parser);

        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name, "Counter");
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(
            parser.errors()[0].message(),
            "Cannot use reserved keyword 'IF' as variable name"
        );
        assert!(parser.peek().is_keyword(Keyword::Begin));
    }

    #[test]
    fn test_bracketed_type_does_not_end_block() {
        let mut parser = parser_for("VAR Name@1 : Text[50]; Total@2 : Decimal; PROCEDURE");
        let variables = parse_optional_variables(&mut parser);
        assert_eq!(variables.len(), 2);
        assert_eq!(variables[0].data_type.type_name, "Text[50]");
        assert!(parser.peek().is_keyword(Keyword::Procedure));
    }

    #[test]
    fn test_malformed_variable_recovers() {
        let mut parser = parser_for("VAR Broken@1 : ; Good@2 : Integer; BEGIN");
        let variables = parse_optional_variables(&mut parser);
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].name, "Good");
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn test_procedure_declaration() {
        let mut parser = parser_for(
            "LOCAL PROCEDURE CalcAmount@12(VAR SalesLine@1000 : Record 37;Factor@1001 : Decimal) : Decimal;
             VAR
               Result@1002 : Decimal;
             BEGIN
               Result := SalesLine.Amount * Factor;
               EXIT(Result);
             END;",
        );
        let procedure = parse_procedure(&mut parser).expect("procedure");

        assert_eq!(procedure.name, "CalcAmount");
        assert_eq!(procedure.id, Some(12));
        assert!(procedure.is_local);
        assert_eq!(procedure.parameters.len(), 2);
        assert!(procedure.parameters[0].by_reference);
        assert!(!procedure.parameters[1].by_reference);
        assert_matches!(&procedure.return_type, Some(DataType { type_name, .. }) if type_name == "Decimal");
        assert_eq!(procedure.variables.len(), 1);
        assert_eq!(procedure.body.len(), 2);
        assert!(parser.is_at_end());
    }

    #[test]
    fn test_named_return_value() {
        let mut parser = parser_for("PROCEDURE GetNo@3() Result@1000 : Code[20]; BEGIN END;");
        let procedure = parse_procedure(&mut parser).expect("procedure");
        assert_eq!(procedure.return_name.as_deref(), Some("Result"));
        assert_eq!(procedure.return_type.map(|t| t.type_name).as_deref(), Some("Code[20]"));
    }

    #[test]
    fn test_al_access_modifier_is_reported() {
        let mut parser = parser_for("internal procedure Post@1(); BEGIN END;");
        let procedure = parse_procedure(&mut parser).expect("procedure");
        assert_eq!(procedure.name, "Post");
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E060");
        assert!(parser.errors()[0].message().contains("not supported in C/AL"));
    }

    #[test]
    fn test_event_names_keep_auto_number() {
        let mut parser = parser_for(
            "EVENT WebClient@1000::ControlAddInReady@15(Ready@1001 : Boolean); BEGIN END;",
        );
        let event = parse_event(&mut parser).expect("event");
        assert_eq!(event.subscriber_name, "WebClient@1000");
        assert_eq!(event.event_name, "ControlAddInReady@15");
        assert_eq!(event.parameters.len(), 1);
    }

    #[test]
    fn test_unknown_trigger_is_kept() {
        let mut parser = parser_for("TRIGGER OnSomething@1(); BEGIN END;");
        let trigger = parse_trigger(&mut parser).expect("trigger");
        assert_eq!(trigger.name, "OnSomething");
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].code().as_str(), "E059");
    }

    #[test]
    fn test_code_section() {
        let (section, parser) = code_section(
            "CODE
             {
               VAR
                 Counter@1000 : Integer;

               [External]
               PROCEDURE Run@1();
               BEGIN
                 Counter := Counter + 1;
               END;

               LOCAL PROCEDURE Helper@2();
               BEGIN
               END;

               BEGIN
               END.
             }",
        );
        assert_eq!(section.variables.len(), 1);
        assert_eq!(section.procedures.len(), 2);
        assert!(!section.procedures[0].is_local);
        assert!(section.procedures[1].is_local);
        assert!(parser.errors().is_empty());
        assert!(parser.is_at_end());
    }

    #[test]
    fn test_code_section_recovers_after_broken_procedure() {
        let (section, parser) = code_section(
            "CODE
             {
               PROCEDURE Broken@1(;
               PROCEDURE Fine@2();
               BEGIN
               END;
             }",
        );
        assert_eq!(section.procedures.len(), 1);
        assert_eq!(section.procedures[0].name, "Fine");
        assert!(!parser.errors().is_empty());
        assert!(!parser.skipped_regions().is_empty());
    }
}
