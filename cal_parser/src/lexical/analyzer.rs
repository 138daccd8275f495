//! C/AL lexical analyzer
//!
//! Produces significant tokens only; whitespace and comments are dropped.
//! Braces are structural in the object skeleton but start comments inside
//! code, so the analyzer tracks whether it is inside a code block (between a
//! BEGIN and its matching END) and whether a BEGIN at the outer level can
//! open one. In the object skeleton an apostrophe inside a word is text.

use crate::config::compile_time::lexical::*;
use crate::grammar::keywords::Keyword;
use crate::logging::codes;
use crate::tokens::{Token, TokenKind};
use crate::utils::{Position, Span};
use crate::{log_debug, log_success, log_warning};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("String too large: {size} bytes (max {MAX_STRING_SIZE}) at {span}")]
    StringTooLarge { size: usize, span: Span },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize },
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
        }
    }
}

/// Counters collected while tokenizing
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub keyword_tokens: usize,
    pub identifier_tokens: usize,
    pub comment_count: usize,
    pub unterminated_strings: usize,
    pub unterminated_comments: usize,
    pub unknown_chars: usize,
}

impl LexicalMetrics {
    fn record_token(&mut self, kind: TokenKind) {
        self.total_tokens += 1;
        match kind {
            TokenKind::Keyword(_) => self.keyword_tokens += 1,
            TokenKind::Identifier | TokenKind::QuotedIdentifier => self.identifier_tokens += 1,
            TokenKind::Unknown => self.unknown_chars += 1,
            _ => {}
        }
    }
}

pub struct LexicalAnalyzer<'a> {
    source: &'a str,
    pos: Position,
    tokens: Vec<Token>,
    metrics: LexicalMetrics,
    /// BEGIN/CASE nesting; braces are comments while this is non-zero
    code_depth: usize,
    /// Structural brace depth outside code blocks
    brace_depth: usize,
    /// Brace depth of the CODE section body, when inside one
    code_section_depth: Option<usize>,
    /// A trigger property value opened with VAR; its BEGIN opens code
    pending_trigger_body: bool,
}

impl<'a> LexicalAnalyzer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: Position::start(),
            tokens: Vec::new(),
            metrics: LexicalMetrics::default(),
            code_depth: 0,
            brace_depth: 0,
            code_section_depth: None,
            pending_trigger_body: false,
        }
    }

    /// Tokenize the whole source; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<(Vec<Token>, LexicalMetrics), LexerError> {
        log_debug!("Starting lexical analysis",
            "bytes" => self.source.len(),
            "max_tokens_allowed" => MAX_TOKEN_COUNT
        );

        while let Some(ch) = self.peek_char() {
            if self.tokens.len() >= MAX_TOKEN_COUNT {
                let error = LexerError::TooManyTokens {
                    count: self.tokens.len(),
                };
                crate::log_error!(error.error_code(), "Token limit exceeded",
                    span = Span::point(self.pos),
                    "limit" => MAX_TOKEN_COUNT
                );
                return Err(error);
            }

            let start = self.pos;
            match ch {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek_char_at(1) == Some('/') => self.skip_line_comment(),
                '(' if self.peek_char_at(1) == Some('*') => self.skip_block_comment(),
                '{' if self.code_depth > 0 => self.skip_brace_comment(),
                '\'' => self.lex_string(start)?,
                '"' => self.lex_quoted_identifier(start),
                '#' if self.at_line_start(start) => self.lex_directive(start),
                c if c.is_ascii_digit() => self.lex_number(start),
                c if c.is_alphabetic() || c == '_' => self.lex_word(start),
                _ => self.lex_symbol(start),
            }
        }

        let eof = Token::new(TokenKind::Eof, "", Span::point(self.pos));
        self.tokens.push(eof);

        log_success!(
            codes::success::TOKENIZATION_COMPLETE,
            "Lexical analysis completed",
            "tokens" => self.metrics.total_tokens,
            "unterminated_strings" => self.metrics.unterminated_strings
        );

        Ok((self.tokens, self.metrics))
    }

    // ------------------------------------------------------------------
    // character access
    // ------------------------------------------------------------------

    fn rest(&self) -> &'a str {
        self.source.get(self.pos.offset..).unwrap_or("")
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos = self.pos.advance(ch);
        Some(ch)
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    fn at_line_start(&self, start: Position) -> bool {
        let before = self.source.get(..start.offset).unwrap_or("");
        before
            .rsplit('\n')
            .next()
            .map_or(true, |line| line.trim().is_empty())
    }

    fn push(&mut self, kind: TokenKind, start: Position) {
        let span = Span::new(start, self.pos);
        let text = span.slice(self.source);
        self.metrics.record_token(kind);
        self.tokens.push(Token::new(kind, text, span));
    }

    fn previous_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    // ------------------------------------------------------------------
    // comments
    // ------------------------------------------------------------------

    fn skip_line_comment(&mut self) {
        self.bump_while(|c| c != '\n');
        self.metrics.comment_count += 1;
    }

    fn skip_block_comment(&mut self) {
        let start = self.pos;
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek_char() == Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => {}
                None => {
                    self.metrics.unterminated_comments += 1;
                    log_warning!(code = codes::lexical::UNTERMINATED_COMMENT,
                        "Block comment not terminated",
                        span = Span::new(start, self.pos)
                    );
                    break;
                }
            }
        }
        self.metrics.comment_count += 1;
    }

    fn skip_brace_comment(&mut self) {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some('}') => break,
                Some(_) => {}
                None => {
                    self.metrics.unterminated_comments += 1;
                    log_warning!(code = codes::lexical::UNTERMINATED_COMMENT,
                        "Brace comment not terminated",
                        span = Span::new(start, self.pos)
                    );
                    break;
                }
            }
        }
        self.metrics.comment_count += 1;
    }

    // ------------------------------------------------------------------
    // literals and names
    // ------------------------------------------------------------------

    /// `'...'` with `''` as an escaped quote; ends at end of line when unterminated
    fn lex_string(&mut self, start: Position) -> Result<(), LexerError> {
        self.bump();
        let mut terminated = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '\'' if self.peek_char_at(1) == Some('\'') => {
                    self.bump();
                    self.bump();
                }
                '\'' => {
                    self.bump();
                    terminated = true;
                    break;
                }
                '\n' | '\r' => break,
                _ => {
                    self.bump();
                }
            }
        }

        let size = self.pos.offset - start.offset;
        if size > MAX_STRING_SIZE {
            let error = LexerError::StringTooLarge {
                size,
                span: Span::new(start, self.pos),
            };
            crate::log_error!(error.error_code(), "String literal exceeds size limit",
                span = Span::new(start, self.pos),
                "size" => size
            );
            return Err(error);
        }

        if !terminated {
            self.metrics.unterminated_strings += 1;
            log_warning!(code = codes::lexical::UNTERMINATED_STRING,
                "String literal not terminated before end of line",
                span = Span::new(start, self.pos),
                "line" => start.line
            );
        }

        self.push(TokenKind::String, start);
        Ok(())
    }

    fn lex_quoted_identifier(&mut self, start: Position) {
        self.bump();
        while let Some(ch) = self.peek_char() {
            match ch {
                '"' => {
                    self.bump();
                    break;
                }
                '\n' | '\r' => break,
                _ => {
                    self.bump();
                }
            }
        }
        self.push(TokenKind::QuotedIdentifier, start);
    }

    fn lex_directive(&mut self, start: Position) {
        self.bump_while(|c| c != '\n' && c != '\r');
        self.push(TokenKind::PreprocessorDirective, start);
    }

    /// Integer, decimal and the `D`/`T`/`DT` suffixed date/time literals.
    /// `1..5` stays `1`, `..`, `5`.
    fn lex_number(&mut self, start: Position) {
        self.bump_while(|c| c.is_ascii_digit());

        let mut kind = TokenKind::Integer;
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
            kind = TokenKind::Decimal;
        }

        if kind == TokenKind::Integer {
            let is_word_char = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
            let first = self.peek_char().map(|c| c.to_ascii_uppercase());
            let second = self.peek_char_at(1).map(|c| c.to_ascii_uppercase());
            match (first, second) {
                (Some('D'), Some('T')) if !is_word_char(self.peek_char_at(2)) => {
                    self.bump();
                    self.bump();
                    kind = TokenKind::DateTime;
                }
                (Some('D'), _) if !is_word_char(self.peek_char_at(1)) => {
                    self.bump();
                    kind = TokenKind::Date;
                }
                (Some('T'), _) if !is_word_char(self.peek_char_at(1)) => {
                    self.bump();
                    kind = TokenKind::Time;
                }
                _ => {}
            }
        }

        self.push(kind, start);
    }

    fn lex_word(&mut self, start: Position) {
        let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
        self.bump_while(is_word_char);
        // Customer's Name: outside code an apostrophe glued to a word is text
        while self.in_object_skeleton() && self.peek_char() == Some('\'') {
            self.bump();
            self.bump_while(is_word_char);
        }
        let word = Span::new(start, self.pos).slice(self.source);

        let length = word.chars().count();
        if length > MAX_IDENTIFIER_LENGTH {
            log_warning!(code = codes::lexical::IDENTIFIER_TOO_LONG,
                "Identifier exceeds length limit",
                span = Span::new(start, self.pos),
                "length" => length
            );
        }

        let kind = match Keyword::from_str(word) {
            Some(keyword) => {
                self.track_code_block(keyword);
                TokenKind::Keyword(keyword)
            }
            None => TokenKind::Identifier,
        };
        self.push(kind, start);
    }

    /// Outside any code block and outside the CODE section
    fn in_object_skeleton(&self) -> bool {
        self.code_depth == 0 && self.code_section_depth.is_none()
    }

    /// `=BEGIN` opens a trigger body only when BEGIN ends its line or is
    /// directly followed by END; `Description=Begin of period` stays text
    fn begin_opens_trigger(&self) -> bool {
        let line = self.rest().split('\n').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with("//") {
            return true;
        }
        let follows_end = line.get(..3).is_some_and(|w| w.eq_ignore_ascii_case("END"));
        let word_continues = line
            .get(3..)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        follows_end && !word_continues
    }

    /// Update code-block state for a keyword about to be pushed
    fn track_code_block(&mut self, keyword: Keyword) {
        let previous = self.previous_kind();
        match keyword {
            Keyword::Begin => {
                let opens_code = self.code_depth > 0
                    || self.code_section_depth.is_some()
                    || self.pending_trigger_body
                    || (previous == Some(TokenKind::Equal) && self.begin_opens_trigger());
                if opens_code {
                    self.code_depth += 1;
                    self.pending_trigger_body = false;
                }
            }
            Keyword::Case if self.code_depth > 0 => self.code_depth += 1,
            Keyword::End if self.code_depth > 0 => self.code_depth -= 1,
            Keyword::Var if previous == Some(TokenKind::Equal) => {
                self.pending_trigger_body = true;
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // operators and punctuation
    // ------------------------------------------------------------------

    fn lex_symbol(&mut self, start: Position) {
        let Some(ch) = self.bump() else {
            return;
        };
        let next = self.peek_char();

        let kind = match (ch, next) {
            (':', Some('=')) => self.take(TokenKind::Assign),
            (':', Some(':')) => self.take(TokenKind::DoubleColon),
            (':', _) => TokenKind::Colon,
            ('+', Some('=')) => self.take(TokenKind::PlusAssign),
            ('+', _) => TokenKind::Plus,
            ('-', Some('=')) => self.take(TokenKind::MinusAssign),
            ('-', _) => TokenKind::Minus,
            ('*', Some('=')) => self.take(TokenKind::MultiplyAssign),
            ('*', _) => TokenKind::Multiply,
            ('/', Some('=')) => self.take(TokenKind::DivideAssign),
            ('/', _) => TokenKind::Divide,
            ('<', Some('>')) => self.take(TokenKind::NotEqual),
            ('<', Some('=')) => self.take(TokenKind::LessEqual),
            ('<', _) => TokenKind::Less,
            ('>', Some('=')) => self.take(TokenKind::GreaterEqual),
            ('>', _) => TokenKind::Greater,
            ('=', _) => TokenKind::Equal,
            ('.', Some('.')) => self.take(TokenKind::DotDot),
            ('.', _) => TokenKind::Dot,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            ('{', _) => {
                if self.previous_kind() == Some(TokenKind::Keyword(Keyword::Code))
                    && self.code_section_depth.is_none()
                {
                    self.code_section_depth = Some(self.brace_depth);
                }
                self.brace_depth += 1;
                TokenKind::LeftBrace
            }
            ('}', _) => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                if self.code_section_depth == Some(self.brace_depth) {
                    self.code_section_depth = None;
                }
                TokenKind::RightBrace
            }
            ('@', _) => TokenKind::At,
            ('?', _) => TokenKind::Question,
            (other, _) => {
                log_debug!("Unknown character", "code_point" => format!("U+{:04X}", other as u32));
                TokenKind::Unknown
            }
        };

        self.push(kind, start);
    }

    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn lex(source: &str) -> Vec<Token> {
        LexicalAnalyzer::new(source).tokenize().unwrap().0
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("begin End IF"),
            vec![
                TokenKind::Keyword(Keyword::Begin),
                TokenKind::Keyword(Keyword::End),
                TokenKind::Keyword(Keyword::If),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_token_text_is_exact_source_slice() {
        let tokens = lex("OBJECT Table 18 Customer");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["OBJECT", "Table", "18", "Customer", ""]);
        assert_eq!(tokens[2].span.start.column, 14);
    }

    #[test]
    fn test_strings() {
        let tokens = lex("'It''s' 'x'");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "'It''s'");
        assert_eq!(tokens[0].value(), "It's");
        assert_eq!(tokens[1].value(), "x");
    }

    #[test]
    fn test_unterminated_string_ends_at_line_end() {
        let (tokens, metrics) = LexicalAnalyzer::new("x := 'open\ny;").tokenize().unwrap();
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, "'open");
        assert_eq!(tokens[3].text, "y");
        assert_eq!(tokens[3].span.start.line, 2);
        assert_eq!(metrics.unterminated_strings, 1);
    }

    #[test]
    fn test_numbers_and_ranges() {
        assert_eq!(
            kinds("1..5 1.5 0D 120000T 0DT 10"),
            vec![
                TokenKind::Integer,
                TokenKind::DotDot,
                TokenKind::Integer,
                TokenKind::Decimal,
                TokenKind::Date,
                TokenKind::Time,
                TokenKind::DateTime,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_word_is_not_a_date() {
        assert_eq!(
            kinds("2Days"),
            vec![TokenKind::Integer, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds(":= += -= *= /= :: <> <= >= < > = .. . @ ?"),
            vec![
                TokenKind::Assign,
                TokenKind::PlusAssign,
                TokenKind::MinusAssign,
                TokenKind::MultiplyAssign,
                TokenKind::DivideAssign,
                TokenKind::DoubleColon,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Equal,
                TokenKind::DotDot,
                TokenKind::Dot,
                TokenKind::At,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        let (tokens, metrics) = LexicalAnalyzer::new("a // line\n(* block *) b")
            .tokenize()
            .unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "b");
        assert_eq!(metrics.comment_count, 2);
    }

    #[test]
    fn test_braces_are_comments_only_inside_code() {
        let source = "CODE { PROCEDURE X@1(); BEGIN { note } y := 1; END; }";
        let tokens = lex(source);
        let braces = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::LeftBrace | TokenKind::RightBrace))
            .count();
        assert_eq!(braces, 2);
        assert!(!tokens.iter().any(|t| t.text == "note"));
    }

    #[test]
    fn test_case_end_pairs_inside_code() {
        let source = "OnValidate=BEGIN\n CASE x OF 1: y; END; { c } END; }";
        let tokens = lex(source);
        assert!(!tokens.iter().any(|t| t.text == "c"));
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RightBrace);
    }

    #[test]
    fn test_begin_in_field_name_does_not_open_code() {
        let tokens = lex("{ 1 ; ; Begin Date ; Date }");
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RightBrace);
    }

    #[test]
    fn test_begin_as_property_text_does_not_open_code() {
        let tokens = lex("{ Description=Begin of period; } { { 1 ; ;A ;Integer } }");
        let braces = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::LeftBrace | TokenKind::RightBrace))
            .count();
        assert_eq!(braces, 6);
    }

    #[test]
    fn test_begin_opens_code_at_line_end_or_before_end() {
        let tokens = lex("OnRun=BEGIN // start\n { note } END; }");
        assert!(!tokens.iter().any(|t| t.text == "note"));
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RightBrace);

        let tokens = lex("OnRun=BEGIN END; { 1 }");
        assert!(tokens.iter().any(|t| t.text == "1"));
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RightBrace);
    }

    #[test]
    fn test_apostrophe_inside_word_outside_code() {
        let (tokens, metrics) = LexicalAnalyzer::new("{ CaptionML=ENU=Customer's Name } { 2 }")
            .tokenize()
            .unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Identifier && t.text == "Customer's"));
        assert!(!tokens.iter().any(|t| t.kind == TokenKind::String));
        assert_eq!(metrics.unterminated_strings, 0);
        assert_eq!(tokens[tokens.len() - 2].kind, TokenKind::RightBrace);
    }

    #[test]
    fn test_apostrophe_after_equal_still_opens_string() {
        let tokens = lex("{ CaptionML=ENU='It''s' }");
        assert_matches!(
            tokens.iter().find(|t| t.kind == TokenKind::String),
            Some(token) if token.value() == "It's"
        );
    }

    #[test]
    fn test_apostrophe_in_code_still_opens_string() {
        let tokens = lex("OnRun=BEGIN\n x := y'z'; END;");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::String && t.text == "'z'"));
    }

    #[test]
    fn test_preprocessor_directive_only_at_line_start() {
        let tokens = lex("#if CLEAN\nx # y");
        assert_eq!(tokens[0].kind, TokenKind::PreprocessorDirective);
        assert_eq!(tokens[0].text, "#if CLEAN");
        assert_eq!(tokens[2].kind, TokenKind::Unknown);
    }

    #[test]
    fn test_auto_numbered_name() {
        assert_eq!(
            kinds("Cust@1000"),
            vec![
                TokenKind::Identifier,
                TokenKind::At,
                TokenKind::Integer,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_quoted_identifier() {
        let tokens = lex("\"Sales Header\".\"No.\"");
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdentifier);
        assert_eq!(tokens[0].value(), "Sales Header");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].value(), "No.");
    }

    #[test]
    fn test_positions_across_lines() {
        let tokens = lex("a\r\n  b");
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
        assert_eq!(tokens[1].span.start.offset, 5);
    }

    #[test]
    fn test_empty_source_has_only_eof() {
        assert_matches!(kinds("").as_slice(), [TokenKind::Eof]);
    }
}
