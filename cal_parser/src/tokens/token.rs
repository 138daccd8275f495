//! C/AL tokens
//!
//! Keywords carry their classified [`Keyword`]; every other word is an
//! identifier. Operators and punctuation each have a dedicated kind. The
//! token keeps the exact source slice so multi-token names and raw property
//! values can be reassembled verbatim.
use crate::grammar::keywords::Keyword;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),

    // === NAMES ===
    Identifier,
    /// `"Sales Header"`
    QuotedIdentifier,

    // === LITERALS ===
    /// `'text'` with `''` as the escaped quote
    String,
    Integer,
    Decimal,
    /// `010124D`
    Date,
    /// `120000T`
    Time,
    /// `010124D120000T` style literals ending in `DT`
    DateTime,

    // === ASSIGNMENT ===
    Assign,
    PlusAssign,
    MinusAssign,
    MultiplyAssign,
    DivideAssign,

    // === COMPARISON ===
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // === ARITHMETIC ===
    Plus,
    Minus,
    Multiply,
    Divide,

    // === PUNCTUATION ===
    Dot,
    DotDot,
    DoubleColon,
    Comma,
    Semicolon,
    Colon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    /// Auto-numbering marker in `Name@1000`
    At,
    /// AL ternary; never valid C/AL
    Question,

    /// `#if` and friends, up to end of line
    PreprocessorDirective,
    Unknown,
    Eof,
}

impl TokenKind {
    /// Fixed source text for operators and punctuation
    pub const fn symbol(self) -> Option<&'static str> {
        let text = match self {
            Self::Assign => ":=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::MultiplyAssign => "*=",
            Self::DivideAssign => "/=",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Dot => ".",
            Self::DotDot => "..",
            Self::DoubleColon => "::",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::At => "@",
            Self::Question => "?",
            _ => return None,
        };
        Some(text)
    }

    /// Short description used in "expected ..." messages
    pub fn describe(self) -> String {
        match self {
            Self::Keyword(keyword) => keyword.as_str().to_string(),
            Self::Identifier => "identifier".to_string(),
            Self::QuotedIdentifier => "quoted identifier".to_string(),
            Self::String => "string literal".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Decimal => "decimal".to_string(),
            Self::Date => "date literal".to_string(),
            Self::Time => "time literal".to_string(),
            Self::DateTime => "datetime literal".to_string(),
            Self::PreprocessorDirective => "preprocessor directive".to_string(),
            Self::Unknown => "unknown character".to_string(),
            Self::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol().unwrap_or("?")),
        }
    }

    pub const fn is_keyword(self, keyword: Keyword) -> bool {
        matches!(self, Self::Keyword(k) if k as u8 == keyword as u8)
    }

    pub const fn is_literal(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Integer
                | Self::Decimal
                | Self::Date
                | Self::Time
                | Self::DateTime
                | Self::Keyword(Keyword::True)
                | Self::Keyword(Keyword::False)
        )
    }

    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::PlusAssign
                | Self::MinusAssign
                | Self::MultiplyAssign
                | Self::DivideAssign
        )
    }

    pub const fn as_keyword(self) -> Option<Keyword> {
        match self {
            Self::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// A token with its exact source text and location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    /// Zero-width end-of-input token at `span`'s end
    pub fn eof_at(span: Span) -> Self {
        Self::new(TokenKind::Eof, "", Span::point(span.end))
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind.is_keyword(keyword)
    }

    /// Logical value of the token: string contents with `''` unescaped,
    /// quoted identifiers without their quotes, other tokens verbatim
    pub fn value(&self) -> String {
        match self.kind {
            TokenKind::String => strip_delimiters(&self.text, '\'').replace("''", "'"),
            TokenKind::QuotedIdentifier => strip_delimiters(&self.text, '"').to_string(),
            _ => self.text.clone(),
        }
    }

    /// True when this token starts exactly where `previous` ended
    pub fn is_adjacent_to(&self, previous: &Token) -> bool {
        previous.span.end.offset == self.span.start.offset
    }
}

fn strip_delimiters(text: &str, delimiter: char) -> &str {
    let inner = text.strip_prefix(delimiter).unwrap_or(text);
    inner.strip_suffix(delimiter).unwrap_or(inner)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.span.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    fn token(kind: TokenKind, text: &str, start: usize) -> Token {
        Token::new(
            kind,
            text,
            Span::new(
                Position::new(start, 1, start as u32 + 1),
                Position::new(start + text.len(), 1, (start + text.len()) as u32 + 1),
            ),
        )
    }

    #[test]
    fn test_string_value_unescapes_quotes() {
        let t = token(TokenKind::String, "'It''s'", 0);
        assert_eq!(t.value(), "It's");
    }

    #[test]
    fn test_unterminated_string_value() {
        let t = token(TokenKind::String, "'open", 0);
        assert_eq!(t.value(), "open");
    }

    #[test]
    fn test_quoted_identifier_value() {
        let t = token(TokenKind::QuotedIdentifier, "\"Sales Header\"", 0);
        assert_eq!(t.value(), "Sales Header");
    }

    #[test]
    fn test_adjacency() {
        let no = token(TokenKind::Identifier, "No", 0);
        let dot = token(TokenKind::Dot, ".", 2);
        let far = token(TokenKind::Identifier, "x", 5);
        assert!(dot.is_adjacent_to(&no));
        assert!(!far.is_adjacent_to(&dot));
    }

    #[test]
    fn test_describe() {
        assert_eq!(TokenKind::Semicolon.describe(), "';'");
        assert_eq!(TokenKind::Keyword(Keyword::Then).describe(), "THEN");
        assert_eq!(TokenKind::Eof.describe(), "end of input");
        assert!(TokenKind::Keyword(Keyword::True).is_literal());
        assert!(TokenKind::PlusAssign.is_assignment());
        assert!(TokenKind::Keyword(Keyword::End).is_keyword(Keyword::End));
        assert!(!TokenKind::Keyword(Keyword::End).is_keyword(Keyword::Begin));
    }
}
