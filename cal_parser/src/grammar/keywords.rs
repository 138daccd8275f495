//! C/AL keyword classification
//!
//! Keywords are matched case-insensitively. C/AL is context sensitive: most
//! keywords that are reserved in statement position are legal names in a
//! declaration, so the classification here is split between what the lexer
//! recognises ([`Keyword::from_str`]) and what a declaration site accepts as
//! a name ([`can_be_identifier`]).
use crate::tokens::TokenKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // === OBJECT HEADER ===
    Object,
    Table,
    Page,
    Report,
    Codeunit,
    Query,
    XmlPort,
    MenuSuite,
    Form,

    // === SECTIONS ===
    Properties,
    Fields,
    Keys,
    FieldGroups,
    Code,
    Controls,
    Actions,
    DataItems,
    Dataset,
    RequestPage,
    Labels,
    Elements,
    RequestForm,
    MenuNodes,

    // === DECLARATIONS ===
    Var,
    Procedure,
    Function,
    Local,
    Trigger,
    Event,

    // === STATEMENTS ===
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    Repeat,
    Until,
    For,
    To,
    DownTo,
    Case,
    Of,
    Exit,
    Break,
    With,

    // === WORD OPERATORS ===
    And,
    Or,
    Xor,
    Not,
    Div,
    Mod,
    In,

    // === BOOLEAN LITERALS ===
    True,
    False,

    // === TYPE GRAMMAR ===
    Array,
    Record,
    TestPage,
    TestRequestPage,
    TextConst,
    DotNet,
    Automation,

    // === DECLARATION MODIFIERS ===
    Temporary,
    InDataSet,
    WithEvents,
    RunOnClient,
    SecurityFiltering,
}

impl Keyword {
    /// Every keyword, in declaration order
    pub const ALL: &'static [Keyword] = &[
        Self::Object,
        Self::Table,
        Self::Page,
        Self::Report,
        Self::Codeunit,
        Self::Query,
        Self::XmlPort,
        Self::MenuSuite,
        Self::Form,
        Self::Properties,
        Self::Fields,
        Self::Keys,
        Self::FieldGroups,
        Self::Code,
        Self::Controls,
        Self::Actions,
        Self::DataItems,
        Self::Dataset,
        Self::RequestPage,
        Self::Labels,
        Self::Elements,
        Self::RequestForm,
        Self::MenuNodes,
        Self::Var,
        Self::Procedure,
        Self::Function,
        Self::Local,
        Self::Trigger,
        Self::Event,
        Self::Begin,
        Self::End,
        Self::If,
        Self::Then,
        Self::Else,
        Self::While,
        Self::Do,
        Self::Repeat,
        Self::Until,
        Self::For,
        Self::To,
        Self::DownTo,
        Self::Case,
        Self::Of,
        Self::Exit,
        Self::Break,
        Self::With,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Not,
        Self::Div,
        Self::Mod,
        Self::In,
        Self::True,
        Self::False,
        Self::Array,
        Self::Record,
        Self::TestPage,
        Self::TestRequestPage,
        Self::TextConst,
        Self::DotNet,
        Self::Automation,
        Self::Temporary,
        Self::InDataSet,
        Self::WithEvents,
        Self::RunOnClient,
        Self::SecurityFiltering,
    ];

    /// Canonical upper-case spelling
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "OBJECT",
            Self::Table => "TABLE",
            Self::Page => "PAGE",
            Self::Report => "REPORT",
            Self::Codeunit => "CODEUNIT",
            Self::Query => "QUERY",
            Self::XmlPort => "XMLPORT",
            Self::MenuSuite => "MENUSUITE",
            Self::Form => "FORM",

            Self::Properties => "PROPERTIES",
            Self::Fields => "FIELDS",
            Self::Keys => "KEYS",
            Self::FieldGroups => "FIELDGROUPS",
            Self::Code => "CODE",
            Self::Controls => "CONTROLS",
            Self::Actions => "ACTIONS",
            Self::DataItems => "DATAITEMS",
            Self::Dataset => "DATASET",
            Self::RequestPage => "REQUESTPAGE",
            Self::Labels => "LABELS",
            Self::Elements => "ELEMENTS",
            Self::RequestForm => "REQUESTFORM",
            Self::MenuNodes => "MENUNODES",

            Self::Var => "VAR",
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
            Self::Local => "LOCAL",
            Self::Trigger => "TRIGGER",
            Self::Event => "EVENT",

            Self::Begin => "BEGIN",
            Self::End => "END",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::While => "WHILE",
            Self::Do => "DO",
            Self::Repeat => "REPEAT",
            Self::Until => "UNTIL",
            Self::For => "FOR",
            Self::To => "TO",
            Self::DownTo => "DOWNTO",
            Self::Case => "CASE",
            Self::Of => "OF",
            Self::Exit => "EXIT",
            Self::Break => "BREAK",
            Self::With => "WITH",

            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::In => "IN",

            Self::True => "TRUE",
            Self::False => "FALSE",

            Self::Array => "ARRAY",
            Self::Record => "RECORD",
            Self::TestPage => "TESTPAGE",
            Self::TestRequestPage => "TESTREQUESTPAGE",
            Self::TextConst => "TEXTCONST",
            Self::DotNet => "DOTNET",
            Self::Automation => "AUTOMATION",

            Self::Temporary => "TEMPORARY",
            Self::InDataSet => "INDATASET",
            Self::WithEvents => "WITHEVENTS",
            Self::RunOnClient => "RUNONCLIENT",
            Self::SecurityFiltering => "SECURITYFILTERING",
        }
    }

    /// Case-insensitive lookup
    pub fn from_str(s: &str) -> Option<Self> {
        if s.len() > 17 {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(s))
    }

    /// Any section keyword, parsed or skipped
    pub const fn is_section(self) -> bool {
        self.is_parsed_section() || self.is_skipped_section()
    }

    pub const fn is_parsed_section(self) -> bool {
        matches!(
            self,
            Self::Properties | Self::Fields | Self::Keys | Self::FieldGroups | Self::Code
        )
    }

    /// Sections recognised only so they can be skipped wholesale
    pub const fn is_skipped_section(self) -> bool {
        matches!(
            self,
            Self::Controls
                | Self::Actions
                | Self::DataItems
                | Self::Dataset
                | Self::RequestPage
                | Self::Labels
                | Self::Elements
                | Self::RequestForm
                | Self::MenuNodes
        )
    }

    /// Keywords that start a type in a declaration
    pub const fn is_type_name(self) -> bool {
        matches!(
            self,
            Self::Array
                | Self::Record
                | Self::Codeunit
                | Self::Page
                | Self::Report
                | Self::Query
                | Self::XmlPort
                | Self::TestPage
                | Self::TestRequestPage
                | Self::TextConst
                | Self::DotNet
                | Self::Automation
                | Self::Code
        )
    }

    /// Object-reference types taking a numeric object ID
    pub const fn is_object_reference_type(self) -> bool {
        matches!(
            self,
            Self::Record
                | Self::Codeunit
                | Self::Page
                | Self::Report
                | Self::Query
                | Self::XmlPort
                | Self::TestPage
                | Self::TestRequestPage
        )
    }

    pub const fn is_word_operator(self) -> bool {
        matches!(
            self,
            Self::And | Self::Or | Self::Xor | Self::Not | Self::Div | Self::Mod | Self::In
        )
    }

    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Begin
                | Self::End
                | Self::If
                | Self::Then
                | Self::Else
                | Self::While
                | Self::Do
                | Self::Repeat
                | Self::Until
                | Self::For
                | Self::To
                | Self::DownTo
                | Self::Case
                | Self::Of
                | Self::Exit
                | Self::Break
                | Self::With
        )
    }

    /// Tokens that end a VAR block
    pub const fn is_declaration_boundary(self) -> bool {
        matches!(
            self,
            Self::Procedure | Self::Function | Self::Local | Self::Trigger | Self::Event
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keywords usable as names in declaration position beyond the type names
const IDENTIFIER_ALLOW_LIST: &[Keyword] = &[
    Keyword::Object,
    Keyword::Table,
    Keyword::MenuSuite,
    Keyword::Form,
    Keyword::Properties,
    Keyword::Fields,
    Keyword::Keys,
    Keyword::FieldGroups,
    Keyword::Controls,
    Keyword::Actions,
    Keyword::DataItems,
    Keyword::Dataset,
    Keyword::RequestPage,
    Keyword::Labels,
    Keyword::Elements,
    Keyword::RequestForm,
    Keyword::MenuNodes,
    Keyword::Temporary,
    Keyword::InDataSet,
    Keyword::WithEvents,
    Keyword::RunOnClient,
    Keyword::SecurityFiltering,
    Keyword::Event,
    Keyword::Trigger,
];

/// Whether a token may serve as a declared name (variable, parameter,
/// procedure, field group). Identifiers always can; keywords only when they
/// are type names or on the allow-list.
pub fn can_be_identifier(kind: TokenKind) -> bool {
    match kind {
        TokenKind::Identifier | TokenKind::QuotedIdentifier => true,
        TokenKind::Keyword(keyword) => {
            keyword.is_type_name() || IDENTIFIER_ALLOW_LIST.contains(&keyword)
        }
        _ => false,
    }
}

/// Whether a keyword is reserved everywhere a name is expected
pub fn is_reserved(keyword: Keyword) -> bool {
    !can_be_identifier(TokenKind::Keyword(keyword))
}

/// AL access modifiers that have no C/AL counterpart, as
/// `(canonical name, suggested replacement)`
pub fn al_only_modifier(word: &str) -> Option<(&'static str, &'static str)> {
    const AL_MODIFIERS: &[(&str, &str)] = &[
        ("internal", "LOCAL or a global PROCEDURE"),
        ("protected", "LOCAL or a global PROCEDURE"),
        ("public", "a global PROCEDURE without LOCAL"),
    ];
    AL_MODIFIERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .copied()
}

/// Trigger names C/AL objects define
pub const KNOWN_TRIGGERS: &[&str] = &[
    "OnInit",
    "OnOpenPage",
    "OnClosePage",
    "OnFindRecord",
    "OnNextRecord",
    "OnAfterGetRecord",
    "OnAfterGetCurrRecord",
    "OnNewRecord",
    "OnInsertRecord",
    "OnModifyRecord",
    "OnDeleteRecord",
    "OnQueryClosePage",
    "OnInsert",
    "OnModify",
    "OnDelete",
    "OnRename",
    "OnValidate",
    "OnLookup",
    "OnRun",
    "OnAction",
    "OnDrillDown",
    "OnAssistEdit",
    "OnControlAddIn",
    "OnInitReport",
    "OnPreReport",
    "OnPostReport",
    "OnPreDataItem",
    "OnPostDataItem",
    "OnInitXMLport",
    "OnPreXMLport",
    "OnPostXMLport",
    "OnBeforeOpen",
    "OnAfterAssignField",
    "OnBeforePassField",
    "OnAfterInitRecord",
    "OnBeforeInsertRecord",
];

pub fn is_known_trigger(name: &str) -> bool {
    KNOWN_TRIGGERS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Keyword::from_str("begin"), Some(Keyword::Begin));
        assert_eq!(Keyword::from_str("BeGiN"), Some(Keyword::Begin));
        assert_eq!(Keyword::from_str("XMLport"), Some(Keyword::XmlPort));
        assert_eq!(Keyword::from_str("DownTo"), Some(Keyword::DownTo));
        assert_eq!(Keyword::from_str("Customer"), None);
        assert_eq!(Keyword::from_str(""), None);
    }

    #[test]
    fn test_every_keyword_round_trips() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::from_str(keyword.as_str()), Some(*keyword));
        }
    }

    #[test]
    fn test_section_classification() {
        assert!(Keyword::Fields.is_parsed_section());
        assert!(Keyword::Code.is_section());
        assert!(Keyword::Controls.is_skipped_section());
        assert!(!Keyword::Controls.is_parsed_section());
        assert!(!Keyword::Begin.is_section());
    }

    #[test]
    fn test_declaration_names() {
        assert!(can_be_identifier(TokenKind::Identifier));
        assert!(can_be_identifier(TokenKind::Keyword(Keyword::Record)));
        assert!(can_be_identifier(TokenKind::Keyword(Keyword::Code)));
        assert!(can_be_identifier(TokenKind::Keyword(Keyword::Labels)));
        assert!(can_be_identifier(TokenKind::Keyword(Keyword::Temporary)));

        assert!(is_reserved(Keyword::If));
        assert!(is_reserved(Keyword::Begin));
        assert!(is_reserved(Keyword::Var));
        assert!(is_reserved(Keyword::And));
        assert!(is_reserved(Keyword::True));
        assert!(!can_be_identifier(TokenKind::Semicolon));
    }

    #[test]
    fn test_al_only_modifiers() {
        assert_eq!(al_only_modifier("Internal").map(|(name, _)| name), Some("internal"));
        assert!(al_only_modifier("Protected").is_some());
        assert!(al_only_modifier("LOCAL").is_none());
    }

    #[test]
    fn test_known_triggers() {
        assert!(is_known_trigger("OnValidate"));
        assert!(is_known_trigger("onrun"));
        assert!(!is_known_trigger("OnSomethingElse"));
    }
}
