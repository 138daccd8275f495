//! Syntax tree for C/AL object exports
//!
//! Every node carries the span from the start of its first token to the end
//! of its last token. Statement and expression kinds are closed sum types;
//! consumers match on them exhaustively. All nodes serialize with serde so
//! the CLI can emit the tree as JSON.

use crate::grammar::keywords::Keyword;
use crate::utils::Span;
use serde::Serialize;
use std::fmt;

// === DOCUMENT ===

/// Root node; `object` is `None` for empty or unrecognisable input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub object: Option<ObjectDeclaration>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Table,
    Page,
    Report,
    Codeunit,
    Query,
    #[serde(rename = "XMLport")]
    XmlPort,
    MenuSuite,
    Form,
}

impl ObjectKind {
    pub fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Table => Some(Self::Table),
            Keyword::Page => Some(Self::Page),
            Keyword::Report => Some(Self::Report),
            Keyword::Codeunit => Some(Self::Codeunit),
            Keyword::Query => Some(Self::Query),
            Keyword::XmlPort => Some(Self::XmlPort),
            Keyword::MenuSuite => Some(Self::MenuSuite),
            Keyword::Form => Some(Self::Form),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Page => "Page",
            Self::Report => "Report",
            Self::Codeunit => "Codeunit",
            Self::Query => "Query",
            Self::XmlPort => "XMLport",
            Self::MenuSuite => "MenuSuite",
            Self::Form => "Form",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDeclaration {
    pub kind: ObjectKind,
    pub id: i64,
    pub name: String,
    pub properties: Vec<Property>,
    pub fields: Vec<FieldDeclaration>,
    pub keys: Vec<KeyDeclaration>,
    pub field_groups: Vec<FieldGroupDeclaration>,
    pub code: Option<CodeSection>,
    pub span: Span,
}

// === SECTIONS ===

/// `Name=Value;` entry. Trigger properties (`OnRun=BEGIN ... END;`) keep an
/// empty `value` and carry their statements in `trigger_body`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_body: Option<Vec<Statement>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trigger_variables: Vec<VariableDeclaration>,
    pub span: Span,
}

impl Property {
    pub fn is_trigger(&self) -> bool {
        self.trigger_body.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDeclaration {
    pub field_no: i64,
    /// Normal, FlowField or FlowFilter; empty when the column is blank
    pub field_class: String,
    pub name: String,
    pub data_type: DataType,
    pub properties: Vec<Property>,
    pub triggers: Vec<TriggerDeclaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyDeclaration {
    pub fields: Vec<String>,
    pub properties: Vec<Property>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroupDeclaration {
    pub id: i64,
    pub name: String,
    pub fields: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CodeSection {
    pub variables: Vec<VariableDeclaration>,
    pub procedures: Vec<ProcedureDeclaration>,
    pub triggers: Vec<TriggerDeclaration>,
    pub events: Vec<EventDeclaration>,
    pub span: Span,
}

// === DECLARATIONS ===

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDeclaration {
    pub name: String,
    /// Auto-numbering suffix (`@1000`)
    pub id: Option<i64>,
    pub data_type: DataType,
    pub is_temporary: bool,
    pub in_data_set: bool,
    pub with_events: bool,
    pub run_on_client: bool,
    pub security_filtering: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDeclaration {
    pub name: String,
    pub id: Option<i64>,
    pub data_type: DataType,
    /// Declared with a leading `VAR`
    pub by_reference: bool,
    pub is_temporary: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureDeclaration {
    /// Name without the `@n` suffix
    pub name: String,
    pub id: Option<i64>,
    pub is_local: bool,
    pub parameters: Vec<ParameterDeclaration>,
    pub return_type: Option<DataType>,
    pub return_name: Option<String>,
    pub variables: Vec<VariableDeclaration>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerDeclaration {
    pub name: String,
    pub variables: Vec<VariableDeclaration>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// `EVENT Subscriber@1::EventName@2(...)`; both names keep their `@n`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDeclaration {
    pub subscriber_name: String,
    pub event_name: String,
    pub parameters: Vec<ParameterDeclaration>,
    pub variables: Vec<VariableDeclaration>,
    pub body: Vec<Statement>,
    pub span: Span,
}

// === DATA TYPES ===

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataType {
    /// Display name: `Text50`, `Text[30]`, `Record 18`, `ARRAY [10] OF Integer`
    pub type_name: String,
    pub length: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub array_dimensions: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<Box<DataType>>,
    /// Set for `ARRAY [n] OF TEMPORARY Record ...`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub temporary_elements: bool,
    pub table_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dotnet: Option<DotNetTypeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<AutomationTypeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_string: Option<String>,
    pub span: Span,
}

impl DataType {
    pub fn named(type_name: impl Into<String>, span: Span) -> Self {
        Self {
            type_name: type_name.into(),
            length: None,
            array_dimensions: Vec::new(),
            element_type: None,
            temporary_elements: false,
            table_id: None,
            dotnet: None,
            automation: None,
            option_string: None,
            span,
        }
    }

    pub fn is_array(&self) -> bool {
        !self.array_dimensions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DotNetTypeInfo {
    pub assembly_reference: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationTypeInfo {
    pub type_lib_guid: String,
    pub version: String,
    pub class_guid: String,
    pub type_lib_name: String,
    pub class_name: String,
}

// === STATEMENTS ===

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Statement {
    Block {
        statements: Vec<Statement>,
        span: Span,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
        span: Span,
    },
    Repeat {
        body: Vec<Statement>,
        condition: Expression,
        span: Span,
    },
    For {
        variable: Expression,
        from: Expression,
        to: Expression,
        direction: ForDirection,
        body: Box<Statement>,
        span: Span,
    },
    Case {
        expression: Expression,
        branches: Vec<CaseBranch>,
        else_branch: Option<Vec<Statement>>,
        span: Span,
    },
    Exit {
        value: Option<Expression>,
        span: Span,
    },
    Break {
        span: Span,
    },
    With {
        record: Expression,
        body: Box<Statement>,
        span: Span,
    },
    /// Compound forms are desugared: `x += y` has `value` `x + y` and
    /// `operator` `+=`
    Assignment {
        target: Expression,
        operator: AssignmentOperator,
        value: Expression,
        span: Span,
    },
    Call {
        expression: Expression,
        span: Span,
    },
    Empty {
        span: Span,
    },
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Self::Block { span, .. }
            | Self::If { span, .. }
            | Self::While { span, .. }
            | Self::Repeat { span, .. }
            | Self::For { span, .. }
            | Self::Case { span, .. }
            | Self::Exit { span, .. }
            | Self::Break { span }
            | Self::With { span, .. }
            | Self::Assignment { span, .. }
            | Self::Call { span, .. }
            | Self::Empty { span } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseBranch {
    pub values: Vec<Expression>,
    pub statement: Statement,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ForDirection {
    #[serde(rename = "TO")]
    To,
    #[serde(rename = "DOWNTO")]
    DownTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignmentOperator {
    #[serde(rename = ":=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubtractAssign,
    #[serde(rename = "*=")]
    MultiplyAssign,
    #[serde(rename = "/=")]
    DivideAssign,
}

impl AssignmentOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => ":=",
            Self::AddAssign => "+=",
            Self::SubtractAssign => "-=",
            Self::MultiplyAssign => "*=",
            Self::DivideAssign => "/=",
        }
    }

    /// Binary operator a compound assignment desugars into
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(BinaryOperator::Add),
            Self::SubtractAssign => Some(BinaryOperator::Subtract),
            Self::MultiplyAssign => Some(BinaryOperator::Multiply),
            Self::DivideAssign => Some(BinaryOperator::Divide),
        }
    }
}

// === EXPRESSIONS ===

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Expression {
    Identifier {
        name: String,
        span: Span,
    },
    Literal {
        literal: LiteralKind,
        raw: String,
        value: LiteralValue,
        span: Span,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        span: Span,
    },
    /// `Rec.Field` or, with `scope`, `Status::Open`
    MemberAccess {
        object: Box<Expression>,
        member: String,
        scope: bool,
        span: Span,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        span: Span,
    },
    ArrayAccess {
        array: Box<Expression>,
        indices: Vec<Expression>,
        span: Span,
    },
    /// `[1,5..10,20]`; elements are plain expressions or `Range`s
    Set {
        elements: Vec<Expression>,
        span: Span,
    },
    /// `a..b`, `..b` or `a..`
    Range {
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Self::Identifier { span, .. }
            | Self::Literal { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::MemberAccess { span, .. }
            | Self::Call { span, .. }
            | Self::ArrayAccess { span, .. }
            | Self::Set { span, .. }
            | Self::Range { span, .. } => *span,
        }
    }

    /// Placeholder substituted where a malformed construct was recovered
    pub fn placeholder(span: Span) -> Self {
        Self::Identifier {
            name: String::new(),
            span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiteralKind {
    Integer,
    Decimal,
    String,
    Boolean,
    Date,
    Time,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    /// String contents, or the date/time literal text without its suffix
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "XOR")]
    Xor,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<>")]
    NotEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
    #[serde(rename = "DIV")]
    IntegerDivide,
    #[serde(rename = "MOD")]
    Modulo,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::And => "AND",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::In => "IN",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntegerDivide => "DIV",
            Self::Modulo => "MOD",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "-")]
    Negate,
    #[serde(rename = "+")]
    Plus,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "NOT",
            Self::Negate => "-",
            Self::Plus => "+",
        }
    }
}
