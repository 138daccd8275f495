//! Builder functions for C/AL grammar productions
//!
//! Dependency order, leaves first:
//! `atomic` → `expressions` → `statements` → `types` → `declarations` →
//! `objects`, with `helpers` (error recovery) used throughout.

pub mod atomic;
pub mod declarations;
pub mod expressions;
pub mod helpers;
pub mod objects;
pub mod statements;
pub mod types;

pub use atomic::Parser;
pub use declarations::{parse_code_section, parse_procedure, parse_variable_block};
pub use expressions::parse_expression;
pub use helpers::parse_with_recovery;
pub use objects::{parse_document, parse_object, parse_property};
pub use statements::{parse_statement, parse_statement_list};
pub use types::{parse_automation_descriptor, parse_data_type, parse_dotnet_descriptor, TypeStringError};
