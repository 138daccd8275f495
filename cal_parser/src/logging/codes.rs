//! Consolidated error codes and classification system
//!
//! Single source of truth for every code the crate emits, together with the
//! behavioural metadata used by events, diagnostics and the CLI.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for Code {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// File processing error codes
pub mod file_processing {
    use super::Code;

    pub const FILE_NOT_FOUND: Code = Code::new("E005");
    pub const INVALID_EXTENSION: Code = Code::new("E006");
    pub const FILE_TOO_LARGE: Code = Code::new("E007");
    pub const EMPTY_FILE: Code = Code::new("E008");
    pub const PERMISSION_DENIED: Code = Code::new("E009");
    pub const INVALID_ENCODING: Code = Code::new("E010");
    pub const IO_ERROR: Code = Code::new("E011");
    pub const INVALID_PATH: Code = Code::new("E012");
}

/// Lexical analysis codes
pub mod lexical {
    use super::Code;

    pub const INVALID_CHARACTER: Code = Code::new("E020");
    pub const UNTERMINATED_STRING: Code = Code::new("E021");
    pub const INVALID_NUMBER: Code = Code::new("E022");
    pub const IDENTIFIER_TOO_LONG: Code = Code::new("E023");
    pub const STRING_TOO_LARGE: Code = Code::new("E024");
    pub const TOO_MANY_TOKENS: Code = Code::new("E027");
    pub const UNTERMINATED_COMMENT: Code = Code::new("E028");
}

/// Syntax diagnostics recorded by the parser
pub mod syntax {
    use super::Code;

    pub const UNEXPECTED_TOKEN: Code = Code::new("E050");
    pub const UNEXPECTED_END_OF_INPUT: Code = Code::new("E051");
    pub const MISSING_DELIMITER: Code = Code::new("E052");
    pub const RESERVED_KEYWORD_AS_IDENTIFIER: Code = Code::new("E053");
    pub const INVALID_INTEGER_LITERAL: Code = Code::new("E054");
    pub const INVALID_TYPE_DESCRIPTOR: Code = Code::new("E055");
    pub const ARRAY_DIMENSION_LIMIT: Code = Code::new("E056");
    pub const INVALID_FOR_TARGET: Code = Code::new("E057");
    pub const MISSING_NAME: Code = Code::new("E058");
    pub const UNKNOWN_TRIGGER: Code = Code::new("E059");
    pub const AL_ONLY_CONSTRUCT: Code = Code::new("E060");
    pub const MAX_RECURSION_DEPTH: Code = Code::new("E087");
    pub const DIAGNOSTIC_LIMIT_REACHED: Code = Code::new("E088");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const OPERATION_COMPLETED_SUCCESSFULLY: Code = Code::new("I001");
    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I004");
    pub const FILE_PROCESSING_SUCCESS: Code = Code::new("I006");
    pub const FILE_DISCOVERY_COMPLETE: Code = Code::new("I007");
    pub const TOKENIZATION_COMPLETE: Code = Code::new("I020");
    pub const AST_CONSTRUCTION_COMPLETE: Code = Code::new("I040");
    pub const SECTION_SKIPPED: Code = Code::new("I041");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let mut registry = HashMap::new();
        let mut add = |code: &'static str,
                       category: &'static str,
                       severity: Severity,
                       recoverable: bool,
                       requires_halt: bool,
                       description: &'static str,
                       action: &'static str| {
            registry.insert(
                code,
                ErrorMetadata::new(
                    code,
                    category,
                    severity,
                    recoverable,
                    requires_halt,
                    description,
                    action,
                ),
            );
        };

        // System
        add("ERR001", "System", Severity::Critical, false, true,
            "Critical internal system error",
            "File a bug report with the failing input");
        add("ERR002", "System", Severity::Critical, false, true,
            "System initialization failure",
            "Check configuration and environment variables");

        // File processing
        add("E005", "FileProcessing", Severity::High, false, false,
            "File not found", "Verify the path exists");
        add("E006", "FileProcessing", Severity::Medium, true, false,
            "File extension is not a recognised C/AL export",
            "Export objects as .txt or adjust CAL_FILE_EXTENSIONS");
        add("E007", "FileProcessing", Severity::High, false, false,
            "File exceeds the compile-time size limit",
            "Split the export into smaller object files");
        add("E008", "FileProcessing", Severity::Low, true, false,
            "File is empty", "Nothing to parse");
        add("E009", "FileProcessing", Severity::High, false, false,
            "Permission denied", "Check file permissions");
        add("E010", "FileProcessing", Severity::Medium, false, false,
            "File is not valid UTF-8 and lossy decoding is disabled",
            "Enable CAL_FILE_LOSSY_DECODING or re-export as UTF-8");
        add("E011", "FileProcessing", Severity::High, false, false,
            "I/O error while reading file", "Retry or check the storage device");
        add("E012", "FileProcessing", Severity::Medium, false, false,
            "Invalid file path", "Provide a path to a regular file");

        // Lexical
        add("E020", "Lexical", Severity::Low, true, false,
            "Character not valid in C/AL source",
            "Remove the character or quote the surrounding name");
        add("E021", "Lexical", Severity::Medium, true, false,
            "String literal not terminated before end of line",
            "Close the string with a single quote");
        add("E022", "Lexical", Severity::Medium, true, false,
            "Malformed numeric literal", "Check digits and the D/T/DT suffix");
        add("E023", "Lexical", Severity::Medium, false, false,
            "Identifier exceeds the compile-time length limit",
            "Shorten the identifier");
        add("E024", "Lexical", Severity::High, false, false,
            "String literal exceeds the compile-time size limit",
            "Shorten the literal");
        add("E027", "Lexical", Severity::High, false, true,
            "Token count exceeds the compile-time limit",
            "Split the export into smaller object files");
        add("E028", "Lexical", Severity::Medium, true, false,
            "Block comment not terminated", "Close the comment");

        // Syntax
        add("E050", "Syntax", Severity::High, true, false,
            "Unexpected token", "Check the construct against C/AL syntax");
        add("E051", "Syntax", Severity::High, true, false,
            "Input ended inside a construct",
            "The export may be truncated; re-export the object");
        add("E052", "Syntax", Severity::Medium, true, false,
            "Missing delimiter", "Insert the missing ';' or closing bracket");
        add("E053", "Syntax", Severity::High, true, false,
            "Reserved keyword used as a name",
            "Rename the variable or quote the name");
        add("E054", "Syntax", Severity::Medium, true, false,
            "Integer literal out of range", "Use a value within 64-bit range");
        add("E055", "Syntax", Severity::Medium, true, false,
            "Malformed DotNet or Automation type descriptor",
            "Re-export the object from the development environment");
        add("E056", "Syntax", Severity::Medium, true, false,
            "Array declares more than ten dimensions",
            "Reduce the number of array dimensions");
        add("E057", "Syntax", Severity::Medium, true, false,
            "FOR loop variable must be a name or field reference",
            "Use a plain variable as the loop counter");
        add("E058", "Syntax", Severity::Medium, true, false,
            "Declaration is missing its name", "Add the missing name");
        add("E059", "Syntax", Severity::Low, true, false,
            "Trigger name is not a known C/AL trigger",
            "Check the trigger name spelling");
        add("E060", "Syntax", Severity::Medium, true, false,
            "AL-only construct found in C/AL source",
            "Rewrite the construct with its C/AL equivalent");
        add("E087", "Syntax", Severity::High, true, false,
            "Nesting exceeds the maximum parse depth",
            "Reduce nesting of statements or expressions");
        add("E088", "Syntax", Severity::Medium, true, false,
            "Diagnostic limit reached; further diagnostics were dropped",
            "Fix the reported problems and parse again");

        // Success
        add("I001", "Success", Severity::Low, true, false,
            "Operation completed successfully", "None");
        add("I004", "Success", Severity::Low, true, false,
            "System initialization completed", "None");
        add("I006", "Success", Severity::Low, true, false,
            "File processed", "None");
        add("I007", "Success", Severity::Low, true, false,
            "File discovery completed", "None");
        add("I020", "Success", Severity::Low, true, false,
            "Tokenization completed", "None");
        add("I040", "Success", Severity::Low, true, false,
            "Syntax tree construction completed", "None");
        add("I041", "Success", Severity::Low, true, false,
            "Unsupported section skipped", "None");

        registry
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Check if error is recoverable
pub fn is_recoverable(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recoverable)
        .unwrap_or(true)
}

/// Check if error requires immediate halt
pub fn requires_halt(code: &str) -> bool {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.requires_halt)
        .unwrap_or(false)
}

/// Human-readable description for a code
pub fn get_description(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.description)
        .unwrap_or("Unknown error")
}

/// Recommended action for a code
pub fn get_action(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.recommended_action)
        .unwrap_or("No specific action available")
}

/// Category for a code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}
