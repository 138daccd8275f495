use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::Code;

/// Pipeline processing errors
///
/// Only reading and tokenizing can fail. Syntax problems never abort the
/// pipeline; they are diagnostics on the parse output.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Lexical analysis failed: {0}")]
    LexicalAnalysis(#[from] LexerError),
}

impl PipelineError {
    pub fn error_code(&self) -> Code {
        match self {
            PipelineError::FileProcessing(e) => e.error_code(),
            PipelineError::LexicalAnalysis(e) => e.error_code(),
        }
    }
}
