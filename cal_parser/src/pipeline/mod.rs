//! Pipeline: file -> lexical -> syntax
//!
//! Each call handles one document with its own parser instance, so batch
//! workers can run pipelines concurrently without sharing state.

mod error;
mod result;

pub use error::PipelineError;
pub use result::PipelineResult;

use crate::config::runtime::{FileProcessorPreferences, ParserPreferences};
use crate::file_processor::{FileMetadata, FileProcessor};
use crate::logging;
use crate::syntax::CalParser;
use std::path::PathBuf;
use std::time::Instant;

/// Tokenize and parse C/AL source text with default preferences
pub fn parse_source(source: &str) -> Result<PipelineResult, PipelineError> {
    parse_source_with_preferences(source, &ParserPreferences::default())
}

/// Tokenize and parse C/AL source text
pub fn parse_source_with_preferences(
    source: &str,
    preferences: &ParserPreferences,
) -> Result<PipelineResult, PipelineError> {
    run(source, None, preferences, Instant::now())
}

/// Read, tokenize and parse one export file with default preferences
pub fn process_file(file_path: &str) -> Result<PipelineResult, PipelineError> {
    process_file_with_preferences(
        file_path,
        &FileProcessorPreferences::default(),
        &ParserPreferences::default(),
    )
}

/// Read, tokenize and parse one export file
pub fn process_file_with_preferences(
    file_path: &str,
    file_preferences: &FileProcessorPreferences,
    parser_preferences: &ParserPreferences,
) -> Result<PipelineResult, PipelineError> {
    let start_time = Instant::now();

    let process = || -> Result<PipelineResult, PipelineError> {
        crate::log_info!("Starting C/AL parsing pipeline", "file" => file_path);

        let file_result = FileProcessor::from_preferences(file_preferences).process_file(file_path)?;
        let result = run(
            &file_result.source,
            Some(file_result.metadata),
            parser_preferences,
            start_time,
        )?;

        result.log_success(file_path);
        Ok(result)
    };

    // Batch workers install their own context with the real file id
    if logging::get_current_file_context().is_some() {
        process()
    } else {
        logging::with_file_context(PathBuf::from(file_path), 0, process)
    }
}

fn run(
    source: &str,
    file_metadata: Option<FileMetadata>,
    preferences: &ParserPreferences,
    start_time: Instant,
) -> Result<PipelineResult, PipelineError> {
    let (tokens, lexical_metrics) = crate::lexical::tokenize_with_metrics(source)?;
    let token_count = tokens.len();

    let output = CalParser::with_preferences(tokens, preferences.clone()).parse();

    Ok(PipelineResult {
        output,
        file_metadata,
        lexical_metrics,
        token_count,
        duration: start_time.elapsed(),
    })
}
