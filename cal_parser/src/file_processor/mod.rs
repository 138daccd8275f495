//! File processor: reads C/AL object exports with compile-time limits

mod processor;

use crate::config::compile_time::file_processing::MAX_FILE_SIZE;
use crate::config::runtime::FileProcessorPreferences;
pub use processor::{
    decode_latin1, FileMetadata, FileProcessingResult, FileProcessor, FileProcessorError,
    SourceEncoding,
};

/// Process a file with default preferences
pub fn process_file(file_path: &str) -> Result<FileProcessingResult, FileProcessorError> {
    FileProcessor::new().process_file(file_path)
}

/// Create a file processor from runtime preferences
pub fn create_processor_from_preferences(prefs: &FileProcessorPreferences) -> FileProcessor {
    FileProcessor::from_preferences(prefs)
}

/// Get the compile-time maximum file size limit
pub fn get_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_module_api() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("COD80.txt");
        fs::write(&file_path, "OBJECT Codeunit 80 Sales-Post\n{\n}\n").unwrap();

        let result = process_file(file_path.to_str().unwrap()).unwrap();
        assert!(result.source.starts_with("OBJECT Codeunit 80"));
    }

    #[test]
    fn test_processor_from_preferences() {
        let prefs = FileProcessorPreferences {
            allowed_extensions: vec!["cal".to_string()],
            lossy_decoding: false,
        };
        let processor = create_processor_from_preferences(&prefs);
        assert!(processor.accepts_extension(std::path::Path::new("a.CAL")));
        assert!(!processor.accepts_extension(std::path::Path::new("a.txt")));
        assert!(!processor.preferences().lossy_decoding);
    }

    #[test]
    fn test_max_file_size_is_positive() {
        assert!(get_max_file_size() > 0);
    }
}
