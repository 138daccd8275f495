//! Reads C/AL object exports from disk with compile-time size limits

use crate::config::compile_time::file_processing::{LARGE_FILE_THRESHOLD, MAX_FILE_SIZE};
use crate::config::runtime::FileProcessorPreferences;
use crate::logging::codes;
use crate::{log_debug, log_error, log_success, log_warning};
use std::fs;
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// File processor specific errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum FileProcessorError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file extension: expected one of {allowed:?}, found {extension:?}")]
    InvalidExtension {
        extension: Option<String>,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("File is not valid UTF-8: {path}")]
    InvalidEncoding { path: String },

    #[error("I/O error reading file: {message}")]
    IoError { message: String },

    #[error("Invalid file path: {path}")]
    InvalidPath { path: String },
}

impl FileProcessorError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            FileProcessorError::FileNotFound { .. } => codes::file_processing::FILE_NOT_FOUND,
            FileProcessorError::InvalidExtension { .. } => {
                codes::file_processing::INVALID_EXTENSION
            }
            FileProcessorError::FileTooLarge { .. } => codes::file_processing::FILE_TOO_LARGE,
            FileProcessorError::EmptyFile => codes::file_processing::EMPTY_FILE,
            FileProcessorError::PermissionDenied { .. } => {
                codes::file_processing::PERMISSION_DENIED
            }
            FileProcessorError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            FileProcessorError::IoError { .. } => codes::file_processing::IO_ERROR,
            FileProcessorError::InvalidPath { .. } => codes::file_processing::INVALID_PATH,
        }
    }

    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    pub fn is_recoverable(&self) -> bool {
        codes::is_recoverable(self.error_code().as_str())
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.error_code().as_str())
    }
}

/// How the file bytes became text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    /// UTF-8 with a leading byte-order mark, which is stripped
    Utf8Bom,
    /// Not valid UTF-8; each byte was mapped to the code point of equal value
    Latin1,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Utf8Bom => "utf-8-bom",
            SourceEncoding::Latin1 => "latin-1",
        }
    }
}

/// File metadata collected during processing
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub extension: Option<String>,
    pub line_count: usize,
    pub encoding: SourceEncoding,
}

impl FileMetadata {
    /// Get file size in human-readable format
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size)
    }

    pub fn is_large_file(&self) -> bool {
        self.size > LARGE_FILE_THRESHOLD
    }
}

pub(crate) fn human_readable_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Source text of one export plus its metadata
#[derive(Debug, Clone)]
pub struct FileProcessingResult {
    pub source: String,
    pub metadata: FileMetadata,
    pub processing_duration: std::time::Duration,
}

impl FileProcessingResult {
    /// Check if file is empty content-wise (only whitespace)
    pub fn is_effectively_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

pub struct FileProcessor {
    preferences: FileProcessorPreferences,
}

impl FileProcessor {
    pub fn new() -> Self {
        Self::from_preferences(&FileProcessorPreferences::default())
    }

    pub fn from_preferences(prefs: &FileProcessorPreferences) -> Self {
        Self {
            preferences: prefs.clone(),
        }
    }

    pub fn with_lossy_decoding(mut self, enabled: bool) -> Self {
        self.preferences.lossy_decoding = enabled;
        self
    }

    pub fn with_allowed_extensions(mut self, extensions: &[&str]) -> Self {
        self.preferences.allowed_extensions =
            extensions.iter().map(|ext| ext.to_lowercase()).collect();
        self
    }

    pub fn preferences(&self) -> &FileProcessorPreferences {
        &self.preferences
    }

    /// Whether `path` carries one of the accepted export extensions
    pub fn accepts_extension(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.preferences.allowed_extensions.contains(&ext))
    }

    /// Read and decode one export file
    pub fn process_file(
        &self,
        file_path: &str,
    ) -> Result<FileProcessingResult, FileProcessorError> {
        let start_time = std::time::Instant::now();

        log_debug!("Starting file processing", "file" => file_path);

        let path = self.validate_path(file_path)?;
        let size = self.read_size(&path)?;
        self.validate_file(&path, size, file_path)?;

        let bytes = self.read_bytes(&path, file_path)?;
        let (source, encoding) = self.decode(bytes, file_path)?;

        let metadata = FileMetadata {
            extension: extension_of(&path),
            path,
            size,
            line_count: source.lines().count(),
            encoding,
        };

        let result = FileProcessingResult {
            source,
            metadata,
            processing_duration: start_time.elapsed(),
        };

        log_success!(
            codes::success::FILE_PROCESSING_SUCCESS,
            "File processed successfully",
            "file" => file_path,
            "size" => result.metadata.human_readable_size(),
            "lines" => result.metadata.line_count,
            "encoding" => result.metadata.encoding.as_str(),
            "large_file" => result.metadata.is_large_file(),
            "duration_ms" => format!("{:.2}", result.processing_duration.as_secs_f64() * 1000.0)
        );

        Ok(result)
    }

    fn validate_path(&self, file_path: &str) -> Result<PathBuf, FileProcessorError> {
        if file_path.is_empty() {
            let error = FileProcessorError::InvalidPath {
                path: file_path.to_string(),
            };
            log_error!(error.error_code(), "Empty file path provided");
            return Err(error);
        }

        let path = Path::new(file_path);

        if !path.exists() {
            let error = FileProcessorError::FileNotFound {
                path: file_path.to_string(),
            };
            log_error!(error.error_code(), "File not found", "path" => file_path);
            return Err(error);
        }

        if !path.is_file() {
            let error = FileProcessorError::InvalidPath {
                path: file_path.to_string(),
            };
            log_error!(error.error_code(), "Path is not a file", "path" => file_path);
            return Err(error);
        }

        Ok(path.to_path_buf())
    }

    fn read_size(&self, path: &Path) -> Result<u64, FileProcessorError> {
        fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|e| io_failure(path, &e, "Failed to read file metadata"))
    }

    fn validate_file(
        &self,
        path: &Path,
        size: u64,
        file_path: &str,
    ) -> Result<(), FileProcessorError> {
        if size > MAX_FILE_SIZE {
            let error = FileProcessorError::FileTooLarge {
                size,
                max_size: MAX_FILE_SIZE,
            };
            log_error!(error.error_code(), "File exceeds compile-time maximum size limit",
                "file" => file_path,
                "size" => human_readable_size(size),
                "limit" => human_readable_size(MAX_FILE_SIZE));
            return Err(error);
        }

        if size == 0 {
            let error = FileProcessorError::EmptyFile;
            log_error!(error.error_code(), "File is empty", "file" => file_path);
            return Err(error);
        }

        if !self.accepts_extension(path) {
            let error = FileProcessorError::InvalidExtension {
                extension: extension_of(path),
                allowed: self.preferences.allowed_extensions.clone(),
            };
            log_error!(error.error_code(), "File is not a recognised C/AL export",
                "file" => file_path,
                "allowed" => self.preferences.allowed_extensions.join(","));
            return Err(error);
        }

        Ok(())
    }

    fn read_bytes(&self, path: &Path, file_path: &str) -> Result<Vec<u8>, FileProcessorError> {
        let bytes = fs::read(path).map_err(|e| io_failure(path, &e, "Failed to read file"))?;
        log_debug!("File content read", "file" => file_path, "bytes" => bytes.len());
        Ok(bytes)
    }

    fn decode(
        &self,
        bytes: Vec<u8>,
        file_path: &str,
    ) -> Result<(String, SourceEncoding), FileProcessorError> {
        if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
            if let Ok(text) = std::str::from_utf8(rest) {
                return Ok((text.to_string(), SourceEncoding::Utf8Bom));
            }
        }

        match String::from_utf8(bytes) {
            Ok(text) => Ok((text, SourceEncoding::Utf8)),
            Err(e) if self.preferences.lossy_decoding => {
                log_warning!("Export is not UTF-8, decoding as Latin-1",
                    "file" => file_path,
                    "first_invalid_byte" => e.utf8_error().valid_up_to());
                Ok((decode_latin1(e.as_bytes()), SourceEncoding::Latin1))
            }
            Err(_) => {
                let error = FileProcessorError::InvalidEncoding {
                    path: file_path.to_string(),
                };
                log_error!(error.error_code(), "Export is not UTF-8", "file" => file_path);
                Err(error)
            }
        }
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map every byte to the Unicode code point with the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

fn io_failure(path: &Path, e: &std::io::Error, message: &str) -> FileProcessorError {
    let path_str = path.display().to_string();
    let error = match e.kind() {
        std::io::ErrorKind::PermissionDenied => FileProcessorError::PermissionDenied {
            path: path_str.clone(),
        },
        std::io::ErrorKind::NotFound => FileProcessorError::FileNotFound {
            path: path_str.clone(),
        },
        _ => FileProcessorError::IoError {
            message: format!("{} '{}': {}", message, path_str, e),
        },
    };
    log_error!(error.error_code(), message,
        "path" => path_str,
        "io_error" => e);
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    const TABLE: &str = "OBJECT Table 18 Customer\n{\n  FIELDS\n  {\n  }\n}\n";

    #[test]
    fn test_process_valid_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("TAB18.TXT");
        fs::write(&file_path, TABLE).unwrap();

        let result = FileProcessor::new()
            .process_file(file_path.to_str().unwrap())
            .unwrap();
        assert_eq!(result.source, TABLE);
        assert_eq!(result.metadata.line_count, 6);
        assert_eq!(result.metadata.extension.as_deref(), Some("txt"));
        assert_eq!(result.metadata.encoding, SourceEncoding::Utf8);
        assert!(!result.is_effectively_empty());
    }

    #[test]
    fn test_file_not_found() {
        let result = FileProcessor::new().process_file("nonexistent.txt");
        assert_matches!(result, Err(FileProcessorError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_invalid_path() {
        let dir = tempdir().unwrap();
        let result = FileProcessor::new().process_file(dir.path().to_str().unwrap());
        assert_matches!(result, Err(FileProcessorError::InvalidPath { .. }));
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("empty.txt");
        fs::write(&file_path, "").unwrap();

        let result = FileProcessor::new().process_file(file_path.to_str().unwrap());
        assert_matches!(result, Err(FileProcessorError::EmptyFile));
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("object.al");
        fs::write(&file_path, TABLE).unwrap();

        let processor = FileProcessor::new().with_allowed_extensions(&["txt", "cal"]);
        let result = processor.process_file(file_path.to_str().unwrap());
        assert_matches!(
            result,
            Err(FileProcessorError::InvalidExtension { extension: Some(ref ext), .. }) if ext == "al"
        );

        let processor = processor.with_allowed_extensions(&["al"]);
        assert!(processor.process_file(file_path.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bom.txt");
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(TABLE.as_bytes());
        fs::write(&file_path, bytes).unwrap();

        let result = FileProcessor::new()
            .process_file(file_path.to_str().unwrap())
            .unwrap();
        assert!(result.source.starts_with("OBJECT"));
        assert_eq!(result.metadata.encoding, SourceEncoding::Utf8Bom);
    }

    #[test]
    fn test_latin1_fallback() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("legacy.txt");
        // 0xDF is sharp s in Latin-1
        let mut bytes = b"OBJECT Table 50000 Stra".to_vec();
        bytes.push(0xDF);
        bytes.extend_from_slice(b"e\n{\n}\n");
        fs::write(&file_path, &bytes).unwrap();

        let result = FileProcessor::new()
            .with_lossy_decoding(true)
            .process_file(file_path.to_str().unwrap())
            .unwrap();
        assert_eq!(result.metadata.encoding, SourceEncoding::Latin1);
        assert!(result.source.contains("Straße"));

        let strict = FileProcessor::new().with_lossy_decoding(false);
        assert_matches!(
            strict.process_file(file_path.to_str().unwrap()),
            Err(FileProcessorError::InvalidEncoding { .. })
        );
    }

    #[test]
    fn test_error_codes() {
        let error = FileProcessorError::FileNotFound {
            path: "x.txt".to_string(),
        };
        assert_eq!(error.error_code().as_str(), "E005");
        assert_eq!(error.category(), "FileProcessing");
        assert!(!error.is_recoverable());
        assert_eq!(FileProcessorError::EmptyFile.error_code().as_str(), "E008");
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(512), "512 B");
        assert_eq!(human_readable_size(2048), "2.00 KB");
        assert_eq!(human_readable_size(3 * 1024 * 1024), "3.00 MB");
    }
}
