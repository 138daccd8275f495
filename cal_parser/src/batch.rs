//! Batch processing of C/AL export directories
//!
//! Discovers object exports in a directory and runs the pipeline over each
//! one, sequentially or on a fixed set of worker threads. Every file gets its
//! own parser instance; workers share nothing but the result collector.

use crate::config::compile_time::batch_processing::{MAX_FILES_PER_BATCH, MAX_WORKER_THREADS};
use crate::config::runtime::{FileProcessorPreferences, ParserPreferences};
use crate::file_processor::FileProcessor;
use crate::logging::{self, codes};
use crate::pipeline::{self, PipelineError, PipelineResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Batch processing configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_threads: usize,
    pub recursive: bool,
    pub max_files: Option<usize>,
    pub progress_reporting: bool,
    pub fail_fast: bool,
    pub file_preferences: FileProcessorPreferences,
    pub parser_preferences: ParserPreferences,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_threads: thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4)
                .min(MAX_WORKER_THREADS),
            recursive: true,
            max_files: None,
            progress_reporting: true,
            fail_fast: false,
            file_preferences: FileProcessorPreferences::default(),
            parser_preferences: ParserPreferences::default(),
        }
    }
}

impl BatchConfig {
    fn thread_count(&self) -> usize {
        self.max_threads.clamp(1, MAX_WORKER_THREADS)
    }
}

/// Batch processing results
#[derive(Debug)]
pub struct BatchResults {
    /// Files the pipeline completed for, whether or not they had diagnostics
    pub successful_files: Vec<(PathBuf, PipelineResult)>,
    /// Files that could not be read or tokenized
    pub failed_files: Vec<(PathBuf, PipelineError)>,
    pub processing_duration: Duration,
    pub files_processed: usize,
    pub files_discovered: usize,
}

impl BatchResults {
    pub fn new() -> Self {
        Self {
            successful_files: Vec::new(),
            failed_files: Vec::new(),
            processing_duration: Duration::new(0, 0),
            files_processed: 0,
            files_discovered: 0,
        }
    }

    pub fn success_count(&self) -> usize {
        self.successful_files.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed_files.len()
    }

    pub fn success_rate(&self) -> f64 {
        if self.files_processed == 0 {
            0.0
        } else {
            self.successful_files.len() as f64 / self.files_processed as f64
        }
    }

    /// Parsed files that produced at least one diagnostic
    pub fn files_with_diagnostics(&self) -> usize {
        self.successful_files
            .iter()
            .filter(|(_, result)| !result.is_clean())
            .count()
    }

    pub fn total_diagnostics(&self) -> usize {
        self.successful_files
            .iter()
            .map(|(_, result)| result.diagnostic_count())
            .sum()
    }

    pub fn add_success(&mut self, file_path: PathBuf, result: PipelineResult) {
        self.successful_files.push((file_path, result));
        self.files_processed += 1;
    }

    pub fn add_failure(&mut self, file_path: PathBuf, error: PipelineError) {
        self.failed_files.push((file_path, error));
        self.files_processed += 1;
    }

    pub fn merge(&mut self, other: BatchResults) {
        self.successful_files.extend(other.successful_files);
        self.failed_files.extend(other.failed_files);
        self.files_processed += other.files_processed;
    }

    /// Order results by path so parallel runs report deterministically
    fn sort(&mut self) {
        self.successful_files.sort_by(|a, b| a.0.cmp(&b.0));
        self.failed_files.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pub fn summary(&self) -> String {
        format!(
            "Batch processing completed: {} files processed, {} parsed ({:.1}%), {} with diagnostics, {} failed, {:.2}s total",
            self.files_processed,
            self.success_count(),
            self.success_rate() * 100.0,
            self.files_with_diagnostics(),
            self.failure_count(),
            self.processing_duration.as_secs_f64()
        )
    }
}

impl Default for BatchResults {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch processing errors
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Permission denied accessing directory: {path}")]
    PermissionDenied { path: String },

    #[error("No C/AL export files found in directory: {path}")]
    NoFilesFound { path: String },

    #[error("Too many files found: more than {max}")]
    TooManyFiles { max: usize },

    #[error("IO error during directory traversal: {error}")]
    IoError { error: String },

    #[error("Worker thread error: {message}")]
    ThreadError { message: String },
}

impl BatchError {
    fn from_io(path: &Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => BatchError::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => BatchError::IoError {
                error: format!("{}: {}", path.display(), e),
            },
        }
    }
}

// ============================================================================
// FILE DISCOVERY
// ============================================================================

/// Discover C/AL export files in a directory, sorted by path
pub fn discover_export_files(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<Vec<PathBuf>, BatchError> {
    crate::log_info!("Starting file discovery",
        "directory" => dir_path.display(),
        "recursive" => config.recursive
    );

    if !dir_path.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: dir_path.display().to_string(),
        });
    }

    let processor = FileProcessor::from_preferences(&config.file_preferences);
    let limit = config
        .max_files
        .map_or(MAX_FILES_PER_BATCH, |max| max.min(MAX_FILES_PER_BATCH));

    let mut files = Vec::new();
    visit_directory(dir_path, &processor, config.recursive, &mut files)?;

    if files.is_empty() {
        return Err(BatchError::NoFilesFound {
            path: dir_path.display().to_string(),
        });
    }

    files.sort();

    if files.len() > limit {
        if config.max_files.is_none() {
            return Err(BatchError::TooManyFiles {
                max: MAX_FILES_PER_BATCH,
            });
        }
        crate::log_warning!(
            "Reached maximum file limit",
            "files_found" => files.len(),
            "limit" => limit
        );
        files.truncate(limit);
    }

    crate::log_success!(
        codes::success::FILE_DISCOVERY_COMPLETE,
        "File discovery completed",
        "files_found" => files.len(),
        "directory" => dir_path.display()
    );

    Ok(files)
}

fn visit_directory(
    dir_path: &Path,
    processor: &FileProcessor,
    recursive: bool,
    files: &mut Vec<PathBuf>,
) -> Result<(), BatchError> {
    let entries = fs::read_dir(dir_path).map_err(|e| BatchError::from_io(dir_path, e))?;

    for entry in entries {
        let path = entry.map_err(|e| BatchError::from_io(dir_path, e))?.path();

        if path.is_dir() {
            if recursive {
                visit_directory(&path, processor, recursive, files)?;
            }
        } else if path.is_file() && processor.accepts_extension(&path) {
            files.push(path);
            // Discovery itself is bounded so a huge tree cannot exhaust memory
            if files.len() > MAX_FILES_PER_BATCH {
                return Ok(());
            }
        }
    }

    Ok(())
}

// ============================================================================
// BATCH PROCESSING
// ============================================================================

fn process_one(file_path: &Path, config: &BatchConfig) -> Result<PipelineResult, PipelineError> {
    pipeline::process_file_with_preferences(
        &file_path.to_string_lossy(),
        &config.file_preferences,
        &config.parser_preferences,
    )
}

fn log_outcome(file_path: &Path, outcome: &Result<PipelineResult, PipelineError>) {
    match outcome {
        Ok(result) => crate::log_debug!("File parsed",
            "file" => file_path.display(),
            "diagnostics" => result.diagnostic_count()
        ),
        Err(error) => crate::log_error!(
            error.error_code(),
            "File processing failed",
            "file" => file_path.display(),
            "error" => error
        ),
    }
}

/// Process a directory of exports one file at a time
pub fn process_directory_sequential(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();

    crate::log_info!("Starting sequential batch processing",
        "directory" => dir_path.display()
    );

    let files = discover_export_files(dir_path, config)?;
    let mut results = BatchResults::new();
    results.files_discovered = files.len();

    for (file_id, file_path) in files.iter().enumerate() {
        if config.progress_reporting {
            println!(
                "Processing file {} of {}: {}",
                file_id + 1,
                files.len(),
                file_path.display()
            );
        }

        let outcome = logging::with_file_context(file_path.clone(), file_id, || {
            let outcome = process_one(file_path, config);
            log_outcome(file_path, &outcome);
            outcome
        });

        match outcome {
            Ok(result) => results.add_success(file_path.clone(), result),
            Err(error) => {
                results.add_failure(file_path.clone(), error);
                if config.fail_fast {
                    crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
                    break;
                }
            }
        }
    }

    results.processing_duration = start_time.elapsed();

    crate::log_success!(
        codes::success::OPERATION_COMPLETED_SUCCESSFULLY,
        "Sequential batch processing completed",
        "files_processed" => results.files_processed,
        "parsed" => results.success_count(),
        "failed" => results.failure_count(),
        "diagnostics" => results.total_diagnostics(),
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

/// Process a directory of exports on worker threads
pub fn process_directory_parallel(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let start_time = Instant::now();
    let threads = config.thread_count();

    crate::log_info!("Starting parallel batch processing",
        "directory" => dir_path.display(),
        "max_threads" => threads
    );

    let files = discover_export_files(dir_path, config)?;
    let mut results = BatchResults::new();
    results.files_discovered = files.len();

    let chunk_size = calculate_chunk_size(files.len(), threads);

    crate::log_debug!("Parallel processing configuration",
        "total_files" => files.len(),
        "chunk_size" => chunk_size,
        "threads" => threads
    );

    for (chunk_index, chunk) in files.chunks(chunk_size).enumerate() {
        let chunk_results = process_chunk_parallel(chunk, chunk_index * chunk_size, config)?;
        results.merge(chunk_results);

        if config.fail_fast && results.failure_count() > 0 {
            crate::log_warning!("Fail-fast mode enabled, stopping batch processing");
            break;
        }
    }

    results.sort();
    results.processing_duration = start_time.elapsed();

    crate::log_success!(
        codes::success::OPERATION_COMPLETED_SUCCESSFULLY,
        "Parallel batch processing completed",
        "files_processed" => results.files_processed,
        "parsed" => results.success_count(),
        "failed" => results.failure_count(),
        "diagnostics" => results.total_diagnostics(),
        "threads_used" => threads,
        "duration_ms" => format!("{:.2}", results.processing_duration.as_secs_f64() * 1000.0)
    );

    Ok(results)
}

/// Split one chunk across the worker threads
fn process_chunk_parallel(
    files: &[PathBuf],
    first_file_id: usize,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    let results = Arc::new(Mutex::new(BatchResults::new()));
    let threads = config.thread_count();
    let files_per_thread = files.len().div_ceil(threads);

    let mut handles = Vec::new();

    for thread_id in 0..threads {
        let start_idx = thread_id * files_per_thread;
        if start_idx >= files.len() {
            break;
        }
        let end_idx = ((thread_id + 1) * files_per_thread).min(files.len());

        let thread_files: Vec<PathBuf> = files[start_idx..end_idx].to_vec();
        let results_clone = Arc::clone(&results);
        let thread_config = config.clone();

        let handle = thread::spawn(move || {
            for (local_file_id, file_path) in thread_files.into_iter().enumerate() {
                let file_id = first_file_id + start_idx + local_file_id;

                let outcome = logging::with_file_context(file_path.clone(), file_id, || {
                    let outcome = process_one(&file_path, &thread_config);
                    log_outcome(&file_path, &outcome);
                    outcome
                });

                let mut guard = results_clone
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                match outcome {
                    Ok(result) => guard.add_success(file_path, result),
                    Err(error) => guard.add_failure(file_path, error),
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().map_err(|_| BatchError::ThreadError {
            message: "Worker thread panicked during processing".to_string(),
        })?;
    }

    let mutex = Arc::try_unwrap(results).map_err(|_| BatchError::ThreadError {
        message: "Result collector still shared after workers finished".to_string(),
    })?;
    Ok(mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
}

/// Files per chunk; bounded so results are merged (and fail-fast checked)
/// at regular intervals
fn calculate_chunk_size(file_count: usize, threads: usize) -> usize {
    const MIN_CHUNK_SIZE: usize = 1;
    const MAX_CHUNK_SIZE: usize = 50;

    file_count
        .div_ceil(threads.max(1))
        .clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Process a directory with default configuration
pub fn process_directory(dir_path: &Path) -> Result<BatchResults, BatchError> {
    process_directory_with_config(dir_path, &BatchConfig::default())
}

/// Process a directory with custom configuration
pub fn process_directory_with_config(
    dir_path: &Path,
    config: &BatchConfig,
) -> Result<BatchResults, BatchError> {
    if config.thread_count() == 1 {
        process_directory_sequential(dir_path, config)
    } else {
        process_directory_parallel(dir_path, config)
    }
}
