use cal_parser::config::runtime::RuntimeConfig;
use cal_parser::{batch, logging, pipeline};
use std::env;
use std::path::Path;

/// Command line options after the input path
#[derive(Debug)]
struct CliOptions {
    json: bool,
    config_file: Option<String>,
    batch: batch::BatchConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_global_logging()?;

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <object.txt|directory> [options]", args[0]);
        eprintln!("       {} --help", args[0]);
        std::process::exit(1);
    }

    if args[1] == "--help" {
        print_help(&args[0]);
        return Ok(());
    }

    let input_path = Path::new(&args[1]);
    let mut options = parse_options(&args[2..]);

    if let Some(config_file) = &options.config_file {
        let runtime = RuntimeConfig::from_toml_file(Path::new(config_file))?;
        options.batch.file_preferences = runtime.file_processor;
        options.batch.parser_preferences = runtime.parser;
    }

    let failed = if input_path.is_file() {
        process_single_file(&args[1], &options)
    } else if input_path.is_dir() {
        process_directory_batch(input_path, &options)
    } else {
        eprintln!("Error: Input must be a C/AL export file or a directory");
        eprintln!("  Path: {}", input_path.display());
        true
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_help(program_name: &str) {
    println!("C/AL Parser v{}", env!("CARGO_PKG_VERSION"));
    println!("Parses Dynamics NAV C/AL object exports into a syntax tree with diagnostics");
    println!();
    println!("USAGE:");
    println!("    {} <object.txt> [options]         # Parse one export", program_name);
    println!("    {} <directory> [options]          # Parse every export in a directory", program_name);
    println!();
    println!("OPTIONS:");
    println!("    --help              Show this help message");
    println!("    --json              Print the syntax tree and diagnostics as JSON");
    println!("    --config FILE       Load runtime preferences from a TOML file");
    println!("    --sequential        Force sequential processing (no parallelism)");
    println!("    --threads N         Set maximum number of worker threads (default: auto)");
    println!("    --no-recursive      Don't search subdirectories");
    println!("    --max-files N       Limit maximum files to process");
    println!("    --fail-fast         Stop on the first file that cannot be read");
    println!("    --quiet             Suppress progress reporting");
    println!();
    println!("OUTPUT:");
    println!("    Single file: one 'line:column: [code] message' line per diagnostic");
    println!("    Directory:   diagnostic counts per file and a summary");
    println!();
    println!("EXAMPLES:");
    println!("    {} TAB18.TXT --json", program_name);
    println!("    {} objects/ --threads 4", program_name);
    println!("    {} objects/ --sequential --fail-fast", program_name);
    println!();
    println!("BUILD:");
    println!("    {}", cal_parser::config::build_info::source_info());
}

fn parse_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        json: false,
        config_file: None,
        batch: batch::BatchConfig::default(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => options.json = true,
            "--sequential" => options.batch.max_threads = 1,
            "--threads" => match args.get(i + 1).map(|v| v.parse::<usize>()) {
                Some(Ok(threads)) => {
                    options.batch.max_threads = threads.max(1);
                    i += 1;
                }
                Some(Err(_)) => {
                    eprintln!("Warning: Invalid thread count '{}', using default", args[i + 1]);
                    i += 1;
                }
                None => eprintln!("Warning: --threads requires a number"),
            },
            "--no-recursive" => options.batch.recursive = false,
            "--max-files" => match args.get(i + 1).map(|v| v.parse::<usize>()) {
                Some(Ok(max_files)) => {
                    options.batch.max_files = Some(max_files);
                    i += 1;
                }
                Some(Err(_)) => {
                    eprintln!("Warning: Invalid max files '{}', ignoring", args[i + 1]);
                    i += 1;
                }
                None => eprintln!("Warning: --max-files requires a number"),
            },
            "--config" => match args.get(i + 1) {
                Some(path) => {
                    options.config_file = Some(path.clone());
                    i += 1;
                }
                None => eprintln!("Warning: --config requires a file path"),
            },
            "--fail-fast" => options.batch.fail_fast = true,
            "--quiet" => options.batch.progress_reporting = false,
            other => eprintln!("Warning: Unknown option '{}'", other),
        }
        i += 1;
    }

    options
}

/// Returns true when the file could not be parsed cleanly
fn process_single_file(file_path: &str, options: &CliOptions) -> bool {
    let result = match pipeline::process_file_with_preferences(
        file_path,
        &options.batch.file_preferences,
        &options.batch.parser_preferences,
    ) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("error[{}]: {}", error.error_code(), error);
            return true;
        }
    };

    if options.json {
        match serde_json::to_string_pretty(&result.output.report()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: cannot serialize parse result: {}", e);
                return true;
            }
        }
    } else {
        for error in &result.output.errors {
            println!(
                "{}:{}:{}: [{}] {}",
                file_path,
                error.line(),
                error.column(),
                error.code(),
                error.message()
            );
        }
        if !options.batch.progress_reporting {
            return result.output.has_errors();
        }
        match &result.output.document.object {
            Some(object) => println!(
                "{} {} {}: {} diagnostic(s), {} tokens",
                object.kind.as_str(),
                object.id,
                object.name,
                result.diagnostic_count(),
                result.token_count
            ),
            None => println!("No object found: {} diagnostic(s)", result.diagnostic_count()),
        }
    }

    result.output.has_errors()
}

/// Returns true when any file failed or produced diagnostics
fn process_directory_batch(dir_path: &Path, options: &CliOptions) -> bool {
    let config = &options.batch;
    if config.progress_reporting && !options.json {
        println!("Starting batch processing: {}", dir_path.display());
        println!(
            "Configuration: {} threads, recursive={}, fail_fast={}",
            config.max_threads, config.recursive, config.fail_fast
        );
    }

    let results = match batch::process_directory_with_config(dir_path, config) {
        Ok(results) => results,
        Err(error) => {
            eprintln!("Batch processing failed: {}", error);
            return true;
        }
    };

    if options.json {
        print_batch_json(&results);
    } else {
        print_batch_results(&results);
    }

    results.failure_count() > 0 || results.files_with_diagnostics() > 0
}

fn print_batch_results(results: &batch::BatchResults) {
    for (file_path, result) in &results.successful_files {
        if !result.is_clean() {
            println!("{}: {} diagnostic(s)", file_path.display(), result.diagnostic_count());
            for error in &result.output.errors {
                println!(
                    "  {}:{}: [{}] {}",
                    error.line(),
                    error.column(),
                    error.code(),
                    error.message()
                );
            }
        }
    }

    if results.failure_count() > 0 {
        println!("\nFailed Files:");
        for (file_path, error) in &results.failed_files {
            println!("  {}: [{}] {}", file_path.display(), error.error_code(), error);
        }
    }

    println!("\nBatch Processing Summary:");
    println!("  Files discovered: {}", results.files_discovered);
    println!("  Files processed: {}", results.files_processed);
    println!(
        "  Parsed: {} ({:.1}%)",
        results.success_count(),
        results.success_rate() * 100.0
    );
    println!("  With diagnostics: {}", results.files_with_diagnostics());
    println!("  Total diagnostics: {}", results.total_diagnostics());
    println!("  Failed: {}", results.failure_count());
    println!(
        "  Total time: {:.2}s",
        results.processing_duration.as_secs_f64()
    );

    let total_tokens: usize = results
        .successful_files
        .iter()
        .map(|(_, result)| result.token_count)
        .sum();
    let seconds = results.processing_duration.as_secs_f64();
    if seconds > 0.0 {
        println!("  Processing rate: {:.0} tokens/sec", total_tokens as f64 / seconds);
    }
}

fn print_batch_json(results: &batch::BatchResults) {
    let files: Vec<serde_json::Value> = results
        .successful_files
        .iter()
        .map(|(path, result)| {
            serde_json::json!({
                "file": path.display().to_string(),
                "diagnostics": result.output.errors,
            })
        })
        .chain(results.failed_files.iter().map(|(path, error)| {
            serde_json::json!({
                "file": path.display().to_string(),
                "error": { "code": error.error_code(), "message": error.to_string() },
            })
        }))
        .collect();

    let summary = serde_json::json!({
        "files": files,
        "files_processed": results.files_processed,
        "failed": results.failure_count(),
        "total_diagnostics": results.total_diagnostics(),
    });
    println!("{}", summary);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(&args(&[
            "--threads",
            "4",
            "--fail-fast",
            "--no-recursive",
            "--json",
            "--max-files",
            "10",
        ]));

        assert_eq!(options.batch.max_threads, 4);
        assert!(options.batch.fail_fast);
        assert!(!options.batch.recursive);
        assert!(options.json);
        assert_eq!(options.batch.max_files, Some(10));
    }

    #[test]
    fn test_parse_options_invalid() {
        let options = parse_options(&args(&["--threads", "invalid", "--unknown-option"]));
        assert_ne!(options.batch.max_threads, 0);
        assert!(!options.json);
    }

    #[test]
    fn test_sequential_and_config() {
        let options = parse_options(&args(&["--sequential", "--config", "cal.toml", "--quiet"]));
        assert_eq!(options.batch.max_threads, 1);
        assert_eq!(options.config_file.as_deref(), Some("cal.toml"));
        assert!(!options.batch.progress_reporting);
    }
}
