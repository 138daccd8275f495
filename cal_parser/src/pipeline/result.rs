use crate::file_processor::FileMetadata;
use crate::lexical::LexicalMetrics;
use crate::syntax::ParseOutput;
use std::time::Duration;

/// Everything one pipeline run produced for a single document
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub output: ParseOutput,
    /// Present when the source came from a file
    pub file_metadata: Option<FileMetadata>,
    pub lexical_metrics: LexicalMetrics,
    pub token_count: usize,
    pub duration: Duration,
}

impl PipelineResult {
    pub fn diagnostic_count(&self) -> usize {
        self.output.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        !self.output.has_errors()
    }

    pub fn log_success(&self, source_name: &str) {
        let seconds = self.duration.as_secs_f64();
        let tokens_per_sec = if seconds > 0.0 {
            self.token_count as f64 / seconds
        } else {
            0.0
        };

        crate::log_success!(
            crate::logging::codes::success::OPERATION_COMPLETED_SUCCESSFULLY,
            "C/AL parsing pipeline finished",
            "source" => source_name,
            "tokens" => self.token_count,
            "diagnostics" => self.diagnostic_count(),
            "duration_ms" => format!("{:.2}", seconds * 1000.0),
            "tokens_per_sec" => format!("{:.0}", tokens_per_sec)
        );
    }
}
