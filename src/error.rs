// ⚠️ Error Taxonomy - Run-level failures and run-level warnings
// Per-record anomalies are recovered locally; only batch-level problems
// abort a run, and every recovery leaves a visible trace

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// RUN-LEVEL ERRORS
// ============================================================================

/// PipelineError - Problems that fail an entire run
///
/// Everything below record granularity (malformed cells, unclassifiable
/// columns, ambiguous ties) is recovered in place and surfaced through
/// `RunWarning` or the run summary instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no shipment records in input")]
    EmptyInput,

    #[error("no usable columns: every cell in the batch normalized to absent")]
    NoUsableColumns,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to serialize run output: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// RUN-LEVEL WARNINGS
// ============================================================================

/// RunWarning - Recovered anomalies, attached to the run (not the record)
///
/// The warnings list and the validation report's mismatches are the only
/// channels for surfacing anomalies - nothing is silently fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunWarning {
    /// Two same-category events shared a timestamp and no configured
    /// priority entry decided between them; first-seen won.
    AmbiguousTieBreak {
        record_id: String,
        locations: Vec<String>,
        timestamp: Option<NaiveDateTime>,
    },

    /// A record was excluded from the run (logged, never aborting the batch)
    RecordSkipped { record_id: String, reason: String },
}

impl std::fmt::Display for RunWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunWarning::AmbiguousTieBreak {
                record_id,
                locations,
                timestamp,
            } => {
                let when = timestamp
                    .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "no timestamp".to_string());
                write!(
                    f,
                    "ambiguous tie-break on record {}: {} at {} (first seen wins)",
                    record_id,
                    locations.join(" / "),
                    when
                )
            }
            RunWarning::RecordSkipped { record_id, reason } => {
                write!(f, "record {} skipped: {}", record_id, reason)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let warning = RunWarning::AmbiguousTieBreak {
            record_id: "HE-0001".to_string(),
            locations: vec!["DSV Indoor".to_string(), "DSV Outdoor".to_string()],
            timestamp: None,
        };

        let text = warning.to_string();
        assert!(text.contains("HE-0001"));
        assert!(text.contains("DSV Indoor / DSV Outdoor"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "no shipment records in input"
        );
        assert!(PipelineError::Config("balance_tolerance must be >= 0".into())
            .to_string()
            .contains("balance_tolerance"));
    }
}
