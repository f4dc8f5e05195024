// 🏗️ Pipeline - Wires the components into one batch run
// Per-record anomalies are recovered in place; one bad record never aborts
// a batch. Outputs carry a UUID identity and a deterministic fingerprint.

use crate::aggregate::{
    aggregate, AggregateOutput, MonthlySiteBalance, MonthlyWarehouseBalance, RecordFlow,
    UnbucketedRecord,
};
use crate::classify::LocationClassifier;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, RunWarning};
use crate::extract::{extract, Event, ExtractionStats};
use crate::flow::{build_path, warehouse_hops, FlowCode, PathStep};
use crate::normalize::clean_text;
use crate::reconcile::{BalanceValidator, ReferenceCell, ValidationReport};
use crate::record::{RawValue, ShipmentRecord, Vendor};
use crate::status::{resolve_status, ShipmentStatus};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// CLASSIFICATION OUTPUT
// ============================================================================

/// Classification - The per-record answer. Exactly one per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub record_id: String,
    pub vendor: Vendor,
    pub status: ShipmentStatus,
    pub current_location: Option<String>,
    pub flow_code: FlowCode,
    pub path: Vec<PathStep>,
    /// WH_HANDLING: warehouse hops observed on the path
    pub warehouse_hops: usize,
}

/// One record's full derivation: classification plus the events behind it
#[derive(Debug, Clone)]
pub struct RecordClassification {
    pub classification: Classification,
    pub events: Vec<Event>,
    pub warnings: Vec<RunWarning>,
}

// ============================================================================
// RUN OUTPUT
// ============================================================================

/// Cell-level counters for the whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_total: usize,
    pub records_classified: usize,
    pub absent_cells: usize,
    pub marker_cells: usize,
    pub timestamp_cells: usize,
}

/// RunOutput - Everything one batch run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Run identity; never part of the fingerprint
    pub run_id: Uuid,
    pub classifications: Vec<Classification>,
    pub warehouse_balances: Vec<MonthlyWarehouseBalance>,
    pub site_balances: Vec<MonthlySiteBalance>,
    pub unbucketed: Vec<UnbucketedRecord>,
    pub warnings: Vec<RunWarning>,
    /// Unclassifiable columns seen this run, with occurrence counts
    pub ignored_columns: BTreeMap<String, usize>,
    pub summary: RunSummary,
    pub validation: ValidationReport,
    /// SHA-256 over the classification list and both balance tables.
    /// Re-running the same input and configuration reproduces it exactly.
    pub fingerprint: String,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
    classifier: LocationClassifier,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = LocationClassifier::from_config(&config);
        Ok(Pipeline { config, classifier })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Classify one record: events → status → path → flow code
    pub fn classify_record(&self, record: &ShipmentRecord) -> RecordClassification {
        self.derive(record).0
    }

    fn derive(&self, record: &ShipmentRecord) -> (RecordClassification, ExtractionStats) {
        let (events, stats) =
            extract(record, &self.classifier, &self.config.date_parse_formats);

        let resolution = resolve_status(&record.id, &events, &self.config);
        let path = build_path(&events);
        let flow_code = FlowCode::classify(&path);
        let hops = warehouse_hops(&path);

        debug!(
            record_id = %record.id,
            status = resolution.status.name(),
            flow_code = flow_code.code(),
            "record classified"
        );

        let derived = RecordClassification {
            classification: Classification {
                record_id: record.id.clone(),
                vendor: record.vendor,
                status: resolution.status,
                current_location: resolution.current_location,
                flow_code,
                path,
                warehouse_hops: hops,
            },
            events,
            warnings: resolution.warnings,
        };

        (derived, stats)
    }

    /// Run the full batch: classify every record, aggregate, validate.
    ///
    /// Run-level anomalies (empty input, a batch whose every cell is
    /// absent) fail the run; everything record-level is recovered and
    /// surfaced through warnings, the ignored-column summary, or the
    /// unbucketed list.
    pub fn run(
        &self,
        records: &[ShipmentRecord],
        reference: Option<&[ReferenceCell]>,
    ) -> Result<RunOutput, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        info!(records = records.len(), "pipeline run starting");

        let mut classifications = Vec::new();
        let mut flows = Vec::new();
        let mut warnings = Vec::new();
        let mut ignored_columns: BTreeMap<String, usize> = BTreeMap::new();
        let mut summary = RunSummary {
            records_total: records.len(),
            ..RunSummary::default()
        };

        for record in records {
            if record.id.trim().is_empty() {
                let warning = RunWarning::RecordSkipped {
                    record_id: "<blank>".to_string(),
                    reason: "record has no identifier".to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }

            let (derived, stats) = self.derive(record);

            summary.absent_cells += stats.absent_cells;
            summary.marker_cells += stats.marker_cells;
            summary.timestamp_cells += stats.timestamp_cells;
            for column in stats.ignored_columns {
                *ignored_columns.entry(column).or_insert(0) += 1;
            }

            for warning in &derived.warnings {
                warn!("{}", warning);
            }
            warnings.extend(derived.warnings);

            flows.push(RecordFlow {
                record_id: record.id.clone(),
                quantity: self.record_quantity(record),
                pre_arrival: derived.classification.flow_code.code() == 0,
                events: derived.events,
            });
            classifications.push(derived.classification);

            summary.records_classified += 1;
        }

        if summary.records_classified == 0 {
            return Err(PipelineError::EmptyInput);
        }

        if summary.marker_cells == 0 && summary.timestamp_cells == 0 {
            return Err(PipelineError::NoUsableColumns);
        }

        let AggregateOutput {
            warehouse_balances,
            site_balances,
            unbucketed,
        } = aggregate(&flows);

        let validation = BalanceValidator::with_tolerance(self.config.balance_tolerance)
            .validate(&warehouse_balances, &site_balances, reference);

        let fingerprint =
            output_fingerprint(&classifications, &warehouse_balances, &site_balances)?;

        info!(
            classified = summary.records_classified,
            warehouses = warehouse_balances.len(),
            sites = site_balances.len(),
            validation = if validation.is_pass() { "PASS" } else { "FAIL" },
            "pipeline run finished"
        );

        Ok(RunOutput {
            run_id: Uuid::new_v4(),
            classifications,
            warehouse_balances,
            site_balances,
            unbucketed,
            warnings,
            ignored_columns,
            summary,
            validation,
            fingerprint,
        })
    }

    /// Per-record quantity: the configured quantity column when it parses
    /// as a number, otherwise 1.0 (plain counting)
    fn record_quantity(&self, record: &ShipmentRecord) -> f64 {
        let Some(column) = &self.config.quantity_column else {
            return 1.0;
        };

        match record.value_of(column) {
            Some(RawValue::Number(n)) if n.is_finite() => *n,
            Some(RawValue::Text(text)) => clean_text(text).parse::<f64>().unwrap_or(1.0),
            _ => 1.0,
        }
    }
}

/// Deterministic SHA-256 over the run's derived outputs. The run id and
/// validation timestamp stay out so identical inputs hash identically.
fn output_fingerprint(
    classifications: &[Classification],
    warehouse_balances: &[MonthlyWarehouseBalance],
    site_balances: &[MonthlySiteBalance],
) -> Result<String, PipelineError> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(classifications)?);
    hasher.update(serde_json::to_vec(warehouse_balances)?);
    hasher.update(serde_json::to_vec(site_balances)?);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================
