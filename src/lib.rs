// Shipflow - Shipment flow classification and monthly stock reconciliation
// Exposes all modules for use in the CLI and tests

pub mod record;
pub mod config;
pub mod normalize;      // Value Normalizer - raw cells into typed values
pub mod classify;       // Location Classifier - column names into categories
pub mod extract;        // Event Extractor - records into ordered events
pub mod status;         // Status Resolver - "where is it now"
pub mod flow;           // Flow Path Builder + Flow Code Classifier
pub mod aggregate;      // Monthly Aggregator - inbound/outbound/on-hand
pub mod reconcile;      // Reconciliation Validator - balance invariants
pub mod error;          // Error taxonomy - run errors and run warnings
pub mod pipeline;       // Orchestration - one batch run end to end

// Re-export commonly used types
pub use record::{RawValue, ShipmentRecord, Vendor};
pub use config::PipelineConfig;
pub use normalize::{clean_text, normalize, CellValue};
pub use classify::{LocationCategory, LocationClassifier};
pub use extract::{extract, Event, EventOrigin, ExtractionStats};
pub use status::{resolve_status, ShipmentStatus, StatusResolution};
pub use flow::{build_path, warehouse_hops, FlowCode, PathStep};
pub use aggregate::{
    aggregate, AggregateOutput, MonthlySiteBalance, MonthlyWarehouseBalance, RecordFlow,
    UnbucketedRecord, YearMonth,
};
pub use reconcile::{
    BalanceValidator, Mismatch, MismatchKind, ReferenceCell, ValidationReport,
    ValidationStatus,
};
pub use error::{PipelineError, RunWarning};
pub use pipeline::{Classification, Pipeline, RecordClassification, RunOutput, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
