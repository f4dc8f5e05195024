// 📦 Shipment Records - Raw input rows
// One record per physical cargo item/case, immutable after construction

use serde::{Deserialize, Serialize};

// ============================================================================
// RAW CELL VALUES
// ============================================================================

/// RawValue - What a source cell can hold before any cleaning
///
/// Spreadsheet exports hand us three shapes: text, numbers (which may be
/// date serials), and empty cells. Deserializes from JSON null/number/string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Empty cell (JSON null)
    Empty,
    /// Numeric cell - possibly a spreadsheet date serial
    Number(f64),
    /// Text cell - date text, a location decoration, or noise
    Text(String),
}

impl RawValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        RawValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Empty)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

// ============================================================================
// VENDOR (PROVENANCE)
// ============================================================================

/// Vendor - Which source system produced the record
///
/// Provenance only. Core logic never branches on this: vendor-specific
/// tuning belongs in `PipelineConfig`, not in code forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vendor {
    Hitachi,
    Siemens,
    Unknown,
}

impl Vendor {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            Vendor::Hitachi => "Hitachi Energy",
            Vendor::Siemens => "Siemens Energy",
            Vendor::Unknown => "Unknown",
        }
    }

    /// Short code for internal use
    pub fn code(&self) -> &str {
        match self {
            Vendor::Hitachi => "HE",
            Vendor::Siemens => "SIM",
            Vendor::Unknown => "UNK",
        }
    }

    /// Detect vendor from a free-text tag (batch label, file name, cell)
    pub fn detect(label: &str) -> Vendor {
        let label_lower = label.to_lowercase();

        if label_lower.contains("hitachi") || label_lower == "he" {
            return Vendor::Hitachi;
        }

        if label_lower.contains("siemens") || label_lower.contains("sim") {
            return Vendor::Siemens;
        }

        Vendor::Unknown
    }
}

impl Default for Vendor {
    fn default() -> Self {
        Vendor::Unknown
    }
}

// ============================================================================
// SHIPMENT RECORD
// ============================================================================

/// ShipmentRecord - One physical cargo item/case as read from the source
///
/// Immutable once constructed: every downstream value (events, status, flow
/// code, balances) is derived, never written back, so a record can be
/// re-processed at any time and yield the same answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Stable identifier, unique within a vendor batch
    pub id: String,

    /// Source system tag (provenance only)
    pub vendor: Vendor,

    /// Ordered (column_name, raw_value) pairs as read from the source
    raw_events: Vec<(String, RawValue)>,
}

impl ShipmentRecord {
    pub fn new<S: Into<String>>(id: S, vendor: Vendor) -> Self {
        ShipmentRecord {
            id: id.into(),
            vendor,
            raw_events: Vec::new(),
        }
    }

    /// Builder pattern: append one raw column value
    pub fn with_value<S: Into<String>>(mut self, column: S, value: RawValue) -> Self {
        self.raw_events.push((column.into(), value));
        self
    }

    /// Construct from already-collected pairs
    pub fn from_pairs<S: Into<String>>(
        id: S,
        vendor: Vendor,
        pairs: Vec<(String, RawValue)>,
    ) -> Self {
        ShipmentRecord {
            id: id.into(),
            vendor,
            raw_events: pairs,
        }
    }

    /// The raw (column, value) pairs, in source order
    pub fn raw_events(&self) -> &[(String, RawValue)] {
        &self.raw_events
    }

    /// Look up a raw value by exact column name
    pub fn value_of(&self, column: &str) -> Option<&RawValue> {
        self.raw_events
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

// ============================================================================
// TESTS
// ============================================================================
