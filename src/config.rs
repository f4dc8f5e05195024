// 🗂️ Pipeline Configuration - Patterns as data, not code
// New warehouses/sites are added here (or in a JSON file), never in logic

use crate::error::PipelineError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// CONFIG
// ============================================================================

/// PipelineConfig - Everything the core consumes per run
///
/// Pattern entries support three match styles, tried in this order by the
/// classifier: exact name (case-insensitive, whitespace-normalized), then
/// `*` wildcard, then bare substring. Pattern order within a list matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Column patterns for ordinary warehouses
    #[serde(default = "default_warehouse_patterns")]
    pub warehouse_column_patterns: Vec<String>,

    /// Column patterns for the offshore base(s)
    #[serde(default = "default_offshore_patterns")]
    pub offshore_column_patterns: Vec<String>,

    /// Column patterns for final sites
    #[serde(default = "default_site_patterns")]
    pub site_column_patterns: Vec<String>,

    /// Column patterns for pre-arrival-eligible columns (ETD/ETA pair)
    #[serde(default = "default_pre_arrival_patterns")]
    pub pre_arrival_column_patterns: Vec<String>,

    /// Value-level phrases marking a shipment as not yet received
    #[serde(default = "default_pre_arrival_phrases")]
    pub pre_arrival_phrases: Vec<String>,

    /// Winner when both pre-arrival columns carry the exact same timestamp
    #[serde(default = "default_pre_arrival_preferred")]
    pub pre_arrival_preferred_column: String,

    /// Ordered location names used on exact-timestamp ties (earlier wins)
    #[serde(default = "default_tiebreak_priority")]
    pub location_tiebreak_priority: Vec<String>,

    /// Ordered date/time formats accepted by the normalizer
    #[serde(default = "default_date_formats")]
    pub date_parse_formats: Vec<String>,

    /// Column carrying a per-record quantity; records count as 1.0 without it
    #[serde(default)]
    pub quantity_column: Option<String>,

    /// Relative tolerance for reference reconciliation (0.05 = ±5%)
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,
}

// Defaults describe the known logistics network; a deployment with a
// different network ships its own JSON.

fn default_warehouse_patterns() -> Vec<String> {
    vec![
        "DSV Indoor".to_string(),
        "DSV Outdoor".to_string(),
        "DSV Al Markaz".to_string(),
        "DSV MZP".to_string(),
        "AAA Storage".to_string(),
        "Hauler Indoor".to_string(),
        "*warehouse*".to_string(),
    ]
}

fn default_offshore_patterns() -> Vec<String> {
    vec!["MOSB".to_string(), "*offshore*".to_string()]
}

fn default_site_patterns() -> Vec<String> {
    vec![
        "MIR".to_string(),
        "SHU".to_string(),
        "DAS".to_string(),
        "AGI".to_string(),
        "*site*".to_string(),
    ]
}

fn default_pre_arrival_patterns() -> Vec<String> {
    vec!["ETD/ATD".to_string(), "ETA/ATA".to_string()]
}

fn default_pre_arrival_phrases() -> Vec<String> {
    vec![
        "pre arrival".to_string(),
        "pre-arrival".to_string(),
        "inbound pending".to_string(),
        "not yet received".to_string(),
    ]
}

fn default_pre_arrival_preferred() -> String {
    // Arrival beats departure when both carry the same timestamp
    "ETA/ATA".to_string()
}

fn default_tiebreak_priority() -> Vec<String> {
    vec![
        "DSV Al Markaz".to_string(),
        "DSV Indoor".to_string(),
        "DSV Outdoor".to_string(),
        "DSV MZP".to_string(),
        "MOSB".to_string(),
        "MIR".to_string(),
        "SHU".to_string(),
        "DAS".to_string(),
        "AGI".to_string(),
    ]
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d %H:%M:%S".to_string(),
        "%Y-%m-%d %H:%M".to_string(),
        "%Y-%m-%d".to_string(),
        "%d/%m/%Y".to_string(),
        "%m/%d/%Y".to_string(),
        "%Y/%m/%d".to_string(),
        "%d-%m-%Y".to_string(),
        "%d.%m.%Y".to_string(),
    ]
}

fn default_balance_tolerance() -> f64 {
    0.05
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            warehouse_column_patterns: default_warehouse_patterns(),
            offshore_column_patterns: default_offshore_patterns(),
            site_column_patterns: default_site_patterns(),
            pre_arrival_column_patterns: default_pre_arrival_patterns(),
            pre_arrival_phrases: default_pre_arrival_phrases(),
            pre_arrival_preferred_column: default_pre_arrival_preferred(),
            location_tiebreak_priority: default_tiebreak_priority(),
            date_parse_formats: default_date_formats(),
            quantity_column: None,
            balance_tolerance: default_balance_tolerance(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Reject configurations the pipeline cannot meaningfully run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.warehouse_column_patterns.is_empty() && self.site_column_patterns.is_empty() {
            return Err(PipelineError::Config(
                "no warehouse or site column patterns configured".to_string(),
            ));
        }

        if self.date_parse_formats.is_empty() {
            return Err(PipelineError::Config(
                "date_parse_formats must not be empty".to_string(),
            ));
        }

        if self.balance_tolerance < 0.0 {
            return Err(PipelineError::Config(
                "balance_tolerance must be >= 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
