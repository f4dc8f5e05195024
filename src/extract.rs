// 🔄 Event Extractor - One raw record into an ordered event list
// Normalize every cell, classify every column, emit what remains

use crate::classify::{LocationCategory, LocationClassifier};
use crate::normalize::{normalize, CellValue};
use crate::record::ShipmentRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// EVENT
// ============================================================================

/// How an event was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrigin {
    /// The column name matched a configured pattern
    ColumnMatch,
    /// The cell *value* matched a pre-arrival phrase (value-level match)
    PhraseMatch,
}

/// Event - One (category, location, timestamp) observation for a record
///
/// `timestamp: None` is a presence marker: the location column was
/// populated, but with text that is not a date. Markers contribute to
/// presence-based classification and are excluded from anything that
/// requires temporal ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub category: LocationCategory,
    pub location: String,
    pub timestamp: Option<NaiveDateTime>,
    pub origin: EventOrigin,
}

impl Event {
    pub fn has_timestamp(&self) -> bool {
        self.timestamp.is_some()
    }
}

// ============================================================================
// EXTRACTION STATS
// ============================================================================

/// Per-record extraction counters, merged into the run summary.
///
/// Malformed cells are recovered as Absent inside the normalizer and only
/// show up here; unclassifiable columns are recovered as ignored and only
/// show up here. Neither is ever reported per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub absent_cells: usize,
    pub marker_cells: usize,
    pub timestamp_cells: usize,
    pub ignored_columns: Vec<String>,
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extract the ordered event list for one record.
///
/// Ordering: timestamp ascending; events without a timestamp sort last;
/// the sort is stable, so same-timestamp events keep source column order.
/// Identical-timestamp events in the same category are both kept - the
/// extractor never applies tie-breaks, downstream consumers do.
pub fn extract(
    record: &ShipmentRecord,
    classifier: &LocationClassifier,
    formats: &[String],
) -> (Vec<Event>, ExtractionStats) {
    let mut events = Vec::new();
    let mut stats = ExtractionStats::default();

    for (column, raw) in record.raw_events() {
        let cell = normalize(raw, formats);

        match &cell {
            CellValue::Absent => {
                stats.absent_cells += 1;
                continue;
            }
            CellValue::Present(_) => stats.marker_cells += 1,
            CellValue::Timestamp(_) => stats.timestamp_cells += 1,
        }

        let location = crate::normalize::clean_text(column);

        // Value-level pre-arrival wins over whatever the column is
        if let Some(marker) = cell.marker() {
            if classifier.matches_pre_arrival_phrase(marker) {
                events.push(Event {
                    category: LocationCategory::PreArrival,
                    location,
                    timestamp: None,
                    origin: EventOrigin::PhraseMatch,
                });
                continue;
            }
        }

        match classifier.classify_column(column) {
            Some(category) => events.push(Event {
                category,
                location,
                timestamp: cell.timestamp(),
                origin: EventOrigin::ColumnMatch,
            }),
            None => stats.ignored_columns.push(location),
        }
    }

    events.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    (events, stats)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::record::{RawValue, Vendor};

    fn setup() -> (LocationClassifier, Vec<String>) {
        let config = PipelineConfig::default();
        let classifier = LocationClassifier::from_config(&config);
        (classifier, config.date_parse_formats)
    }

    #[test]
    fn test_extracts_ordered_events() {
        let (classifier, formats) = setup();

        // Deliberately out of chronological order in the source
        let record = ShipmentRecord::new("HE-0001", Vendor::Hitachi)
            .with_value("MIR", RawValue::text("2024-01-20"))
            .with_value("DSV Indoor", RawValue::text("2024-01-10"))
            .with_value("Invoice No.", RawValue::text("INV-778"));

        let (events, stats) = extract(&record, &classifier, &formats);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].location, "DSV Indoor");
        assert_eq!(events[0].category, LocationCategory::Warehouse);
        assert_eq!(events[1].location, "MIR");
        assert_eq!(events[1].category, LocationCategory::Site);
        assert_eq!(stats.ignored_columns, vec!["Invoice No.".to_string()]);
    }

    #[test]
    fn test_marker_cells_sort_last() {
        let (classifier, formats) = setup();

        let record = ShipmentRecord::new("HE-0002", Vendor::Hitachi)
            .with_value("MOSB", RawValue::text("MOSB")) // decoration, not a date
            .with_value("DSV Indoor", RawValue::text("2024-01-10"));

        let (events, _) = extract(&record, &classifier, &formats);

        assert_eq!(events.len(), 2);
        assert!(events[0].has_timestamp());
        assert_eq!(events[1].location, "MOSB");
        assert!(!events[1].has_timestamp());
    }

    #[test]
    fn test_phrase_match_beats_column_category() {
        let (classifier, formats) = setup();

        let record = ShipmentRecord::new("HE-0003", Vendor::Hitachi)
            .with_value("Status", RawValue::text("PRE ARRIVAL"));

        let (events, _) = extract(&record, &classifier, &formats);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, LocationCategory::PreArrival);
        assert_eq!(events[0].origin, EventOrigin::PhraseMatch);
    }

    #[test]
    fn test_absent_cells_counted_not_emitted() {
        let (classifier, formats) = setup();

        let record = ShipmentRecord::new("HE-0004", Vendor::Hitachi)
            .with_value("DSV Indoor", RawValue::text("nan"))
            .with_value("MIR", RawValue::Empty);

        let (events, stats) = extract(&record, &classifier, &formats);

        assert!(events.is_empty());
        assert_eq!(stats.absent_cells, 2);
    }

    #[test]
    fn test_identical_timestamps_both_kept() {
        let (classifier, formats) = setup();

        let record = ShipmentRecord::new("HE-0005", Vendor::Hitachi)
            .with_value("DSV Indoor", RawValue::text("2024-01-10"))
            .with_value("DSV Outdoor", RawValue::text("2024-01-10"));

        let (events, _) = extract(&record, &classifier, &formats);

        assert_eq!(events.len(), 2);
        // Stable sort keeps source column order on ties
        assert_eq!(events[0].location, "DSV Indoor");
        assert_eq!(events[1].location, "DSV Outdoor");
    }

    #[test]
    fn test_spreadsheet_serial_cell() {
        let (classifier, formats) = setup();

        let record = ShipmentRecord::new("SIM-0001", Vendor::Siemens)
            .with_value("DSV Indoor", RawValue::Number(45301.0)); // 2024-01-10

        let (events, stats) = extract(&record, &classifier, &formats);

        assert_eq!(events.len(), 1);
        assert!(events[0].has_timestamp());
        assert_eq!(stats.timestamp_cells, 1);
    }
}
