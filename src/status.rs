// 📍 Status Resolver - "Where is this shipment right now?"
// Latest wins, with an explicit configured tie-break - never column order

use crate::classify::LocationCategory;
use crate::config::PipelineConfig;
use crate::error::RunWarning;
use crate::extract::{Event, EventOrigin};
use crate::normalize::clean_text;
use serde::{Deserialize, Serialize};

// ============================================================================
// STATUS
// ============================================================================

/// ShipmentStatus - The coarse "where is it" answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    /// Not yet received anywhere we track
    PreArrival,
    /// In a warehouse or at the offshore base
    Warehouse,
    /// Delivered to a final site
    Site,
}

impl ShipmentStatus {
    pub fn name(&self) -> &str {
        match self {
            ShipmentStatus::PreArrival => "pre_arrival",
            ShipmentStatus::Warehouse => "warehouse",
            ShipmentStatus::Site => "site",
        }
    }
}

/// Resolver output: the status, the current location, and any tie-break
/// ambiguities recovered along the way (attached to the run, not the record)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResolution {
    pub status: ShipmentStatus,
    pub current_location: Option<String>,
    pub warnings: Vec<RunWarning>,
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Resolve current status and location from a record's ordered events.
///
/// Priority order:
/// 0. any value-level pre-arrival phrase match → PreArrival (a status text
///    saying "pre arrival" overrides stray dates, keeping flow code 0 and
///    pre-arrival status in lockstep);
/// 1. any site event → Site at the latest site;
/// 2. any warehouse/offshore event → Warehouse at the latest one;
/// 3. pre-arrival-eligible columns → PreArrival at the later of the pair
///    (exact tie: the configured preferred column);
/// 4. nothing at all → PreArrival, no location.
pub fn resolve_status(
    record_id: &str,
    events: &[Event],
    config: &PipelineConfig,
) -> StatusResolution {
    if events.iter().any(|e| e.origin == EventOrigin::PhraseMatch) {
        return StatusResolution {
            status: ShipmentStatus::PreArrival,
            current_location: None,
            warnings: Vec::new(),
        };
    }

    let sites: Vec<&Event> = events
        .iter()
        .filter(|e| e.category == LocationCategory::Site)
        .collect();
    if !sites.is_empty() {
        let (location, warnings) = pick_latest(record_id, &sites, config);
        return StatusResolution {
            status: ShipmentStatus::Site,
            current_location: Some(location),
            warnings,
        };
    }

    let stored: Vec<&Event> = events
        .iter()
        .filter(|e| {
            matches!(
                e.category,
                LocationCategory::Warehouse | LocationCategory::OffshoreBase
            )
        })
        .collect();
    if !stored.is_empty() {
        let (location, warnings) = pick_latest(record_id, &stored, config);
        return StatusResolution {
            status: ShipmentStatus::Warehouse,
            current_location: Some(location),
            warnings,
        };
    }

    let pre: Vec<&Event> = events
        .iter()
        .filter(|e| e.category == LocationCategory::PreArrival)
        .collect();
    if !pre.is_empty() {
        let (location, warnings) = pick_pre_arrival(record_id, &pre, config);
        return StatusResolution {
            status: ShipmentStatus::PreArrival,
            current_location: Some(location),
            warnings,
        };
    }

    StatusResolution {
        status: ShipmentStatus::PreArrival,
        current_location: None,
        warnings: Vec::new(),
    }
}

/// Latest-timestamp-wins selection with the configured tie-break list.
///
/// Timestamped events always beat markers. On an exact timestamp tie the
/// earliest entry in `location_tiebreak_priority` wins; a tie no priority
/// entry can decide falls back to first-seen and is flagged.
fn pick_latest(
    record_id: &str,
    candidates: &[&Event],
    config: &PipelineConfig,
) -> (String, Vec<RunWarning>) {
    let ties = latest_ties(candidates);
    break_tie(record_id, &ties, &config.location_tiebreak_priority)
}

/// All candidates sharing the latest timestamp; if nothing is timestamped,
/// every candidate ties (presence only)
fn latest_ties<'a>(candidates: &[&'a Event]) -> Vec<&'a Event> {
    match candidates.iter().filter_map(|e| e.timestamp).max() {
        Some(latest) => candidates
            .iter()
            .filter(|e| e.timestamp == Some(latest))
            .copied()
            .collect(),
        None => candidates.to_vec(),
    }
}

/// Decide among same-timestamp candidates via the priority list
fn break_tie(
    record_id: &str,
    ties: &[&Event],
    priority: &[String],
) -> (String, Vec<RunWarning>) {
    if ties.len() == 1 {
        return (ties[0].location.clone(), Vec::new());
    }

    let ranked = ties
        .iter()
        .filter_map(|e| {
            priority
                .iter()
                .position(|p| clean_text(p).eq_ignore_ascii_case(&e.location))
                .map(|rank| (rank, *e))
        })
        .min_by_key(|(rank, _)| *rank);

    if let Some((_, winner)) = ranked {
        return (winner.location.clone(), Vec::new());
    }

    // First seen wins; the ambiguity belongs in the run warnings
    let warning = RunWarning::AmbiguousTieBreak {
        record_id: record_id.to_string(),
        locations: ties.iter().map(|e| e.location.clone()).collect(),
        timestamp: ties[0].timestamp,
    };

    (ties[0].location.clone(), vec![warning])
}

/// Rule 3: the pre-arrival-eligible pair.
///
/// Exactly one present → that one. Both present → the later timestamp;
/// on an exact tie the configured preferred column wins.
fn pick_pre_arrival(
    record_id: &str,
    candidates: &[&Event],
    config: &PipelineConfig,
) -> (String, Vec<RunWarning>) {
    if candidates.len() == 1 {
        return (candidates[0].location.clone(), Vec::new());
    }

    let ties = latest_ties(candidates);

    if ties.len() == 1 {
        return (ties[0].location.clone(), Vec::new());
    }

    let preferred = clean_text(&config.pre_arrival_preferred_column);
    if let Some(winner) = ties
        .iter()
        .find(|e| e.location.eq_ignore_ascii_case(&preferred))
    {
        return (winner.location.clone(), Vec::new());
    }

    let warning = RunWarning::AmbiguousTieBreak {
        record_id: record_id.to_string(),
        locations: ties.iter().map(|e| e.location.clone()).collect(),
        timestamp: ties[0].timestamp,
    };

    (ties[0].location.clone(), vec![warning])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn event(category: LocationCategory, location: &str, when: Option<NaiveDateTime>) -> Event {
        Event {
            category,
            location: location.to_string(),
            timestamp: when,
            origin: EventOrigin::ColumnMatch,
        }
    }

    #[test]
    fn test_site_beats_warehouse() {
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 1, 10))),
            event(LocationCategory::Site, "MIR", Some(ts(2024, 1, 20))),
        ];

        let resolution = resolve_status("HE-0001", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::Site);
        assert_eq!(resolution.current_location.as_deref(), Some("MIR"));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_site_beats_later_warehouse_date() {
        // Site presence wins even when a warehouse event is newer
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::Site, "SHU", Some(ts(2024, 1, 5))),
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 2, 1))),
        ];

        let resolution = resolve_status("HE-0002", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::Site);
        assert_eq!(resolution.current_location.as_deref(), Some("SHU"));
    }

    #[test]
    fn test_latest_warehouse_wins() {
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 1, 10))),
            event(LocationCategory::OffshoreBase, "MOSB", Some(ts(2024, 1, 15))),
        ];

        let resolution = resolve_status("HE-0003", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::Warehouse);
        assert_eq!(resolution.current_location.as_deref(), Some("MOSB"));
    }

    #[test]
    fn test_exact_tie_uses_priority_list() {
        let config = PipelineConfig::default();
        // Same timestamp; DSV Indoor precedes DSV Outdoor in the default
        // priority list, so it wins even though it is listed second here
        let events = vec![
            event(LocationCategory::Warehouse, "DSV Outdoor", Some(ts(2024, 1, 10))),
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 1, 10))),
        ];

        let resolution = resolve_status("HE-0004", &events, &config);

        assert_eq!(resolution.current_location.as_deref(), Some("DSV Indoor"));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_unconfigured_tie_warns_first_seen() {
        let mut config = PipelineConfig::default();
        config.location_tiebreak_priority.clear();
        config
            .warehouse_column_patterns
            .extend(["Yard A".to_string(), "Yard B".to_string()]);

        let events = vec![
            event(LocationCategory::Warehouse, "Yard A", Some(ts(2024, 1, 10))),
            event(LocationCategory::Warehouse, "Yard B", Some(ts(2024, 1, 10))),
        ];

        let resolution = resolve_status("HE-0005", &events, &config);

        assert_eq!(resolution.current_location.as_deref(), Some("Yard A"));
        assert_eq!(resolution.warnings.len(), 1);
        assert!(matches!(
            resolution.warnings[0],
            RunWarning::AmbiguousTieBreak { .. }
        ));
    }

    #[test]
    fn test_timestamped_event_beats_marker() {
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 1, 10))),
            event(LocationCategory::Warehouse, "DSV Outdoor", None),
        ];

        let resolution = resolve_status("HE-0006", &events, &config);

        assert_eq!(resolution.current_location.as_deref(), Some("DSV Indoor"));
    }

    #[test]
    fn test_pre_arrival_single_column() {
        let config = PipelineConfig::default();
        let events = vec![event(
            LocationCategory::PreArrival,
            "ETD/ATD",
            Some(ts(2024, 1, 2)),
        )];

        let resolution = resolve_status("HE-0007", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::PreArrival);
        assert_eq!(resolution.current_location.as_deref(), Some("ETD/ATD"));
    }

    #[test]
    fn test_pre_arrival_pair_later_wins() {
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::PreArrival, "ETD/ATD", Some(ts(2024, 1, 2))),
            event(LocationCategory::PreArrival, "ETA/ATA", Some(ts(2024, 1, 9))),
        ];

        let resolution = resolve_status("HE-0008", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::PreArrival);
        assert_eq!(resolution.current_location.as_deref(), Some("ETA/ATA"));
    }

    #[test]
    fn test_pre_arrival_exact_tie_prefers_configured_column() {
        let config = PipelineConfig::default();
        let events = vec![
            event(LocationCategory::PreArrival, "ETD/ATD", Some(ts(2024, 1, 2))),
            event(LocationCategory::PreArrival, "ETA/ATA", Some(ts(2024, 1, 2))),
        ];

        let resolution = resolve_status("HE-0009", &events, &config);

        assert_eq!(resolution.current_location.as_deref(), Some("ETA/ATA"));
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_phrase_match_overrides_everything() {
        let config = PipelineConfig::default();
        let mut events = vec![
            event(LocationCategory::Warehouse, "DSV Indoor", Some(ts(2024, 1, 10))),
        ];
        events.push(Event {
            category: LocationCategory::PreArrival,
            location: "Status".to_string(),
            timestamp: None,
            origin: EventOrigin::PhraseMatch,
        });

        let resolution = resolve_status("HE-0010", &events, &config);

        assert_eq!(resolution.status, ShipmentStatus::PreArrival);
        assert_eq!(resolution.current_location, None);
    }

    #[test]
    fn test_no_events_at_all() {
        let config = PipelineConfig::default();
        let resolution = resolve_status("HE-0011", &[], &config);

        assert_eq!(resolution.status, ShipmentStatus::PreArrival);
        assert_eq!(resolution.current_location, None);
    }
}
