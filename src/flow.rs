// 🚢 Flow Path & Flow Code - The shape of a shipment's journey
// port → warehouse* → offshore_base? → site, compressed into one integer

use crate::classify::LocationCategory;
use crate::extract::{Event, EventOrigin};
use serde::{Deserialize, Serialize};

// ============================================================================
// PATH
// ============================================================================

/// PathStep - One hop in the semantic path
///
/// `Port` is implicit (every received shipment entered through the port,
/// there is no port column in the data); it anchors every non-pre-arrival
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStep {
    Port,
    PreArrival,
    Warehouse,
    OffshoreBase,
    Site,
}

/// Build the ordered semantic path from a record's ordered events.
///
/// A value-level pre-arrival match stops everything: the path is
/// `[PreArrival]` no matter what else the row holds. A record with no
/// warehouse/offshore/site event at all is equally pre-arrival - nothing
/// has been confirmed received.
///
/// An in-flight shipment legitimately ends before `Site`; the flow code
/// describes the shape observed so far, not a terminal guarantee.
pub fn build_path(events: &[Event]) -> Vec<PathStep> {
    if events.iter().any(|e| e.origin == EventOrigin::PhraseMatch) {
        return vec![PathStep::PreArrival];
    }

    let mut path = Vec::new();
    let mut offshore = false;
    let mut site = false;

    for event in events {
        match event.category {
            LocationCategory::Warehouse => path.push(PathStep::Warehouse),
            LocationCategory::OffshoreBase => offshore = true,
            LocationCategory::Site => site = true,
            LocationCategory::PreArrival => {}
        }
    }

    if path.is_empty() && !offshore && !site {
        return vec![PathStep::PreArrival];
    }

    path.insert(0, PathStep::Port);
    if offshore {
        path.push(PathStep::OffshoreBase);
    }
    if site {
        path.push(PathStep::Site);
    }

    path
}

/// WH_HANDLING: the number of warehouse hops in a path
pub fn warehouse_hops(path: &[PathStep]) -> usize {
    path.iter()
        .filter(|step| **step == PathStep::Warehouse)
        .count()
}

// ============================================================================
// FLOW CODE
// ============================================================================

/// FlowCode - Integer taxonomy of observed path shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowCode {
    /// 0: not yet received
    PreArrival,
    /// 1: direct port → site
    PortToSite,
    /// 2: port → warehouse(s) → site, no offshore leg
    PortWarehouseSite,
    /// 3: port → warehouse → offshore base → site
    PortWarehouseOffshoreSite,
    /// 4: port → warehouse → warehouse → offshore base → site
    PortMultiWarehouseOffshoreSite,
}

impl FlowCode {
    /// Classify a semantic path into its flow code.
    ///
    /// A record still sitting in a warehouse (no site yet, no offshore leg)
    /// classifies the same as the completed warehouse-only path: the code
    /// reflects the hops observed so far. An offshore leg with no recorded
    /// warehouse hop classifies as the minimal offshore route.
    pub fn classify(path: &[PathStep]) -> FlowCode {
        if matches!(path, [PathStep::PreArrival]) {
            return FlowCode::PreArrival;
        }

        let hops = warehouse_hops(path);
        let offshore = path.contains(&PathStep::OffshoreBase);

        match (offshore, hops) {
            (false, 0) => FlowCode::PortToSite,
            (false, _) => FlowCode::PortWarehouseSite,
            (true, 0) | (true, 1) => FlowCode::PortWarehouseOffshoreSite,
            (true, _) => FlowCode::PortMultiWarehouseOffshoreSite,
        }
    }

    /// The integer code, 0..=4
    pub fn code(&self) -> u8 {
        match self {
            FlowCode::PreArrival => 0,
            FlowCode::PortToSite => 1,
            FlowCode::PortWarehouseSite => 2,
            FlowCode::PortWarehouseOffshoreSite => 3,
            FlowCode::PortMultiWarehouseOffshoreSite => 4,
        }
    }

    /// Human-readable meaning for display
    pub fn name(&self) -> &str {
        match self {
            FlowCode::PreArrival => "Not yet received",
            FlowCode::PortToSite => "Port to site",
            FlowCode::PortWarehouseSite => "Port, warehouse, site",
            FlowCode::PortWarehouseOffshoreSite => "Port, warehouse, offshore, site",
            FlowCode::PortMultiWarehouseOffshoreSite => {
                "Port, multiple warehouses, offshore, site"
            }
        }
    }

    pub fn from_code(code: u8) -> Option<FlowCode> {
        match code {
            0 => Some(FlowCode::PreArrival),
            1 => Some(FlowCode::PortToSite),
            2 => Some(FlowCode::PortWarehouseSite),
            3 => Some(FlowCode::PortWarehouseOffshoreSite),
            4 => Some(FlowCode::PortMultiWarehouseOffshoreSite),
            _ => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
