// 📊 Monthly Aggregator - Inbound, outbound, and on-hand per location/month
// Outbound is temporal succession within a record; ending inventory is an
// explicit sequential fold over sorted months, seeded at zero

use crate::classify::LocationCategory;
use crate::extract::Event;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// YEAR-MONTH KEY
// ============================================================================

/// YearMonth - Calendar-month bucket key, totally ordered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        YearMonth { year, month }
    }

    pub fn from_timestamp(ts: NaiveDateTime) -> Self {
        YearMonth {
            year: ts.year(),
            month: ts.month(),
        }
    }

    /// The following calendar month
    pub fn next(&self) -> YearMonth {
        if self.month == 12 {
            YearMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            YearMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parse "YYYY-MM"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;

        let year: i32 = y
            .trim()
            .parse()
            .map_err(|_| format!("bad year in {:?}", s))?;
        let month: u32 = m
            .trim()
            .parse()
            .map_err(|_| format!("bad month in {:?}", s))?;

        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in {:?}", s));
        }

        Ok(YearMonth { year, month })
    }
}

// ============================================================================
// BALANCE ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyWarehouseBalance {
    pub warehouse: String,
    pub month: YearMonth,
    pub inbound_qty: f64,
    pub outbound_qty: f64,
    pub ending_inventory: f64,
}

/// Sites are terminal: nothing leaves a site, so there is no outbound field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySiteBalance {
    pub site: String,
    pub month: YearMonth,
    pub inbound_qty: f64,
    pub ending_inventory: f64,
}

/// A present location whose cell had no usable date: counted for
/// classification, excluded from monthly buckets, and reported here -
/// never silently dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbucketedRecord {
    pub record_id: String,
    pub location: String,
    pub reason: String,
}

// ============================================================================
// AGGREGATION INPUT / OUTPUT
// ============================================================================

/// One record's contribution to aggregation: its ordered events plus the
/// already-derived facts the aggregator needs
#[derive(Debug, Clone)]
pub struct RecordFlow {
    pub record_id: String,
    pub quantity: f64,
    /// Flow code 0 records never enter the monthly tables
    pub pre_arrival: bool,
    /// Events as produced by the extractor (timestamp ascending)
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateOutput {
    pub warehouse_balances: Vec<MonthlyWarehouseBalance>,
    pub site_balances: Vec<MonthlySiteBalance>,
    pub unbucketed: Vec<UnbucketedRecord>,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Per-location monthly sums, keyed location → month → quantity
type MonthlySums = BTreeMap<String, BTreeMap<YearMonth, f64>>;

/// Aggregate classified records into the two monthly balance tables.
///
/// Inbound: quantity of every timestamped warehouse/offshore (or site)
/// event, bucketed by the event's month.
///
/// Outbound: defined per record by temporal succession - the event after a
/// warehouse's event, in the record's own order, fixes the month the cargo
/// left that warehouse. Most input data has no exit-date column, so
/// succession is the only honest signal. At most one outbound contribution
/// per warehouse per record.
pub fn aggregate(flows: &[RecordFlow]) -> AggregateOutput {
    let mut wh_in: MonthlySums = BTreeMap::new();
    let mut wh_out: MonthlySums = BTreeMap::new();
    let mut site_in: MonthlySums = BTreeMap::new();
    let mut unbucketed = Vec::new();

    for flow in flows {
        if flow.pre_arrival {
            continue;
        }

        // Inbound + unbucketed
        for event in &flow.events {
            match event.category {
                LocationCategory::Warehouse | LocationCategory::OffshoreBase => {
                    match event.timestamp {
                        Some(ts) => add(&mut wh_in, &event.location, ts, flow.quantity),
                        None => unbucketed.push(UnbucketedRecord {
                            record_id: flow.record_id.clone(),
                            location: event.location.clone(),
                            reason: "warehouse presence without a usable date".to_string(),
                        }),
                    }
                }
                LocationCategory::Site => match event.timestamp {
                    Some(ts) => add(&mut site_in, &event.location, ts, flow.quantity),
                    None => unbucketed.push(UnbucketedRecord {
                        record_id: flow.record_id.clone(),
                        location: event.location.clone(),
                        reason: "site presence without a usable date".to_string(),
                    }),
                },
                LocationCategory::PreArrival => {}
            }
        }

        // Outbound by succession, over movement events only
        let movements: Vec<&Event> = flow
            .events
            .iter()
            .filter(|e| e.has_timestamp() && e.category != LocationCategory::PreArrival)
            .collect();

        let mut credited: HashSet<&str> = HashSet::new();
        for (i, event) in movements.iter().enumerate() {
            let stored = matches!(
                event.category,
                LocationCategory::Warehouse | LocationCategory::OffshoreBase
            );
            if !stored || credited.contains(event.location.as_str()) {
                continue;
            }

            if let Some(next) = movements.get(i + 1) {
                if let Some(ts) = next.timestamp {
                    add(&mut wh_out, &event.location, ts, flow.quantity);
                    credited.insert(event.location.as_str());
                }
            }
        }
    }

    let warehouse_balances = fold_warehouse(&wh_in, &wh_out);
    let site_balances = fold_sites(&site_in);

    AggregateOutput {
        warehouse_balances,
        site_balances,
        unbucketed,
    }
}

fn add(sums: &mut MonthlySums, location: &str, ts: NaiveDateTime, quantity: f64) {
    *sums
        .entry(location.to_string())
        .or_default()
        .entry(YearMonth::from_timestamp(ts))
        .or_insert(0.0) += quantity;
}

/// Months from the first to the last observed month for a location,
/// inclusive, with quiet months materialized
fn month_span(months: impl Iterator<Item = YearMonth>) -> Vec<YearMonth> {
    let observed: BTreeSet<YearMonth> = months.collect();

    let (first, last) = match (observed.iter().next(), observed.iter().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut span = Vec::new();
    let mut current = first;
    while current <= last {
        span.push(current);
        current = current.next();
    }
    span
}

/// Per-location sequential fold: ending(m) = ending(m-1) + in(m) - out(m),
/// seeded at 0 before the first observed month
fn fold_warehouse(wh_in: &MonthlySums, wh_out: &MonthlySums) -> Vec<MonthlyWarehouseBalance> {
    // A warehouse can appear in either map (outbound implies a prior
    // inbound, but stay defensive about the union)
    let warehouses: BTreeSet<&str> = wh_in
        .keys()
        .chain(wh_out.keys())
        .map(|name| name.as_str())
        .collect();

    let mut rows = Vec::new();
    for warehouse in warehouses {
        let inbound_months = wh_in.get(warehouse);
        let outbound_months = wh_out.get(warehouse);

        let months = month_span(
            inbound_months
                .into_iter()
                .chain(outbound_months)
                .flat_map(|m| m.keys().copied()),
        );

        let mut running = 0.0;
        for month in months {
            let inbound = lookup(inbound_months, month);
            let outbound = lookup(outbound_months, month);
            running += inbound - outbound;

            rows.push(MonthlyWarehouseBalance {
                warehouse: warehouse.to_string(),
                month,
                inbound_qty: inbound,
                outbound_qty: outbound,
                ending_inventory: running,
            });
        }
    }

    rows
}

fn fold_sites(site_in: &MonthlySums) -> Vec<MonthlySiteBalance> {
    let mut rows = Vec::new();

    for (site, by_month) in site_in {
        let mut running = 0.0;
        for month in month_span(by_month.keys().copied()) {
            let inbound = by_month.get(&month).copied().unwrap_or(0.0);
            running += inbound;

            rows.push(MonthlySiteBalance {
                site: site.clone(),
                month,
                inbound_qty: inbound,
                ending_inventory: running,
            });
        }
    }

    rows
}

fn lookup(months: Option<&BTreeMap<YearMonth, f64>>, month: YearMonth) -> f64 {
    months
        .and_then(|m| m.get(&month))
        .copied()
        .unwrap_or(0.0)
}

// ============================================================================
// TESTS
// ============================================================================
