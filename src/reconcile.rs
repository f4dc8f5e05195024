// ⚖️ Reconciliation Validator - Do the monthly balances hold up?
// Checks ending(m) = ending(m-1) + inbound(m) - outbound(m) for every cell,
// and scores the tables against an externally trusted pivot when one exists.
// Purely diagnostic: balances are never touched, discrepancies never
// auto-corrected.

use crate::aggregate::{MonthlySiteBalance, MonthlyWarehouseBalance, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Float equality slack for the invariant check
const EPSILON: f64 = 1e-9;

// ============================================================================
// VALIDATION RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchKind {
    /// The running-balance invariant broke inside our own tables
    UnreconciledBalance,
    /// A cell disagrees with the trusted reference table
    ReferenceMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub location: String,
    pub month: YearMonth,
    pub expected: f64,
    pub actual: f64,
    pub absolute_diff: f64,
    /// Relative to `expected`; None when expected is zero
    pub relative_diff: Option<f64>,
}

/// One cell of an externally produced trusted pivot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCell {
    pub location: String,
    pub month: YearMonth,
    pub ending_inventory: f64,
}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    /// matched cells / checked cells, 1.0 for an empty check set
    pub accuracy: f64,
    pub cells_checked: usize,
    pub cells_matched: usize,
    pub mismatches: Vec<Mismatch>,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

impl ValidationReport {
    pub fn is_pass(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    pub fn summary(&self) -> String {
        format!(
            "Validation {}: {}/{} cells within tolerance ({:.1}% accuracy), {} mismatches",
            match self.status {
                ValidationStatus::Pass => "PASS",
                ValidationStatus::Fail => "FAIL",
            },
            self.cells_matched,
            self.cells_checked,
            self.accuracy * 100.0,
            self.mismatches.len()
        )
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct BalanceValidator {
    /// Relative tolerance for reference comparison (0.05 = ±5%)
    pub tolerance: f64,
}

impl BalanceValidator {
    pub fn new() -> Self {
        BalanceValidator { tolerance: 0.05 }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        BalanceValidator { tolerance }
    }

    /// Validate both balance tables, optionally against a reference pivot
    pub fn validate(
        &self,
        warehouse_balances: &[MonthlyWarehouseBalance],
        site_balances: &[MonthlySiteBalance],
        reference: Option<&[ReferenceCell]>,
    ) -> ValidationReport {
        let mut mismatches = Vec::new();
        let mut cells_checked = 0usize;
        let mut cells_matched = 0usize;

        self.check_warehouse_invariant(
            warehouse_balances,
            &mut mismatches,
            &mut cells_checked,
            &mut cells_matched,
        );
        self.check_site_invariant(
            site_balances,
            &mut mismatches,
            &mut cells_checked,
            &mut cells_matched,
        );

        // Accuracy scores the reference comparison when a reference exists,
        // and the invariant checks otherwise
        let mut ref_checked = 0usize;
        let mut ref_matched = 0usize;
        if let Some(cells) = reference {
            self.check_reference(
                warehouse_balances,
                site_balances,
                cells,
                &mut mismatches,
                &mut ref_checked,
                &mut ref_matched,
            );
        }

        let accuracy = if ref_checked > 0 {
            ref_matched as f64 / ref_checked as f64
        } else if cells_checked > 0 {
            cells_matched as f64 / cells_checked as f64
        } else {
            1.0
        };

        cells_checked += ref_checked;
        cells_matched += ref_matched;

        ValidationReport {
            status: if mismatches.is_empty() {
                ValidationStatus::Pass
            } else {
                ValidationStatus::Fail
            },
            accuracy,
            cells_checked,
            cells_matched,
            mismatches,
            validated_at: chrono::Utc::now(),
        }
    }

    /// ending(m) = ending(m-1) + inbound(m) - outbound(m), seeded at 0
    fn check_warehouse_invariant(
        &self,
        rows: &[MonthlyWarehouseBalance],
        mismatches: &mut Vec<Mismatch>,
        checked: &mut usize,
        matched: &mut usize,
    ) {
        let mut previous: BTreeMap<&str, f64> = BTreeMap::new();

        for row in rows {
            let before = previous
                .get(row.warehouse.as_str())
                .copied()
                .unwrap_or(0.0);
            let expected = before + row.inbound_qty - row.outbound_qty;

            *checked += 1;
            if (row.ending_inventory - expected).abs() <= EPSILON {
                *matched += 1;
            } else {
                mismatches.push(Mismatch {
                    kind: MismatchKind::UnreconciledBalance,
                    location: row.warehouse.clone(),
                    month: row.month,
                    expected,
                    actual: row.ending_inventory,
                    absolute_diff: (row.ending_inventory - expected).abs(),
                    relative_diff: relative(expected, row.ending_inventory),
                });
            }

            previous.insert(row.warehouse.as_str(), row.ending_inventory);
        }
    }

    fn check_site_invariant(
        &self,
        rows: &[MonthlySiteBalance],
        mismatches: &mut Vec<Mismatch>,
        checked: &mut usize,
        matched: &mut usize,
    ) {
        let mut previous: BTreeMap<&str, f64> = BTreeMap::new();

        for row in rows {
            let before = previous.get(row.site.as_str()).copied().unwrap_or(0.0);
            let expected = before + row.inbound_qty;

            *checked += 1;
            if (row.ending_inventory - expected).abs() <= EPSILON {
                *matched += 1;
            } else {
                mismatches.push(Mismatch {
                    kind: MismatchKind::UnreconciledBalance,
                    location: row.site.clone(),
                    month: row.month,
                    expected,
                    actual: row.ending_inventory,
                    absolute_diff: (row.ending_inventory - expected).abs(),
                    relative_diff: relative(expected, row.ending_inventory),
                });
            }

            previous.insert(row.site.as_str(), row.ending_inventory);
        }
    }

    /// Per-cell comparison against the trusted pivot. A reference cell our
    /// tables never produced compares against 0 (the defined balance
    /// outside the observed range).
    fn check_reference(
        &self,
        warehouse_balances: &[MonthlyWarehouseBalance],
        site_balances: &[MonthlySiteBalance],
        reference: &[ReferenceCell],
        mismatches: &mut Vec<Mismatch>,
        checked: &mut usize,
        matched: &mut usize,
    ) {
        let mut endings: BTreeMap<(&str, YearMonth), f64> = BTreeMap::new();
        for row in warehouse_balances {
            endings.insert((row.warehouse.as_str(), row.month), row.ending_inventory);
        }
        for row in site_balances {
            endings.insert((row.site.as_str(), row.month), row.ending_inventory);
        }

        for cell in reference {
            let actual = endings
                .get(&(cell.location.as_str(), cell.month))
                .copied()
                .unwrap_or(0.0);

            let absolute = (actual - cell.ending_inventory).abs();
            let within = if cell.ending_inventory.abs() <= EPSILON {
                absolute <= EPSILON
            } else {
                absolute / cell.ending_inventory.abs() <= self.tolerance
            };

            *checked += 1;
            if within {
                *matched += 1;
            } else {
                mismatches.push(Mismatch {
                    kind: MismatchKind::ReferenceMismatch,
                    location: cell.location.clone(),
                    month: cell.month,
                    expected: cell.ending_inventory,
                    actual,
                    absolute_diff: absolute,
                    relative_diff: relative(cell.ending_inventory, actual),
                });
            }
        }
    }
}

impl Default for BalanceValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn relative(expected: f64, actual: f64) -> Option<f64> {
    if expected.abs() <= EPSILON {
        None
    } else {
        Some((actual - expected).abs() / expected.abs())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wh(
        warehouse: &str,
        month: YearMonth,
        inbound: f64,
        outbound: f64,
        ending: f64,
    ) -> MonthlyWarehouseBalance {
        MonthlyWarehouseBalance {
            warehouse: warehouse.to_string(),
            month,
            inbound_qty: inbound,
            outbound_qty: outbound,
            ending_inventory: ending,
        }
    }

    fn site(name: &str, month: YearMonth, inbound: f64, ending: f64) -> MonthlySiteBalance {
        MonthlySiteBalance {
            site: name.to_string(),
            month,
            inbound_qty: inbound,
            ending_inventory: ending,
        }
    }

    #[test]
    fn test_consistent_tables_pass() {
        let validator = BalanceValidator::new();

        let warehouses = vec![
            wh("DSV Indoor", YearMonth::new(2024, 1), 3.0, 1.0, 2.0),
            wh("DSV Indoor", YearMonth::new(2024, 2), 0.0, 2.0, 0.0),
        ];
        let sites = vec![
            site("MIR", YearMonth::new(2024, 1), 1.0, 1.0),
            site("MIR", YearMonth::new(2024, 2), 2.0, 3.0),
        ];

        let report = validator.validate(&warehouses, &sites, None);

        assert!(report.is_pass());
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.cells_checked, 4);
        assert!(report.mismatches.is_empty());

        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_broken_invariant_fails() {
        let validator = BalanceValidator::new();

        // February claims 5 on hand; the fold says 0
        let warehouses = vec![
            wh("DSV Indoor", YearMonth::new(2024, 1), 3.0, 1.0, 2.0),
            wh("DSV Indoor", YearMonth::new(2024, 2), 0.0, 2.0, 5.0),
        ];

        let report = validator.validate(&warehouses, &[], None);

        assert!(!report.is_pass());
        assert_eq!(report.mismatches.len(), 1);

        let mismatch = &report.mismatches[0];
        assert_eq!(mismatch.kind, MismatchKind::UnreconciledBalance);
        assert_eq!(mismatch.month, YearMonth::new(2024, 2));
        assert_eq!(mismatch.expected, 0.0);
        assert_eq!(mismatch.actual, 5.0);
    }

    #[test]
    fn test_site_invariant_checked() {
        let validator = BalanceValidator::new();

        let sites = vec![
            site("SHU", YearMonth::new(2024, 1), 2.0, 2.0),
            site("SHU", YearMonth::new(2024, 2), 1.0, 9.0), // should be 3
        ];

        let report = validator.validate(&[], &sites, None);

        assert!(!report.is_pass());
        assert_eq!(report.mismatches[0].location, "SHU");
    }

    #[test]
    fn test_reference_within_tolerance_passes() {
        let validator = BalanceValidator::with_tolerance(0.05);

        let warehouses = vec![wh("DSV Indoor", YearMonth::new(2024, 1), 100.0, 0.0, 100.0)];
        // Trusted pivot says 103: 3% off, inside ±5%
        let reference = vec![ReferenceCell {
            location: "DSV Indoor".to_string(),
            month: YearMonth::new(2024, 1),
            ending_inventory: 103.0,
        }];

        let report = validator.validate(&warehouses, &[], Some(&reference));

        assert!(report.is_pass());
        assert_eq!(report.cells_checked, 2); // invariant cell + reference cell
        assert_eq!(report.cells_matched, 2);
    }

    #[test]
    fn test_reference_outside_tolerance_fails() {
        let validator = BalanceValidator::with_tolerance(0.05);

        let warehouses = vec![wh("DSV Indoor", YearMonth::new(2024, 1), 100.0, 0.0, 100.0)];
        let reference = vec![ReferenceCell {
            location: "DSV Indoor".to_string(),
            month: YearMonth::new(2024, 1),
            ending_inventory: 150.0,
        }];

        let report = validator.validate(&warehouses, &[], Some(&reference));

        assert!(!report.is_pass());
        let mismatch = report
            .mismatches
            .iter()
            .find(|m| m.kind == MismatchKind::ReferenceMismatch)
            .unwrap();
        assert_eq!(mismatch.expected, 150.0);
        assert_eq!(mismatch.actual, 100.0);
        assert!(mismatch.relative_diff.unwrap() > 0.05);
        assert!(report.accuracy < 1.0);
    }

    #[test]
    fn test_reference_cell_missing_from_tables() {
        let validator = BalanceValidator::new();

        let reference = vec![ReferenceCell {
            location: "DSV Outdoor".to_string(),
            month: YearMonth::new(2024, 6),
            ending_inventory: 4.0,
        }];

        let report = validator.validate(&[], &[], Some(&reference));

        assert!(!report.is_pass());
        assert_eq!(report.mismatches[0].actual, 0.0);
    }

    #[test]
    fn test_empty_tables_pass_vacuously() {
        let report = BalanceValidator::new().validate(&[], &[], None);

        assert!(report.is_pass());
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.cells_checked, 0);
    }
}
