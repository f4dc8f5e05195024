// 🏷️ Location Classifier - Column names into semantic categories
// Pattern rules are configuration; exact names beat substring/wildcard hits

use crate::config::PipelineConfig;
use crate::normalize::clean_text;
use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORIES
// ============================================================================

/// LocationCategory - Semantic role of a column in the logistics path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationCategory {
    /// ETD/ETA-style columns; present before anything is received
    PreArrival,
    /// Ordinary warehouse
    Warehouse,
    /// Offshore base (MOSB) - distinct from warehouses, shifts the flow code
    OffshoreBase,
    /// Final site - terminal by construction
    Site,
}

impl LocationCategory {
    pub fn name(&self) -> &str {
        match self {
            LocationCategory::PreArrival => "pre_arrival",
            LocationCategory::Warehouse => "warehouse",
            LocationCategory::OffshoreBase => "offshore_base",
            LocationCategory::Site => "site",
        }
    }
}

// ============================================================================
// COLUMN RULES
// ============================================================================

/// One configured pattern bound to its category
#[derive(Debug, Clone)]
struct ColumnRule {
    pattern: String,
    category: LocationCategory,
}

impl ColumnRule {
    /// Exact match: case-insensitive equality after whitespace cleanup.
    /// Wildcard patterns never match exactly.
    fn matches_exactly(&self, cleaned: &str) -> bool {
        !self.pattern.contains('*') && cleaned.eq_ignore_ascii_case(&self.pattern)
    }

    /// Loose match: `*` wildcard parts in order, or bare substring
    fn matches_loosely(&self, cleaned: &str) -> bool {
        let pattern_lower = self.pattern.to_lowercase();
        let text_lower = cleaned.to_lowercase();

        if pattern_lower.contains('*') {
            let parts: Vec<&str> = pattern_lower.split('*').collect();

            if parts.is_empty() {
                return false;
            }

            if !parts[0].is_empty() && !text_lower.starts_with(parts[0]) {
                return false;
            }

            if !parts[parts.len() - 1].is_empty()
                && !text_lower.ends_with(parts[parts.len() - 1])
            {
                return false;
            }

            let mut current_pos = parts[0].len();
            for i in 1..parts.len() - 1 {
                if parts[i].is_empty() {
                    continue;
                }
                if let Some(pos) = text_lower[current_pos..].find(parts[i]) {
                    current_pos += pos + parts[i].len();
                } else {
                    return false;
                }
            }

            true
        } else {
            text_lower.contains(&pattern_lower)
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// LocationClassifier - Compiled pattern rules for one run
pub struct LocationClassifier {
    rules: Vec<ColumnRule>,
    phrases: Vec<String>,
}

impl LocationClassifier {
    /// Compile the configured pattern lists. Rule order: warehouses, then
    /// offshore, then sites, then pre-arrival columns, preserving the order
    /// inside each list.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut rules = Vec::new();

        let sections = [
            (&config.warehouse_column_patterns, LocationCategory::Warehouse),
            (&config.offshore_column_patterns, LocationCategory::OffshoreBase),
            (&config.site_column_patterns, LocationCategory::Site),
            (&config.pre_arrival_column_patterns, LocationCategory::PreArrival),
        ];

        for (patterns, category) in sections {
            for pattern in patterns {
                rules.push(ColumnRule {
                    pattern: clean_text(pattern),
                    category,
                });
            }
        }

        let phrases = config
            .pre_arrival_phrases
            .iter()
            .map(|p| clean_text(p).to_lowercase())
            .collect();

        LocationClassifier { rules, phrases }
    }

    /// Classify a column name. `None` means "ignored" - the column matched
    /// no configured pattern and is excluded from event extraction (counted
    /// in the run summary, never reported per record).
    pub fn classify_column(&self, column_name: &str) -> Option<LocationCategory> {
        let cleaned = clean_text(column_name);

        if cleaned.is_empty() {
            return None;
        }

        // Exact names win over any loose match, regardless of rule order
        for rule in &self.rules {
            if rule.matches_exactly(&cleaned) {
                return Some(rule.category);
            }
        }

        for rule in &self.rules {
            if rule.matches_loosely(&cleaned) {
                return Some(rule.category);
            }
        }

        None
    }

    /// Value-level pre-arrival match: does this cell text contain any of the
    /// configured phrases? Distinct from all column-level matching.
    pub fn matches_pre_arrival_phrase(&self, text: &str) -> bool {
        let cleaned = clean_text(text).to_lowercase();

        if cleaned.is_empty() {
            return false;
        }

        self.phrases.iter().any(|phrase| cleaned.contains(phrase))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
