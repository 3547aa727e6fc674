// 📒 Budget Records - the immutable input values of the engine
//
// Field names on the wire follow the parsed budget documents
// (camelCase, `administrativeUnit`, `year`, `children`, `allocation`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Capital / operating / debt tag from the classification overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// One-time infrastructure spend
    Capital,

    /// Recurring spend
    Operating,

    /// Blend of both, split by `capital_expense` / `operating_expense`
    Mixed,

    /// Debt service
    Debt,

    #[default]
    Unclassified,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Capital => "capital",
            Classification::Operating => "operating",
            Classification::Mixed => "mixed",
            Classification::Debt => "debt",
            Classification::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SPENDING FILTER
// ============================================================================

/// View selector; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendingFilter {
    #[default]
    All,
    Capital,
    Operating,
    Debt,
}

impl SpendingFilter {
    pub const ALL: [SpendingFilter; 4] = [
        SpendingFilter::All,
        SpendingFilter::Capital,
        SpendingFilter::Operating,
        SpendingFilter::Debt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpendingFilter::All => "all",
            SpendingFilter::Capital => "capital",
            SpendingFilter::Operating => "operating",
            SpendingFilter::Debt => "debt",
        }
    }

    /// Human label used by the CLI output
    pub fn label(&self) -> &'static str {
        match self {
            SpendingFilter::All => "All Spending",
            SpendingFilter::Capital => "Capital Only",
            SpendingFilter::Operating => "Operating Only",
            SpendingFilter::Debt => "Debt Service",
        }
    }
}

impl fmt::Display for SpendingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpendingFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SpendingFilter::All),
            "capital" => Ok(SpendingFilter::Capital),
            "operating" => Ok(SpendingFilter::Operating),
            "debt" => Ok(SpendingFilter::Debt),
            other => Err(format!(
                "unknown spending filter '{}' (expected all, capital, operating or debt)",
                other
            )),
        }
    }
}

// ============================================================================
// SUPPORTING VALUES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
}

/// Metric values arrive either as numbers or as free text ("12%", "n/a")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(t) => t.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetMetric {
    pub name: String,
    pub value: MetricValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

// ============================================================================
// BUDGET RECORD
// ============================================================================

/// One department/bureau's budget line for one fiscal year.
///
/// Records form a tree through `parent_id` / `child_ids`; both are plain ids
/// into the flat collection held by [`crate::merge::BudgetDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    pub id: String,
    pub name: String,

    /// Free-text unit label ("City", "Metro", "Multnomah")
    #[serde(rename = "administrativeUnit", alias = "administrativeUnitLabel")]
    pub administrative_unit_label: String,

    #[serde(rename = "year", alias = "fiscalYear")]
    pub fiscal_year: i32,

    #[serde(default)]
    pub total_expense: f64,

    #[serde(default)]
    pub total_revenue: f64,

    /// Share of the parent budget, 0-1
    #[serde(default, rename = "allocation", alias = "allocationFraction")]
    pub allocation_fraction: f64,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default, rename = "children", alias = "childIds")]
    pub child_ids: Vec<String>,

    #[serde(default)]
    pub funding_sources: Vec<String>,

    #[serde(default)]
    pub classification: Classification,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_expense: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expense: Option<f64>,

    #[serde(default)]
    pub metrics: Vec<BudgetMetric>,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub references: Vec<Reference>,
}

impl BudgetRecord {
    /// Minimal unclassified root record
    pub fn new(id: &str, name: &str, unit_label: &str, fiscal_year: i32, total_expense: f64) -> Self {
        BudgetRecord {
            id: id.to_string(),
            name: name.to_string(),
            administrative_unit_label: unit_label.to_string(),
            fiscal_year,
            total_expense,
            total_revenue: 0.0,
            allocation_fraction: 0.0,
            parent_id: None,
            child_ids: Vec::new(),
            funding_sources: Vec::new(),
            classification: Classification::Unclassified,
            operating_expense: None,
            capital_expense: None,
            metrics: Vec::new(),
            notes: String::new(),
            references: Vec::new(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Copy classification fields from an overlay entry
    pub fn apply_classification(&mut self, entry: &ClassificationEntry) {
        self.classification = entry.classification;
        self.operating_expense = entry.operating_expense;
        self.capital_expense = entry.capital_expense;
    }
}

// ============================================================================
// UPSTREAM DOCUMENTS
// ============================================================================

/// One parsed budget source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDocument {
    pub fiscal_year: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub data_source_url: String,
    pub departments: Vec<BudgetRecord>,
}

/// One entry of the capital-vs-operating overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationEntry {
    pub id: String,
    pub classification: Classification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_expense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expense: Option<f64>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_from_source_shape() {
        let json = r#"{
            "id": "pbot",
            "name": "Transportation",
            "administrativeUnit": "City",
            "administrativeUnitId": "portland-city",
            "cityName": "Portland",
            "totalExpense": 1500000,
            "totalRevenue": 1200000,
            "year": 2023,
            "grouping": "Public Works",
            "parentId": null,
            "children": ["pbot-maint"],
            "fundingSources": ["Gas Tax", "General Fund"],
            "notes": "",
            "references": [{"title": "Adopted Budget", "url": "https://example.org"}],
            "allocation": 0.12,
            "description": "Streets",
            "metrics": [{"name": "Lane miles", "value": "4,800"}, {"name": "FTE", "value": 950, "unit": "people"}]
        }"#;

        let record: BudgetRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.administrative_unit_label, "City");
        assert_eq!(record.fiscal_year, 2023);
        assert_eq!(record.allocation_fraction, 0.12);
        assert_eq!(record.child_ids, vec!["pbot-maint".to_string()]);
        assert_eq!(record.classification, Classification::Unclassified);
        assert!(record.is_top_level());
        assert_eq!(record.metrics[1].value.as_f64(), Some(950.0));
        assert_eq!(record.metrics[0].value.as_f64(), None);
    }

    #[test]
    fn test_classification_wire_format() {
        let entry: ClassificationEntry = serde_json::from_str(
            r#"{"id": "parks", "classification": "mixed", "capitalExpense": 300000}"#,
        )
        .unwrap();

        assert_eq!(entry.classification, Classification::Mixed);
        assert_eq!(entry.capital_expense, Some(300000.0));
        assert_eq!(entry.operating_expense, None);

        let mut record = BudgetRecord::new("parks", "Parks", "City", 2023, 1_000_000.0);
        record.apply_classification(&entry);
        assert_eq!(record.classification, Classification::Mixed);
        assert_eq!(record.capital_expense, Some(300000.0));
    }

    #[test]
    fn test_spending_filter_parse() {
        assert_eq!("Capital".parse::<SpendingFilter>(), Ok(SpendingFilter::Capital));
        assert_eq!(" debt ".parse::<SpendingFilter>(), Ok(SpendingFilter::Debt));
        assert!("mixed".parse::<SpendingFilter>().is_err());

        for filter in SpendingFilter::ALL {
            assert_eq!(filter.as_str().parse::<SpendingFilter>(), Ok(filter));
        }
    }
}
