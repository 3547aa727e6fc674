// 🔗 Budget Merge Service - source documents + classification overlay -> dataset
//
// Documents are concatenated in the order given. The combined fiscal year is
// the first document's, even when later documents disagree (logged, not fixed).
// The overlay is optional enrichment: records without an entry stay unclassified.
//
// The result is an arena: records in merge order plus an id -> positions map.
// Ids are stable across fiscal years, so a record is keyed by (id, fiscal year)
// and parent/child links resolve within the record's own fiscal year.
// A repeated key or an unknown parent is a warning; only a parent cycle aborts.

use crate::budget::{BudgetDocument, BudgetRecord, ClassificationEntry};
use crate::error::{BudgetError, EngineWarning};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const COMBINED_DATA_SOURCE: &str = "Combined Budget Data";

// ============================================================================
// DOCUMENT PARSING
// ============================================================================

/// Structural check + typed parse of one raw source document
pub fn parse_document(index: usize, raw: &Value) -> Result<BudgetDocument, BudgetError> {
    let document = raw
        .get("dataSource")
        .and_then(Value::as_str)
        .unwrap_or("unnamed document")
        .to_string();

    let missing = |reason: String| BudgetError::MissingSourceData {
        index,
        document: document.clone(),
        reason,
    };

    match raw.get("departments") {
        Some(Value::Array(_)) => {}
        Some(_) => return Err(missing("'departments' is not an array".to_string())),
        None => return Err(missing("no 'departments' field".to_string())),
    }

    serde_json::from_value(raw.clone()).map_err(|e| missing(e.to_string()))
}

// ============================================================================
// MERGE
// ============================================================================

/// Merge raw source documents, stamping today's date (UTC)
pub fn merge(documents: &[Value], overlay: &[ClassificationEntry]) -> Result<BudgetDataset, BudgetError> {
    merge_at(documents, overlay, Utc::now().date_naive())
}

/// Merge raw source documents with an explicit `last_updated` date
pub fn merge_at(
    documents: &[Value],
    overlay: &[ClassificationEntry],
    today: NaiveDate,
) -> Result<BudgetDataset, BudgetError> {
    let parsed = documents
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_document(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    merge_documents(parsed, overlay, today)
}

/// Merge already-typed documents
pub fn merge_documents(
    documents: Vec<BudgetDocument>,
    overlay: &[ClassificationEntry],
    today: NaiveDate,
) -> Result<BudgetDataset, BudgetError> {
    let fiscal_year = match documents.first() {
        Some(first) => first.fiscal_year.clone(),
        None => {
            return Err(BudgetError::MissingSourceData {
                index: 0,
                document: "none".to_string(),
                reason: "no source documents supplied".to_string(),
            })
        }
    };

    if documents.iter().any(|d| d.fiscal_year != fiscal_year) {
        log::warn!(
            "Source documents span several fiscal years; combined dataset labelled {}",
            fiscal_year
        );
    }

    // Later overlay entries win on duplicate ids
    let overlay_by_id: HashMap<&str, &ClassificationEntry> =
        overlay.iter().map(|entry| (entry.id.as_str(), entry)).collect();

    let document_count = documents.len();
    let mut records = Vec::new();
    let mut classified = 0usize;

    for document in documents {
        log::debug!(
            "Merging {} records from '{}'",
            document.departments.len(),
            document.data_source
        );

        for mut record in document.departments {
            if let Some(entry) = overlay_by_id.get(record.id.as_str()) {
                record.apply_classification(entry);
                classified += 1;
            }
            records.push(record);
        }
    }

    log::info!(
        "Merged {} documents into {} records ({} classified by overlay)",
        document_count,
        records.len(),
        classified
    );

    BudgetDataset::new(
        fiscal_year,
        today.format("%Y-%m-%d").to_string(),
        COMBINED_DATA_SOURCE.to_string(),
        String::new(),
        records,
    )
}

// ============================================================================
// BUDGET DATASET (arena + index)
// ============================================================================

#[derive(Debug, Clone)]
pub struct BudgetDataset {
    pub fiscal_year: String,
    pub last_updated: String,
    pub data_source: String,
    pub data_source_url: String,
    records: Vec<BudgetRecord>,
    /// Positions in merge order, at most one per fiscal year
    index: HashMap<String, Vec<usize>>,
    warnings: Vec<EngineWarning>,
}

impl BudgetDataset {
    /// Build and validate: acyclic parent chains are required, repeated
    /// (id, fiscal year) keys and unknown parents are reported as warnings
    pub fn new(
        fiscal_year: String,
        last_updated: String,
        data_source: String,
        data_source_url: String,
        records: Vec<BudgetRecord>,
    ) -> Result<Self, BudgetError> {
        let (index, warnings) = build_index(&records);
        for warning in &warnings {
            warning.log();
        }

        check_cycles(&records, &index)?;

        Ok(BudgetDataset {
            fiscal_year,
            last_updated,
            data_source,
            data_source_url,
            records,
            index,
            warnings,
        })
    }

    /// Dataset without document metadata
    pub fn from_records(records: Vec<BudgetRecord>) -> Result<Self, BudgetError> {
        BudgetDataset::new(String::new(), String::new(), String::new(), String::new(), records)
    }

    pub fn records(&self) -> &[BudgetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Structural problems found while indexing
    pub fn warnings(&self) -> &[EngineWarning] {
        &self.warnings
    }

    /// First record with this id in merge order, whatever its fiscal year
    pub fn get(&self, id: &str) -> Option<&BudgetRecord> {
        self.index
            .get(id)
            .and_then(|positions| positions.first())
            .map(|&i| &self.records[i])
    }

    pub fn get_in_year(&self, id: &str, fiscal_year: i32) -> Option<&BudgetRecord> {
        lookup(&self.index, &self.records, id, fiscal_year).map(|i| &self.records[i])
    }

    /// Fiscal years an id appears in, in merge order
    pub fn years_of(&self, id: &str) -> Vec<i32> {
        self.index
            .get(id)
            .map(|positions| positions.iter().map(|&i| self.records[i].fiscal_year).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, record: &BudgetRecord) -> Option<&BudgetRecord> {
        record
            .parent_id
            .as_deref()
            .and_then(|id| self.get_in_year(id, record.fiscal_year))
    }

    /// Children in `child_ids` order; ids not in the record's year are skipped
    pub fn children(&self, record: &BudgetRecord) -> Vec<&BudgetRecord> {
        record
            .child_ids
            .iter()
            .filter_map(|id| {
                let child = self.get_in_year(id, record.fiscal_year);
                if child.is_none() {
                    log::debug!("Record '{}' lists unknown child '{}'", record.id, id);
                }
                child
            })
            .collect()
    }

    /// Root records in merge order
    pub fn top_level(&self) -> Vec<&BudgetRecord> {
        self.records.iter().filter(|r| r.is_top_level()).collect()
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self, record: &BudgetRecord) -> Vec<&BudgetRecord> {
        let mut chain = Vec::new();
        let mut current = self.parent(record);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }
        chain
    }

    /// Combined document in the source document shape
    pub fn to_document(&self) -> BudgetDocument {
        BudgetDocument {
            fiscal_year: self.fiscal_year.clone(),
            last_updated: self.last_updated.clone(),
            data_source: self.data_source.clone(),
            data_source_url: self.data_source_url.clone(),
            departments: self.records.clone(),
        }
    }

    pub fn into_records(self) -> Vec<BudgetRecord> {
        self.records
    }
}

fn lookup(index: &HashMap<String, Vec<usize>>, records: &[BudgetRecord], id: &str, fiscal_year: i32) -> Option<usize> {
    index
        .get(id)?
        .iter()
        .copied()
        .find(|&i| records[i].fiscal_year == fiscal_year)
}

fn build_index(records: &[BudgetRecord]) -> (HashMap<String, Vec<usize>>, Vec<EngineWarning>) {
    let mut index: HashMap<String, Vec<usize>> = HashMap::with_capacity(records.len());
    let mut warnings = Vec::new();

    for (position, record) in records.iter().enumerate() {
        let positions = index.entry(record.id.clone()).or_default();
        if positions.iter().any(|&i| records[i].fiscal_year == record.fiscal_year) {
            warnings.push(EngineWarning::DuplicateRecordId {
                id: record.id.clone(),
                fiscal_year: record.fiscal_year,
            });
        } else {
            positions.push(position);
        }
    }

    for record in records {
        if let Some(parent_id) = &record.parent_id {
            if lookup(&index, records, parent_id, record.fiscal_year).is_none() {
                warnings.push(EngineWarning::DanglingParent {
                    id: record.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
    }

    (index, warnings)
}

/// Structural warnings for a flat record list, as `BudgetDataset::new` reports them
pub fn structural_warnings(records: &[BudgetRecord]) -> Vec<EngineWarning> {
    build_index(records).1
}

fn check_cycles(records: &[BudgetRecord], index: &HashMap<String, Vec<usize>>) -> Result<(), BudgetError> {
    // Records already known to reach a root
    let mut rooted = vec![false; records.len()];

    for (start, record) in records.iter().enumerate() {
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        let mut current = start;

        loop {
            if rooted[current] {
                break;
            }
            if !seen.insert(current) {
                return Err(BudgetError::HierarchyCycle(record.id.clone()));
            }
            path.push(current);

            let parent = records[current]
                .parent_id
                .as_deref()
                .and_then(|id| lookup(index, records, id, records[current].fiscal_year));
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }

        for position in path {
            rooted[position] = true;
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Classification;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 9).unwrap()
    }

    fn record_json(id: &str, unit: &str, parent: Option<&str>, children: &[&str]) -> Value {
        json!({
            "id": id,
            "name": format!("Dept {}", id),
            "administrativeUnit": unit,
            "totalExpense": 1000,
            "totalRevenue": 0,
            "year": 2024,
            "parentId": parent,
            "children": children,
            "fundingSources": ["General Fund"],
            "allocation": 0.5,
            "notes": "",
            "references": []
        })
    }

    fn document(fiscal_year: &str, source: &str, records: Vec<Value>) -> Value {
        json!({
            "fiscalYear": fiscal_year,
            "lastUpdated": "2024-01-01",
            "dataSource": source,
            "dataSourceUrl": "",
            "departments": records
        })
    }

    fn record(id: &str, parent: Option<&str>) -> BudgetRecord {
        let mut r = BudgetRecord::new(id, id, "City", 2024, 10.0);
        r.parent_id = parent.map(str::to_string);
        r
    }

    #[test]
    fn test_merge_concatenates_in_order() {
        let docs = vec![
            document("2024-25", "City Budget", vec![record_json("city-police", "City", None, &[])]),
            document("2024-25", "Metro Budget", vec![record_json("metro-parks", "Metro", None, &[])]),
        ];

        let dataset = merge_at(&docs, &[], today()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].id, "city-police");
        assert_eq!(dataset.records()[1].id, "metro-parks");
        assert_eq!(dataset.fiscal_year, "2024-25");
        assert_eq!(dataset.last_updated, "2024-04-09");
        assert_eq!(dataset.data_source, COMBINED_DATA_SOURCE);
        assert_eq!(dataset.data_source_url, "");
    }

    #[test]
    fn test_fiscal_year_taken_from_first_document() {
        let docs = vec![
            document("2023-24", "A", vec![record_json("a", "City", None, &[])]),
            document("2024-25", "B", vec![record_json("b", "City", None, &[])]),
        ];

        let dataset = merge_at(&docs, &[], today()).unwrap();
        assert_eq!(dataset.fiscal_year, "2023-24");
    }

    #[test]
    fn test_overlay_enriches_matching_records() {
        let docs = vec![document(
            "2024-25",
            "City Budget",
            vec![
                record_json("parks", "City", None, &[]),
                record_json("police", "City", None, &[]),
            ],
        )];
        let overlay = vec![ClassificationEntry {
            id: "parks".to_string(),
            classification: Classification::Mixed,
            operating_expense: Some(700.0),
            capital_expense: Some(300.0),
        }];

        let dataset = merge_at(&docs, &overlay, today()).unwrap();
        let parks = dataset.get("parks").unwrap();
        let police = dataset.get("police").unwrap();

        assert_eq!(parks.classification, Classification::Mixed);
        assert_eq!(parks.capital_expense, Some(300.0));
        assert_eq!(parks.operating_expense, Some(700.0));
        assert_eq!(police.classification, Classification::Unclassified);
        assert_eq!(police.capital_expense, None);
    }

    #[test]
    fn test_document_without_departments_aborts_merge() {
        let docs = vec![
            document("2024-25", "Good", vec![record_json("a", "City", None, &[])]),
            json!({"fiscalYear": "2024-25", "dataSource": "Broken"}),
        ];

        let err = merge_at(&docs, &[], today()).unwrap_err();
        match err {
            BudgetError::MissingSourceData { index, document, .. } => {
                assert_eq!(index, 1);
                assert_eq!(document, "Broken");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_record_is_missing_source_data() {
        let docs = vec![json!({"fiscalYear": "2024-25", "departments": [{"id": "x"}]})];

        let err = merge_at(&docs, &[], today()).unwrap_err();
        assert!(matches!(err, BudgetError::MissingSourceData { index: 0, .. }));
    }

    #[test]
    fn test_no_documents_is_an_error() {
        let err = merge_at(&[], &[], today()).unwrap_err();
        assert!(matches!(err, BudgetError::MissingSourceData { .. }));
    }

    #[test]
    fn test_same_id_in_two_fiscal_years_merges() {
        let mut police_2023 = record_json("police", "City", None, &[]);
        police_2023["year"] = json!(2023);
        police_2023["totalExpense"] = json!(900);
        let police_2024 = record_json("police", "City", None, &[]);

        let docs = vec![
            document("2023-24", "City Budget 2023", vec![police_2023]),
            document("2024-25", "City Budget 2024", vec![police_2024]),
        ];

        let dataset = merge_at(&docs, &[], today()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(dataset.warnings().is_empty());
        assert_eq!(dataset.years_of("police"), vec![2023, 2024]);
        assert_eq!(dataset.get("police").unwrap().fiscal_year, 2023);
        assert_eq!(dataset.get_in_year("police", 2023).unwrap().total_expense, 900.0);
        assert_eq!(dataset.get_in_year("police", 2024).unwrap().total_expense, 1000.0);
        assert!(dataset.get_in_year("police", 2022).is_none());
        assert_eq!(dataset.top_level().len(), 2);
    }

    #[test]
    fn test_parents_resolve_within_their_fiscal_year() {
        let mut root_2023 = record_json("pw", "City", None, &["pbot"]);
        root_2023["year"] = json!(2023);
        let mut child_2023 = record_json("pbot", "City", Some("pw"), &[]);
        child_2023["year"] = json!(2023);

        let docs = vec![
            document("2023-24", "A", vec![root_2023, child_2023]),
            document(
                "2024-25",
                "B",
                vec![
                    record_json("pw", "City", None, &["pbot"]),
                    record_json("pbot", "City", Some("pw"), &[]),
                ],
            ),
        ];

        let dataset = merge_at(&docs, &[], today()).unwrap();
        let child_2024 = dataset.get_in_year("pbot", 2024).unwrap();
        let root_2024 = dataset.get_in_year("pw", 2024).unwrap();

        assert_eq!(dataset.parent(child_2024).unwrap().fiscal_year, 2024);
        assert_eq!(dataset.children(root_2024)[0].fiscal_year, 2024);
    }

    #[test]
    fn test_duplicate_id_in_one_year_is_a_warning() {
        let docs = vec![
            document("2024-25", "A", vec![record_json("dup", "City", None, &[])]),
            document("2024-25", "B", vec![record_json("dup", "Metro", None, &[])]),
        ];

        let dataset = merge_at(&docs, &[], today()).unwrap();

        // Both records are kept, lookups see the first
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get("dup").unwrap().administrative_unit_label, "City");
        assert_eq!(
            dataset.warnings(),
            &[EngineWarning::DuplicateRecordId {
                id: "dup".to_string(),
                fiscal_year: 2024,
            }]
        );
    }

    #[test]
    fn test_dangling_parent_is_a_warning() {
        let dataset = BudgetDataset::from_records(vec![record("child", Some("missing"))]).unwrap();

        assert_eq!(
            dataset.warnings(),
            &[EngineWarning::DanglingParent {
                id: "child".to_string(),
                parent_id: "missing".to_string(),
            }]
        );
        let child = dataset.get("child").unwrap();
        assert!(dataset.parent(child).is_none());
        assert!(dataset.top_level().is_empty());
    }

    #[test]
    fn test_parent_in_another_year_does_not_resolve() {
        let mut parent = record("pw", None);
        parent.fiscal_year = 2023;
        let child = record("pbot", Some("pw"));

        let dataset = BudgetDataset::from_records(vec![parent, child]).unwrap();
        assert_eq!(structural_warnings(dataset.records()), dataset.warnings().to_vec());
        assert_eq!(dataset.warnings().len(), 1);
    }

    #[test]
    fn test_cycle_rejected() {
        let records = vec![
            record("root", None),
            record("a", Some("b")),
            record("b", Some("c")),
            record("c", Some("a")),
        ];

        let err = BudgetDataset::from_records(records).unwrap_err();
        assert!(matches!(err, BudgetError::HierarchyCycle(_)));

        let self_parent = BudgetDataset::from_records(vec![record("me", Some("me"))]).unwrap_err();
        assert_eq!(self_parent, BudgetError::HierarchyCycle("me".to_string()));
    }

    #[test]
    fn test_navigation() {
        let docs = vec![document(
            "2024-25",
            "City Budget",
            vec![
                record_json("pw", "City", None, &["pbot", "water", "ghost"]),
                record_json("pbot", "City", Some("pw"), &["pbot-maint"]),
                record_json("pbot-maint", "City", Some("pbot"), &[]),
                record_json("water", "City", Some("pw"), &[]),
                record_json("police", "City", None, &[]),
            ],
        )];

        let dataset = merge_at(&docs, &[], today()).unwrap();

        let top: Vec<&str> = dataset.top_level().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(top, vec!["pw", "police"]);

        let pw = dataset.get("pw").unwrap();
        let children: Vec<&str> = dataset.children(pw).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(children, vec!["pbot", "water"]);

        let maint = dataset.get("pbot-maint").unwrap();
        let ancestors: Vec<&str> = dataset.ancestors(maint).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ancestors, vec!["pbot", "pw"]);
        assert_eq!(dataset.parent(maint).unwrap().id, "pbot");
        assert!(dataset.parent(pw).is_none());
    }

    #[test]
    fn test_to_document_round_trips_through_json() {
        let docs = vec![document("2024-25", "City", vec![record_json("a", "City", None, &[])])];
        let dataset = merge_at(&docs, &[], today()).unwrap();

        let value = serde_json::to_value(dataset.to_document()).unwrap();
        assert_eq!(value["dataSource"], COMBINED_DATA_SOURCE);
        assert_eq!(value["departments"][0]["administrativeUnit"], "City");

        let reparsed = parse_document(0, &value).unwrap();
        assert_eq!(reparsed.departments.len(), 1);
    }
}
