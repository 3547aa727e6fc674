// 📂 Document Loaders - read the engine's inputs from disk
//
// The engine only sees in-memory values. These functions are the upstream
// collaborators the CLI uses to get them there.

use crate::budget::ClassificationEntry;
use crate::entities::{AdministrativeUnitsData, UnitRegistry};
use crate::inflation::{CpiData, CpiDataPoint, CpiIndex};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {:?}", path))
}

/// Every `*.json` file in `dir`, sorted by file name, as raw JSON.
///
/// Structure is checked later by the merge, which reports the offending document.
pub fn load_budget_documents(dir: &Path) -> Result<Vec<Value>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read budgets directory {:?}", dir))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents: Vec<Value> = Vec::with_capacity(paths.len());
    for path in &paths {
        log::debug!("Loading budget document {:?}", path);
        documents.push(read_json(path)?);
    }

    log::info!("Loaded {} budget documents from {:?}", documents.len(), dir);
    Ok(documents)
}

pub fn load_units(path: &Path) -> Result<UnitRegistry> {
    let data: AdministrativeUnitsData = read_json(path)?;
    log::info!("Loaded {} administrative units", data.units.len());
    Ok(UnitRegistry::from(data))
}

#[derive(Debug, Deserialize)]
struct CpiRow {
    year: i32,
    value: f64,
    #[serde(default)]
    notes: String,
}

/// CPI from a `CpiData` JSON document or a `year,value[,notes]` CSV.
/// A CSV carries no base year, so its latest year is used.
pub fn load_cpi(path: &Path) -> Result<CpiIndex> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));

    let data = if is_csv {
        let mut rdr = csv::Reader::from_path(path).with_context(|| format!("Failed to open CPI CSV {:?}", path))?;

        let mut annual_data = Vec::new();
        for result in rdr.deserialize() {
            let row: CpiRow = result.context("Failed to deserialize CPI row")?;
            annual_data.push(CpiDataPoint {
                year: row.year,
                value: row.value,
                notes: row.notes,
            });
        }

        let base_year = annual_data
            .iter()
            .map(|p| p.year)
            .max()
            .ok_or_else(|| anyhow!("CPI CSV {:?} has no rows", path))?;

        CpiData {
            last_updated: String::new(),
            data_source: path.display().to_string(),
            data_source_url: String::new(),
            base_year,
            annual_data,
        }
    } else {
        read_json(path)?
    };

    CpiIndex::try_from(data).with_context(|| format!("Invalid CPI series in {:?}", path))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OverlayDocument {
    Entries(Vec<ClassificationEntry>),
    Wrapped { entries: Vec<ClassificationEntry> },
}

/// Classification overlay; a missing file means "no enrichment", not an error
pub fn load_overlay(path: Option<&Path>) -> Result<Vec<ClassificationEntry>> {
    let path = match path {
        Some(path) if path.exists() => path,
        Some(path) => {
            log::warn!("Classification overlay {:?} not found; records stay unclassified", path);
            return Ok(Vec::new());
        }
        None => return Ok(Vec::new()),
    };

    let entries = match read_json::<OverlayDocument>(path)? {
        OverlayDocument::Entries(entries) => entries,
        OverlayDocument::Wrapped { entries } => entries,
    };

    log::info!("Loaded {} classification entries", entries.len());
    Ok(entries)
}

// ============================================================================
// TESTS
// ============================================================================
