// 🏛️ Administrative Unit Entity - canonical units + label resolution
//
// Budget records carry a free-text unit label. Source documents use short
// codes for the two most common units, so "City" means the unit named
// "Portland" and "Metro" means "Portland Metro". Everything else matches on
// the unit name, case-insensitively.

use crate::budget::{BudgetRecord, Reference};
use crate::error::EngineWarning;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Short codes used by the source documents, label -> canonical unit name
pub const STANDARD_ALIASES: [(&str, &str); 2] = [("City", "Portland"), ("Metro", "Portland Metro")];

// ============================================================================
// UNIT TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnitType {
    City,
    Metro,
    County,
    /// Special districts, school districts, anything else
    Other(String),
}

impl UnitType {
    pub fn as_str(&self) -> &str {
        match self {
            UnitType::City => "City",
            UnitType::Metro => "Metro",
            UnitType::County => "County",
            UnitType::Other(name) => name,
        }
    }
}

impl From<String> for UnitType {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "city" => UnitType::City,
            "metro" => UnitType::Metro,
            "county" => UnitType::County,
            _ => UnitType::Other(value),
        }
    }
}

impl From<UnitType> for String {
    fn from(value: UnitType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ADMINISTRATIVE UNIT
// ============================================================================

/// A governance entity with its own population and budget scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministrativeUnit {
    pub id: String,

    /// Canonical name, the key budget labels resolve to
    pub name: String,

    #[serde(rename = "type")]
    pub unit_type: UnitType,

    #[serde(default)]
    pub state: String,

    /// Must be > 0 for per-capita use. JSON floats are truncated.
    #[serde(deserialize_with = "deserialize_population")]
    pub population: i64,

    #[serde(rename = "year", alias = "referenceYear", default)]
    pub reference_year: i32,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub references: Vec<Reference>,
}

fn deserialize_population<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!("population {} is not a finite number", value)));
    }
    Ok(value.trunc() as i64)
}

impl AdministrativeUnit {
    pub fn new(id: &str, name: &str, unit_type: UnitType, population: i64, reference_year: i32) -> Self {
        AdministrativeUnit {
            id: id.to_string(),
            name: name.to_string(),
            unit_type,
            state: String::new(),
            population,
            reference_year,
            notes: String::new(),
            references: Vec::new(),
        }
    }

    /// Population usable as a per-capita divisor
    pub fn has_valid_population(&self) -> bool {
        self.population > 0
    }

    /// Case-insensitive name equality
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Registry loader document (`administrative-units.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrativeUnitsData {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub data_source_url: String,
    pub units: Vec<AdministrativeUnit>,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Label matched no unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub label: String,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no administrative unit matches '{}'", self.label)
    }
}

impl std::error::Error for NotFound {}

/// Resolve a record label against `units` using the standard aliases
pub fn resolve<'a>(label: &str, units: &'a [AdministrativeUnit]) -> Result<&'a AdministrativeUnit, NotFound> {
    resolve_position(label, units, STANDARD_ALIASES.iter().map(|(l, n)| (*l, *n))).map(|i| &units[i])
}

/// Alias rules are tried first (over all units), then plain name equality.
fn resolve_position<'b, I>(label: &str, units: &[AdministrativeUnit], aliases: I) -> Result<usize, NotFound>
where
    I: IntoIterator<Item = (&'b str, &'b str)>,
{
    let lower = label.trim().to_lowercase();

    for (alias, target) in aliases {
        if alias.to_lowercase() == lower {
            if let Some(position) = units.iter().position(|u| u.is_named(target)) {
                return Ok(position);
            }
        }
    }

    units
        .iter()
        .position(|u| u.name.to_lowercase() == lower)
        .ok_or_else(|| NotFound {
            label: label.to_string(),
        })
}

// ============================================================================
// UNIT REGISTRY
// ============================================================================

/// Read-only unit registry handed to the engine at construction time
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<AdministrativeUnit>,

    /// label -> canonical unit name
    aliases: Vec<(String, String)>,
}

impl UnitRegistry {
    /// Registry with the standard "City"/"Metro" aliases
    pub fn new(units: Vec<AdministrativeUnit>) -> Self {
        let aliases = STANDARD_ALIASES
            .iter()
            .map(|(label, name)| (label.to_string(), name.to_string()))
            .collect();

        UnitRegistry { units, aliases }
    }

    /// Add an extra alias; existing rules keep precedence
    pub fn with_alias(mut self, label: &str, unit_name: &str) -> Self {
        let exists = self
            .aliases
            .iter()
            .any(|(l, _)| l.to_lowercase() == label.to_lowercase());
        if !exists {
            self.aliases.push((label.to_string(), unit_name.to_string()));
        }
        self
    }

    pub fn units(&self) -> &[AdministrativeUnit] {
        &self.units
    }

    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn resolve(&self, label: &str) -> Result<&AdministrativeUnit, NotFound> {
        self.resolve_position(label).map(|i| &self.units[i])
    }

    /// Position of the matching unit in `units()`
    pub fn resolve_position(&self, label: &str) -> Result<usize, NotFound> {
        resolve_position(
            label,
            &self.units,
            self.aliases.iter().map(|(l, n)| (l.as_str(), n.as_str())),
        )
    }

    /// Resolve a record's label, turning a miss into an `UnitNotFound` warning
    pub fn resolve_record(&self, record: &BudgetRecord) -> Result<&AdministrativeUnit, EngineWarning> {
        self.resolve(&record.administrative_unit_label)
            .map_err(|missing| EngineWarning::UnitNotFound {
                record_id: record.id.clone(),
                label: missing.label,
            })
    }

    pub fn find_by_id(&self, id: &str) -> Option<&AdministrativeUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn by_type(&self, unit_type: &UnitType) -> Vec<&AdministrativeUnit> {
        self.units.iter().filter(|u| &u.unit_type == unit_type).collect()
    }

    /// Units whose population cannot be used for per-capita figures
    pub fn suspect_units(&self) -> Vec<&AdministrativeUnit> {
        self.units.iter().filter(|u| !u.has_valid_population()).collect()
    }
}

impl From<AdministrativeUnitsData> for UnitRegistry {
    fn from(data: AdministrativeUnitsData) -> Self {
        UnitRegistry::new(data.units)
    }
}

// ============================================================================
// TESTS
// ============================================================================
