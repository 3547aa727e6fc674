// 👥 Per-Capita Calculator
//
// Population <= 0 is a data-quality problem, not a crash: the result is 0 and
// an InvalidPopulation warning is produced.

use crate::budget::BudgetRecord;
use crate::entities::AdministrativeUnit;
use crate::error::EngineWarning;
use crate::inflation::{adjust_with_warning, CpiIndex};

/// Per-capita value plus any warnings raised while computing it
#[derive(Debug, Clone, PartialEq)]
pub struct PerCapita {
    pub value: f64,
    pub warnings: Vec<EngineWarning>,
}

fn invalid_population(unit: &AdministrativeUnit) -> EngineWarning {
    EngineWarning::InvalidPopulation {
        unit: unit.name.clone(),
        population: unit.population,
    }
}

pub fn per_capita_with_warnings(amount: f64, unit: &AdministrativeUnit) -> PerCapita {
    if unit.has_valid_population() {
        PerCapita {
            value: amount / unit.population as f64,
            warnings: Vec::new(),
        }
    } else {
        PerCapita {
            value: 0.0,
            warnings: vec![invalid_population(unit)],
        }
    }
}

/// `amount / unit.population`, or exactly 0 when the population is unusable
pub fn per_capita(amount: f64, unit: &AdministrativeUnit) -> f64 {
    let result = per_capita_with_warnings(amount, unit);
    result.warnings.iter().for_each(EngineWarning::log);
    result.value
}

/// Inflation-adjust `record.total_expense` to `base_year`, then divide by population
pub fn adjusted_per_capita_with_warnings(
    record: &BudgetRecord,
    unit: &AdministrativeUnit,
    cpi: &CpiIndex,
    base_year: i32,
) -> PerCapita {
    adjusted_amount_per_capita(record.total_expense, record.fiscal_year, unit, cpi, base_year)
}

pub fn adjusted_per_capita(
    record: &BudgetRecord,
    unit: &AdministrativeUnit,
    cpi: &CpiIndex,
    base_year: i32,
) -> f64 {
    let result = adjusted_per_capita_with_warnings(record, unit, cpi, base_year);
    result.warnings.iter().for_each(EngineWarning::log);
    result.value
}

/// Shared by the adjusted tree: any amount recorded in `fiscal_year`
pub(crate) fn adjusted_amount_per_capita(
    amount: f64,
    fiscal_year: i32,
    unit: &AdministrativeUnit,
    cpi: &CpiIndex,
    base_year: i32,
) -> PerCapita {
    let adjusted = adjust_with_warning(amount, fiscal_year, base_year, cpi);
    let mut result = per_capita_with_warnings(adjusted.amount, unit);

    if let Some(warning) = adjusted.warning {
        result.warnings.insert(0, warning);
    }
    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UnitType;

    fn unit(population: i64) -> AdministrativeUnit {
        AdministrativeUnit::new("portland-city", "Portland", UnitType::City, population, 2024)
    }

    fn cpi() -> CpiIndex {
        CpiIndex::new(2024, vec![(2020, 92.0), (2024, 100.0)]).unwrap()
    }

    #[test]
    fn test_per_capita_division() {
        let portland = unit(600_000);

        assert_eq!(per_capita(1_200_000.0, &portland), 2.0);
        assert_eq!(per_capita(0.0, &portland), 0.0);
        assert_eq!(per_capita(123.0, &portland), 123.0 / 600_000.0);
    }

    #[test]
    fn test_zero_population_returns_zero() {
        let empty = unit(0);

        let result = per_capita_with_warnings(1_000_000.0, &empty);
        assert_eq!(result.value, 0.0);
        assert!(result.value.is_finite());
        assert_eq!(
            result.warnings,
            vec![EngineWarning::InvalidPopulation {
                unit: "Portland".to_string(),
                population: 0,
            }]
        );
    }

    #[test]
    fn test_negative_population_returns_zero() {
        assert_eq!(per_capita(500.0, &unit(-10)), 0.0);
    }

    #[test]
    fn test_adjusted_per_capita() {
        let record = BudgetRecord::new("pbot", "Transportation", "City", 2020, 92_000.0);

        let value = adjusted_per_capita(&record, &unit(1_000), &cpi(), 2024);
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjusted_per_capita_collects_both_warnings() {
        let record = BudgetRecord::new("pbot", "Transportation", "City", 2019, 92_000.0);

        let result = adjusted_per_capita_with_warnings(&record, &unit(0), &cpi(), 2024);
        assert_eq!(result.value, 0.0);
        assert_eq!(result.warnings.len(), 2);
        assert!(matches!(result.warnings[0], EngineWarning::MissingCpiData { .. }));
        assert!(matches!(result.warnings[1], EngineWarning::InvalidPopulation { .. }));
    }

    #[test]
    fn test_adjusted_per_capita_missing_cpi_uses_nominal() {
        let record = BudgetRecord::new("pbot", "Transportation", "City", 2019, 50_000.0);

        assert_eq!(adjusted_per_capita(&record, &unit(500), &cpi(), 2024), 100.0);
    }
}
