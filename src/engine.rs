// ⚙️ Budget Engine - the explicit configuration every query runs against
//
// Holds the read-only CPI index, unit registry and base year. No ambient
// constants: whoever builds the engine decides all three. Every method is a
// pure function of its arguments and this configuration, so one engine can be
// shared across threads without locking.

use crate::aggregation::{
    build_adjusted_tree, build_tree_with_report, funding_source_counts, rank_per_capita, rank_units,
    unit_breakdown, AggregationTree, FundingSourceCount, PerCapitaRanking, RankedUnit, UnitBreakdown,
};
use crate::budget::{BudgetRecord, SpendingFilter};
use crate::classification::{record_matches_filter, split_for_filter};
use crate::data_quality::{DataQualityEngine, QualityReport};
use crate::entities::{AdministrativeUnit, UnitRegistry};
use crate::error::EngineWarning;
use crate::inflation::{adjust, CpiIndex};
use crate::merge::BudgetDataset;
use crate::per_capita::{adjusted_per_capita, per_capita};

#[derive(Debug, Clone)]
pub struct BudgetEngine {
    registry: UnitRegistry,
    cpi: CpiIndex,
    base_year: i32,
}

impl BudgetEngine {
    /// Base year defaults to the CPI index's own base year
    pub fn new(registry: UnitRegistry, cpi: CpiIndex) -> Self {
        let base_year = cpi.base_year();
        BudgetEngine {
            registry,
            cpi,
            base_year,
        }
    }

    pub fn with_base_year(mut self, base_year: i32) -> Self {
        self.base_year = base_year;
        self
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn cpi(&self) -> &CpiIndex {
        &self.cpi
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    // ------------------------------------------------------------------------
    // Record-level
    // ------------------------------------------------------------------------

    pub fn resolve(&self, record: &BudgetRecord) -> Result<&AdministrativeUnit, EngineWarning> {
        self.registry.resolve_record(record)
    }

    pub fn filtered_amount(&self, record: &BudgetRecord, filter: SpendingFilter) -> f64 {
        split_for_filter(record, filter)
    }

    /// Nominal amount in base-year dollars
    pub fn to_base_year(&self, amount: f64, fiscal_year: i32) -> f64 {
        adjust(amount, fiscal_year, self.base_year, &self.cpi)
    }

    /// Per-capita expense of a record against its own unit, `None` when unmatched
    pub fn per_capita(&self, record: &BudgetRecord) -> Option<f64> {
        self.unit_for(record)
            .map(|unit| per_capita(record.total_expense, unit))
    }

    /// Inflation-adjusted per-capita expense, `None` when unmatched
    pub fn adjusted_per_capita(&self, record: &BudgetRecord) -> Option<f64> {
        self.unit_for(record)
            .map(|unit| adjusted_per_capita(record, unit, &self.cpi, self.base_year))
    }

    fn unit_for(&self, record: &BudgetRecord) -> Option<&AdministrativeUnit> {
        match self.resolve(record) {
            Ok(unit) => Some(unit),
            Err(warning) => {
                log::debug!("{}", warning);
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Dataset-level
    // ------------------------------------------------------------------------

    /// Per-capita tree over the dataset's top-level records
    pub fn tree(&self, dataset: &BudgetDataset, filter: SpendingFilter) -> AggregationTree {
        build_tree_with_report(dataset.top_level(), &self.registry, filter)
    }

    /// Per-capita tree in base-year dollars
    pub fn adjusted_tree(&self, dataset: &BudgetDataset, filter: SpendingFilter) -> AggregationTree {
        build_adjusted_tree(dataset.top_level(), &self.registry, filter, &self.cpi, self.base_year)
    }

    /// Units ranked by per-capita spend, suspect units left out
    pub fn unit_ranking(&self, dataset: &BudgetDataset, filter: SpendingFilter) -> Vec<RankedUnit> {
        rank_units(&self.tree(dataset, filter))
    }

    /// Records to show in a flat listing under `filter` (unmatched included)
    pub fn listing<'d>(&self, dataset: &'d BudgetDataset, filter: SpendingFilter) -> Vec<&'d BudgetRecord> {
        dataset
            .records()
            .iter()
            .filter(|record| record_matches_filter(record, filter))
            .collect()
    }

    /// Breakdown for the unit matching `label` (name or alias)
    pub fn breakdown(&self, dataset: &BudgetDataset, label: &str, filter: SpendingFilter) -> Option<UnitBreakdown> {
        let unit = self.registry.resolve(label).ok()?;
        Some(unit_breakdown(dataset.records(), &self.registry, unit, filter))
    }

    pub fn ranking(&self, dataset: &BudgetDataset, label: &str) -> Option<PerCapitaRanking> {
        let unit = self.registry.resolve(label).ok()?;
        Some(rank_per_capita(
            dataset.records(),
            &self.registry,
            unit,
            &self.cpi,
            self.base_year,
        ))
    }

    pub fn funding_sources(&self, dataset: &BudgetDataset) -> Vec<FundingSourceCount> {
        funding_source_counts(dataset.records())
    }

    pub fn quality_report(&self, dataset: &BudgetDataset) -> QualityReport {
        DataQualityEngine::new().assess(dataset.records(), &self.registry, &self.cpi, self.base_year)
    }
}

// ============================================================================
// TESTS
// ============================================================================
