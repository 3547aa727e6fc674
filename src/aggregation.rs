// 🌳 Hierarchical Aggregator - unit -> department per-capita tree
//
// Two levels: one node per administrative unit (in registry order), one leaf
// per record resolved to that unit (in record order). A node's value is the
// sum of its leaves, so the inner and outer chart rings always agree.
//
// Also home to the flat views built on the same primitives: unit breakdown,
// per-capita ranking and funding-source counts.

use crate::budget::{BudgetRecord, SpendingFilter};
use crate::classification::split_for_filter;
use crate::entities::{AdministrativeUnit, UnitRegistry};
use crate::error::EngineWarning;
use crate::inflation::CpiIndex;
use crate::per_capita::{adjusted_amount_per_capita, adjusted_per_capita_with_warnings, per_capita_with_warnings, PerCapita};
use serde::{Deserialize, Serialize};

// ============================================================================
// TREE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationLeaf {
    pub id: String,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationNode {
    pub unit_id: String,
    pub label: String,
    pub value: f64,
    pub child_nodes: Vec<AggregationLeaf>,
}

impl AggregationNode {
    pub fn leaf_total(&self) -> f64 {
        self.child_nodes.iter().map(|leaf| leaf.value).sum()
    }
}

/// Tree plus the diagnostics gathered while building it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationTree {
    pub nodes: Vec<AggregationNode>,

    /// Records whose unit label matched nothing
    pub unmatched_records: usize,

    /// Names of units with population <= 0 that appear in the tree
    pub suspect_units: Vec<String>,

    pub warnings: Vec<EngineWarning>,
}

impl AggregationTree {
    /// Sum of top-level node values
    pub fn total(&self) -> f64 {
        self.nodes.iter().map(|node| node.value).sum()
    }

    /// Sum of every leaf value
    pub fn leaf_total(&self) -> f64 {
        self.nodes.iter().map(AggregationNode::leaf_total).sum()
    }

    pub fn is_suspect(&self, unit_name: &str) -> bool {
        self.suspect_units.iter().any(|name| name == unit_name)
    }

    pub fn node(&self, label: &str) -> Option<&AggregationNode> {
        self.nodes.iter().find(|node| node.label == label)
    }
}

// ============================================================================
// TREE BUILDING
// ============================================================================

/// Build the per-capita tree for `filter`, with the standard unit aliases
pub fn build_tree(records: &[BudgetRecord], units: &[AdministrativeUnit], filter: SpendingFilter) -> Vec<AggregationNode> {
    let registry = UnitRegistry::new(units.to_vec());
    build_tree_with_report(records, &registry, filter).nodes
}

/// Per-capita tree with diagnostics: leaf = split_for_filter / population
pub fn build_tree_with_report<'r, I>(records: I, registry: &UnitRegistry, filter: SpendingFilter) -> AggregationTree
where
    I: IntoIterator<Item = &'r BudgetRecord>,
{
    assemble(records, registry, |record, unit| {
        per_capita_with_warnings(split_for_filter(record, filter), unit)
    })
}

/// Same shape as [`build_tree_with_report`], with each filtered amount
/// converted to `base_year` dollars before division by population
pub fn build_adjusted_tree<'r, I>(
    records: I,
    registry: &UnitRegistry,
    filter: SpendingFilter,
    cpi: &CpiIndex,
    base_year: i32,
) -> AggregationTree
where
    I: IntoIterator<Item = &'r BudgetRecord>,
{
    assemble(records, registry, |record, unit| {
        adjusted_amount_per_capita(split_for_filter(record, filter), record.fiscal_year, unit, cpi, base_year)
    })
}

fn push_unique(warnings: &mut Vec<EngineWarning>, warning: EngineWarning) {
    if !warnings.contains(&warning) {
        warning.log();
        warnings.push(warning);
    }
}

fn assemble<'r, I, F>(records: I, registry: &UnitRegistry, leaf_value: F) -> AggregationTree
where
    I: IntoIterator<Item = &'r BudgetRecord>,
    F: Fn(&BudgetRecord, &AdministrativeUnit) -> PerCapita,
{
    let units = registry.units();
    let mut groups: Vec<Vec<&BudgetRecord>> = vec![Vec::new(); units.len()];
    let mut tree = AggregationTree::default();

    for record in records {
        match registry.resolve_position(&record.administrative_unit_label) {
            Ok(position) => groups[position].push(record),
            Err(missing) => {
                log::debug!("Record '{}': {}", record.id, missing);
                tree.unmatched_records += 1;
                tree.warnings.push(EngineWarning::UnitNotFound {
                    record_id: record.id.clone(),
                    label: missing.label,
                });
            }
        }
    }

    if tree.unmatched_records > 0 {
        log::warn!(
            "{} records matched no administrative unit and were left out of the tree",
            tree.unmatched_records
        );
    }

    for (unit, group) in units.iter().zip(groups) {
        if group.is_empty() {
            continue;
        }

        if !unit.has_valid_population() {
            tree.suspect_units.push(unit.name.clone());
        }

        let mut child_nodes = Vec::with_capacity(group.len());
        for record in group {
            let computed = leaf_value(record, unit);
            for warning in computed.warnings {
                push_unique(&mut tree.warnings, warning);
            }
            child_nodes.push(AggregationLeaf {
                id: record.id.clone(),
                label: record.name.clone(),
                value: computed.value,
            });
        }

        let value = child_nodes.iter().map(|leaf| leaf.value).sum();
        tree.nodes.push(AggregationNode {
            unit_id: unit.id.clone(),
            label: unit.name.clone(),
            value,
            child_nodes,
        });
    }

    tree
}

// ============================================================================
// UNIT BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSlice {
    pub id: String,
    pub label: String,
    pub amount: f64,
}

/// Filtered dollar amounts of one unit's top-level records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitBreakdown {
    pub unit: String,
    pub filter: SpendingFilter,
    pub slices: Vec<BreakdownSlice>,
    pub total: f64,
}

fn belongs_to(record: &BudgetRecord, registry: &UnitRegistry, unit: &AdministrativeUnit) -> bool {
    registry
        .resolve(&record.administrative_unit_label)
        .map_or(false, |resolved| resolved.id == unit.id)
}

pub fn unit_breakdown<'r, I>(
    records: I,
    registry: &UnitRegistry,
    unit: &AdministrativeUnit,
    filter: SpendingFilter,
) -> UnitBreakdown
where
    I: IntoIterator<Item = &'r BudgetRecord>,
{
    let slices: Vec<BreakdownSlice> = records
        .into_iter()
        .filter(|record| record.is_top_level() && belongs_to(record, registry, unit))
        .map(|record| BreakdownSlice {
            id: record.id.clone(),
            label: record.name.clone(),
            amount: split_for_filter(record, filter),
        })
        .collect();

    let total = slices.iter().map(|slice| slice.amount).sum();

    UnitBreakdown {
        unit: unit.name.clone(),
        filter,
        slices,
        total,
    }
}

// ============================================================================
// RANKINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord {
    pub id: String,
    pub label: String,
    pub per_capita: f64,
}

/// Ranked records plus the diagnostics raised while computing them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerCapitaRanking {
    pub records: Vec<RankedRecord>,
    pub warnings: Vec<EngineWarning>,
}

/// Top-level records of `unit` by inflation-adjusted per-capita expense, highest first
pub fn rank_per_capita<'r, I>(
    records: I,
    registry: &UnitRegistry,
    unit: &AdministrativeUnit,
    cpi: &CpiIndex,
    base_year: i32,
) -> PerCapitaRanking
where
    I: IntoIterator<Item = &'r BudgetRecord>,
{
    let mut ranking = PerCapitaRanking::default();

    for record in records {
        if !record.is_top_level() || !belongs_to(record, registry, unit) {
            continue;
        }

        let computed = adjusted_per_capita_with_warnings(record, unit, cpi, base_year);
        for warning in computed.warnings {
            push_unique(&mut ranking.warnings, warning);
        }
        ranking.records.push(RankedRecord {
            id: record.id.clone(),
            label: record.name.clone(),
            per_capita: computed.value,
        });
    }

    // sort_by is stable: ties keep record order
    ranking.records.sort_by(|a, b| b.per_capita.total_cmp(&a.per_capita));
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedUnit {
    pub unit_id: String,
    pub label: String,
    pub value: f64,
}

/// Units by tree value, highest first; data-quality-suspect units are left out
pub fn rank_units(tree: &AggregationTree) -> Vec<RankedUnit> {
    let mut ranked: Vec<RankedUnit> = tree
        .nodes
        .iter()
        .filter(|node| !tree.is_suspect(&node.label))
        .map(|node| RankedUnit {
            unit_id: node.unit_id.clone(),
            label: node.label.clone(),
            value: node.value,
        })
        .collect();

    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked
}

// ============================================================================
// FUNDING SOURCES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingSourceCount {
    pub source: String,
    pub count: usize,
}

/// How many top-level records name each funding source, most common first
pub fn funding_source_counts<'r, I>(records: I) -> Vec<FundingSourceCount>
where
    I: IntoIterator<Item = &'r BudgetRecord>,
{
    let mut counts: Vec<FundingSourceCount> = Vec::new();

    for record in records.into_iter().filter(|r| r.is_top_level()) {
        let mut seen_in_record: Vec<&str> = Vec::new();

        for source in &record.funding_sources {
            if seen_in_record.contains(&source.as_str()) {
                continue;
            }
            seen_in_record.push(source);

            match counts.iter_mut().find(|c| &c.source == source) {
                Some(existing) => existing.count += 1,
                None => counts.push(FundingSourceCount {
                    source: source.clone(),
                    count: 1,
                }),
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

// ============================================================================
// TESTS
// ============================================================================
