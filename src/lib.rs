// Budget Explorer - Budget Aggregation & Classification Engine
// Exposes the engine for the CLI and for embedding in other front ends

pub mod budget;         // Data model: records, classification, spending filter
pub mod entities;       // Administrative units + registry resolver
pub mod inflation;      // CPI index + inflation normalizer
pub mod classification; // Capital/operating/debt splitter
pub mod per_capita;     // Per-capita calculator
pub mod aggregation;    // Unit -> department tree + flat views
pub mod merge;          // Source document merge + dataset arena
pub mod data_quality;   // Dataset diagnostics
pub mod engine;         // Configured facade
pub mod error;
pub mod config;
pub mod loader;
pub mod format;

// Re-export commonly used types
pub use budget::{
    BudgetDocument, BudgetMetric, BudgetRecord, Classification, ClassificationEntry,
    MetricValue, Reference, SpendingFilter,
};
pub use entities::{
    resolve, AdministrativeUnit, AdministrativeUnitsData, NotFound, UnitRegistry, UnitType,
};
pub use inflation::{adjust, adjust_with_warning, Adjusted, CpiData, CpiDataPoint, CpiIndex};
pub use classification::{filtered_total, record_matches_filter, split_for_filter};
pub use per_capita::{
    adjusted_per_capita, adjusted_per_capita_with_warnings, per_capita, per_capita_with_warnings,
    PerCapita,
};
pub use aggregation::{
    build_adjusted_tree, build_tree, build_tree_with_report, funding_source_counts,
    rank_per_capita, rank_units, unit_breakdown, AggregationLeaf, AggregationNode,
    AggregationTree, BreakdownSlice, FundingSourceCount, PerCapitaRanking, RankedRecord, RankedUnit, UnitBreakdown,
};
pub use merge::{merge, merge_at, merge_documents, parse_document, BudgetDataset};
pub use data_quality::{DataQualityEngine, QualityIssue, QualityReport, Severity};
pub use engine::BudgetEngine;
pub use error::{BudgetError, EngineWarning};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
