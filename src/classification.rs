// 🏷️ Classification Splitter - share of a record attributable to a filter
//
// Rules, first match wins:
//   1. filter = all                          -> total_expense
//   2. classification = filter               -> total_expense
//   3. capital vs operating (opposing tags)  -> 0
//   4. filter = debt, tag != debt            -> 0
//   5. mixed + capital/operating             -> total_expense * side / (capital + operating)
//   6. anything else                         -> 0
//
// The aggregator sums this function's output, it never re-derives a split.

use crate::budget::{BudgetRecord, Classification, SpendingFilter};

// ============================================================================
// SPLITTER
// ============================================================================

/// Dollar amount of `record.total_expense` attributable to `filter`
pub fn split_for_filter(record: &BudgetRecord, filter: SpendingFilter) -> f64 {
    use Classification as C;
    use SpendingFilter as F;

    match (filter, record.classification) {
        (F::All, _) => record.total_expense,

        (F::Capital, C::Capital) | (F::Operating, C::Operating) | (F::Debt, C::Debt) => {
            record.total_expense
        }

        (F::Capital, C::Operating) | (F::Operating, C::Capital) => 0.0,

        (F::Debt, C::Capital | C::Operating | C::Mixed | C::Unclassified) => 0.0,

        (F::Capital, C::Mixed) => mixed_share(record, record.capital_expense),
        (F::Operating, C::Mixed) => mixed_share(record, record.operating_expense),

        (F::Capital | F::Operating, C::Debt | C::Unclassified) => 0.0,
    }
}

/// Sub-amounts only give the proportion; they need not sum to the total
fn mixed_share(record: &BudgetRecord, side: Option<f64>) -> f64 {
    let total = record.capital_expense.unwrap_or(0.0) + record.operating_expense.unwrap_or(0.0);

    if total > 0.0 {
        record.total_expense * (side.unwrap_or(0.0) / total)
    } else {
        0.0
    }
}

/// Whether a flat listing under `filter` should show this record.
///
/// Mixed records appear under capital/operating only when they carry a
/// positive sub-amount for that side; debt is a direct tag match.
pub fn record_matches_filter(record: &BudgetRecord, filter: SpendingFilter) -> bool {
    use Classification as C;
    use SpendingFilter as F;

    match (filter, record.classification) {
        (F::All, _) => true,
        (F::Capital, C::Capital) | (F::Operating, C::Operating) | (F::Debt, C::Debt) => true,
        (F::Capital, C::Mixed) => record.capital_expense.map_or(false, |c| c > 0.0),
        (F::Operating, C::Mixed) => record.operating_expense.map_or(false, |o| o > 0.0),
        _ => false,
    }
}

/// Sum of filtered amounts over `records`
pub fn filtered_total<'a, I>(records: I, filter: SpendingFilter) -> f64
where
    I: IntoIterator<Item = &'a BudgetRecord>,
{
    records
        .into_iter()
        .map(|record| split_for_filter(record, filter))
        .sum()
}

// ============================================================================
// TESTS
// ============================================================================
