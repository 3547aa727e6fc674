// 🖥️ Budget Explorer CLI - load documents, merge, print per-capita summaries
//
// Commands: summary (default), breakdown <unit>, funding, quality.

use anyhow::{anyhow, Result};
use std::env;

use budget_explorer::format::{format_dollar_amount, format_per_capita_amount};
use budget_explorer::{loader, merge, AppConfig, BudgetDataset, BudgetEngine, SpendingFilter};

const USAGE: &str = "usage: budget-explorer [summary|breakdown <unit>|funding|quality] [--filter all|capital|operating|debt] [--adjusted]";

struct Args {
    command: String,
    unit: Option<String>,
    filter: SpendingFilter,
    adjusted: bool,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut filter = SpendingFilter::All;
    let mut adjusted = false;

    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--filter" => {
                let value = iter.next().ok_or_else(|| anyhow!("--filter needs a value\n{}", USAGE))?;
                filter = value.parse().map_err(|e: String| anyhow!(e))?;
            }
            "--adjusted" => adjusted = true,
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    Ok(Args {
        command: positional.next().unwrap_or_else(|| "summary".to_string()),
        unit: positional.next(),
        filter,
        adjusted,
    })
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&raw)?;

    let config = AppConfig::load()?;
    let (engine, dataset) = load(&config)?;

    match args.command.as_str() {
        "summary" => run_summary(&engine, &dataset, &args),
        "breakdown" => {
            let unit = args
                .unit
                .as_deref()
                .ok_or_else(|| anyhow!("breakdown needs a unit name\n{}", USAGE))?;
            run_breakdown(&engine, &dataset, unit, args.filter)
        }
        "funding" => {
            run_funding(&engine, &dataset);
            Ok(())
        }
        "quality" => {
            run_quality(&engine, &dataset);
            Ok(())
        }
        other => Err(anyhow!("unknown command '{}'\n{}", other, USAGE)),
    }
}

fn load(config: &AppConfig) -> Result<(BudgetEngine, BudgetDataset)> {
    let documents = loader::load_budget_documents(&config.data.budgets_dir)?;
    let overlay = loader::load_overlay(config.data.classification_overlay.as_deref())?;
    let cpi = loader::load_cpi(&config.data.cpi)?;

    let mut registry = loader::load_units(&config.data.administrative_units)?;
    for (label, unit_name) in &config.engine.aliases {
        registry = registry.with_alias(label, unit_name);
    }

    let mut engine = BudgetEngine::new(registry, cpi);
    if let Some(base_year) = config.engine.base_year {
        engine = engine.with_base_year(base_year);
    }

    let dataset = merge(&documents, &overlay)?;
    Ok((engine, dataset))
}

fn run_summary(engine: &BudgetEngine, dataset: &BudgetDataset, args: &Args) -> Result<()> {
    let tree = if args.adjusted {
        engine.adjusted_tree(dataset, args.filter)
    } else {
        engine.tree(dataset, args.filter)
    };

    println!(
        "Fiscal Year {} - {} ({} records)",
        dataset.fiscal_year,
        args.filter.label(),
        dataset.len()
    );
    if args.adjusted {
        println!("Per capita, {} dollars", engine.base_year());
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for node in &tree.nodes {
        let flag = if tree.is_suspect(&node.label) { "  ⚠ invalid population" } else { "" };
        println!("{:<40} {:>12}{}", node.label, format_per_capita_amount(node.value, 2), flag);
        for leaf in &node.child_nodes {
            println!("    {:<36} {:>12}", leaf.label, format_per_capita_amount(leaf.value, 2));
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Per Capita Spending: {}", format_per_capita_amount(tree.total(), 2));

    if tree.unmatched_records > 0 {
        println!("{} records matched no administrative unit", tree.unmatched_records);
    }

    Ok(())
}

fn run_breakdown(engine: &BudgetEngine, dataset: &BudgetDataset, unit: &str, filter: SpendingFilter) -> Result<()> {
    let breakdown = engine
        .breakdown(dataset, unit, filter)
        .ok_or_else(|| anyhow!("no administrative unit matches '{}'", unit))?;

    println!("{} - {}", breakdown.unit, filter.label());
    println!("Total Spending: {}", format_dollar_amount(breakdown.total, 1));
    for slice in &breakdown.slices {
        println!("    {:<36} {:>10}", slice.label, format_dollar_amount(slice.amount, 1));
    }

    if let Some(ranking) = engine.ranking(dataset, unit) {
        println!("\nPer capita ({} dollars)", engine.base_year());
        for (position, record) in ranking.records.iter().enumerate() {
            println!(
                "{:>3}. {:<34} {:>10}",
                position + 1,
                record.label,
                format_per_capita_amount(record.per_capita, 2)
            );
        }
    }

    Ok(())
}

fn run_funding(engine: &BudgetEngine, dataset: &BudgetDataset) {
    println!("Funding sources (top-level departments)");
    for source in engine.funding_sources(dataset) {
        println!("    {:<36} {:>4}", source.source, source.count);
    }
}

fn run_quality(engine: &BudgetEngine, dataset: &BudgetDataset) {
    let report = engine.quality_report(dataset);

    println!("{}", report.summary());
    for issue in &report.issues {
        println!("  [{:?}] {} {}: {}", issue.severity, issue.subject, issue.field, issue.issue);
    }
}
