use crate::cli::Cli;
use crate::commands::{load_config, spinner, Result};
use crate::output::{format_output, OutputData};
use larder_core::FoodAggregator;
use tracing::debug;

pub async fn run(cli: &Cli, query: &str, detailed: bool) -> Result<()> {
    let config = load_config(cli)?;
    let aggregator = FoodAggregator::from_config(&config);

    let spinner = spinner(cli, format!("Searching for '{}'...", query.trim()));
    let report = aggregator.search_by_name_detailed(query).await;
    spinner.finish_and_clear();
    let report = report?;

    debug!(
        records = report.records.len(),
        failures = report.failures.len(),
        cached = report.cached,
        "search finished"
    );

    let data = if detailed {
        OutputData::SearchReport(report)
    } else {
        OutputData::Foods {
            query: report.query,
            records: report.records,
        }
    };
    format_output(&data, cli.format())
}
