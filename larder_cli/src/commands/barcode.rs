use crate::cli::Cli;
use crate::commands::{load_config, spinner, Result};
use crate::output::{format_output, OutputData};
use larder_core::FoodAggregator;

pub async fn run(cli: &Cli, code: &str) -> Result<()> {
    let config = load_config(cli)?;
    let aggregator = FoodAggregator::from_config(&config);

    let spinner = spinner(cli, format!("Looking up {}...", code.trim()));
    let report = aggregator.search_by_barcode_detailed(code).await;
    spinner.finish_and_clear();

    format_output(&OutputData::Barcode(report?), cli.format())
}
