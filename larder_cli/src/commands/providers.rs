use crate::cli::{Cli, OutputFormat};
use crate::commands::{load_config, Result};
use crate::output::{format_output, OutputData};
use larder_core::{FoodAggregator, FoodSource};
use owo_colors::OwoColorize;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let aggregator = FoodAggregator::from_config(&config);
    let providers = aggregator.providers();

    if providers.is_empty() {
        println!("{}", "No providers enabled".yellow());
        return Ok(());
    }

    let format = cli.format();
    if format == OutputFormat::Pretty {
        println!("{}", "Food Providers".bold().cyan());
        println!();
    }
    format_output(&OutputData::ProviderList(providers.clone()), format)?;

    if format == OutputFormat::Pretty {
        let missing: Vec<&str> = FoodSource::ALL
            .iter()
            .filter(|s| !providers.iter().any(|p| p.source == **s))
            .map(|s| s.as_str())
            .collect();
        if !missing.is_empty() {
            println!(
                "{} {} (disabled or missing credentials; see {})",
                "Inactive:".dimmed(),
                missing.join(", "),
                "larder config show".cyan()
            );
        }
        println!();
        println!(
            "{} Run {} to search them all.",
            "Tip:".yellow().bold(),
            "larder search \"<food>\"".cyan()
        );
    }
    Ok(())
}
