use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "larder_cli=info,larder_core=warn",
        1 => "larder_cli=debug,larder_core=debug",
        _ => "larder_cli=trace,larder_core=trace",
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(cli.verbose).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        None => show_overview(&cli),
        Some(Commands::Search { query, detailed }) => search::run(&cli, query, *detailed).await,
        Some(Commands::Barcode { code }) => barcode::run(&cli, code).await,
        Some(Commands::Providers) => providers::run(&cli).await,
        Some(Commands::Config { action }) => config::run(&cli, action.clone()),
        Some(Commands::Fitness { action }) => fitness::run(&cli, action.clone()).await,
        Some(Commands::Serve { bind }) => serve::run(&cli, bind).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}

fn show_overview(cli: &Cli) -> commands::Result<()> {
    let config = load_config(cli)?;
    let enabled = config.priority.as_slice().len();

    println!();
    println!(
        "{}  {}",
        "Larder".bold().cyan(),
        "- Federated food search".dimmed()
    );
    println!();
    println!(
        "  {} sources in priority order: {}",
        enabled.to_string().green().bold(),
        config
            .priority
            .as_slice()
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!();
    println!("{}", "Quick Start:".bold().cyan());
    println!(
        "  {}{}",
        "larder search \"oat milk\"".cyan(),
        "      Search every enabled provider".dimmed()
    );
    println!(
        "  {}{}",
        "larder barcode <digits>".cyan(),
        "      Look up a packaged product".dimmed()
    );
    println!(
        "  {}{}",
        "larder providers".cyan(),
        "             Show which providers are active".dimmed()
    );
    println!();
    println!(
        "Run {} for all commands.",
        "larder --help".cyan()
    );
    Ok(())
}
