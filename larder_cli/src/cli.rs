use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Larder - Federated food search across nutrition databases")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  larder search \"greek yogurt\"           Search every enabled provider
  larder barcode 3017620422003           Look up a product by barcode
  larder providers                       Show enabled providers in priority order

\x1b[1;36mConfiguration:\x1b[0m
  larder config init                     Write a default config file
  larder config show                     View the effective configuration

\x1b[1;36mMore Info:\x1b[0m
  larder <command> --help                Get help for any command")]
#[command(long_about = "
\x1b[1mLarder\x1b[0m - Federated food search

Queries several nutrition databases concurrently and merges the results:
  • Local catalog (YAML file of curated foods)
  • USDA FoodData Central
  • Open Food Facts
  • Nutritionix (needs app id and key)

Results are normalized, cached and deduplicated, preferring the
highest-priority source when two records describe the same food.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file (defaults to ~/.config/larder/config.yaml)
    #[arg(long, global = true, env = "LARDER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The effective output format; `--no-color` turns pretty output into
    /// plain text.
    pub fn format(&self) -> OutputFormat {
        match self.output {
            OutputFormat::Pretty if self.no_color => OutputFormat::Text,
            other => other,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search foods by name across every enabled provider
    ///
    /// Results from all providers are merged and deduplicated. A provider that
    /// fails or times out only shrinks the result set.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  larder search apple                    Deduplicated results
  larder search \"peanut butter\" --detailed
                                         Include per-provider status
  larder search oats --output json       Output as JSON")]
    Search {
        /// Free-text query
        query: String,

        /// Show the per-provider report alongside the records
        #[arg(long, short)]
        detailed: bool,
    },

    /// Look up a packaged product by barcode (EAN-8, UPC-A, EAN-13, GTIN-14)
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  larder barcode 3017620422003
  larder barcode 036000291452 --output yaml")]
    Barcode {
        /// Barcode digits
        code: String,
    },

    /// List enabled providers in priority order
    #[command(alias = "ls")]
    Providers,

    /// Manage the configuration file
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  larder config path                     Print the config file location
  larder config init                     Write defaults (won't overwrite)
  larder config show --output yaml       Effective configuration")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Query the fitness-data script
    ///
    /// The password is read from LARDER_FITNESS_PASSWORD, or prompted for.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  larder fitness summary --username me@example.com --date 2024-05-01
  larder fitness activities --username me@example.com --start 2024-05-01 --end 2024-05-07
  larder fitness test --username me@example.com")]
    Fitness {
        #[command(subcommand)]
        action: FitnessAction,
    },

    /// Serve the food search endpoints over HTTP
    #[command(after_help = "\x1b[1;33mEndpoints:\x1b[0m
  GET /foods/search?query=<text>         JSON array of records
  GET /foods/barcode/<code>              Single record, 404 when unknown")]
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum FitnessAction {
    /// Daily activity totals for one day, or a range with --start/--end
    Summary {
        #[arg(long, short)]
        username: String,
        /// Day to summarize (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
        /// First day of a range (YYYY-MM-DD)
        #[arg(long, conflicts_with = "date")]
        start: Option<String>,
        /// Last day of a range (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Recorded activities between two dates
    Activities {
        #[arg(long, short)]
        username: String,
        /// First day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        start: Option<String>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
    /// Account profile
    Profile {
        #[arg(long, short)]
        username: String,
    },
    /// Check that the credentials work
    Test {
        #[arg(long, short)]
        username: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Plain text
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from(["larder", "search", "greek yogurt", "--detailed"]);
        match cli.command {
            Some(Commands::Search { ref query, detailed }) => {
                assert_eq!(query, "greek yogurt");
                assert!(detailed);
            }
            _ => panic!("expected search"),
        }
        assert_eq!(cli.format(), OutputFormat::Pretty);
    }

    #[test]
    fn test_no_color_downgrades_pretty() {
        let cli = Cli::parse_from(["larder", "--no-color", "providers"]);
        assert_eq!(cli.format(), OutputFormat::Text);

        let cli = Cli::parse_from(["larder", "--no-color", "--output", "json", "providers"]);
        assert_eq!(cli.format(), OutputFormat::Json);
    }

    #[test]
    fn test_summary_range_conflicts_with_date() {
        let parsed = Cli::try_parse_from([
            "larder", "fitness", "summary", "-u", "me", "--date", "2024-05-01", "--start",
            "2024-05-01",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_serve_default_bind() {
        let cli = Cli::parse_from(["larder", "serve"]);
        match cli.command {
            Some(Commands::Serve { bind }) => assert_eq!(bind, "127.0.0.1:8080"),
            _ => panic!("expected serve"),
        }
    }
}
