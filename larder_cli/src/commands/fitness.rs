use crate::cli::{Cli, FitnessAction};
use crate::commands::{load_config, spinner, CommandError, Result};
use crate::output::{format_output, OutputData};
use chrono::NaiveDate;
use larder_core::fitness::{FitnessCredentials, SubprocessFitnessClient};

const PASSWORD_ENV: &str = "LARDER_FITNESS_PASSWORD";

pub async fn run(cli: &Cli, action: FitnessAction) -> Result<()> {
    let config = load_config(cli)?;
    let client = SubprocessFitnessClient::new(&config.fitness);

    let (command, result) = match action {
        FitnessAction::Summary {
            username,
            date,
            start,
            end,
        } => {
            let credentials = credentials(username)?;
            let spinner = spinner(cli, "Fetching daily summary...".to_string());
            let result = match start {
                Some(start) => {
                    let start = parse_date(&start)?;
                    let end = end.as_deref().map(parse_date).transpose()?;
                    client
                        .daily_summaries(&credentials, start, end)
                        .await
                        .map(|days| serde_json::to_value(days))
                }
                None => {
                    let date = match date.as_deref() {
                        Some(d) => parse_date(d)?,
                        None => today(),
                    };
                    client
                        .daily_summary(&credentials, date)
                        .await
                        .map(|day| serde_json::to_value(day))
                }
            };
            spinner.finish_and_clear();
            ("daily_summary", result??)
        }
        FitnessAction::Activities {
            username,
            start,
            end,
        } => {
            let credentials = credentials(username)?;
            let start = match start.as_deref() {
                Some(s) => parse_date(s)?,
                None => today(),
            };
            let end = end.as_deref().map(parse_date).transpose()?;
            let spinner = spinner(cli, "Fetching activities...".to_string());
            let result = client.activities(&credentials, start, end).await;
            spinner.finish_and_clear();
            ("activities", serde_json::to_value(result?)?)
        }
        FitnessAction::Profile { username } => {
            let credentials = credentials(username)?;
            let spinner = spinner(cli, "Fetching profile...".to_string());
            let result = client.profile(&credentials).await;
            spinner.finish_and_clear();
            ("profile", result?)
        }
        FitnessAction::Test { username } => {
            let credentials = credentials(username)?;
            let spinner = spinner(cli, "Testing connection...".to_string());
            let result = client.test_connection(&credentials).await;
            spinner.finish_and_clear();
            let status = result?;
            if !status.success {
                return Err(CommandError::InvalidInput(
                    status
                        .error
                        .or(status.message)
                        .unwrap_or_else(|| "connection test failed".to_string()),
                ));
            }
            ("test", serde_json::to_value(status)?)
        }
    };

    let data = OutputData::FitnessResult {
        command: command.to_string(),
        result,
    };
    format_output(&data, cli.format())
}

/// Password from the environment, or an interactive prompt.
fn credentials(username: String) -> Result<FitnessCredentials> {
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password(format!("Password for {}: ", username))?,
    };
    Ok(FitnessCredentials::new(username, password))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CommandError::InvalidInput(format!("'{}' is not a YYYY-MM-DD date", s)))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-05-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert!(matches!(
            parse_date("05/01/2024"),
            Err(CommandError::InvalidInput(_))
        ));
    }
}
