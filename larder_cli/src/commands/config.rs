use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::{config_store, load_config, CommandError, Result};
use crate::output::{format_output, OutputData};
use larder_core::LarderConfig;
use owo_colors::OwoColorize;
use serde_json::Value;

/// Keys whose values never leave the process in `config show`.
const SECRET_KEYS: &[&str] = &["api_key", "app_id", "app_key", "password"];

pub fn run(cli: &Cli, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => {
            println!("{}", config_store(cli).path().display());
            Ok(())
        }
        ConfigAction::Init { force } => init_config(cli, force),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let store = config_store(cli);
    let config = load_config(cli)?;
    let mut value = serde_json::to_value(&config)?;
    redact(&mut value);

    if cli.format() == OutputFormat::Pretty {
        println!();
        println!("{}", "Effective Configuration".bold().cyan());
        println!("{}", "=======================".cyan());
        println!();
        let state = if store.path().exists() {
            "".to_string()
        } else {
            format!(" {}", "(not found, using defaults)".yellow())
        };
        println!("Config file: {}{}", store.path().display().dimmed(), state);
        println!();
    }
    format_output(&OutputData::ConfigInfo(value), cli.format())
}

fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let store = config_store(cli);
    if store.path().exists() && !force {
        return Err(CommandError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        )));
    }
    store.save(&LarderConfig::default())?;
    println!(
        "{} Wrote default configuration to {}",
        "✓".green(),
        store.path().display()
    );
    Ok(())
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if SECRET_KEYS.contains(&key.as_str()) && !v.is_null() {
                    *v = Value::String("********".to_string());
                } else {
                    redact(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_nested_secrets() {
        let mut value = json!({
            "providers": {
                "usda": {"api_key": "abc", "page_size": 25},
                "nutritionix": {"app_id": "id", "app_key": null}
            }
        });
        redact(&mut value);
        assert_eq!(value["providers"]["usda"]["api_key"], "********");
        assert_eq!(value["providers"]["usda"]["page_size"], 25);
        assert_eq!(value["providers"]["nutritionix"]["app_id"], "********");
        assert!(value["providers"]["nutritionix"]["app_key"].is_null());
    }
}
