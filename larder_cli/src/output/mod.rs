use crate::cli::OutputFormat;
use crate::commands::Result;
use larder_core::{BarcodeReport, FoodRecord, ProviderInfo, SearchReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod pretty;
pub use pretty::{
    format_barcode_footer, format_food_card, format_food_table, format_pretty,
    format_provider_table, format_search_footer, format_section_header, format_serving,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    Foods {
        query: String,
        records: Vec<FoodRecord>,
    },
    SearchReport(SearchReport),
    Barcode(BarcodeReport),
    ProviderList(Vec<ProviderInfo>),
    FitnessResult {
        command: String,
        result: Value,
    },
    ConfigInfo(Value),
}

pub fn format_output(data: &OutputData, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Text => {
            print!("{}", format_text_output(data)?);
        }
        OutputFormat::Pretty => {
            print!("{}", format_pretty_output(data));
        }
    }
    Ok(())
}

fn text_record(record: &FoodRecord) -> String {
    let brand = record
        .brand
        .as_deref()
        .map(|b| format!(" ({})", b))
        .unwrap_or_default();
    format!(
        "{}{} [{}:{}] {} per {}: {} kcal, P {}g, C {}g, F {}g\n",
        record.name,
        brand,
        record.source,
        record.source_id,
        record.barcode.as_deref().unwrap_or("-"),
        format_serving(record),
        record.calories,
        record.protein_g,
        record.carbs_g,
        record.fat_g
    )
}

fn format_text_output(data: &OutputData) -> Result<String> {
    let mut out = String::new();
    match data {
        OutputData::Foods { query, records } => {
            out.push_str(&format!("{} results for '{}':\n", records.len(), query));
            for record in records {
                out.push_str(&text_record(record));
            }
        }
        OutputData::SearchReport(report) => {
            out.push_str(&format!(
                "{} results for '{}'{}:\n",
                report.records.len(),
                report.query,
                if report.cached { " (cached)" } else { "" }
            ));
            for record in &report.records {
                out.push_str(&text_record(record));
            }
            for failure in &report.failures {
                out.push_str(&format!(
                    "failed: {} {}: {}\n",
                    failure.source, failure.code, failure.error
                ));
            }
        }
        OutputData::Barcode(report) => match &report.record {
            Some(record) => out.push_str(&text_record(record)),
            None => out.push_str(&format!("No product found for {}\n", report.barcode)),
        },
        OutputData::ProviderList(providers) => {
            for info in providers {
                out.push_str(&format!(
                    "{}. {}: {} ({}ms)\n",
                    info.priority + 1,
                    info.source,
                    info.description,
                    info.timeout_ms
                ));
            }
        }
        OutputData::FitnessResult { command, result } => {
            out.push_str(&format!("{}:\n", command));
            out.push_str(&serde_json::to_string_pretty(result)?);
            out.push('\n');
        }
        OutputData::ConfigInfo(config) => {
            out.push_str(&serde_yaml::to_string(config)?);
        }
    }
    Ok(out)
}

fn format_pretty_output(data: &OutputData) -> String {
    let mut out = String::new();
    match data {
        OutputData::Foods { query, records } => {
            out.push_str(&format_section_header(query, Some(records.len())));
            out.push('\n');
            out.push_str(&format_food_table(records));
        }
        OutputData::SearchReport(report) => {
            out.push_str(&format_section_header(&report.query, Some(report.records.len())));
            out.push('\n');
            out.push_str(&format_food_table(&report.records));
            out.push_str(&format_search_footer(report));
        }
        OutputData::Barcode(report) => {
            match &report.record {
                Some(record) => out.push_str(&format_food_card(record)),
                None => out.push_str(&format!("No product found for {}\n", report.barcode)),
            }
            out.push_str(&format_barcode_footer(report));
        }
        OutputData::ProviderList(providers) => {
            out.push_str(&format_provider_table(providers));
        }
        OutputData::FitnessResult { command, result } => {
            out.push_str(&format_section_header(command, None));
            out.push('\n');
            out.push_str(&format_pretty(result));
        }
        OutputData::ConfigInfo(config) => {
            out.push_str(&format_pretty(config));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::{FoodSource, Macros};

    #[test]
    fn test_json_shape_is_tagged() {
        let data = OutputData::Foods {
            query: "apple".to_string(),
            records: vec![],
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["type"], "Foods");
        assert_eq!(value["data"]["query"], "apple");
    }

    #[test]
    fn test_text_output_lists_records() {
        let record = FoodRecord::new(FoodSource::Local, "apple-1", "Apple")
            .with_macros(Macros::new(52.0, 0.3, 14.0, 0.2));
        let text = format_text_output(&OutputData::Foods {
            query: "apple".to_string(),
            records: vec![record],
        })
        .unwrap();
        assert!(text.starts_with("1 results for 'apple'"));
        assert!(text.contains("Apple [local:apple-1]"));
        assert!(text.contains("52 kcal"));
    }

    #[test]
    fn test_text_barcode_miss() {
        let text =
            format_text_output(&OutputData::Barcode(BarcodeReport::new("3017620422003"))).unwrap();
        assert_eq!(text, "No product found for 3017620422003\n");
    }
}
