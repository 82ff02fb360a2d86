//! Pretty formatter for terminal output.
//!
//! Food records render as a table, one row per record, with the source
//! colored so mixed-provider results are easy to scan. Anything without a
//! dedicated layout (fitness payloads, config) falls back to a generic
//! key/value view of its JSON.

use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, presets::UTF8_FULL_CONDENSED, Cell,
    ContentArrangement, Table,
};
use larder_core::{BarcodeReport, FoodRecord, FoodSource, ProviderFailure, ProviderInfo, SearchReport};
use owo_colors::OwoColorize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

/// Rows shown before the table is cut off
const MAX_ROWS: usize = 50;

/// Keys to show as primary (title-like)
const TITLE_KEYS: &[&str] = &["name", "displayName", "fullName", "activityName", "date"];

// ============================================================================
// Food records
// ============================================================================

/// Records as a table, in the order given.
pub fn format_food_table(records: &[FoodRecord]) -> String {
    if records.is_empty() {
        return format!("{}\n", "No foods found.".yellow());
    }

    let width = terminal_width();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width as u16)
        .set_header(vec![
            "#", "Name", "Brand", "Serving", "kcal", "Protein", "Carbs", "Fat", "Source",
        ]);

    for (i, record) in records.iter().take(MAX_ROWS).enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate_str(&record.name, 40)),
            Cell::new(record.brand.as_deref().map(|b| truncate_str(b, 24)).unwrap_or_default()),
            Cell::new(format_serving(record)),
            Cell::new(format_amount(record.calories)),
            Cell::new(format!("{}g", format_amount(record.protein_g))),
            Cell::new(format!("{}g", format_amount(record.carbs_g))),
            Cell::new(format!("{}g", format_amount(record.fat_g))),
            Cell::new(paint_source(record.source)),
        ]);
    }

    let mut output = table.to_string();
    output.push('\n');
    if records.len() > MAX_ROWS {
        output.push_str(
            &format!("... and {} more\n", records.len() - MAX_ROWS)
                .dimmed()
                .to_string(),
        );
    }
    output
}

/// A single record with every field, for barcode hits.
pub fn format_food_card(record: &FoodRecord) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}\n", record.name.bold()));
    if let Some(brand) = &record.brand {
        output.push_str(&format!("  {}: {}\n", "brand".dimmed(), brand));
    }
    if let Some(barcode) = &record.barcode {
        output.push_str(&format!("  {}: {}\n", "barcode".dimmed(), barcode));
    }
    output.push_str(&format!(
        "  {}: {}\n",
        "serving".dimmed(),
        format_serving(record)
    ));
    output.push('\n');
    output.push_str(&format!(
        "  {} kcal  {} {}g  {} {}g  {} {}g\n",
        format_amount(record.calories).yellow().bold(),
        "protein".dimmed(),
        format_amount(record.protein_g),
        "carbs".dimmed(),
        format_amount(record.carbs_g),
        "fat".dimmed(),
        format_amount(record.fat_g),
    ));
    if let Some(per_100) = record.per_100() {
        if record.serving_size != 100.0 {
            output.push_str(&format!(
                "  {}\n",
                format!(
                    "per 100{}: {} kcal, {}g protein, {}g carbs, {}g fat",
                    record.serving_unit,
                    format_amount(per_100.calories),
                    format_amount(per_100.protein_g),
                    format_amount(per_100.carbs_g),
                    format_amount(per_100.fat_g),
                )
                .dimmed()
            ));
        }
    }
    output.push('\n');
    output.push_str(&format!(
        "  {} {} {}\n",
        "source".dimmed(),
        paint_source(record.source),
        record.source_id.dimmed()
    ));
    output
}

/// Status line under a search: which providers answered, which failed.
pub fn format_search_footer(report: &SearchReport) -> String {
    let mut output = String::new();
    if report.cached {
        output.push_str(&format!("{}\n", "Served from cache".dimmed()));
    } else {
        let sources: Vec<String> = report
            .completed
            .iter()
            .map(|s| s.as_str().green().to_string())
            .collect();
        output.push_str(&format!(
            "{} {}",
            "Answered:".dimmed(),
            if sources.is_empty() {
                "none".red().to_string()
            } else {
                sources.join(", ")
            }
        ));
        if let Some(ms) = report.duration_ms {
            output.push_str(&format!(" {}", format!("({}ms)", ms).dimmed()));
        }
        output.push('\n');
    }
    if report.dropped > 0 {
        output.push_str(&format!(
            "{}\n",
            format!("{} invalid records discarded", report.dropped).dimmed()
        ));
    }
    output.push_str(&format_failures(&report.failures));
    output
}

pub fn format_barcode_footer(report: &BarcodeReport) -> String {
    let mut output = String::new();
    if report.cached {
        output.push_str(&format!("{}\n", "Served from cache".dimmed()));
    } else if !report.attempted.is_empty() {
        let tried: Vec<&str> = report.attempted.iter().map(|s| s.as_str()).collect();
        output.push_str(&format!("{} {}\n", "Tried:".dimmed(), tried.join(" > ")));
    }
    output.push_str(&format_failures(&report.failures));
    output
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    let mut output = String::new();
    for failure in failures {
        let label = if failure.is_timeout {
            "timed out".yellow().to_string()
        } else {
            failure.code.red().to_string()
        };
        output.push_str(&format!(
            "  {} {} {}: {}\n",
            "!".red().bold(),
            failure.source.as_str().bold(),
            label,
            truncate_str(&failure.error, 80).dimmed()
        ));
    }
    output
}

// ============================================================================
// Providers
// ============================================================================

pub fn format_provider_table(providers: &[ProviderInfo]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(terminal_width() as u16)
        .set_header(vec!["Priority", "Source", "Timeout", "Description"]);

    for info in providers {
        table.add_row(vec![
            Cell::new(info.priority + 1),
            Cell::new(paint_source(info.source)),
            Cell::new(format!("{}ms", info.timeout_ms)),
            Cell::new(&info.description),
        ]);
    }

    format!("{}\n", table)
}

// ============================================================================
// Generic JSON
// ============================================================================

/// Format any JSON value as readable key/value output.
pub fn format_pretty(value: &Value) -> String {
    let mut output = String::new();
    format_value(value, &mut output, 0);
    output
}

fn format_value(value: &Value, output: &mut String, depth: usize) {
    match value {
        Value::Array(arr) if arr.iter().any(|v| v.is_object()) => {
            output.push_str(&format_as_table(arr));
        }
        Value::Array(arr) => {
            for item in arr {
                output.push_str(&format!("  {} {}\n", "•".dimmed(), format_scalar(item)));
            }
        }
        Value::Object(obj) => format_object_hierarchical(obj, output, depth),
        _ => {
            output.push_str(&format_scalar(value));
            output.push('\n');
        }
    }
}

fn format_object_hierarchical(
    obj: &serde_json::Map<String, Value>,
    output: &mut String,
    depth: usize,
) {
    let indent = "  ".repeat(depth);

    for (key, value) in obj.iter().filter(|(_, v)| !v.is_array() && !v.is_object()) {
        let formatted_key = if TITLE_KEYS.contains(&key.as_str()) {
            key.bold().to_string()
        } else {
            key.dimmed().to_string()
        };
        output.push_str(&format!("{}{}: {}\n", indent, formatted_key, format_scalar(value)));
    }

    for (key, value) in obj {
        match value {
            Value::Array(arr) => {
                output.push('\n');
                output.push_str(&format!(
                    "{}{} ({} items):\n",
                    indent,
                    key.cyan().bold(),
                    arr.len()
                ));
                format_value(value, output, depth + 1);
            }
            Value::Object(nested) => {
                output.push('\n');
                output.push_str(&format!("{}{}:\n", indent, key.cyan().bold()));
                format_object_hierarchical(nested, output, depth + 1);
            }
            _ => {}
        }
    }
}

/// Columnar view of an array of objects; columns are the union of scalar
/// keys, title-like keys first.
fn format_as_table(items: &[Value]) -> String {
    let objects: Vec<&serde_json::Map<String, Value>> =
        items.iter().filter_map(|v| v.as_object()).collect();

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for obj in &objects {
        for (k, v) in obj.iter() {
            if !v.is_object() && !v.is_array() {
                keys.insert(k.as_str());
            }
        }
    }
    let mut columns: Vec<&str> = TITLE_KEYS
        .iter()
        .copied()
        .filter(|k| keys.contains(k))
        .collect();
    columns.extend(keys.iter().copied().filter(|k| !TITLE_KEYS.contains(k)));
    columns.truncate(8);

    if columns.is_empty() {
        return format!("{}\n", "(no scalar fields)".dimmed());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|c| Cell::new(c.cyan().bold().to_string()))
                .collect::<Vec<_>>(),
        );

    for obj in objects.iter().take(MAX_ROWS) {
        table.add_row(
            columns
                .iter()
                .map(|c| Cell::new(format_cell_value(obj.get(*c).unwrap_or(&Value::Null))))
                .collect::<Vec<_>>(),
        );
    }

    let mut output = table.to_string();
    output.push('\n');
    if objects.len() > MAX_ROWS {
        output.push_str(
            &format!("... and {} more\n", objects.len() - MAX_ROWS)
                .dimmed()
                .to_string(),
        );
    }
    output
}

// ============================================================================
// Section Headers
// ============================================================================

pub fn format_section_header(label: &str, count: Option<usize>) -> String {
    let count_str = match count {
        Some(n) => format!(" ({} results)", n),
        None => String::new(),
    };

    let header_text = format!("{}{}", label, count_str);
    let line_len = (terminal_width().saturating_sub(header_text.len() + 4)).min(60);
    let line = "─".repeat(line_len);

    format!(
        "{} {} {}",
        "──".cyan(),
        header_text.green().bold(),
        line.cyan()
    )
}

// ============================================================================
// Utility Functions
// ============================================================================

fn paint_source(source: FoodSource) -> String {
    match source {
        FoodSource::Local => source.as_str().green().to_string(),
        FoodSource::Usda => source.as_str().blue().to_string(),
        FoodSource::OpenFoodFacts => source.as_str().magenta().to_string(),
        FoodSource::Nutritionix => source.as_str().cyan().to_string(),
    }
}

pub fn format_serving(record: &FoodRecord) -> String {
    format!("{} {}", format_amount(record.serving_size), record.serving_unit)
}

/// One decimal place, trailing `.0` dropped.
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

fn format_cell_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => truncate_str(s, 45),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() != 0.0)
            .map(format_amount)
            .unwrap_or_else(|| n.to_string()),
        other => format_scalar(other),
    }
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".dimmed().to_string(),
        Value::Bool(b) => {
            if *b {
                "true".green().to_string()
            } else {
                "false".red().to_string()
            }
        }
        Value::Number(n) => n.yellow().to_string(),
        Value::String(s) => s.to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{}...}}", obj.len()),
    }
}

pub fn truncate_str(s: &str, max_len: usize) -> String {
    // Take first line only
    let first_line = s.lines().next().unwrap_or(s);

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}
