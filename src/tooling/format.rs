//! Text and JSON rendering of listings and override sets.

use crate::overlay::{OverrideNodeData, OverrideStatus};
use crate::prefetch::PrefetchReport;
use crate::tree::NodeData;
use crate::types::{NodeNamesPath, NodeType, TimeMillis};
use chrono::DateTime;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

/// One row of a union listing
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub path: NodeNamesPath,
    pub data: NodeData,
    /// Served from the overlay rather than the cached base
    pub overridden: bool,
}

fn type_label(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::File => "file",
        NodeType::Dir => "dir",
    }
}

fn status_label(status: OverrideStatus) -> &'static str {
    match status {
        OverrideStatus::NotOverriden => "not-overriden",
        OverrideStatus::Updated => "updated",
        OverrideStatus::Deleted => "deleted",
    }
}

fn format_time(millis: TimeMillis) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format a section heading with bold/underline
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_listing_text(dir: &NodeNamesPath, entries: &[ListingEntry], report: &PrefetchReport) -> String {
    let mut out = format!("{}\n\n", format_section_heading(&dir.to_string()));
    if entries.is_empty() {
        out.push_str("(empty)\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Name", "Type", "Size", "Modified", "Source"]);
        for entry in entries {
            let size = match entry.data.node_type {
                NodeType::File => entry.data.external_length.to_string(),
                NodeType::Dir => format!("{} entries", entry.data.child_names.len()),
            };
            let source = if entry.overridden {
                format!("{}", "override".yellow())
            } else {
                "base".to_string()
            };
            table.add_row(vec![
                entry.data.name.to_string(),
                type_label(entry.data.node_type).to_string(),
                size,
                format_time(entry.data.external_last_modified_time),
                source,
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }
    out.push_str(&format!(
        "\nPrefetch: {} listed, {} records, {} stopped by budget, {} errors in {} ms",
        report.listed, report.reported, report.budget_stops, report.errors, report.duration_ms
    ));
    out
}

pub fn format_listing_json(dir: &NodeNamesPath, entries: &[ListingEntry], report: &PrefetchReport) -> String {
    let children: Vec<_> = entries
        .iter()
        .map(|entry| {
            json!({
                "path": entry.path.to_string(),
                "name": entry.data.name.as_str(),
                "type": type_label(entry.data.node_type),
                "length": entry.data.external_length,
                "last_modified": entry.data.external_last_modified_time,
                "overridden": entry.overridden,
            })
        })
        .collect();
    json!({
        "path": dir.to_string(),
        "children": children,
        "prefetch": {
            "listed": report.listed,
            "pages": report.pages,
            "reported": report.reported,
            "budget_stops": report.budget_stops,
            "errors": report.errors,
            "duration_ms": report.duration_ms,
        },
    })
    .to_string()
}

pub fn format_overrides_text(overrides: &[(NodeNamesPath, OverrideNodeData)]) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Overrides"));
    if overrides.is_empty() {
        out.push_str("No local overrides.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Path", "Status", "Type"]);
    for (path, value) in overrides {
        let status = match value.status() {
            OverrideStatus::Deleted => format!("{}", "deleted".red()),
            OverrideStatus::Updated => format!("{}", "updated".green()),
            other => status_label(other).to_string(),
        };
        let node_type = value
            .data()
            .map(|data| type_label(data.node_type))
            .unwrap_or("-");
        table.add_row(vec![path.to_string(), status, node_type.to_string()]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_overrides_json(overrides: &[(NodeNamesPath, OverrideNodeData)]) -> String {
    let rows: Vec<_> = overrides
        .iter()
        .map(|(path, value)| {
            json!({
                "path": path.to_string(),
                "status": status_label(value.status()),
                "type": value.data().map(|data| type_label(data.node_type)),
            })
        })
        .collect();
    serde_json::Value::Array(rows).to_string()
}
