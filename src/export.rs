//! Serialize a derived view to JSON or CSV text.

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::group::{GroupCount, Grouped};
use crate::pipeline::View;
use crate::schema::Record;
use crate::value::cell_string;
use crate::ExportFormat;

/// Row separator for CSV output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crlf => "\r\n",
            Self::Lf => "\n",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "crlf" => Some(Self::Crlf),
            "lf" => Some(Self::Lf),
            _ => None,
        }
    }
}

/// Pretty JSON with two-space indentation.
pub fn to_json(view: &View) -> Result<String> {
    Ok(serde_json::to_string_pretty(view)?)
}

/// Quote a cell when it holds a delimiter, a quote or a line break.
fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn header_line(keys: &[&String]) -> String {
    keys.iter()
        .map(|k| escape_cell(k))
        .collect::<Vec<_>>()
        .join(",")
}

/// One row with cells aligned to `keys`; fields the record lacks are empty.
fn record_line(keys: &[&String], record: &Record) -> String {
    keys.iter()
        .map(|k| escape_cell(&cell_string(record.get(k.as_str()))))
        .collect::<Vec<_>>()
        .join(",")
}

fn count_line(count: &GroupCount) -> String {
    format!("{},{}", escape_cell(&count.key), count.count)
}

fn flat_lines(records: &[Record]) -> Option<Vec<String>> {
    let first = records.first()?;
    let keys: Vec<&String> = first.keys().collect();
    let mut lines = vec![header_line(&keys)];
    lines.extend(records.iter().map(|r| record_line(&keys, r)));
    Some(lines)
}

fn grouped_lines(keys: &[&String], grouped: &Grouped, lines: &mut Vec<String>) {
    match grouped {
        Grouped::Records(records) => lines.extend(records.iter().map(|r| record_line(keys, r))),
        Grouped::Counts(counts) => lines.extend(counts.iter().map(count_line)),
        Grouped::Groups(groups) => {
            for (key, inner) in groups {
                lines.push(escape_cell(key));
                grouped_lines(keys, inner, lines);
            }
        }
    }
}

/// CSV rendering of a view, or None when there is nothing to export.
///
/// Flat views get a header from the first record's keys. Grouped views take
/// their header from the first leaf record and emit each group key on its own
/// line ahead of its members. Counts views are `key,count` lines with no
/// header; nested counts are preceded by their parent group keys.
pub fn to_csv(view: &View, line_ending: LineEnding) -> Option<String> {
    let lines = match view {
        View::Flat(records) => flat_lines(records)?,
        View::Grouped { grouped, .. } => {
            if grouped.is_empty() {
                return None;
            }
            if let Grouped::Records(records) = grouped {
                flat_lines(records)?
            } else if grouped.is_counts() {
                let mut lines = Vec::new();
                grouped_lines(&[], grouped, &mut lines);
                lines
            } else {
                let leaves = grouped.leaf_records();
                let first = leaves.first()?;
                let keys: Vec<&String> = first.keys().collect();
                let mut lines = vec![header_line(&keys)];
                grouped_lines(&keys, grouped, &mut lines);
                lines
            }
        }
        View::Analysis(summary) => {
            let mut lines = vec![format!("{},value", escape_cell(&summary.field))];
            lines.extend(
                summary
                    .as_stats()
                    .iter()
                    .map(|s| format!("{},{}", s.name, s.value)),
            );
            lines
        }
    };
    Some(lines.join(line_ending.as_str()))
}

/// Render `view` in `format`. `Ok(None)` signals an empty view with nothing
/// to export; JSON always renders (an empty view is `[]`).
pub fn export(view: &View, format: ExportFormat, line_ending: LineEnding) -> Result<Option<String>> {
    match format {
        ExportFormat::Json => to_json(view).map(Some),
        ExportFormat::Csv => Ok(to_csv(view, line_ending)),
    }
}
