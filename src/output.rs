//! Rendering of command results as table, JSON or text.

use anyhow::Result;
use clap::ValueEnum;
use cleanupkit::{Dataset, RowSet};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns for humans
    #[default]
    Table,
    /// Array of records keyed by header
    Json,
    /// One `header=value` line per row
    Text,
}

/// Render `rows` in `format`. `color` styles the table header and action cells.
pub fn render(rows: &RowSet, format: OutputFormat, out: &mut dyn Write, color: bool) -> Result<()> {
    let dataset = normalize(&rows.to_dataset());
    match format {
        OutputFormat::Table => write_table(&dataset, rows.action_column, out, color),
        OutputFormat::Json => write_json(&dataset, out),
        OutputFormat::Text => write_text(&dataset, out),
    }
}

/// Fill in `column_N` headers when none were given and pad or cut rows to width.
fn normalize(data: &Dataset) -> Dataset {
    let headers = if data.headers.is_empty() {
        let width = data.rows.iter().map(Vec::len).max().unwrap_or(0);
        (1..=width).map(|i| format!("column_{i}")).collect()
    } else {
        data.headers.clone()
    };

    let rows = data
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(headers.len(), String::new());
            row
        })
        .collect();

    Dataset { headers, rows }
}

fn write_table(data: &Dataset, action_column: usize, out: &mut dyn Write, color: bool) -> Result<()> {
    if data.headers.is_empty() {
        return Ok(());
    }

    let mut widths: Vec<usize> = data.headers.iter().map(|h| h.chars().count()).collect();
    for row in &data.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let last = data.headers.len() - 1;
    let line = |cells: &[String], style: &dyn Fn(usize, &str) -> String| -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            let padded = if i == last {
                cell.clone()
            } else {
                format!("{cell:<width$}  ", width = widths[i])
            };
            line.push_str(&style(i, &padded));
        }
        line
    };

    let header_style = |_: usize, cell: &str| -> String {
        if color { cell.bold().to_string() } else { cell.to_string() }
    };
    writeln!(out, "{}", line(&data.headers[..], &header_style).trim_end())?;

    let cell_style = |i: usize, cell: &str| -> String {
        if color && i == action_column {
            paint_action(cell)
        } else {
            cell.to_string()
        }
    };
    for row in &data.rows {
        writeln!(out, "{}", line(row.as_slice(), &cell_style).trim_end())?;
    }
    Ok(())
}

fn paint_action(cell: &str) -> String {
    let label = cell.trim_end();
    if label.starts_with("failed:") {
        cell.red().to_string()
    } else if label.starts_with("skipped:") {
        cell.yellow().to_string()
    } else if label.starts_with("would-") {
        cell.cyan().to_string()
    } else if label == "cancelled" || label == "pending" {
        cell.dimmed().to_string()
    } else {
        cell.green().to_string()
    }
}

fn write_json(data: &Dataset, out: &mut dyn Write) -> Result<()> {
    let records: Vec<BTreeMap<&str, &str>> = data
        .rows
        .iter()
        .map(|row| {
            data.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &records)?;
    writeln!(out)?;
    Ok(())
}

fn write_text(data: &Dataset, out: &mut dyn Write) -> Result<()> {
    if data.headers.is_empty() {
        return Ok(());
    }

    for row in &data.rows {
        let line = if data.headers.len() == 1 {
            row[0].clone()
        } else {
            data.headers
                .iter()
                .zip(row)
                .map(|(header, value)| format!("{header}={value}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        writeln!(out, "{line}")?;
    }
    Ok(())
}
