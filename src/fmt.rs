//! Plain-text output formatters.
//!
//! Each `fmt_*` function renders one tool's output. The MCP server calls them
//! with `color = false`; the CLI passes `true` when stdout is a terminal, in
//! which case ANSI escape codes are emitted via `owo_colors`.

use crate::services::values::{csv_escape, format_datetime, format_epoch_date};
use crate::services::{DateRange, FrequencySummary, NumericSummary};
use crate::tools::{
    FeatureTableOutput, FieldSummary, ItemDefinitionOutput, LayerListing, SearchContentOutput,
    SearchLayersOutput, SummarizeFieldOutput,
};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Formats a statistic: integers without decimals, otherwise up to 4 places.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.0}");
    }
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn write_title(w: &mut impl Write, index: usize, title: &str, color: bool) -> io::Result<()> {
    let title = if title.is_empty() { "(untitled)" } else { title };
    if color {
        write!(w, "{}. {}", index, title.bold())
    } else {
        write!(w, "{index}. {title}")
    }
}

// ── search_layers ───────────────────────────────────────────────────────────

pub fn fmt_search_layers(
    w: &mut impl Write,
    out: &SearchLayersOutput,
    color: bool,
) -> io::Result<()> {
    if out.services.is_empty() {
        writeln!(w, "No layers found for '{}'.", out.query)?;
        return Ok(());
    }

    writeln!(
        w,
        "Found {} of {} feature services for '{}'",
        out.services.len(),
        out.total,
        out.query
    )?;

    for (i, svc) in out.services.iter().enumerate() {
        writeln!(w)?;
        write_title(w, i + 1, &svc.title, color)?;
        writeln!(w)?;
        writeln!(w, "   id: {} | owner: {}", svc.id, svc.owner)?;
        match &svc.url {
            Some(url) if color => writeln!(w, "   url: {}", url.cyan())?,
            Some(url) => writeln!(w, "   url: {url}")?,
            None => writeln!(w, "   url: (none)")?,
        }

        match &svc.layers {
            None => {}
            Some(LayerListing::Unavailable(reason)) => {
                writeln!(w, "   layers unavailable: {reason}")?;
            }
            Some(LayerListing::Layers(layers)) if layers.is_empty() => {
                writeln!(w, "   layers: (none)")?;
            }
            Some(LayerListing::Layers(layers)) => {
                writeln!(w, "   layers:")?;
                for layer in layers {
                    let kind = layer.geometry_type.as_deref().unwrap_or("table");
                    if color {
                        writeln!(
                            w,
                            "     - {}  {} ({})",
                            layer.url.cyan(),
                            layer.name,
                            kind.dimmed()
                        )?;
                    } else {
                        writeln!(w, "     - {}  {} ({})", layer.url, layer.name, kind)?;
                    }
                }
            }
        }
    }

    if out.has_more {
        writeln!(w)?;
        writeln!(w, "... more results available (raise max_results or refine the query)")?;
    }

    Ok(())
}

// ── search_content ──────────────────────────────────────────────────────────

pub fn fmt_search_content(
    w: &mut impl Write,
    out: &SearchContentOutput,
    color: bool,
) -> io::Result<()> {
    if out.items.is_empty() {
        writeln!(w, "No items found for '{}'.", out.query)?;
        return Ok(());
    }

    writeln!(
        w,
        "Showing {} of {} results for '{}'",
        out.items.len(),
        out.total,
        out.query
    )?;

    for (i, item) in out.items.iter().enumerate() {
        writeln!(w)?;
        write_title(w, i + 1, &item.title, color)?;
        if color {
            writeln!(w, " [{}]", item.item_type.yellow())?;
        } else {
            writeln!(w, " [{}]", item.item_type)?;
        }

        write!(w, "   id: {} | owner: {}", item.id, item.owner)?;
        if let Some(modified) = item.modified.and_then(format_epoch_date) {
            write!(w, " | modified: {modified}")?;
        }
        writeln!(w)?;

        if let Some(url) = item.url.as_deref().filter(|u| !u.is_empty()) {
            writeln!(w, "   url: {url}")?;
        }
        if let Some(snippet) = item.snippet.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            writeln!(w, "   {snippet}")?;
        }
        if !item.tags.is_empty() {
            let tags = item.tags.join(", ");
            if color {
                writeln!(w, "   tags: {}", tags.dimmed())?;
            } else {
                writeln!(w, "   tags: {tags}")?;
            }
        }
    }

    if out.has_more {
        writeln!(w)?;
        writeln!(w, "... more results available (raise max_results or refine the query)")?;
    }

    Ok(())
}

// ── get_feature_table ───────────────────────────────────────────────────────

/// Renders the table as CSV. No colour: the output is meant to be parsed.
pub fn fmt_feature_table(w: &mut impl Write, out: &FeatureTableOutput) -> io::Result<()> {
    if out.rows.is_empty() {
        writeln!(w, "No features found.")?;
        return Ok(());
    }

    let header: Vec<_> = out.columns.iter().map(|c| csv_escape(c)).collect();
    writeln!(w, "{}", header.join(","))?;

    for row in &out.rows {
        let cells: Vec<_> = row
            .iter()
            .map(|cell| csv_escape(cell.as_deref().unwrap_or("")))
            .collect();
        writeln!(w, "{}", cells.join(","))?;
    }

    match out.total {
        Some(total) if total > out.rows.len() as u64 => {
            writeln!(w, "# showing {} of {} features", out.rows.len(), total)?;
        }
        None if out.exceeded_transfer_limit => {
            writeln!(w, "# showing {} features; more are available", out.rows.len())?;
        }
        _ => {}
    }

    Ok(())
}

// ── get_item_definition ─────────────────────────────────────────────────────

pub fn fmt_item_definition(w: &mut impl Write, out: &ItemDefinitionOutput) -> io::Result<()> {
    let json = serde_json::to_string_pretty(out).map_err(io::Error::other)?;
    writeln!(w, "{json}")
}

// ── summarize_field ─────────────────────────────────────────────────────────

fn write_stat(w: &mut impl Write, label: &str, value: &str, color: bool) -> io::Result<()> {
    if color {
        writeln!(w, "  {:<10} {}", format!("{label}:").bold(), value)
    } else {
        writeln!(w, "  {:<10} {}", format!("{label}:"), value)
    }
}

fn fmt_numeric(w: &mut impl Write, s: &NumericSummary, color: bool) -> io::Result<()> {
    write_stat(w, "Count", &s.count.to_string(), color)?;
    write_stat(w, "Min", &format_number(s.min), color)?;
    write_stat(w, "Max", &format_number(s.max), color)?;
    write_stat(w, "Sum", &format_number(s.sum), color)?;
    write_stat(w, "Mean", &format_number(s.mean), color)?;
    write_stat(w, "Median", &format_number(s.median), color)?;
    write_stat(
        w,
        "Mode",
        &format!("{} ({}x)", format_number(s.mode), s.mode_count),
        color,
    )?;
    write_stat(w, "Std dev", &format_number(s.std_dev), color)
}

fn fmt_dates(w: &mut impl Write, r: &DateRange, color: bool) -> io::Result<()> {
    write_stat(w, "Count", &r.count.to_string(), color)?;
    write_stat(w, "Earliest", &format_datetime(&r.earliest), color)?;
    write_stat(w, "Latest", &format_datetime(&r.latest), color)?;
    write_stat(w, "Span", &format!("{} days", format_number(r.span_days)), color)
}

fn fmt_frequencies(w: &mut impl Write, f: &FrequencySummary, color: bool) -> io::Result<()> {
    write_stat(w, "Count", &f.count.to_string(), color)?;
    write_stat(w, "Distinct", &f.distinct.to_string(), color)?;
    writeln!(w, "  Top {} values:", f.top.len())?;
    for entry in &f.top {
        let pct = entry.count as f64 * 100.0 / f.count as f64;
        let value = if entry.value.is_empty() {
            "(empty)"
        } else {
            entry.value.as_str()
        };
        writeln!(w, "    {:>6}  {:>5.1}%  {}", entry.count, pct, value)?;
    }
    Ok(())
}

pub fn fmt_field_summary(
    w: &mut impl Write,
    out: &SummarizeFieldOutput,
    color: bool,
) -> io::Result<()> {
    if color {
        writeln!(
            w,
            "Field {} ({}) on layer '{}'",
            out.field.bold(),
            out.field_type,
            out.layer_name
        )?;
    } else {
        writeln!(
            w,
            "Field {} ({}) on layer '{}'",
            out.field, out.field_type, out.layer_name
        )?;
    }
    write!(w, "Sampled {} features where {}", out.sampled, out.where_clause)?;
    if out.truncated {
        write!(w, " (sample truncated by the service's record limit)")?;
    }
    writeln!(w)?;

    write_stat(w, "Nulls", &out.nulls.to_string(), color)?;
    if out.invalid > 0 {
        write_stat(w, "Invalid", &out.invalid.to_string(), color)?;
    }

    match &out.summary {
        FieldSummary::Numeric(s) => fmt_numeric(w, s, color),
        FieldSummary::Date(r) => fmt_dates(w, r, color),
        FieldSummary::Text(f) => fmt_frequencies(w, f, color),
        FieldSummary::Empty => writeln!(w, "  No non-null values to summarize."),
    }
}

/// Runs a formatter into a `String`.
///
/// # Errors
///
/// Returns an I/O error only if the formatter itself fails.
pub fn render<F>(f: F) -> io::Result<String>
where
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut buf = Vec::new();
    f(&mut buf)?;
    String::from_utf8(buf).map_err(io::Error::other)
}
