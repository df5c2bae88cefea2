//! Command execution.

use crate::Commands;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat};
use colored::Colorize;
use std::path::Path;
use widerow_client::{ClientConfig, Table};
use widerow_core::{Cell, ParserError, ReadRowsParser, Row};
use widerow_protocol::codec::jsonl::LineDecoder;
use widerow_protocol::{CellChunk, Filter, RowRange, RowSet};

/// Executes a command and returns the formatted output.
pub async fn execute(
    config: &ClientConfig,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::ReadRows {
            table,
            start,
            end,
            prefix,
            limit,
            latest,
            family,
        } => {
            let table = Table::new(config, &table);
            let rows = row_set(start, end, prefix);
            let filter = build_filter(latest, family);
            let limit = limit.unwrap_or(config.read.rows_limit);

            let mut reader = table.read_rows_with_limit(rows, limit, filter).await?;
            let mut output = Vec::new();
            while let Some(row) = reader.next_row().await? {
                output.push(format_row(&row));
            }
            if output.is_empty() {
                return Ok("No rows".yellow().to_string());
            }
            output.push(format!("{} row(s)", reader.rows_read()).dimmed().to_string());
            Ok(output.join("\n"))
        }

        Commands::ReadRow {
            table,
            key,
            latest,
            family,
        } => {
            let table = Table::new(config, &table);
            match table.read_row(key.clone(), build_filter(latest, family)).await? {
                Some(row) => Ok(format_row(&row)),
                None => Ok(format!("{} {}", "Row not found:".yellow(), key.cyan())),
            }
        }

        Commands::ParseChunks { file } => {
            let replay = replay_file(&file)?;
            let mut output: Vec<String> = replay.rows.iter().map(format_row).collect();
            match replay.error {
                Some(e) => output.push(format!(
                    "{} after {} row(s) at chunk {}: [{}] {}",
                    "Invalid stream".red(),
                    replay.rows.len(),
                    replay.chunks,
                    e.error_code(),
                    e
                )),
                None => output.push(
                    format!("{} row(s) from {} chunk(s)", replay.rows.len(), replay.chunks)
                        .green()
                        .to_string(),
                ),
            }
            Ok(output.join("\n"))
        }

        Commands::Config => Ok(serde_yaml::to_string(config)?),
    }
}

/// Translates the key flags into a row set. No flags select the whole table.
pub fn row_set(start: Option<String>, end: Option<String>, prefix: Option<String>) -> RowSet {
    if let Some(prefix) = prefix {
        return RowSet::from(RowRange::prefix(prefix));
    }
    match (start, end) {
        (None, None) => RowSet::new(),
        (Some(start), None) => RowSet::from(RowRange::starting_at(start)),
        (None, Some(end)) => RowSet::from(RowRange {
            end: widerow_protocol::Bound::open(end),
            ..RowRange::infinite()
        }),
        (Some(start), Some(end)) => RowSet::from(RowRange::right_open(start, end)),
    }
}

/// Chains the requested filters, or passes everything when none are given.
pub fn build_filter(latest: Option<u32>, family: Option<String>) -> Filter {
    let mut filters = Vec::new();
    if let Some(family) = family {
        filters.push(Filter::family_regex(family));
    }
    if let Some(n) = latest {
        filters.push(Filter::latest(n));
    }
    match filters.len() {
        0 => Filter::pass_all(),
        1 => filters.remove(0),
        _ => Filter::chain(filters),
    }
}

/// Result of replaying a captured chunk stream.
pub struct Replay {
    pub rows: Vec<Row>,
    /// Chunks consumed, including the one that failed.
    pub chunks: usize,
    pub error: Option<ParserError>,
}

fn replay_file(path: &Path) -> Result<Replay, Box<dyn std::error::Error>> {
    let content = std::fs::read(path)?;
    replay(&content)
}

/// Feeds a line-delimited JSON chunk stream through the parser, collecting
/// rows until the end of input or the first violation.
pub fn replay(content: &[u8]) -> Result<Replay, Box<dyn std::error::Error>> {
    let mut decoder = LineDecoder::new();
    decoder.extend(content);

    let mut parser = ReadRowsParser::new();
    let mut replay = Replay {
        rows: Vec::new(),
        chunks: 0,
        error: None,
    };

    let mut result = Ok(());
    while let Some(chunk) = decoder.decode_line::<CellChunk>()? {
        replay.chunks += 1;
        result = parser.handle_chunk(chunk);
        if result.is_err() {
            break;
        }
    }
    if result.is_ok() {
        if let Some(chunk) = decoder.finish::<CellChunk>()? {
            replay.chunks += 1;
            result = parser.handle_chunk(chunk);
        }
    }
    if result.is_ok() {
        result = parser.handle_end_of_stream();
    }

    while parser.has_next() {
        replay.rows.push(parser.next_row()?);
    }
    replay.error = result.err();
    Ok(replay)
}

/// Formats a row as a header line followed by one line per cell.
pub fn format_row(row: &Row) -> String {
    let mut output = format!("{}", display_bytes(row.row_key()).bold());
    for cell in row.cells() {
        output.push('\n');
        output.push_str(&format_cell(cell));
    }
    output
}

fn format_cell(cell: &Cell) -> String {
    let mut line = format!(
        "  {}:{} @ {} = {}",
        cell.family_name().cyan(),
        display_bytes(cell.column_qualifier()).cyan(),
        format_timestamp(cell.timestamp()).dimmed(),
        display_bytes(cell.value())
    );
    if !cell.labels().is_empty() {
        line.push_str(&format!(" [{}]", cell.labels().join(", ")).yellow().to_string());
    }
    line
}

/// Renders microseconds since the epoch as RFC 3339, or the raw number if
/// out of range.
fn format_timestamp(micros: i64) -> String {
    DateTime::from_timestamp_micros(micros)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_else(|| micros.to_string())
}

/// Printable UTF-8 as is, anything else as `0x`-prefixed hex.
fn display_bytes(bytes: &Bytes) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}
