//! The shared tabular interchange format
//!
//! Adapters produce line-oriented result sets: line 0 is the header, every
//! following line is one delimited row. The engine sanitizes rows on
//! ingestion so a row can never span multiple delimited lines downstream,
//! and re-encodes the final shape with minimal quoting.

use crate::error::Result;

/// An in-memory result set: ordered header plus ordered rows.
///
/// Row arity must match header arity at consumption time; misaligned rows
/// are a caller bug in the producing adapter, not a recoverable condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Ordered column names, case-sensitive
    pub header: Vec<String>,
    /// Ordered rows, each an ordered sequence of string fields
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Build a result set from delimited lines. Line 0 is taken as the
    /// header; the remaining lines are sanitized and split.
    pub fn from_lines(lines: &[String], separator: char) -> Self {
        let mut iter = lines.iter();
        let header = match iter.next() {
            Some(line) => split_line(line, separator),
            None => Vec::new(),
        };
        let rows = iter.map(|line| sanitize_and_split(line, separator)).collect();
        Self { header, rows }
    }

    /// Encode back to one delimited blob (header line + row lines).
    pub fn to_delimited(&self, separator: u8) -> Result<String> {
        encode(&self.header, &self.rows, separator)
    }
}

/// Strip quoting and line-break artifacts from a raw row.
///
/// `"` and `\r` are removed outright; embedded `\n` becomes `.` so a field
/// value can never re-introduce a line break.
pub fn sanitize_line(line: &str) -> String {
    line.chars()
        .filter(|c| *c != '"' && *c != '\r')
        .map(|c| if c == '\n' { '.' } else { c })
        .collect()
}

/// Split a line into fields on the separator, without sanitization.
pub fn split_line(line: &str, separator: char) -> Vec<String> {
    line.split(separator).map(str::to_string).collect()
}

/// Sanitize a raw row and split it into fields.
pub fn sanitize_and_split(line: &str, separator: char) -> Vec<String> {
    split_line(&sanitize_line(line), separator)
}

/// Encode a header plus rows as one delimited blob.
///
/// Fields are quoted only when they contain the separator, a quote
/// character, or a newline. Lines are CRLF-terminated with the trailing
/// terminator stripped, so the blob is safe to write to disk or embed in
/// an email body as-is.
pub fn encode(header: &[String], rows: &[Vec<String>], separator: u8) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(separator)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::CRLF)
            .flexible(true)
            .from_writer(&mut buf);
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    let text = String::from_utf8_lossy(&buf).into_owned();
    Ok(text.trim_end_matches("\r\n").to_string())
}

/// Encode rows without a header line. Used by adapters that assemble rows
/// directly and rely on the job configuration to add a header.
pub fn encode_rows(rows: &[Vec<String>], separator: u8) -> Result<Vec<String>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(separator)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::CRLF)
            .flexible(true)
            .from_writer(&mut buf);
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    let text = String::from_utf8_lossy(&buf).into_owned();
    Ok(text
        .trim_end_matches("\r\n")
        .split("\r\n")
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
