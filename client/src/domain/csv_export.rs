//! CSV export of the admin report list.
//!
//! Every field, the header included, is quoted with embedded quotes doubled.
//! Rows are joined by `\n` with no trailing newline, and line breaks inside a
//! cell are flattened to spaces, so a list of N reports yields exactly N + 1
//! lines.

use std::borrow::Cow;

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use super::Report;

/// Column headers, in output order.
pub const CSV_HEADERS: [&str; 8] = [
    "Category",
    "Description",
    "Status",
    "Latitude",
    "Longitude",
    "Date",
    "User ID",
    "IP Address",
];

/// Placeholder for a report without a description.
pub const NO_DESCRIPTION: &str = "No description";
/// Placeholder for a report without a recorded IP.
pub const NO_IP: &str = "N/A";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Failures raised while serialising reports.
#[derive(Debug, Error)]
pub enum CsvExportError {
    /// The CSV writer rejected a record.
    #[error("failed to write CSV record: {0}")]
    Write(#[from] csv::Error),
    /// Buffered output could not be flushed.
    #[error("failed to flush CSV output: {0}")]
    Flush(String),
    /// The writer produced bytes that are not UTF-8.
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A serialised export ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested file name, `campus-reports-<YYYY-MM-DD>.csv`.
    pub file_name: String,
    /// CSV text.
    pub contents: String,
}

/// File name for an export taken on `today`.
#[must_use]
pub fn export_file_name(today: NaiveDate) -> String {
    format!("campus-reports-{}.csv", today.format("%Y-%m-%d"))
}

/// Replace each `\r\n`, `\n` or `\r` in `value` with a single space.
fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\r', '\n']) {
        Cow::Owned(value.replace("\r\n", " ").replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// Serialise `reports` in the order given.
pub fn reports_to_csv(reports: &[Report]) -> Result<String, CsvExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;
    for report in reports {
        let coordinates = report.coordinates();
        let lat = coordinates.lat().to_string();
        let lng = coordinates.lng().to_string();
        let date = report.created_at().format(DATE_FORMAT).to_string();
        let description = single_line(report.description().unwrap_or(NO_DESCRIPTION));
        let ip = single_line(report.user_ip().unwrap_or(NO_IP));
        writer.write_record([
            report.category().as_str(),
            description.as_ref(),
            report.status().as_str(),
            lat.as_str(),
            lng.as_str(),
            date.as_str(),
            report.owner_id().as_ref(),
            ip.as_ref(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| CsvExportError::Flush(err.error().to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Serialise `reports` and name the result for `today`.
pub fn export_reports(reports: &[Report], today: NaiveDate) -> Result<CsvExport, CsvExportError> {
    Ok(CsvExport {
        file_name: export_file_name(today),
        contents: reports_to_csv(reports)?,
    })
}
