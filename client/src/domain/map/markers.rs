//! Marker appearance for reports and the pending pin.

use crate::domain::ports::MarkerSpec;
use crate::domain::{Coordinates, Report, ReportStatus};

/// Colour of an open report marker.
pub const OPEN_COLOR: &str = "#EF4444";
/// Colour of a resolved report marker.
pub const RESOLVED_COLOR: &str = "#22C55E";
/// Colour of the pending pin.
pub const PENDING_COLOR: &str = "#3B82F6";
/// Hover hint on the pending pin.
pub const PENDING_HINT: &str = "Drag to adjust position, click to confirm";

/// Marker colour for a report status.
#[must_use]
pub const fn status_color(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Open => OPEN_COLOR,
        ReportStatus::Resolved => RESOLVED_COLOR,
    }
}

/// Draggable pin awaiting confirmation.
#[must_use]
pub fn pending_marker(at: Coordinates) -> MarkerSpec {
    MarkerSpec {
        position: at,
        color: PENDING_COLOR,
        draggable: true,
        title: Some(PENDING_HINT.to_owned()),
        popup_html: None,
    }
}

/// Fixed marker for a persisted report, with its popup.
#[must_use]
pub fn report_marker(report: &Report) -> MarkerSpec {
    MarkerSpec {
        position: report.coordinates(),
        color: status_color(report.status()),
        draggable: false,
        title: None,
        popup_html: Some(popup_html(report)),
    }
}

/// Popup body listing category, description, status and IP.
#[must_use]
pub fn popup_html(report: &Report) -> String {
    format!(
        "<div><strong>{category}</strong><br/>{description}<br/>\
         <em>Status: {status}</em><br/><small>IP: {ip}</small></div>",
        category = escape_html(report.category().as_str()),
        description = escape_html(report.description().unwrap_or("No description")),
        status = report.status(),
        ip = escape_html(report.user_ip().unwrap_or("N/A")),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
