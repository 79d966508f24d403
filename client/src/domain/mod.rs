//! Domain model, driven ports and the client-side state machines.
//!
//! Nothing in here touches the network or the terminal. Adapters in
//! `outbound` implement the ports; `inbound` drives the state machines.

pub mod access_policy;
pub mod csv_export;
pub mod identity;
pub mod map;
pub mod ports;
pub mod report;
pub mod report_feed;
pub mod session_store;
pub mod submission;

pub use access_policy::{ADMIN_EMAILS, is_admin};
pub use csv_export::{CsvExport, CsvExportError, export_file_name, export_reports, reports_to_csv};
pub use identity::{IdentityValidationError, Session, UserId, UserIdentity};
pub use report::{
    Coordinates, NewReport, Report, ReportCategory, ReportId, ReportStatus, ReportValidationError,
};
pub use report_feed::{FeedSnapshot, Invalidation, ReportFeed, ReportScope};
pub use session_store::SessionStore;
pub use submission::{SUBMIT_FAILED_MESSAGE, SubmissionDialog, SubmissionError};
