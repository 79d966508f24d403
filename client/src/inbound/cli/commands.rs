//! Command execution against the screens.
//!
//! Every command resolves its route through [`guard`] first, so the shell
//! enforces the same sign-in and admin rules as navigation does. Commands
//! return the text to print.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use super::args::{AdminCommand, Command, ReportArgs};
use crate::app::AppContext;
use crate::domain::map::MapEvent;
use crate::domain::ports::PersistenceError;
use crate::domain::{
    Coordinates, CsvExportError, Report, ReportId, ReportValidationError, Session,
    SubmissionError, UserIdentity, is_admin,
};
use crate::inbound::routes::{AccessDenied, Guard, Route, guard};
use crate::inbound::screens::admin::format_list_date;
use crate::inbound::screens::{
    AdminScreen, HomeHeader, HomeScreen, LoginView, continue_with_google, sign_out,
};
use crate::outbound::headless_map::HeadlessMap;

/// Why a command produced no result.
#[derive(Debug, Error)]
pub enum CliError {
    /// The route needs a session.
    #[error("not signed in; run `campus-trace login` first")]
    NotSignedIn,
    /// The session is still being restored.
    #[error("session is still loading")]
    Loading,
    /// Signed in but not an administrator.
    #[error("{}", AccessDenied)]
    AccessDenied,
    /// No screen lives at the path.
    #[error("no screen at '{path}'")]
    NotFound {
        /// Requested path.
        path: String,
    },
    /// Sign-in was abandoned or refused.
    #[error("sign-in did not complete")]
    SignInAbandoned,
    /// Coordinates outside the valid ranges.
    #[error(transparent)]
    Coordinates(#[from] ReportValidationError),
    /// The pin was never confirmed, so no dialog opened.
    #[error("no location confirmed on the map")]
    NoLocation,
    /// The dialog refused or failed the submission.
    #[error("{message}")]
    Submission {
        /// Message the dialog shows.
        message: String,
        /// Underlying failure.
        #[source]
        source: SubmissionError,
    },
    /// No listed report carries the identifier.
    #[error("report {id} not found")]
    UnknownReport {
        /// Requested identifier.
        id: String,
    },
    /// Resolving failed in the store.
    #[error("{message}")]
    Resolve {
        /// Message the dashboard shows.
        message: String,
        /// Store failure.
        #[source]
        source: PersistenceError,
    },
    /// CSV generation failed.
    #[error(transparent)]
    Export(#[from] CsvExportError),
    /// The export file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Run `command` and return what to print.
///
/// # Errors
///
/// Returns [`CliError`] when a guard refuses the route or an action fails.
pub async fn run(context: &AppContext, command: Command) -> Result<String, CliError> {
    match command {
        Command::Login => login(context).await,
        Command::Logout => {
            let route = sign_out(context.session_store()).await;
            Ok(format!("Signed out. Next: {route}"))
        }
        Command::Whoami => Ok(whoami(&context.session())),
        Command::Open { path } => Ok(open(context, &path).await),
        Command::Report(args) => report(context, args).await,
        Command::Mine => mine(context).await,
        Command::Admin(action) => admin(context, action).await,
    }
}

fn enter(context: &AppContext, route: Route) -> Result<UserIdentity, CliError> {
    let session = context.session();
    match guard(route.path(), &session) {
        Guard::Render(_) => session.identity.ok_or(CliError::NotSignedIn),
        Guard::Redirect(_) => Err(CliError::NotSignedIn),
        Guard::Loading => Err(CliError::Loading),
        Guard::AccessDenied => Err(CliError::AccessDenied),
        Guard::NotFound => Err(CliError::NotFound {
            path: route.path().to_owned(),
        }),
    }
}

fn map_widget(context: &AppContext) -> HeadlessMap {
    HeadlessMap::new(context.basemap().clone())
}

async fn login(context: &AppContext) -> Result<String, CliError> {
    let store = context.session_store();
    let route = continue_with_google(store)
        .await
        .ok_or(CliError::SignInAbandoned)?;
    Ok(format!("{}\nNext: {route}", whoami(&store.current_session())))
}

fn whoami(session: &Session) -> String {
    match &session.identity {
        Some(identity) => {
            let mut line = HomeHeader::for_identity(identity).to_string();
            if is_admin(Some(identity.email())) {
                line.push_str("  (admin)");
            }
            line
        }
        None => "Not signed in".to_owned(),
    }
}

async fn open(context: &AppContext, path: &str) -> String {
    let session = context.session();
    match guard(path, &session) {
        Guard::Loading => LoginView::for_session(&session).button_label.to_owned(),
        Guard::Redirect(route) => format!(
            "Redirected to {route}\n{}",
            LoginView::for_session(&session)
        ),
        Guard::AccessDenied => AccessDenied.to_string(),
        Guard::NotFound => format!("No screen at '{path}'"),
        Guard::Render(Route::Login) => LoginView::for_session(&session).to_string(),
        Guard::Render(Route::Home) => match session.identity.clone() {
            Some(identity) => render_home(context, identity).await,
            None => LoginView::for_session(&session).to_string(),
        },
        Guard::Render(Route::Admin) => match session.identity.clone() {
            Some(identity) => render_admin(context, identity).await,
            None => LoginView::for_session(&session).to_string(),
        },
    }
}

async fn render_home(context: &AppContext, identity: UserIdentity) -> String {
    let screen = HomeScreen::open(context, identity, map_widget(context)).await;
    let snapshot = screen.snapshot();
    let mut lines = vec![screen.header().to_string()];
    lines.extend(snapshot.error);
    lines.extend(snapshot.reports.iter().map(summary));
    lines.join("\n")
}

async fn render_admin(context: &AppContext, identity: UserIdentity) -> String {
    let screen = AdminScreen::open(context, identity, map_widget(context)).await;
    let mut lines = vec![screen.header().to_string()];
    lines.extend(screen.error());
    lines.extend(screen.empty_message().map(str::to_owned));
    lines.extend(screen.rows().iter().map(ToString::to_string));
    lines.join("\n")
}

fn summary(report: &Report) -> String {
    format!(
        "#{id} [{status}] {category}  {at}  {date}",
        id = report.id(),
        status = report.status(),
        category = report.category(),
        at = report.coordinates(),
        date = format_list_date(report.created_at()),
    )
}

async fn report(context: &AppContext, args: ReportArgs) -> Result<String, CliError> {
    let identity = enter(context, Route::Home)?;
    let clicked = Coordinates::new(args.lat, args.lng)?;
    let adjusted = match (args.adjust_lat, args.adjust_lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)?),
        _ => None,
    };

    let mut screen = HomeScreen::open(context, identity, map_widget(context)).await;
    screen.handle_map_event(MapEvent::Loaded);
    screen.handle_map_event(MapEvent::Clicked(clicked));
    if let Some(to) = adjusted {
        let map = screen.map_mut();
        if let Some(pin) = map.pending_pin() {
            map.widget_mut().drag_marker(pin, to);
        }
        screen.handle_map_event(MapEvent::PendingPinDragged(to));
    }
    screen.handle_map_event(MapEvent::PendingPinClicked);

    let dialog = screen.dialog_mut().ok_or(CliError::NoLocation)?;
    dialog.select_category(args.category);
    if let Some(description) = args.description {
        dialog.set_description(description);
    }

    match screen.submit().await {
        Some(Ok(report)) => {
            info!(report_id = %report.id(), "report submitted from the shell");
            Ok(format!("Report submitted\n{}", summary(&report)))
        }
        Some(Err(source)) => {
            let message = screen
                .dialog()
                .and_then(|dialog| dialog.error())
                .map_or_else(|| source.to_string(), str::to_owned);
            Err(CliError::Submission { message, source })
        }
        None => Err(CliError::NoLocation),
    }
}

async fn mine(context: &AppContext) -> Result<String, CliError> {
    let identity = enter(context, Route::Home)?;
    Ok(render_home(context, identity).await)
}

async fn admin(context: &AppContext, action: AdminCommand) -> Result<String, CliError> {
    let identity = enter(context, Route::Admin)?;
    match action {
        AdminCommand::List => Ok(render_admin(context, identity).await),
        AdminCommand::Select { id } => {
            let mut screen = AdminScreen::open(context, identity, map_widget(context)).await;
            let id = ReportId::new(id);
            if !screen.select(&id) {
                return Err(CliError::UnknownReport { id: id.to_string() });
            }
            let row = screen
                .rows()
                .into_iter()
                .find(|row| row.selected)
                .map(|row| row.to_string())
                .unwrap_or_default();
            Ok(format!("{row}\nMap centred on {}", id_location(&screen, &id)))
        }
        AdminCommand::Resolve { id } => {
            let mut screen = AdminScreen::open(context, identity, map_widget(context)).await;
            let id = ReportId::new(id);
            if screen.snapshot().reports.iter().all(|report| report.id() != &id) {
                return Err(CliError::UnknownReport { id: id.to_string() });
            }
            screen
                .resolve(&id)
                .await
                .map_err(|source| CliError::Resolve {
                    message: screen.error().unwrap_or_else(|| source.to_string()),
                    source,
                })?;
            Ok(format!("Report #{id} resolved"))
        }
        AdminCommand::Export { dir } => {
            let screen = AdminScreen::open(context, identity, map_widget(context)).await;
            let today = context.clock().utc().date_naive();
            let export = screen.export_csv(today)?;
            let path = dir.join(&export.file_name);
            std::fs::write(&path, export.contents.as_bytes()).map_err(|source| {
                CliError::Write {
                    path: path.clone(),
                    source,
                }
            })?;
            let count = screen.snapshot().reports.len();
            info!(path = %path.display(), count, "reports exported");
            Ok(format!("Exported {count} reports to {}", path.display()))
        }
    }
}

fn id_location(screen: &AdminScreen<HeadlessMap>, id: &ReportId) -> String {
    screen
        .snapshot()
        .reports
        .iter()
        .find(|report| report.id() == id)
        .map(|report| report.coordinates().to_string())
        .unwrap_or_default()
}
