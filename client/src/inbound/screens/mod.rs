//! Screen view models.
//!
//! Each screen owns its report feed and map surface for as long as it is
//! shown. Nothing here renders; the CLI (or any other host) prints the
//! views and forwards interactions.

pub mod admin;
pub mod home;
pub mod login;

pub use admin::{AdminHeader, AdminScreen, ReportRow};
pub use home::{HomeHeader, HomeScreen};
pub use login::{LoginView, continue_with_google};

use crate::domain::SessionStore;
use crate::inbound::routes::Route;

/// Sign out from any screen; the caller navigates to the returned route.
pub async fn sign_out(store: &SessionStore) -> Route {
    store.sign_out().await;
    Route::Login
}
