//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_provider;
mod ip_lookup;
mod map_widget;
mod report_repository;
mod session_persistence;

#[cfg(test)]
pub use auth_provider::MockAuthProvider;
pub use auth_provider::{
    AUTH_EVENT_CAPACITY, AuthError, AuthEvent, AuthProvider, FixtureAuthProvider,
};
#[cfg(test)]
pub use ip_lookup::MockIpLookup;
pub use ip_lookup::{FixtureIpLookup, IpLookup, LookupError};
pub use map_widget::{
    CameraTarget, ControlPosition, GeolocateControl, LineLayer, MapWidget, MarkerHandle,
    MarkerSpec,
};
#[cfg(test)]
pub use report_repository::MockReportRepository;
pub use report_repository::{FixtureReportRepository, PersistenceError, ReportRepository};
#[cfg(test)]
pub use session_persistence::MockSessionPersistence;
pub use session_persistence::{
    InMemorySessionPersistence, SessionPersistence, SessionPersistenceError, StoredSession,
};
