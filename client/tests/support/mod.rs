//! Shared wiring for behaviour suites: an in-memory backend behind an `AppContext`.

use std::sync::Arc;

use campus_trace::app::{AppContext, AppPorts};
use campus_trace::domain::map::Basemap;
use campus_trace::domain::ports::{FixtureAuthProvider, FixtureIpLookup, FixtureReportRepository};
use mockable::DefaultClock;
use tokio::runtime::Runtime;

#[allow(dead_code, reason = "only the submission suite inspects stored IPs")]
pub const STUDENT_IP: &str = "203.0.113.7";

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build")
}

pub fn store() -> Arc<FixtureReportRepository> {
    Arc::new(FixtureReportRepository::new(Arc::new(DefaultClock)))
}

pub fn context(
    runtime: &Runtime,
    auth: FixtureAuthProvider,
    store: &Arc<FixtureReportRepository>,
) -> AppContext {
    runtime.block_on(AppContext::from_ports(AppPorts {
        auth: Arc::new(auth),
        reports: Arc::clone(store) as _,
        ip_lookup: Arc::new(FixtureIpLookup::new(Some(STUDENT_IP.to_owned()))),
        clock: Arc::new(DefaultClock),
        basemap: Basemap::default(),
    }))
}
