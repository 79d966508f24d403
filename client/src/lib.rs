//! Campus issue reporting client.
//!
//! Signed-in users drop a pin on the campus map, classify the issue and
//! submit it. Administrators see every report, resolve them and export the
//! list as CSV. The core is headless: screens are view models over ports,
//! and the `campus-trace` binary drives them from the terminal.

pub mod app;
pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
