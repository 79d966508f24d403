//! Driving side: routing, screen view models and the command-line shell.

pub mod cli;
pub mod routes;
pub mod screens;
