//! Outbound adapters implementing the domain ports.

pub mod headless_map;
mod http;
pub mod ipify;
pub mod oauth_callback;
pub mod session_file;
pub mod supabase;
