//! Port for resolving the caller's public IP address.
//!
//! The address is abuse-triage metadata only; callers degrade to "unknown"
//! on any [`LookupError`].

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failures raised while resolving the public IP.
    pub enum LookupError {
        /// The lookup service could not be reached.
        Transport { message: String } => "ip lookup unreachable: {message}",
        /// The lookup did not finish within its budget.
        Timeout { message: String } => "ip lookup timed out: {message}",
        /// The service answered without a usable address.
        Decode { message: String } => "ip lookup returned malformed data: {message}",
    }
}

/// Best-effort public IP resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpLookup: Send + Sync {
    /// The caller's public IP as reported by the lookup service.
    async fn public_ip(&self) -> Result<String, LookupError>;
}

/// Lookup returning a fixed answer, or failing when constructed with `None`.
#[derive(Debug, Clone, Default)]
pub struct FixtureIpLookup {
    address: Option<String>,
}

impl FixtureIpLookup {
    /// Answer every lookup with `address`; `None` makes every lookup fail.
    pub fn new(address: Option<String>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl IpLookup for FixtureIpLookup {
    async fn public_ip(&self) -> Result<String, LookupError> {
        self.address
            .clone()
            .ok_or_else(|| LookupError::transport("no fixture address configured"))
    }
}
