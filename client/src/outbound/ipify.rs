//! Reqwest-backed public IP lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::http::status_message;
use crate::domain::ports::{IpLookup, LookupError};

#[derive(Debug, Deserialize)]
struct IpResponseDto {
    ip: String,
}

/// Lookup against an ipify-compatible endpoint returning `{"ip": "..."}`.
pub struct IpifyLookup {
    client: Client,
    endpoint: Url,
}

impl IpifyLookup {
    /// Build a lookup whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IpLookup for IpifyLookup {
    async fn public_ip(&self) -> Result<String, LookupError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(LookupError::transport(status_message(status, body.as_ref())));
        }
        parse_ip(body.as_ref())
    }
}

fn parse_ip(body: &[u8]) -> Result<String, LookupError> {
    let decoded: IpResponseDto = serde_json::from_slice(body)
        .map_err(|error| LookupError::decode(format!("invalid ip lookup payload: {error}")))?;
    let ip = decoded.ip.trim();
    if ip.is_empty() {
        return Err(LookupError::decode("ip lookup returned an empty address"));
    }
    Ok(ip.to_owned())
}

fn map_transport_error(error: reqwest::Error) -> LookupError {
    if error.is_timeout() {
        LookupError::timeout(error.to_string())
    } else {
        LookupError::transport(error.to_string())
    }
}
