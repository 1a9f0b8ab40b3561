//! Client for resolving the country of an IP address.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

const USER_AGENT: &str = "xm-server/ip-location";

#[derive(Error, Debug)]
pub enum IpLocationError {
    #[error("IP location request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("IP location service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("IP location lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait IpLocationClient: Send + Sync {
    /// Country code for `ip`.
    async fn country(&self, ip: &str) -> Result<String, IpLocationError>;
}

/// ipapi.co compatible client: `GET <base>/<ip>/json/`.
pub struct HttpIpLocationClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIpLocationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IpLocationError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl IpLocationClient for HttpIpLocationClient {
    async fn country(&self, ip: &str) -> Result<String, IpLocationError> {
        let url = format!("{}/{}/json/", self.base_url, ip);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(IpLocationError::Status { status, body });
        }

        let body: Value = response.json().await?;
        country_from_response(&body)
    }
}

fn country_from_response(body: &Value) -> Result<String, IpLocationError> {
    if body.get("error").and_then(Value::as_bool) == Some(true) {
        let reason = body
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown reason");
        return Err(IpLocationError::Lookup(reason.to_string()));
    }

    body.get("country")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IpLocationError::Lookup("response has no country".to_string()))
}
