use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;
use serde::Deserialize;
use tracing::{debug, instrument};

pub const DEFAULT_LOOKUP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("response has no utc offset")]
    MissingOffset,
    #[error("can't read utc offset {0:?}")]
    InvalidOffset(String),
}

/// Source of the UTC offset used for the clock display.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OffsetLookup: Send + Sync {
    async fn utc_offset(&self) -> Result<FixedOffset, LookupError>;
}

/// Asks an ipapi-compatible geolocation endpoint for the caller's offset.
pub struct IpApiLookup {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct IpApiResponse {
    utc_offset: Option<String>,
}

impl IpApiLookup {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    async fn fetch(&self) -> Result<FixedOffset, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<IpApiResponse>()
            .await?;
        let raw = response.utc_offset.ok_or(LookupError::MissingOffset)?;
        debug!("Lookup answered with offset {raw:?}");
        parse_utc_offset(&raw)
    }
}

#[async_trait]
impl OffsetLookup for IpApiLookup {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn utc_offset(&self) -> Result<FixedOffset, LookupError> {
        tokio::time::timeout(self.timeout, self.fetch())
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))?
    }
}

/// Accepts `+HHMM` and `+HH:MM` (sign mandatory).
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, LookupError> {
    let invalid = || LookupError::InvalidOffset(raw.to_string());
    let raw_trimmed = raw.trim();

    let (sign, rest) = match raw_trimmed.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let digits = rest.replace(':', "");
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
