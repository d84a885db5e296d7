use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;

use crate::config::redact;
use crate::error::ClientError;
use crate::record::FlagRecord;
use crate::resolve::ResolvedConnection;

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the remote flag service exposes. Upsert is the only mutation
/// besides delete; partial updates are built on top of it.
pub trait FlagApi {
    /// Create the record, or replace it entirely if `(key, environment)` exists.
    fn upsert(&self, record: &FlagRecord) -> Result<(), ClientError>;

    /// All records of one environment.
    fn list_by_environment(&self, environment: &str) -> Result<Vec<FlagRecord>, ClientError>;

    fn delete(&self, key: &str, environment: &str) -> Result<(), ClientError>;
}

/// Blocking HTTP client for the flag service REST API.
#[derive(Clone)]
pub struct HttpFlagClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl fmt::Debug for HttpFlagClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFlagClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl HttpFlagClient {
    pub fn new(connection: &ResolvedConnection) -> Result<Self, ClientError> {
        let base_url = Url::parse(&connection.base_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidBaseUrl(connection.base_url.clone()))?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("flagops/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ClientError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            api_key: connection.api_key.clone(),
        })
    }

    /// `{base}/api/v1/flags`, plus the key as one encoded path segment.
    fn flags_url(&self, key: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "v1", "flags"]);
            if let Some(key) = key {
                segments.push(key);
            }
        }
        url
    }

    /// Attach credentials, send, and turn non-2xx statuses into
    /// `ClientError::Remote` carrying the raw body.
    fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, ClientError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        tracing::debug!(%url, status = status.as_u16(), "response");
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl FlagApi for HttpFlagClient {
    fn upsert(&self, record: &FlagRecord) -> Result<(), ClientError> {
        let url = self.flags_url(None);
        tracing::debug!(%url, key = %record.key, env = %record.environment, "PUT flag");
        self.send(self.http.put(url.clone()).json(record), &url)?;
        Ok(())
    }

    fn list_by_environment(&self, environment: &str) -> Result<Vec<FlagRecord>, ClientError> {
        let url = self.flags_url(None);
        tracing::debug!(%url, env = %environment, "GET flags");
        let response = self.send(
            self.http.get(url.clone()).query(&[("environment", environment)]),
            &url,
        )?;
        response.json().map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn delete(&self, key: &str, environment: &str) -> Result<(), ClientError> {
        let url = self.flags_url(Some(key));
        tracing::debug!(%url, env = %environment, "DELETE flag");
        self.send(
            self.http.delete(url.clone()).query(&[("environment", environment)]),
            &url,
        )?;
        Ok(())
    }
}
