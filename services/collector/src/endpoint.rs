//! Transport to the downstream observation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DeliveryError, Result};

/// Result codes returned by the observation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT_SAVED")]
    NotSaved,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "NODECODER")]
    NoDecoder,
    #[serde(rename = "DECODE_ERROR")]
    DecodeError,
}

/// Answer to one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub result: ResponseCode,
    #[serde(default)]
    pub message: String,
}

impl SubmitResponse {
    pub fn new(result: ResponseCode, message: impl Into<String>) -> Self {
        Self {
            result,
            message: message.into(),
        }
    }
}

/// Submission body sent over HTTP.
#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    decoder: &'a str,
    data: &'a str,
}

/// A service that accepts observation reports.
///
/// `Err` means the service could not be reached at all; any answer from
/// the service, including failures, is an `Ok` response.
#[async_trait]
pub trait ObservationEndpoint: Send + Sync {
    async fn submit(&self, payload: &str, decoder_key: &str) -> Result<SubmitResponse>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Observation service reached by `POST`ing JSON.
pub struct HttpEndpoint {
    client: Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ObservationEndpoint for HttpEndpoint {
    async fn submit(&self, payload: &str, decoder_key: &str) -> Result<SubmitResponse> {
        let request = SubmitRequest {
            decoder: decoder_key,
            data: payload,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::LinkDown {
                endpoint: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            debug!(endpoint = %self.url, status = %status, "Non-success HTTP status");
            return Ok(SubmitResponse::new(
                ResponseCode::Error,
                format!("HTTP status {}", status),
            ));
        }

        match response.json::<SubmitResponse>().await {
            Ok(answer) => Ok(answer),
            Err(e) if e.is_timeout() => Err(DeliveryError::LinkDown {
                endpoint: self.url.clone(),
                message: e.to_string(),
            }),
            Err(e) => Ok(SubmitResponse::new(
                ResponseCode::Error,
                format!("unreadable response: {}", e),
            )),
        }
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Fan-out over several endpoints.
///
/// The first endpoint is authoritative. The others get the same
/// submission and their failures are only logged.
pub struct MultiEndpoint {
    endpoints: Vec<Box<dyn ObservationEndpoint>>,
}

impl MultiEndpoint {
    pub fn new(endpoints: Vec<Box<dyn ObservationEndpoint>>) -> Self {
        Self { endpoints }
    }

    /// Build HTTP endpoints from URLs.
    pub fn http(urls: &[String], timeout: Duration) -> anyhow::Result<Self> {
        let endpoints = urls
            .iter()
            .map(|url| {
                HttpEndpoint::new(url.clone(), timeout)
                    .map(|e| Box::new(e) as Box<dyn ObservationEndpoint>)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(endpoints))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait]
impl ObservationEndpoint for MultiEndpoint {
    async fn submit(&self, payload: &str, decoder_key: &str) -> Result<SubmitResponse> {
        let Some((primary, secondary)) = self.endpoints.split_first() else {
            return Err(DeliveryError::NoEndpoint);
        };

        let answer = primary.submit(payload, decoder_key).await;

        for endpoint in secondary {
            match endpoint.submit(payload, decoder_key).await {
                Ok(resp) if resp.result == ResponseCode::Ok => {}
                Ok(resp) => warn!(
                    endpoint = %endpoint.name(),
                    result = ?resp.result,
                    message = %resp.message,
                    "Secondary endpoint did not accept report"
                ),
                Err(e) => warn!(endpoint = %endpoint.name(), error = %e, "Secondary endpoint failed"),
            }
        }

        answer
    }

    fn name(&self) -> &str {
        self.endpoints
            .first()
            .map(|e| e.name())
            .unwrap_or("<none>")
    }
}
