//! Client for the rate-limited `POST /api/directions` proxy.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::TravelTimeProvider;
use super::{TrafficModel, TravelEstimate, TravelQuery};
use crate::error::ProviderError;

/// JSON body accepted by the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    /// ISO-8601 departure time.
    pub departure_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_model: Option<TrafficModel>,
}

impl From<&TravelQuery> for DirectionsRequest {
    fn from(query: &TravelQuery) -> Self {
        Self {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            departure_time: query.departure.to_rfc3339(),
            traffic_model: query.traffic_model,
        }
    }
}

/// Error body returned by the proxy for every non-200 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Provider that forwards queries to a commutewise proxy.
pub struct ProxyProvider {
    http: Client,
    endpoint: String,
}

impl ProxyProvider {
    /// `base_url` is the proxy root, e.g. `http://127.0.0.1:8787`. A path
    /// prefix such as `https://host/commute` is kept.
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let root = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let endpoint = url::Url::parse(&root)
            .and_then(|base| base.join("api/directions"))
            .map_err(|e| ProviderError::Transport(format!("invalid proxy URL '{base_url}': {e}")))?;
        Ok(Self {
            http: Client::new(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TravelTimeProvider for ProxyProvider {
    fn name(&self) -> &str {
        "proxy"
    }

    async fn estimate(&self, query: TravelQuery) -> Result<TravelEstimate, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&DirectionsRequest::from(&query))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response.json::<TravelEstimate>().await?);
        }

        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("HTTP {status}"),
        };
        Err(classify_status(status, message, retry_after_secs))
    }
}

fn classify_status(
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            message,
            retry_after_secs,
        },
        StatusCode::BAD_REQUEST => ProviderError::Rejected {
            status: status.as_u16().to_string(),
            message,
        },
        s if s.is_server_error() => ProviderError::Server(message),
        s => ProviderError::Rejected {
            status: s.as_u16().to_string(),
            message,
        },
    }
}
