//! Google Directions API provider.
//!
//! Requests a driving route with `departure_time` and `traffic_model` so the
//! response carries `duration_in_traffic`. The plain `duration` is used when
//! the service omits the traffic-aware value.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::traits::TravelTimeProvider;
use super::{TravelEstimate, TravelQuery};
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const DIRECTIONS_PATH: &str = "/maps/api/directions/json";

/// Google Directions API client.
pub struct GoogleDirectionsProvider {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GoogleDirectionsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point at a different host, e.g. a local mock server.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn query_params(&self, query: &TravelQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("origin", query.origin.clone()),
            ("destination", query.destination.clone()),
            ("mode", "driving".to_string()),
            ("departure_time", query.departure.timestamp().to_string()),
        ];
        if let Some(model) = query.traffic_model {
            params.push(("traffic_model", model.as_str().to_string()));
        }
        params.push(("key", self.api_key.clone()));
        params
    }
}

#[async_trait]
impl TravelTimeProvider for GoogleDirectionsProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn estimate(&self, query: TravelQuery) -> Result<TravelEstimate, ProviderError> {
        let url = format!("{}{}", self.base_url, DIRECTIONS_PATH);
        let response = self
            .http
            .get(&url)
            .query(&self.query_params(&query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Server(format!(
                "directions API returned HTTP {}",
                response.status()
            )));
        }

        let body: DirectionsResponse = response.json().await?;
        parse_directions(body)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    duration: TextValue,
    #[serde(default)]
    duration_in_traffic: Option<TextValue>,
    distance: TextValue,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    value: u32,
    text: String,
}

/// Map a Directions API body onto an estimate or a provider error.
pub(crate) fn parse_directions(body: DirectionsResponse) -> Result<TravelEstimate, ProviderError> {
    let message = body
        .error_message
        .clone()
        .unwrap_or_else(|| format!("status {}", body.status));

    match body.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => {
            return Err(ProviderError::NoRoute(
                body.error_message
                    .unwrap_or_else(|| "no route between these addresses".to_string()),
            ))
        }
        "REQUEST_DENIED" => return Err(ProviderError::Denied(message)),
        other => {
            return Err(ProviderError::Rejected {
                status: other.to_string(),
                message,
            })
        }
    }

    let leg = body
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.legs.into_iter().next())
        .ok_or_else(|| ProviderError::NoRoute("response contained no route legs".to_string()))?;

    let duration = leg.duration_in_traffic.unwrap_or(leg.duration);
    Ok(TravelEstimate {
        duration: duration.value,
        duration_text: duration.text,
        distance: leg.distance.value,
        distance_text: leg.distance.text,
    })
}
