//! `POST /api/directions`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use commutewise_core::{ConfigError, CoreError, Decision, TrafficModel, TravelEstimate, TravelQuery};

use crate::{ApiError, AppState};

/// Environment variable holding the upstream credential.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Incoming body; every field optional so missing ones produce a 400
/// with a useful message instead of a generic rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsBody {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<String>,
    pub traffic_model: Option<String>,
}

impl DirectionsBody {
    pub fn into_query(self) -> Result<TravelQuery, ApiError> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (origin, destination, departure_time) = match (
            present(self.origin),
            present(self.destination),
            present(self.departure_time),
        ) {
            (Some(o), Some(d), Some(t)) => (o, d, t),
            _ => {
                return Err(ApiError::BadRequest(
                    "Missing required fields: origin, destination, departureTime".to_string(),
                ))
            }
        };

        let departure = DateTime::parse_from_rfc3339(&departure_time)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| {
                ApiError::BadRequest(format!(
                    "departureTime must be an ISO-8601 timestamp, got '{departure_time}'"
                ))
            })?;

        let traffic_model = self
            .traffic_model
            .map(|m| m.parse::<TrafficModel>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(TravelQuery {
            origin,
            destination,
            departure,
            traffic_model,
        })
    }
}

/// Client identity: first `X-Forwarded-For` hop, else the peer address.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Forward one travel time request after the governor allows it.
pub async fn directions(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<DirectionsBody>, JsonRejection>,
) -> Result<Json<TravelEstimate>, ApiError> {
    let client = client_id(&headers, peer.map(|ConnectInfo(addr)| addr));
    if let Decision::Denied(denial) = state.governor.check(&client) {
        return Err(CoreError::GovernorDenied(denial).into());
    }

    let Json(body) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let query = body.into_query()?;

    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| ConfigError::MissingKey(API_KEY_ENV.to_string()))?;

    debug!(
        client = %client,
        departure = %query.departure,
        model = ?query.traffic_model,
        "forwarding directions request"
    );
    let estimate = provider.estimate(query).await?;
    Ok(Json(estimate))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn body(origin: &str, destination: &str, departure: &str) -> DirectionsBody {
        DirectionsBody {
            origin: Some(origin.into()),
            destination: Some(destination.into()),
            departure_time: Some(departure.into()),
            traffic_model: None,
        }
    }

    #[test]
    fn valid_body_becomes_query() {
        let mut b = body("A", "B", "2026-03-10T08:15:00+01:00");
        b.traffic_model = Some("optimistic".into());
        let query = b.into_query().unwrap();
        assert_eq!(query.departure.to_rfc3339(), "2026-03-10T07:15:00+00:00");
        assert_eq!(query.traffic_model, Some(TrafficModel::Optimistic));
    }

    #[test]
    fn blank_fields_are_missing() {
        let err = body("A", "  ", "2026-03-10T08:15:00Z").into_query().unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("Missing")));
        assert!(DirectionsBody::default().into_query().is_err());
    }

    #[test]
    fn bad_timestamp_and_model_are_rejected() {
        assert!(body("A", "B", "tomorrow").into_query().is_err());
        let mut b = body("A", "B", "2026-03-10T08:15:00Z");
        b.traffic_model = Some("typical".into());
        assert!(b.into_query().is_err());
    }

    #[test]
    fn client_id_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.7:5555".parse().unwrap();
        assert_eq!(client_id(&headers, Some(peer)), "10.0.0.7");
        assert_eq!(client_id(&headers, None), "anonymous");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_id(&headers, Some(peer)), "203.0.113.9");
    }
}
