//! Travel time providers.
//!
//! The engine only needs a predicted duration for an address pair at a
//! departure instant. [`GoogleDirectionsProvider`] talks to the upstream
//! service directly and is what the proxy uses; [`ProxyProvider`] talks to
//! the rate-limited proxy and is what the CLI uses.

pub mod google;
pub mod proxy;
pub mod traits;

pub use google::GoogleDirectionsProvider;
pub use proxy::ProxyProvider;
pub use traits::TravelTimeProvider;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named traffic prediction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficModel {
    Optimistic,
    BestGuess,
    Pessimistic,
}

impl TrafficModel {
    /// Query order in compare-all mode.
    pub const ALL: [TrafficModel; 3] = [
        TrafficModel::Optimistic,
        TrafficModel::BestGuess,
        TrafficModel::Pessimistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficModel::Optimistic => "optimistic",
            TrafficModel::BestGuess => "best_guess",
            TrafficModel::Pessimistic => "pessimistic",
        }
    }
}

impl fmt::Display for TrafficModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "optimistic" => Ok(TrafficModel::Optimistic),
            "best_guess" => Ok(TrafficModel::BestGuess),
            "pessimistic" => Ok(TrafficModel::Pessimistic),
            other => Err(ConfigError::InvalidValue {
                key: "traffic_model".to_string(),
                message: format!("unknown traffic model '{other}'"),
            }),
        }
    }
}

/// One provider request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelQuery {
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub traffic_model: Option<TrafficModel>,
}

/// A successful provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelEstimate {
    /// Predicted duration in seconds.
    pub duration: u32,
    pub duration_text: String,
    /// Route distance in meters.
    pub distance: u32,
    pub distance_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_model_wire_names() {
        for model in TrafficModel::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.as_str()));
            assert_eq!(model.as_str().parse::<TrafficModel>().unwrap(), model);
        }
        assert!("typical".parse::<TrafficModel>().is_err());
    }

    #[test]
    fn estimate_uses_camel_case() {
        let estimate = TravelEstimate {
            duration: 1260,
            duration_text: "21 mins".into(),
            distance: 15400,
            distance_text: "15.4 km".into(),
        };
        let json = serde_json::to_value(&estimate).unwrap();
        assert_eq!(json["durationText"], "21 mins");
        assert_eq!(json["distance"], 15400);
    }
}
