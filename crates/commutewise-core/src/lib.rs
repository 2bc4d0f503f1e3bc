//! # Commutewise Core Library
//!
//! This library finds the best departure time for a fixed commute by
//! sampling a travel time prediction service across a time window and
//! picking the sample with the lowest predicted duration. The CLI and the
//! rate-limited proxy are thin layers over the same core.
//!
//! ## Architecture
//!
//! - **Slots**: candidate times-of-day on a fixed interval grid
//! - **Departures**: slots bound to a date, filtered to the future
//! - **Providers**: travel time sources (Google Directions, the proxy)
//! - **Analysis**: paced sequential sampling and ranking of the results
//! - **Governor**: per-client request caps in front of the provider
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Orchestrator`]: runs one analysis against a provider
//! - [`AnalysisResult`]: ranked slots, optimal slot, chart bounds, savings
//! - [`RequestGovernor`]: sliding-window and daily request caps
//! - [`Config`]: application configuration management

pub mod analysis;
pub mod departure;
pub mod error;
pub mod governor;
pub mod provider;
pub mod slots;
pub mod storage;

pub use analysis::{
    AnalysisMode, AnalysisRequest, AnalysisResult, CallOutcome, ChartScale, ModelSamples,
    Orchestrator, OrchestratorConfig, Period, SlotReading, SlotResult, TrafficLevel,
};
pub use departure::DepartureInstant;
pub use error::{ConfigError, CoreError, ProviderError};
pub use governor::{Decision, Denial, DenialReason, GovernorConfig, RequestGovernor};
pub use provider::{
    GoogleDirectionsProvider, ProxyProvider, TrafficModel, TravelEstimate, TravelQuery,
    TravelTimeProvider,
};
pub use slots::{TimeSlot, TimeWindow};
pub use storage::Config;
