//! Commute analysis engine.
//!
//! An [`AnalysisRequest`] names a window, a date and a mode. The
//! [`Orchestrator`] samples the provider across the window and the
//! aggregator ranks what came back into an [`AnalysisResult`].

pub mod aggregate;
pub mod chart;
pub mod orchestrator;

pub use aggregate::{aggregate, SlotSamples};
pub use chart::ChartScale;
pub use orchestrator::{CallOutcome, Orchestrator, OrchestratorConfig, Progress};

use std::fmt;

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::departure::DepartureInstant;
use crate::provider::TrafficModel;
use crate::slots::TimeWindow;

/// Which commute window is being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Morning,
    Evening,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Morning => f.write_str("morning"),
            Period::Evening => f.write_str("evening"),
        }
    }
}

/// Single-model or compare-all sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Single(TrafficModel),
    CompareAll,
}

impl AnalysisMode {
    /// Models queried per slot, in query order.
    pub fn models(&self) -> Vec<TrafficModel> {
        match self {
            AnalysisMode::Single(model) => vec![*model],
            AnalysisMode::CompareAll => TrafficModel::ALL.to_vec(),
        }
    }

    pub fn is_compare_all(&self) -> bool {
        matches!(self, AnalysisMode::CompareAll)
    }
}

/// Everything one analysis needs, supplied by the caller.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub origin: String,
    pub destination: String,
    pub period: Period,
    pub window: TimeWindow,
    pub interval_minutes: u32,
    pub date: NaiveDate,
    /// Offset the window's times-of-day are expressed in.
    pub utc_offset: FixedOffset,
    pub mode: AnalysisMode,
}

/// Traffic classification relative to the fastest slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLevel {
    Low,
    Medium,
    High,
}

impl TrafficLevel {
    /// `ratio` is duration divided by the window minimum.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 1.2 {
            TrafficLevel::Low
        } else if ratio < 1.4 {
            TrafficLevel::Medium
        } else {
            TrafficLevel::High
        }
    }
}

impl fmt::Display for TrafficLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficLevel::Low => f.write_str("low"),
            TrafficLevel::Medium => f.write_str("medium"),
            TrafficLevel::High => f.write_str("high"),
        }
    }
}

/// Per-model durations for one slot in compare-all mode.
///
/// At least one model is always present: [`ModelSamples::new`] refuses to
/// build an all-absent value, so a kept slot can never be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSamples {
    optimistic: Option<u32>,
    best_guess: Option<u32>,
    pessimistic: Option<u32>,
}

impl ModelSamples {
    pub fn new(
        optimistic: Option<u32>,
        best_guess: Option<u32>,
        pessimistic: Option<u32>,
    ) -> Option<Self> {
        if optimistic.is_none() && best_guess.is_none() && pessimistic.is_none() {
            return None;
        }
        Some(Self {
            optimistic,
            best_guess,
            pessimistic,
        })
    }

    /// Build from `(model, duration)` pairs; later duplicates overwrite earlier ones.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (TrafficModel, u32)>) -> Option<Self> {
        let (mut optimistic, mut best_guess, mut pessimistic) = (None, None, None);
        for (model, secs) in pairs {
            match model {
                TrafficModel::Optimistic => optimistic = Some(secs),
                TrafficModel::BestGuess => best_guess = Some(secs),
                TrafficModel::Pessimistic => pessimistic = Some(secs),
            }
        }
        Self::new(optimistic, best_guess, pessimistic)
    }

    pub fn get(&self, model: TrafficModel) -> Option<u32> {
        match model {
            TrafficModel::Optimistic => self.optimistic,
            TrafficModel::BestGuess => self.best_guess,
            TrafficModel::Pessimistic => self.pessimistic,
        }
    }

    pub fn best_guess(&self) -> Option<u32> {
        self.best_guess
    }

    /// Present durations in optimistic → best_guess → pessimistic order.
    pub fn present(&self) -> impl Iterator<Item = (TrafficModel, u32)> + '_ {
        TrafficModel::ALL
            .into_iter()
            .filter_map(|model| self.get(model).map(|secs| (model, secs)))
    }
}

/// What was measured for a kept slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotReading {
    Single {
        duration: u32,
        traffic_level: TrafficLevel,
    },
    Compare(ModelSamples),
}

impl SlotReading {
    /// The duration used to rank this slot.
    pub fn ranking_duration(&self) -> Option<u32> {
        match self {
            SlotReading::Single { duration, .. } => Some(*duration),
            SlotReading::Compare(samples) => samples.best_guess(),
        }
    }
}

/// One eligible departure and its reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotResult {
    pub departure: DepartureInstant,
    pub reading: SlotReading,
    pub is_optimal: bool,
}

/// Ranked outcome of one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Kept slots in ascending time-of-day order.
    pub slots: Vec<SlotResult>,
    pub optimal_index: usize,
    /// Chart lower bound in seconds.
    pub min_duration: u32,
    /// Chart upper bound in seconds.
    pub max_duration: u32,
    pub savings_minutes: i64,
    pub is_compare_all: bool,
}

impl AnalysisResult {
    pub fn optimal(&self) -> &SlotResult {
        &self.slots[self.optimal_index]
    }

    pub fn chart_scale(&self) -> ChartScale {
        ChartScale::new(self.min_duration, self.max_duration)
    }
}
