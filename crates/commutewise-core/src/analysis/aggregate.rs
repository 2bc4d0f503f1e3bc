//! Ranking of raw per-slot samples.
//!
//! Single-model mode ranks on the one duration and classifies each slot's
//! traffic level against the window minimum. Compare-all mode ranks on
//! `best_guess` only, while the chart bounds span every model's samples.
//! A slot whose `optimistic` sample is the global minimum can therefore lose
//! to another slot's `best_guess`; that asymmetry is intended.

use crate::departure::DepartureInstant;
use crate::error::{CoreError, Result};

use super::{AnalysisResult, ModelSamples, SlotReading, SlotResult, TrafficLevel};

/// Kept slots as produced by the orchestrator, in slot order.
#[derive(Debug, Clone)]
pub enum SlotSamples {
    Single(Vec<(DepartureInstant, u32)>),
    CompareAll(Vec<(DepartureInstant, ModelSamples)>),
}

impl SlotSamples {
    pub fn len(&self) -> usize {
        match self {
            SlotSamples::Single(slots) => slots.len(),
            SlotSamples::CompareAll(slots) => slots.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rank `samples` into an [`AnalysisResult`].
///
/// # Errors
/// `AllSlotsFailed` when there is nothing to rank: no slots at all, or in
/// compare-all mode no slot with a `best_guess` sample.
pub fn aggregate(samples: SlotSamples) -> Result<AnalysisResult> {
    match samples {
        SlotSamples::Single(slots) => aggregate_single(slots),
        SlotSamples::CompareAll(slots) => aggregate_compare_all(slots),
    }
}

fn aggregate_single(slots: Vec<(DepartureInstant, u32)>) -> Result<AnalysisResult> {
    let durations = slots.iter().map(|(_, secs)| *secs);
    let (min_duration, max_duration) = match (durations.clone().min(), durations.max()) {
        (Some(min), Some(max)) => (min, max),
        _ => return Err(nothing_to_rank("no departure produced a travel time")),
    };

    let optimal_index = first_minimum(slots.iter().map(|(_, secs)| Some(*secs)))
        .ok_or_else(|| nothing_to_rank("no departure produced a travel time"))?;
    let optimal_duration = slots[optimal_index].1;

    let results = slots
        .into_iter()
        .enumerate()
        .map(|(i, (departure, duration))| SlotResult {
            departure,
            reading: SlotReading::Single {
                duration,
                traffic_level: classify(duration, min_duration),
            },
            is_optimal: i == optimal_index,
        })
        .collect();

    Ok(AnalysisResult {
        slots: results,
        optimal_index,
        min_duration,
        max_duration,
        savings_minutes: savings_minutes(max_duration, optimal_duration),
        is_compare_all: false,
    })
}

fn aggregate_compare_all(slots: Vec<(DepartureInstant, ModelSamples)>) -> Result<AnalysisResult> {
    let optimal_index = first_minimum(slots.iter().map(|(_, samples)| samples.best_guess()))
        .ok_or_else(|| nothing_to_rank("no departure produced a best_guess travel time"))?;
    let optimal_duration = slots[optimal_index]
        .1
        .best_guess()
        .ok_or_else(|| nothing_to_rank("no departure produced a best_guess travel time"))?;

    let all_values = || {
        slots
            .iter()
            .flat_map(|(_, samples)| samples.present().map(|(_, secs)| secs))
    };
    // optimal has a best_guess, so both extrema exist
    let min_duration = all_values().min().unwrap_or(optimal_duration);
    let max_duration = all_values().max().unwrap_or(optimal_duration);

    let results = slots
        .into_iter()
        .enumerate()
        .map(|(i, (departure, samples))| SlotResult {
            departure,
            reading: SlotReading::Compare(samples),
            is_optimal: i == optimal_index,
        })
        .collect();

    Ok(AnalysisResult {
        slots: results,
        optimal_index,
        min_duration,
        max_duration,
        savings_minutes: savings_minutes(max_duration, optimal_duration),
        is_compare_all: true,
    })
}

/// Index of the smallest present value; the earliest wins ties.
fn first_minimum(values: impl Iterator<Item = Option<u32>>) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, value) in values.enumerate() {
        if let Some(secs) = value {
            if best.map_or(true, |(_, current)| secs < current) {
                best = Some((i, secs));
            }
        }
    }
    best.map(|(i, _)| i)
}

fn classify(duration: u32, min_duration: u32) -> TrafficLevel {
    if min_duration == 0 {
        return TrafficLevel::Low;
    }
    TrafficLevel::from_ratio(duration as f64 / min_duration as f64)
}

fn savings_minutes(max_duration: u32, optimal_duration: u32) -> i64 {
    ((max_duration as f64 - optimal_duration as f64) / 60.0).round() as i64
}

fn nothing_to_rank(cause: &str) -> CoreError {
    CoreError::AllSlotsFailed {
        cause: cause.to_string(),
    }
}
