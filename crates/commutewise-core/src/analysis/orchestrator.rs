//! Sequential, paced sampling of a travel time provider across a window.
//!
//! Calls run one at a time in slot-then-model order, each followed by a
//! fixed pacing delay whatever its outcome. Each call is raced against a
//! timeout. The call itself runs on its own task and is never aborted: once
//! the timeout wins, a late success is dropped with the detached task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::aggregate::{aggregate, SlotSamples};
use super::{AnalysisMode, AnalysisRequest, AnalysisResult, ModelSamples};
use crate::departure::{future_departures, DepartureInstant};
use crate::error::{CoreError, ProviderError, Result};
use crate::provider::{TrafficModel, TravelEstimate, TravelQuery, TravelTimeProvider};

const GENERIC_FAILURE: &str =
    "unable to reach the travel time service, check your connection and try again";

/// Outcome of one raced provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Ok(TravelEstimate),
    TimedOut,
    ProviderFailed(ProviderError),
}

impl CallOutcome {
    pub fn duration(&self) -> Option<u32> {
        match self {
            CallOutcome::Ok(estimate) => Some(estimate.duration),
            _ => None,
        }
    }
}

/// Pacing and timeout budget for a batch.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay after every provider call.
    pub pacing: Duration,
    /// How long to wait on one call.
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(1000),
            call_timeout: Duration::from_secs(15),
        }
    }
}

/// Progress after each provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

type ProgressHook = Box<dyn Fn(Progress) + Send + Sync>;

/// Drives one analysis against a provider.
pub struct Orchestrator {
    provider: Arc<dyn TravelTimeProvider>,
    config: OrchestratorConfig,
    on_progress: Option<ProgressHook>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn TravelTimeProvider>) -> Self {
        Self::with_config(provider, OrchestratorConfig::default())
    }

    pub fn with_config(provider: Arc<dyn TravelTimeProvider>, config: OrchestratorConfig) -> Self {
        Self {
            provider,
            config,
            on_progress: None,
        }
    }

    /// Report progress after every call.
    pub fn with_progress(mut self, hook: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(hook));
        self
    }

    /// Analyze with "now" taken from the wall clock.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        self.analyze_at(request, Utc::now()).await
    }

    /// Analyze treating `now` as the eligibility boundary for every slot.
    ///
    /// # Errors
    /// `InvalidWindow`/`InvalidInterval` for a bad window, `NoFutureSlots`
    /// when the whole window has elapsed, `RateLimited` as soon as the proxy
    /// refuses a call, `AllSlotsFailed` when no slot produced a usable sample.
    pub async fn analyze_at(
        &self,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let slots = request.window.slots(request.interval_minutes)?;
        let departures = future_departures(&request.utc_offset, request.date, &slots, now);
        if departures.is_empty() {
            return Err(CoreError::NoFutureSlots {
                period: request.period.to_string(),
                window: request.window.to_string(),
                date: request.date,
            });
        }

        let models = request.mode.models();
        let total = departures.len() * models.len();
        info!(
            period = %request.period,
            window = %request.window,
            date = %request.date,
            slots = departures.len(),
            calls = total,
            provider = self.provider.name(),
            "starting commute analysis"
        );

        let mut batch = Batch {
            last_error: None,
            completed: 0,
            total,
        };

        let samples = match request.mode {
            AnalysisMode::Single(model) => {
                let mut kept = Vec::new();
                for departure in departures {
                    let outcome = self.call(request, &departure, model, &mut batch).await;
                    halt_on_rate_limit(&outcome)?;
                    if let Some(secs) = outcome.duration() {
                        kept.push((departure, secs));
                    }
                }
                SlotSamples::Single(kept)
            }
            AnalysisMode::CompareAll => {
                let mut kept = Vec::new();
                for departure in departures {
                    let mut pairs = Vec::with_capacity(models.len());
                    for model in &models {
                        let outcome = self.call(request, &departure, *model, &mut batch).await;
                        halt_on_rate_limit(&outcome)?;
                        if let Some(secs) = outcome.duration() {
                            pairs.push((*model, secs));
                        }
                    }
                    if let Some(samples) = ModelSamples::from_pairs(pairs) {
                        kept.push((departure, samples));
                    }
                }
                SlotSamples::CompareAll(kept)
            }
        };

        if samples.is_empty() {
            let cause = batch
                .last_error
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            warn!(period = %request.period, %cause, "every departure failed");
            return Err(CoreError::AllSlotsFailed { cause });
        }

        // compare-all can keep slots yet have no best_guess to rank on
        let result = aggregate(samples).map_err(|err| match (err, batch.last_error) {
            (CoreError::AllSlotsFailed { .. }, Some(cause)) => CoreError::AllSlotsFailed { cause },
            (err, _) => err,
        })?;
        info!(
            period = %request.period,
            kept = result.slots.len(),
            optimal = %result.optimal().departure.slot,
            savings_minutes = result.savings_minutes,
            "commute analysis finished"
        );
        Ok(result)
    }

    async fn call(
        &self,
        request: &AnalysisRequest,
        departure: &DepartureInstant,
        model: TrafficModel,
        batch: &mut Batch,
    ) -> CallOutcome {
        let query = TravelQuery {
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            departure: departure.at,
            traffic_model: Some(model),
        };
        let outcome = race(Arc::clone(&self.provider), query, self.config.call_timeout).await;

        match &outcome {
            CallOutcome::Ok(estimate) => {
                debug!(slot = %departure.slot, %model, duration = estimate.duration, "provider call ok");
            }
            CallOutcome::TimedOut => {
                let message = format!(
                    "request timed out after {}s",
                    self.config.call_timeout.as_secs()
                );
                warn!(slot = %departure.slot, %model, "{message}");
                batch.last_error = Some(message);
            }
            CallOutcome::ProviderFailed(err) => {
                warn!(slot = %departure.slot, %model, error = %err, "provider call failed");
                batch.last_error = Some(err.to_string());
            }
        }

        tokio::time::sleep(self.config.pacing).await;

        batch.completed += 1;
        if let Some(hook) = &self.on_progress {
            hook(Progress {
                completed: batch.completed,
                total: batch.total,
            });
        }
        outcome
    }
}

/// A refusal from the proxy's governor ends the batch: every later call
/// would be refused too.
fn halt_on_rate_limit(outcome: &CallOutcome) -> Result<()> {
    match outcome {
        CallOutcome::ProviderFailed(ProviderError::RateLimited {
            message,
            retry_after_secs,
        }) => {
            warn!(retry_after_secs = ?retry_after_secs, "rate limited, stopping analysis");
            Err(CoreError::RateLimited {
                message: message.clone(),
                retry_after_secs: *retry_after_secs,
            })
        }
        _ => Ok(()),
    }
}

struct Batch {
    last_error: Option<String>,
    completed: usize,
    total: usize,
}

/// Race one provider call against `budget`.
pub async fn race(
    provider: Arc<dyn TravelTimeProvider>,
    query: TravelQuery,
    budget: Duration,
) -> CallOutcome {
    let handle = tokio::spawn(async move { provider.estimate(query).await });
    match tokio::time::timeout(budget, handle).await {
        Ok(Ok(Ok(estimate))) => CallOutcome::Ok(estimate),
        Ok(Ok(Err(err))) => CallOutcome::ProviderFailed(err),
        Ok(Err(join_err)) => CallOutcome::ProviderFailed(ProviderError::Server(format!(
            "provider task failed: {join_err}"
        ))),
        Err(_elapsed) => CallOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Slow {
        delay: Duration,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TravelTimeProvider for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn estimate(&self, _query: TravelQuery) -> std::result::Result<TravelEstimate, ProviderError> {
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(TravelEstimate {
                duration: 600,
                duration_text: "10 mins".into(),
                distance: 5000,
                distance_text: "5 km".into(),
            })
        }
    }

    fn query() -> TravelQuery {
        TravelQuery {
            origin: "A".into(),
            destination: "B".into(),
            departure: Utc::now(),
            traffic_model: Some(TrafficModel::BestGuess),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fast_call_wins_race() {
        let finished = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Slow {
            delay: Duration::from_secs(1),
            finished: Arc::clone(&finished),
        });
        let outcome = race(provider, query(), Duration::from_secs(15)).await;
        assert_eq!(outcome.duration(), Some(600));
    }

    #[tokio::test(start_paused = true)]
    async fn late_call_times_out_and_keeps_running() {
        let finished = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(Slow {
            delay: Duration::from_secs(20),
            finished: Arc::clone(&finished),
        });
        let outcome = race(provider, query(), Duration::from_secs(15)).await;
        assert_eq!(outcome, CallOutcome::TimedOut);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        // the detached call still completes; its result goes nowhere
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
