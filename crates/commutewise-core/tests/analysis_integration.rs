//! Integration tests for the analysis engine against a scripted provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use parking_lot::Mutex;

use commutewise_core::analysis::Progress;
use commutewise_core::{
    AnalysisMode, AnalysisRequest, CoreError, Orchestrator, OrchestratorConfig, Period,
    ProviderError, SlotReading, TimeWindow, TrafficLevel, TrafficModel, TravelEstimate,
    TravelQuery, TravelTimeProvider,
};

#[derive(Clone)]
enum Script {
    Secs(u32),
    Fail(ProviderError),
    Hang,
}

/// Replies per (HH:MM, model); anything unscripted fails with NoRoute.
#[derive(Default)]
struct ScriptedProvider {
    replies: HashMap<(String, TrafficModel), Script>,
    calls: Mutex<Vec<(String, TrafficModel)>>,
}

impl ScriptedProvider {
    fn reply(mut self, time: &str, model: TrafficModel, script: Script) -> Self {
        self.replies.insert((time.to_string(), model), script);
        self
    }

    fn calls(&self) -> Vec<(String, TrafficModel)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TravelTimeProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn estimate(&self, query: TravelQuery) -> Result<TravelEstimate, ProviderError> {
        let time = query.departure.format("%H:%M").to_string();
        let model = query.traffic_model.unwrap_or(TrafficModel::BestGuess);
        self.calls.lock().push((time.clone(), model));

        match self.replies.get(&(time.clone(), model)).cloned() {
            Some(Script::Secs(secs)) => Ok(TravelEstimate {
                duration: secs,
                duration_text: format!("{} mins", secs / 60),
                distance: 12_000,
                distance_text: "12 km".into(),
            }),
            Some(Script::Fail(err)) => Err(err),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Transport("hung".into()))
            }
            None => Err(ProviderError::NoRoute(format!("nothing scripted for {time}"))),
        }
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn early_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 5, 0, 0).unwrap()
}

fn request(start: &str, end: &str, mode: AnalysisMode) -> AnalysisRequest {
    AnalysisRequest {
        origin: "12 Elm St".into(),
        destination: "400 Market St".into(),
        period: Period::Morning,
        window: TimeWindow::parse(start, end).unwrap(),
        interval_minutes: 15,
        date: date(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        mode,
    }
}

fn orchestrator(provider: Arc<ScriptedProvider>) -> Orchestrator {
    Orchestrator::with_config(
        provider,
        OrchestratorConfig {
            pacing: Duration::from_millis(500),
            call_timeout: Duration::from_secs(15),
        },
    )
}

const BEST: TrafficModel = TrafficModel::BestGuess;

#[tokio::test(start_paused = true)]
async fn single_mode_ranks_window() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", BEST, Script::Secs(600))
            .reply("07:15", BEST, Script::Secs(780))
            .reply("07:30", BEST, Script::Secs(1000)),
    );
    let result = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "07:30", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap();

    assert_eq!(result.slots.len(), 3);
    assert_eq!(result.min_duration, 600);
    assert_eq!(result.max_duration, 1000);
    assert_eq!(result.savings_minutes, 7);
    assert_eq!(result.optimal().departure.slot.to_string(), "07:00");
    assert!(!result.is_compare_all);

    let levels: Vec<_> = result
        .slots
        .iter()
        .map(|slot| match slot.reading {
            SlotReading::Single { traffic_level, .. } => traffic_level,
            SlotReading::Compare(_) => unreachable!(),
        })
        .collect();
    assert_eq!(
        levels,
        vec![TrafficLevel::Low, TrafficLevel::Medium, TrafficLevel::High]
    );
    assert_eq!(result.chart_scale().display_min, 560.0);
}

#[tokio::test(start_paused = true)]
async fn single_mode_drops_failed_slots() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", BEST, Script::Secs(900))
            .reply("07:15", BEST, Script::Fail(ProviderError::Server("boom".into())))
            .reply("07:30", BEST, Script::Secs(840)),
    );
    let result = orchestrator(provider)
        .analyze_at(&request("07:00", "07:30", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap();

    let kept: Vec<_> = result
        .slots
        .iter()
        .map(|s| s.departure.slot.to_string())
        .collect();
    assert_eq!(kept, vec!["07:00", "07:30"]);
    assert_eq!(result.optimal().departure.slot.to_string(), "07:30");
    assert_eq!(result.slots.iter().filter(|s| s.is_optimal).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn compare_all_keeps_partial_slots() {
    use TrafficModel::*;
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", Optimistic, Script::Secs(550))
            .reply("07:00", BestGuess, Script::Secs(700))
            .reply("07:00", Pessimistic, Script::Secs(950))
            // 07:15 optimistic is unscripted and fails
            .reply("07:15", BestGuess, Script::Secs(650))
            .reply("07:15", Pessimistic, Script::Secs(1300)),
    );
    let result = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "07:15", AnalysisMode::CompareAll), early_morning())
        .await
        .unwrap();

    assert!(result.is_compare_all);
    assert_eq!(result.slots.len(), 2);
    assert_eq!(result.min_duration, 550);
    assert_eq!(result.max_duration, 1300);
    assert_eq!(result.optimal().departure.slot.to_string(), "07:15");
    // round((1300 - 650) / 60) = 11
    assert_eq!(result.savings_minutes, 11);

    match result.slots[1].reading {
        SlotReading::Compare(samples) => {
            assert_eq!(samples.get(Optimistic), None);
            assert_eq!(samples.best_guess(), Some(650));
        }
        SlotReading::Single { .. } => panic!("expected compare reading"),
    }

    // slot-then-model order
    let calls = provider.calls();
    let expected: Vec<(String, TrafficModel)> = vec![
        ("07:00".into(), Optimistic),
        ("07:00".into(), BestGuess),
        ("07:00".into(), Pessimistic),
        ("07:15".into(), Optimistic),
        ("07:15".into(), BestGuess),
        ("07:15".into(), Pessimistic),
    ];
    assert_eq!(calls, expected);
}

#[tokio::test(start_paused = true)]
async fn every_call_is_paced() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", BEST, Script::Secs(600))
            .reply("07:15", BEST, Script::Secs(600)),
    );
    let started = tokio::time::Instant::now();
    orchestrator(provider)
        .analyze_at(&request("07:00", "07:30", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap();

    // three calls (07:30 fails) each followed by 500ms
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1600), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn all_failures_surface_last_error() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", BEST, Script::Fail(ProviderError::Server("first".into())))
            .reply("07:15", BEST, Script::Fail(ProviderError::Denied("key revoked".into()))),
    );
    let err = orchestrator(provider)
        .analyze_at(&request("07:00", "07:15", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap_err();

    match err {
        CoreError::AllSlotsFailed { cause } => assert!(cause.contains("key revoked"), "{cause}"),
        other => panic!("expected AllSlotsFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn compare_all_without_best_guess_keeps_provider_error() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", TrafficModel::Optimistic, Script::Secs(500))
            .reply("07:00", BEST, Script::Fail(ProviderError::Denied("key revoked".into())))
            .reply("07:00", TrafficModel::Pessimistic, Script::Secs(900)),
    );
    let err = orchestrator(provider)
        .analyze_at(&request("07:00", "07:00", AnalysisMode::CompareAll), early_morning())
        .await
        .unwrap_err();

    match err {
        CoreError::AllSlotsFailed { cause } => assert!(cause.contains("key revoked"), "{cause}"),
        other => panic!("expected AllSlotsFailed, got {other:?}"),
    }
}

fn rate_limited(secs: u64) -> Script {
    Script::Fail(ProviderError::RateLimited {
        message: format!("Too many requests (60 per minute). Try again in {secs} seconds."),
        retry_after_secs: Some(secs),
    })
}

#[tokio::test(start_paused = true)]
async fn rate_limit_stops_the_batch() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", BEST, Script::Secs(600))
            .reply("07:15", BEST, rate_limited(40))
            .reply("07:30", BEST, Script::Secs(500))
            .reply("07:45", BEST, Script::Secs(700)),
    );
    let err = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "08:00", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap_err();

    match err {
        CoreError::RateLimited {
            message,
            retry_after_secs,
        } => {
            assert_eq!(retry_after_secs, Some(40));
            assert!(message.contains("40 seconds"), "{message}");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_stops_compare_all_mid_slot() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:00", TrafficModel::Optimistic, Script::Secs(500))
            .reply("07:00", BEST, rate_limited(5))
            .reply("07:00", TrafficModel::Pessimistic, Script::Secs(900)),
    );
    let err = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "07:15", AnalysisMode::CompareAll), early_morning())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::RateLimited { retry_after_secs: Some(5), .. }));
    assert_eq!(
        provider.calls(),
        vec![
            ("07:00".to_string(), TrafficModel::Optimistic),
            ("07:00".to_string(), BEST),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn hung_calls_time_out() {
    let provider = Arc::new(ScriptedProvider::default().reply("07:00", BEST, Script::Hang));
    let started = tokio::time::Instant::now();
    let err = orchestrator(provider)
        .analyze_at(&request("07:00", "07:00", AnalysisMode::Single(BEST)), early_morning())
        .await
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(15_500), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(16), "{elapsed:?}");
    match err {
        CoreError::AllSlotsFailed { cause } => assert!(cause.contains("timed out")),
        other => panic!("expected AllSlotsFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn elapsed_window_is_no_future_slots() {
    let provider = Arc::new(ScriptedProvider::default());
    let after_window = Utc.with_ymd_and_hms(2026, 3, 10, 11, 0, 0).unwrap();
    let err = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "10:00", AnalysisMode::Single(BEST)), after_window)
        .await
        .unwrap_err();

    assert!(err.is_nothing_to_analyze());
    match err {
        CoreError::NoFutureSlots { period, window, .. } => {
            assert_eq!(period, "morning");
            assert_eq!(window, "07:00-10:00");
        }
        other => panic!("expected NoFutureSlots, got {other:?}"),
    }
    assert!(provider.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn only_future_slots_are_queried() {
    let provider = Arc::new(
        ScriptedProvider::default()
            .reply("07:30", BEST, Script::Secs(700))
            .reply("07:45", BEST, Script::Secs(720)),
    );
    // exactly 07:15 is not strictly in the future
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 7, 15, 0).unwrap();
    let result = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("07:00", "07:45", AnalysisMode::Single(BEST)), now)
        .await
        .unwrap();

    assert_eq!(result.slots.len(), 2);
    let queried: Vec<_> = provider.calls().into_iter().map(|(t, _)| t).collect();
    assert_eq!(queried, vec!["07:30", "07:45"]);
}

#[tokio::test(start_paused = true)]
async fn offset_shifts_query_instants() {
    let provider = Arc::new(ScriptedProvider::default().reply("05:00", BEST, Script::Secs(600)));
    let mut req = request("07:00", "07:00", AnalysisMode::Single(BEST));
    req.utc_offset = FixedOffset::east_opt(2 * 3600).unwrap();

    let result = orchestrator(Arc::clone(&provider))
        .analyze_at(&req, Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(result.optimal().departure.slot.to_string(), "07:00");
    assert_eq!(provider.calls()[0].0, "05:00");
}

#[tokio::test(start_paused = true)]
async fn invalid_window_fails_before_any_call() {
    let provider = Arc::new(ScriptedProvider::default());
    let err = orchestrator(Arc::clone(&provider))
        .analyze_at(&request("10:00", "06:00", AnalysisMode::CompareAll), early_morning())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidWindow { .. }));
    assert!(provider.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn progress_reports_each_call() {
    let provider = Arc::new(ScriptedProvider::default().reply("07:00", BEST, Script::Secs(600)));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    orchestrator(provider)
        .with_progress(move |p: Progress| sink.lock().push(p))
        .analyze_at(&request("07:00", "07:00", AnalysisMode::CompareAll), early_morning())
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2], Progress { completed: 3, total: 3 });
}
