use std::sync::Arc;

use chrono::{FixedOffset, Local, NaiveDate, Offset, TimeZone};
use clap::{Args, ValueEnum};
use serde_json::json;

use commutewise_core::storage::ModelSetting;
use commutewise_core::{
    AnalysisRequest, AnalysisResult, ChartScale, Config, ConfigError, CoreError, Orchestrator,
    Period, ProxyProvider, SlotReading, TimeWindow, TrafficModel,
};

const BAR_WIDTH: f64 = 32.0;

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Morning window, home to work
    ToWork,
    /// Evening window, work to home
    ToHome,
    Both,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Day to analyze (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = Direction::ToWork)]
    direction: Direction,
    /// optimistic, best_guess, pessimistic or compare_all (overrides config)
    #[arg(long)]
    model: Option<ModelSetting>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// One direction of the commute.
struct Leg {
    key: &'static str,
    label: &'static str,
    period: Period,
    window: TimeWindow,
    origin: String,
    destination: String,
}

pub fn run(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().map_err(|e| describe(&e.into()))?;
    let (home, work) = config
        .addresses()
        .map_err(|e| describe(&e.into()))?;

    let mut legs = Vec::new();
    if args.direction != Direction::ToHome {
        legs.push(Leg {
            key: "to_work",
            label: "Morning commute",
            period: Period::Morning,
            window: config.windows.morning,
            origin: home.to_string(),
            destination: work.to_string(),
        });
    }
    if args.direction != Direction::ToWork {
        legs.push(Leg {
            key: "to_home",
            label: "Evening commute",
            period: Period::Evening,
            window: config.windows.evening,
            origin: work.to_string(),
            destination: home.to_string(),
        });
    }

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let mode = args.model.unwrap_or(config.analysis.traffic_model).mode();
    let provider = ProxyProvider::new(&config.proxy.url).map_err(|e| describe(&e.into()))?;

    let show_progress = !args.json;
    let orchestrator = Orchestrator::with_config(Arc::new(provider), config.analysis.orchestrator())
        .with_progress(move |p| {
            if show_progress {
                eprint!("\rsampling {}/{}", p.completed, p.total);
                if p.completed == p.total {
                    eprintln!();
                }
            }
        });

    let runtime = tokio::runtime::Runtime::new()?;
    let mut report = serde_json::Map::new();
    let mut first_failure = None;

    for leg in &legs {
        let request = AnalysisRequest {
            origin: leg.origin.clone(),
            destination: leg.destination.clone(),
            period: leg.period,
            window: leg.window,
            interval_minutes: config.analysis.interval_minutes,
            date,
            utc_offset: local_offset(date),
            mode,
        };

        match runtime.block_on(orchestrator.analyze(&request)) {
            Ok(result) => {
                if args.json {
                    report.insert(leg.key.to_string(), serde_json::to_value(&result)?);
                } else {
                    print_result(leg, date, &result);
                }
            }
            Err(err) => {
                let message = describe(&err);
                if args.json {
                    report.insert(leg.key.to_string(), json!({ "error": message }));
                } else if legs.len() > 1 {
                    eprintln!("{}: {message}", leg.label);
                }
                first_failure.get_or_insert(message);
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    match first_failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// Offset of the local zone at midday on `date`.
fn local_offset(date: NaiveDate) -> FixedOffset {
    date.and_hms_opt(12, 0, 0)
        .and_then(|noon| Local.from_local_datetime(&noon).earliest())
        .map(|t| t.offset().fix())
        .unwrap_or_else(|| Local::now().offset().fix())
}

/// Human message for a failed analysis.
fn describe(err: &CoreError) -> String {
    match err {
        CoreError::Config(ConfigError::MissingKey(key)) => {
            format!("{key} is not set. Run: commutewise config set {key} \"<address>\"")
        }
        CoreError::NoFutureSlots { .. } => {
            format!("{err}. Pass --date to analyze a later day.")
        }
        CoreError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } => {
            format!("Rate limited by the proxy. Try again in {secs} seconds.")
        }
        CoreError::RateLimited { message, .. } => {
            format!("Rate limited by the proxy: {message}")
        }
        CoreError::GovernorDenied(denial) => denial.to_string(),
        CoreError::AllSlotsFailed { .. } => {
            format!("{err}. Check the addresses and that the proxy is running.")
        }
        other => other.to_string(),
    }
}

fn minutes(secs: u32) -> i64 {
    (f64::from(secs) / 60.0).round() as i64
}

fn bar(scale: &ChartScale, secs: u32) -> String {
    let cells = (scale.bar_height(secs) * BAR_WIDTH).round() as usize;
    "█".repeat(cells.max(1))
}

fn model_cell(secs: Option<u32>) -> String {
    secs.map(|s| format!("{:>3}", minutes(s)))
        .unwrap_or_else(|| "  -".to_string())
}

fn print_result(leg: &Leg, date: NaiveDate, result: &AnalysisResult) {
    let scale = result.chart_scale();

    println!(
        "{} {} on {date}: {} -> {}",
        leg.label, leg.window, leg.origin, leg.destination
    );
    if result.is_compare_all {
        println!("         opt  best  pess  (minutes)");
    }

    for slot in &result.slots {
        let marker = if slot.is_optimal { "*" } else { " " };
        let line = match &slot.reading {
            SlotReading::Single {
                duration,
                traffic_level,
            } => format!(
                "{:>3} min  {:<6}  {}",
                minutes(*duration),
                traffic_level.to_string(),
                bar(&scale, *duration)
            ),
            SlotReading::Compare(samples) => {
                let bar_value = samples
                    .best_guess()
                    .or_else(|| samples.present().map(|(_, secs)| secs).max());
                format!(
                    "{}  {}   {}   {}",
                    model_cell(samples.get(TrafficModel::Optimistic)),
                    model_cell(samples.get(TrafficModel::BestGuess)),
                    model_cell(samples.get(TrafficModel::Pessimistic)),
                    bar_value.map(|secs| bar(&scale, secs)).unwrap_or_default()
                )
            }
        };
        println!("{marker} {}  {line}", slot.departure.slot);
    }

    let optimal = result.optimal();
    if let Some(secs) = optimal.reading.ranking_duration() {
        println!(
            "\nBest departure: {} ({} min)",
            optimal.departure.slot,
            minutes(secs)
        );
    }
    if result.savings_minutes > 0 {
        println!(
            "Leaving then saves {} min compared with the slowest departure.",
            result.savings_minutes
        );
    } else {
        println!("Every departure in this window takes about the same time.");
    }
    println!();
}
