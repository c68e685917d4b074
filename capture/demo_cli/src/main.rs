#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! `capture-demo` – browse, play and time the scripted AI receptionist calls.

mod render;

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use capture_scenario_engine::{
    timeline, BusinessType, OutcomeSummary, PlaybackDriver, PlaybackTelemetry, Scenario,
    ScenarioCatalog, ScenarioCategory, ScenarioPlayer, TimingConfig, TimingOverrides,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use crate::render::TranscriptPrinter;

#[derive(Parser, Debug)]
#[command(name = "capture-demo", version, about = "Scripted AI receptionist call demos")]
struct Cli {
    /// Alternate JSON catalog instead of the built-in scenarios.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Diagnostic output on stderr (`RUST_LOG` overrides).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lists scenarios, optionally filtered.
    List {
        /// Business type (plumbing, dental, hvac, auto, law, general).
        #[arg(long)]
        business: Option<BusinessType>,
        /// Category (emergency, routine, pricing, scheduling, complaint, after_hours).
        #[arg(long)]
        category: Option<ScenarioCategory>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Prints a scenario's full transcript and outcome.
    Show {
        /// Scenario id.
        id: String,
    },
    /// Plays a scenario in real time.
    Play(PlayArgs),
    /// Prints when each message starts and finishes.
    Timeline {
        /// Scenario id.
        id: String,
        #[command(flatten)]
        pacing: PacingArgs,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Scenario id.
    id: String,
    #[command(flatten)]
    pacing: PacingArgs,
    /// Append JSON log lines here.
    #[arg(long)]
    log: Option<PathBuf>,
    /// Append lifecycle events here.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct PacingArgs {
    /// TOML timing config.
    #[arg(long)]
    timing: Option<PathBuf>,
    /// Characters revealed per second.
    #[arg(long)]
    cps: Option<f64>,
}

impl PacingArgs {
    fn resolve(&self) -> Result<TimingConfig> {
        let base = match &self.timing {
            Some(path) => TimingConfig::load(path)?,
            None => TimingConfig::natural(),
        };
        let timing = TimingOverrides {
            chars_per_second: self.cps,
            ..TimingOverrides::default()
        }
        .apply(base);
        timing.validate()?;
        Ok(timing)
    }
}

#[derive(Serialize)]
struct ListEntry<'a> {
    id: &'a str,
    title: &'a str,
    business_type: BusinessType,
    category: ScenarioCategory,
    duration: &'a str,
    messages: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let catalog = load_catalog(cli.catalog.as_deref())?;
    match cli.command {
        Commands::List {
            business,
            category,
            json,
        } => list(&catalog, business, category, json),
        Commands::Show { id } => show(find(&catalog, &id)?),
        Commands::Play(args) => {
            let scenario = Arc::clone(find(&catalog, &args.id)?);
            Runtime::new()?.block_on(play(scenario, &args))
        }
        Commands::Timeline { id, pacing } => {
            let scenario = Arc::clone(find(&catalog, &id)?);
            let timing = pacing.resolve()?;
            let t = timeline(scenario, &timing)?;
            print!("{}", t.render_text());
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<ScenarioCatalog> {
    match path {
        Some(path) => ScenarioCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(ScenarioCatalog::builtin().clone()),
    }
}

fn find<'a>(catalog: &'a ScenarioCatalog, id: &str) -> Result<&'a Arc<Scenario>> {
    catalog.get(id).with_context(|| {
        let known: Vec<_> = catalog.ids().collect();
        format!("unknown scenario `{id}` (known: {})", known.join(", "))
    })
}

fn list(
    catalog: &ScenarioCatalog,
    business: Option<BusinessType>,
    category: Option<ScenarioCategory>,
    json: bool,
) -> Result<()> {
    let matches = catalog.filter(business, category);
    if json {
        let entries: Vec<_> = matches
            .iter()
            .map(|s| ListEntry {
                id: &s.id,
                title: &s.title,
                business_type: s.business_type,
                category: s.category,
                duration: &s.duration,
                messages: s.len(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for s in &matches {
        println!(
            "{:<28} {:<12} {:<12} {:>5}  {}",
            s.id,
            s.business_type.label(),
            s.category.label(),
            s.duration,
            s.title
        );
    }
    if matches.is_empty() {
        println!("no scenarios match");
    }
    Ok(())
}

fn show(scenario: &Scenario) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{} ({})", scenario.title, scenario.id)?;
    writeln!(
        out,
        "{} / {} / {}",
        scenario.business_type.label(),
        scenario.category.label(),
        scenario.duration
    )?;
    if !scenario.description.is_empty() {
        writeln!(out, "{}", scenario.description)?;
    }
    if !scenario.caller_persona.is_empty() {
        writeln!(out, "Caller: {}", scenario.caller_persona)?;
    }
    writeln!(out)?;
    write!(out, "{}", render::transcript(scenario))?;
    writeln!(out)?;
    write!(out, "{}", OutcomeSummary::from(&scenario.outcome).render_text())?;
    Ok(())
}

async fn play(scenario: Arc<Scenario>, args: &PlayArgs) -> Result<()> {
    let timing = args.pacing.resolve()?;
    let mut telemetry = PlaybackTelemetry::builder("capture-demo");
    if let Some(path) = &args.log {
        telemetry = telemetry.log_path(path);
    }
    if let Some(path) = &args.event_log {
        telemetry = telemetry.event_publisher(Arc::new(FileEventPublisher::new(path)?));
    }
    let telemetry = telemetry.build()?;
    telemetry.log(
        LogLevel::Info,
        "cli.play",
        &json!({ "scenario": scenario.id, "title": scenario.title, "cps": timing.chars_per_second }),
    )?;
    let player = ScenarioPlayer::builder(Arc::clone(&scenario))
        .timing(timing)
        .telemetry(telemetry)
        .build()?;

    println!("{} - {}\n", scenario.title, scenario.description);
    let handle = PlaybackDriver::spawn(player);
    let mut snapshots = handle.snapshots();
    let mut printer = TranscriptPrinter::default();
    handle.start().await?;
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        printer.update(&snapshot, &mut io::stdout().lock())?;
        if snapshot.is_complete() {
            break;
        }
        snapshots
            .changed()
            .await
            .context("playback stopped before completing")?;
    }
    handle.shutdown().await?;
    println!("\n{}", OutcomeSummary::from(&scenario.outcome).render_text());
    Ok(())
}
