#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Capture scenario engine – plays scripted caller/agent conversations with a
//! typewriter reveal, deterministic timers and an outcome card at the end.

/// Shipped scenario data.
pub mod builtin;

/// Read-only scenario catalog.
pub mod catalog;

/// Real-time tokio driver.
pub mod driver;

/// Error types.
pub mod error;

/// Catalog browsing and selection.
pub mod library;

/// Playback state machine.
pub mod machine;

/// Outcome card.
pub mod outcome;

/// Player wiring machine, scheduler and telemetry.
pub mod player;

/// Scenario data model.
pub mod scenario;

/// Timer abstraction and virtual clock.
pub mod scheduler;

/// Renderable player state.
pub mod snapshot;

/// Structured logs and lifecycle events.
pub mod telemetry;

/// Per-message schedule of a full run.
pub mod timeline;

/// Pacing configuration.
pub mod timing;

/// Incremental text reveal.
pub mod typewriter;

pub use catalog::ScenarioCatalog;
pub use driver::{DriverCommand, DriverHandle, PlaybackDriver};
pub use error::{CatalogError, LibraryError, ParseLabelError, PlaybackError};
pub use library::{LibraryFilter, LibraryView, ScenarioBrowser};
pub use machine::{CallState, Command, Effect, Input, Phase, SimulationMachine, Stage};
pub use outcome::{LeadGrade, OutcomeSummary};
pub use player::{PlaybackEvent, PlayerBuilder, ScenarioPlayer};
pub use scenario::{
    BusinessType, CrmCapture, CrmField, CrmFields, Emotion, Intent, Outcome, Scenario,
    ScenarioCategory, Speaker, TranscriptMessage, Urgency,
};
pub use scheduler::{Scheduler, TimerKind, TimerToken, VirtualScheduler};
pub use snapshot::{ActiveMessage, CapturedField, PlaybackSnapshot, VisibleMessage};
pub use telemetry::{PlaybackTelemetry, PlaybackTelemetryBuilder};
pub use timeline::{timeline, MessageTiming, Timeline};
pub use timing::{PunctuationPause, TimingConfig, TimingOverrides};
pub use typewriter::{Pacing, Typewriter};
