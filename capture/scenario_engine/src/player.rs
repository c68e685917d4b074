use std::{sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    error::PlaybackError,
    machine::{Command, Effect, Input, SimulationMachine, Stage},
    scenario::{Scenario, Speaker},
    scheduler::{Scheduler, VirtualScheduler},
    snapshot::PlaybackSnapshot,
    telemetry::PlaybackTelemetry,
    timing::TimingConfig,
};

/// Notification produced by a player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// A message began revealing.
    MessageStarted {
        /// Position in the transcript.
        index: usize,
        /// Who speaks it.
        speaker: Speaker,
    },
    /// A message is fully revealed.
    MessageFinished {
        /// Position in the transcript.
        index: usize,
    },
    /// The stage changed.
    StageChanged {
        /// Previous stage.
        from: Stage,
        /// New stage.
        to: Stage,
    },
}

/// Builder for [`ScenarioPlayer`].
#[derive(Debug)]
pub struct PlayerBuilder<S = VirtualScheduler> {
    scenario: Arc<Scenario>,
    timing: TimingConfig,
    scheduler: S,
    telemetry: Option<PlaybackTelemetry>,
}

impl PlayerBuilder<VirtualScheduler> {
    fn new(scenario: Arc<Scenario>) -> Self {
        Self {
            scenario,
            timing: TimingConfig::default(),
            scheduler: VirtualScheduler::new(),
            telemetry: None,
        }
    }
}

impl<S: Scheduler> PlayerBuilder<S> {
    /// Pacing to play with.
    #[must_use]
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Replaces the virtual scheduler.
    #[must_use]
    pub fn scheduler<T: Scheduler>(self, scheduler: T) -> PlayerBuilder<T> {
        PlayerBuilder {
            scenario: self.scenario,
            timing: self.timing,
            scheduler,
            telemetry: self.telemetry,
        }
    }

    /// Attaches log and event sinks.
    #[must_use]
    pub fn telemetry(mut self, telemetry: PlaybackTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validates the timing and creates an idle player.
    pub fn build(self) -> Result<ScenarioPlayer<S>, PlaybackError> {
        self.timing.validate()?;
        let machine = SimulationMachine::new(self.scenario, self.timing, 1);
        let (snapshots, _) =
            watch::channel(PlaybackSnapshot::capture(&machine, self.scheduler.now()));
        Ok(ScenarioPlayer {
            machine,
            scheduler: self.scheduler,
            telemetry: self.telemetry,
            snapshots,
        })
    }
}

/// Plays one scenario at a time against a [`Scheduler`].
///
/// Every action applies the state machine, carries out the timer effects on the
/// scheduler, publishes a fresh snapshot and returns the events it produced.
#[derive(Debug)]
pub struct ScenarioPlayer<S = VirtualScheduler> {
    machine: SimulationMachine,
    scheduler: S,
    telemetry: Option<PlaybackTelemetry>,
    snapshots: watch::Sender<PlaybackSnapshot>,
}

impl ScenarioPlayer<VirtualScheduler> {
    /// Starts building a player for `scenario`.
    #[must_use]
    pub fn builder(scenario: Arc<Scenario>) -> PlayerBuilder<VirtualScheduler> {
        PlayerBuilder::new(scenario)
    }
}

impl<S: Scheduler> ScenarioPlayer<S> {
    /// `idle -> playing`.
    pub fn start(&mut self) -> Vec<PlaybackEvent> {
        self.dispatch(Input::Command(Command::Start))
    }

    /// `playing -> paused`.
    pub fn pause(&mut self) -> Vec<PlaybackEvent> {
        self.dispatch(Input::Command(Command::Pause))
    }

    /// `paused -> playing`.
    pub fn resume(&mut self) -> Vec<PlaybackEvent> {
        self.dispatch(Input::Command(Command::Resume))
    }

    /// Back to idle with nothing revealed and no pending timers.
    pub fn reset(&mut self) -> Vec<PlaybackEvent> {
        self.dispatch(Input::Command(Command::Reset))
    }

    /// Jumps to the end of the conversation. Only applies while playing.
    pub fn skip(&mut self) -> Vec<PlaybackEvent> {
        self.dispatch(Input::Command(Command::Skip))
    }

    /// Play button: starts when idle, pauses when playing, resumes when paused
    /// and restarts from the top once complete.
    pub fn toggle(&mut self) -> Vec<PlaybackEvent> {
        match self.machine.stage() {
            Stage::Idle => self.start(),
            Stage::Playing => self.pause(),
            Stage::Paused => self.resume(),
            Stage::Complete => {
                let mut events = self.reset();
                events.extend(self.start());
                events
            }
        }
    }

    /// Replaces the scenario. All pending timers are cancelled first and the new
    /// machine runs under a fresh session, so nothing armed for the old one can land.
    pub fn load(&mut self, scenario: Arc<Scenario>) -> Vec<PlaybackEvent> {
        let dropped = self.scheduler.cancel_all();
        let from = self.machine.stage();
        let previous = self.machine.scenario().id.clone();
        let session = self.machine.session() + 1;
        let timing = self.machine.timing().clone();
        self.machine = SimulationMachine::new(scenario, timing, session);
        debug!(from = %previous, to = %self.machine.scenario().id, dropped, "scenario loaded");

        let mut events = Vec::new();
        if from != Stage::Idle {
            events.push(PlaybackEvent::StageChanged {
                from,
                to: Stage::Idle,
            });
        }
        self.report(
            "playback.loaded",
            json!({ "previous": previous, "dropped_timers": dropped }),
        );
        self.publish();
        events
    }

    /// Fires every timer due within `delta` of the current clock, then moves the clock.
    pub fn advance_by(&mut self, delta: Duration) -> Vec<PlaybackEvent> {
        let target = self.scheduler.now() + delta;
        self.advance_to(target)
    }

    /// Fires every timer due at or before `target` in deadline order, then moves the
    /// clock to `target`. Earlier targets only fire what is already overdue.
    pub fn advance_to(&mut self, target: Duration) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Some(token) = self.scheduler.fire_next(target) {
            events.extend(self.dispatch(Input::Timer(token)));
        }
        if target > self.scheduler.now() {
            self.scheduler.advance_clock(target);
            self.publish();
        }
        events
    }

    /// Fires timers until none remain. Stops early if the player is paused or idle.
    pub fn run_to_end(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Some(deadline) = self.scheduler.next_deadline() {
            events.extend(self.advance_to(deadline));
        }
        events
    }

    /// Current view.
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot::capture(&self.machine, self.scheduler.now())
    }

    /// Receiver updated after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.subscribe()
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.machine.stage()
    }

    /// Scenario being played.
    #[must_use]
    pub fn scenario(&self) -> &Arc<Scenario> {
        self.machine.scenario()
    }

    /// Timing in effect.
    #[must_use]
    pub const fn timing(&self) -> &TimingConfig {
        self.machine.timing()
    }

    /// Player clock.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Earliest pending deadline on the player clock.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Timers waiting on the scheduler.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Underlying state machine.
    #[must_use]
    pub const fn machine(&self) -> &SimulationMachine {
        &self.machine
    }

    /// Telemetry sink, if one was attached.
    #[must_use]
    pub const fn telemetry(&self) -> Option<&PlaybackTelemetry> {
        self.telemetry.as_ref()
    }

    fn dispatch(&mut self, input: Input) -> Vec<PlaybackEvent> {
        let now = self.scheduler.now();
        let effects = self.machine.step(input, now);
        if effects.is_empty() {
            return Vec::new();
        }
        let mut events = Vec::new();
        for effect in effects {
            match effect {
                Effect::Arm { token, delay } => self.scheduler.schedule(delay, token),
                Effect::Disarm { token } => {
                    self.scheduler.cancel(token);
                }
                Effect::DisarmAll => {
                    let dropped = self.scheduler.cancel_all();
                    debug!(dropped, "cleared pending timers");
                }
                Effect::MessageStarted { index, speaker } => {
                    events.push(PlaybackEvent::MessageStarted { index, speaker });
                }
                Effect::MessageFinished { index } => {
                    events.push(PlaybackEvent::MessageFinished { index });
                }
                Effect::StageChanged { from, to } => {
                    self.report_stage(from, to);
                    events.push(PlaybackEvent::StageChanged { from, to });
                }
            }
        }
        self.publish();
        events
    }

    fn report_stage(&self, from: Stage, to: Stage) {
        let event_type = match (from, to) {
            (Stage::Idle, Stage::Playing) => "playback.started",
            (Stage::Playing, Stage::Paused) => "playback.paused",
            (Stage::Paused, Stage::Playing) => "playback.resumed",
            (_, Stage::Complete) => "playback.completed",
            (_, Stage::Idle) => "playback.reset",
            _ => return,
        };
        self.report(
            event_type,
            json!({
                "from": from.label(),
                "to": to.label(),
                "message_index": self.machine.index(),
            }),
        );
    }

    fn report(&self, event_type: &str, mut payload: serde_json::Value) {
        let Some(telemetry) = &self.telemetry else {
            return;
        };
        if let Some(fields) = payload.as_object_mut() {
            fields.insert("scenario".into(), json!(self.machine.scenario().id));
            fields.insert(
                "at_ms".into(),
                json!(u64::try_from(self.scheduler.now().as_millis()).unwrap_or(u64::MAX)),
            );
        }
        if let Err(err) = telemetry.lifecycle(event_type, payload) {
            warn!(error = %err, event_type, "telemetry failed");
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
