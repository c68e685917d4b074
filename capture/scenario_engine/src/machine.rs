//! Playback state machine.
//!
//! [`SimulationMachine::step`] is a plain transition function: it takes a
//! command or a fired timer plus the current clock reading, mutates the state,
//! and returns the [`Effect`]s the owner has to carry out (arming and disarming
//! timers) or report (message and stage notifications). It never reads a clock
//! or owns a timer itself.

use std::{sync::Arc, time::Duration};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    scenario::{Scenario, Speaker},
    scheduler::{TimerKind, TimerToken},
    timing::TimingConfig,
    typewriter::{Pacing, Typewriter},
};

/// Playback stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing started yet, or reset.
    Idle,
    /// Messages are being revealed.
    Playing,
    /// Frozen mid-scenario.
    Paused,
    /// Every message has been revealed.
    Complete,
}

impl Stage {
    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Complete => "complete",
        }
    }
}

/// Phone line state shown above the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    /// No call yet.
    Idle,
    /// Started, first message not yet begun.
    Ringing,
    /// The conversation is under way or over.
    Connected,
}

impl CallState {
    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ringing => "ringing",
            Self::Connected => "connected",
        }
    }
}

/// Viewer actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// `idle -> playing`.
    Start,
    /// `playing -> paused`.
    Pause,
    /// `paused -> playing`.
    Resume,
    /// `any -> idle`.
    Reset,
    /// `playing -> complete`, revealing the in-flight message at once.
    Skip,
}

/// Something the machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A viewer action.
    Command(Command),
    /// A timer armed through [`Effect::Arm`] fired.
    Timer(TimerToken),
}

/// Side effect requested or reported by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Arm `token` to fire after `delay`.
    Arm {
        /// Token to hand back through [`Input::Timer`].
        token: TimerToken,
        /// Delay from the `now` passed to the step.
        delay: Duration,
    },
    /// Cancel a previously armed token.
    Disarm {
        /// Token to cancel.
        token: TimerToken,
    },
    /// Cancel every pending timer of this player.
    DisarmAll,
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

/// What the machine is waiting for while playing or paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing scheduled (idle or complete).
    Settled,
    /// Pause before message `next` begins.
    Waiting {
        /// Message that starts when the pause ends.
        next: usize,
    },
    /// The typewriter is revealing the current message.
    Typing,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimer {
    token: TimerToken,
    deadline: Duration,
}

#[derive(Debug, Clone, Copy)]
struct SuspendedTimer {
    kind: TimerKind,
    remaining: Duration,
}

/// State machine sequencing one scenario's transcript.
#[derive(Debug)]
pub struct SimulationMachine {
    scenario: Arc<Scenario>,
    timing: TimingConfig,
    stage: Stage,
    phase: Phase,
    index: usize,
    typewriter: Typewriter,
    pacing: Option<Pacing>,
    session: u64,
    seq: u64,
    armed: Option<ArmedTimer>,
    suspended: Option<SuspendedTimer>,
    finished_at: Vec<Duration>,
    jitter: SmallRng,
}

impl SimulationMachine {
    /// Creates an idle machine. `session` must differ from every session a previous
    /// machine of the same player used.
    #[must_use]
    pub fn new(scenario: Arc<Scenario>, timing: TimingConfig, session: u64) -> Self {
        let jitter = SmallRng::seed_from_u64(timing.jitter_seed);
        Self {
            scenario,
            timing,
            stage: Stage::Idle,
            phase: Phase::Settled,
            index: 0,
            typewriter: Typewriter::default(),
            pacing: None,
            session,
            seq: 0,
            armed: None,
            suspended: None,
            finished_at: Vec::new(),
            jitter,
        }
    }

    /// Applies one input at clock reading `now`.
    pub fn step(&mut self, input: Input, now: Duration) -> Vec<Effect> {
        let mut fx = Vec::new();
        match input {
            Input::Command(Command::Start) => self.start(now, &mut fx),
            Input::Command(Command::Pause) => self.pause(now, &mut fx),
            Input::Command(Command::Resume) => self.resume(now, &mut fx),
            Input::Command(Command::Reset) => self.reset(&mut fx),
            Input::Command(Command::Skip) => self.skip(&mut fx),
            Input::Timer(token) => self.fire(token, now, &mut fx),
        }
        fx
    }

    fn start(&mut self, now: Duration, fx: &mut Vec<Effect>) {
        if self.stage != Stage::Idle {
            return;
        }
        self.set_stage(Stage::Playing, fx);
        let Some(first) = self.scenario.transcript.first() else {
            self.index = 0;
            self.set_stage(Stage::Complete, fx);
            return;
        };
        self.index = 0;
        let delay = self.timing.start_delay() + first.delay().unwrap_or_default();
        if delay.is_zero() {
            self.begin_message(0, now, fx);
        } else {
            self.phase = Phase::Waiting { next: 0 };
            self.arm(TimerKind::Gap, delay, now, fx);
        }
    }

    fn pause(&mut self, now: Duration, fx: &mut Vec<Effect>) {
        if self.stage != Stage::Playing {
            return;
        }
        if let Some(armed) = self.armed.take() {
            self.suspended = Some(SuspendedTimer {
                kind: armed.token.kind,
                remaining: armed.deadline.saturating_sub(now),
            });
            fx.push(Effect::Disarm { token: armed.token });
        }
        self.typewriter.set_active(false);
        self.set_stage(Stage::Paused, fx);
    }

    fn resume(&mut self, now: Duration, fx: &mut Vec<Effect>) {
        if self.stage != Stage::Paused {
            return;
        }
        self.typewriter.set_active(self.phase == Phase::Typing);
        self.set_stage(Stage::Playing, fx);
        if let Some(suspended) = self.suspended.take() {
            self.arm(suspended.kind, suspended.remaining, now, fx);
        }
    }

    fn reset(&mut self, fx: &mut Vec<Effect>) {
        self.armed = None;
        self.suspended = None;
        fx.push(Effect::DisarmAll);
        self.session += 1;
        self.seq = 0;
        self.index = 0;
        self.phase = Phase::Settled;
        self.typewriter = Typewriter::default();
        self.pacing = None;
        self.finished_at.clear();
        self.jitter = SmallRng::seed_from_u64(self.timing.jitter_seed);
        self.set_stage(Stage::Idle, fx);
    }

    fn skip(&mut self, fx: &mut Vec<Effect>) {
        if self.stage != Stage::Playing {
            return;
        }
        if let Some(armed) = self.armed.take() {
            fx.push(Effect::Disarm { token: armed.token });
        }
        if self.phase == Phase::Typing {
            self.typewriter.reveal_all();
            fx.push(Effect::MessageFinished { index: self.index });
        }
        self.settle_complete(fx);
    }

    fn fire(&mut self, token: TimerToken, now: Duration, fx: &mut Vec<Effect>) {
        match self.armed {
            Some(armed) if armed.token == token => self.armed = None,
            _ => {
                trace!(scenario = %self.scenario.id, ?token, "discarding stale timer");
                return;
            }
        }
        match (token.kind, self.phase) {
            (TimerKind::Reveal, Phase::Typing) => {
                let revealed = self.typewriter.advance();
                if self.typewriter.is_complete() {
                    self.finish_message(now, fx);
                } else if let Some(delay) = revealed
                    .zip(self.pacing)
                    .map(|(ch, pacing)| pacing.delay_after(&self.timing, ch))
                {
                    self.arm(TimerKind::Reveal, delay, now, fx);
                }
            }
            (TimerKind::Gap, Phase::Waiting { next }) => self.begin_message(next, now, fx),
            (kind, phase) => {
                debug!(?kind, ?phase, "timer fired in unexpected phase");
            }
        }
    }

    fn begin_message(&mut self, index: usize, now: Duration, fx: &mut Vec<Effect>) {
        let Some(message) = self.scenario.transcript.get(index) else {
            self.settle_complete(fx);
            return;
        };
        self.index = index;
        if !self.typewriter.set_text(&message.text) {
            self.typewriter.reset();
        }
        self.typewriter.set_active(true);
        let pacing = Pacing::for_text(&self.timing, &message.text);
        let first_delay = pacing.first_delay();
        self.pacing = Some(pacing);
        fx.push(Effect::MessageStarted {
            index,
            speaker: message.speaker,
        });
        if self.typewriter.is_complete() {
            self.finish_message(now, fx);
        } else {
            self.phase = Phase::Typing;
            self.arm(TimerKind::Reveal, first_delay, now, fx);
        }
    }

    fn finish_message(&mut self, now: Duration, fx: &mut Vec<Effect>) {
        fx.push(Effect::MessageFinished { index: self.index });
        self.finished_at.push(now);
        let next = self.index + 1;
        let Some((speaker, authored)) = self
            .scenario
            .transcript
            .get(next)
            .map(|message| (message.speaker, message.delay()))
        else {
            self.settle_complete(fx);
            return;
        };
        let gap = match authored {
            Some(delay) => delay,
            None => {
                let jitter = self.draw_jitter();
                self.timing.gap_before(speaker, jitter)
            }
        };
        self.phase = Phase::Waiting { next };
        self.arm(TimerKind::Gap, gap, now, fx);
    }

    fn settle_complete(&mut self, fx: &mut Vec<Effect>) {
        self.index = self.scenario.transcript.len();
        self.phase = Phase::Settled;
        self.typewriter.set_active(false);
        self.set_stage(Stage::Complete, fx);
    }

    fn draw_jitter(&mut self) -> Duration {
        match self.timing.gap_jitter_ms {
            0 => Duration::ZERO,
            max => Duration::from_millis(self.jitter.gen_range(0..=max)),
        }
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration, now: Duration, fx: &mut Vec<Effect>) {
        self.seq += 1;
        let token = TimerToken {
            session: self.session,
            seq: self.seq,
            kind,
        };
        self.armed = Some(ArmedTimer {
            token,
            deadline: now + delay,
        });
        fx.push(Effect::Arm { token, delay });
    }

    fn set_stage(&mut self, to: Stage, fx: &mut Vec<Effect>) {
        if self.stage == to {
            return;
        }
        let from = self.stage;
        self.stage = to;
        debug!(scenario = %self.scenario.id, from = from.label(), to = to.label(), "stage transition");
        fx.push(Effect::StageChanged { from, to });
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the current message; equals the transcript length once complete.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Typewriter of the current message.
    #[must_use]
    pub const fn typewriter(&self) -> &Typewriter {
        &self.typewriter
    }

    /// Scenario being played.
    #[must_use]
    pub fn scenario(&self) -> &Arc<Scenario> {
        &self.scenario
    }

    /// Timing in effect.
    #[must_use]
    pub const fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Current generation.
    #[must_use]
    pub const fn session(&self) -> u64 {
        self.session
    }

    /// Token the machine will honor next, if any.
    #[must_use]
    pub fn armed_token(&self) -> Option<TimerToken> {
        self.armed.map(|armed| armed.token)
    }

    /// Time left on the timer frozen by a pause.
    #[must_use]
    pub fn suspended_remaining(&self) -> Option<Duration> {
        self.suspended.map(|suspended| suspended.remaining)
    }

    /// Whether a message has been started (false during the start delay).
    #[must_use]
    pub const fn has_started_message(&self) -> bool {
        match self.phase {
            Phase::Typing => true,
            Phase::Waiting { next } => next > 0,
            Phase::Settled => false,
        }
    }

    /// Ringing from `start` until the first message begins, connected after that.
    #[must_use]
    pub const fn call_state(&self) -> CallState {
        match self.stage {
            Stage::Idle => CallState::Idle,
            Stage::Complete => CallState::Connected,
            Stage::Playing | Stage::Paused if self.has_started_message() => CallState::Connected,
            Stage::Playing | Stage::Paused => CallState::Ringing,
        }
    }

    /// Clock reading at which message `index` finished revealing on its own.
    /// `None` for unfinished messages and for those completed by a skip.
    #[must_use]
    pub fn finished_at(&self, index: usize) -> Option<Duration> {
        self.finished_at.get(index).copied()
    }

    /// `index / total`, or `1.0` once complete or when there is nothing to play.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        let total = self.scenario.transcript.len();
        if self.stage == Stage::Complete || total == 0 {
            1.0
        } else {
            self.index as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{BusinessType, ScenarioCategory, TranscriptMessage};

    fn scenario(lines: &[(&str, Speaker)]) -> Arc<Scenario> {
        Arc::new(
            Scenario::new("test", "Test", BusinessType::Hvac, ScenarioCategory::Emergency)
                .with_transcript(
                    lines
                        .iter()
                        .map(|(text, speaker)| TranscriptMessage::new(*speaker, *text))
                        .collect(),
                ),
        )
    }

    fn fast() -> TimingConfig {
        TimingConfig {
            message_gap_ms: 100,
            min_gap_ms: 0,
            ..TimingConfig::with_rate(100.0)
        }
    }

    fn armed(fx: &[Effect]) -> Option<(TimerToken, Duration)> {
        fx.iter().rev().find_map(|e| match e {
            Effect::Arm { token, delay } => Some((*token, *delay)),
            _ => None,
        })
    }

    #[test]
    fn commands_outside_their_stage_are_noops() {
        let mut m = SimulationMachine::new(scenario(&[("hi", Speaker::Caller)]), fast(), 1);
        let now = Duration::ZERO;
        assert!(m.step(Input::Command(Command::Pause), now).is_empty());
        assert!(m.step(Input::Command(Command::Resume), now).is_empty());
        assert!(m.step(Input::Command(Command::Skip), now).is_empty());
        assert!(!m.step(Input::Command(Command::Start), now).is_empty());
        assert!(m.step(Input::Command(Command::Start), now).is_empty());
        assert!(m.step(Input::Command(Command::Resume), now).is_empty());
        assert_eq!(m.stage(), Stage::Playing);
    }

    #[test]
    fn start_begins_first_message_and_arms_reveal() {
        let mut m = SimulationMachine::new(scenario(&[("hi", Speaker::Caller)]), fast(), 1);
        let fx = m.step(Input::Command(Command::Start), Duration::ZERO);
        assert_eq!(
            fx[0],
            Effect::StageChanged {
                from: Stage::Idle,
                to: Stage::Playing
            }
        );
        assert!(fx.contains(&Effect::MessageStarted {
            index: 0,
            speaker: Speaker::Caller
        }));
        let (token, delay) = armed(&fx).unwrap();
        assert_eq!(token.kind, TimerKind::Reveal);
        assert_eq!(delay, Duration::from_millis(10));
        assert_eq!(m.phase(), Phase::Typing);
    }

    #[test]
    fn reveal_ticks_finish_message_then_gap_then_complete() {
        let mut m = SimulationMachine::new(
            scenario(&[("ab", Speaker::Caller), ("c", Speaker::Agent)]),
            fast(),
            1,
        );
        let mut now = Duration::ZERO;
        let mut fx = m.step(Input::Command(Command::Start), now);
        let mut finished = Vec::new();
        while let Some((token, delay)) = armed(&fx) {
            now += delay;
            fx = m.step(Input::Timer(token), now);
            finished.extend(fx.iter().filter_map(|e| match e {
                Effect::MessageFinished { index } => Some(*index),
                _ => None,
            }));
            if token.kind == TimerKind::Gap {
                assert_eq!(delay, Duration::from_millis(150));
            }
        }
        assert_eq!(finished, vec![0, 1]);
        assert_eq!(m.finished_at(0), Some(Duration::from_millis(20)));
        assert_eq!(m.finished_at(1), Some(now));
        assert_eq!(m.stage(), Stage::Complete);
        assert_eq!(m.index(), 2);
        assert!((m.progress() - 1.0).abs() < f64::EPSILON);
        assert_eq!(now, Duration::from_millis(20 + 150 + 10));
    }

    #[test]
    fn stale_and_superseded_tokens_are_ignored() {
        let mut m = SimulationMachine::new(scenario(&[("abc", Speaker::Caller)]), fast(), 1);
        let fx = m.step(Input::Command(Command::Start), Duration::ZERO);
        let (first, _) = armed(&fx).unwrap();
        let fx = m.step(Input::Timer(first), Duration::from_millis(10));
        let (second, _) = armed(&fx).unwrap();
        assert!(m
            .step(Input::Timer(first), Duration::from_millis(11))
            .is_empty());
        assert_eq!(m.typewriter().revealed(), "a");
        m.step(Input::Command(Command::Reset), Duration::from_millis(12));
        m.step(Input::Command(Command::Start), Duration::from_millis(12));
        let fresh = m.armed_token().unwrap();
        assert_ne!(fresh.session, second.session);
        assert!(m
            .step(Input::Timer(second), Duration::from_millis(20))
            .is_empty());
        assert_eq!(m.typewriter().revealed(), "");
        assert_eq!(m.session(), 2);
    }

    #[test]
    fn pause_keeps_remaining_time_for_resume() {
        let mut m = SimulationMachine::new(scenario(&[("abc", Speaker::Caller)]), fast(), 1);
        m.step(Input::Command(Command::Start), Duration::ZERO);
        let fx = m.step(Input::Command(Command::Pause), Duration::from_millis(4));
        assert!(fx.iter().any(|e| matches!(e, Effect::Disarm { .. })));
        assert_eq!(m.suspended_remaining(), Some(Duration::from_millis(6)));
        assert!(!m.typewriter().is_active());
        let fx = m.step(Input::Command(Command::Resume), Duration::from_millis(500));
        let (token, delay) = armed(&fx).unwrap();
        assert_eq!(delay, Duration::from_millis(6));
        assert_eq!(token.kind, TimerKind::Reveal);
        assert!(m.typewriter().is_active());
    }

    #[test]
    fn empty_transcript_completes_on_start() {
        let mut m = SimulationMachine::new(scenario(&[]), fast(), 1);
        let fx = m.step(Input::Command(Command::Start), Duration::ZERO);
        assert_eq!(m.stage(), Stage::Complete);
        assert!(armed(&fx).is_none());
        assert!((m.progress() - 1.0).abs() < f64::EPSILON);
        assert_eq!(m.index(), 0);
    }

    #[test]
    fn empty_message_finishes_without_reveal_tick() {
        let mut m = SimulationMachine::new(
            scenario(&[("", Speaker::Caller), ("ok", Speaker::Agent)]),
            fast(),
            1,
        );
        let fx = m.step(Input::Command(Command::Start), Duration::ZERO);
        assert!(fx.contains(&Effect::MessageFinished { index: 0 }));
        let (token, _) = armed(&fx).unwrap();
        assert_eq!(token.kind, TimerKind::Gap);
    }

    #[test]
    fn start_delay_and_authored_delay_postpone_first_message() {
        let timing = TimingConfig {
            start_delay_ms: 500,
            ..fast()
        };
        let story = Arc::new(
            Scenario::new("d", "D", BusinessType::General, ScenarioCategory::Routine)
                .with_transcript(vec![
                    TranscriptMessage::agent("Hello").with_delay(Duration::from_millis(250))
                ]),
        );
        let mut m = SimulationMachine::new(story, timing, 1);
        let fx = m.step(Input::Command(Command::Start), Duration::ZERO);
        let (token, delay) = armed(&fx).unwrap();
        assert_eq!((token.kind, delay), (TimerKind::Gap, Duration::from_millis(750)));
        assert!(!m.has_started_message());
        assert_eq!(m.phase(), Phase::Waiting { next: 0 });
        assert_eq!(m.call_state(), CallState::Ringing);
        m.step(Input::Command(Command::Pause), Duration::from_millis(100));
        assert_eq!(m.call_state(), CallState::Ringing);
        m.step(Input::Command(Command::Resume), Duration::from_millis(100));
        let token = m.armed_token().unwrap();
        let fx = m.step(Input::Timer(token), Duration::from_millis(750));
        assert!(fx.iter().any(|e| matches!(e, Effect::MessageStarted { index: 0, .. })));
        assert_eq!(m.call_state(), CallState::Connected);
        m.step(Input::Command(Command::Reset), Duration::from_secs(1));
        assert_eq!(m.call_state(), CallState::Idle);
    }

    #[test]
    fn skipping_while_ringing_connects_and_records_no_finish_times() {
        let timing = TimingConfig {
            start_delay_ms: 500,
            ..fast()
        };
        let mut m = SimulationMachine::new(
            scenario(&[("ab", Speaker::Caller), ("c", Speaker::Agent)]),
            timing,
            1,
        );
        m.step(Input::Command(Command::Start), Duration::ZERO);
        m.step(Input::Command(Command::Skip), Duration::from_millis(10));
        assert_eq!(m.call_state(), CallState::Connected);
        assert_eq!(m.finished_at(0), None);
    }

    #[test]
    fn skip_reveals_in_flight_message_and_completes() {
        let mut m = SimulationMachine::new(
            scenario(&[("abc", Speaker::Caller), ("d", Speaker::Agent)]),
            fast(),
            1,
        );
        m.step(Input::Command(Command::Start), Duration::ZERO);
        let fx = m.step(Input::Command(Command::Skip), Duration::from_millis(3));
        assert!(fx.contains(&Effect::MessageFinished { index: 0 }));
        assert!(fx.contains(&Effect::StageChanged {
            from: Stage::Playing,
            to: Stage::Complete
        }));
        assert_eq!(m.index(), 2);
        assert!(m.armed_token().is_none());
    }

    #[test]
    fn jitter_is_reproducible_for_a_seed() {
        let timing = TimingConfig {
            gap_jitter_ms: 400,
            max_gap_ms: 10_000,
            ..fast()
        };
        let lines = [("a", Speaker::Caller), ("b", Speaker::Agent), ("c", Speaker::Caller)];
        let gaps = |timing: TimingConfig| {
            let mut m = SimulationMachine::new(scenario(&lines), timing, 1);
            let mut now = Duration::ZERO;
            let mut fx = m.step(Input::Command(Command::Start), now);
            let mut gaps = Vec::new();
            while let Some((token, delay)) = armed(&fx) {
                if token.kind == TimerKind::Gap {
                    gaps.push(delay);
                }
                now += delay;
                fx = m.step(Input::Timer(token), now);
            }
            gaps
        };
        assert_eq!(gaps(timing.clone()), gaps(timing));
    }
}
