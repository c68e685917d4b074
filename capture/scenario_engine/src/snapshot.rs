use std::time::Duration;

use serde::Serialize;

use crate::{
    machine::{CallState, Phase, SimulationMachine, Stage},
    scenario::{CrmField, Speaker},
};

/// A fully revealed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleMessage {
    /// Position in the transcript.
    pub index: usize,
    /// Who spoke.
    pub speaker: Speaker,
    /// Full text.
    pub text: String,
    /// Call timestamp label, when authored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// The message currently being typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveMessage {
    /// Position in the transcript.
    pub index: usize,
    /// Who speaks.
    pub speaker: Speaker,
    /// Visible prefix.
    pub revealed: String,
    /// Whether the prefix is the whole text.
    pub complete: bool,
}

/// A CRM field filled in by a finished message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedField {
    /// Field being filled.
    pub field: CrmField,
    /// Captured value.
    pub value: String,
    /// Message that revealed it.
    pub message_index: usize,
    /// Inside the highlight window after its message finished.
    pub flashing: bool,
}

/// Renderable view of a player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    /// Scenario being played.
    pub scenario_id: String,
    /// Current stage.
    pub stage: Stage,
    /// Phone line state.
    pub call_state: CallState,
    /// Current message index; equals `total_messages` once complete.
    pub message_index: usize,
    /// Transcript length.
    pub total_messages: usize,
    /// Messages already fully revealed, in order.
    pub transcript: Vec<VisibleMessage>,
    /// Message being typed, if any.
    pub active: Option<ActiveMessage>,
    /// An inter-message pause is pending; `next_speaker` is about to talk.
    pub awaiting_next: bool,
    /// Speaker of the pending message while `awaiting_next`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_speaker: Option<Speaker>,
    /// CRM fields filled so far, in reveal order.
    pub captured: Vec<CapturedField>,
    /// `message_index / total_messages`, `1.0` once complete or empty.
    pub progress: f64,
    /// Player clock reading in milliseconds.
    pub elapsed_ms: u64,
}

impl PlaybackSnapshot {
    /// Captures the state of `machine` at clock reading `now`.
    #[must_use]
    pub fn capture(machine: &SimulationMachine, now: Duration) -> Self {
        let scenario = machine.scenario();
        let messages = &scenario.transcript;
        let (finished, active, pending) = match (machine.stage(), machine.phase()) {
            (Stage::Complete, _) => (messages.len(), None, None),
            (_, Phase::Typing) => {
                let typewriter = machine.typewriter();
                let index = machine.index();
                let active = messages.get(index).map(|message| ActiveMessage {
                    index,
                    speaker: message.speaker,
                    revealed: typewriter.revealed().to_string(),
                    complete: typewriter.is_complete(),
                });
                (index, active, None)
            }
            (_, Phase::Waiting { next }) => (next, None, messages.get(next)),
            (_, Phase::Settled) => (0, None, None),
        };
        let transcript = messages
            .iter()
            .take(finished)
            .enumerate()
            .map(|(index, message)| VisibleMessage {
                index,
                speaker: message.speaker,
                text: message.text.clone(),
                timestamp: message.timestamp.clone(),
            })
            .collect();
        let flash = machine.timing().capture_flash();
        let captured = scenario
            .captures()
            .take_while(|(index, _)| *index < finished)
            .map(|(index, capture)| CapturedField {
                field: capture.field,
                value: capture.value.clone(),
                message_index: index,
                flashing: machine
                    .finished_at(index)
                    .is_some_and(|at| now < at.saturating_add(flash)),
            })
            .collect();
        Self {
            scenario_id: scenario.id.clone(),
            stage: machine.stage(),
            call_state: machine.call_state(),
            message_index: machine.index(),
            total_messages: messages.len(),
            transcript,
            active,
            awaiting_next: pending.is_some(),
            next_speaker: pending.map(|message| message.speaker),
            captured,
            progress: machine.progress(),
            elapsed_ms: u64::try_from(now.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Text on screen for message `index`: full when finished, the prefix when typing.
    #[must_use]
    pub fn text_of(&self, index: usize) -> Option<&str> {
        self.transcript
            .get(index)
            .map(|message| message.text.as_str())
            .or_else(|| {
                self.active
                    .as_ref()
                    .filter(|active| active.index == index)
                    .map(|active| active.revealed.as_str())
            })
    }

    /// Latest value captured for `field`.
    #[must_use]
    pub fn captured_value(&self, field: CrmField) -> Option<&str> {
        self.captured
            .iter()
            .rev()
            .find(|c| c.field == field)
            .map(|c| c.value.as_str())
    }

    /// Whether playback has reached its terminal stage.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }
}
