use std::{fmt::Write as _, sync::Arc, time::Duration};

use serde::Serialize;

use crate::{
    error::PlaybackError,
    player::{PlaybackEvent, ScenarioPlayer},
    scenario::{Scenario, Speaker},
    timing::TimingConfig,
};

/// When one message is on screen during an uninterrupted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageTiming {
    /// Position in the transcript.
    pub index: usize,
    /// Who speaks it.
    pub speaker: Speaker,
    /// Characters revealed.
    pub chars: usize,
    /// Offset of the reveal start.
    pub started: Duration,
    /// Offset of the last character.
    pub finished: Duration,
}

/// Schedule of a whole scenario under one timing config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    /// Scenario measured.
    pub scenario_id: String,
    /// Per-message offsets in order.
    pub messages: Vec<MessageTiming>,
    /// Offset at which playback completes.
    pub total: Duration,
}

/// Plays `scenario` in virtual time from start to completion and records when each
/// message starts and finishes.
pub fn timeline(scenario: Arc<Scenario>, timing: &TimingConfig) -> Result<Timeline, PlaybackError> {
    let mut player = ScenarioPlayer::builder(Arc::clone(&scenario))
        .timing(timing.clone())
        .build()?;
    let mut messages: Vec<MessageTiming> = Vec::with_capacity(scenario.len());
    let mut record = |events: Vec<PlaybackEvent>, now: Duration| {
        for event in events {
            match event {
                PlaybackEvent::MessageStarted { index, speaker } => messages.push(MessageTiming {
                    index,
                    speaker,
                    chars: scenario.transcript[index].text.chars().count(),
                    started: now,
                    finished: now,
                }),
                PlaybackEvent::MessageFinished { index } => {
                    if let Some(entry) = messages.iter_mut().find(|m| m.index == index) {
                        entry.finished = now;
                    }
                }
                PlaybackEvent::StageChanged { .. } => {}
            }
        }
    };
    record(player.start(), player.now());
    while let Some(deadline) = player.next_deadline() {
        let events = player.advance_to(deadline);
        record(events, player.now());
    }
    Ok(Timeline {
        scenario_id: scenario.id.clone(),
        messages,
        total: player.now(),
    })
}

impl Timeline {
    /// One line per message plus the total, for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            let _ = writeln!(
                out,
                "#{:<3} {:<6} {:>8.2}s -> {:>8.2}s  ({} chars)",
                m.index,
                m.speaker.label(),
                m.started.as_secs_f64(),
                m.finished.as_secs_f64(),
                m.chars
            );
        }
        let _ = writeln!(out, "total {:.2}s", self.total.as_secs_f64());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::ScenarioCatalog,
        scenario::{BusinessType, ScenarioCategory, TranscriptMessage},
    };

    #[test]
    fn offsets_follow_rate_and_gaps() {
        let scenario = Arc::new(
            Scenario::new("hvac", "AC", BusinessType::Hvac, ScenarioCategory::Emergency)
                .with_transcript(vec![
                    TranscriptMessage::caller("My AC stopped working"),
                    TranscriptMessage::agent("I can help, what's your address?"),
                ]),
        );
        let t = timeline(scenario, &TimingConfig::with_rate(20.0)).unwrap();
        assert_eq!(t.messages.len(), 2);
        assert_eq!(t.messages[0].started, Duration::ZERO);
        assert_eq!(t.messages[0].finished, Duration::from_millis(1050));
        assert_eq!(t.messages[1].started, Duration::from_millis(1050 + 1350));
        assert_eq!(t.messages[1].finished, Duration::from_millis(2400 + 1600));
        assert_eq!(t.total, Duration::from_millis(4000));
        assert!(t.render_text().ends_with("total 4.00s\n"));
    }

    #[test]
    fn every_builtin_scenario_runs_to_completion() {
        for scenario in ScenarioCatalog::builtin().all() {
            let t = timeline(Arc::clone(scenario), &TimingConfig::natural()).unwrap();
            assert_eq!(t.messages.len(), scenario.len());
            assert!(t
                .messages
                .windows(2)
                .all(|w| w[0].finished <= w[1].started));
        }
    }
}
