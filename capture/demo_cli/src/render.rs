use std::io::{self, Write};

use capture_scenario_engine::{CallState, PlaybackSnapshot, Scenario};

/// Streams a playback to a terminal, printing only what appeared since the last update.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    rang: bool,
    finished: usize,
    captured: usize,
    printed_bytes: usize,
    line_open: bool,
}

impl TranscriptPrinter {
    /// Prints the text revealed since the previous call.
    pub fn update(&mut self, snapshot: &PlaybackSnapshot, out: &mut impl Write) -> io::Result<()> {
        if snapshot.call_state == CallState::Ringing && !self.rang {
            writeln!(out, "(ringing)")?;
            self.rang = true;
        }
        for message in snapshot.transcript.iter().skip(self.finished) {
            if !self.line_open {
                write!(out, "{}: ", message.speaker.label())?;
            }
            let rest = message.text.get(self.printed_bytes..).unwrap_or_default();
            writeln!(out, "{rest}")?;
            self.finished += 1;
            self.printed_bytes = 0;
            self.line_open = false;
        }
        for field in snapshot.captured.iter().skip(self.captured) {
            writeln!(out, "  + {}: {}", field.field.label(), field.value)?;
            self.captured += 1;
        }
        if let Some(active) = snapshot.active.as_ref().filter(|a| a.index == self.finished) {
            if !self.line_open {
                write!(out, "{}: ", active.speaker.label())?;
                self.line_open = true;
            }
            let rest = active.revealed.get(self.printed_bytes..).unwrap_or_default();
            write!(out, "{rest}")?;
            self.printed_bytes = active.revealed.len();
        }
        out.flush()
    }
}

/// Full transcript with timestamps, for `show`.
pub fn transcript(scenario: &Scenario) -> String {
    scenario
        .transcript
        .iter()
        .map(|m| match &m.timestamp {
            Some(at) => format!("[{at}] {}: {}\n", m.speaker.label(), m.text),
            None => format!("{}: {}\n", m.speaker.label(), m.text),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use capture_scenario_engine::{
        BusinessType, CrmField, ScenarioCategory, ScenarioPlayer, TimingConfig, TranscriptMessage,
    };

    use super::*;

    fn scenario() -> Arc<Scenario> {
        Arc::new(
            Scenario::new("t", "T", BusinessType::Auto, ScenarioCategory::Routine).with_transcript(
                vec![
                    TranscriptMessage::agent("AutoCare Pro").at("0:01"),
                    TranscriptMessage::caller("Brakes squeak"),
                ],
            ),
        )
    }

    #[test]
    fn streams_each_character_once() {
        let mut player = ScenarioPlayer::builder(scenario())
            .timing(TimingConfig::with_rate(100.0))
            .build()
            .unwrap();
        let mut printer = TranscriptPrinter::default();
        let mut out = Vec::new();
        player.start();
        printer.update(&player.snapshot(), &mut out).unwrap();
        for _ in 0..40 {
            player.advance_by(Duration::from_millis(70));
            printer.update(&player.snapshot(), &mut out).unwrap();
        }
        assert!(player.snapshot().is_complete());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "AI: AutoCare Pro\nCaller: Brakes squeak\n"
        );
    }

    #[test]
    fn prints_ring_once_and_captured_fields_after_their_message() {
        let scenario = Arc::new(
            Scenario::new("c", "C", BusinessType::Auto, ScenarioCategory::Routine).with_transcript(
                vec![
                    TranscriptMessage::caller("Dan here").capture(CrmField::Name, "Daniel Wright"),
                    TranscriptMessage::agent("Booked"),
                ],
            ),
        );
        let mut player = ScenarioPlayer::builder(scenario)
            .timing(TimingConfig {
                start_delay_ms: 500,
                ..TimingConfig::with_rate(100.0)
            })
            .build()
            .unwrap();
        let mut printer = TranscriptPrinter::default();
        let mut out = Vec::new();
        player.start();
        for _ in 0..60 {
            printer.update(&player.snapshot(), &mut out).unwrap();
            player.advance_by(Duration::from_millis(70));
        }
        printer.update(&player.snapshot(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "(ringing)\nCaller: Dan here\n  + Name: Daniel Wright\nAI: Booked\n"
        );
    }

    #[test]
    fn transcript_lists_timestamps_when_present() {
        assert_eq!(
            transcript(&scenario()),
            "[0:01] AI: AutoCare Pro\nCaller: Brakes squeak\n"
        );
    }
}
