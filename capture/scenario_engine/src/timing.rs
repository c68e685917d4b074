use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{error::PlaybackError, scenario::Speaker};

/// Fastest reveal rate accepted by [`TimingConfig::validate`].
pub const MAX_CHARS_PER_SECOND: f64 = 1_000_000.0;

/// Largest gap multiplier accepted by [`TimingConfig::validate`].
pub const MAX_GAP_MULTIPLIER: f64 = 100.0;

/// Extra pause after a punctuation mark, on top of the per-character interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunctuationPause {
    /// Character that triggers the pause.
    pub mark: char,
    /// Additional pause in milliseconds.
    pub pause_ms: u64,
}

/// Pacing constants for a playback session. Durations are integer milliseconds so the
/// TOML form stays readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Typewriter reveal rate.
    #[serde(default = "default_chars_per_second")]
    pub chars_per_second: f64,
    /// Floor on the total reveal time of one message.
    #[serde(default)]
    pub min_reveal_ms: u64,
    /// Delay between `start` and the first character of message 0.
    #[serde(default)]
    pub start_delay_ms: u64,
    /// Base pause between two messages before role scaling.
    #[serde(default = "default_message_gap_ms")]
    pub message_gap_ms: u64,
    /// Lower clamp for the computed pause.
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,
    /// Upper clamp for the computed pause.
    #[serde(default = "default_max_gap_ms")]
    pub max_gap_ms: u64,
    /// Scale applied before agent turns ("thinking" time).
    #[serde(default = "default_agent_gap_multiplier")]
    pub agent_gap_multiplier: f64,
    /// Scale applied before caller turns.
    #[serde(default = "default_caller_gap_multiplier")]
    pub caller_gap_multiplier: f64,
    /// Upper bound of the random extra pause added to each computed gap.
    #[serde(default)]
    pub gap_jitter_ms: u64,
    /// Seed for the jitter generator, so runs are reproducible.
    #[serde(default = "default_jitter_seed")]
    pub jitter_seed: u64,
    /// Extra pauses after punctuation marks.
    #[serde(default)]
    pub punctuation_pauses: Vec<PunctuationPause>,
    /// How long a freshly captured CRM field stays highlighted.
    #[serde(default = "default_capture_flash_ms")]
    pub capture_flash_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            chars_per_second: default_chars_per_second(),
            min_reveal_ms: 0,
            start_delay_ms: 0,
            message_gap_ms: default_message_gap_ms(),
            min_gap_ms: default_min_gap_ms(),
            max_gap_ms: default_max_gap_ms(),
            agent_gap_multiplier: default_agent_gap_multiplier(),
            caller_gap_multiplier: default_caller_gap_multiplier(),
            gap_jitter_ms: 0,
            jitter_seed: default_jitter_seed(),
            punctuation_pauses: Vec::new(),
            capture_flash_ms: default_capture_flash_ms(),
        }
    }
}

impl TimingConfig {
    /// Default pacing plus a two second ring and sentence-level pauses, closer
    /// to a real call.
    #[must_use]
    pub fn natural() -> Self {
        Self {
            start_delay_ms: 2000,
            punctuation_pauses: [('.', 300), ('!', 300), ('?', 300), (',', 150), (':', 200), (';', 200)]
                .into_iter()
                .map(|(mark, pause_ms)| PunctuationPause { mark, pause_ms })
                .collect(),
            ..Self::default()
        }
    }

    /// Default pacing at a different reveal rate.
    #[must_use]
    pub fn with_rate(chars_per_second: f64) -> Self {
        Self {
            chars_per_second,
            ..Self::default()
        }
    }

    /// Loads a TOML file; missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading timing config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the config can drive a reveal.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        let rate = self.chars_per_second;
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_CHARS_PER_SECOND {
            return Err(PlaybackError::InvalidTiming(format!(
                "chars_per_second must be in (0, {MAX_CHARS_PER_SECOND}], got {rate}"
            )));
        }
        for (name, value) in [
            ("agent_gap_multiplier", self.agent_gap_multiplier),
            ("caller_gap_multiplier", self.caller_gap_multiplier),
        ] {
            if !value.is_finite() || !(0.0..=MAX_GAP_MULTIPLIER).contains(&value) {
                return Err(PlaybackError::InvalidTiming(format!(
                    "{name} must be in [0, {MAX_GAP_MULTIPLIER}], got {value}"
                )));
            }
        }
        if self.min_gap_ms > self.max_gap_ms {
            return Err(PlaybackError::InvalidTiming(format!(
                "min_gap_ms ({}) exceeds max_gap_ms ({})",
                self.min_gap_ms, self.max_gap_ms
            )));
        }
        Ok(())
    }

    /// Per-character interval for a text of `char_count` characters: `1 / rate`, stretched
    /// so the whole reveal lasts at least `min_reveal_ms`.
    #[must_use]
    pub fn char_interval(&self, char_count: usize) -> Duration {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let base = Duration::from_nanos((1e9 / self.chars_per_second).round() as u64);
        let floor = match u32::try_from(char_count) {
            Ok(count) if count > 0 => Duration::from_millis(self.min_reveal_ms) / count,
            _ => Duration::ZERO,
        };
        base.max(floor)
    }

    /// Extra pause after `ch`, zero when not configured.
    #[must_use]
    pub fn punctuation_pause(&self, ch: char) -> Duration {
        self.punctuation_pauses
            .iter()
            .find(|p| p.mark == ch)
            .map_or(Duration::ZERO, |p| Duration::from_millis(p.pause_ms))
    }

    /// Pause before a turn by `next_speaker`, with `jitter` already drawn by the caller.
    /// Saturates at `max_gap_ms` even for multipliers `validate` would reject.
    #[must_use]
    pub fn gap_before(&self, next_speaker: Speaker, jitter: Duration) -> Duration {
        let multiplier = match next_speaker {
            Speaker::Agent => self.agent_gap_multiplier,
            Speaker::Caller => self.caller_gap_multiplier,
        };
        let min = Duration::from_millis(self.min_gap_ms);
        let max = Duration::from_millis(self.max_gap_ms).max(min);
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.message_gap_ms as f64 / 1000.0 * multiplier;
        let scaled = if seconds.is_nan() || seconds <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
        };
        scaled.saturating_add(jitter).clamp(min, max)
    }

    /// Delay between `start` and message 0.
    #[must_use]
    pub const fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Highlight window of a captured CRM field.
    #[must_use]
    pub const fn capture_flash(&self) -> Duration {
        Duration::from_millis(self.capture_flash_ms)
    }
}

/// Partial config layered over a base, e.g. from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TimingOverrides {
    pub chars_per_second: Option<f64>,
    pub min_reveal_ms: Option<u64>,
    pub start_delay_ms: Option<u64>,
    pub message_gap_ms: Option<u64>,
    pub min_gap_ms: Option<u64>,
    pub max_gap_ms: Option<u64>,
    pub agent_gap_multiplier: Option<f64>,
    pub caller_gap_multiplier: Option<f64>,
    pub gap_jitter_ms: Option<u64>,
}

impl TimingOverrides {
    /// Returns `base` with every set field replaced.
    #[must_use]
    pub fn apply(&self, base: TimingConfig) -> TimingConfig {
        TimingConfig {
            chars_per_second: self.chars_per_second.unwrap_or(base.chars_per_second),
            min_reveal_ms: self.min_reveal_ms.unwrap_or(base.min_reveal_ms),
            start_delay_ms: self.start_delay_ms.unwrap_or(base.start_delay_ms),
            message_gap_ms: self.message_gap_ms.unwrap_or(base.message_gap_ms),
            min_gap_ms: self.min_gap_ms.unwrap_or(base.min_gap_ms),
            max_gap_ms: self.max_gap_ms.unwrap_or(base.max_gap_ms),
            agent_gap_multiplier: self
                .agent_gap_multiplier
                .unwrap_or(base.agent_gap_multiplier),
            caller_gap_multiplier: self
                .caller_gap_multiplier
                .unwrap_or(base.caller_gap_multiplier),
            gap_jitter_ms: self.gap_jitter_ms.unwrap_or(base.gap_jitter_ms),
            ..base
        }
    }
}

// 45ms per character, a natural speaking pace.
const fn default_chars_per_second() -> f64 {
    22.0
}

const fn default_message_gap_ms() -> u64 {
    900
}

const fn default_min_gap_ms() -> u64 {
    300
}

const fn default_max_gap_ms() -> u64 {
    2500
}

const fn default_agent_gap_multiplier() -> f64 {
    1.5
}

const fn default_caller_gap_multiplier() -> f64 {
    1.0
}

const fn default_jitter_seed() -> u64 {
    0x5EED
}

const fn default_capture_flash_ms() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn interval_follows_rate_and_floor() {
        let config = TimingConfig::with_rate(20.0);
        assert_eq!(config.char_interval(15), Duration::from_millis(50));
        let slow_floor = TimingConfig {
            min_reveal_ms: 3000,
            ..TimingConfig::with_rate(20.0)
        };
        assert_eq!(slow_floor.char_interval(10), Duration::from_millis(300));
        assert_eq!(slow_floor.char_interval(0), Duration::from_millis(50));
    }

    #[test]
    fn gaps_scale_by_role_and_clamp() {
        let config = TimingConfig::default();
        assert_eq!(
            config.gap_before(Speaker::Caller, Duration::ZERO),
            Duration::from_millis(900)
        );
        assert_eq!(
            config.gap_before(Speaker::Agent, Duration::ZERO),
            Duration::from_millis(1350)
        );
        assert_eq!(
            config.gap_before(Speaker::Agent, Duration::from_secs(5)),
            Duration::from_millis(2500)
        );
        let silent = TimingConfig {
            caller_gap_multiplier: 0.0,
            ..TimingConfig::default()
        };
        assert_eq!(
            silent.gap_before(Speaker::Caller, Duration::ZERO),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn validate_rejects_unusable_values() {
        assert!(TimingConfig::with_rate(0.0).validate().is_err());
        assert!(TimingConfig::with_rate(f64::NAN).validate().is_err());
        let inverted = TimingConfig {
            min_gap_ms: 3000,
            max_gap_ms: 100,
            ..TimingConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(PlaybackError::InvalidTiming(_))
        ));
        assert!(TimingConfig::natural().validate().is_ok());
    }

    #[test]
    fn oversized_multiplier_is_rejected_and_gap_saturates() {
        let err = TimingConfig::from_toml("agent_gap_multiplier = 1e300\n").unwrap_err();
        assert!(format!("{err:#}").contains("agent_gap_multiplier"));

        let huge = TimingConfig {
            agent_gap_multiplier: 1e300,
            caller_gap_multiplier: f64::INFINITY,
            ..TimingConfig::default()
        };
        assert_eq!(
            huge.gap_before(Speaker::Agent, Duration::MAX),
            Duration::from_millis(2500)
        );
        assert_eq!(
            huge.gap_before(Speaker::Caller, Duration::ZERO),
            Duration::from_millis(2500)
        );
        let inverted = TimingConfig {
            min_gap_ms: 3000,
            max_gap_ms: 100,
            ..TimingConfig::default()
        };
        assert_eq!(
            inverted.gap_before(Speaker::Caller, Duration::ZERO),
            Duration::from_millis(3000)
        );
        assert!(TimingConfig {
            agent_gap_multiplier: MAX_GAP_MULTIPLIER,
            ..TimingConfig::default()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn loads_partial_toml_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("timing.toml");
        fs::write(
            &path,
            r#"
chars_per_second = 30.0
agent_gap_multiplier = 2.0

[[punctuation_pauses]]
mark = "."
pause_ms = 250
"#,
        )
        .unwrap();
        let config = TimingConfig::load(&path).unwrap();
        assert!((config.chars_per_second - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.max_gap_ms, 2500);
        assert_eq!(config.punctuation_pause('.'), Duration::from_millis(250));
        assert_eq!(config.punctuation_pause(','), Duration::ZERO);
    }

    #[test]
    fn load_reports_invalid_rate_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "chars_per_second = -1.0\n").unwrap();
        let err = TimingConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("chars_per_second"));
    }

    #[test]
    fn overrides_replace_only_set_fields() {
        let overrides = TimingOverrides {
            chars_per_second: Some(40.0),
            gap_jitter_ms: Some(120),
            ..TimingOverrides::default()
        };
        let merged = overrides.apply(TimingConfig::natural());
        assert!((merged.chars_per_second - 40.0).abs() < f64::EPSILON);
        assert_eq!(merged.gap_jitter_ms, 120);
        assert_eq!(merged.message_gap_ms, 900);
        assert_eq!(merged.punctuation_pauses.len(), 6);
    }
}
