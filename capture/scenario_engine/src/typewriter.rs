use std::time::Duration;

use crate::timing::TimingConfig;

/// Incrementally reveals a string, one character per [`Typewriter::advance`].
///
/// The revealed text is always a prefix of the target ending on a character
/// boundary. While inactive the prefix is frozen; reactivation continues from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Typewriter {
    text: String,
    revealed_bytes: usize,
    revealed_chars: usize,
    total_chars: usize,
    active: bool,
}

impl Typewriter {
    /// Creates an inactive typewriter with nothing revealed.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let total_chars = text.chars().count();
        Self {
            text,
            revealed_bytes: 0,
            revealed_chars: 0,
            total_chars,
            active: false,
        }
    }

    /// Switches to a new target. A different text restarts the reveal from empty;
    /// the same text leaves progress untouched. Returns whether it restarted.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        let active = self.active;
        *self = Self::new(text);
        self.active = active;
        true
    }

    /// Turns growth on or off.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether [`Typewriter::advance`] reveals anything.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Reveals the next character. Returns `None` when inactive or already complete.
    pub fn advance(&mut self) -> Option<char> {
        if !self.active {
            return None;
        }
        let next = self.text[self.revealed_bytes..].chars().next()?;
        self.revealed_bytes += next.len_utf8();
        self.revealed_chars += 1;
        Some(next)
    }

    /// Jumps to the full text regardless of activation.
    pub fn reveal_all(&mut self) {
        self.revealed_bytes = self.text.len();
        self.revealed_chars = self.total_chars;
    }

    /// Clears the revealed prefix and deactivates; the target is kept.
    pub fn reset(&mut self) {
        self.revealed_bytes = 0;
        self.revealed_chars = 0;
        self.active = false;
    }

    /// Currently visible prefix.
    #[must_use]
    pub fn revealed(&self) -> &str {
        &self.text[..self.revealed_bytes]
    }

    /// Target text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Characters revealed so far.
    #[must_use]
    pub const fn revealed_chars(&self) -> usize {
        self.revealed_chars
    }

    /// Characters in the target.
    #[must_use]
    pub const fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Whether the whole target is visible. An empty target is always complete.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.revealed_chars == self.total_chars
    }

    /// Fraction revealed in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.total_chars == 0 {
            1.0
        } else {
            self.revealed_chars as f64 / self.total_chars as f64
        }
    }
}

/// Per-character timing for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    interval: Duration,
}

impl Pacing {
    /// Pacing for `text` under `config`, including the minimum-duration floor.
    #[must_use]
    pub fn for_text(config: &TimingConfig, text: &str) -> Self {
        Self {
            interval: config.char_interval(text.chars().count()),
        }
    }

    /// Delay before the first character appears.
    #[must_use]
    pub const fn first_delay(&self) -> Duration {
        self.interval
    }

    /// Delay before the character following `ch` appears.
    #[must_use]
    pub fn delay_after(&self, config: &TimingConfig, ch: char) -> Duration {
        self.interval + config.punctuation_pause(ch)
    }
}
