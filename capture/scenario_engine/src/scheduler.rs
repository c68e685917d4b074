//! Injectable timer capability.
//!
//! The state machine never touches a wall clock. It asks for timers through
//! [`Scheduler`] and receives [`TimerToken`]s back when they fire, which keeps
//! playback deterministic and lets tests drive it in virtual time.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use serde::Serialize;

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Reveal the next character of the active message.
    Reveal,
    /// End of the pause before the next message.
    Gap,
}

/// Identity of one armed timer.
///
/// `session` changes on every reset or scenario switch, `seq` on every arm. A
/// firing is honored only when it equals the token the machine currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerToken {
    /// Generation of the state machine that armed the timer.
    pub session: u64,
    /// Arm counter within the session.
    pub seq: u64,
    /// Purpose.
    pub kind: TimerKind,
}

/// Timer service used by the player.
pub trait Scheduler: Send {
    /// Current time on this scheduler's clock, measured from its origin.
    fn now(&self) -> Duration;

    /// Arms `token` to fire `delay` after [`Scheduler::now`].
    fn schedule(&mut self, delay: Duration, token: TimerToken);

    /// Disarms `token`. Returns whether it was still pending.
    fn cancel(&mut self, token: TimerToken) -> bool;

    /// Disarms everything, returning how many timers were dropped.
    fn cancel_all(&mut self) -> usize;

    /// Deadline of the earliest pending timer.
    fn next_deadline(&self) -> Option<Duration>;

    /// Pops the earliest timer due at or before `until`, moving the clock to its
    /// deadline. Timers with equal deadlines fire in arm order.
    fn fire_next(&mut self, until: Duration) -> Option<TimerToken>;

    /// Moves the clock forward to `to` without firing anything. Never moves backwards.
    fn advance_clock(&mut self, to: Duration);

    /// Number of pending timers.
    fn pending(&self) -> usize;
}

/// Scheduler whose clock only moves when told to.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Duration,
    next_order: u64,
    queue: BTreeMap<(Duration, u64), TimerToken>,
    armed: HashMap<TimerToken, (Duration, u64)>,
}

impl VirtualScheduler {
    /// Creates a scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline of a pending token.
    #[must_use]
    pub fn deadline_of(&self, token: TimerToken) -> Option<Duration> {
        self.armed.get(&token).map(|(deadline, _)| *deadline)
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, delay: Duration, token: TimerToken) {
        self.cancel(token);
        let key = (self.now + delay, self.next_order);
        self.next_order += 1;
        self.queue.insert(key, token);
        self.armed.insert(token, key);
    }

    fn cancel(&mut self, token: TimerToken) -> bool {
        self.armed
            .remove(&token)
            .is_some_and(|key| self.queue.remove(&key).is_some())
    }

    fn cancel_all(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        self.armed.clear();
        dropped
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    fn fire_next(&mut self, until: Duration) -> Option<TimerToken> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > until {
            return None;
        }
        let token = self.queue.remove(&key)?;
        self.armed.remove(&token);
        self.now = self.now.max(key.0);
        Some(token)
    }

    fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(seq: u64, kind: TimerKind) -> TimerToken {
        TimerToken {
            session: 1,
            seq,
            kind,
        }
    }

    #[test]
    fn fires_in_deadline_then_arm_order() {
        let mut sched = VirtualScheduler::new();
        sched.schedule(Duration::from_millis(30), token(1, TimerKind::Gap));
        sched.schedule(Duration::from_millis(10), token(2, TimerKind::Reveal));
        sched.schedule(Duration::from_millis(10), token(3, TimerKind::Reveal));
        let until = Duration::from_millis(100);
        let fired: Vec<_> = std::iter::from_fn(|| sched.fire_next(until))
            .map(|t| t.seq)
            .collect();
        assert_eq!(fired, vec![2, 3, 1]);
        assert_eq!(sched.now(), Duration::from_millis(30));
    }

    #[test]
    fn respects_horizon_and_clock_moves_forward_only() {
        let mut sched = VirtualScheduler::new();
        sched.schedule(Duration::from_millis(50), token(1, TimerKind::Reveal));
        assert!(sched.fire_next(Duration::from_millis(49)).is_none());
        sched.advance_clock(Duration::from_millis(49));
        sched.advance_clock(Duration::from_millis(10));
        assert_eq!(sched.now(), Duration::from_millis(49));
        assert_eq!(sched.next_deadline(), Some(Duration::from_millis(50)));
        assert_eq!(
            sched.fire_next(Duration::from_millis(50)),
            Some(token(1, TimerKind::Reveal))
        );
    }

    #[test]
    fn cancel_removes_pending_timers() {
        let mut sched = VirtualScheduler::new();
        let first = token(1, TimerKind::Reveal);
        sched.schedule(Duration::from_millis(5), first);
        sched.schedule(Duration::from_millis(5), token(2, TimerKind::Gap));
        assert!(sched.cancel(first));
        assert!(!sched.cancel(first));
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.cancel_all(), 1);
        assert!(sched.fire_next(Duration::from_secs(1)).is_none());
    }

    #[test]
    fn rescheduling_a_token_replaces_its_deadline() {
        let mut sched = VirtualScheduler::new();
        let t = token(7, TimerKind::Gap);
        sched.schedule(Duration::from_millis(5), t);
        sched.schedule(Duration::from_millis(20), t);
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.deadline_of(t), Some(Duration::from_millis(20)));
    }
}
