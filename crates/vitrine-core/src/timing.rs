#![forbid(unsafe_code)]

//! Time-gating primitives.
//!
//! Every primitive takes the current [`Instant`] as an argument instead of
//! reading a clock, so callers (and tests) control time explicitly.
//!
//! - [`Throttle`]: leading-edge throttle. Fires immediately, then suppresses
//!   further fires until the interval has elapsed.
//! - [`Debounce`]: trailing-edge debounce. Fires once the input has been
//!   quiet for the delay.
//! - [`FrameGate`]: the "ticking" flag that coalesces many requests within
//!   one animation frame into a single update.
//! - [`TimerQueue`]: ordered one-shot timers carrying a payload.

use std::time::Duration;

use web_time::Instant;

/// Leading-edge throttle.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    /// Returns `true` if the guarded action should run now.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// Forget the last fire time so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Trailing-edge debounce.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record activity, pushing the deadline out by the full delay.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns `true` exactly once when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Coalesces update requests into at most one per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameGate {
    ticking: bool,
}

impl FrameGate {
    pub const fn new() -> Self {
        Self { ticking: false }
    }

    /// Request an update. Returns `true` only for the first request of a
    /// frame (the caller schedules the frame callback once).
    pub fn request(&mut self) -> bool {
        if self.ticking {
            false
        } else {
            self.ticking = true;
            true
        }
    }

    /// Run at the frame boundary. Returns whether an update was pending and
    /// clears the flag.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.ticking)
    }

    #[inline]
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }
}

/// Handle for cancelling a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct TimerEntry<T> {
    id: TimerId,
    deadline: Instant,
    payload: T,
}

/// One-shot timers ordered by deadline, then by scheduling order.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    entries: Vec<TimerEntry<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `payload` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        // Stable insert keeps equal deadlines in scheduling order.
        let pos = self.entries.partition_point(|e| e.deadline <= deadline);
        self.entries.insert(
            pos,
            TimerEntry {
                id,
                deadline,
                payload,
            },
        );
        id
    }

    /// Schedule `payload` to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration, payload: T) -> TimerId {
        self.schedule(now + delay, payload)
    }

    /// Cancel a timer. Returns the payload if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let idx = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(idx).payload)
    }

    /// Remove and return every payload whose deadline is at or before `now`.
    pub fn drain_due(&mut self, now: Instant) -> Vec<T> {
        let due = self.entries.partition_point(|e| e.deadline <= now);
        self.entries.drain(..due).map(|e| e.payload).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.deadline)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
