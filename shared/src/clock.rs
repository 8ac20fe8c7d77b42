use serde::{Deserialize, Serialize};

/// Time limits announced with each turn, in seconds. Zero expires at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnWindowConfig {
    /// How long a notified player may deliberate before the offer lapses.
    pub decision_window_secs: u32,
    /// How long the opened editor stays writable.
    pub edit_window_secs: u32,
}

impl TurnWindowConfig {
    pub const fn new(decision_window_secs: u32, edit_window_secs: u32) -> Self {
        Self {
            decision_window_secs,
            edit_window_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockKind {
    Decision,
    Edit,
}

/// Identifies one countdown run. Restarting or cancelling the clock
/// invalidates every handle issued before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockHandle {
    kind: ClockKind,
    generation: u64,
}

impl ClockHandle {
    pub const fn kind(self) -> ClockKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick { remaining: u32 },
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    generation: u64,
    remaining: u32,
}

/// A 1 Hz countdown driven by an external scheduler.
///
/// The scheduler calls [`tick`](Self::tick) once per second with the handle it
/// was given. Ticks for a handle that is no longer current return `None`, so a
/// late tick from a torn-down interval can never reach the caller.
#[derive(Debug, Clone)]
pub struct TurnClock {
    kind: ClockKind,
    generation: u64,
    running: Option<Countdown>,
}

impl TurnClock {
    pub const fn new(kind: ClockKind) -> Self {
        Self {
            kind,
            generation: 0,
            running: None,
        }
    }

    pub const fn kind(&self) -> ClockKind {
        self.kind
    }

    /// Seconds a resumed countdown runs for: a saved non-zero remainder wins
    /// over the full window.
    pub fn resolve_window(remainder: Option<u32>, full_window: u32) -> u32 {
        remainder.filter(|secs| *secs > 0).unwrap_or(full_window)
    }

    /// Begin a countdown, cancelling any run in progress. A zero-second
    /// countdown expires on its first tick.
    pub fn start(&mut self, seconds: u32) -> ClockHandle {
        self.generation += 1;
        if let Some(previous) = self.running.take() {
            tracing::trace!(
                kind = ?self.kind,
                remaining = previous.remaining,
                "replacing running countdown"
            );
        }
        self.running = Some(Countdown {
            generation: self.generation,
            remaining: seconds,
        });
        ClockHandle {
            kind: self.kind,
            generation: self.generation,
        }
    }

    pub fn resume(&mut self, remainder: Option<u32>, full_window: u32) -> ClockHandle {
        self.start(Self::resolve_window(remainder, full_window))
    }

    /// Cancel the run identified by `handle`. Returns the unused seconds, or
    /// `None` if the handle was already expired, cancelled or replaced.
    pub fn cancel(&mut self, handle: ClockHandle) -> Option<u32> {
        if !self.is_current(handle) {
            return None;
        }
        self.stop()
    }

    /// Cancel whatever is running. Returns the unused seconds.
    pub fn stop(&mut self) -> Option<u32> {
        let countdown = self.running.take()?;
        self.generation += 1;
        Some(countdown.remaining)
    }

    pub fn is_current(&self, handle: ClockHandle) -> bool {
        handle.kind == self.kind
            && self
                .running
                .is_some_and(|countdown| countdown.generation == handle.generation)
    }

    pub fn handle(&self) -> Option<ClockHandle> {
        self.running.map(|countdown| ClockHandle {
            kind: self.kind,
            generation: countdown.generation,
        })
    }

    pub fn remaining(&self) -> Option<u32> {
        self.running.map(|countdown| countdown.remaining)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self, handle: ClockHandle) -> Option<ClockEvent> {
        if !self.is_current(handle) {
            tracing::trace!(kind = ?handle.kind, "ignoring stale tick");
            return None;
        }
        let countdown = self.running.as_mut()?;
        countdown.remaining = countdown.remaining.saturating_sub(1);
        let remaining = countdown.remaining;
        if remaining == 0 {
            self.running = None;
            self.generation += 1;
            return Some(ClockEvent::Expired);
        }
        Some(ClockEvent::Tick { remaining })
    }
}
