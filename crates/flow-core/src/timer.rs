use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_SECS: u32 = 25 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
}

impl TimerPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Counting { remaining_secs: u32 },
    Completed,
}

/// Countdown advanced by discrete one-second ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pomodoro {
    pub length_secs: u32,
    pub remaining_secs: u32,
    pub phase: TimerPhase,
}

impl Default for Pomodoro {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_SECS)
    }
}

impl Pomodoro {
    pub fn new(length_secs: u32) -> Self {
        let length_secs = length_secs.max(1);
        Self {
            length_secs,
            remaining_secs: length_secs,
            phase: TimerPhase::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Start or pause. Pausing keeps the remaining time.
    pub fn toggle(&mut self) -> TimerPhase {
        self.phase = match self.phase {
            TimerPhase::Idle => TimerPhase::Running,
            TimerPhase::Running => TimerPhase::Idle,
        };
        self.phase
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.remaining_secs = self.length_secs;
            self.phase = TimerPhase::Idle;
            return TickOutcome::Completed;
        }
        TickOutcome::Counting {
            remaining_secs: self.remaining_secs,
        }
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.length_secs;
        self.phase = TimerPhase::Idle;
    }

    /// Applies a new session length. A paused or idle countdown that has not
    /// started yet picks up the new length immediately.
    pub fn set_length(&mut self, length_secs: u32) {
        let length_secs = length_secs.max(1);
        let untouched = self.remaining_secs == self.length_secs;
        self.length_secs = length_secs;
        if untouched || self.remaining_secs > length_secs {
            self.remaining_secs = length_secs;
        }
    }

    /// Restored sessions never resume on their own.
    pub fn restored(mut self) -> Self {
        self.phase = TimerPhase::Idle;
        if self.remaining_secs == 0 || self.remaining_secs > self.length_secs {
            self.remaining_secs = self.length_secs;
        }
        self
    }

    pub fn session_minutes(&self) -> u32 {
        self.length_secs / 60
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
