use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    #[default]
    Stopped,
    Infinite,
    Countdown,
}

/// Phase timer. `end_at` is epoch milliseconds so every device can compute the
/// remaining time on its own clock without further writes from the Host.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub mode: TimerMode,
    pub duration_sec: u64,
    pub end_at: Option<i64>,
    pub running: bool,
}

impl Timer {
    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn infinite() -> Self {
        Self {
            mode: TimerMode::Infinite,
            ..Self::default()
        }
    }

    pub fn countdown(seconds: u64, now_ms: i64) -> Self {
        Self {
            mode: TimerMode::Countdown,
            duration_sec: seconds,
            end_at: Some(now_ms.saturating_add(
                i64::try_from(seconds).unwrap_or(i64::MAX).saturating_mul(1000),
            )),
            running: true,
        }
    }

    /// Seconds left on a countdown, `None` for other modes.
    pub fn remaining(&self, now_ms: i64) -> Option<u64> {
        if self.mode != TimerMode::Countdown {
            return None;
        }
        match (self.running, self.end_at) {
            (true, Some(end_at)) => {
                let left_ms = end_at.saturating_sub(now_ms).max(0);
                // ceil to whole seconds
                Some((left_ms.saturating_add(999) / 1000) as u64)
            }
            _ => Some(self.duration_sec),
        }
    }

    /// Returns false when there is no running countdown to pause.
    pub fn pause(&mut self, now_ms: i64) -> bool {
        if self.mode != TimerMode::Countdown || !self.running {
            return false;
        }
        let remaining = self.remaining(now_ms).unwrap_or(0);
        *self = Self {
            mode: TimerMode::Countdown,
            duration_sec: remaining,
            end_at: None,
            running: false,
        };
        true
    }

    /// Returns false when there is no paused countdown to resume.
    pub fn resume(&mut self, now_ms: i64) -> bool {
        if self.mode != TimerMode::Countdown || self.running {
            return false;
        }
        *self = Self::countdown(self.duration_sec, now_ms);
        true
    }
}
