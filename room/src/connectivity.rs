/// Hysteretic link status. It takes `threshold` consecutive failures to go
/// from connected to disconnected; one success reconnects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connectivity {
    threshold: u32,
    failures: u32,
    connected: bool,
}

impl Connectivity {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            failures: 0,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns true when this flips the status.
    pub fn record_success(&mut self) -> bool {
        self.failures = 0;
        let changed = !self.connected;
        self.connected = true;
        changed
    }

    /// Returns true when this flips the status.
    pub fn record_failure(&mut self) -> bool {
        self.failures = self.failures.saturating_add(1);
        if self.connected && self.failures >= self.threshold {
            self.connected = false;
            return true;
        }
        false
    }
}
