use chrono::{DateTime, Local};

/// Source of the current instant
///
/// Injectable so scheduling decisions can be tested against fixed times.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Clock backed by the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to a single instant, for deterministic tests
#[cfg(test)]
pub struct FixedClock(pub DateTime<Local>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
