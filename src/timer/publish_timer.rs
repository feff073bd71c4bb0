use tokio::time::Duration;
use tokio::time::Instant;

/// Publishing cadence of one subscription.
#[derive(Clone, Debug)]
pub struct PublishTimer {
    pub next_deadline: Instant,
    pub interval: Duration,
}

impl PublishTimer {
    pub fn new(
        interval: Duration,
        now: Instant,
    ) -> Self {
        Self {
            next_deadline: now + interval,
            interval,
        }
    }

    pub fn reset(
        &mut self,
        now: Instant,
    ) {
        self.next_deadline = now + self.interval;
    }

    pub fn set_interval(
        &mut self,
        interval: Duration,
        now: Instant,
    ) {
        self.interval = interval;
        self.reset(now);
    }

    /// Moves the deadline past `now`, skipping intervals that were missed
    /// while the loop was busy.
    pub fn advance(
        &mut self,
        now: Instant,
    ) {
        if self.interval.is_zero() {
            self.next_deadline = now;
            return;
        }
        while self.next_deadline <= now {
            self.next_deadline += self.interval;
        }
    }

    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_expired(
        &self,
        now: Instant,
    ) -> bool {
        self.next_deadline <= now
    }

    pub fn remaining(
        &self,
        now: Instant,
    ) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }
}
