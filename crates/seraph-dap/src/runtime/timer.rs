use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Wall-clock budget of one in-flight script call.
///
/// The runtime checks [`CallTimer::is_expired`] from its own line hook and
/// aborts the call once the budget is spent. The debugger calls
/// [`CallTimer::reset`] after every pause so time spent stopped at a
/// breakpoint never counts against the script.
#[derive(Debug)]
pub struct CallTimer {
    started: Mutex<Instant>,
    limit: Duration,
}

impl CallTimer {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Mutex::new(Instant::now()),
            limit,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn reset(&self) {
        *self.started.lock() = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.lock().elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.limit
    }
}
