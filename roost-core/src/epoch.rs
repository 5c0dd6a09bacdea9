//! Monotonic request generations.
//!
//! Every asynchronous run captures an epoch when it starts and checks it when it
//! completes; a run whose epoch is no longer current must not touch shared state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::ports::PortError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
/// One request generation.
pub struct RequestEpoch(pub u64);

impl fmt::Display for RequestEpoch {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
/// Shared counter handing out request epochs.
pub struct EpochClock {
    current: Arc<AtomicU64>,
}

impl EpochClock {
    /// Clock starting at epoch zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest epoch handed out.
    #[must_use]
    pub fn current(&self) -> RequestEpoch {
        RequestEpoch(self.current.load(Ordering::SeqCst))
    }

    /// Start a new generation, superseding every earlier one.
    #[must_use]
    pub fn begin(&self) -> EpochGuard {
        let epoch = RequestEpoch(self.current.fetch_add(1, Ordering::SeqCst) + 1);
        EpochGuard {
            clock: self.clone(),
            epoch,
        }
    }
}

#[derive(Debug, Clone)]
/// Captured epoch of one in-flight run.
pub struct EpochGuard {
    clock: EpochClock,
    epoch: RequestEpoch,
}

impl EpochGuard {
    /// Epoch captured at start.
    #[must_use]
    pub fn epoch(&self) -> RequestEpoch {
        self.epoch
    }

    /// Whether no newer generation has started since.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.clock.current() == self.epoch
    }

    /// Fail with [`PortError::Aborted`] once superseded.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Aborted`] when a newer generation exists.
    pub fn ensure_current(&self) -> Result<(), PortError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(PortError::Aborted)
        }
    }
}
