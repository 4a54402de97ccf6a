//! # BookPress Testing
//!
//! Test doubles shared by the BookPress service crates.
//!
//! - [`FixedClock`] / [`test_clock`]: deterministic time
//! - [`InMemoryEventBus`]: records publications and injects failures
//! - [`ReducerTest`]: Given-When-Then reducer harness
//! - [`init_test_tracing`]: opt-in log output for a failing test
//!
//! ## Example
//!
//! ```ignore
//! use bookpress_testing::{test_clock, InMemoryEventBus};
//!
//! #[tokio::test]
//! async fn registers_manuscript() {
//!     let bus = InMemoryEventBus::new();
//!     let store = writing_store(test_clock(), bus.clone());
//!
//!     store.send(ManuscriptAction::RegisterManuscript { .. }).await.unwrap();
//!
//!     assert_eq!(bus.published_to("manuscript-events").len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use bookpress_core::environment::Clock;

/// In-memory event bus with recording and failure injection
pub mod event_bus;

/// Given-When-Then harness for reducers
pub mod reducer_test;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use bookpress_testing::mocks::FixedClock;
    /// use bookpress_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }
}

/// Install a `tracing` subscriber that writes to the test harness output.
///
/// Safe to call from several tests; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .try_init();
}

// Re-export commonly used items
pub use event_bus::InMemoryEventBus;
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn fixed_clock_is_stable() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_clock_is_new_year_2025() {
        let now = test_clock().now();
        assert_eq!((now.year(), now.month(), now.day()), (2025, 1, 1));
        assert_eq!((now.hour(), now.minute(), now.second()), (0, 0, 0));
    }
}
