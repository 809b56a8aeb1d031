//! Working and stopped clocks.
//!
//! Production code uses the [`Working`] clock, which reads the system time.
//! Tests use the [`Stopped`] clock, which only moves when told to, so that
//! time-dependent behavior (like peer expiry) is deterministic.
use std::time::Duration;

use chihaya_primitives::DurationSinceUnixEpoch;

/// A clock that gives the current timestamp. Callable without an instance,
/// the way the per-crate `CurrentClock` alias is used.
pub trait StaticTime {
    fn now() -> DurationSinceUnixEpoch;

    #[must_use]
    fn now_add(add: &Duration) -> DurationSinceUnixEpoch {
        Self::now().saturating_add(*add)
    }

    #[must_use]
    fn now_sub(sub: &Duration) -> DurationSinceUnixEpoch {
        Self::now().saturating_sub(*sub)
    }
}

/// The production clock. Reads the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Working;

impl StaticTime for Working {
    /// # Panics
    ///
    /// Will panic if the system time is before the Unix Epoch.
    fn now() -> DurationSinceUnixEpoch {
        std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .expect("the system time should be after the Unix Epoch")
    }
}

/// The test clock. It stays at the Unix Epoch until moved explicitly.
///
/// The stopped time is process-global: tests that manipulate it observe each
/// other. Tests relying on it should set an absolute time first.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopped;

impl StaticTime for Stopped {
    fn now() -> DurationSinceUnixEpoch {
        *stopped::fixed_time().read().expect("the stopped clock lock should not be poisoned")
    }
}

/// Operations only available on the [`Stopped`] clock.
pub trait StoppedTime {
    /// Sets the stopped clock to an absolute timestamp.
    fn local_set(unix_time: &DurationSinceUnixEpoch);

    /// Resets the stopped clock to the Unix Epoch.
    fn local_set_to_unix_epoch() {
        Self::local_set(&Duration::ZERO);
    }

    /// Sets the stopped clock to the current system time.
    fn local_set_to_system_time_now();

    /// Moves the stopped clock forward.
    fn local_add(period: &Duration);
}

impl StoppedTime for Stopped {
    fn local_set(unix_time: &DurationSinceUnixEpoch) {
        *stopped::fixed_time().write().expect("the stopped clock lock should not be poisoned") = *unix_time;
    }

    fn local_set_to_system_time_now() {
        Self::local_set(&Working::now());
    }

    fn local_add(period: &Duration) {
        let mut fixed = stopped::fixed_time().write().expect("the stopped clock lock should not be poisoned");
        *fixed = fixed.saturating_add(*period);
    }
}

mod stopped {
    use std::sync::{OnceLock, RwLock};
    use std::time::Duration;

    pub(super) fn fixed_time() -> &'static RwLock<Duration> {
        static FIXED_TIME: OnceLock<RwLock<Duration>> = OnceLock::new();
        FIXED_TIME.get_or_init(|| RwLock::new(Duration::ZERO))
    }
}

#[cfg(test)]
mod tests {
    use std::any::{Any, TypeId};

    use crate::clock::{Stopped, Working};
    use crate::CurrentClock;

    #[test]
    fn it_should_be_the_stopped_clock_as_default_when_testing() {
        assert_eq!(TypeId::of::<Stopped>(), CurrentClock::default().type_id());
        assert_ne!(TypeId::of::<Working>(), CurrentClock::default().type_id());
    }

    mod stopped_clock {
        use std::time::Duration;

        use crate::clock::{StaticTime, Stopped, StoppedTime};

        // The stopped time is process-global, so this is a single sequential
        // test instead of one test per assertion.
        #[test]
        fn it_should_only_move_when_told_to() {
            let fixed = Duration::from_secs(1_669_397_478);

            Stopped::local_set(&fixed);
            assert_eq!(Stopped::now(), fixed);

            Stopped::local_add(&Duration::from_secs(10));
            assert_eq!(Stopped::now(), fixed + Duration::from_secs(10));

            Stopped::local_set(&Duration::from_secs(5));
            assert_eq!(Stopped::now_sub(&Duration::from_secs(100)), Duration::ZERO);
        }
    }
}
