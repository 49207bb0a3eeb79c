//! Process CPU usage sampling for the `cpu-load` extra info.

use std::time::{Duration, Instant};

/// A wall-clock timestamp paired with the process's accumulated CPU time.
#[derive(Debug, Clone, Copy)]
pub struct UsageSample {
    pub wall: Instant,
    pub user: Duration,
    pub system: Duration,
}

/// Source of [`UsageSample`]s. Swappable so tests can fake the clock.
pub trait UsageSource: Send + Sync {
    fn sample(&self) -> UsageSample;
}

/// Samples the current process with `getrusage(RUSAGE_SELF)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessUsage;

impl UsageSource for ProcessUsage {
    fn sample(&self) -> UsageSample {
        let wall = Instant::now();
        let (user, system) = rusage_self();
        UsageSample { wall, user, system }
    }
}

#[cfg(unix)]
fn rusage_self() -> (Duration, Duration) {
    fn to_duration(tv: libc::timeval) -> Duration {
        Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
    }

    // SAFETY: `getrusage` only writes into the zeroed struct we pass it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        tracing::debug!(error = %std::io::Error::last_os_error(), "getrusage failed");
        return (Duration::ZERO, Duration::ZERO);
    }
    (to_duration(usage.ru_utime), to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
fn rusage_self() -> (Duration, Duration) {
    (Duration::ZERO, Duration::ZERO)
}

/// `100 * (Δuser + Δsystem) / Δwall`, clamped to `0..=100`.
///
/// Returns 0 when no wall time has elapsed.
pub fn cpu_load_percent(start: &UsageSample, end: &UsageSample) -> i32 {
    let wall = end.wall.saturating_duration_since(start.wall).as_secs_f64();
    if wall <= 0.0 {
        return 0;
    }
    let cpu = end.user.saturating_sub(start.user) + end.system.saturating_sub(start.system);
    let load = 100.0 * cpu.as_secs_f64() / wall;
    load.clamp(0.0, 100.0).round() as i32
}
