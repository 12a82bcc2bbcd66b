//! Wall-clock cadence for loop mode.
//!
//! Cycles start five seconds past each half hour. The next run is always the
//! half-hour slot after the one `now` falls in, so a cycle that finishes at
//! 10:30:02 waits for 11:00:05 rather than firing again at 10:30:05.
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Timelike};

/// Minutes between cycle starts.
pub const SLOT_MINUTES: u32 = 30;
/// Offset into each slot at which a cycle starts.
pub const SLOT_OFFSET_SECS: u32 = 5;

/// Granularity of interruptible sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(500);

/// Start of the half-hour slot following the one containing `now`, plus the offset.
pub fn next_run_after(now: NaiveDateTime) -> NaiveDateTime {
    let slot_start = now
        .with_minute((now.minute() / SLOT_MINUTES) * SLOT_MINUTES)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    slot_start
        + TimeDelta::minutes(i64::from(SLOT_MINUTES))
        + TimeDelta::seconds(i64::from(SLOT_OFFSET_SECS))
}

/// How long to wait from `now` until `next`, never less than `floor`.
pub fn sleep_until(now: NaiveDateTime, next: NaiveDateTime, floor: Duration) -> Duration {
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    wait.max(floor)
}

/// Sleep for `total`, waking early once `shutdown` is set.
/// Returns `false` when interrupted.
pub fn sleep_interruptible(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(SLEEP_SLICE);
        thread::sleep(step);
        remaining -= step;
    }
    !shutdown.load(Ordering::SeqCst)
}
