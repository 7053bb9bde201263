//! Monotonic microsecond clock anchored at the first call after process
//! start. All record timestamps and task timing use this clock; wall-clock
//! time appears only in telemetry packets.

use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// Microseconds since process start. Monotonic, never goes backwards.
pub fn now_us() -> u64 {
    START.get_or_init(Instant::now).elapsed().as_micros() as u64
}

/// Wall-clock microseconds since the Unix epoch, for telemetry only.
pub fn wall_clock_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
