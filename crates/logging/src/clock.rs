//! crates/logging/src/clock.rs
//! Monotonic timestamps and process/thread identity stamped into records.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Nanoseconds elapsed since the first timestamp taken in this process.
///
/// The value never decreases, which makes `exit - enter` a valid duration.
#[must_use]
pub fn monotonic_nanos() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Small, stable numeric id of the calling thread.
#[must_use]
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Calls `f` with the name of the calling thread, or `""` for unnamed threads.
pub fn with_current_thread_name<R>(f: impl FnOnce(&str) -> R) -> R {
    let thread = std::thread::current();
    f(thread.name().unwrap_or_default())
}

/// Operating-system id of this process.
#[must_use]
pub fn process_id() -> u32 {
    std::process::id()
}
