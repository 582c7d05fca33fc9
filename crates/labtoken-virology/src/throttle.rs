//! Minimum-elapsed-duration combinator.
//!
//! The CTA exchange path must not reveal through response latency whether a
//! submitted code was invalid, valid-but-pending, or ready. The combinator
//! here floors the observable duration of an operation: whichever branch the
//! operation takes, and whether it succeeds or fails, the caller does not
//! get the outcome back before the floor has elapsed.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Runs `operation` and returns its output no earlier than `floor` after
/// the call started.
///
/// Operations that already take longer than the floor are never shortened.
/// Only the task servicing the current request is blocked; other in-flight
/// requests are unaffected. Timing is observed through `tokio::time`, so
/// tests under a paused runtime clock are deterministic.
pub async fn run_with_minimum_duration<F>(floor: Duration, operation: F) -> F::Output
where
    F: Future,
{
    let started = Instant::now();
    let output = operation.await;
    let elapsed = started.elapsed();
    if elapsed < floor {
        tokio::time::sleep(floor - elapsed).await;
    }
    output
}
