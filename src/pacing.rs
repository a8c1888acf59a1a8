// src/pacing.rs
//! Response-time floor for requests that read a live timeline.
//!
//! Pads the total latency of such a request to one second, so timing does not
//! reveal how the request went and timeline reads stay near one per second.

use std::time::{Duration, Instant};

/// Minimum total latency of a timeline-sourced request, including a 1 ms pad.
pub const RESPONSE_FLOOR: Duration = Duration::from_millis(1_001);

/// Delay still needed to reach the floor after `elapsed`; never negative.
pub fn remaining_delay(elapsed: Duration) -> Duration {
    RESPONSE_FLOOR.saturating_sub(elapsed)
}

/// Sleep until `start + RESPONSE_FLOOR` when the request was timeline-sourced.
pub async fn pad_response_time(start: Instant, sourced_from_timeline: bool) {
    if !sourced_from_timeline {
        return;
    }
    let wait = remaining_delay(start.elapsed());
    if !wait.is_zero() {
        tracing::debug!(target: "pipeline", wait_ms = wait.as_millis() as u64, "padding response time");
        tokio::time::sleep(wait).await;
    }
}
