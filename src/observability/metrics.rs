//! Metrics collection.
//!
//! # Responsibilities
//! - Define getter metrics (builds, handouts, worker runs, races)
//! - Keep metric names and labels in one place
//!
//! # Metrics
//! - `provider_builds_total` (counter): builds by outcome
//! - `provider_handouts_total` (counter): descriptor/mapping handouts by policy
//! - `worker_runs_total` (counter): finished workers by outcome
//! - `shared_state_races_total` (counter): overlapping in-place mutations by target
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels are static strings only

use metrics::counter;

use crate::provider::SharePolicy;

pub fn record_build(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("provider_builds_total", "outcome" => outcome).increment(1);
}

pub fn record_handout(policy: SharePolicy) {
    counter!("provider_handouts_total", "policy" => policy.as_str()).increment(1);
}

pub fn record_worker(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("worker_runs_total", "outcome" => outcome).increment(1);
}

pub fn record_race(target: &'static str) {
    counter!("shared_state_races_total", "target" => target).increment(1);
}
