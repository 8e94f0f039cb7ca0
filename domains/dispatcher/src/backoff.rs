//! Exponential backoff for jobs the dispatcher could not advance
//! (no eligible account, or the queue lease lost a race).

use chrono::Duration as ChronoDuration;
use rand::Rng;
use std::time::Duration;

const BASE_SECS: u64 = 2;
const CAP_SECS: u64 = 60;

/// `base * 2^attempt`, capped, with +/-20% jitter so a fleet of stalled
/// jobs doesn't all retry in lockstep.
pub fn backoff_delay(attempt: u32) -> ChronoDuration {
    let exp = BASE_SECS.saturating_mul(1u64 << attempt.min(10));
    let capped = exp.min(CAP_SECS);
    let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
    let jittered = (capped as f64) * (1.0 + jitter_frac);
    ChronoDuration::milliseconds((jittered.max(0.1) * 1000.0) as i64)
}

pub fn backoff_delay_std(attempt: u32) -> Duration {
    backoff_delay(attempt)
        .to_std()
        .unwrap_or(Duration::from_secs(BASE_SECS))
}
