//! Drift compensation
//!
//! Compares the target's authoritative elapsed time with the elapsed time
//! measured on the active playback handle. Elapsed counters restart at item
//! boundaries, so when the two sides refer to different items the gap
//! between the items' start times is added.

use crate::types::{Item, ShowInfo, TargetShowInfo};

/// Delay of local playback behind the target, in seconds (never negative)
///
/// Returns `None` unless both `observed` and `target` are playing.
pub fn compute_delay(observed: &ShowInfo, target: &TargetShowInfo, local_elapsed: f64) -> Option<f64> {
    let ShowInfo::Playing {
        current_set: observed_set,
        ..
    } = observed
    else {
        return None;
    };
    let TargetShowInfo::Playing {
        current_set: target_set,
        current_time,
        ..
    } = target
    else {
        return None;
    };

    Some(delay_between(
        observed_set.as_ref(),
        target_set.as_ref(),
        *current_time,
        local_elapsed,
    ))
}

/// Core delay computation
///
/// Without both items known, no cross-item adjustment is possible and the
/// plain time difference is used.
pub fn delay_between(
    observed_set: Option<&Item>,
    target_set: Option<&Item>,
    target_time: f64,
    local_elapsed: f64,
) -> f64 {
    let mut delay = target_time - local_elapsed;

    if let (Some(target_item), Some(observed_item)) = (target_set, observed_set) {
        if target_item.id != observed_item.id {
            delay += target_item.start_offset_from(observed_item);
        }
    }

    // Local playback ahead or on time
    if delay.is_finite() && delay > 0.0 {
        delay
    } else {
        0.0
    }
}
