//! ETA calculator.
//!
//! Workers cannot be told "finish at T". They accept an extra start delay
//! on top of their natural duration, so a wave's absolute target is turned
//! into a per-process delay at the moment each process is launched.

use hgw_core::ScriptKind;
use hgw_core::config::TimingConfig;

/// Round `ms` up to the next multiple of `step`. Aligned values are
/// unchanged; results past `u64::MAX` saturate.
pub fn round_up(ms: u64, step: u64) -> u64 {
    if step == 0 {
        return ms;
    }
    ms.div_ceil(step).saturating_mul(step)
}

/// Absolute completion time for a new wave of `kind`.
///
/// `hack_time_ms` is the target's current hack duration; the wave's own
/// duration is derived from it through the kind's multiplier. A non-finite
/// hack time contributes no span.
pub fn wave_eta(now_ms: u64, hack_time_ms: f64, kind: ScriptKind, timing: &TimingConfig) -> u64 {
    let span = if hack_time_ms.is_finite() {
        // Float to int casts saturate.
        (hack_time_ms.max(0.0) * kind.duration_multiplier()).ceil() as u64
    } else {
        0
    };
    let raw = now_ms
        .saturating_add(span)
        .saturating_add(timing.margin_for(kind));
    round_up(raw, timing.rounding_ms)
}

/// Start delay that makes a process launched at `now_ms` finish at `eta_ms`.
///
/// Never negative: a process that cannot make the target starts at once
/// and lands late.
pub fn dispatch_delay(eta_ms: u64, now_ms: u64, natural_duration_ms: f64) -> u64 {
    let slack = eta_ms as f64 - now_ms as f64 - natural_duration_ms.max(0.0);
    if slack <= 0.0 { 0 } else { slack.floor() as u64 }
}
