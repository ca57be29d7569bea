//! Bitrate estimation for display
//!
//! Raw estimates come from file size over duration. Lossy files land near a
//! standard encoder setting, so the estimate is snapped to the closest rung of
//! the ladder; anything at or above the lossless threshold is reported as-is.

/// Standard lossy encoder bitrates (kbps)
pub const LOSSY_BITRATE_LADDER: [u32; 14] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Raw bitrates at or above this value are treated as lossless (kbps)
pub const LOSSLESS_THRESHOLD_KBPS: f64 = 500.0;

/// Raw bitrate in kbps from file size and duration
///
/// Returns 0.0 when the duration is not positive.
pub fn raw_bitrate_kbps(file_size_bytes: u64, duration_seconds: f64) -> f64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return 0.0;
    }
    (file_size_bytes as f64 * 8.0) / duration_seconds / 1000.0
}

/// Snap a raw bitrate to the nearest ladder value
///
/// A candidate only replaces the current best when strictly closer, so on an
/// exact tie the lower (first seen) rung wins.
pub fn snap_to_ladder(raw_kbps: f64, ladder: &[u32], lossless_threshold_kbps: f64) -> u32 {
    if raw_kbps <= 0.0 || !raw_kbps.is_finite() {
        return 0;
    }

    let Some((&first, rest)) = ladder.split_first() else {
        return raw_kbps as u32;
    };

    if raw_kbps >= lossless_threshold_kbps {
        return raw_kbps as u32;
    }

    let mut best = first;
    let mut best_diff = (raw_kbps - f64::from(first)).abs();
    for &candidate in rest {
        let diff = (raw_kbps - f64::from(candidate)).abs();
        if diff < best_diff {
            best = candidate;
            best_diff = diff;
        }
    }
    best
}

/// Estimate the display bitrate of a source
pub fn estimate_bitrate_kbps(
    file_size_bytes: u64,
    duration_seconds: f64,
    ladder: &[u32],
    lossless_threshold_kbps: f64,
) -> u32 {
    let raw = raw_bitrate_kbps(file_size_bytes, duration_seconds);
    snap_to_ladder(raw, ladder, lossless_threshold_kbps)
}
