//! Subtitle timecode formatting

/// Tolerance absorbed before truncating to centiseconds, so that values like
/// `0.29` (stored as `0.28999...`) keep their written digits
const CENTI_EPSILON: f64 = 1e-6;

/// Formats seconds as `H:MM:SS.ss`.
///
/// Hours are unbounded, minutes and seconds are zero-padded to two digits and
/// the fraction is truncated (not rounded) to centiseconds. Negative and
/// non-finite inputs format as zero.
pub fn seconds_to_timecode(seconds: f64) -> String {
    let centis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0 + CENTI_EPSILON).floor() as u64
    } else {
        0
    };

    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    let fraction = centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, fraction)
}
