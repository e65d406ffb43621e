//! Formatting helpers for human-readable sizes, rates and durations.

/// Bytes per mebibyte.
pub const MIB: f64 = 1024.0 * 1024.0;

/// Converts a byte count to mebibytes.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

/// Formats an optional byte count as `"12.34 MiB"`, or `"Unknown"` when the
/// size is absent or zero.
#[must_use]
pub fn format_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b > 0 => format!("{:.2} MiB", to_mib(b)),
        _ => "Unknown".to_string(),
    }
}

/// Formats a transfer rate in bytes per second as `"1.50MiB/s"`.
#[must_use]
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{:.2}MiB/s", bytes_per_sec / MIB)
}

/// Formats a seconds-remaining estimate as `"ETA MM:SS"`.
///
/// Minutes are not wrapped into hours.
#[must_use]
pub fn format_eta(seconds: Option<u64>) -> String {
    seconds.map_or_else(
        || "ETA Unknown".to_string(),
        |s| format!("ETA {:02}:{:02}", s / 60, s % 60),
    )
}

/// Formats a media duration in seconds (e.g. "4:05", "1:01:05").
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let secs = seconds.max(0.0).round() as u64;
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(Some(1_048_576)), "1.00 MiB");
        assert_eq!(format_size(Some(1_572_864)), "1.50 MiB");
        assert_eq!(format_size(Some(524_288)), "0.50 MiB");
    }

    #[test]
    fn format_size_unknown() {
        assert_eq!(format_size(None), "Unknown");
        assert_eq!(format_size(Some(0)), "Unknown");
    }

    #[test]
    fn format_rate_mib() {
        assert_eq!(format_rate(2.0 * MIB), "2.00MiB/s");
        assert_eq!(format_rate(0.0), "0.00MiB/s");
    }

    #[test]
    fn format_eta_minutes_seconds() {
        assert_eq!(format_eta(Some(83)), "ETA 01:23");
        assert_eq!(format_eta(Some(0)), "ETA 00:00");
        assert_eq!(format_eta(None), "ETA Unknown");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(5.0), "0:05");
        assert_eq!(format_duration(245.0), "4:05");
        assert_eq!(format_duration(3665.0), "1:01:05");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn format_size_never_panics(bytes in 0u64..u64::MAX) {
                let _ = format_size(Some(bytes));
            }

            #[test]
            fn format_eta_seconds_field_is_two_digits(secs in 0u64..1_000_000) {
                let eta = format_eta(Some(secs));
                let (_, ss) = eta.rsplit_once(':').unwrap();
                prop_assert_eq!(ss.len(), 2);
            }
        }
    }
}
