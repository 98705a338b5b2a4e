//! Display formatting helpers for rates and durations

use std::time::Duration;

/// Format a bitrate as a human-readable string
///
/// Bitrates use decimal prefixes, so 1 Kb/s is 1000 b/s.
pub fn format_bits_per_second(bps: f64) -> String {
    const K: f64 = 1000.0;
    const M: f64 = K * 1000.0;
    const G: f64 = M * 1000.0;

    if bps >= G {
        format!("{:.2} Gb/s", bps / G)
    } else if bps >= M {
        format!("{:.2} Mb/s", bps / M)
    } else if bps >= K {
        format!("{:.2} Kb/s", bps / K)
    } else {
        format!("{:.0} b/s", bps)
    }
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bits_per_second() {
        assert_eq!(format_bits_per_second(0.0), "0 b/s");
        assert_eq!(format_bits_per_second(999.0), "999 b/s");
        assert_eq!(format_bits_per_second(1000.0), "1.00 Kb/s");
        assert_eq!(format_bits_per_second(2_400.0), "2.40 Kb/s");
        assert_eq!(format_bits_per_second(1_000_000.0), "1.00 Mb/s");
        assert_eq!(format_bits_per_second(2_500_000_000.0), "2.50 Gb/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
    }
}
