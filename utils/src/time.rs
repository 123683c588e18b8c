//! Elapsed-time rendering for progress output.

use std::time::Duration;

/// Render how long an operation took.
///
/// Registrations usually finish within a block or two, so short waits keep
/// sub-second precision and longer ones show the two leading units, with
/// the smaller one zero-padded.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    if millis < 60_000 {
        return format!("{}.{}s", millis / 1_000, (millis % 1_000) / 100);
    }
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if hours == 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{hours}h {minutes:02}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_waits_keep_fractions() {
        assert_eq!(format_elapsed(Duration::from_millis(850)), "850ms");
        assert_eq!(format_elapsed(Duration::from_millis(12_480)), "12.4s");
    }

    #[test]
    fn long_waits_show_two_units() {
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_elapsed(Duration::from_secs(3_720)), "1h 02m");
        assert_eq!(format_elapsed(Duration::from_secs(90_000)), "25h 00m");
    }
}
