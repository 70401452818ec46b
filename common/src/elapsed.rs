use std::time::Duration;
use std::time::Instant;

/// Returns a string representing the elapsed time since `start` like
/// " in 1m15s" or " in 1.50s".
pub fn format_elapsed(start: Instant) -> String {
    format_duration(start.elapsed())
}

fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!(" in {millis}ms")
    } else if millis < 60_000 {
        format!(" in {:.2}s", millis as f64 / 1000.0)
    } else {
        let minutes = millis / 60_000;
        let seconds = (millis % 60_000) / 1000;
        format!(" in {minutes}m{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsecond_durations_use_milliseconds() {
        assert_eq!(format_duration(Duration::from_millis(250)), " in 250ms");
        assert_eq!(format_duration(Duration::from_millis(0)), " in 0ms");
    }

    #[test]
    fn durations_under_a_minute_use_fractional_seconds() {
        assert_eq!(format_duration(Duration::from_millis(1_500)), " in 1.50s");
        assert_eq!(format_duration(Duration::from_millis(59_999)), " in 60.00s");
    }

    #[test]
    fn longer_durations_use_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_millis(75_000)), " in 1m15s");
        assert_eq!(format_duration(Duration::from_millis(60_000)), " in 1m0s");
        assert_eq!(format_duration(Duration::from_millis(3_601_000)), " in 60m1s");
    }
}
