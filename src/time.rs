use chrono::TimeDelta;

/// Extensions to `TimeDelta`
pub trait TimeDeltaExt {
    /// Formats the TimeDelta in a humanized way, for example 22m30s.
    fn to_human(&self) -> String;
}

impl TimeDeltaExt for TimeDelta {
    fn to_human(&self) -> String {
        use std::fmt::Write;

        if self.num_seconds() <= 0 {
            return "0s".to_string();
        }

        let hours = self.num_hours();
        let minutes = self.num_minutes() - (hours * 60);
        let seconds = self.num_seconds() - (self.num_minutes() * 60);

        let mut acc = String::new();

        if hours > 0 {
            let _ = write!(acc, "{}h", hours);
        }

        if minutes > 0 {
            let _ = write!(acc, "{}m", minutes);
        }

        if seconds > 0 {
            let _ = write!(acc, "{}s", seconds);
        }

        acc
    }
}

/// Render a count of seconds as a kitchen-timer clock, e.g. mm:ss
///
/// Minutes are not wrapped into hours, so two and a half hours reads
/// `150:00`.
pub fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod test {
    use chrono::TimeDelta;

    use super::{clock, TimeDeltaExt};

    #[test]
    fn kitchen_test() {
        assert_eq!(clock(25 * 60), "25:00");
    }

    #[test]
    fn kitchen_seconds_test() {
        assert_eq!(clock(12), "00:12");
    }

    #[test]
    fn kitchen_does_not_roll_into_hours() {
        assert_eq!(clock(150 * 60), "150:00");
        assert_eq!(clock(99 * 60 + 59), "99:59");
    }

    #[test]
    fn kitchen_zero() {
        assert_eq!(clock(0), "00:00");
    }

    #[test]
    fn clock_is_stable_across_calls() {
        assert_eq!(clock(61), clock(61));
        assert_eq!(clock(61), "01:01");
    }

    #[test]
    fn human_test() {
        assert_eq!(TimeDelta::new(30 * 60, 0).unwrap().to_human(), "30m");
        assert_eq!(TimeDelta::new(3725, 0).unwrap().to_human(), "1h2m5s");
        assert_eq!(TimeDelta::zero().to_human(), "0s");
    }
}
