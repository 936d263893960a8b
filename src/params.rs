//! Launch parameters and lenient integer parsing

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use url::Url;

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("valid integer regex"));

/// Values supplied when the timer is launched
///
/// These play the role of a page's URL query: both are optional and both
/// take precedence over persisted state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LaunchParams {
    /// Requested duration in minutes, unparsed
    pub minutes: Option<String>,
    /// Requested task label
    pub task: Option<String>,
}

impl LaunchParams {
    /// Read `minutes` and `task` from a URL or a bare query string
    ///
    /// Accepts `https://example.com/?minutes=10&task=Write%20docs`,
    /// `?minutes=10` or `minutes=10`. Empty values count as absent.
    pub fn from_url(s: &str) -> Result<Self> {
        let url = match Url::parse(s) {
            Ok(url) => url,
            Err(_) => {
                let query = s.trim_start_matches('?');
                Url::parse(&format!("countdown:///?{}", query))
                    .with_context(|| format!("Unable to parse query string {}", s))?
            }
        };

        let mut params = Self::default();

        for (name, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }

            match name.as_ref() {
                "minutes" if params.minutes.is_none() => params.minutes = Some(value.into_owned()),
                "task" if params.task.is_none() => params.task = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(params)
    }

    /// Fill in values from `other` wherever this one has none
    pub fn or(self, other: Self) -> Self {
        Self {
            minutes: self.minutes.or(other.minutes),
            task: self.task.or(other.task),
        }
    }
}

/// Parse the leading integer of a string
///
/// Leading whitespace and a sign are allowed and trailing garbage is
/// ignored, so `" -5min"` parses as `-5`. Returns `None` if the string
/// does not start with a number or the number does not fit in an `i64`.
pub fn parse_int(s: &str) -> Option<i64> {
    LEADING_INT
        .captures(s)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a duration in minutes, ignoring its sign
///
/// Zero, malformed and out-of-range values yield `None`.
pub fn parse_minutes(s: &str) -> Option<u32> {
    parse_int(s)
        .map(i64::unsigned_abs)
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| *m > 0)
}

#[cfg(test)]
mod test {
    use super::{parse_int, parse_minutes, LaunchParams};

    #[test]
    fn parse_int_prefix() {
        assert_eq!(parse_int("10"), Some(10));
        assert_eq!(parse_int("  -5"), Some(-5));
        assert_eq!(parse_int("+7"), Some(7));
        assert_eq!(parse_int("10abc"), Some(10));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("99999999999999999999"), None);
    }

    #[test]
    fn parse_minutes_ignores_sign() {
        assert_eq!(parse_minutes("-5"), Some(5));
        assert_eq!(parse_minutes("25"), Some(25));
    }

    #[test]
    fn parse_minutes_rejects_zero_and_garbage() {
        assert_eq!(parse_minutes("0"), None);
        assert_eq!(parse_minutes("-0"), None);
        assert_eq!(parse_minutes("ten"), None);
        assert_eq!(parse_minutes("5000000000"), None);
    }

    #[test]
    fn params_from_full_url() {
        let params =
            LaunchParams::from_url("https://timer.example.com/?minutes=10&task=Write%20docs")
                .unwrap();

        assert_eq!(params.minutes.as_deref(), Some("10"));
        assert_eq!(params.task.as_deref(), Some("Write docs"));
    }

    #[test]
    fn params_from_bare_query() {
        let params = LaunchParams::from_url("?minutes=-5&task=Focus+time").unwrap();

        assert_eq!(params.minutes.as_deref(), Some("-5"));
        assert_eq!(params.task.as_deref(), Some("Focus time"));

        let params = LaunchParams::from_url("task=Read").unwrap();

        assert_eq!(params.minutes, None);
        assert_eq!(params.task.as_deref(), Some("Read"));
    }

    #[test]
    fn params_empty_values_are_absent() {
        let params = LaunchParams::from_url("?minutes=&task=").unwrap();

        assert_eq!(params, LaunchParams::default());
    }

    #[test]
    fn flags_take_precedence_over_url() {
        let flags = LaunchParams {
            minutes: Some("15".to_string()),
            task: None,
        };
        let url = LaunchParams::from_url("?minutes=10&task=Read").unwrap();

        let merged = flags.or(url);

        assert_eq!(merged.minutes.as_deref(), Some("15"));
        assert_eq!(merged.task.as_deref(), Some("Read"));
    }
}
