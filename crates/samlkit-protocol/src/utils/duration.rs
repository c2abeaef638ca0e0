//! ISO 8601 durations, as found in metadata `cacheDuration` attributes.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;

use crate::error::{SamlError, SamlResult};

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-?)P(?:(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:[.,]\d+)?)S)?)?|(\d+)W)$",
    )
    .expect("duration pattern is valid")
});

/// Adds an ISO 8601 duration to a timestamp.
///
/// Supports `PnYnMnDTnHnMnS` (seconds may carry a fraction written with
/// `.` or `,`) and `PnW`. A leading `-` negates every component. Calendar
/// parts are applied first: years and months move the date and clamp the
/// day to the end of the target month, so `P1M` from January 31st lands on
/// the last day of February.
///
/// # Errors
///
/// Returns [`SamlError::InvalidDuration`] if the string is not a duration
/// or the result is out of range.
pub fn parse_duration(duration: &str, timestamp: DateTime<Utc>) -> SamlResult<DateTime<Utc>> {
    let invalid = || SamlError::InvalidDuration(duration.to_string());
    let caps = DURATION.captures(duration).ok_or_else(invalid)?;

    let number = |index: usize| -> SamlResult<i64> {
        caps.get(index)
            .map_or(Ok(0), |m| m.as_str().parse::<i64>().map_err(|_| invalid()))
    };
    let negative = !caps[1].is_empty();
    let years = number(2)?;
    let months = number(3)?;
    let days = number(4)?;
    let hours = number(5)?;
    let minutes = number(6)?;
    let weeks = number(8)?;
    let seconds: f64 = caps
        .get(7)
        .map_or(Ok(0.0), |m| m.as_str().replace(',', ".").parse())
        .map_err(|_| invalid())?;

    let total_months = years
        .checked_mul(12)
        .and_then(|m| m.checked_add(months))
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(invalid)?;
    let shifted = if negative {
        timestamp.checked_sub_months(Months::new(total_months))
    } else {
        timestamp.checked_add_months(Months::new(total_months))
    }
    .ok_or_else(invalid)?;

    let days = weeks
        .checked_mul(7)
        .and_then(|w| w.checked_add(days))
        .ok_or_else(invalid)?;
    let whole_seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes.checked_mul(60)?))
        .ok_or_else(invalid)?;
    let nanos = (seconds.fract() * 1e9).round() as i64;
    let span = Duration::try_days(days)
        .and_then(|d| d.checked_add(&Duration::try_seconds(whole_seconds)?))
        .and_then(|d| d.checked_add(&Duration::try_seconds(seconds.trunc() as i64)?))
        .and_then(|d| d.checked_add(&Duration::nanoseconds(nanos)))
        .ok_or_else(invalid)?;
    let span = if negative { -span } else { span };

    shifted.checked_add_signed(span).ok_or_else(invalid)
}
