//! Bounded temporal comparisons with a configured clock-skew tolerance.

use chrono::{DateTime, Utc};

/// `maxAgeSeconds <= 0` disables the window entirely (always valid).
pub fn is_within(instant: DateTime<Utc>, now: DateTime<Utc>, max_age_seconds: i64) -> bool {
    if max_age_seconds <= 0 {
        return true;
    }
    let age = (now - instant).num_seconds();
    age >= -max_age_seconds && age <= max_age_seconds
}

/// `notBefore` is valid when `t - skew <= now`.
pub fn not_before_ok(t: DateTime<Utc>, now: DateTime<Utc>, skew_seconds: i64) -> bool {
    t - chrono::Duration::seconds(skew_seconds) <= now
}

/// `notOnOrAfter` is valid when `t + skew > now` (strict inequality: equality is expired).
pub fn not_on_or_after_ok(t: DateTime<Utc>, now: DateTime<Utc>, skew_seconds: i64) -> bool {
    t + chrono::Duration::seconds(skew_seconds) > now
}

/// `sessionNotOnOrAfter` carries no skew allowance.
pub fn in_the_future(t: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    t > now
}
