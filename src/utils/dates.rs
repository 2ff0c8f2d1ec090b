use chrono::{DateTime, Duration, Utc};

/// Whole calendar days until `purchased_at + duration_days`, clamped at zero.
///
/// Both timestamps are reduced to date-only first so hour-of-day and time-zone
/// skew cannot shift the comparison across a day boundary.
pub fn remaining_days(purchased_at: DateTime<Utc>, duration_days: i32, now: DateTime<Utc>) -> i64 {
    let expire_date = purchased_at.date_naive() + Duration::days(duration_days as i64);
    let remaining = (expire_date - now.date_naive()).num_days();
    remaining.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn counts_whole_days_to_expiry() {
        // purchased on the 1st with 30 days validity -> expires on the 31st
        assert_eq!(remaining_days(at(1, 9), 30, at(27, 9)), 4);
        assert_eq!(remaining_days(at(1, 9), 30, at(1, 9)), 30);
    }

    #[test]
    fn ignores_time_of_day() {
        assert_eq!(remaining_days(at(1, 23), 30, at(27, 0)), 4);
        assert_eq!(remaining_days(at(1, 0), 30, at(27, 23)), 4);
    }

    #[test]
    fn clamps_expired_plans_to_zero() {
        assert_eq!(remaining_days(at(1, 9), 30, at(31, 9)), 0);
        assert_eq!(remaining_days(at(1, 9), 10, at(30, 9)), 0);
    }
}
