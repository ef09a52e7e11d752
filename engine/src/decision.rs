//! Pure decision logic: whether the room is out of range, how early the unit
//! has to start to reach the nearer bound by arrival, and whether that moment
//! has come.
//!
//! The model is linear. With a rate of 3 °C/h, a room at 30 °C against a
//! 28 °C maximum needs `ceil(2 / 3) = 1` hour, so for a 20:00 arrival the
//! unit is due from 19:00.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use crate::schedule::ScheduleConfig;

/// Assumed temperature change per hour while the unit is running.
pub const DEFAULT_TEMP_CHANGE_PER_HOUR: f64 = 3.0;

/// Upper bound on the lead time. Arrival is always today, so any lead past a
/// day is already due and the cap never changes the decision.
pub const MAX_LEAD_HOURS: u32 = 24 * 7;

/// Acceptable room temperature bounds, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureRange {
    pub minimum: f64,
    pub maximum: f64,
}

impl TemperatureRange {
    pub fn contains(&self, temp: f64) -> bool {
        compute_threshold(temp, self).is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub threshold_temp: f64,
    pub required_lead_hours: u32,
    pub arrival_time: DateTime<FixedOffset>,
    pub optimal_start_time: DateTime<FixedOffset>,
    pub is_due: bool,
}

/// The bound the room has to reach: `minimum` when too cold, `maximum` when
/// too hot, `None` when within range. A reading equal to a bound is in range.
pub fn compute_threshold(actual_temp: f64, range: &TemperatureRange) -> Option<f64> {
    if actual_temp < range.minimum {
        Some(range.minimum)
    } else if actual_temp > range.maximum {
        Some(range.maximum)
    } else {
        None
    }
}

/// Arrival on `now`'s calendar date, in `now`'s offset. Never rolls over to
/// the next day, even when already past.
pub fn compute_arrival_time(
    now: DateTime<FixedOffset>,
    schedule: &ScheduleConfig,
) -> DateTime<FixedOffset> {
    let offset = *now.offset();
    let local = now
        .date_naive()
        .and_time(schedule.arrival.as_naive_time());
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// `ceil(|actual - threshold| / rate)`, rounding toward starting early and
/// capped at [`MAX_LEAD_HOURS`].
pub fn compute_lead_hours(actual_temp: f64, threshold_temp: f64, rate_per_hour: f64) -> u32 {
    let hours = ((actual_temp - threshold_temp).abs() / rate_per_hour).ceil();
    if hours > 0.0 {
        hours.min(f64::from(MAX_LEAD_HOURS)) as u32
    } else {
        // NaN lands here too.
        0
    }
}

pub fn compute_optimal_start(
    arrival_time: DateTime<FixedOffset>,
    lead_hours: u32,
) -> DateTime<FixedOffset> {
    arrival_time
        .checked_sub_signed(Duration::hours(i64::from(lead_hours)))
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.with_timezone(arrival_time.offset()))
}

/// Equality counts as due.
pub fn is_due(now: DateTime<FixedOffset>, optimal_start: DateTime<FixedOffset>) -> bool {
    now >= optimal_start
}

/// Run the whole chain. `None` means the temperature is in range and nothing
/// past the threshold check is computed.
pub fn decide(
    now: DateTime<FixedOffset>,
    actual_temp: f64,
    schedule: &ScheduleConfig,
    range: &TemperatureRange,
    rate_per_hour: f64,
) -> Option<Decision> {
    let threshold_temp = compute_threshold(actual_temp, range)?;
    let arrival_time = compute_arrival_time(now, schedule);
    let required_lead_hours = compute_lead_hours(actual_temp, threshold_temp, rate_per_hour);
    let optimal_start_time = compute_optimal_start(arrival_time, required_lead_hours);

    Some(Decision {
        threshold_temp,
        required_lead_hours,
        arrival_time,
        optimal_start_time,
        is_due: is_due(now, optimal_start_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ArrivalTime;
    use proptest::prelude::*;

    const RANGE: TemperatureRange = TemperatureRange {
        minimum: 20.0,
        maximum: 28.0,
    };

    fn jst(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn arriving(hour: u32, minute: u32) -> ScheduleConfig {
        ScheduleConfig::enabled_at(ArrivalTime::new(hour, minute).unwrap())
    }

    #[test]
    fn threshold_picks_nearer_bound() {
        assert_eq!(compute_threshold(15.0, &RANGE), Some(20.0));
        assert_eq!(compute_threshold(30.0, &RANGE), Some(28.0));
        assert_eq!(compute_threshold(24.0, &RANGE), None);
    }

    #[test]
    fn bounds_are_in_range() {
        assert_eq!(compute_threshold(20.0, &RANGE), None);
        assert_eq!(compute_threshold(28.0, &RANGE), None);
        assert_eq!(compute_threshold(19.99, &RANGE), Some(20.0));
        assert_eq!(compute_threshold(28.01, &RANGE), Some(28.0));
    }

    #[test]
    fn arrival_stays_on_same_date_and_offset() {
        let now = jst("2024-01-01T22:30:15+09:00");
        let arrival = compute_arrival_time(now, &arriving(20, 15));
        assert_eq!(arrival, jst("2024-01-01T20:15:00+09:00"));
        assert_eq!(arrival.offset(), now.offset());
    }

    #[test]
    fn arrival_uses_local_date_not_utc_date() {
        // 00:30 JST is still the previous day in UTC.
        let now = jst("2024-01-02T00:30:00+09:00");
        let arrival = compute_arrival_time(now, &arriving(20, 0));
        assert_eq!(arrival, jst("2024-01-02T20:00:00+09:00"));
    }

    #[test]
    fn lead_hours_round_up() {
        assert_eq!(compute_lead_hours(30.0, 28.0, 3.0), 1);
        assert_eq!(compute_lead_hours(31.0, 28.0, 3.0), 1);
        assert_eq!(compute_lead_hours(31.5, 28.0, 3.0), 2);
        assert_eq!(compute_lead_hours(10.0, 20.0, 3.0), 4);
        assert_eq!(compute_lead_hours(20.0, 20.0, 3.0), 0);
    }

    #[test]
    fn lead_hours_are_capped() {
        assert_eq!(compute_lead_hours(1.0e10, 28.0, 3.0), MAX_LEAD_HOURS);
        assert_eq!(compute_lead_hours(30.0, 28.0, 1.0e-9), MAX_LEAD_HOURS);
        assert_eq!(compute_lead_hours(30.0, 28.0, 1.0e-320), MAX_LEAD_HOURS);
        assert_eq!(compute_lead_hours(f64::NAN, 28.0, 3.0), 0);
    }

    #[test]
    fn optimal_start_saturates_at_earliest_instant() {
        let arrival = DateTime::<Utc>::MIN_UTC
            .with_timezone(&FixedOffset::east_opt(0).unwrap())
            + Duration::hours(1);
        assert_eq!(
            compute_optimal_start(arrival, 5),
            DateTime::<Utc>::MIN_UTC.with_timezone(arrival.offset())
        );
    }

    #[test]
    fn extreme_reading_is_due_immediately() {
        let now = jst("2024-01-01T00:00:30+09:00");
        let decision = decide(now, 1.0e10, &arriving(20, 0), &RANGE, 3.0).unwrap();
        assert_eq!(decision.threshold_temp, 28.0);
        assert_eq!(decision.required_lead_hours, MAX_LEAD_HOURS);
        assert_eq!(decision.optimal_start_time, jst("2023-12-25T20:00:00+09:00"));
        assert!(decision.is_due);
    }

    #[test]
    fn optimal_start_may_be_in_the_past() {
        let arrival = jst("2024-01-01T02:00:00+09:00");
        assert_eq!(
            compute_optimal_start(arrival, 4),
            jst("2023-12-31T22:00:00+09:00")
        );
    }

    #[test]
    fn due_includes_equality() {
        let start = jst("2024-01-01T19:00:00+09:00");
        assert!(is_due(start, start));
        assert!(is_due(jst("2024-01-01T19:00:01+09:00"), start));
        assert!(!is_due(jst("2024-01-01T18:59:59+09:00"), start));
    }

    #[test]
    fn in_range_short_circuits() {
        let now = jst("2024-01-01T15:00:00+09:00");
        assert_eq!(decide(now, 24.0, &arriving(20, 0), &RANGE, 3.0), None);
    }

    #[test]
    fn hot_afternoon_is_not_yet_due() {
        let now = jst("2024-01-01T15:00:00+09:00");
        let decision = decide(now, 30.0, &arriving(20, 0), &RANGE, 3.0).unwrap();
        assert_eq!(decision.threshold_temp, 28.0);
        assert_eq!(decision.required_lead_hours, 1);
        assert_eq!(decision.optimal_start_time, jst("2024-01-01T19:00:00+09:00"));
        assert!(!decision.is_due);
    }

    #[test]
    fn hot_evening_is_due() {
        let now = jst("2024-01-01T19:00:00+09:00");
        let decision = decide(now, 30.0, &arriving(20, 0), &RANGE, 3.0).unwrap();
        assert!(decision.is_due);
    }

    #[test]
    fn after_arrival_is_still_due() {
        let now = jst("2024-01-01T23:45:00+09:00");
        let decision = decide(now, 15.0, &arriving(20, 0), &RANGE, 3.0).unwrap();
        assert_eq!(decision.threshold_temp, 20.0);
        assert!(decision.is_due);
    }

    proptest! {
        #[test]
        fn inside_range_never_acts(temp in 20.0f64..=28.0) {
            prop_assert_eq!(compute_threshold(temp, &RANGE), None);
        }

        #[test]
        fn below_range_targets_minimum(temp in -40.0f64..19.999) {
            prop_assert_eq!(compute_threshold(temp, &RANGE), Some(20.0));
        }

        #[test]
        fn above_range_targets_maximum(temp in 28.001f64..60.0) {
            prop_assert_eq!(compute_threshold(temp, &RANGE), Some(28.0));
        }

        #[test]
        fn lead_hours_is_ceiling_of_diff(diff in 0.0f64..50.0, rate in 0.5f64..10.0) {
            let lead = compute_lead_hours(diff, 0.0, rate);
            prop_assert_eq!(f64::from(lead), (diff / rate).ceil());
        }

        #[test]
        fn lead_hours_monotonic(a in 0.0f64..50.0, b in 0.0f64..50.0) {
            let (near, far) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(compute_lead_hours(near, 0.0, 3.0) <= compute_lead_hours(far, 0.0, 3.0));
        }

        #[test]
        fn due_iff_not_before(offset_secs in -86_400i64..86_400) {
            let start = jst("2024-01-01T19:00:00+09:00");
            let now = start + Duration::seconds(offset_secs);
            prop_assert_eq!(is_due(now, start), offset_secs >= 0);
        }
    }
}
