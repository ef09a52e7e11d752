use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// How many months (counting the current one) the schedule listing covers.
/// Edits may reach one month further.
pub const MAX_MONTHS_AHEAD: u32 = 6;

pub const EARLIEST_EDITABLE_HOUR: u32 = 12;
pub const MINUTE_STEP: u32 = 15;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Time of day the user is expected home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawArrival", into = "RawArrival")]
pub struct ArrivalTime(NaiveTime);

#[derive(Serialize, Deserialize)]
struct RawArrival {
    hour: u32,
    minute: u32,
}

impl ArrivalTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or(ScheduleError::InvalidTime { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ArrivalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<RawArrival> for ArrivalTime {
    type Error = ScheduleError;

    fn try_from(raw: RawArrival) -> Result<Self, Self::Error> {
        Self::new(raw.hour, raw.minute)
    }
}

impl From<ArrivalTime> for RawArrival {
    fn from(arrival: ArrivalTime) -> Self {
        Self {
            hour: arrival.hour(),
            minute: arrival.minute(),
        }
    }
}

/// Per-day schedule record as stored by the editing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(rename = "arrivedHome")]
    pub arrival: ArrivalTime,
    #[serde(rename = "isDisabled", default)]
    pub disabled: bool,
}

impl ScheduleConfig {
    /// The schedule used for days with no stored record.
    pub fn enabled_at(arrival: ArrivalTime) -> Self {
        Self {
            arrival,
            disabled: false,
        }
    }
}

/// One day of the schedule listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub schedule: ScheduleConfig,
    pub is_default: bool,
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

fn end_of_month(date: NaiveDate, months_ahead: u32) -> NaiveDate {
    let first = date - Days::new(u64::from(date.day0()));
    first + Months::new(months_ahead + 1) - Days::new(1)
}

/// Days shown by the schedule listing: today through the end of the last
/// listed month.
pub fn listing_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, end_of_month(today, MAX_MONTHS_AHEAD - 1))
}

/// Days that may be edited or reset.
pub fn editable_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, end_of_month(today, MAX_MONTHS_AHEAD))
}

/// Rules enforced when a user edits a day. The decision engine itself accepts
/// any valid time of day.
pub fn validate_edit(
    today: NaiveDate,
    date: NaiveDate,
    schedule: &ScheduleConfig,
) -> Result<(), ScheduleError> {
    let (first, last) = editable_window(today);
    if date < first || date > last {
        return Err(ScheduleError::DateOutOfWindow { date, first, last });
    }
    if schedule.arrival.hour() < EARLIEST_EDITABLE_HOUR {
        return Err(ScheduleError::HourOutOfRange(schedule.arrival.hour()));
    }
    if schedule.arrival.minute() % MINUTE_STEP != 0 {
        return Err(ScheduleError::MinuteNotQuarter(schedule.arrival.minute()));
    }
    Ok(())
}

/// Expand stored records into one entry per day of `[start, end]`, filling
/// gaps with the default schedule.
pub fn fill_with_default(
    start: NaiveDate,
    end: NaiveDate,
    stored: &BTreeMap<NaiveDate, ScheduleConfig>,
    default_arrival: ArrivalTime,
) -> Vec<ScheduleEntry> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .map(|date| match stored.get(&date) {
            Some(schedule) => ScheduleEntry {
                date,
                schedule: *schedule,
                is_default: false,
            },
            None => ScheduleEntry {
                date,
                schedule: ScheduleConfig::enabled_at(default_arrival),
                is_default: true,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(hour: u32, minute: u32) -> ScheduleConfig {
        ScheduleConfig::enabled_at(ArrivalTime::new(hour, minute).unwrap())
    }

    #[test]
    fn arrival_rejects_invalid_time_of_day() {
        assert_eq!(
            ArrivalTime::new(24, 0),
            Err(ScheduleError::InvalidTime { hour: 24, minute: 0 })
        );
        assert!(ArrivalTime::new(23, 60).is_err());
        assert_eq!(ArrivalTime::new(0, 0).unwrap().to_string(), "00:00");
    }

    #[test]
    fn stored_json_shape() {
        let schedule: ScheduleConfig =
            serde_json::from_str(r#"{"arrivedHome":{"hour":18,"minute":30},"isDisabled":true}"#)
                .unwrap();
        assert_eq!(schedule.arrival.hour(), 18);
        assert_eq!(schedule.arrival.minute(), 30);
        assert!(schedule.disabled);

        let json = serde_json::to_value(at(20, 0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"arrivedHome": {"hour": 20, "minute": 0}, "isDisabled": false})
        );
    }

    #[test]
    fn out_of_range_stored_time_fails_to_parse() {
        let parsed =
            serde_json::from_str::<ScheduleConfig>(r#"{"arrivedHome":{"hour":25,"minute":0},"isDisabled":false}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn date_keys() {
        assert_eq!(date_key(date(2024, 1, 5)), "2024-01-05");
        assert_eq!(parse_date_key("2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date_key("2024/1/5"), None);
    }

    #[test]
    fn windows_end_on_month_boundaries() {
        assert_eq!(listing_window(date(2024, 1, 15)), (date(2024, 1, 15), date(2024, 6, 30)));
        assert_eq!(editable_window(date(2024, 1, 15)), (date(2024, 1, 15), date(2024, 7, 31)));
        assert_eq!(editable_window(date(2024, 8, 31)).1, date(2025, 2, 28));
    }

    #[test]
    fn edit_rules() {
        let today = date(2024, 1, 15);
        assert_eq!(validate_edit(today, today, &at(20, 45)), Ok(()));
        assert_eq!(validate_edit(today, today, &at(11, 0)), Err(ScheduleError::HourOutOfRange(11)));
        assert_eq!(validate_edit(today, today, &at(18, 10)), Err(ScheduleError::MinuteNotQuarter(10)));
        assert!(matches!(
            validate_edit(today, date(2024, 1, 14), &at(18, 0)),
            Err(ScheduleError::DateOutOfWindow { .. })
        ));
        assert!(validate_edit(today, date(2024, 7, 31), &at(18, 0)).is_ok());
        assert!(validate_edit(today, date(2024, 8, 1), &at(18, 0)).is_err());
    }

    #[test]
    fn fill_marks_defaults() {
        let default = ArrivalTime::new(20, 0).unwrap();
        let mut stored = BTreeMap::new();
        stored.insert(date(2024, 1, 2), ScheduleConfig { arrival: ArrivalTime::new(18, 0).unwrap(), disabled: true });

        let entries = fill_with_default(date(2024, 1, 1), date(2024, 1, 3), &stored, default);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_default);
        assert!(!entries[1].is_default);
        assert!(entries[1].schedule.disabled);
        assert_eq!(entries[2].schedule, ScheduleConfig::enabled_at(default));

        let json = serde_json::to_value(&entries[1]).unwrap();
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["isDefault"], false);
        assert_eq!(json["arrivedHome"]["hour"], 18);
    }
}
