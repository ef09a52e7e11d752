use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use crate::error::StoreError;
use crate::kv::KvStore;
use crate::ports::{IdempotencyStore, ScheduleStore};
use crate::schedule::{date_key, parse_date_key, ScheduleConfig};

const SCHEDULE_PREFIX: &str = "schedule:";
const HISTORY_PREFIX: &str = "history:";
const DONE_MARK: &str = "done";

/// Marks only need to outlive the day they guard.
pub const HISTORY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn schedule_key(date: NaiveDate) -> String {
    format!("{SCHEDULE_PREFIX}{}", date_key(date))
}

fn history_key(date: NaiveDate) -> String {
    format!("{HISTORY_PREFIX}{}", date_key(date))
}

fn decode(key: &str, value: &str) -> Result<ScheduleConfig, StoreError> {
    serde_json::from_str(value).map_err(|e| StoreError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Clone)]
pub struct ScheduleRepository {
    kv: Arc<dyn KvStore>,
}

impl ScheduleRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn get(&self, date: NaiveDate) -> Result<Option<ScheduleConfig>, StoreError> {
        let key = schedule_key(date);
        match self.kv.get(&key).await? {
            Some(value) => decode(&key, &value).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, date: NaiveDate, schedule: ScheduleConfig) -> Result<(), StoreError> {
        let value = serde_json::to_string(&schedule).map_err(StoreError::Corrupt)?;
        self.kv.put(&schedule_key(date), value, None).await
    }

    async fn reset(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.kv.delete(&schedule_key(date)).await
    }

    async fn list(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, ScheduleConfig)>, StoreError> {
        let mut found = Vec::new();
        for (key, value) in self.kv.list(SCHEDULE_PREFIX).await? {
            let Some(date) = parse_date_key(&key[SCHEDULE_PREFIX.len()..]) else {
                warn!(%key, "ignoring schedule entry with unparsable date");
                continue;
            };
            if date < start || date > end {
                continue;
            }
            match decode(&key, &value) {
                Ok(schedule) => found.push((date, schedule)),
                Err(e) => warn!(error = %e, "ignoring malformed schedule entry"),
            }
        }
        Ok(found)
    }
}

#[derive(Clone)]
pub struct HistoryRepository {
    kv: Arc<dyn KvStore>,
}

impl HistoryRepository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl IdempotencyStore for HistoryRepository {
    async fn exists(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(self
            .kv
            .get(&history_key(date))
            .await?
            .is_some_and(|value| !value.is_empty()))
    }

    async fn set(&self, date: NaiveDate) -> Result<(), StoreError> {
        self.kv
            .put(&history_key(date), DONE_MARK.to_string(), Some(HISTORY_TTL))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use crate::schedule::ArrivalTime;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn repos() -> (Arc<MemoryKv>, ScheduleRepository, HistoryRepository) {
        let kv = Arc::new(MemoryKv::new());
        (kv.clone(), ScheduleRepository::new(kv.clone()), HistoryRepository::new(kv))
    }

    #[tokio::test]
    async fn schedule_set_get_reset() {
        let (_, schedules, _) = repos();
        let day = date(2024, 1, 1);
        let schedule = ScheduleConfig {
            arrival: ArrivalTime::new(18, 30).unwrap(),
            disabled: true,
        };

        assert_eq!(schedules.get(day).await.unwrap(), None);
        schedules.set(day, schedule).await.unwrap();
        assert_eq!(schedules.get(day).await.unwrap(), Some(schedule));
        schedules.reset(day).await.unwrap();
        assert_eq!(schedules.get(day).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_schedule_is_reported_on_get_and_skipped_on_list() {
        let (kv, schedules, _) = repos();
        kv.put("schedule:2024-01-02", "{\"arrivedHome\":{\"hour\":99}}".into(), None)
            .await
            .unwrap();
        schedules
            .set(date(2024, 1, 3), ScheduleConfig::enabled_at(ArrivalTime::new(19, 0).unwrap()))
            .await
            .unwrap();

        assert!(matches!(
            schedules.get(date(2024, 1, 2)).await,
            Err(StoreError::Malformed { .. })
        ));
        let listed = schedules.list(date(2024, 1, 1), date(2024, 1, 31)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, date(2024, 1, 3));
    }

    #[tokio::test]
    async fn list_honours_bounds() {
        let (_, schedules, _) = repos();
        let schedule = ScheduleConfig::enabled_at(ArrivalTime::new(19, 0).unwrap());
        for day in [date(2023, 12, 31), date(2024, 1, 1), date(2024, 1, 31), date(2024, 2, 1)] {
            schedules.set(day, schedule).await.unwrap();
        }
        let days: Vec<_> = schedules
            .list(date(2024, 1, 1), date(2024, 1, 31))
            .await
            .unwrap()
            .into_iter()
            .map(|(day, _)| day)
            .collect();
        assert_eq!(days, vec![date(2024, 1, 1), date(2024, 1, 31)]);
    }

    #[tokio::test]
    async fn history_marks_are_per_date() {
        let (kv, _, history) = repos();
        assert!(!history.exists(date(2024, 1, 1)).await.unwrap());
        history.set(date(2024, 1, 1)).await.unwrap();
        assert!(history.exists(date(2024, 1, 1)).await.unwrap());
        assert!(!history.exists(date(2024, 1, 2)).await.unwrap());
        assert_eq!(kv.get("history:2024-01-01").await.unwrap().as_deref(), Some("done"));
    }
}
