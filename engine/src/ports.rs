//! Collaborators the orchestrator drives. Stores, the meter, the unit and
//! the notification channel all sit behind these traits so the cycle can be
//! exercised against fakes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{ActuatorError, NotifyError, SensorError, StoreError};
use crate::schedule::ScheduleConfig;

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// `Ok(None)` when no record exists for `date`. Undecodable records are
    /// reported as [`StoreError::Malformed`].
    async fn get(&self, date: NaiveDate) -> Result<Option<ScheduleConfig>, StoreError>;

    async fn set(&self, date: NaiveDate, schedule: ScheduleConfig) -> Result<(), StoreError>;

    /// Remove the record so the day falls back to the default.
    async fn reset(&self, date: NaiveDate) -> Result<(), StoreError>;

    /// Stored records within `[start, end]`, in date order.
    async fn list(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, ScheduleConfig)>, StoreError>;
}

/// Per-day "already actuated" marks.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn exists(&self, date: NaiveDate) -> Result<bool, StoreError>;

    async fn set(&self, date: NaiveDate) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    /// Current room temperature in °C.
    async fn current_temp(&self, device_id: &str) -> Result<f64, SensorError>;
}

#[async_trait]
pub trait Actuator: Send + Sync {
    async fn turn_on(&self, device_id: &str, target_temp: f64) -> Result<(), ActuatorError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        webhook_url: &str,
        timestamp: DateTime<Utc>,
        actual_temp: f64,
        target_temp: f64,
    ) -> Result<(), NotifyError>;
}
