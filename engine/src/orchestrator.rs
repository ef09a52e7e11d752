//! One tick of the daily run: check the mark, resolve today's schedule, read
//! the meter, decide, actuate, mark, notify. Each step can end the cycle.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::decision::decide;
use crate::error::{CycleError, StoreError};
use crate::ports::{Actuator, IdempotencyStore, Notifier, ScheduleStore, TemperatureSensor};
use crate::schedule::ScheduleConfig;

/// How a cycle ended. Every decision path produces exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    AlreadyProcessedToday,
    ScheduleDisabled,
    TemperatureInRange,
    NotYetTime,
    AcTurnedOnSuccess,
    MeterStatusError,
    AcControlError,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::AlreadyProcessedToday,
        Outcome::ScheduleDisabled,
        Outcome::TemperatureInRange,
        Outcome::NotYetTime,
        Outcome::AcTurnedOnSuccess,
        Outcome::MeterStatusError,
        Outcome::AcControlError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::AlreadyProcessedToday => "ALREADY_PROCESSED_TODAY",
            Outcome::ScheduleDisabled => "SCHEDULE_DISABLED",
            Outcome::TemperatureInRange => "TEMPERATURE_IN_RANGE",
            Outcome::NotYetTime => "NOT_YET_TIME",
            Outcome::AcTurnedOnSuccess => "AC_TURNED_ON_SUCCESS",
            Outcome::MeterStatusError => "METER_STATUS_ERROR",
            Outcome::AcControlError => "AC_CONTROL_ERROR",
        }
    }

    /// Failures of an external call; the next tick retries them.
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::MeterStatusError | Outcome::AcControlError)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Collaborators {
    pub schedules: Arc<dyn ScheduleStore>,
    pub history: Arc<dyn IdempotencyStore>,
    pub sensor: Arc<dyn TemperatureSensor>,
    pub actuator: Arc<dyn Actuator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Today's schedule and whether it came from the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSchedule {
    pub schedule: ScheduleConfig,
    pub is_default: bool,
}

pub struct Orchestrator {
    config: EngineConfig,
    ports: Collaborators,
    // Overlapping ticks in this process must not both pass the mark check.
    cycle_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig, ports: Collaborators) -> Self {
        Self {
            config,
            ports,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schedules(&self) -> &Arc<dyn ScheduleStore> {
        &self.ports.schedules
    }

    /// Stored schedule for `date`, or the default when none is stored or the
    /// stored record cannot be decoded.
    pub async fn effective_schedule(&self, date: NaiveDate) -> Result<EffectiveSchedule, StoreError> {
        let stored = match self.ports.schedules.get(date).await {
            Ok(stored) => stored,
            Err(e @ StoreError::Malformed { .. }) => {
                warn!(%date, error = %e, "stored schedule unreadable, using default");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(match stored {
            Some(schedule) => EffectiveSchedule {
                schedule,
                is_default: false,
            },
            None => EffectiveSchedule {
                schedule: ScheduleConfig::enabled_at(self.config.default_arrival),
                is_default: true,
            },
        })
    }

    pub async fn run_cycle(&self) -> Result<Outcome, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<Outcome, CycleError> {
        let _running = self.cycle_lock.lock().await;
        let local_now = self.config.local(now);
        let today = local_now.date_naive();

        if self.ports.history.exists(today).await.map_err(CycleError::History)? {
            debug!(%today, "already processed today");
            return Ok(Outcome::AlreadyProcessedToday);
        }

        let EffectiveSchedule { schedule, is_default } = self
            .effective_schedule(today)
            .await
            .map_err(CycleError::Schedule)?;
        if schedule.disabled {
            debug!(%today, "schedule disabled");
            return Ok(Outcome::ScheduleDisabled);
        }

        let meter_id = &self.config.meter_device_id;
        let actual_temp = match self.ports.sensor.current_temp(meter_id).await {
            Ok(temp) => temp,
            Err(e) => {
                error!(device_id = %meter_id, error = %e, "failed to get meter status");
                return Ok(Outcome::MeterStatusError);
            }
        };

        let Some(decision) = decide(
            local_now,
            actual_temp,
            &schedule,
            &self.config.temperature_range,
            self.config.temp_change_per_hour,
        ) else {
            debug!(actual_temp, "temperature in range");
            return Ok(Outcome::TemperatureInRange);
        };

        if !decision.is_due {
            debug!(
                actual_temp,
                threshold = decision.threshold_temp,
                arrival = %schedule.arrival,
                default_schedule = is_default,
                lead_hours = decision.required_lead_hours,
                start_at = %decision.optimal_start_time,
                "not yet time"
            );
            return Ok(Outcome::NotYetTime);
        }

        let ac_id = &self.config.air_conditioner_device_id;
        if let Err(e) = self.ports.actuator.turn_on(ac_id, decision.threshold_temp).await {
            error!(device_id = %ac_id, error = %e, "failed to turn on air conditioner");
            return Ok(Outcome::AcControlError);
        }
        info!(
            actual_temp,
            target = decision.threshold_temp,
            start_at = %decision.optimal_start_time,
            arrival = %decision.arrival_time,
            "air conditioner turned on"
        );

        // Written before notifying so a crash past this point cannot actuate twice.
        if let Err(e) = self.ports.history.set(today).await {
            error!(%today, error = %e, "failed to record today's mark; a later tick may actuate again");
        }

        if let Err(e) = self
            .ports
            .notifier
            .notify(
                &self.config.notification_webhook_url,
                now,
                actual_temp,
                decision.threshold_temp,
            )
            .await
        {
            warn!(error = %e, "failed to send notification");
        }

        Ok(Outcome::AcTurnedOnSuccess)
    }
}
