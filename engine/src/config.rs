//! Process-wide configuration. Values come from flags or the environment
//! once at start-up and are never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::decision::{TemperatureRange, DEFAULT_TEMP_CHANGE_PER_HOUR};
use crate::error::ConfigError;
use crate::schedule::ArrivalTime;

/// Asia/Tokyo, which has no daylight saving.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub temperature_range: TemperatureRange,
    pub default_arrival: ArrivalTime,
    pub temp_change_per_hour: f64,
    pub meter_device_id: String,
    pub air_conditioner_device_id: String,
    pub notification_webhook_url: String,
    pub utc_offset: FixedOffset,
}

impl EngineConfig {
    /// `now` in the configured zone.
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.utc_offset)
    }

    /// Calendar date in the configured zone. Every "today" goes through here.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date_naive()
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct Settings {
    /// Heat when the room is below this temperature (°C).
    #[arg(long, env = "MINIMUM_ACCEPTABLE_TEMPERATURE", default_value_t = 20.0)]
    pub minimum_temperature: f64,

    /// Cool when the room is above this temperature (°C).
    #[arg(long, env = "MAXIMUM_ACCEPTABLE_TEMPERATURE", default_value_t = 28.0)]
    pub maximum_temperature: f64,

    #[arg(long, env = "DEFAULT_ARRIVED_HOME__HOUR", default_value_t = 20)]
    pub default_arrival_hour: u32,

    #[arg(long, env = "DEFAULT_ARRIVED_HOME__MINUTE", default_value_t = 0)]
    pub default_arrival_minute: u32,

    /// Assumed °C per hour the unit can move the room temperature.
    #[arg(long, env = "TEMP_CHANGE_PER_HOUR", default_value_t = DEFAULT_TEMP_CHANGE_PER_HOUR)]
    pub temp_change_per_hour: f64,

    #[arg(long, env = "METER_DEVICE_ID")]
    pub meter_device_id: String,

    #[arg(long, env = "AIR_CONDITIONER_DEVICE_ID")]
    pub air_conditioner_device_id: String,

    #[arg(long, env = "NOTIFICATION_WEBHOOK_URL")]
    pub notification_webhook_url: String,

    #[arg(long, env = "SWITCHBOT_TOKEN", hide_env_values = true)]
    pub switchbot_token: String,

    #[arg(long, env = "SWITCHBOT_CLIENT_SECRET", hide_env_values = true)]
    pub switchbot_client_secret: String,

    /// Offset of the zone that defines "today", in minutes east of UTC.
    #[arg(long, env = "UTC_OFFSET_MINUTES", default_value_t = DEFAULT_UTC_OFFSET_MINUTES, allow_negative_numbers = true)]
    pub utc_offset_minutes: i32,

    /// Per-request timeout for outbound HTTP calls.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// JSON file holding schedules and daily marks.
    #[arg(long, env = "DATA_FILE")]
    pub data_file: Option<PathBuf>,
}

impl Settings {
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.minimum_temperature > self.maximum_temperature {
            return Err(ConfigError::InvertedRange {
                minimum: self.minimum_temperature,
                maximum: self.maximum_temperature,
            });
        }
        if !(self.temp_change_per_hour > 0.0) {
            return Err(ConfigError::NonPositiveRate(self.temp_change_per_hour));
        }
        let utc_offset = self
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidOffset(self.utc_offset_minutes))?;
        let default_arrival =
            ArrivalTime::new(self.default_arrival_hour, self.default_arrival_minute)?;

        Ok(EngineConfig {
            temperature_range: TemperatureRange {
                minimum: self.minimum_temperature,
                maximum: self.maximum_temperature,
            },
            default_arrival,
            temp_change_per_hour: self.temp_change_per_hour,
            meter_device_id: self.meter_device_id.clone(),
            air_conditioner_device_id: self.air_conditioner_device_id.clone(),
            notification_webhook_url: self.notification_webhook_url.clone(),
            utc_offset,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
