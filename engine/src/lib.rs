//! Daily air conditioner pre-conditioning.
//!
//! Once per calendar day, turn the unit on early enough that the room is back
//! within the acceptable range when the user arrives home.

pub mod config;
pub mod decision;
pub mod discord;
pub mod error;
pub mod kv;
pub mod orchestrator;
pub mod ports;
pub mod schedule;
pub mod store;
pub mod switchbot;

use std::sync::Arc;

pub use config::{EngineConfig, Settings};
pub use decision::{Decision, TemperatureRange};
pub use orchestrator::{Collaborators, EffectiveSchedule, Orchestrator, Outcome};
pub use schedule::{ArrivalTime, ScheduleConfig, ScheduleEntry};

use crate::discord::DiscordNotifier;
use crate::error::ConfigError;
use crate::kv::{FileKv, KvStore, MemoryKv};
use crate::store::{HistoryRepository, ScheduleRepository};
use crate::switchbot::SwitchBotClient;

/// Store selected by the settings: the data file when given, memory otherwise.
pub fn open_store(settings: &Settings) -> Arc<dyn KvStore> {
    match &settings.data_file {
        Some(path) => Arc::new(FileKv::new(path)),
        None => Arc::new(MemoryKv::new()),
    }
}

/// Wire the production collaborators around `kv`.
pub fn build_orchestrator(settings: &Settings, kv: Arc<dyn KvStore>) -> Result<Orchestrator, ConfigError> {
    let config = settings.engine_config()?;
    let switchbot = Arc::new(SwitchBotClient::new(
        settings.switchbot_token.clone(),
        settings.switchbot_client_secret.clone(),
        settings.http_timeout(),
    )?);
    let ports = Collaborators {
        schedules: Arc::new(ScheduleRepository::new(kv.clone())),
        history: Arc::new(HistoryRepository::new(kv)),
        sensor: switchbot.clone(),
        actuator: switchbot,
        notifier: Arc::new(DiscordNotifier::new(settings.http_timeout())?),
    };
    Ok(Orchestrator::new(config, ports))
}
