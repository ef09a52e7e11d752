use thiserror::Error;

/// Non-2xx response from a remote API.
#[derive(Debug, Error)]
#[error("HTTP error while {context}: ({status}) {reason}")]
pub struct HttpError {
    pub status: u16,
    pub reason: String,
    pub context: String,
}

impl HttpError {
    pub fn new(status: reqwest::StatusCode, context: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            context: context.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("meter request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("unexpected meter response: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("air conditioner request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("command rejected: ({code}) {message}")]
    Rejected { code: i64, message: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to post webhook: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Http(#[from] HttpError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("malformed value under {key}: {reason}")]
    Malformed { key: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("arrival time {hour:02}:{minute:02} is not a valid time of day")]
    InvalidTime { hour: u32, minute: u32 },
    #[error("arrival hour must be between 12 and 23, got {0}")]
    HourOutOfRange(u32),
    #[error("arrival minute must be a multiple of 15, got {0}")]
    MinuteNotQuarter(u32),
    #[error("{date} is outside the editable window {first}..={last}")]
    DateOutOfWindow {
        date: chrono::NaiveDate,
        first: chrono::NaiveDate,
        last: chrono::NaiveDate,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("minimum temperature {minimum} is above maximum {maximum}")]
    InvertedRange { minimum: f64, maximum: f64 },
    #[error("temperature change rate must be positive, got {0}")]
    NonPositiveRate(f64),
    #[error("UTC offset of {0} minutes is out of range")]
    InvalidOffset(i32),
    #[error("default arrival time: {0}")]
    DefaultArrival(#[from] ScheduleError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Infrastructure failure that prevents a cycle from reaching any decision.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("idempotency store unavailable: {0}")]
    History(#[source] StoreError),
    #[error("schedule store unavailable: {0}")]
    Schedule(#[source] StoreError),
}
