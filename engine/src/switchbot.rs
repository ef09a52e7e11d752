//! SwitchBot Cloud API v1.1 client: meter reads and air conditioner commands.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ActuatorError, HttpError, SensorError};
use crate::ports::{Actuator, TemperatureSensor};

pub const SWITCHBOT_BASE_URL: &str = "https://api.switch-bot.com/v1.1/devices";

const STATUS_SUCCESS: i64 = 100;
const FAN_SPEED_AUTO: u8 = 1;
const POWER_ON: &str = "on";

/// Operating mode of the infrared air conditioner remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Cool,
    Heat,
}

impl Mode {
    fn code(self) -> u8 {
        match self {
            Mode::Auto => 1,
            Mode::Cool => 2,
            Mode::Heat => 5,
        }
    }
}

/// `base64(HMAC-SHA256(secret, token + t + nonce))`.
pub fn sign(token: &str, secret: &str, t: i64, nonce: &str) -> String {
    let data = format!("{token}{t}{nonce}");
    STANDARD.encode(hmac_sha256::HMAC::mac(data.as_bytes(), secret.as_bytes()))
}

/// `setAll` parameter: `temperature,mode,fan speed,power`.
fn set_all_parameter(target_temp: f64, mode: Mode) -> String {
    format!("{target_temp},{},{FAN_SPEED_AUTO},{POWER_ON}", mode.code())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Command {
    command_type: &'static str,
    command: &'static str,
    parameter: String,
}

#[derive(Debug, Deserialize)]
struct MeterStatusResponse {
    body: MeterStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct MeterStatus {
    device_id: String,
    device_type: String,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandResponse {
    status_code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct SwitchBotClient {
    http: Client,
    base_url: String,
    token: String,
    secret: String,
}

impl SwitchBotClient {
    pub fn new(
        token: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: SWITCHBOT_BASE_URL.to_string(),
            token: token.into(),
            secret: secret.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let t = Utc::now().timestamp_millis();
        let nonce = Uuid::new_v4().to_string();
        let sign = sign(&self.token, &self.secret, t, &nonce);
        request
            .header("Authorization", &self.token)
            .header("sign", sign)
            .header("nonce", nonce)
            .header("t", t.to_string())
    }

    fn ensure_success(response: Response, context: &str) -> Result<Response, HttpError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(HttpError::new(response.status(), context))
        }
    }

    pub async fn meter_temperature(&self, device_id: &str) -> Result<f64, SensorError> {
        let url = format!("{}/{device_id}/status", self.base_url);
        let response = self.authorized(self.http.get(&url)).send().await?;
        let response = Self::ensure_success(response, "GET request")?;
        let status: MeterStatusResponse = response
            .json()
            .await
            .map_err(|e| SensorError::Payload(e.to_string()))?;
        debug!(device_id, temperature = status.body.temperature, "meter status");
        Ok(status.body.temperature)
    }

    pub async fn set_air_conditioner(
        &self,
        device_id: &str,
        target_temp: f64,
        mode: Mode,
    ) -> Result<(), ActuatorError> {
        let url = format!("{}/{device_id}/commands", self.base_url);
        let command = Command {
            command_type: "command",
            command: "setAll",
            parameter: set_all_parameter(target_temp, mode),
        };
        let response = self
            .authorized(self.http.post(&url).json(&command))
            .send()
            .await?;
        let response = Self::ensure_success(response, "POST request")?;

        // An unreadable body after a 2xx still counts as accepted.
        if let Ok(reply) = response.json::<CommandResponse>().await {
            if let Some(code) = reply.status_code.filter(|code| *code != STATUS_SUCCESS) {
                return Err(ActuatorError::Rejected {
                    code,
                    message: reply.message,
                });
            }
        }
        debug!(device_id, parameter = %command.parameter, "air conditioner command accepted");
        Ok(())
    }
}

#[async_trait]
impl TemperatureSensor for SwitchBotClient {
    async fn current_temp(&self, device_id: &str) -> Result<f64, SensorError> {
        self.meter_temperature(device_id).await
    }
}

#[async_trait]
impl Actuator for SwitchBotClient {
    async fn turn_on(&self, device_id: &str, target_temp: f64) -> Result<(), ActuatorError> {
        self.set_air_conditioner(device_id, target_temp, Mode::Auto).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_base64() {
        let a = sign("token", "secret", 1_700_000_000_000, "nonce-1");
        let b = sign("token", "secret", 1_700_000_000_000, "nonce-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 44);
        assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn signature_covers_every_input() {
        let base = sign("token", "secret", 1, "nonce");
        assert_ne!(base, sign("token", "secret", 2, "nonce"));
        assert_ne!(base, sign("token", "secret", 1, "other"));
        assert_ne!(base, sign("token", "other", 1, "nonce"));
        assert_ne!(base, sign("other", "secret", 1, "nonce"));
    }

    #[test]
    fn set_all_parameter_format() {
        assert_eq!(set_all_parameter(28.0, Mode::Auto), "28,1,1,on");
        assert_eq!(set_all_parameter(20.5, Mode::Heat), "20.5,5,1,on");
        assert_eq!(set_all_parameter(26.0, Mode::Cool), "26,2,1,on");
    }
}
