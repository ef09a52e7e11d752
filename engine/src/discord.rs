use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{HttpError, NotifyError};
use crate::ports::Notifier;

const EMBED_COLOR: u32 = 5_620_992;

/// Posts an embed to a Discord webhook when the unit has been turned on.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Client,
}

impl DiscordNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
        })
    }
}

fn turned_on_message(timestamp: DateTime<Utc>, actual_temp: f64, target_temp: f64) -> Value {
    json!({
        "embeds": [{
            "title": "Air conditioner turned on",
            "description": "The room temperature left the acceptable range, so the air conditioner was turned on.",
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            "color": EMBED_COLOR,
            "fields": [
                { "name": "Room temperature", "value": format!("{actual_temp}℃"), "inline": true },
                { "name": "Set temperature", "value": format!("{target_temp}℃"), "inline": true },
            ],
        }],
    })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(
        &self,
        webhook_url: &str,
        timestamp: DateTime<Utc>,
        actual_temp: f64,
        target_temp: f64,
    ) -> Result<(), NotifyError> {
        let body = turned_on_message(timestamp, actual_temp, target_temp);
        let response = self.http.post(webhook_url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(HttpError::new(response.status(), "posting webhook").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_carries_both_temperatures() {
        let timestamp = "2024-01-01T10:00:00Z".parse().unwrap();
        let message = turned_on_message(timestamp, 30.2, 28.0);
        let embed = &message["embeds"][0];

        assert_eq!(embed["timestamp"], "2024-01-01T10:00:00Z");
        assert_eq!(embed["color"], 5_620_992);
        assert_eq!(embed["fields"][0]["value"], "30.2℃");
        assert_eq!(embed["fields"][1]["value"], "28℃");
    }
}
