use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::time::Duration;

use aircon_engine::switchbot::{Mode, SwitchBotClient};
use aircon_engine::TemperatureRange;

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Cool,
    Heat,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => Mode::Auto,
            ModeArg::Cool => Mode::Cool,
            ModeArg::Heat => Mode::Heat,
        }
    }
}

/// Read the meter, or turn the air conditioner on by hand.
#[derive(Parser)]
#[command(name = "aircon-enable", version)]
struct Cli {
    /// Target temperature. Without it, only the meter is read.
    target: Option<f64>,

    #[arg(long, value_enum, default_value = "auto")]
    mode: ModeArg,

    #[arg(long, env = "METER_DEVICE_ID")]
    meter_device_id: Option<String>,

    #[arg(long, env = "AIR_CONDITIONER_DEVICE_ID")]
    air_conditioner_device_id: Option<String>,

    #[arg(long, env = "MINIMUM_ACCEPTABLE_TEMPERATURE", default_value_t = 20.0)]
    min_temp: f64,

    #[arg(long, env = "MAXIMUM_ACCEPTABLE_TEMPERATURE", default_value_t = 28.0)]
    max_temp: f64,

    #[arg(long, env = "SWITCHBOT_TOKEN", hide_env_values = true)]
    switchbot_token: String,

    #[arg(long, env = "SWITCHBOT_CLIENT_SECRET", hide_env_values = true)]
    switchbot_client_secret: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = SwitchBotClient::new(
        cli.switchbot_token.clone(),
        cli.switchbot_client_secret.clone(),
        Duration::from_secs(10),
    )?;

    if let Some(meter) = &cli.meter_device_id {
        let temp = client.meter_temperature(meter).await?;
        let range = TemperatureRange { minimum: cli.min_temp, maximum: cli.max_temp };
        let verdict = if range.contains(temp) { "in range" } else { "out of range" };
        println!("Room {:.1}℃ ({})", temp, verdict);
    }

    match (cli.target, &cli.air_conditioner_device_id) {
        (Some(target), Some(device)) => {
            client.set_air_conditioner(device, target, cli.mode.into()).await?;
            println!("Set on {} -> {}℃", device, target);
        }
        (Some(_), None) => bail!("AIR_CONDITIONER_DEVICE_ID is required to turn the unit on"),
        (None, _) if cli.meter_device_id.is_none() => {
            bail!("Usage: [target] with METER_DEVICE_ID and/or AIR_CONDITIONER_DEVICE_ID")
        }
        (None, _) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn credentials_come_from_hidden_env() {
        let command = Cli::command();
        for (id, var) in [
            ("switchbot_token", "SWITCHBOT_TOKEN"),
            ("switchbot_client_secret", "SWITCHBOT_CLIENT_SECRET"),
        ] {
            let arg = command.get_arguments().find(|a| a.get_id() == id).unwrap();
            assert_eq!(arg.get_env().and_then(|v| v.to_str()), Some(var));
            assert!(arg.is_hide_env_values_set());
        }
    }

    #[test]
    fn flags_fill_credentials() {
        let cli = Cli::try_parse_from([
            "aircon-enable",
            "--switchbot-token",
            "token",
            "--switchbot-client-secret",
            "secret",
            "--mode",
            "cool",
            "26.5",
        ])
        .unwrap();
        assert_eq!(cli.switchbot_token, "token");
        assert_eq!(cli.switchbot_client_secret, "secret");
        assert_eq!(cli.target, Some(26.5));
        assert_eq!(Mode::from(cli.mode), Mode::Cool);
    }
}
