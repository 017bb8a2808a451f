//! Command — one line of operator input, `<command> [argument]`.
//!
//! | command | argument | effect |
//! |---------|----------|--------|
//! | `off` | — | power off every device, then stop |
//! | `power` | 0–100 | power factor for adjustable influencers |
//! | `accuracy` | number | dead-band width |
//! | `temp` | number | temperature preference |
//! | `Temp` | number | outside temperature |
//! | `humidity` | number | humidity preference |
//! | `light` | number | illuminance preference |
//! | `status` | — | print every device's state |

use std::str::FromStr;

use crate::condition::ConditionKind;
use crate::device::PowerFactor;

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Off,
    Power(PowerFactor),
    Accuracy(f64),
    Preference(ConditionKind, f64),
    OutsideTemperature(f64),
    Status,
}

/// Why a line could not be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command - {0}")]
    Unknown(String),

    #[error("command {0} requires a numeric argument")]
    MissingArgument(&'static str),

    #[error("invalid command argument - {argument}")]
    InvalidArgument { argument: String },
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?;
        let argument = parts.next().map(parse_argument).transpose()?;

        let required = |command: &'static str| argument.ok_or(CommandError::MissingArgument(command));

        match name {
            "off" => Ok(Self::Off),
            "status" => Ok(Self::Status),
            "power" => Ok(Self::Power(PowerFactor::saturating(required("power")?))),
            "accuracy" => Ok(Self::Accuracy(required("accuracy")?)),
            "temp" => Ok(Self::Preference(
                ConditionKind::Temperature,
                required("temp")?,
            )),
            "Temp" => Ok(Self::OutsideTemperature(required("Temp")?)),
            "humidity" => Ok(Self::Preference(
                ConditionKind::Humidity,
                required("humidity")?,
            )),
            "light" => Ok(Self::Preference(
                ConditionKind::Illuminance,
                required("light")?,
            )),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_argument(raw: &str) -> Result<f64, CommandError> {
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::InvalidArgument {
            argument: raw.to_string(),
        })
}
