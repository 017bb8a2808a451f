//! Command service — applies operator commands to the controller and room.

use std::sync::Arc;

use climatehub_domain::command::Command;
use climatehub_domain::error::{ClimateError, ValidationError};
use climatehub_domain::event::{Event, EventType};

use crate::controller::Controller;
use crate::environment::Room;
use crate::ports::{ClimateDevice, Environment, EventPublisher};

/// Whether the console loop should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Dispatches parsed [`Command`]s.
pub struct CommandService<D, P> {
    controller: Arc<Controller<D, P>>,
    room: Arc<Room>,
    publisher: P,
}

impl<D, P> CommandService<D, P>
where
    D: ClimateDevice,
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    pub fn new(controller: Arc<Controller<D, P>>, room: Arc<Room>, publisher: P) -> Self {
        Self {
            controller,
            room,
            publisher,
        }
    }

    /// Apply `command`.
    ///
    /// `off` powers every device off before returning [`Flow::Stop`]; the
    /// caller is responsible for triggering shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ClimateError::Validation`] when the argument is out of range
    /// for the setting it targets. The previous value is kept.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, command: Command) -> Result<Flow, ClimateError> {
        match command {
            Command::Off => {
                self.controller.halt().await;
                self.controller.power_off_all().await;
                self.publisher
                    .publish(Event::new(
                        EventType::SystemStopping,
                        None,
                        serde_json::Value::Null,
                    ))
                    .await;
                return Ok(Flow::Stop);
            }
            Command::Status => self.controller.broadcast_status().await,
            Command::Power(factor) => {
                let accepted = self.controller.set_power_factor_all(factor).await;
                tracing::info!(%factor, accepted, "power factor requested");
            }
            Command::Accuracy(accuracy) => self.controller.set_accuracy(accuracy).await?,
            Command::Preference(kind, value) => {
                if self.room.condition(kind).is_none() {
                    return Err(ValidationError::UnknownCondition(kind).into());
                }
                self.controller.set_preference(kind, value).await?;
            }
            Command::OutsideTemperature(temperature) => {
                self.room.set_outside_temperature(temperature)?;
                self.publisher
                    .publish(Event::new(
                        EventType::OutsideTemperatureChanged,
                        None,
                        serde_json::json!(temperature),
                    ))
                    .await;
            }
        }
        Ok(Flow::Continue)
    }
}
