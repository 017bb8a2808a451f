//! Operator console — one command per line.

use tokio::sync::mpsc;

use climatehub_app::ports::{ClimateDevice, EventPublisher};
use climatehub_app::services::command_service::{CommandService, Flow};
use climatehub_domain::command::{Command, CommandError};

const LINE_BUFFER: usize = 16;

/// Read stdin on a dedicated thread and forward each line.
///
/// The thread is detached so a pending read never holds up shutdown.
pub fn stdin_lines() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(LINE_BUFFER);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if sender.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to read stdin");
                    break;
                }
            }
        }
    });
    receiver
}

/// Execute lines until `off` or until the input closes.
///
/// Invalid lines and rejected commands are reported and skipped. A closed
/// input is treated as `off`.
pub async fn run<D, P>(commands: &CommandService<D, P>, mut lines: mpsc::Receiver<String>)
where
    D: ClimateDevice,
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    while let Some(line) = lines.recv().await {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(error) => {
                tracing::warn!(%error, "command ignored");
                continue;
            }
        };
        match commands.execute(command).await {
            Ok(Flow::Stop) => return,
            Ok(Flow::Continue) => {}
            Err(error) => tracing::warn!(%error, "command rejected"),
        }
    }

    tracing::info!("input closed, powering off");
    if let Err(error) = commands.execute(Command::Off).await {
        tracing::warn!(%error, "power off failed");
    }
}
