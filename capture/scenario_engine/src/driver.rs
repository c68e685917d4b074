//! Wall-clock driver for a [`ScenarioPlayer`].
//!
//! The player keeps running on its own clock; the driver task maps that clock onto
//! elapsed tokio time, sleeps until the next deadline and forwards commands.

use std::{future, sync::Arc};

use anyhow::{anyhow, Result};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::debug;

use crate::{
    player::{PlaybackEvent, ScenarioPlayer},
    scenario::Scenario,
    scheduler::{Scheduler, VirtualScheduler},
    snapshot::PlaybackSnapshot,
};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Request sent to a running driver.
#[derive(Debug, Clone)]
pub enum DriverCommand {
    /// Start playback.
    Start,
    /// Pause playback.
    Pause,
    /// Resume playback.
    Resume,
    /// Back to idle.
    Reset,
    /// Play button behaviour.
    Toggle,
    /// Jump to the end.
    Skip,
    /// Switch scenario.
    Load(Arc<Scenario>),
    /// Stop the task and hand the player back.
    Shutdown,
}

/// Client side of a spawned driver.
#[derive(Debug)]
pub struct DriverHandle<S = VirtualScheduler> {
    commands: mpsc::Sender<DriverCommand>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
    task: JoinHandle<ScenarioPlayer<S>>,
}

/// Spawns driver tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackDriver;

impl PlaybackDriver {
    /// Moves `player` onto a tokio task. Must be called inside a runtime.
    pub fn spawn<S>(player: ScenarioPlayer<S>) -> DriverHandle<S>
    where
        S: Scheduler + 'static,
    {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let snapshots = player.subscribe();
        let task = tokio::spawn(run(player, inbox, events.clone()));
        DriverHandle {
            commands,
            snapshots,
            events,
            task,
        }
    }
}

async fn run<S: Scheduler>(
    mut player: ScenarioPlayer<S>,
    mut inbox: mpsc::Receiver<DriverCommand>,
    events: broadcast::Sender<PlaybackEvent>,
) -> ScenarioPlayer<S> {
    let origin = Instant::now();
    let offset = player.now();
    let clock = |at: Instant| offset + at.saturating_duration_since(origin);
    debug!(scenario = %player.scenario().id, "driver started");
    loop {
        let wake = player
            .next_deadline()
            .map(|deadline| origin + deadline.saturating_sub(offset));
        tokio::select! {
            command = inbox.recv() => {
                let Some(command) = command else { break };
                let mut out = player.advance_to(clock(Instant::now()));
                match command {
                    DriverCommand::Start => out.extend(player.start()),
                    DriverCommand::Pause => out.extend(player.pause()),
                    DriverCommand::Resume => out.extend(player.resume()),
                    DriverCommand::Reset => out.extend(player.reset()),
                    DriverCommand::Toggle => out.extend(player.toggle()),
                    DriverCommand::Skip => out.extend(player.skip()),
                    DriverCommand::Load(scenario) => out.extend(player.load(scenario)),
                    DriverCommand::Shutdown => {
                        forward(&events, out);
                        break;
                    }
                }
                forward(&events, out);
            }
            () = wait(wake) => {
                let out = player.advance_to(clock(Instant::now()));
                forward(&events, out);
            }
        }
    }
    debug!(scenario = %player.scenario().id, "driver stopped");
    player
}

fn forward(events: &broadcast::Sender<PlaybackEvent>, out: Vec<PlaybackEvent>) {
    for event in out {
        // Nobody listening is fine.
        let _ = events.send(event);
    }
}

async fn wait(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}

impl<S: Scheduler> DriverHandle<S> {
    /// Queues a command.
    pub async fn send(&self, command: DriverCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("playback driver has stopped"))
    }

    /// Queues [`DriverCommand::Start`].
    pub async fn start(&self) -> Result<()> {
        self.send(DriverCommand::Start).await
    }

    /// Queues [`DriverCommand::Pause`].
    pub async fn pause(&self) -> Result<()> {
        self.send(DriverCommand::Pause).await
    }

    /// Queues [`DriverCommand::Resume`].
    pub async fn resume(&self) -> Result<()> {
        self.send(DriverCommand::Resume).await
    }

    /// Queues [`DriverCommand::Reset`].
    pub async fn reset(&self) -> Result<()> {
        self.send(DriverCommand::Reset).await
    }

    /// Queues [`DriverCommand::Toggle`].
    pub async fn toggle(&self) -> Result<()> {
        self.send(DriverCommand::Toggle).await
    }

    /// Queues [`DriverCommand::Skip`].
    pub async fn skip(&self) -> Result<()> {
        self.send(DriverCommand::Skip).await
    }

    /// Queues [`DriverCommand::Load`].
    pub async fn load(&self, scenario: Arc<Scenario>) -> Result<()> {
        self.send(DriverCommand::Load(scenario)).await
    }

    /// Latest snapshot receiver.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Receiver for events produced after this call.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Waits until a snapshot satisfies `ready` and returns it.
    pub async fn wait_for(
        &self,
        ready: impl FnMut(&PlaybackSnapshot) -> bool,
    ) -> Result<PlaybackSnapshot> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(ready)
            .await
            .map_err(|_| anyhow!("playback driver has stopped"))?
            .clone();
        Ok(snapshot)
    }

    /// Waits for the complete stage.
    pub async fn wait_until_complete(&self) -> Result<PlaybackSnapshot> {
        self.wait_for(PlaybackSnapshot::is_complete).await
    }

    /// Stops the task, waits for queued telemetry events to be published and
    /// returns the player.
    pub async fn shutdown(self) -> Result<ScenarioPlayer<S>> {
        // The task may already be gone if the inbox closed.
        let _ = self.commands.send(DriverCommand::Shutdown).await;
        let player = self.task.await?;
        if let Some(telemetry) = player.telemetry().cloned() {
            telemetry.flush().await?;
        }
        Ok(player)
    }
}
