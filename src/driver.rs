//! Wall-clock driver that owns an engine on a tokio task.
//!
//! The task applies [`Command`]s as they arrive and, on every tick, advances
//! virtual time by the elapsed wall time scaled by the engine speed. The
//! latest [`Snapshot`] is published on a `watch` channel.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::engine::SimulationEngine;
use crate::protocol::ControlAction;
use crate::state::Snapshot;

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    SetSpeed(f64),
}

impl From<ControlAction> for Command {
    fn from(action: ControlAction) -> Self {
        match action {
            ControlAction::Pause => Command::Pause,
            ControlAction::Resume => Command::Resume,
            ControlAction::Stop => Command::Stop,
        }
    }
}

pub struct SimulationHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    task: JoinHandle<SimulationEngine>,
}

impl SimulationHandle {
    /// Queues a command; false once the driver task has exited.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Stops the driver and hands the engine back.
    pub async fn shutdown(self) -> Option<SimulationEngine> {
        drop(self.commands);
        match self.task.await {
            Ok(engine) => Some(engine),
            Err(err) => {
                warn!(%err, "driver task failed");
                None
            }
        }
    }
}

pub fn spawn(engine: SimulationEngine, tick: Duration) -> SimulationHandle {
    let (commands, rx) = mpsc::unbounded_channel();
    let (tx, snapshots) = watch::channel(engine.snapshot());
    let task = tokio::spawn(drive(engine, rx, tx, tick));

    SimulationHandle {
        commands,
        snapshots,
        task,
    }
}

async fn drive(
    mut engine: SimulationEngine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Snapshot>,
    tick: Duration,
) -> SimulationEngine {
    let mut ticker = time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    // fractional virtual milliseconds carried between ticks
    let mut carry = 0.0_f64;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                apply(&mut engine, command);
                snapshots.send_replace(engine.snapshot());
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last);
                last = now;
                if engine.is_running() && !engine.is_paused() {
                    let virtual_ms = elapsed.as_secs_f64() * 1_000.0 * engine.speed() + carry;
                    let whole = virtual_ms.floor();
                    carry = virtual_ms - whole;
                    let handled = engine.advance(whole as u64);
                    if handled > 0 {
                        debug!(handled, time_ms = engine.now_ms(), "advanced");
                    }
                } else {
                    carry = 0.0;
                }
                snapshots.send_replace(engine.snapshot());
            }
        }
    }

    debug!("driver stopped");
    engine
}

fn apply(engine: &mut SimulationEngine, command: Command) {
    debug!(?command, "applying command");
    match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Stop => engine.stop(),
        Command::Reset => engine.reset(),
        Command::SetSpeed(speed) => {
            if let Err(err) = engine.set_speed(speed) {
                warn!(%err, "speed change rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimConfig;

    fn engine() -> SimulationEngine {
        let mut config = SimConfig::default();
        config.seed = Some(5);
        SimulationEngine::from_config(config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn driver_tracks_wall_clock() {
        let handle = spawn(engine(), DEFAULT_TICK);
        assert!(handle.send(Command::Start));

        time::sleep(Duration::from_secs(60)).await;
        let snapshot = handle.snapshot();
        assert!(snapshot.is_running);
        assert!(
            (59_000..=60_000).contains(&snapshot.time_ms),
            "time_ms = {}",
            snapshot.time_ms
        );
        assert!(snapshot.metrics.total_orders >= 4);

        let engine = handle.shutdown().await.unwrap();
        assert!(engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn speed_scales_virtual_time() {
        let handle = spawn(engine(), DEFAULT_TICK);
        handle.send(Command::SetSpeed(10.0));
        handle.send(Command::Start);

        time::sleep(Duration::from_secs(10)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.speed, 10.0);
        assert!(
            (99_000..=100_000).contains(&snapshot.time_ms),
            "time_ms = {}",
            snapshot.time_ms
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_virtual_time() {
        let handle = spawn(engine(), DEFAULT_TICK);
        handle.send(Command::Start);
        time::sleep(Duration::from_secs(5)).await;

        handle.send(Command::from(ControlAction::Pause));
        time::sleep(Duration::from_secs(1)).await;
        let paused = handle.snapshot();
        assert!(paused.is_paused);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().time_ms, paused.time_ms);

        handle.send(Command::Resume);
        time::sleep(Duration::from_secs(2)).await;
        assert!(handle.snapshot().time_ms > paused.time_ms);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_reset_returns_to_initial_state() {
        let handle = spawn(engine(), DEFAULT_TICK);
        handle.send(Command::Start);
        time::sleep(Duration::from_secs(30)).await;
        handle.send(Command::Stop);
        handle.send(Command::Reset);
        time::sleep(Duration::from_millis(500)).await;

        let snapshot = handle.snapshot();
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.time_ms, 0);
        assert_eq!(snapshot.metrics.total_orders, 0);
    }
}
