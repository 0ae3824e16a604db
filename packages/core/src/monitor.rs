//! The monitor actor.
//!
//! One task owns the schedule, the alert streak and the pause flag. The tray shell only
//! sends [`Command`]s through a [`MonitorHandle`] and renders the [`MonitorEvent`]s that
//! come back. Checks, calibration, snapshots and alert playback run in a [`JoinSet`] so
//! the loop keeps answering commands while the camera is busy.

use crate::alert::{AlertController, AlertDecision, Alerter, BAD_STREAK_LIMIT};
use crate::calibration::{Baseline, CalibrationStore, calibrate};
use crate::command::{CheckInterval, Command};
use crate::error::{AlertError, PipelineError, PipelineResult};
use crate::pipeline::{CycleReport, Pipeline, Snapshot};
use crate::posture::Outcome;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use spinespy_types::{Result, anyhow};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MonitorOptions {
    pub interval: CheckInterval,
    pub bad_streak_limit: u32,
    /// Longest wait for the camera and models before giving up with `Busy`
    pub lock_timeout: Duration,
    pub calibrate_on_start: bool,
    pub snapshot_dir: PathBuf,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: CheckInterval::default(),
            bad_streak_limit: BAD_STREAK_LIMIT,
            lock_timeout: Duration::from_secs(30),
            calibrate_on_start: true,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

/// What the tray shell gets told about
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    /// A scheduled check finished
    StatusChanged { outcome: Outcome, streak: u32 },
    /// A scheduled check was skipped, nothing else changed
    CheckSkipped { error: String },
    AlertFired,
    AlertFailed { error: String },
    Calibrated {
        /// `false` for the automatic calibration at startup
        requested: bool,
        result: Result<Baseline, String>,
    },
    SnapshotSaved {
        path: PathBuf,
        outcome: Option<Outcome>,
    },
    SnapshotFailed { error: String },
    MonitoringToggled { active: bool },
    IntervalChanged(CheckInterval),
    Stopped,
}

#[derive(Clone, Debug)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl MonitorHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("monitor is no longer running"))
    }
}

enum TaskOutcome {
    Check(PipelineResult<CycleReport>),
    Calibration {
        requested: bool,
        result: PipelineResult<Baseline>,
    },
    Snapshot(PipelineResult<Snapshot>),
    Alert(Result<(), AlertError>),
}

pub struct Monitor {
    pipeline: Arc<Mutex<Pipeline>>,
    store: CalibrationStore,
    alerts: AlertController,
    alerter: Arc<dyn Alerter>,
    options: MonitorOptions,
    active: bool,
    check_running: bool,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    tasks: JoinSet<TaskOutcome>,
}

impl Monitor {
    pub fn new(
        pipeline: Pipeline,
        store: CalibrationStore,
        alerter: Arc<dyn Alerter>,
        options: MonitorOptions,
    ) -> (Self, MonitorHandle, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let monitor = Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            store,
            alerts: AlertController::new(options.bad_streak_limit),
            alerter,
            options,
            active: true,
            check_running: false,
            commands: command_rx,
            events: event_tx,
            tasks: JoinSet::new(),
        };
        let handle = MonitorHandle {
            commands: command_tx,
        };

        (monitor, handle, event_rx)
    }

    /// Drive the schedule until `Quit` arrives or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(interval = %self.options.interval, "monitoring started");

        if self.options.calibrate_on_start {
            self.spawn_calibration(false);
        }

        let mut ticker = schedule(self.options.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("all monitor handles dropped");
                        break;
                    };
                    if command == Command::Quit {
                        break;
                    }
                    if let Some(interval) = self.on_command(command) {
                        ticker = schedule(interval);
                    }
                }
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.on_task_finished(joined);
                }
            }
        }

        tracing::info!("monitoring stopped");
        self.emit(MonitorEvent::Stopped);
    }

    fn on_tick(&mut self) {
        if !self.active {
            tracing::trace!("paused, skipping check");
            return;
        }
        if self.check_running {
            tracing::debug!("previous check still running, skipping tick");
            return;
        }

        self.check_running = true;
        let pipeline = self.pipeline.clone();
        let store = self.store.clone();
        let timeout = self.options.lock_timeout;
        self.tasks.spawn_blocking(move || {
            TaskOutcome::Check(with_pipeline(&pipeline, timeout, |pipeline| {
                pipeline.check(&store.read())
            }))
        });
    }

    /// Returns the new interval when the schedule has to restart
    fn on_command(&mut self, command: Command) -> Option<CheckInterval> {
        tracing::debug!(?command, "command received");
        match command {
            Command::ToggleMonitoring => {
                self.active = !self.active;
                tracing::info!(active = self.active, "monitoring toggled");
                self.emit(MonitorEvent::MonitoringToggled {
                    active: self.active,
                });
            }
            Command::SetInterval(interval) => {
                self.options.interval = interval;
                tracing::info!(%interval, "check interval changed");
                self.emit(MonitorEvent::IntervalChanged(interval));
                return Some(interval);
            }
            Command::Calibrate => self.spawn_calibration(true),
            Command::Snapshot => self.spawn_snapshot(),
            Command::TestAlert => self.spawn_alert(),
            Command::Quit => {}
        }
        None
    }

    fn on_task_finished(&mut self, joined: std::result::Result<TaskOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(%error, "background task failed");
                // A panicking check must not block the schedule forever.
                self.check_running = false;
                return;
            }
        };

        match outcome {
            TaskOutcome::Check(result) => {
                self.check_running = false;
                self.on_check(result);
            }
            TaskOutcome::Calibration { requested, result } => {
                if let Err(error) = &result {
                    tracing::warn!(%error, requested, "calibration failed");
                }
                self.emit(MonitorEvent::Calibrated {
                    requested,
                    result: result.map_err(|e| e.to_string()),
                });
            }
            TaskOutcome::Snapshot(Ok(snapshot)) => {
                self.emit(MonitorEvent::SnapshotSaved {
                    path: snapshot.path,
                    outcome: snapshot.report.map(|report| report.outcome),
                });
            }
            TaskOutcome::Snapshot(Err(error)) => {
                tracing::error!(%error, "snapshot failed");
                self.emit(MonitorEvent::SnapshotFailed {
                    error: error.to_string(),
                });
            }
            TaskOutcome::Alert(Ok(())) => tracing::debug!("alert sound finished"),
            TaskOutcome::Alert(Err(error)) => {
                tracing::error!(%error, "alert sound failed");
                self.emit(MonitorEvent::AlertFailed {
                    error: error.to_string(),
                });
            }
        }
    }

    fn on_check(&mut self, result: PipelineResult<CycleReport>) {
        let report = match result {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%error, "check skipped");
                self.emit(MonitorEvent::CheckSkipped {
                    error: error.to_string(),
                });
                return;
            }
        };

        tracing::info!(outcome = %report.outcome, "check complete");
        let decision = self.alerts.record(&report.outcome);
        self.emit(MonitorEvent::StatusChanged {
            outcome: report.outcome,
            streak: self.alerts.streak(),
        });

        if decision == AlertDecision::Fire {
            tracing::warn!(limit = self.alerts.limit(), "bad streak limit reached");
            self.spawn_alert();
        }
    }

    fn spawn_calibration(&mut self, requested: bool) {
        let pipeline = self.pipeline.clone();
        let store = self.store.clone();
        let timeout = self.options.lock_timeout;
        self.tasks.spawn_blocking(move || TaskOutcome::Calibration {
            requested,
            result: with_pipeline(&pipeline, timeout, |pipeline| calibrate(pipeline, &store)),
        });
    }

    fn spawn_snapshot(&mut self) {
        let pipeline = self.pipeline.clone();
        let baseline = self.store.read();
        let dir = self.options.snapshot_dir.clone();
        let timeout = self.options.lock_timeout;
        self.tasks.spawn_blocking(move || {
            TaskOutcome::Snapshot(with_pipeline(&pipeline, timeout, |pipeline| {
                pipeline.snapshot(&dir, &baseline)
            }))
        });
    }

    fn spawn_alert(&mut self) {
        self.emit(MonitorEvent::AlertFired);
        let alerter = self.alerter.clone();
        self.tasks
            .spawn(async move { TaskOutcome::Alert(alerter.play().await) });
    }

    fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("no event listener");
        }
    }
}

/// First tick one full period from now, late ticks are pushed back instead of bunched up
fn schedule(interval: CheckInterval) -> Interval {
    let period = interval.as_duration();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn with_pipeline<T>(
    pipeline: &Mutex<Pipeline>,
    timeout: Duration,
    run: impl FnOnce(&mut Pipeline) -> PipelineResult<T>,
) -> PipelineResult<T> {
    let mut guard = pipeline
        .try_lock_for(timeout)
        .ok_or(PipelineError::Busy(timeout))?;
    run(&mut guard)
}
