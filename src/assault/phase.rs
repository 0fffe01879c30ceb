use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Phase of a run, only ever advances forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    WarmingUp,
    Measuring,
    Stopped,
}

/// Timer sequencing `warmup -> measurement -> stop` of a run.
#[derive(Debug)]
pub struct PhaseController {
    warmup: Duration,
    duration: Duration,
    phase: watch::Sender<RunPhase>,
    cancel: CancellationToken,
}
impl PhaseController {
    pub fn new(warmup: Duration, duration: Duration) -> Self {
        let (phase, _) = watch::channel(RunPhase::WarmingUp);
        Self { warmup, duration, phase, cancel: CancellationToken::new() }
    }

    pub fn watch(&self) -> PhaseWatch {
        PhaseWatch { phase: self.phase.subscribe(), cancel: self.cancel.clone() }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        tokio::time::sleep(self.warmup).await;
        self.advance(RunPhase::Measuring);
        tracing::info!("Finished warming up");

        tokio::time::sleep(self.duration).await;
        self.advance(RunPhase::Stopped);
        self.cancel.cancel();
        tracing::info!("Finished measuring");
    }

    fn advance(&self, next: RunPhase) {
        self.phase.send_if_modified(|phase| {
            let forward = *phase < next;
            if forward {
                *phase = next;
            }
            forward
        });
    }
}

/// Read side of the [`PhaseController`] handed to every worker.
#[derive(Debug, Clone)]
pub struct PhaseWatch {
    phase: watch::Receiver<RunPhase>,
    cancel: CancellationToken,
}
impl PhaseWatch {
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }
    pub fn is_warming_up(&self) -> bool {
        self.phase() == RunPhase::WarmingUp
    }
    pub fn is_measuring(&self) -> bool {
        self.phase() == RunPhase::Measuring
    }
    pub fn is_stopped(&self) -> bool {
        self.phase() == RunPhase::Stopped
    }

    /// Resolves once the warmup has elapsed, immediately if it already has.
    pub async fn warmup_finished(&self) {
        let mut phase = self.phase.clone();
        // the sender is only dropped after the last transition, or when the timer is aborted
        let _ = phase.wait_for(|p| *p != RunPhase::WarmingUp).await;
    }

    /// Cancelled once when the run stops.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
