//! "Run later" primitives used to break synchronous call stacks.
//!
//! The queue only relies on the [`Scheduler`] contract: a scheduled task
//! runs later, and successive schedulings run in FIFO order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{RouterError, RouterResult};

/// Deferred unit of work. A failure is handed back to whoever runs the tick.
pub type Task = Box<dyn FnOnce() -> RouterResult<()>>;

pub trait Scheduler {
    fn schedule(&self, task: Task);
}

/// Deterministic FIFO scheduler driven by hand.
///
/// Nothing runs until the owner calls [`tick`](Self::tick) or
/// [`run_until_idle`](Self::run_until_idle), which makes queue behavior
/// reproducible in tests and in embedders with their own main loop.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: RefCell<VecDeque<Task>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run exactly one task. `None` when nothing is scheduled.
    pub fn tick(&self) -> Option<RouterResult<()>> {
        let task = self.tasks.borrow_mut().pop_front()?;
        Some(task())
    }

    /// Run tasks, including ones scheduled along the way, until none remain.
    /// Every failure is logged; the first one is returned.
    pub fn run_until_idle(&self) -> RouterResult<()> {
        let mut first_error: Option<RouterError> = None;
        while let Some(result) = self.tick() {
            if let Err(e) = result {
                error!(error = %e, "scheduled task failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

/// Scheduler backed by a tokio pump task on the current `LocalSet`.
///
/// Tasks travel over an unbounded channel, and the pump runs one per tick
/// in arrival order. A tick is a `sleep(tick)` or, for a zero interval, a
/// `yield_now`. Task failures are logged by the pump.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Task>,
}

impl TokioScheduler {
    /// Spawn the pump. Must be called from inside a `tokio::task::LocalSet`.
    /// The pump stops once the scheduler is dropped and its backlog is run.
    pub fn spawn(tick: Duration) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();

        let pump = tokio::task::spawn_local(async move {
            while let Some(task) = rx.recv().await {
                if tick.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(tick).await;
                }
                if let Err(e) = task() {
                    error!(error = %e, "scheduled task failed");
                }
            }
            debug!("scheduler pump stopped");
        });

        (Self { tx }, pump)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Task) {
        if self.tx.send(task).is_err() {
            warn!("scheduler pump has stopped, dropping task");
        }
    }
}
