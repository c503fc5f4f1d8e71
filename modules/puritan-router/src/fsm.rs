//! The router's finite state machine.
//!
//! Read each row of [`transition`] as
//! `[current-state trigger] -> [next-state action]`. The function is pure:
//! it never touches the queue. [`crate::queue::EventQueue`] commits the new
//! state and then executes the returned [`Action`].

use std::fmt;

use crate::error::{RouterError, RouterResult};
use crate::event::Event;
use crate::later::LaterFn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FsmState {
    /// Nothing queued, nothing scheduled.
    #[default]
    Idle,
    /// A `run-queue` trigger is scheduled to fire soon.
    Scheduled,
    /// Events are being handled one after another.
    Running,
    /// Metadata on the head event caused a temporary pause.
    Paused,
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FsmState::Idle => "idle",
            FsmState::Scheduled => "scheduled",
            FsmState::Running => "running",
            FsmState::Paused => "paused",
        })
    }
}

#[derive(Debug)]
pub enum Trigger {
    AddEvent(Event),
    RunQueue,
    Pause(LaterFn),
    Resume,
    Exception,
    /// Fired when the drain loop exits. `pending` is the live queue length
    /// at that moment.
    FinishRun { pending: usize },
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::AddEvent(_) => "add-event",
            Trigger::RunQueue => "run-queue",
            Trigger::Pause(_) => "pause",
            Trigger::Resume => "resume",
            Trigger::Exception => "exception",
            Trigger::FinishRun { .. } => "finish-run",
        }
    }
}

/// Side effect executed right after the new state is committed.
#[derive(Debug)]
pub enum Action {
    Append(Event),
    /// Append, then schedule a deferred `run-queue`.
    AppendAndSchedule(Event),
    /// Schedule a deferred `run-queue` for events still queued.
    Schedule,
    Drain,
    /// Handle the head event without re-checking its metadata, then drain.
    ResumeDrain,
    Pause(LaterFn),
    Purge,
}

pub fn transition(state: FsmState, trigger: Trigger) -> RouterResult<(FsmState, Option<Action>)> {
    use FsmState::*;

    let next = match (state, trigger) {
        (Idle, Trigger::AddEvent(event)) => (Scheduled, Some(Action::AppendAndSchedule(event))),

        (Scheduled, Trigger::AddEvent(event)) => (Scheduled, Some(Action::Append(event))),
        (Scheduled, Trigger::RunQueue) => (Running, Some(Action::Drain)),

        (Running, Trigger::AddEvent(event)) => (Running, Some(Action::Append(event))),
        (Running, Trigger::Pause(later)) => (Paused, Some(Action::Pause(later))),
        (Running, Trigger::Exception) => (Idle, Some(Action::Purge)),
        (Running, Trigger::FinishRun { pending: 0 }) => (Idle, None),
        (Running, Trigger::FinishRun { .. }) => (Scheduled, Some(Action::Schedule)),

        (Paused, Trigger::AddEvent(event)) => (Paused, Some(Action::Append(event))),
        (Paused, Trigger::Resume) => (Running, Some(Action::ResumeDrain)),

        (state, trigger) => {
            return Err(RouterError::Protocol {
                state,
                trigger: trigger.name(),
            })
        }
    };
    Ok(next)
}
