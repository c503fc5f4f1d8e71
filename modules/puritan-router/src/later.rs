//! Later-functions: deferral strategies selected by event metadata.
//!
//! When the head of the queue carries one of these metadata tags the queue
//! pauses before handling it and hands a [`Resume`] token to the matching
//! later-function. The later-function decides how long to wait.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::warn;

use crate::error::RouterResult;
use crate::event::Event;
use crate::fsm::Trigger;
use crate::queue::{EventQueue, QueueInner};
use crate::scheduler::Scheduler;

/// Defers across two scheduler ticks so a render pass can complete.
pub const FLUSH_RENDER: &str = "flush-render";

/// Defers one scheduler tick.
pub const YIELD: &str = "yield";

#[derive(Clone, Copy)]
pub struct LaterFn {
    name: &'static str,
    defer: fn(&Rc<dyn Scheduler>, Resume),
}

impl LaterFn {
    /// The metadata tag this later-function is registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn invoke(&self, scheduler: &Rc<dyn Scheduler>, resume: Resume) {
        (self.defer)(scheduler, resume)
    }
}

impl fmt::Debug for LaterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LaterFn").field(&self.name).finish()
    }
}

static LATER_FNS: [LaterFn; 2] = [
    LaterFn {
        name: FLUSH_RENDER,
        defer: flush_render,
    },
    LaterFn {
        name: YIELD,
        defer: yield_tick,
    },
];

/// The process-wide later-function table, in lookup order.
pub fn later_fns() -> &'static [LaterFn] {
    &LATER_FNS
}

/// First later-function (in table order) whose tag appears in the event's
/// metadata.
pub fn later_fn_for(event: &Event) -> Option<LaterFn> {
    LATER_FNS.iter().find(|f| event.has_meta(f.name)).copied()
}

fn flush_render(scheduler: &Rc<dyn Scheduler>, resume: Resume) {
    let next = Rc::downgrade(scheduler);
    scheduler.schedule(Box::new(move || {
        if let Some(next) = next.upgrade() {
            next.schedule(Box::new(move || resume.resume()));
        }
        Ok(())
    }));
}

fn yield_tick(scheduler: &Rc<dyn Scheduler>, resume: Resume) {
    scheduler.schedule(Box::new(move || resume.resume()));
}

/// One-shot token that resumes a paused queue.
///
/// `resume` consumes the token, so a later-function cannot resume twice.
/// Dropping it unused leaves the queue paused; that is logged.
pub struct Resume {
    queue: Weak<QueueInner>,
    tag: String,
    resumed: bool,
}

impl Resume {
    pub(crate) fn new(queue: Weak<QueueInner>, tag: String) -> Self {
        Self {
            queue,
            tag,
            resumed: false,
        }
    }

    /// Tag of the event the queue paused in front of.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn resume(mut self) -> RouterResult<()> {
        self.resumed = true;
        match self.queue.upgrade() {
            Some(inner) => EventQueue::from_inner(inner).fire(Trigger::Resume),
            None => Ok(()),
        }
    }
}

impl Drop for Resume {
    fn drop(&mut self) {
        if !self.resumed && self.queue.strong_count() > 0 {
            warn!(event = %self.tag, "resume token dropped, queue stays paused");
        }
    }
}
