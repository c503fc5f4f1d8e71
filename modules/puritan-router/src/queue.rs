//! The event queue and its run loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::error::{RouterError, RouterResult};
use crate::event::Event;
use crate::fsm::{transition, Action, FsmState, Trigger};
use crate::handler::EventHandler;
use crate::later::{later_fn_for, Resume};
use crate::scheduler::Scheduler;

/// Hook invoked after every successfully handled event.
pub type PostEventCallback = Rc<dyn Fn(&Event)>;

/// FSM-driven queue of pending events.
///
/// Push → schedule → drain one event at a time until empty or paused.
/// Cloning yields another handle to the same queue. All state lives behind
/// `Cell`/`RefCell` and no borrow is held while a handler, callback or
/// later-function runs, so those may push or purge reentrantly.
#[derive(Clone)]
pub struct EventQueue {
    inner: Rc<QueueInner>,
}

pub(crate) struct QueueInner {
    state: Cell<FsmState>,
    queue: RefCell<VecDeque<Event>>,
    callbacks: RefCell<Vec<(String, PostEventCallback)>>,
    handler: Rc<dyn EventHandler>,
    scheduler: Rc<dyn Scheduler>,
    handling: Cell<bool>,
    /// Bumped on every purge. A resume only skips the pause check when no
    /// purge happened since the pause, i.e. the head is still the paused event.
    generation: Cell<u64>,
    paused_at: Cell<u64>,
}

impl EventQueue {
    pub fn new(handler: Rc<dyn EventHandler>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(QueueInner {
                state: Cell::new(FsmState::Idle),
                queue: RefCell::new(VecDeque::new()),
                callbacks: RefCell::new(Vec::new()),
                handler,
                scheduler,
                handling: Cell::new(false),
                generation: Cell::new(0),
                paused_at: Cell::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<QueueInner>) -> Self {
        Self { inner }
    }

    pub fn state(&self) -> FsmState {
        self.inner.state.get()
    }

    pub fn len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Tags of the queued events, head first.
    pub fn pending_tags(&self) -> Vec<String> {
        self.inner
            .queue
            .borrow()
            .iter()
            .map(|e| e.tag().to_string())
            .collect()
    }

    /// Enqueue an event. Handling happens later, in FIFO order.
    pub fn push(&self, event: Event) -> RouterResult<()> {
        event.validate()?;
        self.fire(Trigger::AddEvent(event))
    }

    /// Drop every queued event. A drain that is already scheduled still
    /// fires and finds the queue empty.
    pub fn purge(&self) {
        let dropped = {
            let mut queue = self.inner.queue.borrow_mut();
            let n = queue.len();
            queue.clear();
            n
        };
        self.inner.generation.set(self.inner.generation.get().wrapping_add(1));
        if dropped > 0 {
            debug!(dropped, "purged event queue");
        }
    }

    /// Register a post-event callback. Callbacks run in registration order;
    /// re-registering an id replaces the callback in place.
    pub fn add_post_event_callback(&self, id: impl Into<String>, callback: impl Fn(&Event) + 'static) {
        let id = id.into();
        let callback: PostEventCallback = Rc::new(callback);
        let mut callbacks = self.inner.callbacks.borrow_mut();
        match callbacks.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => {
                warn!(id = %id, "overwriting existing post event callback");
                slot.1 = callback;
            }
            None => callbacks.push((id, callback)),
        }
    }

    pub fn remove_post_event_callback(&self, id: &str) {
        let mut callbacks = self.inner.callbacks.borrow_mut();
        match callbacks.iter().position(|(existing, _)| existing == id) {
            Some(index) => {
                callbacks.remove(index);
            }
            None => warn!(id, "could not remove post event callback, id not found"),
        }
    }

    pub fn post_event_callback_count(&self) -> usize {
        self.inner.callbacks.borrow().len()
    }

    pub fn call_post_event_callbacks(&self, event: &Event) {
        let callbacks: Vec<PostEventCallback> = self
            .inner
            .callbacks
            .borrow()
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        self.guarded(|| {
            for callback in callbacks {
                callback(event);
            }
        });
    }

    /// True while a handler or a post-event callback is running.
    pub fn is_handling(&self) -> bool {
        self.inner.handling.get()
    }

    fn guarded<T>(&self, f: impl FnOnce() -> T) -> T {
        let outer = self.inner.handling.replace(true);
        let result = f();
        self.inner.handling.set(outer);
        result
    }

    pub(crate) fn handle(&self, event: &Event) -> RouterResult<()> {
        let result = self.guarded(|| self.inner.handler.handle(event));
        result.map_err(|source| RouterError::Handler {
            tag: event.tag().to_string(),
            source,
        })
    }

    /// Feed a trigger to the FSM: commit the next state, then run its action.
    pub(crate) fn fire(&self, trigger: Trigger) -> RouterResult<()> {
        let from = self.state();
        let name = trigger.name();
        let (to, action) = match transition(from, trigger) {
            Ok(next) => next,
            Err(e) => {
                error!(state = %from, trigger = name, "router state transition not found");
                return Err(e);
            }
        };

        self.inner.state.set(to);
        debug!(%from, %to, trigger = name, "router transition");

        match action {
            Some(action) => self.apply(action),
            None => Ok(()),
        }
    }

    fn apply(&self, action: Action) -> RouterResult<()> {
        match action {
            Action::Append(event) => {
                self.inner.queue.borrow_mut().push_back(event);
                Ok(())
            }
            Action::AppendAndSchedule(event) => {
                self.inner.queue.borrow_mut().push_back(event);
                self.schedule_run();
                Ok(())
            }
            Action::Schedule => {
                self.schedule_run();
                Ok(())
            }
            Action::Drain => self.run_queue(),
            Action::ResumeDrain => {
                if self.inner.generation.get() == self.inner.paused_at.get() {
                    self.process_first_event()?;
                } else {
                    debug!("queue purged while paused, re-checking head");
                }
                self.run_queue()
            }
            Action::Pause(later) => {
                let tag = self
                    .inner
                    .queue
                    .borrow()
                    .front()
                    .map(|e| e.tag().to_string())
                    .unwrap_or_default();
                debug!(event = %tag, later_fn = later.name(), "pausing event queue");
                self.inner.paused_at.set(self.inner.generation.get());
                let resume = Resume::new(Rc::downgrade(&self.inner), tag);
                later.invoke(&self.inner.scheduler, resume);
                Ok(())
            }
            Action::Purge => {
                self.purge();
                Ok(())
            }
        }
    }

    fn schedule_run(&self) {
        let queue = Rc::downgrade(&self.inner);
        self.inner.scheduler.schedule(Box::new(move || match queue.upgrade() {
            Some(inner) => EventQueue::from_inner(inner).fire(Trigger::RunQueue),
            None => Ok(()),
        }));
    }

    /// Drain until the queue is empty or the head event asks for a pause.
    ///
    /// The pause check happens before the head is popped, so after
    /// `resume` the same event is still first in line. Each pass re-reads
    /// the live queue; no cursor survives a pause.
    fn run_queue(&self) -> RouterResult<()> {
        loop {
            let head = self.inner.queue.borrow().front().map(later_fn_for);
            match head {
                None => break,
                Some(Some(later)) => return self.fire(Trigger::Pause(later)),
                Some(None) => self.process_first_event()?,
            }
        }

        let pending = self.len();
        self.fire(Trigger::FinishRun { pending })
    }

    fn process_first_event(&self) -> RouterResult<()> {
        let next = self.inner.queue.borrow_mut().pop_front();
        let Some(event) = next else {
            return Ok(());
        };

        match self.handle(&event) {
            Ok(()) => {
                self.call_post_event_callbacks(&event);
                Ok(())
            }
            Err(e) => {
                warn!(event = %event, error = %e, "handler failed, purging event queue");
                self.fire(Trigger::Exception)?;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn quiet_queue() -> (EventQueue, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let handler: Rc<dyn EventHandler> = Rc::new(|_: &Event| -> anyhow::Result<()> { Ok(()) });
        (EventQueue::new(handler, scheduler.clone()), scheduler)
    }

    #[test]
    fn resume_while_idle_is_a_protocol_error() {
        let (queue, _scheduler) = quiet_queue();

        let err = queue.fire(Trigger::Resume).unwrap_err();
        assert!(matches!(
            err,
            RouterError::Protocol { state: FsmState::Idle, trigger: "resume" }
        ));
        assert_eq!(queue.state(), FsmState::Idle);
    }

    #[test]
    fn run_queue_while_running_is_a_protocol_error() {
        let (queue, _scheduler) = quiet_queue();
        queue.inner.state.set(FsmState::Running);

        assert!(queue.fire(Trigger::RunQueue).is_err());
        assert_eq!(queue.state(), FsmState::Running);
    }

    #[test]
    fn push_schedules_exactly_one_drain() {
        let (queue, scheduler) = quiet_queue();

        queue.push(Event::new("a")).unwrap();
        queue.push(Event::new("b")).unwrap();

        assert_eq!(queue.state(), FsmState::Scheduled);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(queue.pending_tags(), vec!["a", "b"]);
    }

    #[test]
    fn duplicate_callback_id_replaces_in_place() {
        let (queue, _scheduler) = quiet_queue();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for (id, label) in [("first", "1"), ("second", "2"), ("first", "1b")] {
            let seen = Rc::clone(&seen);
            queue.add_post_event_callback(id, move |_: &Event| seen.borrow_mut().push(label));
        }
        assert_eq!(queue.post_event_callback_count(), 2);

        queue.call_post_event_callbacks(&Event::new("x"));
        assert_eq!(*seen.borrow(), vec!["1b", "2"]);
    }

    #[test]
    fn removing_unknown_callback_is_a_no_op() {
        let (queue, _scheduler) = quiet_queue();
        queue.add_post_event_callback("keep", |_: &Event| {});

        queue.remove_post_event_callback("missing");
        assert_eq!(queue.post_event_callback_count(), 1);

        queue.remove_post_event_callback("keep");
        assert_eq!(queue.post_event_callback_count(), 0);
    }
}
