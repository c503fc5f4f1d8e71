//! Public dispatch surface over one [`EventQueue`].

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::error::{RouterError, RouterResult};
use crate::event::Event;
use crate::handler::EventHandler;
use crate::queue::EventQueue;
use crate::scheduler::Scheduler;

#[derive(Clone)]
pub struct Router {
    queue: EventQueue,
}

impl Router {
    pub fn new(handler: Rc<dyn EventHandler>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            queue: EventQueue::new(handler, scheduler),
        }
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Queue `event` for asynchronous handling.
    ///
    /// Invalid events are rejected before the queue is touched. Handling
    /// happens on a later scheduler tick, in FIFO order with every other
    /// dispatched event.
    pub fn dispatch(&self, event: Event) -> RouterResult<()> {
        self.queue.push(event)
    }

    /// Parse the vector or object form of an event, then [`dispatch`](Self::dispatch) it.
    pub fn dispatch_value(&self, value: Value) -> RouterResult<()> {
        self.dispatch(Event::from_value(value)?)
    }

    /// Handle `event` immediately, bypassing the queue, then run the
    /// post-event callbacks.
    ///
    /// Meant for initialization and latency-sensitive paths. Calling it
    /// from inside a handler or a post-event callback would run a handler
    /// out of order with the queue, so that returns
    /// [`RouterError::ReentrantSyncDispatch`].
    /// A handler failure is returned as-is and leaves the queue alone.
    pub fn dispatch_sync(&self, event: Event) -> RouterResult<()> {
        event.validate()?;
        if self.queue.is_handling() {
            return Err(RouterError::ReentrantSyncDispatch {
                tag: event.tag().to_string(),
            });
        }

        debug!(event = %event, "dispatch_sync");
        self.queue.handle(&event)?;
        self.queue.call_post_event_callbacks(&event);
        Ok(())
    }

    pub fn purge(&self) {
        self.queue.purge()
    }

    pub fn add_post_event_callback(&self, id: impl Into<String>, callback: impl Fn(&Event) + 'static) {
        self.queue.add_post_event_callback(id, callback)
    }

    pub fn remove_post_event_callback(&self, id: &str) {
        self.queue.remove_post_event_callback(id)
    }
}
