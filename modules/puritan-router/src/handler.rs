//! Core traits for the event router.

use anyhow::Result;

use crate::event::Event;

/// Resolves and runs the handler for an event.
///
/// The queue calls this for every event it drains, and `dispatch_sync`
/// calls it directly. May fail; during a drain a failure purges the queue.
/// Implemented by [`crate::Registrar`] and by any
/// `Fn(&Event) -> anyhow::Result<()>` closure.
pub trait EventHandler {
    fn handle(&self, event: &Event) -> Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> Result<()>,
{
    fn handle(&self, event: &Event) -> Result<()> {
        self(event)
    }
}
