//! Central registry of handlers, keyed first by kind and then by id.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use tracing::{error, warn};

use crate::event::Event;
use crate::handler::EventHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Event,
    Fx,
    Cofx,
    Sub,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlerKind::Event => "event",
            HandlerKind::Fx => "fx",
            HandlerKind::Cofx => "cofx",
            HandlerKind::Sub => "sub",
        })
    }
}

/// Handler lookup table.
///
/// Interior mutability lets handlers be registered after the registrar has
/// been handed to a [`crate::Router`] (keep an `Rc<Registrar>` clone).
#[derive(Default)]
pub struct Registrar {
    handlers: RefCell<HashMap<(HandlerKind, String), Rc<dyn EventHandler>>>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `(kind, id)`, replacing any previous one.
    pub fn register(
        &self,
        kind: HandlerKind,
        id: impl Into<String>,
        handler: impl EventHandler + 'static,
    ) {
        let id = id.into();
        let previous = self
            .handlers
            .borrow_mut()
            .insert((kind, id.clone()), Rc::new(handler));
        if previous.is_some() {
            warn!(%kind, id = %id, "overwriting handler");
        }
    }

    pub fn get(&self, kind: HandlerKind, id: &str) -> Option<Rc<dyn EventHandler>> {
        self.handlers
            .borrow()
            .get(&(kind, id.to_string()))
            .map(Rc::clone)
    }

    /// Like [`get`](Self::get), but logs when nothing is registered.
    pub fn get_required(&self, kind: HandlerKind, id: &str) -> Option<Rc<dyn EventHandler>> {
        let handler = self.get(kind, id);
        if handler.is_none() {
            error!("no {kind} handler registered for: {id}");
        }
        handler
    }

    pub fn contains(&self, kind: HandlerKind, id: &str) -> bool {
        self.handlers.borrow().contains_key(&(kind, id.to_string()))
    }

    pub fn clear(&self, kind: HandlerKind, id: &str) {
        if self.handlers.borrow_mut().remove(&(kind, id.to_string())).is_none() {
            warn!(%kind, id, "can't clear handler, none registered");
        }
    }

    pub fn clear_kind(&self, kind: HandlerKind) {
        self.handlers.borrow_mut().retain(|(k, _), _| *k != kind);
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }
}

impl EventHandler for Registrar {
    /// Resolve the `event` handler for the event's tag and run it.
    /// An unregistered tag is logged and otherwise ignored.
    fn handle(&self, event: &Event) -> Result<()> {
        match self.get_required(HandlerKind::Event, event.tag()) {
            Some(handler) => handler.handle(event),
            None => Ok(()),
        }
    }
}
