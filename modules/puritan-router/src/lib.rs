//! Single-threaded event router.
//!
//! Events are dispatched into a FIFO queue driven by a small finite state
//! machine: add-event → scheduled → running → idle. A drain may pause in
//! front of an event whose metadata names a later-function, and a handler
//! failure purges the queue and surfaces the error to whoever ran the tick.
//!
//! Consumers supply an `EventHandler` (usually a `Registrar`) and a
//! `Scheduler` (`ManualScheduler` for tests and custom loops,
//! `TokioScheduler` inside a tokio `LocalSet`).

pub mod config;
pub mod error;
pub mod event;
pub mod fsm;
pub mod global;
pub mod handler;
pub mod later;
pub mod queue;
pub mod registrar;
pub mod router;
pub mod scheduler;

pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use event::Event;
pub use fsm::FsmState;
pub use global::{dispatch, dispatch_sync, init_router, with_router};
pub use handler::EventHandler;
pub use later::{later_fn_for, LaterFn, Resume, FLUSH_RENDER, YIELD};
pub use queue::EventQueue;
pub use registrar::{HandlerKind, Registrar};
pub use router::Router;
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
