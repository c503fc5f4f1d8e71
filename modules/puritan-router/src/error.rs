//! Typed errors for the event router.

use thiserror::Error;

use crate::fsm::FsmState;

/// Errors surfaced by the event queue and the dispatch entry points.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Empty, null or malformed event handed to `dispatch`/`dispatch_sync`
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The FSM was driven with a trigger its table has no row for
    #[error("router state transition not found: {trigger} while {state}")]
    Protocol {
        state: FsmState,
        trigger: &'static str,
    },

    /// A handler failed while processing an event
    #[error("handler for {tag} failed")]
    Handler {
        tag: String,
        #[source]
        source: anyhow::Error,
    },

    /// `dispatch_sync` was called from inside a running handler
    #[error("dispatch_sync({tag}) called from inside an event handler")]
    ReentrantSyncDispatch { tag: String },

    #[error("router not initialized - call init_router() first")]
    NotInitialized,

    #[error("router already initialized")]
    AlreadyInitialized,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for router operations.
pub type RouterResult<T> = std::result::Result<T, RouterError>;
