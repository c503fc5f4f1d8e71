//! Static access to the application's router.
//!
//! The router must be installed once at startup via `init_router()`; after
//! that any module (handlers included) can `dispatch()` without holding a
//! handle. The router is single-threaded (`!Send`), so "global" means
//! global to the event-loop thread that installed it.

use std::cell::OnceCell;

use crate::error::{RouterError, RouterResult};
use crate::event::Event;
use crate::router::Router;

thread_local! {
    static ROUTER: OnceCell<Router> = const { OnceCell::new() };
}

/// Install the router for this thread. Fails if one is already installed.
pub fn init_router(router: Router) -> RouterResult<()> {
    ROUTER.with(|cell| cell.set(router).map_err(|_| RouterError::AlreadyInitialized))
}

pub fn with_router<T>(f: impl FnOnce(&Router) -> T) -> RouterResult<T> {
    ROUTER.with(|cell| cell.get().map(f).ok_or(RouterError::NotInitialized))
}

/// Queue an event on the installed router.
pub fn dispatch(event: Event) -> RouterResult<()> {
    with_router(|router| router.dispatch(event))?
}

/// Handle an event synchronously on the installed router.
pub fn dispatch_sync(event: Event) -> RouterResult<()> {
    with_router(|router| router.dispatch_sync(event))?
}

#[cfg(test)]
mod tests {
    // Each #[test] runs on its own thread, so every test sees a fresh
    // thread-local router.
    use super::*;
    use crate::scheduler::ManualScheduler;
    use std::rc::Rc;

    fn router() -> Router {
        Router::new(
            Rc::new(|_: &Event| -> anyhow::Result<()> { Ok(()) }),
            Rc::new(ManualScheduler::new()),
        )
    }

    #[test]
    fn dispatch_before_init_fails() {
        assert!(matches!(
            dispatch(Event::new("a")),
            Err(RouterError::NotInitialized)
        ));
        assert!(matches!(
            dispatch_sync(Event::new("a")),
            Err(RouterError::NotInitialized)
        ));
    }

    #[test]
    fn second_init_is_rejected() {
        init_router(router()).unwrap();
        assert!(matches!(
            init_router(router()),
            Err(RouterError::AlreadyInitialized)
        ));
    }

    #[test]
    fn dispatch_reaches_installed_router() {
        init_router(router()).unwrap();
        dispatch(Event::new("a")).unwrap();
        assert_eq!(with_router(|r| r.queue().len()).unwrap(), 1);
    }
}
