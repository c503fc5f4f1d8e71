use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::task::LocalSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

use puritan_router::{
    dispatch, dispatch_sync, init_router, with_router, Event, HandlerKind, Registrar, Router,
    RouterConfig, TokioScheduler, FLUSH_RENDER, YIELD,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = RouterConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_directive.parse()?))
        .init();

    info!("Puritan router demo starting...");
    config.log_summary();

    LocalSet::new().run_until(run(config)).await
}

async fn run(config: RouterConfig) -> Result<()> {
    let (scheduler, _pump) = TokioScheduler::spawn(config.tick_interval);
    let registrar = Rc::new(Registrar::new());
    let done = Rc::new(Notify::new());

    registrar.register(HandlerKind::Event, "init", |_: &Event| -> Result<()> {
        info!("Initializing demo state");
        Ok(())
    });
    registrar.register(HandlerKind::Event, "greet", |event: &Event| -> Result<()> {
        let name = event.args().first().and_then(|v| v.as_str()).unwrap_or("world");
        info!(name, "Hello");
        // Handlers may dispatch follow-up events; they join the tail of the queue.
        dispatch(Event::new("render").with_meta(FLUSH_RENDER))?;
        Ok(())
    });
    registrar.register(HandlerKind::Event, "render", |_: &Event| -> Result<()> {
        info!("Rendered after flush");
        dispatch(Event::new("shutdown"))?;
        Ok(())
    });
    registrar.register(HandlerKind::Event, "tick", |event: &Event| -> Result<()> {
        info!(args = ?event.args(), "Yielded tick handled");
        Ok(())
    });
    let finished = Rc::clone(&done);
    registrar.register(HandlerKind::Event, "shutdown", move |_: &Event| -> Result<()> {
        finished.notify_one();
        Ok(())
    });

    init_router(Router::new(registrar.clone(), Rc::new(scheduler)))?;
    with_router(|router| {
        router.add_post_event_callback("trace", |event: &Event| {
            info!(event = %event, "Event handled");
        })
    })?;

    dispatch_sync(Event::new("init"))?;
    dispatch(Event::new("greet").with_arg("puritan"))?;
    dispatch(Event::new("tick").with_arg(1).with_meta(YIELD))?;

    tokio::time::timeout(Duration::from_secs(10), done.notified())
        .await
        .map_err(|_| anyhow::anyhow!("router did not drain within 10s"))?;

    let state = with_router(|router| router.queue().state())?;
    info!(%state, "Puritan router demo finished");
    Ok(())
}
