use std::sync::Arc;

use tokio::sync::Notify;
use tracing::debug;

/// Make a [`Notify`] that is fulfilled when the process receives an
/// interrupt or terminate signal, so the server can run its graceful
/// shutdown sequence.
pub fn notify_on_shutdown_signal() -> Arc<Notify> {
    let notify = Arc::new(Notify::new());

    tokio::spawn({
        let notify = Arc::clone(&notify);
        async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::SignalKind;
                use tokio::signal::unix::signal;
                let mut terminate = match signal(SignalKind::terminate()) {
                    Ok(terminate) => terminate,
                    Err(e) => {
                        debug!("could not install SIGTERM handler: {e}");
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                tokio::signal::ctrl_c().await.ok();
            }
            debug!("shutdown signal received");
            notify.notify_waiters();
        }
    });

    notify
}
