use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolves on SIGINT or SIGTERM (SIGINT only off unix), naming the signal.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        let mut sigterm = unix_signal(SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result.map(|()| "SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map(|()| "SIGINT")
    }
}

/// Cancels `token` when a termination signal arrives.
///
/// Failing to install the handlers is logged; the token is then only
/// cancelled by the service itself (end of input).
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = wait_for_signal() => match result {
                Ok(name) => {
                    info!("Received {}, flushing and shutting down", name);
                    token.cancel();
                }
                Err(e) => error!("Failed to listen for shutdown signals: {}", e),
            },
            () = token.cancelled() => {}
        }
    })
}
