use tokio::signal::unix::{signal, SignalKind};

/// Resolves on SIGTERM or SIGINT.
pub async fn shutdown_signal() {
    let (mut sig_term, mut sig_int) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(err), _) | (_, Err(err)) => {
                log::error!("Can't install signal handlers: {err}");
                return futures::future::pending().await;
            }
        };

    tokio::select! {
        _ = sig_term.recv() => {
            log::warn!("received SIGTERM");
        }
        _ = sig_int.recv() => {
            log::warn!("received SIGINT");
        }
    };
}
