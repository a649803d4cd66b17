use tokio::sync::watch;
use tracing::{error, info};

/// Turns operator interrupts (Ctrl-C, and SIGTERM on Unix) into a shutdown
/// flag the scheduler polls between ticks and between monitors.
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
    _task: tokio::task::JoinHandle<()>,
}

impl ShutdownListener {
    pub fn spawn() -> Self {
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            match interrupted().await {
                Ok(signal) => {
                    info!(signal, "interrupt received, shutting down");
                    let _ = tx.send(true);
                }
                Err(err) => {
                    error!(%err, "failed to listen for interrupts");
                    // Keep the sender alive so the scheduler keeps running.
                    std::future::pending::<()>().await;
                }
            }
        });

        Self { rx, _task: task }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

#[cfg(unix)]
async fn interrupted() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|()| "SIGINT"),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn interrupted() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
