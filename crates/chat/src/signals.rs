//! Signal handling for graceful server shutdown.
//!
//! The first SIGINT/SIGTERM (Ctrl+C on Windows) flips the shared
//! [`ShutdownState`]; the application then waits on [`shutdown_signal`]
//! again so that a repeated signal exits immediately.

use chat_server::ShutdownState;
use tokio::signal;
use tracing::info;

/// Resolves on the next termination signal.
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}

/// Waits for a termination signal, then initiates shutdown on `state`.
///
/// # Example
///
/// ```rust,no_run
/// use chat_server::ShutdownState;
/// use lib_chat::signals::setup_signal_handlers;
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let shutdown_state = ShutdownState::new();
///     setup_signal_handlers(&shutdown_state).await?;
///     assert!(shutdown_state.is_shutdown_initiated());
///     Ok(())
/// }
/// ```
pub async fn setup_signal_handlers(state: &ShutdownState) -> std::io::Result<()> {
    shutdown_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    state.initiate_shutdown();
    Ok(())
}
