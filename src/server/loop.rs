// Server loop module
// Accepts connections until shutdown, then waits for in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Interval between active-connection checks while draining
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the accept loop until `shutdown` is notified.
///
/// The listener is closed on return; accepted connections keep running on
/// their own tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_info("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
}

/// Wait until no connections are active or `grace` has elapsed.
///
/// Returns the number of connections still open.
pub async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let active = active_connections.load(Ordering::SeqCst);
        if active == 0 {
            return 0;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period of {}s elapsed with {active} connection(s) still open",
                grace.as_secs()
            ));
            return active;
        }
        logger::log_debug(&format!("Waiting for {active} connection(s) to finish"));
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
