// Server module entry point
// Listener creation, connection handling, accept loop and signals

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the file is mounted as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_reusable_listener;
pub use server_loop::{drain_connections, start_server_loop};
pub use signal::start_signal_handler;
