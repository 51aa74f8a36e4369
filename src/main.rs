use clap::Parser;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

mod archiver;
mod config;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = config::Args::parse();
    let cfg = config::Config::load_from(&args.config)?;

    if args.validate {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    logger::init(&cfg)?;

    // Worker thread count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let state = Arc::new(config::AppState::new(&cfg));
    let active_connections = Arc::new(AtomicUsize::new(0));

    if !state.archiver.is_available() {
        logger::log_warning(&format!(
            "Archiver '{}' not found; archive requests will fail until it is installed",
            state.archiver.program().display()
        ));
    }

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    logger::log_server_start(&addr, &cfg, &state.archiver.program().display().to_string());

    server::start_server_loop(listener, state, Arc::clone(&active_connections), shutdown).await;

    let remaining = server::drain_connections(
        &active_connections,
        Duration::from_secs(cfg.performance.shutdown_timeout),
    )
    .await;
    logger::log_info(&format!(
        "Server stopped ({remaining} connection(s) dropped at exit)"
    ));

    Ok(())
}
