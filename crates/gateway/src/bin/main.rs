use base::{log_fatal, log_info, log_warn};
use clap::Parser;
use engine::NullEngine;
use gateway::config::{Config, load_global_hotwords};
use gateway::{DecodePool, Gateway, LaneContext};
use std::sync::Arc;

fn main() {
    let config = Config::parse();

    match &config.log_file {
        Some(path) => {
            if let Err(e) = base::init_file_logger(path) {
                eprintln!("failed to initialize file logger at {}: {e}", path.display());
                std::process::exit(1);
            }
        }
        None => base::init_stdout_logger(),
    }

    match base::Level::parse(&config.log_level) {
        Some(level) => base::set_min_level(level),
        None => eprintln!("unrecognized --log-level {:?}, defaulting to info", config.log_level),
    }

    // Two independent runtimes, not one runtime wearing two hats: sockets
    // and decode lanes must not be able to starve each other. io_threads
    // sizes the runtime that carries socket reads/writes; decode_lanes
    // sizes a second, dedicated runtime that the lanes are spawned onto, so
    // a lane blocked inside a synchronous engine call can only ever delay
    // other lanes, never a connection's I/O.
    let io_runtime = build_runtime(config.io_threads);
    let decode_runtime = build_runtime(config.decode_lanes.max(1));
    let decode_handle = decode_runtime.handle().clone();

    if let Err(e) = io_runtime.block_on(run(config, decode_handle)) {
        log_fatal!("fatal startup error: {e}");
    }
}

fn build_runtime(worker_threads: usize) -> tokio::runtime::Runtime {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }
    match builder.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(config: Config, decode_handle: tokio::runtime::Handle) -> Result<(), Box<dyn std::error::Error>> {
    let server_hotwords = Arc::new(load_global_hotwords(config.hotwords_file.as_ref())?);
    log_info!("loaded {} server-global hotwords", server_hotwords.len());

    // The concrete neural engine is out of scope for this gateway; it is
    // injected here and nowhere else, so swapping it for a real
    // implementation of `engine::AsrEngine` touches only this line.
    let engine: Arc<dyn engine::AsrEngine> = Arc::new(NullEngine::new());

    let ctx = LaneContext {
        engine,
        server_hotwords,
        fst_inc_wts: config.fst_inc_wts,
        global_beam: config.global_beam,
        lattice_beam: config.lattice_beam,
        am_scale: config.am_scale,
        max_samples_bytes: config.max_samples_bytes,
    };

    let pool = Arc::new(DecodePool::spawn(config.decode_lanes, ctx, &decode_handle));
    let gateway = Gateway::bind(config.bind, pool).await?;
    log_info!("gateway ready on {} with {} decode lanes", gateway.local_addr(), gateway.lane_count());

    if tokio::signal::ctrl_c().await.is_err() {
        log_warn!("failed to install ctrl-c handler; shutting down immediately");
    } else {
        log_info!("shutdown signal received, draining connections");
    }

    gateway.shutdown().await;
    Ok(())
}
