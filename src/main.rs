use std::sync::Arc;

use handler_dispatch::config::Config;
use handler_dispatch::handlers::{self, Catalog};
use handler_dispatch::logger::{self, ServerLog};
use handler_dispatch::routing::Router;
use handler_dispatch::server::{self, create_reusable_listener, ServerState};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    logger::init(&cfg)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let mut router = Router::new(Arc::new(ServerLog));
    handlers::register(&mut router, &Arc::new(Catalog::default()))?;

    logger::log_server_start(&addr, &cfg, &router.paths());

    let state = Arc::new(ServerState {
        config: cfg,
        router,
    });
    server::run(listener, state).await?;
    Ok(())
}
