use anyhow::Context;
use std::path::PathBuf;
use veil_core::config::load_config;
use veil_domain::config::AppConfig;
use veil_logger::{LevelFilter, Logger};
use veil_server::Server;

#[cfg(feature = "profiling")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[veil_runtime::main(server)]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "profiling")]
    let _profiler = dhat::Profiler::new_heap();

    let path = std::env::var_os("VEIL_CONFIG").map(PathBuf::from);
    let cfg: AppConfig = load_config(path).context("Critical: Configuration is malformed")?;

    let level: LevelFilter = cfg.logging.level.parse().context("Invalid logging.level")?;
    let logger = Logger::builder().name(env!("CARGO_PKG_NAME")).level(level);
    let _log = match &cfg.logging.dir {
        Some(dir) => logger.path(dir).json(cfg.logging.json).init()?,
        None => logger.init()?,
    };

    Server::builder().config(cfg).build().await?.run().await
}
