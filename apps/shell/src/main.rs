//! `veil`: interactive shell and key tooling for the encryption proxy.

mod command;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use veil_core::bootstrap;
use veil_core::config::load_config;
use veil_crypto::PaillierKey;
use veil_domain::config::AppConfig;
use veil_logger::{ConsoleTarget, LevelFilter, Logger};

#[derive(Debug, Parser)]
#[command(name = "veil", version, about = "Encrypting shell for Redis")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run the interactive shell (default)
    Repl,
    /// Print a fresh serialized Paillier key for `keys.homomorphic_key`
    Keygen {
        /// Modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: u64,
    },
}

#[veil_runtime::main(cli)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Mode::Repl) {
        Mode::Keygen { bits } => {
            let key = PaillierKey::generate(bits).context("Key generation failed")?;
            writeln!(std::io::stdout(), "{}", key.to_key_string()?)?;
            Ok(())
        },
        Mode::Repl => {
            let cfg: AppConfig =
                load_config(cli.config).context("Critical: Configuration is malformed")?;

            // Replies go to stdout, so logs go to stderr.
            let level: LevelFilter = cfg.logging.level.parse().context("Invalid logging.level")?;
            let logger =
                Logger::builder().name(env!("CARGO_PKG_NAME")).console(ConsoleTarget::Stderr).level(level);
            let _log = match &cfg.logging.dir {
                Some(dir) => logger.path(dir).json(cfg.logging.json).init()?,
                None => logger.init()?,
            };

            let store = bootstrap::secure_store(&cfg).await?;
            info!(scheme = ?store.scheme(), "Shell ready");
            repl::run(&store).await
        },
    }
}
