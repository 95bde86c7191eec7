//! TallyKV Server Binary
//!
//! Loads the config, sets up logging, opens the store and serves RESP
//! until a client sends `Shutdown`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tallykv::config::{Config, LogFlags, DEFAULT_CONFIG_FILE};
use tallykv::network::Server;
use tallykv::Store;
use tracing_subscriber::{fmt, EnvFilter};

/// TallyKV Server
#[derive(Parser, Debug)]
#[command(name = "tallykv-server")]
#[command(about = "Persistent RESP key-value store with constrained counters")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Listen address (host:port), overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Data directory, overrides the config file
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            // Logging isn't configured yet
            eprintln!("tallykv-server: {}", e);
            std::process::exit(1);
        }
    };

    // Flags were checked by validate()
    init_logging(&config, config.log_flags().unwrap_or(LogFlags::DEFAULT));

    tracing::info!("TallyKV Server v{}", tallykv::VERSION);
    tracing::info!(engine = ?config.engine, data_dir = %config.data_dir.display(), "opening store");

    if let Err(e) = run(config) {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }

    tracing::info!("bye");
}

fn run(config: Config) -> tallykv::Result<()> {
    let store = Arc::new(Store::open(config.clone())?);
    store.start()?;

    let server = Server::bind(config, store.clone())?;
    let result = server.run();

    // Covers the error path; a no-op after Shutdown
    store.stop()?;
    result
}

/// Config file (or defaults when the default file is missing) plus flag overrides
fn load_config(args: &Args) -> tallykv::Result<Config> {
    let mut config = if args.config.exists() {
        Config::from_file(&args.config)?
    } else if args.config.as_os_str() == DEFAULT_CONFIG_FILE {
        Config::default()
    } else {
        return Err(tallykv::TallyError::Config(format!(
            "config file '{}' not found",
            args.config.display()
        )));
    };

    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config, flags: LogFlags) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let builder = fmt().with_env_filter(filter).with_target(flags.target);
    if flags.timestamps {
        builder.init();
    } else {
        builder.without_time().init();
    }
}
