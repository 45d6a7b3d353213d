use std::env;

use kubebuild_server::ServerBuilder;
use kubebuild_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (KUBEBUILD_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    kubebuild_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        preset = %cfg.preset(),
        "Configuration loaded"
    );

    kubebuild_server::observability::apply_logging_level(&cfg.logging.level);

    ServerBuilder::new().with_config(cfg).build().run().await
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: KUBEBUILD_CONFIG
/// 3. Default: kubebuild.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = env::var("KUBEBUILD_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
