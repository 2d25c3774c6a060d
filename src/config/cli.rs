use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the fontproxy binary.
#[derive(Debug, Parser)]
#[command(name = "fontproxy", version, about = "Caching reverse proxy for web fonts")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "FONTPROXY_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    /// Overrides given without a subcommand, e.g. `fontproxy --port 9000`.
    #[command(flatten)]
    pub serve: ServeOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the proxy HTTP service.
    Serve(Box<ServeArgs>),
    /// Resolve and validate configuration, print it, then exit.
    #[command(name = "check-config")]
    CheckConfig(Box<ServeArgs>),
}

impl Command {
    pub fn overrides(&self) -> &ServeOverrides {
        match self {
            Command::Serve(args) | Command::CheckConfig(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener address.
    #[arg(long = "addr", value_name = "HOST")]
    pub addr: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Public base URL written into rewritten stylesheets.
    #[arg(long = "domain", value_name = "URL")]
    pub domain: Option<String>,

    /// Serve HTTPS using the configured certificate and key.
    #[arg(
        long = "ssl",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub ssl: Option<bool>,

    /// Path to the PEM certificate chain used when TLS is enabled.
    #[arg(long = "cert", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub cert: Option<PathBuf>,

    /// Path to the PEM private key used when TLS is enabled.
    #[arg(long = "key", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub key: Option<PathBuf>,

    /// Override the font and stylesheet cache directory.
    #[arg(long = "cache", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub cache: Option<PathBuf>,

    /// Override the cache time-to-live.
    #[arg(long = "expire", value_name = "SECONDS")]
    pub expire: Option<u64>,

    /// Override the upstream stylesheet host.
    #[arg(long = "upstream-stylesheet-base", value_name = "URL")]
    pub upstream_stylesheet_base: Option<String>,

    /// Override the upstream font asset host.
    #[arg(long = "upstream-asset-base", value_name = "URL")]
    pub upstream_asset_base: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub upstream_timeout_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
