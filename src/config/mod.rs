//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{CliArgs, Command, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fontproxy";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8090;
const DEFAULT_CACHE_DIR: &str = "./";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600 * 24 * 30;
const DEFAULT_UPSTREAM_STYLESHEET_BASE: &str = "https://fonts.googleapis.com";
const DEFAULT_UPSTREAM_ASSET_BASE: &str = "https://fonts.gstatic.com";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/55.0.2883.87 Safari/537.36";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub tls: Option<TlsSettings>,
    pub cache: CacheSettings,
    pub upstream: UpstreamSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen_addr: SocketAddr,
    /// Base URL clients use to reach this proxy; substituted into stylesheets.
    pub public_base_url: String,
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub directory: PathBuf,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub stylesheet_base: String,
    pub asset_base: String,
    pub timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FONTPROXY").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    tls: RawTlsSettings,
    cache: RawCacheSettings,
    upstream: RawUpstreamSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    /// Top-level flags first, then those given after the subcommand.
    fn apply_cli(&mut self, cli: &CliArgs) {
        self.apply_serve_overrides(&cli.serve);
        if let Some(command) = cli.command.as_ref() {
            self.apply_serve_overrides(command.overrides());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.addr.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(domain) = overrides.domain.as_ref() {
            self.server.public_base_url = Some(domain.clone());
        }
        if let Some(enabled) = overrides.ssl {
            self.tls.enabled = Some(enabled);
        }
        if let Some(path) = overrides.cert.as_ref() {
            self.tls.cert_path = Some(path.clone());
        }
        if let Some(path) = overrides.key.as_ref() {
            self.tls.key_path = Some(path.clone());
        }
        if let Some(directory) = overrides.cache.as_ref() {
            self.cache.directory = Some(directory.clone());
        }
        if let Some(seconds) = overrides.expire {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(base) = overrides.upstream_stylesheet_base.as_ref() {
            self.upstream.stylesheet_base = Some(base.clone());
        }
        if let Some(base) = overrides.upstream_asset_base.as_ref() {
            self.upstream.asset_base = Some(base.clone());
        }
        if let Some(seconds) = overrides.upstream_timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            tls,
            cache,
            upstream,
            logging,
        } = raw;

        let tls = build_tls_settings(tls)?;
        let server = build_server_settings(server, tls.is_some())?;
        let cache = build_cache_settings(cache)?;
        let upstream = build_upstream_settings(upstream)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            server,
            tls,
            cache,
            upstream,
            logging,
        })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "server.listen_addr = {}", self.server.listen_addr)?;
        writeln!(f, "server.public_base_url = {}", self.server.public_base_url)?;
        match &self.tls {
            Some(tls) => {
                writeln!(f, "tls.enabled = true")?;
                writeln!(f, "tls.cert_path = {}", tls.cert_path.display())?;
                writeln!(f, "tls.key_path = {}", tls.key_path.display())?;
            }
            None => writeln!(f, "tls.enabled = false")?,
        }
        writeln!(f, "cache.directory = {}", self.cache.directory.display())?;
        writeln!(f, "cache.ttl_seconds = {}", self.cache.ttl.as_secs())?;
        writeln!(f, "upstream.stylesheet_base = {}", self.upstream.stylesheet_base)?;
        writeln!(f, "upstream.asset_base = {}", self.upstream.asset_base)?;
        writeln!(
            f,
            "upstream.timeout_seconds = {}",
            self.upstream.timeout.as_secs()
        )?;
        writeln!(f, "upstream.user_agent = {}", self.upstream.user_agent)?;
        writeln!(f, "logging.level = {}", self.logging.level)?;
        write!(
            f,
            "logging.json = {}",
            matches!(self.logging.format, LogFormat::Json)
        )
    }
}

fn build_server_settings(
    server: RawServerSettings,
    tls_enabled: bool,
) -> Result<ServerSettings, LoadError> {
    let host = non_empty(server.host).unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let listen_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.listen_addr", reason))?;

    let public_base_url = match non_empty(server.public_base_url) {
        Some(value) => normalize_base_url(&value)
            .map_err(|reason| LoadError::invalid("server.public_base_url", reason))?,
        None => derive_public_base_url(port, tls_enabled),
    };

    Ok(ServerSettings {
        listen_addr,
        public_base_url,
    })
}

fn build_tls_settings(tls: RawTlsSettings) -> Result<Option<TlsSettings>, LoadError> {
    if !tls.enabled.unwrap_or(false) {
        return Ok(None);
    }

    let cert_path = tls
        .cert_path
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| LoadError::invalid("tls.cert_path", "required when TLS is enabled"))?;
    let key_path = tls
        .key_path
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or_else(|| LoadError::invalid("tls.key_path", "required when TLS is enabled"))?;

    Ok(Some(TlsSettings {
        cert_path,
        key_path,
    }))
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let directory = cache
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.directory",
            "path must not be empty",
        ));
    }

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        directory,
        ttl: Duration::from_secs(ttl_seconds),
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let stylesheet_base = normalize_base_url(
        upstream
            .stylesheet_base
            .as_deref()
            .unwrap_or(DEFAULT_UPSTREAM_STYLESHEET_BASE),
    )
    .map_err(|reason| LoadError::invalid("upstream.stylesheet_base", reason))?;

    let asset_base = normalize_base_url(
        upstream
            .asset_base
            .as_deref()
            .unwrap_or(DEFAULT_UPSTREAM_ASSET_BASE),
    )
    .map_err(|reason| LoadError::invalid("upstream.asset_base", reason))?;

    let timeout_seconds = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_seconds == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let user_agent =
        non_empty(upstream.user_agent).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Ok(UpstreamSettings {
        stylesheet_base,
        asset_base,
        timeout: Duration::from_secs(timeout_seconds),
        user_agent,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    public_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTlsSettings {
    enabled: Option<bool>,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    directory: Option<PathBuf>,
    ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    stylesheet_base: Option<String>,
    asset_base: Option<String>,
    timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn normalize_base_url(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    let parsed = Url::parse(trimmed).map_err(|err| format!("invalid URL `{trimmed}`: {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err(format!("URL `{trimmed}` has no host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(format!("URL `{trimmed}` must not carry a query or fragment"));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn derive_public_base_url(port: u16, tls_enabled: bool) -> String {
    let scheme = if tls_enabled { "https" } else { "http" };
    format!("{scheme}://localhost:{port}")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
