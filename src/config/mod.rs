//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CacheTtl;
use crate::domain::entities::SiteProfile;
use crate::domain::types::{FeedFormat, HighWaterSource};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "syndic";
const ENV_PREFIX: &str = "SYNDIC";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_TTL_MINUTES: u32 = 10;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_FIREHOSE: &str = "articles";
const DEFAULT_DEBUG_QUERY_VALUE: &str = "42";
const DEFAULT_AUTHOR: &str = "Staff Writer";
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_SITE_TITLE: &str = "Untitled site";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// Command-line arguments for the syndic binary.
#[derive(Debug, Parser)]
#[command(name = "syndic", version, about = "Cached Atom, RSS and JSON feed server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SYNDIC_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve feeds over HTTP.
    Serve(Box<ServeArgs>),
    /// Assemble one feed and print it to stdout.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverride {
    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub content_root: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    /// Override the feed cache TTL in minutes; `0` disables caching.
    #[arg(long = "feeds-cache-ttl", value_name = "MINUTES")]
    pub feeds_cache_ttl: Option<String>,

    /// Turn every feed endpoint off.
    #[arg(
        long = "feeds-disable",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub feeds_disable: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Feed format (atom, rss or json).
    #[arg(long, value_name = "FORMAT")]
    pub format: FeedFormat,

    /// Category to render instead of the firehose.
    #[arg(long, value_name = "KEY")]
    pub category: Option<String>,

    /// Include debug annotations.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub debug: bool,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub feeds: FeedSettings,
    pub cache: CacheSettings,
    pub content: ContentSettings,
    pub site: SiteProfile,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub disable: bool,
    pub firehose: String,
    /// Empty turns category feeds off.
    pub categories: Vec<String>,
    /// Query value that switches on debug annotations; empty never matches.
    pub debug_query_value: String,
    pub author: String,
    pub high_water: HighWaterSource,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl: CacheTtl,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
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

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("feeds.categories"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_content_override(&args.content),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    feeds: RawFeedSettings,
    cache: RawCacheSettings,
    content: RawContentSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.feeds_cache_ttl.as_ref() {
            self.feeds.cache_ttl = Some(ttl.clone());
        }
        if let Some(disable) = overrides.feeds_disable {
            self.feeds.disable = Some(disable);
        }

        self.apply_content_override(&overrides.content);
    }

    fn apply_content_override(&mut self, overrides: &ContentOverride) {
        if let Some(root) = overrides.content_root.as_ref() {
            self.content.root = Some(root.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            feeds,
            cache,
            content,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let cache = build_cache_settings(cache, feeds.cache_ttl.as_deref())?;
        let feeds = build_feed_settings(feeds)?;
        let content = build_content_settings(content)?;
        let site = build_site_profile(site)?;

        Ok(Self {
            server,
            logging,
            feeds,
            cache,
            content,
            site,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
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

fn build_feed_settings(feeds: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let firehose = non_empty(feeds.firehose, DEFAULT_FIREHOSE);
    if firehose.contains('/') {
        return Err(LoadError::invalid(
            "feeds.firehose",
            "collection key must not contain `/`",
        ));
    }

    let mut categories: Vec<String> = Vec::new();
    for category in feeds.categories.unwrap_or_default() {
        let trimmed = category.trim();
        if trimmed.is_empty() || categories.iter().any(|known| known == trimmed) {
            continue;
        }
        if trimmed.contains('/') {
            return Err(LoadError::invalid(
                "feeds.categories",
                format!("category `{trimmed}` must not contain `/`"),
            ));
        }
        categories.push(trimmed.to_string());
    }

    let high_water = match feeds.high_water {
        Some(value) => HighWaterSource::from_str(&value)
            .map_err(|err| LoadError::invalid("feeds.high_water", err.to_string()))?,
        None => HighWaterSource::default(),
    };

    Ok(FeedSettings {
        disable: feeds.disable.unwrap_or(false),
        firehose,
        categories,
        debug_query_value: feeds
            .debug_query_value
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_DEBUG_QUERY_VALUE.to_string()),
        author: non_empty(feeds.author, DEFAULT_AUTHOR),
        high_water,
    })
}

fn build_cache_settings(
    cache: RawCacheSettings,
    ttl: Option<&str>,
) -> Result<CacheSettings, LoadError> {
    let capacity = cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
    if capacity == 0 {
        return Err(LoadError::invalid(
            "cache.capacity",
            "must be greater than zero",
        ));
    }

    let ttl = match ttl {
        Some(raw) => {
            CacheTtl::parse(raw).map_err(|reason| LoadError::invalid("feeds.cache_ttl", reason))?
        }
        None => CacheTtl::from_minutes(DEFAULT_CACHE_TTL_MINUTES),
    };

    Ok(CacheSettings { capacity, ttl })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let root = content
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("content.root", "path must not be empty"));
    }
    Ok(ContentSettings { root })
}

fn build_site_profile(site: RawSiteSettings) -> Result<SiteProfile, LoadError> {
    let raw_url = non_empty(site.url, DEFAULT_SITE_URL);
    let url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("site.url", format!("`{raw_url}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "site.url",
            format!("`{raw_url}` must use http or https"),
        ));
    }

    Ok(SiteProfile {
        title: non_empty(site.title, DEFAULT_SITE_TITLE),
        description: site.description.unwrap_or_default(),
        copyright: site.copyright.unwrap_or_default(),
        url: url.as_str().trim_end_matches('/').to_string(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    disable: Option<bool>,
    cache_ttl: Option<String>,
    firehose: Option<String>,
    categories: Option<Vec<String>>,
    debug_query_value: Option<String>,
    author: Option<String>,
    high_water: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    description: Option<String>,
    copyright: Option<String>,
    url: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>, default: &str) -> String {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
