use crate::TtlMs;
use std::str::FromStr;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Moka,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "dashmap" => Ok(CacheBackend::Memory),
            "moka" => Ok(CacheBackend::Moka),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl: Option<TtlMs>,
    pub max_entries: Option<u64>,
    pub single_flight: bool,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub cache: CacheSettings,
    pub default_page_limit: u32,
    pub allowed_origins: Vec<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_PAGE_LIMIT: u32 = 3;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ttl_secs: Option<u64> = parse_opt(&lookup, "BILEMO_CACHE_TTL_SECS");

        Self {
            host: lookup("BILEMO_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "BILEMO_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            data_dir: lookup("BILEMO_DATA_DIR")
                .unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            cache: CacheSettings {
                backend: parse_or(&lookup, "BILEMO_CACHE_BACKEND", CacheBackend::Memory),
                ttl: ttl_secs.filter(|s| *s > 0).map(TtlMs::from_secs),
                max_entries: parse_opt(&lookup, "BILEMO_CACHE_MAX_ENTRIES"),
                single_flight: parse_or(&lookup, "BILEMO_CACHE_SINGLE_FLIGHT", false),
            },
            default_page_limit: page_limit(&lookup, Self::DEFAULT_PAGE_LIMIT),
            allowed_origins: lookup("BILEMO_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Largest page size a listing accepts.
pub const MAX_PAGE_LIMIT: u32 = 100;

fn page_limit(lookup: &impl Fn(&str) -> Option<String>, default: u32) -> u32 {
    match parse_opt::<u32>(lookup, "BILEMO_PAGE_LIMIT") {
        Some(limit) if (1..=MAX_PAGE_LIMIT).contains(&limit) => limit,
        Some(limit) => {
            warn!(
                "BILEMO_PAGE_LIMIT must be between 1 and {}, got {}; using {}",
                MAX_PAGE_LIMIT, limit, default
            );
            default
        }
        None => default,
    }
}

fn parse_opt<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} has an invalid value '{}', ignoring it", name, raw);
            None
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    parse_opt(lookup, name).unwrap_or(default)
}
