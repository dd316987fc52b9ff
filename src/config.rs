use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DB_PATH: &str = "data/matches.sqlite";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub api_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_level: String,
}

/// Loads `.env.local` then `.env`. Variables already set are kept.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api_addr = var("MATCHES_API_ADDR", DEFAULT_API_ADDR);
        Ok(Self {
            db_path: PathBuf::from(var("MATCHES_DB_PATH", DEFAULT_DB_PATH)),
            api_addr: parse_addr(&api_addr)?,
            data_dir: PathBuf::from(var("MATCHES_DATA_DIR", DEFAULT_DATA_DIR)),
            log_level: var("LOG_LEVEL", DEFAULT_LOG_LEVEL),
        })
    }

    /// Command-line flags override the environment.
    pub fn with_args(mut self, args: &[String]) -> Result<Self> {
        if let Some(db) = flag_value(args, "--db") {
            self.db_path = PathBuf::from(db);
        }
        if let Some(dir) = flag_value(args, "--data-dir") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = flag_value(args, "--addr") {
            self.api_addr = parse_addr(&addr)?;
        }
        Ok(self)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn clean_dir(&self) -> PathBuf {
        self.data_dir.join("clean")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.data_dir.join("merged").join("all_seasons.csv")
    }
}

fn parse_addr(raw: &str) -> Result<SocketAddr> {
    raw.parse::<SocketAddr>()
        .with_context(|| format!("invalid listen address {raw:?}"))
}

pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
