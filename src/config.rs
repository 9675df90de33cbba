use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use chrono::Duration;

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub flash_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: "sqlite://students.db".to_string(),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 5 * 1024 * 1024,
            flash_ttl: Duration::seconds(600),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let bind_addr = parse_var("BIND_ADDR")?.unwrap_or(defaults.bind_addr);
        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);
        let max_upload_bytes =
            parse_var("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);
        let flash_ttl = parse_var::<i64>("FLASH_TTL_SECS")?
            .map(Duration::seconds)
            .unwrap_or(defaults.flash_ttl);

        if flash_ttl <= Duration::zero() {
            return Err(anyhow!("FLASH_TTL_SECS must be positive"));
        }

        Ok(Self {
            bind_addr,
            database_url,
            upload_dir,
            max_upload_bytes,
            flash_ttl,
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: `{}`", name, raw)),
        Err(_) => Ok(None),
    }
}
