//! Configuration loading
//!
//! Resolution order:
//! 1. Explicit config file path (command line)
//! 2. `PAPER_LISTINGS_CONFIG` environment variable
//! 3. Compiled defaults
//!
//! `PAPER_LISTINGS_DB` and `PAPER_LISTINGS_TZ` override single fields.

use crate::error::{ListingError, Result};
use crate::expiry::ExpiryPolicy;
use crate::taxonomy::Taxonomy;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PAPER_LISTINGS_CONFIG";
pub const DB_ENV: &str = "PAPER_LISTINGS_DB";
pub const TZ_ENV: &str = "PAPER_LISTINGS_TZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite metadata database
    pub database_path: PathBuf,

    /// Taxonomy JSON; the built-in table when absent
    pub taxonomy_path: Option<PathBuf>,

    /// IANA timezone of the publishing schedule
    pub business_tz: String,

    /// Hour (0-23) listings are published in `business_tz`
    pub publish_hour: u32,

    /// Listing page size when the caller does not give one
    pub default_show: usize,

    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("listings.db"),
            taxonomy_path: None,
            business_tz: "America/New_York".to_string(),
            publish_hour: 20,
            default_show: 25,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ListingError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ListingError::Config(format!("cannot read {:?}: {}", path.as_ref(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve configuration from an optional explicit path, the
    /// environment, and defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var(CONFIG_ENV) {
                Ok(path) => Self::from_file(path)?,
                Err(_) => Config::default(),
            },
        };

        if let Ok(db) = std::env::var(DB_ENV) {
            config.database_path = PathBuf::from(db);
        }
        if let Ok(tz) = std::env::var(TZ_ENV) {
            config.business_tz = tz;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.publish_hour > 23 {
            return Err(ListingError::Config(format!(
                "publish_hour must be 0-23, got {}",
                self.publish_hour
            )));
        }
        if self.default_show == 0 {
            return Err(ListingError::Config("default_show must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.business_tz
            .parse::<Tz>()
            .map_err(|e| ListingError::Config(format!("unknown timezone {:?}: {}", self.business_tz, e)))
    }

    pub fn expiry_policy(&self) -> Result<ExpiryPolicy> {
        Ok(ExpiryPolicy::new(self.timezone()?, self.publish_hour))
    }

    pub fn taxonomy(&self) -> Result<Taxonomy> {
        match &self.taxonomy_path {
            Some(path) => Taxonomy::from_file(path),
            None => Taxonomy::builtin(),
        }
    }
}
