//! Configuration of the ticket desk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DeskError, Result};

/// Name of the configuration file looked up by [`Config::discover()`]
pub const CONFIG_FILE: &str = "ticket-desk.toml";

/// Configuration of the ticket desk
#[derive(Clone, PartialEq, Eq, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// JSON file holding all tickets
    pub database: PathBuf,
    /// Start with an empty store if [`Self::database`] does not exist
    pub create_missing: bool,

    /// Address for the HTTP server to listen on
    pub host: String,
    /// Port for the HTTP server to listen on
    pub port: u16,
    /// Number of threads answering HTTP requests
    pub http_threads: u32,
    /// Directory with static files served for unknown GET requests
    pub public_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("db.json"),
            create_missing: false,
            host: String::from("127.0.0.1"),
            port: 3000,
            http_threads: 4,
            public_dir: PathBuf::from("public"),
        }
    }
}

impl Config {
    /// Parse a TOML configuration, missing keys keep their defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DeskError::Config(e.to_string()))
    }

    /// Load the configuration from `path`
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DeskError::io(path, e))?;
        let mut config = Self::from_toml(&contents)?;
        if let Some(dir) = path.parent() {
            config.database = dir.join(&config.database);
            config.public_dir = dir.join(&config.public_dir);
        }
        Ok(config)
    }

    /// Search the current directory and its ancestors for a
    /// `ticket-desk.toml` and load it, falling back to the defaults
    ///
    /// Environment overrides are applied in both cases.
    pub fn discover() -> Result<Self> {
        let mut path = std::env::current_dir().map_err(|e| DeskError::io(".", e))?;
        let mut config = loop {
            path.push(CONFIG_FILE);

            match std::fs::metadata(&path) {
                Ok(_) => break Self::load(&path)?,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(DeskError::io(path, e)),
            }

            path.pop();
            if !path.pop() {
                break Self::default();
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `TICKET_DESK_*` overrides, reading variables through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(db) = var("TICKET_DESK_DB") {
            self.database = PathBuf::from(db);
        }
        if let Some(host) = var("TICKET_DESK_HOST") {
            self.host = host;
        }
        if let Some(port) = var("TICKET_DESK_PORT") {
            self.port = port
                .parse()
                .map_err(|_| DeskError::Config(format!("TICKET_DESK_PORT is not a port: {port}")))?;
        }
        Ok(())
    }
}
