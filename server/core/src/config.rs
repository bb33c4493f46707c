//! The server configuration as read from its TOML file at startup. This decides which
//! naming contexts are served, which stages make up the interceptor chain, and how often
//! the partitions are flushed.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use dirsrvd_lib::interceptor::interceptors_from_names;
use dirsrvd_lib::prelude::*;
use serde::Deserialize;
use sketching::tracing_subscriber::EnvFilter;
use sketching::LogLevel;

fn default_sync_interval_secs() -> u64 {
    DEFAULT_SYNC_INTERVAL.as_secs()
}

fn default_allow_anonymous_access() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// The naming contexts to serve, eg `dc=example,dc=com`.
    pub suffixes: Vec<String>,
    pub log_level: Option<LogLevel>,
    /// Record every change so the directory can be reverted.
    #[serde(default)]
    pub changelog: bool,
    /// Seconds between partition flushes.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    pub admin_password: Option<String>,
    /// The interceptor chain by stage name, in order. Defaults to every built in stage.
    pub interceptors: Option<Vec<String>>,
    #[serde(default = "default_allow_anonymous_access")]
    pub allow_anonymous_access: bool,
}

impl ServerConfig {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self, std::io::Error> {
        let mut f = File::open(config_path.as_ref()).map_err(|e| {
            eprintln!("Unable to open config file [{:?}] 🥺", e);
            e
        })?;

        let mut contents = String::new();
        f.read_to_string(&mut contents).map_err(|e| {
            eprintln!("unable to read contents {:?}", e);
            e
        })?;

        Self::from_toml(&contents).map_err(|e| {
            eprintln!("unable to parse config {:?}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn log_filter(&self) -> EnvFilter {
        log_filter(self.log_level.unwrap_or_default())
    }

    /// Build the in-process service configuration. Fails on a malformed suffix or an
    /// unknown interceptor name.
    pub fn to_service_config(&self) -> Result<DirectoryServiceConfig, OperationError> {
        let suffixes = self
            .suffixes
            .iter()
            .map(|s| Dn::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let mut config = DirectoryServiceConfig {
            suffixes,
            changelog: self.changelog,
            admin_password: self.admin_password.clone(),
            allow_anonymous_access: self.allow_anonymous_access,
            ..Default::default()
        };
        if let Some(names) = self.interceptors.as_ref() {
            config.interceptors = interceptors_from_names(names)?;
        }
        Ok(config)
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suffixes: {}, ", self.suffixes.join("; "))?;
        write!(f, "log_level: {}, ", self.log_level.unwrap_or_default())?;
        write!(f, "changelog: {}, ", self.changelog)?;
        write!(f, "sync_interval_secs: {}, ", self.sync_interval_secs)?;
        write!(f, "allow_anonymous_access: {}, ", self.allow_anonymous_access)?;
        match self.interceptors.as_ref() {
            Some(names) => write!(f, "interceptors: {}", names.join(", ")),
            None => write!(f, "interceptors: default"),
        }
    }
}

/// The filter a server logs through at `level`.
pub fn log_filter(level: LogLevel) -> EnvFilter {
    let filter = EnvFilter::builder().parse_lossy("").add_directive(level.into());
    // concread's reclamation is extremely chatty below error.
    match "concread=error".parse() {
        Ok(quiet) => filter.add_directive(quiet),
        Err(_) => filter,
    }
}
