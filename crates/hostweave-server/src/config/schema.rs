use std::net::SocketAddr;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use hostweave_core::error::{Fault, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub logging: LoggingSection,

    /// Tenant used when no entry in `tenants` matches the request host.
    #[serde(default)]
    pub default_tenant: TenantConfig,

    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            logging: LoggingSection::default(),
            default_tenant: TenantConfig::default(),
            tenants: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Fault::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.default_tenant.validate()?;
        for t in &self.tenants {
            t.validate()?;
        }

        Ok(())
    }
}

/// Upper bound for `server.session_ttl_minutes` (one year).
pub const MAX_SESSION_TTL_MINUTES: u64 = 366 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Append session token diagnostics to the access line.
    #[serde(default)]
    pub session_logging: bool,

    /// Per-request deadline. Absent means requests may run indefinitely.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Directory holding one sub-directory per site for static files.
    #[serde(default = "default_site_root")]
    pub site_root: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            session_ttl_minutes: default_session_ttl_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
            session_logging: false,
            request_timeout_ms: None,
            site_root: default_site_root(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.session_ttl_minutes == 0 {
            return Err(Fault::Config(
                "server.session_ttl_minutes must be at least 1".into(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Fault::Config(
                "server.sweep_interval_secs must be at least 1".into(),
            ));
        }
        let ttl_secs = self
            .session_ttl_minutes
            .checked_mul(60)
            .filter(|_| self.session_ttl_minutes <= MAX_SESSION_TTL_MINUTES)
            .ok_or_else(|| {
                Fault::Config(format!(
                    "server.session_ttl_minutes must not exceed {MAX_SESSION_TTL_MINUTES}"
                ))
            })?;
        if self.sweep_interval_secs > ttl_secs {
            return Err(Fault::Config(
                "server.sweep_interval_secs must not exceed the session ttl".into(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(Fault::Config(
                "server.request_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| Fault::Config(format!("server.listen is not a socket address: {e}")))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_session_ttl_minutes() -> u64 {
    30
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_site_root() -> String {
    ".".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// When set, log lines are also written to a daily file in this directory.
    #[serde(default)]
    pub dir: Option<String>,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: None,
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Space-separated host patterns; `*` and `?` are wildcards.
    #[serde(default)]
    pub server_alias: Option<String>,

    /// Module namespace this tenant dispatches into.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_email")]
    pub email: String,

    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_alias: None,
            namespace: default_namespace(),
            email: default_email(),
            title: default_title(),
        }
    }
}

impl TenantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_name.trim().is_empty() {
            return Err(Fault::Config("tenant server_name must not be empty".into()));
        }
        if self.namespace.trim().is_empty() {
            return Err(Fault::Config(format!(
                "tenant {} namespace must not be empty",
                self.server_name
            )));
        }
        self.alias_pattern()?;
        Ok(())
    }

    /// Compile `server_alias` into one anchored, case-insensitive regex:
    /// `*.example.com www.?.test` becomes `(?i)^(.*\.example\.com|www\..\.test)$`.
    pub fn alias_pattern(&self) -> Result<Option<Regex>> {
        let alternatives: Vec<String> = self
            .server_alias
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|alias| regex::escape(alias).replace(r"\*", ".*").replace(r"\?", "."))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }
        let pattern = format!("(?i)^({})$", alternatives.join("|"));
        Regex::new(&pattern).map(Some).map_err(|e| {
            Fault::Config(format!(
                "tenant {} server_alias is not a valid pattern: {e}",
                self.server_name
            ))
        })
    }
}

fn default_server_name() -> String {
    "localhost".into()
}
fn default_namespace() -> String {
    "default".into()
}
fn default_email() -> String {
    "root@localhost".into()
}
fn default_title() -> String {
    "hostweave".into()
}
