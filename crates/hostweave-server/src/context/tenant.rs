//! Host name to tenant resolution.

use std::sync::Arc;

use regex::Regex;

use hostweave_core::error::Result;

use crate::config::TenantConfig;

struct Tenant {
    cfg: Arc<TenantConfig>,
    aliases: Option<Regex>,
}

impl Tenant {
    fn new(cfg: TenantConfig) -> Result<Self> {
        let aliases = cfg.alias_pattern()?;
        Ok(Self {
            cfg: Arc::new(cfg),
            aliases,
        })
    }

    fn matches(&self, host: &str) -> bool {
        self.cfg.server_name.eq_ignore_ascii_case(host)
            || self.aliases.as_ref().is_some_and(|re| re.is_match(host))
    }
}

/// Maps inbound host names to tenant configuration. Never fails: unknown hosts
/// get the default tenant.
pub struct TenantResolver {
    tenants: Vec<Tenant>,
    default: Arc<TenantConfig>,
}

impl TenantResolver {
    /// Fails with `Fault::Config` when an alias does not compile.
    pub fn new(default: TenantConfig, tenants: Vec<TenantConfig>) -> Result<Self> {
        Ok(Self {
            tenants: tenants
                .into_iter()
                .map(Tenant::new)
                .collect::<Result<_>>()?,
            default: Arc::new(default),
        })
    }

    /// Resolve a `Host` header value (port, if any, is ignored).
    pub fn resolve(&self, host_header: &str) -> Arc<TenantConfig> {
        let host = host_name(host_header);
        self.tenants
            .iter()
            .find(|t| t.matches(host))
            .map(|t| Arc::clone(&t.cfg))
            .unwrap_or_else(|| Arc::clone(&self.default))
    }

    pub fn default_tenant(&self) -> Arc<TenantConfig> {
        Arc::clone(&self.default)
    }

    /// Every distinct namespace referenced by a tenant, default first.
    pub fn namespaces(&self) -> Vec<String> {
        let mut out = vec![self.default.namespace.clone()];
        for t in &self.tenants {
            if !out.contains(&t.cfg.namespace) {
                out.push(t.cfg.namespace.clone());
            }
        }
        out
    }
}

/// Strip an optional `:port` from a host header, keeping IPv6 brackets intact.
pub fn host_name(header: &str) -> &str {
    let header = header.trim();
    if header.starts_with('[') {
        return match header.find(']') {
            Some(end) => &header[..=end],
            None => header,
        };
    }
    match header.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => header,
    }
}
