//! Shared application state for the hostweave server.
//!
//! Built once at process start from the config, the module catalog and the
//! template engine; cloned cheaply into every request.

use std::sync::Arc;

use hostweave_core::error::{Fault, Result};

use crate::config::{AppConfig, TenantConfig};
use crate::context::TenantResolver;
use crate::dispatch::{ModuleCatalog, ModuleFactory, ModuleRegistry};
use crate::templates::TemplateEngine;

const FAIL_FAST_ON_EMPTY_NAMESPACE: bool = false; // if changed to true, boot fails.

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AppConfig,
    tenants: TenantResolver,
    catalog: ModuleCatalog,
    templates: Arc<dyn TemplateEngine>,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(
        cfg: AppConfig,
        catalog: ModuleCatalog,
        templates: Arc<dyn TemplateEngine>,
    ) -> Result<Self> {
        cfg.validate()?;

        let tenants = TenantResolver::new(cfg.default_tenant.clone(), cfg.tenants.clone())?;

        // namespace <-> catalog sanity check
        for ns in tenants.namespaces() {
            let registry = catalog.namespace(&ns);
            if registry.is_empty() {
                tracing::warn!(namespace = %ns, "tenant namespace has no registered modules");
                if FAIL_FAST_ON_EMPTY_NAMESPACE {
                    return Err(Fault::Config(format!(
                        "namespace {ns} has no registered modules"
                    )));
                }
            } else {
                tracing::debug!(
                    namespace = %ns,
                    modules = ?registry.registered(),
                    "namespace ready"
                );
            }
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                tenants,
                catalog,
                templates,
            }),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.inner.cfg
    }

    pub fn tenants(&self) -> &TenantResolver {
        &self.inner.tenants
    }

    pub fn resolve_tenant(&self, host: &str) -> Arc<TenantConfig> {
        self.inner.tenants.resolve(host)
    }

    /// Registry of the modules available to `tenant`.
    pub fn namespace(&self, tenant: &TenantConfig) -> Arc<ModuleRegistry> {
        self.inner.catalog.namespace(&tenant.namespace)
    }

    pub fn lookup_module(&self, tenant: &TenantConfig, module: &str) -> Option<ModuleFactory> {
        self.inner.catalog.lookup(tenant, module)
    }

    pub fn templates(&self) -> &dyn TemplateEngine {
        self.inner.templates.as_ref()
    }
}
