use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use hostweave_core::error::Result;

use crate::config::TenantConfig;
use crate::context::RequestContext;

/// An application module. One instance is built per request by its factory.
#[async_trait]
pub trait AppModule: Send {
    /// Handle the request. On success the module has written its response
    /// into `ctx.response`.
    async fn call(
        &mut self,
        ctx: &mut RequestContext,
        module: &str,
        method: Option<&str>,
    ) -> Result<()>;

    /// Release per-request resources. Runs after `call` on every exit path,
    /// including faults and panics.
    fn release(&mut self) {}
}

/// Builds a fresh module instance for one request.
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn AppModule> + Send + Sync>;

/// Name -> factory table for one namespace. Lookups ignore case.
#[derive(Default)]
pub struct ModuleRegistry {
    name: String,
    modules: DashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&self, module: &str, factory: ModuleFactory) {
        self.modules.insert(module.to_ascii_lowercase(), factory);
    }

    /// Register a default-constructible module type.
    pub fn register_default<M>(&self, module: &str)
    where
        M: AppModule + Default + 'static,
    {
        self.register(module, Arc::new(|| Box::new(M::default()) as Box<dyn AppModule>));
    }

    pub fn lookup(&self, module: &str) -> Option<ModuleFactory> {
        self.modules
            .get(&module.to_ascii_lowercase())
            .map(|e| Arc::clone(e.value()))
    }

    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Every namespace's registry, built once at process start.
#[derive(Default)]
pub struct ModuleCatalog {
    namespaces: DashMap<String, Arc<ModuleRegistry>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for `name`, created empty on first use.
    pub fn namespace(&self, name: &str) -> Arc<ModuleRegistry> {
        let entry = self
            .namespaces
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ModuleRegistry::new(name)));
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModuleRegistry>> {
        self.namespaces.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn lookup(&self, tenant: &TenantConfig, module: &str) -> Option<ModuleFactory> {
        self.get(&tenant.namespace)?.lookup(module)
    }
}

/// Holds a module for the duration of a call and releases it on drop.
pub(crate) struct ModuleGuard(Box<dyn AppModule>);

impl ModuleGuard {
    pub(crate) fn new(module: Box<dyn AppModule>) -> Self {
        Self(module)
    }

    pub(crate) fn module(&mut self) -> &mut dyn AppModule {
        self.0.as_mut()
    }
}

impl Drop for ModuleGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}
