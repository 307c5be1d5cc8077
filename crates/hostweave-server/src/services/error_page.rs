use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use hostweave_core::error::{Fault, FaultKind, Result};

use crate::context::{Reply, RequestContext};
use crate::dispatch::AppModule;
use crate::session::Session;

/// Diagnostic page shown when a module fails before responding.
/// Always runs on its own anonymous session.
pub struct ErrorPage {
    kind: FaultKind,
    message: String,
    session: Arc<Session>,
}

impl ErrorPage {
    pub const MODULE: &'static str = "exception";
    pub const METHOD: &'static str = "default";

    pub fn new(fault: &Fault) -> Self {
        Self {
            kind: fault.kind(),
            message: fault.to_string(),
            session: Arc::new(Session::anonymous()),
        }
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }
}

#[async_trait]
impl AppModule for ErrorPage {
    async fn call(
        &mut self,
        ctx: &mut RequestContext,
        module: &str,
        method: Option<&str>,
    ) -> Result<()> {
        let data = json!({
            "title": "Exception",
            "module": module,
            "method": method,
            "kind": self.kind.as_str(),
            "message": self.message,
            "tenant": ctx.tenant.server_name,
        });
        let html = ctx.app.templates().render(&ctx.tenant, "exception", &data)?;
        ctx.response.send(Reply::html(500, html))
    }
}
