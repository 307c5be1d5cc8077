use std::any::Any;
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;

use hostweave_core::cookie::{self, SESSION_COOKIE};
use hostweave_core::error::{Fault, Result};
use hostweave_core::route::{self, RoutePath, FILE_SENDER};

use crate::app_state::AppState;
use crate::config::TenantConfig;
use crate::context::{Closed, Request, RequestContext, RequestLog, ResponseSlot};
use crate::services::FileSender;
use crate::session::{Session, SessionStore};

use super::pipeline::{self, Outcome};
use super::registry::{AppModule, ModuleFactory, ModuleGuard};

/// Result of running one request through the dispatcher.
#[derive(Debug)]
pub struct Processed {
    pub closed: Closed,
    pub log: RequestLog,
    pub outcome: Outcome,
}

/// The module chosen for a path. The instance itself is built later, inside
/// the same panic boundary as the call.
pub struct Resolved {
    pub module: String,
    pub method: Option<String>,
    pub factory: ModuleFactory,
    pub is_file: bool,
}

/// Resolves tenant, module and session for a request and invokes the module.
#[derive(Clone)]
pub struct Dispatcher {
    app: AppState,
    sessions: Arc<SessionStore>,
}

impl Dispatcher {
    pub fn new(app: AppState, sessions: Arc<SessionStore>) -> Self {
        Self { app, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Module for the path, or the static-file handler when there is none.
    pub fn resolve(&self, tenant: &TenantConfig, route: &RoutePath) -> Resolved {
        let found = route.target.as_ref().and_then(|t| {
            self.app
                .lookup_module(tenant, &t.module)
                .map(|factory| (t, factory))
        });
        match found {
            Some((t, factory)) => Resolved {
                module: t.module.clone(),
                method: t.method.clone(),
                factory,
                is_file: false,
            },
            None => {
                let file = route.file.clone();
                Resolved {
                    module: FILE_SENDER.to_string(),
                    method: None,
                    factory: Arc::new(move || {
                        Box::new(FileSender::new(file.clone())) as Box<dyn AppModule>
                    }),
                    is_file: true,
                }
            }
        }
    }

    /// Find the cookie's session and slide its expiry, or create one. Static
    /// files without a live session get a throwaway anonymous session.
    pub fn attach_session(
        &self,
        request: &Request,
        is_file: bool,
        log: &mut RequestLog,
        response: &mut ResponseSlot,
    ) -> Arc<Session> {
        let now = Utc::now();
        let logging = self.app.cfg().server.session_logging;

        let mut found = None;
        if let Some(token) = request.cookie(SESSION_COOKIE) {
            found = self.sessions.touch_at(token, now);
            if logging {
                let missing = if found.is_none() { " not found" } else { "" };
                let _ = write!(log, "[{token}{missing}]");
            }
        }

        let session = match found {
            Some(s) => s,
            None if is_file => return Arc::new(Session::anonymous()),
            None => {
                let s = self.sessions.create_at(now);
                if logging {
                    let _ = write!(log, "[{} new session]", s.token());
                }
                s
            }
        };
        response.set_cookie(cookie::set_cookie(
            SESSION_COOKIE,
            session.token(),
            session.expires(),
        ));
        session
    }

    /// Run one request end to end. Always produces a closed response.
    pub async fn process(&self, request: Request) -> Processed {
        let mut log = RequestLog::start(request.client, request.forwarded_for(), &request.raw_url);

        let tenant = self.app.resolve_tenant(&request.host);
        tracing::trace!(tenant = %tenant.server_name, path = %request.path, "tenant resolved");

        let route = route::resolve(&route::decode_path(&request.path));
        let resolved = self.resolve(&tenant, &route);

        let mut response = ResponseSlot::default();
        let session = self.attach_session(&request, resolved.is_file, &mut log, &mut response);
        tracing::trace!(
            module = %resolved.module,
            anonymous = session.is_anonymous(),
            "session attached"
        );

        let mut ctx = RequestContext {
            request,
            app: self.app.clone(),
            namespace: self.app.namespace(&tenant),
            tenant,
            session,
            sessions: Arc::clone(&self.sessions),
            module: resolved.module,
            method: resolved.method,
            log,
            response,
        };

        let timeout = self.app.cfg().server.request_timeout();
        let module = route::call_name(&ctx.module).to_string();
        let method = ctx.method.clone();
        let result = match build(&resolved.factory) {
            Ok(handler) => {
                let mut guard = ModuleGuard::new(handler);
                invoke(guard.module(), &mut ctx, &module, method.as_deref(), timeout).await
            }
            Err(fault) => Err(fault),
        };

        let outcome = match result {
            Ok(()) => Outcome::Completed,
            Err(fault) => pipeline::recover(&mut ctx, fault, timeout).await,
        };
        tracing::trace!(?outcome, "dispatched");

        let RequestContext { response, log, .. } = ctx;
        Processed {
            closed: response.close(),
            log,
            outcome,
        }
    }
}

/// Instantiate a module, folding a panicking factory into `Fault::Handler`.
fn build(factory: &ModuleFactory) -> Result<Box<dyn AppModule>> {
    panic::catch_unwind(AssertUnwindSafe(|| factory()))
        .map_err(|payload| Fault::handler(panic_message(payload.as_ref())))
}

/// Call a module, folding panics and the optional deadline into `Fault`.
pub(crate) async fn invoke(
    module: &mut dyn AppModule,
    ctx: &mut RequestContext,
    name: &str,
    method: Option<&str>,
    timeout: Option<Duration>,
) -> Result<()> {
    let call = AssertUnwindSafe(module.call(ctx, name, method)).catch_unwind();
    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(caught) => caught,
            Err(_) => {
                return Err(Fault::handler(format!(
                    "request timed out after {} ms",
                    limit.as_millis()
                )))
            }
        },
        None => call.await,
    };
    caught.unwrap_or_else(|panic| Err(Fault::handler(panic_message(panic.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
