//! Error recovery tiers.
//!
//! 1. the module responds normally (handled by the dispatcher)
//! 2. on a fault with nothing sent yet, the diagnostic page renders (500)
//! 3. if that fails too, a plain-text 500 carries the original message
//!
//! Transport faults skip both: the peer is gone.

use std::fmt::Write;
use std::time::Duration;

use hostweave_core::error::{Fault, FaultKind};

use crate::context::{Reply, RequestContext};
use crate::services::ErrorPage;

use super::dispatcher::invoke;
use super::registry::ModuleGuard;

/// Log target of the per-request access line.
pub const ACCESS_TARGET: &str = "hostweave::access";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The module's own response (possibly followed by a logged fault).
    Completed,
    /// Tier 2: diagnostic page.
    ErrorRendered,
    /// Tier 3: plain-text fallback.
    MinimalErrorSent,
    /// The peer disconnected; nothing rendered.
    TransportLost,
}

pub(crate) async fn recover(
    ctx: &mut RequestContext,
    fault: Fault,
    timeout: Option<Duration>,
) -> Outcome {
    let _ = write!(ctx.log, " Request error: {fault}");
    tracing::debug!(kind = fault.kind().as_str(), error = %fault, "request fault");

    if fault.kind() == FaultKind::Transport {
        return Outcome::TransportLost;
    }
    if ctx.response_sent() {
        return Outcome::Completed;
    }

    let page = ErrorPage::new(&fault);
    ctx.session = page.session();
    ctx.module = ErrorPage::MODULE.to_string();
    ctx.method = Some(ErrorPage::METHOD.to_string());

    let rendered = {
        let mut guard = ModuleGuard::new(Box::new(page));
        invoke(
            guard.module(),
            ctx,
            ErrorPage::MODULE,
            Some(ErrorPage::METHOD),
            timeout,
        )
        .await
    };

    match rendered {
        Ok(()) if ctx.response_sent() => Outcome::ErrorRendered,
        Ok(()) => minimal(ctx, &fault, &Fault::render("error page sent no response")),
        Err(e) => minimal(ctx, &fault, &Fault::render(e.message())),
    }
}

fn minimal(ctx: &mut RequestContext, original: &Fault, render: &Fault) -> Outcome {
    let _ = write!(ctx.log, " Error displaying exception: {render}");
    if ctx.response_sent() {
        return Outcome::ErrorRendered;
    }
    let body = format!("Error displaying exception:{}", original.message());
    if let Err(e) = ctx.response.send(Reply::text(500, body)) {
        tracing::debug!(error = %e, "plain-text fallback dropped");
    }
    Outcome::MinimalErrorSent
}

/// Emit a finished access line.
pub fn emit(line: &str) {
    tracing::info!(target: ACCESS_TARGET, "{line}");
}
