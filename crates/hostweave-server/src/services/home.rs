use async_trait::async_trait;
use serde_json::{json, Value};

use hostweave_core::error::{Fault, Result};

use crate::context::{Reply, RequestContext};
use crate::dispatch::AppModule;

const VISITS: &str = "visits";

/// Landing page. Counts visits in the session to show state surviving
/// across requests; `home/reset` clears the counter.
#[derive(Default)]
pub struct HomeModule;

impl HomeModule {
    fn render(ctx: &mut RequestContext, visits: u64) -> Result<()> {
        let html = ctx
            .app
            .templates()
            .render(&ctx.tenant, "home", &json!({ "visits": visits }))?;
        ctx.response.send(Reply::html(200, html))
    }
}

#[async_trait]
impl AppModule for HomeModule {
    async fn call(
        &mut self,
        ctx: &mut RequestContext,
        _: &str,
        method: Option<&str>,
    ) -> Result<()> {
        match method.unwrap_or("default") {
            "default" => {
                let visits = ctx.session.with_values(|v| {
                    let n = v.get(VISITS).and_then(Value::as_u64).unwrap_or(0) + 1;
                    v.insert(VISITS.into(), Value::from(n));
                    n
                });
                Self::render(ctx, visits)
            }
            "reset" => {
                ctx.session.remove_value(VISITS);
                Self::render(ctx, 0)
            }
            other => Err(Fault::handler(format!("home has no method {other}"))),
        }
    }
}
