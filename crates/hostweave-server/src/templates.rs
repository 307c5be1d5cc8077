//! Templating collaborator boundary.
//!
//! The server renders two pages itself: `exception` for the diagnostic page
//! and `home` for the landing module. Real sites plug in their own engine.

use minijinja::{context, Environment};
use serde_json::Value;

use hostweave_core::error::{Fault, Result};

use crate::config::TenantConfig;

pub trait TemplateEngine: Send + Sync {
    fn render(&self, tenant: &TenantConfig, name: &str, data: &Value) -> Result<String>;
}

const EXCEPTION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ page.title }} - {{ site }}</title></head>
<body>
<h1>{{ page.title }}</h1>
<p class="kind">{{ page.kind }}</p>
<pre class="detail">{{ page.message }}</pre>
<p class="contact">{{ email }}</p>
</body>
</html>
"#;

const HOME_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ site }}</title></head>
<body><h1>{{ site }}</h1><p>Visit {{ page.visits }}</p></body>
</html>
"#;

/// Engine with the built-in pages only. Templates are registered under
/// `<name>.html`, which turns on HTML auto-escaping.
pub struct BuiltinTemplates {
    env: Environment<'static>,
}

impl BuiltinTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [("exception.html", EXCEPTION_HTML), ("home.html", HOME_HTML)] {
            env.add_template(name, source)
                .map_err(|e| Fault::render(format!("template {name}: {e}")))?;
        }
        Ok(Self { env })
    }
}

impl TemplateEngine for BuiltinTemplates {
    fn render(&self, tenant: &TenantConfig, name: &str, data: &Value) -> Result<String> {
        let tmpl = self
            .env
            .get_template(&format!("{name}.html"))
            .map_err(|e| Fault::render(e.to_string()))?;
        tmpl.render(context! {
            site => tenant.title.as_str(),
            email => tenant.email.as_str(),
            page => data,
        })
        .map_err(|e| Fault::render(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    fn engine() -> BuiltinTemplates {
        BuiltinTemplates::new().unwrap()
    }

    #[test]
    fn exception_page_escapes_detail() {
        let data = json!({
            "title": "Exception",
            "kind": "HANDLER",
            "message": "<script>boom</script>",
        });
        let html = engine()
            .render(&TenantConfig::default(), "exception", &data)
            .unwrap();
        assert!(html.contains("&lt;script&gt;boom"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<h1>Exception</h1>"));
        assert!(html.contains("root@localhost"));
    }

    #[test]
    fn home_page_shows_visits() {
        let tenant = TenantConfig {
            title: "Tom & Jerry".into(),
            ..TenantConfig::default()
        };
        let html = engine().render(&tenant, "home", &json!({ "visits": 3 })).unwrap();
        assert!(html.contains("Visit 3"));
        assert!(html.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn unknown_template_is_a_render_fault() {
        let err = engine()
            .render(&TenantConfig::default(), "missing", &json!({}))
            .unwrap_err();
        assert_eq!(err.kind(), hostweave_core::FaultKind::Render);
    }
}
