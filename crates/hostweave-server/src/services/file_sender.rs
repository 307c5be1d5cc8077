use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use hostweave_core::error::{Fault, Result};

use crate::context::{Reply, RequestContext};
use crate::dispatch::AppModule;

/// Built-in static-file handler, used whenever no module matches the path.
pub struct FileSender {
    path: String,
}

impl FileSender {
    /// `path` is the decoded request path without its leading `/`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Site directory, then namespace directory, then the default tenant's.
    fn search_roots(ctx: &RequestContext) -> Vec<PathBuf> {
        let root = Path::new(&ctx.app.cfg().server.site_root);
        let default = ctx.app.tenants().default_tenant();
        let mut roots: Vec<PathBuf> = Vec::with_capacity(4);
        for dir in [
            &ctx.tenant.server_name,
            &ctx.tenant.namespace,
            &default.server_name,
            &default.namespace,
        ] {
            let p = root.join(dir);
            if !roots.contains(&p) {
                roots.push(p);
            }
        }
        roots
    }
}

fn is_contained(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

pub fn content_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl AppModule for FileSender {
    async fn call(&mut self, ctx: &mut RequestContext, _: &str, _: Option<&str>) -> Result<()> {
        if !is_contained(&self.path) {
            return Err(Fault::handler("Illegal file access"));
        }

        for root in Self::search_roots(ctx) {
            let candidate = root.join(&self.path);
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => {
                    let body = tokio::fs::read(&candidate).await.map_err(Fault::from_io)?;
                    return ctx.write_response(body, content_type(&self.path), 200);
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Fault::from_io(e)),
            }
        }

        ctx.response
            .send(Reply::text(404, format!("File not found:{}", self.path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_components_are_rejected() {
        assert!(is_contained("css/site.css"));
        assert!(is_contained("./index.html"));
        assert!(!is_contained("../secret.txt"));
        assert!(!is_contained("a/../../b"));
        assert!(!is_contained("/etc/passwd"));
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("a/b/site.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type("logo.png"), "image/png");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
