use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use hostweave_core::cookie;
use hostweave_core::error::{Fault, Result};

use crate::app_state::AppState;
use crate::config::TenantConfig;
use crate::dispatch::ModuleRegistry;
use crate::session::{Session, SessionStore};

/// Inbound request, detached from the transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path and query exactly as received.
    pub raw_url: String,
    /// Path component, still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub host: String,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub client: SocketAddr,
}

impl Request {
    /// Build a bodiless request from a raw URL. Mostly for tests and tooling.
    pub fn new(method: &str, raw_url: &str, client: SocketAddr) -> Self {
        let (path, query) = match raw_url.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (raw_url.to_string(), None),
        };
        Self {
            method: method.to_string(),
            raw_url: raw_url.to_string(),
            path,
            query,
            host: String::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            client,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "host" {
            self.host = value.to_string();
        }
        self.headers.push((name, value.to_string()));
        self
    }

    /// First header with this (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Cookie value, searched across every `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k == "cookie")
            .find_map(|(_, v)| cookie::find(v, name))
    }

    pub fn forwarded_for(&self) -> Option<&str> {
        self.header("x-forwarded-for")
    }
}

/// Placeholder replaced by the elapsed time once the response is closed.
pub const ELAPSED_PLACEHOLDER: &str = ":[ms]:";

/// Aggregated access line for one request. Modules may append diagnostics
/// with `write!`.
#[derive(Debug)]
pub struct RequestLog {
    buf: String,
    started: Instant,
}

impl RequestLog {
    pub fn start(client: SocketAddr, forwarded_for: Option<&str>, raw_url: &str) -> Self {
        Self {
            buf: format!(
                "{} {}:{}{}",
                client.ip(),
                forwarded_for.unwrap_or_default(),
                raw_url,
                ELAPSED_PLACEHOLDER
            ),
            started: Instant::now(),
        }
    }

    pub fn append(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Resolve the placeholder with the time since [`RequestLog::start`].
    pub fn finish(self) -> String {
        let elapsed = self.started.elapsed();
        self.finish_with(elapsed)
    }

    pub fn finish_with(self, elapsed: Duration) -> String {
        let ms = format!(":{} ms:", elapsed.as_millis());
        self.buf.replacen(ELAPSED_PLACEHOLDER, &ms, 1).trim().to_string()
    }
}

impl fmt::Write for RequestLog {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

/// A fully built response body plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Reply {
    pub fn new(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body.into())
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/html; charset=utf-8", body.into())
    }
}

/// Where a module writes its response. Only one write is accepted; the slot
/// is consumed exactly once by [`ResponseSlot::close`].
#[derive(Debug, Default)]
pub struct ResponseSlot {
    reply: Option<Reply>,
    cookies: Vec<String>,
}

/// The response as handed to the transport.
#[derive(Debug)]
pub struct Closed {
    pub reply: Option<Reply>,
    pub cookies: Vec<String>,
}

impl ResponseSlot {
    pub fn is_sent(&self) -> bool {
        self.reply.is_some()
    }

    pub fn send(&mut self, reply: Reply) -> Result<()> {
        if self.reply.is_some() {
            return Err(Fault::handler("response already sent"));
        }
        self.reply = Some(reply);
        Ok(())
    }

    pub fn set_cookie(&mut self, value: String) {
        self.cookies.push(value);
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    pub fn close(self) -> Closed {
        Closed {
            reply: self.reply,
            cookies: self.cookies,
        }
    }
}

/// Everything a module sees for one request. Created at dispatch start and
/// dropped when the request ends.
pub struct RequestContext {
    pub request: Request,
    pub app: AppState,
    pub tenant: Arc<TenantConfig>,
    /// Modules available to this tenant.
    pub namespace: Arc<ModuleRegistry>,
    pub session: Arc<Session>,
    /// Shared store, for collaborators that drop sessions (logout).
    pub sessions: Arc<SessionStore>,
    pub module: String,
    pub method: Option<String>,
    pub log: RequestLog,
    pub response: ResponseSlot,
}

impl RequestContext {
    pub fn response_sent(&self) -> bool {
        self.response.is_sent()
    }

    pub fn write_response(
        &mut self,
        body: impl Into<Bytes>,
        content_type: &str,
        status: u16,
    ) -> Result<()> {
        self.response.send(Reply::new(status, content_type, body))
    }
}
