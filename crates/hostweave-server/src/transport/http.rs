//! HTTP adapter: axum request in, dispatcher, axum response out.
//!
//! Responsibilities:
//! - Detach the request from axum (headers, body, peer address)
//! - Run the dispatcher on its own task so it finishes even if the peer hangs up
//! - Close the response exactly once, then emit the access line

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use hostweave_core::error::{Fault, Result};

use crate::context::{Closed, Request};
use crate::dispatch::{pipeline, Dispatcher};

/// Largest request body accepted.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub async fn handle(
    State(dispatcher): State<Dispatcher>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    req: axum::extract::Request,
) -> Response {
    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(%client, uri = %parts.uri, error = %e, "request body unreadable");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let request = detach(&parts, body, client);

    let worker = tokio::spawn(async move {
        let processed = dispatcher.process(request).await;
        let mut log = processed.log;
        let response = match into_http(processed.closed) {
            Ok(r) => r,
            Err(e) => {
                log.append(&format!(" Close failed: {e}"));
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
        pipeline::emit(&log.finish());
        response
    });

    match worker.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%client, error = %e, "request worker failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn detach(parts: &Parts, body: bytes::Bytes, client: SocketAddr) -> Request {
    let raw_url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let mut request = Request::new(parts.method.as_str(), &raw_url, client);
    for (name, value) in &parts.headers {
        if let Ok(v) = value.to_str() {
            request = request.with_header(name.as_str(), v);
        }
    }
    if request.host.is_empty() {
        if let Some(host) = parts.uri.host() {
            request.host = host.to_string();
        }
    }
    request.body = body;
    request
}

/// Turn the closed slot into the wire response.
pub fn into_http(closed: Closed) -> Result<Response> {
    let Closed { reply, cookies } = closed;
    let mut builder = Response::builder();
    for c in cookies {
        builder = builder.header(header::SET_COOKIE, c);
    }
    let Some(reply) = reply else {
        return builder
            .status(StatusCode::OK)
            .body(Body::empty())
            .map_err(|e| Fault::Transport(e.to_string()));
    };

    let status = StatusCode::from_u16(reply.status)
        .map_err(|e| Fault::handler(format!("bad status {}: {e}", reply.status)))?;
    builder = builder
        .status(status)
        .header(header::CONTENT_TYPE, reply.content_type);
    for (k, v) in reply.headers {
        builder = builder.header(k, v);
    }
    builder
        .body(Body::from(reply.body))
        .map_err(|e| Fault::handler(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::context::Reply;

    #[test]
    fn reply_and_cookies_reach_the_wire() {
        let closed = Closed {
            reply: Some(Reply::text(404, "File not found:x")),
            cookies: vec!["session=ABC; Path=/".into()],
        };
        let resp = into_http(closed).unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(header::SET_COOKIE).unwrap(),
            "session=ABC; Path=/"
        );
    }

    #[test]
    fn invalid_status_fails_to_close() {
        let closed = Closed {
            reply: Some(Reply::text(1000, "nope")),
            cookies: Vec::new(),
        };
        assert!(into_http(closed).is_err());
    }

    #[test]
    fn empty_slot_is_an_empty_body() {
        let resp = into_http(Closed {
            reply: None,
            cookies: Vec::new(),
        })
        .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
