//! End-to-end: real listener, raw HTTP over TCP.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use hostweave_core::{FaultKind, Result};
use hostweave_server::app_state::AppState;
use hostweave_server::config::AppConfig;
use hostweave_server::context::{Reply, RequestContext};
use hostweave_server::dispatch::{AppModule, ModuleCatalog};
use hostweave_server::server::{Lifecycle, Server};
use hostweave_server::services::HomeModule;
use hostweave_server::templates::BuiltinTemplates;

/// Replies after a fixed delay, to keep a request in flight.
#[derive(Default)]
struct Slow;

#[async_trait]
impl AppModule for Slow {
    async fn call(&mut self, ctx: &mut RequestContext, _: &str, _: Option<&str>) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        ctx.response.send(Reply::text(200, "finished"))
    }
}

fn server_on(listen: &str) -> Server {
    let mut cfg = AppConfig::default();
    cfg.server.listen = listen.to_string();
    let catalog = ModuleCatalog::new();
    let default = catalog.namespace(&cfg.default_tenant.namespace);
    default.register_default::<HomeModule>("home");
    default.register_default::<Slow>("slow");
    let templates = Arc::new(BuiltinTemplates::new().unwrap());
    Server::new(AppState::new(cfg, catalog, templates).unwrap())
}

async fn wait_for_addr(server: &Server) -> SocketAddr {
    for _ in 0..200 {
        if let Some(addr) = server.local_addr() {
            return addr;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server never bound");
}

async fn raw_get(addr: SocketAddr, path: &str, cookie: Option<&str>) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut req = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
    if let Some(c) = cookie {
        req.push_str(&format!("Cookie: {c}\r\n"));
    }
    req.push_str("\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

fn session_cookie(response: &str) -> Option<String> {
    response.lines().find_map(|l| {
        let lower = l.to_ascii_lowercase();
        lower.starts_with("set-cookie: session=").then(|| {
            let value = &l["set-cookie: ".len()..];
            value.split(';').next().unwrap_or_default().to_string()
        })
    })
}

#[tokio::test]
async fn serves_until_stopped() {
    let server = server_on("127.0.0.1:0");
    assert_eq!(server.lifecycle(), Lifecycle::NotStarted);

    let running = server.clone();
    let task = tokio::spawn(async move { running.start().await });
    let addr = wait_for_addr(&server).await;
    assert_eq!(server.lifecycle(), Lifecycle::Running);

    let first = raw_get(addr, "/", None).await;
    assert!(first.starts_with("HTTP/1.1 200"), "response: {first}");
    assert!(first.contains("Visit 1"));
    let cookie = session_cookie(&first).expect("session cookie");
    assert!(first.contains("Path=/; Expires="));

    let second = raw_get(addr, "/home", Some(&cookie)).await;
    assert!(second.contains("Visit 2"), "response: {second}");
    assert_eq!(server.sessions().unwrap().len(), 1);

    let missing = raw_get(addr, "/nothing/here/at/all", None).await;
    assert!(missing.starts_with("HTTP/1.1 404"));
    assert!(missing.contains("File not found:nothing/here/at/all"));

    let failed = raw_get(addr, "/home/nope", Some(&cookie)).await;
    assert!(failed.starts_with("HTTP/1.1 500"));
    assert!(failed.contains("home has no method nope"));

    server.stop();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server stops")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(server.lifecycle(), Lifecycle::Stopped);
    assert!(server.sessions().is_none());
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn stop_lets_in_flight_requests_finish() {
    let server = server_on("127.0.0.1:0");
    let running = server.clone();
    let task = tokio::spawn(async move { running.start().await });
    let addr = wait_for_addr(&server).await;

    let in_flight = tokio::spawn(async move { raw_get(addr, "/slow", None).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.stop();

    let response = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("request completes")
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");
    assert!(response.ends_with("finished"));

    task.await.unwrap().unwrap();
    assert_eq!(server.lifecycle(), Lifecycle::Stopped);
}

#[tokio::test]
async fn home_reset_clears_the_counter() {
    let server = server_on("127.0.0.1:0");
    let running = server.clone();
    let task = tokio::spawn(async move { running.start().await });
    let addr = wait_for_addr(&server).await;

    let first = raw_get(addr, "/home", None).await;
    let cookie = session_cookie(&first).expect("session cookie");
    raw_get(addr, "/home", Some(&cookie)).await;
    let reset = raw_get(addr, "/home/reset", Some(&cookie)).await;
    assert!(reset.contains("Visit 0"), "response: {reset}");
    let again = raw_get(addr, "/", Some(&cookie)).await;
    assert!(again.contains("Visit 1"), "response: {again}");

    server.stop();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn start_twice_is_a_state_fault() {
    let server = server_on("127.0.0.1:0");
    let running = server.clone();
    let task = tokio::spawn(async move { running.start().await });
    wait_for_addr(&server).await;

    let err = server.start().await.unwrap_err();
    assert_eq!(err.kind(), FaultKind::State);

    server.stop();
    task.await.unwrap().unwrap();

    // stopped is terminal
    let err = server.start().await.unwrap_err();
    assert_eq!(err.kind(), FaultKind::State);
}

#[tokio::test]
async fn occupied_port_is_a_bind_fault() {
    let holder = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken = holder.local_addr().unwrap();

    let server = server_on(&taken.to_string());
    let err = server.start().await.unwrap_err();
    assert_eq!(err.kind(), FaultKind::Bind);
    assert_eq!(server.lifecycle(), Lifecycle::Stopped);
}
