#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hostweave_core::FaultKind;
use hostweave_server::config;
use hostweave_server::session::SessionStore;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8080"
tenants:
  - server_name: "shop.example.com"
    namespaec: "shop" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.session_ttl_minutes, 30);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.default_tenant.namespace, "default");
    assert!(cfg.tenants.is_empty());
    assert!(cfg.server.request_timeout().is_none());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9000"
  session_ttl_minutes: 60
  sweep_interval_secs: 120
  session_logging: true
  request_timeout_ms: 5000
  site_root: "/srv/sites"
logging:
  dir: "/var/log/hostweave"
  filter: "debug"
default_tenant:
  server_name: "main.example.com"
tenants:
  - server_name: "shop.example.com"
    server_alias: "*.shop.example.com shop.test"
    namespace: "shop"
    title: "Shop"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.session_ttl().as_secs(), 3600);
    assert_eq!(cfg.server.sweep_interval().as_secs(), 120);
    assert!(cfg.server.session_logging);
    assert_eq!(cfg.server.request_timeout().unwrap().as_millis(), 5000);
    assert_eq!(cfg.logging.dir.as_deref(), Some("/var/log/hostweave"));
    assert_eq!(cfg.default_tenant.server_name, "main.example.com");
    assert_eq!(cfg.tenants[0].namespace, "shop");
    assert_eq!(cfg.tenants[0].email, "root@localhost");
}

#[test]
fn sweep_interval_must_not_exceed_ttl() {
    let bad = r#"
version: 1
server:
  session_ttl_minutes: 1
  sweep_interval_secs: 61
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind(), FaultKind::Config);
}

#[test]
fn zero_ttl_rejected() {
    let bad = "version: 1\nserver:\n  session_ttl_minutes: 0\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn bad_listen_rejected() {
    let bad = "version: 1\nserver:\n  listen: \"not-an-addr\"\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn unsupported_version_rejected() {
    assert!(config::load_from_str("version: 2\n").is_err());
}

#[test]
fn missing_file_is_a_config_fault() {
    let err = config::load_from_file("/definitely/not/here.yaml").expect_err("must fail");
    assert_eq!(err.kind(), FaultKind::Config);
}

#[test]
fn huge_ttl_rejected_without_overflow() {
    for minutes in ["18446744073709551615", "1000000000000"] {
        let bad = format!("version: 1\nserver:\n  session_ttl_minutes: {minutes}\n");
        let err = config::load_from_str(&bad).expect_err("must fail");
        assert_eq!(err.kind(), FaultKind::Config);
    }
}

#[test]
fn longest_ttl_still_creates_sessions() {
    let ok = format!(
        "version: 1\nserver:\n  session_ttl_minutes: {}\n",
        config::MAX_SESSION_TTL_MINUTES
    );
    let cfg = config::load_from_str(&ok).expect("must parse");
    let store = SessionStore::new(cfg.server.session_ttl());
    let s = store.create();
    assert!(s.expires() > chrono::Utc::now() + chrono::Duration::days(365));
}

#[test]
fn aliases_compile_to_anchored_patterns() {
    let ok = r#"
version: 1
tenants:
  - server_name: "shop.example.com"
    server_alias: "*.shop.example.com shop-?.test"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let re = cfg.tenants[0].alias_pattern().unwrap().expect("has aliases");
    assert!(re.is_match("EU.shop.example.com"));
    assert!(re.is_match("shop-1.test"));
    assert!(!re.is_match("shop-12.test"));
    assert!(!re.is_match("xshop.example.com.evil"));
    assert!(config::TenantConfig::default().alias_pattern().unwrap().is_none());
}
