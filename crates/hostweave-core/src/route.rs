//! URL path to module/method resolution.
//!
//! Urls of the form `/module[/method][.html]` name an application module.
//! Everything else (file names with an extension, deeper paths) is a static
//! file request.

/// Module name used when the path is empty.
pub const HOME_MODULE: &str = "home";

/// Sentinel module name of the built-in static-file handler.
pub const FILE_SENDER: &str = "FileSender";

const HTML_SUFFIX: &str = ".html";

/// A module invocation candidate parsed from the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub module: String,
    pub method: Option<String>,
}

/// Result of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePath {
    /// Decoded path without the leading `/` (`home` for an empty path).
    pub file: String,
    /// Present only when the path has module shape (1 or 2 segments).
    pub target: Option<Target>,
}

/// Percent-decode a raw URL path. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_path(raw: &str) -> String {
    let bytes = urlencoding::decode_binary(raw.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Resolve an already-decoded path.
pub fn resolve(decoded: &str) -> RoutePath {
    let file = decoded.strip_prefix('/').unwrap_or(decoded);
    let file = if file.is_empty() { HOME_MODULE } else { file };

    let base = file.strip_suffix(HTML_SUFFIX).unwrap_or(file);
    let target = if base.contains('.') {
        None
    } else {
        split_target(base)
    };

    RoutePath {
        file: file.to_string(),
        target,
    }
}

fn split_target(base: &str) -> Option<Target> {
    let parts: Vec<&str> = base.split('/').collect();
    match parts.as_slice() {
        [module] if !module.is_empty() => Some(Target {
            module: (*module).to_string(),
            method: None,
        }),
        [module, method] if !module.is_empty() => Some(Target {
            module: (*module).to_string(),
            method: (!method.is_empty()).then(|| (*method).to_string()),
        }),
        _ => None,
    }
}

/// Module names may carry a `Module` suffix; the call sees the bare name.
pub fn call_name(module: &str) -> &str {
    match module.strip_suffix("Module") {
        Some(bare) if !bare.is_empty() => bare,
        _ => module,
    }
}
