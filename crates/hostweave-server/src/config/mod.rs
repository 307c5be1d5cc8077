//! Server config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use hostweave_core::error::{Fault, Result};

pub use schema::{AppConfig, LoggingSection, ServerSection, TenantConfig, MAX_SESSION_TTL_MINUTES};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| Fault::Config(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig =
        serde_yaml::from_str(s).map_err(|e| Fault::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
