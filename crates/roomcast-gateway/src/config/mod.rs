//! Gateway config loader (strict parsing + environment overrides).

pub mod schema;

use std::fs;

use roomcast_core::error::{Result, RoomcastError};

pub use schema::{AuthSection, BackboneSection, GatewayConfig, GatewaySection};

/// Optional YAML file consulted by [`load`].
pub const ENV_CONFIG_PATH: &str = "ROOMCAST_CONFIG";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RoomcastError::Internal(format!("read config failed: {e}")))?;
    parse(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<GatewayConfig> {
    serde_yaml::from_str(s).map_err(|e| RoomcastError::BadRequest(format!("invalid yaml: {e}")))
}

/// Startup configuration: file (if `ROOMCAST_CONFIG` is set) or defaults,
/// then environment overrides, then validation.
pub fn load() -> Result<GatewayConfig> {
    load_with(|k| std::env::var(k).ok())
}

pub fn load_with<F>(lookup: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match lookup(ENV_CONFIG_PATH).filter(|p| !p.is_empty()) {
        Some(path) => load_from_file(&path)?,
        None => GatewayConfig::default(),
    };
    cfg.apply_env(lookup);
    cfg.validate()?;
    Ok(cfg)
}
