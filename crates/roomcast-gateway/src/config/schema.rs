use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use roomcast_core::error::{Result, RoomcastError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub backbone: BackboneSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            gateway: GatewaySection::default(),
            auth: AuthSection::default(),
            backbone: BackboneSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RoomcastError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.backbone.validate()?;
        Ok(())
    }

    /// Apply environment-style overrides. `lookup` is `std::env::var` in the
    /// binary and a map in tests. Empty values are applied as-is: an empty
    /// secret means anonymous mode, an empty url disables the backbone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_JWT_SECRET) {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup(ENV_NATS_URL) {
            self.backbone.url = url;
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR).filter(|a| !a.is_empty()) {
            self.gateway.listen = normalize_listen(&addr);
        }
    }
}

pub const ENV_JWT_SECRET: &str = "REALTIME_JWT_SECRET";
pub const ENV_NATS_URL: &str = "NATS_URL";
pub const ENV_LISTEN_ADDR: &str = "REALTIME_ADDR";

/// `:8081` binds every interface.
fn normalize_listen(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    #[serde(default = "default_fanout_timeout_ms")]
    pub fanout_timeout_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            fanout_timeout_ms: default_fanout_timeout_ms(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(1000..=300_000).contains(&self.keepalive_interval_ms) {
            return Err(RoomcastError::BadRequest(
                "gateway.keepalive_interval_ms must be between 1000 and 300000".into(),
            ));
        }
        if !(100..=60_000).contains(&self.fanout_timeout_ms) {
            return Err(RoomcastError::BadRequest(
                "gateway.fanout_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if !(1..=65_536).contains(&self.outbound_queue) {
            return Err(RoomcastError::BadRequest(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RoomcastError::BadRequest(format!("gateway.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn fanout_timeout(&self) -> Duration {
        Duration::from_millis(self.fanout_timeout_ms)
    }
}

fn default_version() -> u32 {
    1
}
fn default_listen() -> String {
    "0.0.0.0:8081".into()
}
fn default_keepalive_interval_ms() -> u64 {
    25_000
}
fn default_fanout_timeout_ms() -> u64 {
    5_000
}
fn default_outbound_queue() -> usize {
    256
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    /// HMAC verification secret. Empty means anonymous (development) mode.
    #[serde(default)]
    pub jwt_secret: String,
}

impl fmt::Debug for AuthSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.jwt_secret.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("AuthSection").field("jwt_secret", &secret).finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackboneSection {
    /// Backbone address. Empty disables the backbone (local-only mode).
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_backbone_name")]
    pub name: String,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

impl Default for BackboneSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            name: default_backbone_name(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl BackboneSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=50).contains(&self.connect_attempts) {
            return Err(RoomcastError::BadRequest(
                "backbone.connect_attempts must be between 1 and 50".into(),
            ));
        }
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

fn default_backbone_name() -> String {
    "roomcast-gateway".into()
}
fn default_connect_attempts() -> u32 {
    5
}
