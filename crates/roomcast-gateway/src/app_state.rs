//! Shared application state for the gateway.
//!
//! Built once at startup from a validated config; every component that needs
//! the room registry gets it from here by reference, never from a global.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use roomcast_core::error::Result;

use crate::auth::IdentityResolver;
use crate::backbone::{Backbone, BackboneBridge};
use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::obs::GatewayMetrics;
use crate::realtime::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<RoomRegistry>,
    bridge: Arc<BackboneBridge>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<GatewayMetrics>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    resolver: IdentityResolver,
    shutdown: CancellationToken,
}

impl AppState {
    /// Build application state. `backbone` is `None` in local-only mode.
    pub fn new(cfg: GatewayConfig, backbone: Option<Arc<dyn Backbone>>) -> Result<Self> {
        cfg.validate()?;

        let metrics = Arc::new(GatewayMetrics::default());
        let registry = Arc::new(RoomRegistry::new());
        let bridge = Arc::new(BackboneBridge::new(
            backbone,
            Arc::clone(&registry),
            cfg.gateway.fanout_timeout(),
            Arc::clone(&metrics),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&bridge),
            Arc::clone(&metrics),
        ));

        let resolver = IdentityResolver::new(cfg.auth.jwt_secret.clone());
        if resolver.is_anonymous() {
            tracing::warn!("no verification secret configured; all clients resolve to the anonymous identity");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                resolver,
                shutdown: CancellationToken::new(),
            }),
            registry,
            bridge,
            dispatcher,
            metrics,
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.inner.resolver
    }

    /// Root cancellation scope; every session runs under a child of it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn bridge(&self) -> Arc<BackboneBridge> {
        Arc::clone(&self.bridge)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("roomcast_rooms", self.registry.room_count() as u64)]
    }
}
