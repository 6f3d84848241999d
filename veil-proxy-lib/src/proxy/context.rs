use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::policy::PolicyEngine;
use crate::proxy::client::{build_upstream_client, UpstreamClient};
use crate::rewrite::RewritePipeline;
use crate::telemetry::Metrics;

/// Process-wide state shared by every connection
pub struct ProxyState {
    pub config: Arc<Config>,
    pub client: UpstreamClient,
    pub policy: PolicyEngine,
    pub pipeline: RewritePipeline,
    pub metrics: Option<Arc<Metrics>>,
}

impl ProxyState {
    pub fn new(config: Arc<Config>, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        Self::with_policy(Arc::clone(&config), PolicyEngine::from_config(&config), metrics)
    }

    /// State with a caller-provided policy engine (custom cookie store or
    /// fingerprint source).
    pub fn with_policy(config: Arc<Config>, policy: PolicyEngine, metrics: Option<Arc<Metrics>>) -> Result<Self> {
        let client = build_upstream_client(&config.timeout)?;
        let pipeline = RewritePipeline::new(&config.rewrite);
        Ok(Self { config, client, policy, pipeline, metrics })
    }

    /// Origin that proxied URLs are built on: `public_origin` when set,
    /// otherwise `http://{host}` of the inbound request.
    pub fn proxy_base(&self, host: Option<&str>) -> Option<String> {
        match &self.config.public_origin {
            Some(origin) => Some(origin.trim_end_matches('/').to_string()),
            None => host.filter(|h| !h.is_empty()).map(|h| format!("http://{h}")),
        }
    }
}
