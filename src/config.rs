//! Process configuration.
//!
//! Read once at start-up from flags or environment. Only the owner value
//! and audit authority reach the admission pipeline; everything else is
//! consumed by the HTTP boundary.

use std::path::Path;
use std::time::Duration;

use clap::Parser;

use crate::admission::{AdmissionMutator, DEFAULT_ASSIGNED_BY, DEFAULT_OWNER, MutationPolicy};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;
/// Default health/metrics server port
pub const HEALTH_PORT: u16 = 8080;
/// Default deadline for reading, handling and answering one request
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// pod-owner-webhook - stamps an owner annotation onto every admitted Pod
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pod-owner-webhook", version, about, long_about = None)]
pub struct WebhookConfig {
    /// Enable verbose logs
    #[arg(long, env = "WEBHOOK_DEBUG")]
    pub debug: bool,

    /// Port for the admission webhook listener
    #[arg(long, env = "WEBHOOK_PORT", default_value_t = WEBHOOK_PORT)]
    pub port: u16,

    /// Port for /healthz, /readyz and /metrics
    #[arg(long, env = "HEALTH_PORT", default_value_t = HEALTH_PORT)]
    pub health_port: u16,

    /// Seconds a single request may take before it is answered with 408
    #[arg(long, env = "WEBHOOK_REQUEST_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// TLS certificate (PEM)
    #[arg(long, env = "WEBHOOK_TLS_CERT", default_value = WEBHOOK_CERT_PATH)]
    pub tls_cert: String,

    /// TLS private key (PEM)
    #[arg(long, env = "WEBHOOK_TLS_KEY", default_value = WEBHOOK_KEY_PATH)]
    pub tls_key: String,

    /// Value written to the `owner` annotation
    #[arg(long, env = "OWNER_ANNOTATION_VALUE", default_value = DEFAULT_OWNER)]
    pub owner: String,

    /// Authority recorded in the `assignedBy` audit annotation
    #[arg(long, env = "ASSIGNED_BY", default_value = DEFAULT_ASSIGNED_BY)]
    pub assigned_by: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            debug: false,
            port: WEBHOOK_PORT,
            health_port: HEALTH_PORT,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            tls_cert: WEBHOOK_CERT_PATH.to_string(),
            tls_key: WEBHOOK_KEY_PATH.to_string(),
            owner: DEFAULT_OWNER.to_string(),
            assigned_by: DEFAULT_ASSIGNED_BY.to_string(),
        }
    }
}

impl WebhookConfig {
    /// Log level for this crate's spans and events
    pub fn log_level(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Both TLS files exist on disk
    pub fn tls_available(&self) -> bool {
        Path::new(&self.tls_cert).exists() && Path::new(&self.tls_key).exists()
    }

    /// Build the admission pipeline for this configuration
    pub fn mutator(&self) -> AdmissionMutator {
        AdmissionMutator::new(MutationPolicy::new(self.owner.as_str()), self.assigned_by.as_str())
    }
}
