//! pod-owner-webhook library crate
//!
//! A Kubernetes mutating admission webhook that stamps an `owner`
//! annotation onto every admitted Pod. This module exports the admission
//! pipeline, configuration, and the webhook and health servers.

pub mod admission;
pub mod config;
pub mod error;
pub mod health;
pub mod webhooks;

pub use admission::{AdmissionMutator, MutatedReview, MutationPolicy};
pub use config::{
    HEALTH_PORT, REQUEST_TIMEOUT_SECS, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
    WebhookConfig,
};
pub use error::{AdmissionError, Result};
pub use health::HealthState;
pub use webhooks::{WebhookError, run_webhook_server};
