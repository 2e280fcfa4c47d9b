//! Webhook module for mutating admission requests.
//!
//! Hosts the HTTP boundary in front of the admission pipeline: request
//! logging, the /mutate handler, the root liveness echo and TLS serving.
//! Pipeline errors are turned into JSON error responses here.

mod server;

pub use server::{WebhookError, WebhookState, create_webhook_router, run_webhook_server};
