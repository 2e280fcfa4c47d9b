//! Shared helpers for the integration test targets.
