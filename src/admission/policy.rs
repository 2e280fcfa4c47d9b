//! Owner annotation mutation policy.
//!
//! Ensures every Pod carries `owner: <value>`, overwriting any existing
//! owner. All other annotations and fields are left alone.

use super::object::PodObject;

/// Annotation key written by the policy
pub const OWNER_ANNOTATION: &str = "owner";
/// Owner written when none is configured
pub const DEFAULT_OWNER: &str = "devang";

/// Sets a single annotation on every admitted Pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPolicy {
    key: String,
    value: String,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OWNER)
    }
}

impl MutationPolicy {
    /// Policy that sets `owner` to `owner`
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            key: OWNER_ANNOTATION.to_string(),
            value: owner.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Compute the mutated form of `pod`. Total and idempotent.
    pub fn apply(&self, pod: &PodObject) -> PodObject {
        let mut annotations = pod.annotations().clone().ensure_present();
        annotations.insert(self.key.clone(), self.value.clone());
        pod.with_annotations(annotations)
    }
}
