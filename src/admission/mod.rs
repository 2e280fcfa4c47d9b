//! Admission-mutation pipeline.
//!
//! One inbound AdmissionReview flows through five stages:
//! - [`review::decode`]: parse and validate the envelope
//! - [`object::extract_pod`]: parse the embedded Pod losslessly
//! - [`MutationPolicy::apply`]: stamp the owner annotation
//! - [`patch::diff`]: diff the original bytes against the mutated Pod
//! - [`response::build`]: assemble the allowing response envelope
//!
//! Every stage is a pure function of its input. Nothing is shared between
//! requests.

pub mod object;
pub mod patch;
pub mod policy;
pub mod response;
pub mod review;

pub use object::{Annotations, PodObject, extract_pod};
pub use policy::{DEFAULT_OWNER, MutationPolicy, OWNER_ANNOTATION};
pub use response::{ASSIGNED_BY_ANNOTATION, DEFAULT_ASSIGNED_BY};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview, PatchType};

use kube::core::admission::Operation;

use crate::error::Result;

/// Outcome of a successful pipeline run
#[derive(Debug, Clone)]
pub struct MutatedReview {
    /// Request UID, for logging
    pub uid: String,
    pub operation: Option<Operation>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub dry_run: bool,
    /// Number of patch operations sent back
    pub patch_operations: usize,
    /// Serialized response envelope
    pub body: Vec<u8>,
}

/// Runs the admission pipeline with a fixed policy
#[derive(Debug, Clone)]
pub struct AdmissionMutator {
    policy: MutationPolicy,
    assigned_by: String,
}

impl Default for AdmissionMutator {
    fn default() -> Self {
        Self::new(MutationPolicy::default(), DEFAULT_ASSIGNED_BY)
    }
}

impl AdmissionMutator {
    pub fn new(policy: MutationPolicy, assigned_by: impl Into<String>) -> Self {
        Self {
            policy,
            assigned_by: assigned_by.into(),
        }
    }

    pub fn policy(&self) -> &MutationPolicy {
        &self.policy
    }

    /// Turn an inbound request body into the serialized response envelope
    pub fn mutate(&self, body: &[u8]) -> Result<MutatedReview> {
        let inbound = review::decode(body)?;
        let request = inbound.request()?;
        let raw_object = request.raw_object()?;

        let pod = extract_pod(raw_object)?;
        let mutated = self.policy.apply(&pod);
        let operations = patch::diff(raw_object, &mutated.to_vec()?)?;

        let outbound = response::build(&inbound, &operations, &self.assigned_by)?;
        let body = response::encode(&outbound)?;

        Ok(MutatedReview {
            uid: request.uid.clone(),
            operation: request.operation.clone(),
            name: request.name.clone(),
            namespace: request.namespace.clone(),
            dry_run: request.dry_run,
            patch_operations: operations.len(),
            body,
        })
    }
}
