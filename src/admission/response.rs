//! Response envelope assembly.

use std::collections::BTreeMap;

use json_patch::PatchOperation;

use super::review::{AdmissionResponse, AdmissionReview, PatchType, ResponseStatus};
use crate::error::{AdmissionError, Result};

/// Audit annotation naming the mutating authority
pub const ASSIGNED_BY_ANNOTATION: &str = "assignedBy";
/// Authority recorded when none is configured
pub const DEFAULT_ASSIGNED_BY: &str = "spectrocloud";
/// Status reported on every response
pub const SUCCESS_STATUS: &str = "Success";

impl ResponseStatus {
    pub fn success() -> Self {
        Self {
            status: SUCCESS_STATUS.to_string(),
            message: None,
        }
    }
}

/// Build the allowing response to `inbound`.
///
/// The UID is copied verbatim from the inbound request. `patch` and
/// `patchType` are set only when `operations` is non-empty. The envelope
/// carries the inbound apiVersion and kind.
pub fn build(
    inbound: &AdmissionReview,
    operations: &[PatchOperation],
    assigned_by: &str,
) -> Result<AdmissionReview> {
    let request = inbound.request()?;

    let (patch, patch_type) = if operations.is_empty() {
        (None, None)
    } else {
        let bytes = serde_json::to_vec(operations).map_err(AdmissionError::Encode)?;
        (Some(bytes), Some(PatchType::JsonPatch))
    };

    let response = AdmissionResponse {
        uid: request.uid.clone(),
        allowed: true,
        result: Some(ResponseStatus::success()),
        patch,
        patch_type,
        audit_annotations: BTreeMap::from([(
            ASSIGNED_BY_ANNOTATION.to_string(),
            assigned_by.to_string(),
        )]),
    };

    Ok(AdmissionReview {
        api_version: Some(inbound.api_version().to_string()),
        kind: Some(inbound.kind().to_string()),
        request: None,
        response: Some(response),
    })
}

/// Serialize an outbound review to wire bytes
pub fn encode(review: &AdmissionReview) -> Result<Vec<u8>> {
    serde_json::to_vec(review).map_err(AdmissionError::Encode)
}
