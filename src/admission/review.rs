//! AdmissionReview wire types and the envelope decoder.
//!
//! The embedded object is kept as a [`RawValue`] so the exact bytes the API
//! server sent are available to the patch generator.

use std::collections::BTreeMap;

use kube::core::admission::Operation;
use kube::core::{GroupVersionKind, GroupVersionResource};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{AdmissionError, Result};

/// Current admission API version
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
/// Legacy admission API version, still registered by older webhook configurations
pub const ADMISSION_API_VERSION_V1BETA1: &str = "admission.k8s.io/v1beta1";
/// Envelope kind for both directions
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

const SUPPORTED_API_VERSIONS: [&str; 2] = [ADMISSION_API_VERSION, ADMISSION_API_VERSION_V1BETA1];

/// Envelope exchanged with the API server.
///
/// Inbound reviews carry a `request`, outbound reviews carry a `response`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionReview {
    /// The request carried by this review
    pub fn request(&self) -> Result<&AdmissionRequest> {
        self.request.as_ref().ok_or(AdmissionError::MissingRequest)
    }

    /// API version to answer with; the inbound version when present
    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(ADMISSION_API_VERSION)
    }

    /// Kind to answer with; always `AdmissionReview` once the schema check passed
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(ADMISSION_REVIEW_KIND)
    }

    fn check_schema(&self) -> Result<()> {
        if let Some(api_version) = &self.api_version {
            if !SUPPORTED_API_VERSIONS.contains(&api_version.as_str()) {
                return Err(AdmissionError::Decode(format!(
                    "unsupported apiVersion {api_version:?}, expected one of {SUPPORTED_API_VERSIONS:?}"
                )));
            }
        }
        if let Some(kind) = &self.kind {
            if kind != ADMISSION_REVIEW_KIND {
                return Err(AdmissionError::Decode(format!(
                    "unexpected kind {kind:?}, expected {ADMISSION_REVIEW_KIND:?}"
                )));
            }
        }
        Ok(())
    }
}

/// The admission request issued by the API server.
///
/// Only the fields this webhook reads are modeled; the rest are ignored.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Correlation id, echoed verbatim in the response
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GroupVersionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<GroupVersionResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub dry_run: bool,
    /// The target object exactly as received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Box<RawValue>>,
}

impl AdmissionRequest {
    /// Raw bytes of the embedded object.
    ///
    /// A request without an object (or with `null`) cannot be mutated.
    pub fn raw_object(&self) -> Result<&[u8]> {
        self.object
            .as_deref()
            .map(|raw| raw.get().as_bytes())
            .ok_or_else(|| AdmissionError::Decode("request does not contain an object".to_string()))
    }
}

/// The webhook's answer to an [`AdmissionRequest`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResponseStatus>,
    /// JSON Patch document; base64 on the wire
    #[serde(
        default,
        with = "base64_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub patch: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub audit_annotations: BTreeMap<String, String>,
}

/// Status summary attached to a response
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Patch encodings accepted by the API server
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

/// Decode an inbound request body into a validated [`AdmissionReview`].
///
/// Fails with [`AdmissionError::Decode`] when the body is not a well-formed
/// review of a supported version, and with [`AdmissionError::MissingRequest`]
/// when the review carries no request.
pub fn decode(body: &[u8]) -> Result<AdmissionReview> {
    let review: AdmissionReview =
        serde_json::from_slice(body).map_err(|e| AdmissionError::Decode(e.to_string()))?;
    review.check_schema()?;
    review.request()?;
    Ok(review)
}

/// Kubernetes encodes `[]byte` fields as base64 strings.
mod base64_patch {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(patch: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match patch {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
            .transpose()
    }
}
