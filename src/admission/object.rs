//! Pod extraction from the raw admission object.
//!
//! The raw bytes are decoded twice: once into a lossless [`Value`] that
//! carries every field the API server sent, and once into a typed
//! [`Pod`] to validate the shape and read the annotation map. Only the
//! annotation sub-tree of the lossless document is ever rewritten.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AdmissionError, Result};

/// Annotation mapping of a Pod, which may not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Annotations {
    #[default]
    Absent,
    Present(BTreeMap<String, String>),
}

impl Annotations {
    /// Return the mapping, creating an empty one if absent
    pub fn ensure_present(self) -> BTreeMap<String, String> {
        match self {
            Annotations::Absent => BTreeMap::new(),
            Annotations::Present(map) => map,
        }
    }

    /// Look up a single annotation
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Annotations::Absent => None,
            Annotations::Present(map) => map.get(key).map(String::as_str),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Annotations::Absent)
    }
}

impl From<Option<BTreeMap<String, String>>> for Annotations {
    fn from(map: Option<BTreeMap<String, String>>) -> Self {
        map.map_or(Annotations::Absent, Annotations::Present)
    }
}

/// A Pod as received, plus a typed view of its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct PodObject {
    document: Value,
    annotations: Annotations,
}

impl PodObject {
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// The full object, including fields this crate does not model
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Copy of this Pod with `annotations` spliced into `metadata.annotations`.
    ///
    /// Every sibling field is carried over untouched. A missing or non-object
    /// `metadata` is replaced by an object holding only the annotations.
    pub fn with_annotations(&self, annotations: BTreeMap<String, String>) -> PodObject {
        let mut document = self.document.clone();
        if let Value::Object(root) = &mut document {
            let metadata = root
                .entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()));
            if !metadata.is_object() {
                *metadata = Value::Object(Map::new());
            }
            if let Value::Object(metadata) = metadata {
                let encoded = annotations
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                metadata.insert("annotations".to_string(), Value::Object(encoded));
            }
        }

        PodObject {
            document,
            annotations: Annotations::Present(annotations),
        }
    }

    /// Serialize the full document back to JSON bytes
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.document).map_err(AdmissionError::Encode)
    }
}

/// Parse the raw admission object into a [`PodObject`].
///
/// Fails with [`AdmissionError::Decode`] if the bytes are not JSON or do not
/// have the shape of a Pod.
pub fn extract_pod(raw: &[u8]) -> Result<PodObject> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| AdmissionError::Decode(format!("unable to parse object: {e}")))?;
    let pod = Pod::deserialize(&document)
        .map_err(|e| AdmissionError::Decode(format!("object is not a Pod: {e}")))?;

    Ok(PodObject {
        annotations: pod.metadata.annotations.into(),
        document,
    })
}
