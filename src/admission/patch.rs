//! Structural JSON diff producing RFC 6902 patch operations.
//!
//! Objects are compared key by key and arrays index by index; only subtrees
//! that differ produce operations. The output order depends only on the
//! inputs:
//! - object keys are visited in sorted order
//! - surplus array elements are removed from the highest index down
//! - new array elements are appended from the lowest index up
//!
//! so applying the operations in sequence always reproduces the target.

use std::collections::BTreeSet;

use json_patch::{AddOperation, PatchOperation, RemoveOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::{Map, Value};

use crate::error::{AdmissionError, Result};

/// Diff two serialized JSON documents.
///
/// Fails with [`AdmissionError::Diff`] only if either side is not valid JSON.
/// Identical documents yield an empty sequence.
pub fn diff(original: &[u8], mutated: &[u8]) -> Result<Vec<PatchOperation>> {
    let original: Value = serde_json::from_slice(original).map_err(AdmissionError::Diff)?;
    let mutated: Value = serde_json::from_slice(mutated).map_err(AdmissionError::Diff)?;
    Ok(diff_values(&original, &mutated))
}

/// Diff two parsed JSON documents
pub fn diff_values(original: &Value, mutated: &Value) -> Vec<PatchOperation> {
    let mut operations = Vec::new();
    let mut path = PointerBuf::root();
    diff_into(&mut operations, &mut path, original, mutated);
    operations
}

fn diff_into(
    ops: &mut Vec<PatchOperation>,
    path: &mut PointerBuf,
    original: &Value,
    mutated: &Value,
) {
    if original == mutated {
        return;
    }

    match (original, mutated) {
        (Value::Object(original), Value::Object(mutated)) => {
            diff_objects(ops, path, original, mutated);
        }
        (Value::Array(original), Value::Array(mutated)) => {
            diff_arrays(ops, path, original, mutated);
        }
        _ => ops.push(PatchOperation::Replace(ReplaceOperation {
            path: path.clone(),
            value: mutated.clone(),
        })),
    }
}

fn diff_objects(
    ops: &mut Vec<PatchOperation>,
    path: &mut PointerBuf,
    original: &Map<String, Value>,
    mutated: &Map<String, Value>,
) {
    let keys: BTreeSet<&str> = original
        .keys()
        .chain(mutated.keys())
        .map(String::as_str)
        .collect();

    for key in keys {
        path.push_back(key);
        match (original.get(key), mutated.get(key)) {
            // A null member counts as unset, and `add` overwrites it
            (Some(Value::Null), Some(to)) if !to.is_null() => {
                ops.push(PatchOperation::Add(AddOperation {
                    path: path.clone(),
                    value: to.clone(),
                }));
            }
            (Some(from), Some(to)) => diff_into(ops, path, from, to),
            (Some(_), None) => ops.push(PatchOperation::Remove(RemoveOperation {
                path: path.clone(),
            })),
            (None, Some(to)) => ops.push(PatchOperation::Add(AddOperation {
                path: path.clone(),
                value: to.clone(),
            })),
            (None, None) => {}
        }
        path.pop_back();
    }
}

fn diff_arrays(
    ops: &mut Vec<PatchOperation>,
    path: &mut PointerBuf,
    original: &[Value],
    mutated: &[Value],
) {
    let common = original.len().min(mutated.len());

    for (index, (from, to)) in original.iter().zip(mutated).enumerate() {
        path.push_back(index);
        diff_into(ops, path, from, to);
        path.pop_back();
    }

    // Removing from the end keeps the remaining indices valid
    for index in (common..original.len()).rev() {
        path.push_back(index);
        ops.push(PatchOperation::Remove(RemoveOperation { path: path.clone() }));
        path.pop_back();
    }

    for (index, to) in mutated.iter().enumerate().skip(common) {
        path.push_back(index);
        ops.push(PatchOperation::Add(AddOperation {
            path: path.clone(),
            value: to.clone(),
        }));
        path.pop_back();
    }
}
