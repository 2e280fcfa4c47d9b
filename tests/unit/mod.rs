// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for pod-owner-webhook.
//!
//! These tests run without a Kubernetes cluster and drive the admission
//! pipeline through its public API with realistic AdmissionReview payloads.

#[path = "../common/mod.rs"]
mod common;

mod pipeline_tests {
    use crate::common::fixtures::{PodBuilder, apply_response, response_of, review_body};
    use pod_owner_webhook::admission::{DEFAULT_OWNER, PatchType};
    use pod_owner_webhook::{AdmissionError, AdmissionMutator, MutationPolicy};
    use serde_json::json;

    #[test]
    fn test_injects_annotation_map_when_absent() {
        let pod = PodBuilder::new("web").namespace("default").build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-1", &pod))
            .unwrap();

        let response = response_of(&result.body);
        let patch: serde_json::Value = serde_json::from_slice(&response.patch.unwrap()).unwrap();
        assert_eq!(
            patch,
            json!([{"op": "add", "path": "/metadata/annotations", "value": {"owner": DEFAULT_OWNER}}])
        );
    }

    #[test]
    fn test_null_annotations_get_add_operation() {
        let pod = PodBuilder::new("w")
            .metadata_field("annotations", serde_json::Value::Null)
            .build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-null", &pod))
            .unwrap();

        let response = response_of(&result.body);
        let patch: serde_json::Value =
            serde_json::from_slice(response.patch.as_ref().unwrap()).unwrap();
        assert_eq!(
            patch,
            json!([{"op": "add", "path": "/metadata/annotations", "value": {"owner": DEFAULT_OWNER}}])
        );
        assert_eq!(
            apply_response(&pod, &response)["metadata"]["annotations"],
            json!({"owner": DEFAULT_OWNER})
        );
    }

    #[test]
    fn test_overwrites_owner_and_keeps_other_annotations() {
        let pod = PodBuilder::new("web")
            .annotation("team", "x")
            .annotation("owner", "someone-else")
            .build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-2", &pod))
            .unwrap();
        let response = response_of(&result.body);

        let patched = apply_response(&pod, &response);
        assert_eq!(
            patched["metadata"]["annotations"],
            json!({"team": "x", "owner": DEFAULT_OWNER})
        );

        let mut expected = pod.clone();
        expected["metadata"]["annotations"]["owner"] = json!(DEFAULT_OWNER);
        assert_eq!(patched, expected);
    }

    #[test]
    fn test_adds_only_owner_key_to_existing_map() {
        let pod = PodBuilder::new("web").annotation("team", "x").build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-3", &pod))
            .unwrap();

        let response = response_of(&result.body);
        let patch: serde_json::Value = serde_json::from_slice(&response.patch.unwrap()).unwrap();
        assert_eq!(
            patch,
            json!([{"op": "add", "path": "/metadata/annotations/owner", "value": DEFAULT_OWNER}])
        );
    }

    #[test]
    fn test_empty_annotation_map_gets_single_key() {
        let pod = PodBuilder::new("web").empty_annotations().build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-4", &pod))
            .unwrap();

        assert_eq!(result.patch_operations, 1);
        let patched = apply_response(&pod, &response_of(&result.body));
        assert_eq!(patched["metadata"]["annotations"], json!({"owner": DEFAULT_OWNER}));
    }

    #[test]
    fn test_compliant_pod_gets_no_patch() {
        let pod = PodBuilder::new("web").annotation("owner", DEFAULT_OWNER).build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-5", &pod))
            .unwrap();

        let response = response_of(&result.body);
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
    }

    #[test]
    fn test_patch_type_present_iff_patch_present() {
        let mutator = AdmissionMutator::default();
        let pods = [
            PodBuilder::new("a").build(),
            PodBuilder::new("b").annotation("owner", DEFAULT_OWNER).build(),
            PodBuilder::new("c").annotation("owner", "other").build(),
        ];

        for pod in &pods {
            let response = response_of(&mutator.mutate(&review_body("u", pod)).unwrap().body);
            match &response.patch {
                Some(_) => assert_eq!(response.patch_type, Some(PatchType::JsonPatch)),
                None => assert!(response.patch_type.is_none()),
            }
        }
    }

    #[test]
    fn test_uid_echoed_exactly() {
        let pod = PodBuilder::new("web").build();
        for uid in ["abc-123", "ABC-123", "705ab4f5-6393-11e8-b7cc-42010a800002", ""] {
            let result = AdmissionMutator::default()
                .mutate(&review_body(uid, &pod))
                .unwrap();
            assert_eq!(response_of(&result.body).uid, uid);
        }
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let pod = PodBuilder::new("web")
            .metadata_field("x-vendor", json!({"nested": {"deep": [1, {"k": "v"}]}}))
            .field("futureTopLevel", json!({"enabled": true}))
            .spec(json!({
                "containers": [{"name": "app", "image": "nginx", "x-unknown": [null, 1.5]}],
                "someNewSpecField": {"a": [1, 2, 3]}
            }))
            .build();
        let result = AdmissionMutator::default()
            .mutate(&review_body("uid-6", &pod))
            .unwrap();

        assert_eq!(result.patch_operations, 1);
        let patched = apply_response(&pod, &response_of(&result.body));

        let mut expected = pod.clone();
        expected["metadata"]["annotations"] = json!({"owner": DEFAULT_OWNER});
        assert_eq!(patched, expected);
    }

    #[test]
    fn test_audit_annotation_and_status() {
        let mutator = AdmissionMutator::new(MutationPolicy::new("platform"), "acme-corp");
        let pod = PodBuilder::new("web").build();
        let response = response_of(&mutator.mutate(&review_body("u", &pod)).unwrap().body);

        assert_eq!(response.audit_annotations.get("assignedBy").unwrap(), "acme-corp");
        assert_eq!(response.result.unwrap().status, "Success");
    }

    #[test]
    fn test_malformed_inputs() {
        let mutator = AdmissionMutator::default();

        let err = mutator.mutate(b"").unwrap_err();
        assert!(matches!(err, AdmissionError::Decode(_)));

        let err = mutator.mutate(b"{not json").unwrap_err();
        assert!(matches!(err, AdmissionError::Decode(_)));

        let err = mutator.mutate(br#"{"request": null}"#).unwrap_err();
        assert!(matches!(err, AdmissionError::MissingRequest));
    }

    #[test]
    fn test_identical_requests_give_identical_responses() {
        let pod = PodBuilder::new("web")
            .label("app", "web")
            .annotation("b", "2")
            .annotation("a", "1")
            .build();
        let body = review_body("uid-7", &pod);
        let mutator = AdmissionMutator::default();

        let first = mutator.mutate(&body).unwrap();
        let second = mutator.mutate(&body).unwrap();
        assert_eq!(first.body, second.body);
    }
}

mod policy_tests {
    use crate::common::fixtures::PodBuilder;
    use pod_owner_webhook::admission::patch::{diff, diff_values};
    use pod_owner_webhook::admission::{MutationPolicy, extract_pod};

    #[test]
    fn test_policy_idempotent_and_rediff_empty() {
        let pod = PodBuilder::new("web").annotation("team", "x").build();
        let raw = serde_json::to_vec(&pod).unwrap();
        let policy = MutationPolicy::default();

        let once = policy.apply(&extract_pod(&raw).unwrap());
        let twice = policy.apply(&once);
        assert_eq!(once, twice);

        let mutated = once.to_vec().unwrap();
        assert!(diff(&mutated, &mutated).unwrap().is_empty());
        assert!(diff_values(once.document(), twice.document()).is_empty());
    }

    #[test]
    fn test_diff_is_byte_order_insensitive() {
        let a = br#"{"metadata": {"name": "web", "labels": {"x": "1"}}, "kind": "Pod"}"#;
        let b = br#"{"kind":"Pod","metadata":{"labels":{"x":"1"},"name":"web"}}"#;
        assert!(diff(a, b).unwrap().is_empty());
    }
}

mod config_tests {
    use pod_owner_webhook::WebhookConfig;

    #[test]
    fn test_config_builds_mutator() {
        let config = WebhookConfig {
            owner: "sre".to_string(),
            ..Default::default()
        };
        assert_eq!(config.mutator().policy().value(), "sre");
        assert_eq!(config.mutator().policy().key(), "owner");
    }
}
