//! Contract Test: Image Publish Lifecycle
//!
//! This test verifies the lifecycle operations the orchestration engine
//! relies on.
//!
//! Constraints verified:
//! - create publishes source → target and pins the target repository to its digest
//! - check and diff never touch the registry
//! - update publishes the newly declared source
//! - delete leaves the registry alone
//! - pull trigger changes force replacement, order included
//!
//! If this test fails, deployments can pin a stale or wrong image.

mod common;

use clouddns_core::publish::{
    CheckResult, LifecyclePlan, PublishField, PublishInputs, ResourceState, Transition,
};
use clouddns_core::ImagePublisher;
use common::*;

const DIGEST: &str = "sha256:4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

fn inputs(source: &str, target: &str, triggers: &[&str]) -> PublishInputs {
    PublishInputs {
        source_image: source.to_string(),
        target_image: target.to_string(),
        pull_triggers: triggers.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn create_publishes_and_pins_digest() {
    let registry = RecordingRegistry::new(DIGEST);
    let publisher = ImagePublisher::new(RecordingRegistry::sharing_counters_with(&registry));

    let published = publisher
        .create("service-image", &inputs("img:1", "reg/img:1-abc", &[]))
        .await
        .unwrap();

    assert_eq!(
        registry.calls(),
        vec![
            "pull img:1",
            "tag img:1 reg/img:1-abc",
            "push reg/img:1-abc",
            "inspect reg/img:1-abc",
        ]
    );
    assert_eq!(published.outputs.digest, DIGEST);
    assert_eq!(
        published.outputs.qualified_image_name,
        format!("reg/img@{}", DIGEST)
    );
}

#[tokio::test]
async fn registry_port_survives_qualification() {
    let publisher = ImagePublisher::new(RecordingRegistry::new(DIGEST));

    let published = publisher
        .create("local", &inputs("img:1", "localhost:5000/img:1", &[]))
        .await
        .unwrap();

    assert_eq!(
        published.outputs.qualified_image_name,
        format!("localhost:5000/img@{}", DIGEST)
    );
}

#[tokio::test]
async fn check_and_diff_do_not_touch_registry() {
    let registry = RecordingRegistry::new(DIGEST);
    let publisher = ImagePublisher::new(RecordingRegistry::sharing_counters_with(&registry));
    let published = publisher
        .create("svc", &inputs("img:1", "reg/img:1", &[]))
        .await
        .unwrap();
    let calls_after_create = registry.calls().len();

    let rejected = publisher.check(None, inputs("img:1", "img:1", &[]));
    assert!(!rejected.is_accepted());
    let _ = publisher.diff(&published.outputs, &inputs("img:2", "reg/img:2", &[]));

    assert_eq!(registry.calls().len(), calls_after_create);
}

#[test]
fn check_with_both_empty_reports_both_mandatory_failures() {
    let publisher = ImagePublisher::new(RecordingRegistry::new(DIGEST));

    let CheckResult::Rejected { failures } = publisher.check(None, inputs("", "", &[])) else {
        panic!("empty inputs must be rejected");
    };

    let reasons: Vec<&str> = failures.iter().map(|f| f.reason.as_str()).collect();
    assert!(reasons.contains(&"Source image is mandatory"));
    assert!(reasons.contains(&"Target image is mandatory"));
}

#[tokio::test]
async fn reordered_triggers_force_replacement() {
    let publisher = ImagePublisher::new(RecordingRegistry::new(DIGEST));
    let published = publisher
        .create("svc", &inputs("img:1", "reg/img:1", &["a", "b"]))
        .await
        .unwrap();

    let reordered = publisher.diff(&published.outputs, &inputs("img:1", "reg/img:1", &["b", "a"]));
    assert_eq!(reordered.plan(), LifecyclePlan::Replace);
    assert!(reordered.replaces.contains(&PublishField::PullTriggers));

    let grown = publisher.diff(
        &published.outputs,
        &inputs("img:1", "reg/img:1", &["a", "b", "c"]),
    );
    assert!(grown.replaces.contains(&PublishField::PullTriggers));
    assert_eq!(grown.replaces.len(), 1);
}

#[tokio::test]
async fn update_pulls_newly_declared_source() {
    let registry = RecordingRegistry::new(DIGEST);
    let publisher = ImagePublisher::new(RecordingRegistry::sharing_counters_with(&registry));
    let published = publisher
        .create("svc", &inputs("img:1", "reg/img:1", &[]))
        .await
        .unwrap();

    let outputs = publisher
        .update(&published.id, &published.outputs, &inputs("img:2", "reg/img:2", &[]))
        .await
        .unwrap();

    let calls = registry.calls();
    assert_eq!(&calls[4..6], &["pull img:2", "tag img:2 reg/img:2"]);
    assert_eq!(outputs.source_image, "img:2");
    assert_eq!(outputs.qualified_image_name, format!("reg/img@{}", DIGEST));
}

#[tokio::test]
async fn delete_is_a_no_op() {
    let registry = RecordingRegistry::new(DIGEST);
    let publisher = ImagePublisher::new(RecordingRegistry::sharing_counters_with(&registry));
    let published = publisher
        .create("svc", &inputs("img:1", "reg/img:1", &[]))
        .await
        .unwrap();

    publisher.delete(&published.id, &published.outputs).await.unwrap();

    assert_eq!(registry.push_call_count(), 1);
    assert_eq!(registry.calls().len(), 4);
}

#[tokio::test]
async fn converge_walks_full_lifecycle() {
    let registry = RecordingRegistry::new(DIGEST);
    let publisher = ImagePublisher::new(RecordingRegistry::sharing_counters_with(&registry));
    let mut state = ResourceState::Absent;

    let created = state
        .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &["t1"]))
        .await
        .unwrap();
    assert!(matches!(created, Transition::Created(_)));

    let unchanged = state
        .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &["t1"]))
        .await
        .unwrap();
    assert_eq!(unchanged, Transition::Unchanged);
    assert_eq!(registry.push_call_count(), 1);

    let replaced = state
        .converge(&publisher, "svc", inputs("img:2", "reg/img:2", &["t1"]))
        .await
        .unwrap();
    let Transition::Replaced { previous, current } = replaced else {
        panic!("source change must replace");
    };
    assert_eq!(previous.outputs.source_image, "img:1");
    assert_eq!(current.outputs.source_image, "img:2");
    assert_eq!(registry.push_call_count(), 2);

    let removed = state.remove(&publisher).await.unwrap();
    assert_eq!(removed, Some(current));
    assert_eq!(registry.push_call_count(), 2);
}
