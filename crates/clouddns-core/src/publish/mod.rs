//! Image publish resource provider
//!
//! A declarative resource that copies a container image from a source
//! reference to a target reference and exposes the target's content digest,
//! so dependent resources can pin the exact image that was published.
//!
//! ## Lifecycle
//!
//! The provider is driven by an external orchestration engine which owns
//! the persisted inputs and outputs between calls:
//!
//! - [`ImagePublisher::check`]: validate proposed inputs (pure)
//! - [`ImagePublisher::diff`]: decide replace vs. update vs. nothing (pure)
//! - [`ImagePublisher::create`]: pull → tag → push → inspect
//! - [`ImagePublisher::update`]: same sequence, keeps the resource id
//! - [`ImagePublisher::read`]: identity; no drift detection
//! - [`ImagePublisher::delete`]: no-op; published images are retained
//!
//! [`ResourceState`] strings these together for callers that hold the state
//! themselves.
//!
//! ## Pull triggers
//!
//! `pullTriggers` is an opaque ordered list. Its values carry no meaning;
//! any positional difference from the previous list forces a fresh publish,
//! which lets an upstream digest observation cascade a republish without
//! editing the image references.

pub mod state;

pub use state::{ResourceState, Transition};

use crate::error::{Error, Result};
use crate::reference;
use crate::traits::RegistryClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Type token prefixed to every resource id
pub const RESOURCE_TYPE: &str = "image-publish:PublishImage";

/// Declared inputs of a publish resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishInputs {
    /// Image to copy, e.g. `zaripych/dynamic-cloud-dns:1.2.0`
    #[serde(default)]
    pub source_image: String,
    /// Name to publish it under, e.g. `gcr.io/p/dynamic-cloud-dns:1.2.0`
    #[serde(default)]
    pub target_image: String,
    /// Opaque fingerprints; any change forces a republish
    #[serde(default)]
    pub pull_triggers: Vec<String>,
}

/// Outputs of a published resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutputs {
    /// Source image the outputs were produced from
    pub source_image: String,
    /// Target image that was pushed
    pub target_image: String,
    /// Trigger list the publish ran with, compared by the next diff
    #[serde(default)]
    pub pull_triggers: Vec<String>,
    /// Registry content digest of the pushed target, `sha256:…`
    pub digest: String,
    /// Target repository pinned to the digest, `repo@sha256:…`
    pub qualified_image_name: String,
}

impl PublishOutputs {
    /// The inputs these outputs were published from
    pub fn inputs(&self) -> PublishInputs {
        PublishInputs {
            source_image: self.source_image.clone(),
            target_image: self.target_image.clone(),
            pull_triggers: self.pull_triggers.clone(),
        }
    }
}

/// An input property of the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishField {
    SourceImage,
    TargetImage,
    PullTriggers,
}

impl std::fmt::Display for PublishField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PublishField::SourceImage => "sourceImage",
            PublishField::TargetImage => "targetImage",
            PublishField::PullTriggers => "pullTriggers",
        })
    }
}

/// One violated validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// Property the failure is reported against
    pub property: PublishField,
    /// Human-readable reason
    pub reason: String,
}

impl CheckFailure {
    fn new(property: PublishField, reason: &str) -> Self {
        Self {
            property,
            reason: reason.to_string(),
        }
    }
}

/// Result of validating proposed inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckResult {
    /// Inputs accepted as given
    Accepted { inputs: PublishInputs },
    /// Every violated rule, in rule order
    Rejected { failures: Vec<CheckFailure> },
}

impl CheckResult {
    /// Whether the inputs were accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, CheckResult::Accepted { .. })
    }
}

/// Result of comparing previous outputs with proposed inputs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// Changed fields that force destroy-then-recreate
    pub replaces: BTreeSet<PublishField>,
    /// Whether anything changed at all
    pub has_changes: bool,
}

/// What the engine should do after a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePlan {
    /// Keep the current outputs
    Unchanged,
    /// Re-run the publish in place, keeping the resource id
    Update,
    /// Publish a new resource and retire the old one
    Replace,
}

impl DiffResult {
    /// The lifecycle step this diff calls for
    pub fn plan(&self) -> LifecyclePlan {
        if !self.replaces.is_empty() {
            LifecyclePlan::Replace
        } else if self.has_changes {
            LifecyclePlan::Update
        } else {
            LifecyclePlan::Unchanged
        }
    }
}

/// A resource as the orchestration engine records it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImage {
    /// Resource id, `image-publish:PublishImage:<name>`
    pub id: String,
    /// Published outputs
    pub outputs: PublishOutputs,
}

/// Lifecycle provider that publishes images through a [`RegistryClient`]
///
/// Every registry call is awaited before the next one starts. A failure at
/// any step aborts the operation with no outputs, leaving the resource as it
/// was from the engine's point of view. Concurrent creates for one resource
/// are not deduplicated; the engine guarantees a single writer per resource.
pub struct ImagePublisher<R> {
    registry: R,
}

impl<R: RegistryClient> ImagePublisher<R> {
    /// Create a provider over an already-constructed registry client
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// The registry client in use
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Build the resource id for a declared resource name
    pub fn resource_id(name: &str) -> String {
        format!("{}:{}", RESOURCE_TYPE, name)
    }

    /// Validate proposed inputs
    ///
    /// When source and target are both unchanged from `olds` the inputs are
    /// accepted without re-validation. Otherwise every rule is evaluated and
    /// all failures are returned together.
    pub fn check(&self, olds: Option<&PublishInputs>, news: PublishInputs) -> CheckResult {
        if let Some(olds) = olds
            && olds.source_image == news.source_image
            && olds.target_image == news.target_image
        {
            return CheckResult::Accepted { inputs: news };
        }

        let mut failures = Vec::new();
        if news.source_image == news.target_image {
            failures.push(CheckFailure::new(
                PublishField::SourceImage,
                "Source image and target image cannot be equal",
            ));
        }
        if news.source_image.is_empty() {
            failures.push(CheckFailure::new(
                PublishField::SourceImage,
                "Source image is mandatory",
            ));
        }
        if news.target_image.is_empty() {
            failures.push(CheckFailure::new(
                PublishField::TargetImage,
                "Target image is mandatory",
            ));
        }

        if failures.is_empty() {
            CheckResult::Accepted { inputs: news }
        } else {
            debug!("Rejected publish inputs: {:?}", failures);
            CheckResult::Rejected { failures }
        }
    }

    /// Compare the previous outputs with proposed inputs
    ///
    /// Every tracked field forces replacement. `pullTriggers` compares by
    /// length and then position, so a reordered list is a change.
    pub fn diff(&self, olds: &PublishOutputs, news: &PublishInputs) -> DiffResult {
        let mut replaces = BTreeSet::new();

        if olds.pull_triggers.len() != news.pull_triggers.len()
            || olds
                .pull_triggers
                .iter()
                .zip(&news.pull_triggers)
                .any(|(old, new)| old != new)
        {
            replaces.insert(PublishField::PullTriggers);
        }
        if olds.target_image != news.target_image {
            replaces.insert(PublishField::TargetImage);
        }
        if olds.source_image != news.source_image {
            replaces.insert(PublishField::SourceImage);
        }

        let has_changes = !replaces.is_empty();
        DiffResult {
            replaces,
            has_changes,
        }
    }

    /// Publish `inputs` as a new resource named `name`
    pub async fn create(&self, name: &str, inputs: &PublishInputs) -> Result<PublishedImage> {
        let outputs = self.publish(inputs).await?;
        Ok(PublishedImage {
            id: Self::resource_id(name),
            outputs,
        })
    }

    /// Re-publish an existing resource in place
    ///
    /// Pulls the newly declared source image, exactly like `create`.
    pub async fn update(
        &self,
        id: &str,
        olds: &PublishOutputs,
        news: &PublishInputs,
    ) -> Result<PublishOutputs> {
        debug!(
            "Updating {}: {} -> {} (was {} -> {})",
            id, news.source_image, news.target_image, olds.source_image, olds.target_image
        );
        self.publish(news).await
    }

    /// Report the outputs the engine already knows
    pub fn read(&self, id: &str, outputs: PublishOutputs) -> PublishedImage {
        PublishedImage {
            id: id.to_string(),
            outputs,
        }
    }

    /// Retire a resource
    ///
    /// The pushed image is left in the registry: other resources may still
    /// reference older digests of the same repository.
    pub async fn delete(&self, id: &str, outputs: &PublishOutputs) -> Result<()> {
        info!(
            "Retiring {}; keeping {} in the registry",
            id, outputs.qualified_image_name
        );
        Ok(())
    }

    async fn publish(&self, inputs: &PublishInputs) -> Result<PublishOutputs> {
        let client = self.registry.client_name();
        info!(
            "Publishing {} as {} via {}",
            inputs.source_image, inputs.target_image, client
        );

        self.registry.pull(&inputs.source_image).await?;
        self.registry
            .tag(&inputs.source_image, &inputs.target_image)
            .await?;
        self.registry.push(&inputs.target_image).await?;
        let pushed = self.registry.inspect(&inputs.target_image).await?;

        if !reference::is_digest(&pushed.digest) {
            return Err(Error::registry(format!(
                "{} reported an unusable digest for {}: {:?}",
                client, inputs.target_image, pushed.digest
            )));
        }

        let qualified_image_name = reference::qualified_name(&inputs.target_image, &pushed.digest);
        info!("Published {}", qualified_image_name);

        Ok(PublishOutputs {
            source_image: inputs.source_image.clone(),
            target_image: inputs.target_image.clone(),
            pull_triggers: inputs.pull_triggers.clone(),
            digest: pushed.digest,
            qualified_image_name,
        })
    }
}
