// # Resource State
//
// Holds the engine-side view of one publish resource and walks the
// check → diff → create/update sequence against it. A failed step leaves the
// state untouched.

use super::{CheckFailure, CheckResult, ImagePublisher, LifecyclePlan, PublishInputs, PublishOutputs, PublishedImage};
use crate::error::Result;
use crate::traits::RegistryClient;
use tracing::{debug, info};

/// Engine-side state of a publish resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing published yet, or retired
    #[default]
    Absent,
    /// Published with the given id and outputs
    Present(PublishedImage),
}

/// Outcome of one [`ResourceState::converge`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The proposed inputs failed validation; state unchanged
    Rejected { failures: Vec<CheckFailure> },
    /// Inputs match the published outputs
    Unchanged,
    /// First publish
    Created(PublishedImage),
    /// Re-published in place under the same id
    Updated(PublishedImage),
    /// New resource published, previous one retired afterwards
    Replaced {
        previous: PublishedImage,
        current: PublishedImage,
    },
}

impl ResourceState {
    /// Current outputs, if published
    pub fn outputs(&self) -> Option<&PublishOutputs> {
        match self {
            ResourceState::Absent => None,
            ResourceState::Present(image) => Some(&image.outputs),
        }
    }

    /// Whether a resource is currently published
    pub fn is_present(&self) -> bool {
        matches!(self, ResourceState::Present(_))
    }

    /// Drive the resource towards `news`
    pub async fn converge<R: RegistryClient>(
        &mut self,
        publisher: &ImagePublisher<R>,
        name: &str,
        news: PublishInputs,
    ) -> Result<Transition> {
        let olds = self.outputs().map(PublishOutputs::inputs);
        let inputs = match publisher.check(olds.as_ref(), news) {
            CheckResult::Accepted { inputs } => inputs,
            CheckResult::Rejected { failures } => return Ok(Transition::Rejected { failures }),
        };

        let current = match self {
            ResourceState::Absent => {
                let created = publisher.create(name, &inputs).await?;
                *self = ResourceState::Present(created.clone());
                return Ok(Transition::Created(created));
            }
            ResourceState::Present(current) => current,
        };

        let diff = publisher.diff(&current.outputs, &inputs);
        debug!("{}: diff {:?}", current.id, diff);

        match diff.plan() {
            LifecyclePlan::Unchanged => Ok(Transition::Unchanged),
            LifecyclePlan::Update => {
                let outputs = publisher
                    .update(&current.id, &current.outputs, &inputs)
                    .await?;
                current.outputs = outputs;
                Ok(Transition::Updated(current.clone()))
            }
            LifecyclePlan::Replace => {
                let replacement = publisher.create(name, &inputs).await?;
                let previous = current.clone();
                publisher.delete(&previous.id, &previous.outputs).await?;
                info!(
                    "{}: replaced {} with {}",
                    replacement.id,
                    previous.outputs.qualified_image_name,
                    replacement.outputs.qualified_image_name
                );
                *self = ResourceState::Present(replacement.clone());
                Ok(Transition::Replaced {
                    previous,
                    current: replacement,
                })
            }
        }
    }

    /// Retire the resource, returning what was published
    pub async fn remove<R: RegistryClient>(
        &mut self,
        publisher: &ImagePublisher<R>,
    ) -> Result<Option<PublishedImage>> {
        if let ResourceState::Present(image) = self {
            publisher.delete(&image.id, &image.outputs).await?;
        }
        Ok(match std::mem::take(self) {
            ResourceState::Absent => None,
            ResourceState::Present(image) => Some(image),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::tests::{RecordingRegistry, inputs};

    fn publisher() -> ImagePublisher<RecordingRegistry> {
        ImagePublisher::new(RecordingRegistry::default())
    }

    #[tokio::test]
    async fn test_converge_creates_then_settles() {
        let publisher = publisher();
        let mut state = ResourceState::Absent;

        let first = state
            .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &[]))
            .await
            .unwrap();
        assert!(matches!(first, Transition::Created(_)));
        assert!(state.is_present());

        let second = state
            .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &[]))
            .await
            .unwrap();
        assert_eq!(second, Transition::Unchanged);
        assert_eq!(publisher.registry().calls().len(), 4);
    }

    #[tokio::test]
    async fn test_converge_rejection_keeps_state() {
        let publisher = publisher();
        let mut state = ResourceState::Absent;

        let transition = state
            .converge(&publisher, "svc", inputs("", "reg/img:1", &[]))
            .await
            .unwrap();
        assert!(matches!(transition, Transition::Rejected { .. }));
        assert_eq!(state, ResourceState::Absent);
        assert!(publisher.registry().calls().is_empty());
    }

    #[tokio::test]
    async fn test_converge_replaces_on_trigger_change() {
        let publisher = publisher();
        let mut state = ResourceState::Absent;
        state
            .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &["a"]))
            .await
            .unwrap();

        let transition = state
            .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &["b"]))
            .await
            .unwrap();
        let Transition::Replaced { previous, current } = transition else {
            panic!("expected replacement");
        };
        assert_eq!(previous.outputs.pull_triggers, vec!["a"]);
        assert_eq!(current.outputs.pull_triggers, vec!["b"]);
        assert_eq!(state.outputs(), Some(&current.outputs));
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous() {
        let mut state = ResourceState::Absent;
        state
            .converge(&publisher(), "svc", inputs("img:1", "reg/img:1", &[]))
            .await
            .unwrap();
        let before = state.clone();

        let failing = ImagePublisher::new(RecordingRegistry {
            fail_on: Some("push"),
            ..Default::default()
        });
        let result = state
            .converge(&failing, "svc", inputs("img:2", "reg/img:2", &[]))
            .await;
        assert!(result.is_err());
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_remove_returns_published() {
        let publisher = publisher();
        let mut state = ResourceState::Absent;
        state
            .converge(&publisher, "svc", inputs("img:1", "reg/img:1", &[]))
            .await
            .unwrap();

        let removed = state.remove(&publisher).await.unwrap();
        assert_eq!(removed.map(|i| i.id), Some("image-publish:PublishImage:svc".to_string()));
        assert_eq!(state, ResourceState::Absent);
        assert_eq!(state.remove(&publisher).await.unwrap(), None);
    }
}
