//! Apply Orchestrator (C5, `SPEC_FULL.md` §4.5): the topological batch
//! driver. Sorts the input once, dispatches each document to its
//! per-kind reconciler, and aggregates a best-effort `ApplyResult` —
//! one resource failing never stops the rest from being attempted.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::document::Document;
use crate::model::Kind;
use crate::order::sort_documents;
use crate::reconcile::{
    reconcile_cell, reconcile_container, reconcile_realm, reconcile_space, reconcile_stack,
    ReconcileAction,
};
use crate::runner::Runner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    Created,
    Updated,
    Unchanged,
    Failed,
}

impl ResourceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Created => "created",
            ResourceAction::Updated => "updated",
            ResourceAction::Unchanged => "unchanged",
            ResourceAction::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ResourceResult {
    pub index: usize,
    pub kind: Kind,
    pub name: String,
    pub action: ResourceAction,
    pub changes: Vec<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ApplyResult {
    pub resources: Vec<ResourceResult>,
}

impl ApplyResult {
    /// Aggregate success per `spec.md` §7: every resource must have ended in
    /// `created`, `updated`, or `unchanged`.
    pub fn succeeded(&self) -> bool {
        self.resources
            .iter()
            .all(|r| r.action != ResourceAction::Failed)
    }
}

/// Sorts `documents` leaves-last (Realm<Space<Stack<Cell<Container>) and
/// reconciles each in order, continuing past per-resource failures
/// (`SPEC_FULL.md` §4.5). `cancel` is checked between documents, never mid
/// reconcile — a cancellation stops the batch from picking up further work
/// but never rolls back what already succeeded.
pub async fn apply<R>(runner: &R, documents: Vec<Document>, cancel: &CancellationToken) -> ApplyResult
where
    R: Runner + ?Sized,
{
    let sorted = sort_documents(documents, false);
    let mut resources = Vec::with_capacity(sorted.len());

    for (index, doc) in sorted.into_iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("apply cancelled, not processing remaining documents");
            break;
        }

        let kind = doc.kind();
        let name = doc.name().to_string();

        let outcome = match &doc {
            Document::Realm(r) => reconcile_realm(runner, r).await,
            Document::Space(s) => reconcile_space(runner, s).await,
            Document::Stack(s) => reconcile_stack(runner, s).await,
            Document::Cell(c) => reconcile_cell(runner, c).await,
            Document::Container(c) => reconcile_container(runner, c).await,
        };

        resources.push(match outcome {
            Ok(result) => {
                info!(%kind, %name, action = result.action.as_str(), "reconciled");
                ResourceResult {
                    index,
                    kind,
                    name,
                    action: match result.action {
                        ReconcileAction::Created => ResourceAction::Created,
                        ReconcileAction::Updated => ResourceAction::Updated,
                        ReconcileAction::Unchanged => ResourceAction::Unchanged,
                    },
                    changes: result.changes,
                    error: None,
                }
            }
            Err(e) => {
                error!(%kind, %name, error = %e, "reconcile failed");
                ResourceResult {
                    index,
                    kind,
                    name,
                    action: ResourceAction::Failed,
                    changes: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        });
    }

    ApplyResult { resources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metadata, Realm, Space, SpaceSpec};
    use crate::testutil::FakeRunner;

    fn realm_doc(name: &str) -> Document {
        Document::Realm(Realm {
            metadata: Metadata::new(name),
            spec: Default::default(),
            status: Default::default(),
        })
    }

    fn space_doc(realm_name: &str, name: &str) -> Document {
        Document::Space(Space {
            metadata: Metadata::new(name),
            spec: SpaceSpec {
                realm_name: realm_name.to_string(),
                cni_config_path: String::new(),
            },
            status: Default::default(),
        })
    }

    #[tokio::test]
    async fn applies_in_kind_order_and_succeeds() {
        let runner = FakeRunner::new();
        let docs = vec![space_doc("prod", "web"), realm_doc("prod")];
        let result = apply(&runner, docs, &CancellationToken::new()).await;
        assert!(result.succeeded());
        assert_eq!(result.resources[0].kind, Kind::Realm);
        assert_eq!(result.resources[1].kind, Kind::Space);
    }

    #[tokio::test]
    async fn second_apply_is_all_unchanged() {
        let runner = FakeRunner::new();
        let docs = vec![realm_doc("prod"), space_doc("prod", "web")];
        apply(&runner, docs.clone(), &CancellationToken::new()).await;
        let result = apply(&runner, docs, &CancellationToken::new()).await;
        assert!(result
            .resources
            .iter()
            .all(|r| r.action == ResourceAction::Unchanged));
    }

    #[tokio::test]
    async fn breaking_change_fails_that_resource_only() {
        let runner = FakeRunner::new();
        apply(&runner, vec![realm_doc("prod")], &CancellationToken::new()).await;

        let mut changed = realm_doc("prod");
        if let Document::Realm(r) = &mut changed {
            r.spec.namespace = "other".into();
        }
        let result = apply(&runner, vec![changed], &CancellationToken::new()).await;
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resources[0].action, ResourceAction::Failed);
        assert!(!result.succeeded());
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_first_document() {
        let runner = FakeRunner::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = apply(&runner, vec![realm_doc("prod")], &cancel).await;
        assert!(result.resources.is_empty());
    }
}
