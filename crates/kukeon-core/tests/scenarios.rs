//! End-to-end scenarios against `FakeRunner`, one per documented behavior in
//! `SPEC_FULL.md` §8: fresh apply, idempotent re-apply, compatible updates,
//! breaking root-image changes, container set convergence, realm-rename
//! rejection, cascade delete with dependency guards, and multi-document
//! ordering.

use kukeon_core::model::{
    Cell, CellSpec, Container, ContainerEntitySpec, ContainerSpec, Metadata, Realm, RealmSpec,
    Space, SpaceSpec, Stack, StackSpec,
};
use kukeon_core::testutil::FakeRunner;
use kukeon_core::{
    apply, delete_realm, purge_realm, refresh, sort_documents, Document, Kind, ResourceAction,
};
use tokio_util::sync::CancellationToken;

fn realm_doc(name: &str) -> Document {
    Document::Realm(Realm {
        metadata: Metadata::new(name),
        spec: RealmSpec::default(),
        status: Default::default(),
    })
}

fn space_doc(realm: &str, name: &str) -> Document {
    Document::Space(Space {
        metadata: Metadata::new(name),
        spec: SpaceSpec { realm_name: realm.into(), cni_config_path: String::new() },
        status: Default::default(),
    })
}

fn stack_doc(realm: &str, space: &str, name: &str) -> Document {
    Document::Stack(Stack {
        metadata: Metadata::new(name),
        spec: StackSpec { realm_name: realm.into(), space_name: space.into(), id: String::new() },
        status: Default::default(),
    })
}

fn root_container(image: &str) -> ContainerSpec {
    ContainerSpec { root: true, image: image.into(), ..Default::default() }
}

fn child_container(id: &str, image: &str) -> ContainerSpec {
    ContainerSpec { id: id.into(), image: image.into(), ..Default::default() }
}

fn cell_doc(realm: &str, space: &str, stack: &str, name: &str, containers: Vec<ContainerSpec>) -> Document {
    Document::Cell(Cell {
        metadata: Metadata::new(name),
        spec: CellSpec {
            realm_name: realm.into(),
            space_name: space.into(),
            stack_name: stack.into(),
            containers,
        },
        status: Default::default(),
    })
}

fn container_doc(realm: &str, space: &str, stack: &str, cell: &str, id: &str, image: &str) -> Document {
    Document::Container(Container {
        metadata: Metadata::new(id),
        spec: ContainerEntitySpec {
            realm_name: realm.into(),
            space_name: space.into(),
            stack_name: stack.into(),
            cell_name: cell.into(),
            container: child_container(id, image),
        },
        status: Default::default(),
    })
}

fn full_hierarchy() -> Vec<Document> {
    vec![
        realm_doc("prod"),
        space_doc("prod", "web"),
        stack_doc("prod", "web", "api"),
        cell_doc("prod", "web", "api", "worker", vec![root_container("pause:3.9")]),
    ]
}

#[tokio::test]
async fn scenario_fresh_apply_creates_whole_hierarchy() {
    let runner = FakeRunner::new();
    let result = apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    assert!(result.succeeded());
    assert_eq!(result.resources.len(), 4);
    assert!(result.resources.iter().all(|r| r.action == ResourceAction::Created));
}

#[tokio::test]
async fn scenario_reapply_is_fully_idempotent() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    let second = apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    assert!(second.succeeded());
    assert!(second.resources.iter().all(|r| r.action == ResourceAction::Unchanged));
}

#[tokio::test]
async fn scenario_label_only_change_is_a_compatible_update() {
    let runner = FakeRunner::new();
    apply(&runner, vec![realm_doc("prod")], &CancellationToken::new()).await;

    let mut labeled = realm_doc("prod");
    if let Document::Realm(r) = &mut labeled {
        r.metadata.labels.insert("team".into(), "platform".into());
    }
    let result = apply(&runner, vec![labeled], &CancellationToken::new()).await;
    assert!(result.succeeded());
    assert_eq!(result.resources[0].action, ResourceAction::Updated);
}

#[tokio::test]
async fn scenario_root_image_change_recreates_without_failing_the_batch() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;

    let changed = cell_doc("prod", "web", "api", "worker", vec![root_container("pause:3.10")]);
    let result = apply(&runner, vec![changed], &CancellationToken::new()).await;
    assert!(result.succeeded());
    assert_eq!(result.resources[0].action, ResourceAction::Updated);
}

#[tokio::test]
async fn scenario_add_update_remove_children_converge_via_cell_container_set() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    apply(
        &runner,
        vec![container_doc("prod", "web", "api", "worker", "app", "app:1")],
        &CancellationToken::new(),
    )
    .await;

    // Relabel "app" (compatible) and add "sidecar" in the same batch.
    let mut relabeled = container_doc("prod", "web", "api", "worker", "app", "app:1");
    if let Document::Container(c) = &mut relabeled {
        c.metadata.labels.insert("tier".into(), "backend".into());
    }
    let result = apply(
        &runner,
        vec![relabeled, container_doc("prod", "web", "api", "worker", "sidecar", "proxy:1")],
        &CancellationToken::new(),
    )
    .await;
    assert!(result.succeeded());

    let cell = runner.get_cell("prod", "web", "api", "worker").await.unwrap();
    assert!(cell.spec.containers.iter().any(|c| c.id == "app"));
    assert!(cell.spec.containers.iter().any(|c| c.id == "sidecar"));

    // Now remove "app" directly via its deletion path.
    kukeon_core::delete_container(&runner, "prod", "web", "api", "worker", "app", false)
        .await
        .unwrap();
    let cell = runner.get_cell("prod", "web", "api", "worker").await.unwrap();
    assert!(!cell.spec.containers.iter().any(|c| c.id == "app"));
    assert!(cell.spec.containers.iter().any(|c| c.id == "sidecar"));
}

#[tokio::test]
async fn scenario_realm_namespace_rename_is_breaking_and_fails_that_resource_only() {
    let runner = FakeRunner::new();
    apply(&runner, vec![realm_doc("prod")], &CancellationToken::new()).await;

    let mut renamed = realm_doc("prod");
    if let Document::Realm(r) = &mut renamed {
        r.spec.namespace = "prod-v2".into();
    }
    let result = apply(&runner, vec![renamed], &CancellationToken::new()).await;
    assert_eq!(result.resources.len(), 1);
    assert_eq!(result.resources[0].action, ResourceAction::Failed);
    assert!(!result.succeeded());

    // The realm itself is untouched by the rejected update.
    let realm = runner.get_realm("prod").await.unwrap();
    assert_eq!(realm.spec.namespace, "");
}

#[tokio::test]
async fn scenario_delete_realm_without_cascade_is_rejected_when_children_exist() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;

    let err = delete_realm(&runner, "prod", false, false).await.unwrap_err();
    assert!(matches!(
        err,
        kukeon_core::KukeonError::ResourceHasDependencies { kind: Kind::Realm, .. }
    ));
    // Nothing was torn down by the rejected call.
    assert!(runner.get_space("prod", "web").await.is_ok());
}

#[tokio::test]
async fn scenario_cascade_delete_removes_the_entire_hierarchy() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;

    let result = delete_realm(&runner, "prod", false, true).await.unwrap();
    assert!(result.deleted.iter().any(|d| d == "Realm:prod"));
    assert!(runner.get_realm("prod").await.is_err());
    assert!(runner.get_space("prod", "web").await.is_err());
    assert!(runner.get_stack("prod", "web", "api").await.is_err());
    assert!(runner.get_cell("prod", "web", "api", "worker").await.is_err());
}

#[tokio::test]
async fn scenario_purge_after_manual_cascade_delete_is_a_tolerant_no_op() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    delete_realm(&runner, "prod", false, true).await.unwrap();

    // The typed resource is already gone; purge must still succeed.
    let result = purge_realm(&runner, "prod", false, false).await.unwrap();
    assert!(result.deleted.is_empty());
    assert!(result.purged.is_empty());
}

#[tokio::test]
async fn scenario_multi_document_apply_is_order_independent_at_the_call_site() {
    let runner = FakeRunner::new();
    // Deliberately out of hierarchy order; `apply` must sort before reconciling.
    let shuffled = vec![
        cell_doc("prod", "web", "api", "worker", vec![root_container("pause:3.9")]),
        stack_doc("prod", "web", "api"),
        realm_doc("prod"),
        space_doc("prod", "web"),
    ];
    let result = apply(&runner, shuffled, &CancellationToken::new()).await;
    assert!(result.succeeded());
    let kinds: Vec<_> = result.resources.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![Kind::Realm, Kind::Space, Kind::Stack, Kind::Cell]);
}

#[tokio::test]
async fn scenario_sort_documents_is_stable_within_a_kind() {
    let docs = vec![space_doc("r", "b"), realm_doc("r"), space_doc("r", "a")];
    let sorted = sort_documents(docs, false);
    let names: Vec<_> = sorted.iter().map(Document::name).collect();
    assert_eq!(names, vec!["r", "b", "a"]);
}

#[tokio::test]
async fn scenario_refresh_after_apply_observes_the_same_counts() {
    let runner = FakeRunner::new();
    apply(&runner, full_hierarchy(), &CancellationToken::new()).await;
    apply(
        &runner,
        vec![container_doc("prod", "web", "api", "worker", "app", "app:1")],
        &CancellationToken::new(),
    )
    .await;

    let report = refresh(&runner).await;
    assert_eq!(report.realms.found, 1);
    assert_eq!(report.spaces.found, 1);
    assert_eq!(report.stacks.found, 1);
    assert_eq!(report.cells.found, 1);
    assert_eq!(report.containers.found, 1);
    assert!(report.errors.is_empty());
}
