//! End-to-end coverage of the CLI -> core -> runtime path (`SPEC_FULL.md`
//! §8): the reconciliation engine driven against the real
//! `MetadataStore`-backed `Runner`, not the in-memory `FakeRunner`.

use kukeon_core::model::{Cell, CellSpec, ContainerSpec, Metadata, Realm, Space, SpaceSpec};
use kukeon_core::{apply, document::Document, refresh, ResourceAction};
use kukeon_runtime::{LocalRunner, MetadataStore};
use tokio_util::sync::CancellationToken;

fn realm_doc(name: &str) -> Document {
    Document::Realm(Realm { metadata: Metadata::new(name), spec: Default::default(), status: Default::default() })
}

fn space_doc(realm_name: &str, name: &str) -> Document {
    Document::Space(Space {
        metadata: Metadata::new(name),
        spec: SpaceSpec { realm_name: realm_name.to_string(), cni_config_path: String::new() },
        status: Default::default(),
    })
}

fn cell_doc(realm_name: &str, space_name: &str, stack_name: &str, name: &str) -> Document {
    Document::Cell(Cell {
        metadata: Metadata::new(name),
        spec: CellSpec {
            realm_name: realm_name.to_string(),
            space_name: space_name.to_string(),
            stack_name: stack_name.to_string(),
            containers: vec![ContainerSpec { root: true, image: "pause:3.9".into(), ..Default::default() }],
        },
        status: Default::default(),
    })
}

#[tokio::test]
async fn fresh_apply_auto_creates_the_whole_hierarchy_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let runner = LocalRunner::new(MetadataStore::new(dir.path()));

    // Only the cell is listed; its three ancestors must be auto-provisioned.
    let docs = vec![cell_doc("prod", "web", "api", "worker")];
    let result = apply(&runner, docs, &CancellationToken::new()).await;

    assert!(result.succeeded());
    assert_eq!(result.resources.len(), 4);
    assert!(dir.path().join("prod/realm.json").exists());
    assert!(dir.path().join("prod/web/space.json").exists());
    assert!(dir.path().join("prod/web/api/stack.json").exists());
    assert!(dir.path().join("prod/web/api/worker/cell.json").exists());
}

#[tokio::test]
async fn reapplying_the_same_documents_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let runner = LocalRunner::new(MetadataStore::new(dir.path()));
    let docs = vec![realm_doc("prod"), space_doc("prod", "web")];

    apply(&runner, docs.clone(), &CancellationToken::new()).await;
    let second = apply(&runner, docs, &CancellationToken::new()).await;

    assert!(second.succeeded());
    assert!(second.resources.iter().all(|r| r.action == ResourceAction::Unchanged));
}

#[tokio::test]
async fn refresh_counts_what_apply_just_created() {
    let dir = tempfile::tempdir().unwrap();
    let runner = LocalRunner::new(MetadataStore::new(dir.path()));
    apply(&runner, vec![cell_doc("prod", "web", "api", "worker")], &CancellationToken::new()).await;

    let report = refresh::refresh(&runner).await;
    assert_eq!(report.realms.found, 1);
    assert_eq!(report.spaces.found, 1);
    assert_eq!(report.stacks.found, 1);
    assert_eq!(report.cells.found, 1);
    assert!(report.errors.is_empty());
}
